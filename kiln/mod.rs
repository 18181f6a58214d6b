//! kiln, a Lisp-family scripting language for paths, commands and thunks.
//!
//! This crate re-exports the kiln libraries and holds the configuration of
//! the `kiln` binary.

pub use kiln_error as error;
pub use kiln_runtime as runtime;
pub use kiln_syntax as syntax;
pub use kiln_util as util;

mod config;
pub use config::Config;
