//! Miscellaneous utilities shared by the kiln crates.

mod dupe;
pub use dupe::{
   Dupe,
   OptionDupedExt,
};

pub mod suffix;
