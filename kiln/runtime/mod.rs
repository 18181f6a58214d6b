//! The kiln runtime: values, the reader, the evaluator and everything needed
//! to run a script against a ground scope.

mod error;
pub use error::{
   DecodeError,
   Error,
   Result,
};

pub mod value;
pub use value::{
   Annotate,
   Applicative,
   Bind,
   Combiner,
   CommandPath,
   Compound,
   DirPath,
   ExtendPath,
   FileOrDirPath,
   FilePath,
   Items,
   Keyword,
   Native,
   Operative,
   Pair,
   Path,
   Scope,
   Sink,
   Source,
   Symbol,
   Thunk,
   ThunkPath,
   ThunkSpec,
   Value,
};

mod decode;
pub use decode::{
   Decode,
   Empty,
   Ignore,
   Null,
};

pub mod record;

mod json;

pub mod read;
pub use read::{
   Reader,
   read_all,
};

pub mod eval;
pub use eval::{
   Cont,
   Context,
   Ready,
   eval_form,
};

pub mod ground;

mod run;
pub use run::{
   RunState,
   eval_file,
   eval_reader,
   run_main,
};
