use std::{
   borrow::Cow,
   fmt,
   io,
};

use kiln_util::Dupe;

use crate::{
   Symbol,
   Value,
};

/// A type alias for concise use of [`Error`].
pub type Result<T> = std::result::Result<T, Error>;

/// Every way reading or evaluating a program can fail.
#[derive(thiserror::Error, Debug)]
pub enum Error {
   #[error(transparent)]
   Syntax(#[from] kiln_syntax::Error),

   #[error(transparent)]
   Decode(#[from] DecodeError),

   #[error("unbound symbol: {symbol}")]
   UnboundSymbol { symbol: Symbol },

   #[error("{value} is not a combiner")]
   NotACombiner { value: Value },

   #[error("cannot extend {parent} with {child}, only directories can be extended")]
   PathExtend { parent: Value, child: Value },

   #[error("cannot bind {value} to {pattern}")]
   BindMismatch { pattern: Value, value: Value },

   #[error("{name} expects {expected} argument(s), got {got}")]
   Arity {
      name:     String,
      expected: String,
      got:      usize,
   },

   #[error("{pipe} has no more values")]
   EndOfSource { pipe: Value },

   #[error("evaluation cancelled")]
   Cancelled,

   #[error("I/O failure")]
   Io(#[from] io::Error),

   #[error("failed to encode or decode JSON")]
   Json(#[from] serde_json::Error),

   #[error(transparent)]
   Other(#[from] kiln_error::Error),
}

/// A value did not have the shape a destination expected.
#[derive(Debug, Clone)]
pub struct DecodeError {
   pub value:       Value,
   pub destination: Cow<'static, str>,
   pub reason:      Option<String>,
}

impl std::error::Error for DecodeError {}

impl fmt::Display for DecodeError {
   fn fmt(&self, writer: &mut fmt::Formatter<'_>) -> fmt::Result {
      write!(
         writer,
         "expected {destination}, got {kind} {value}",
         destination = self.destination,
         kind = self.value.unannotated().kind(),
         value = self.value,
      )?;

      if let Some(ref reason) = self.reason {
         write!(writer, ": {reason}")?;
      }

      Ok(())
   }
}

impl DecodeError {
   #[must_use]
   pub fn new(value: &Value, destination: impl Into<Cow<'static, str>>) -> Self {
      Self {
         value:       value.dupe(),
         destination: destination.into(),
         reason:      None,
      }
   }

   #[must_use]
   pub fn with_reason(mut self, reason: impl fmt::Display) -> Self {
      self.reason = Some(reason.to_string());
      self
   }
}
