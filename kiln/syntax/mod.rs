//! Lexical layer of kiln: character positions, the tokenizer and the grammar
//! of words (atoms, paths and keyword chains).

use std::io;

mod position;
pub use position::Position;

mod token;
pub use token::{
   Kind,
   Token,
   Tokenizer,
   escape,
   tokenize,
   unescape,
   unescape_string,
};

pub mod word;
pub use word::{
   Segment,
   Word,
};

/// A type alias for concise use of [`Error`].
pub type Result<T> = std::result::Result<T, Error>;

/// Why a piece of source text was rejected.
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum Reason {
   #[error("unterminated string")]
   UnterminatedString,

   #[error("unknown escape sequence '\\{0}'")]
   UnknownEscape(char),

   #[error("unterminated list, '{0}' is never closed")]
   UnterminatedList(char),

   #[error("unexpected '{0}'")]
   UnexpectedDelimiter(char),

   #[error("metadata must be a bind, a keyword or an atom, got {0}")]
   MalformedMetadata(String),

   #[error("expected a form after '^'")]
   MissingMetadataTarget,

   #[error("'&' must be followed by exactly one form before the closing delimiter")]
   MisplacedRest,

   #[error("empty path segment in '{0}'")]
   EmptySegment(String),

   #[error("empty keyword in '{0}'")]
   EmptyKeyword(String),
}

/// A failure to read source text.
#[derive(thiserror::Error, Debug)]
pub enum Error {
   #[error("syntax error at {position}: {reason}")]
   Syntax { position: Position, reason: Reason },

   #[error("failed to read source")]
   Io(#[from] io::Error),
}

impl Error {
   #[must_use]
   pub fn syntax(position: Position, reason: Reason) -> Self {
      Self::Syntax { position, reason }
   }

   /// The syntax reason, if this is not an I/O failure.
   #[must_use]
   pub fn reason(&self) -> Option<&Reason> {
      match *self {
         Self::Syntax { ref reason, .. } => Some(reason),
         Self::Io(_) => None,
      }
   }
}
