use std::fmt;

/// A line and column in a source text. Both are 1-based and columns count
/// characters, not bytes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Position {
   pub line:   u32,
   pub column: u32,
}

impl Default for Position {
   fn default() -> Self {
      Self::start()
   }
}

impl fmt::Display for Position {
   fn fmt(&self, writer: &mut fmt::Formatter<'_>) -> fmt::Result {
      write!(writer, "{line}:{column}", line = self.line, column = self.column)
   }
}

impl Position {
   /// The position of the first character.
   #[must_use]
   pub fn start() -> Self {
      Self { line: 1, column: 1 }
   }

   /// Returns the position after the given character.
   #[must_use]
   pub fn advance(self, c: char) -> Self {
      if c == '\n' {
         Self {
            line:   self.line + 1,
            column: 1,
         }
      } else {
         Self {
            line:   self.line,
            column: self.column + 1,
         }
      }
   }

   /// Returns the position after the given text.
   #[must_use]
   pub fn advance_str(self, s: &str) -> Self {
      s.chars().fold(self, Self::advance)
   }
}
