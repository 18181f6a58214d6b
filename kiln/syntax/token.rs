//! [`Token`] definitions and the [`Tokenizer`].

use std::io;

use peekmore::{
   PeekMore as _,
   PeekMoreIterator as PeekMore,
};

use crate::{
   Error,
   Position,
   Reason,
   Result,
};

/// Returns the character an escape sequence stands for, given the character
/// after the backslash.
#[must_use]
pub fn unescape(c: char) -> Option<char> {
   Some(match c {
      'a' => '\x07', // Bell.
      'b' => '\x08', // Backspace.
      't' => '\x09', // Horizontal tab.
      'n' => '\x0A', // New line.
      'v' => '\x0B', // Vertical tab.
      'f' => '\x0C', // Form feed.
      'r' => '\x0D', // Carriage return.
      '"' => '"',
      '\\' => '\\',

      _ => return None,
   })
}

/// The inverse of [`unescape`]: returns the escape sequence that must be
/// written in a string literal for the given character, if any.
#[must_use]
pub fn escape(c: char) -> Option<&'static str> {
   Some(match c {
      '\x07' => "\\a",
      '\x08' => "\\b",
      '\x09' => "\\t",
      '\x0A' => "\\n",
      '\x0B' => "\\v",
      '\x0C' => "\\f",
      '\x0D' => "\\r",
      '"' => "\\\"",
      '\\' => "\\\\",

      _ => return None,
   })
}

/// Resolves the escapes of a string token's text, quotes included.
/// `position` is the position of the opening quote and is used to locate
/// unknown escapes.
pub fn unescape_string(text: &str, position: Position) -> Result<String> {
   let inner = text
      .strip_prefix('"')
      .and_then(|text| text.strip_suffix('"'))
      .ok_or_else(|| Error::syntax(position, Reason::UnterminatedString))?;

   let mut string = String::with_capacity(inner.len());
   let mut position = position.advance('"');

   let mut chars = inner.chars();
   while let Some(c) = chars.next() {
      if c != '\\' {
         string.push(c);
         position = position.advance(c);
         continue;
      }

      let Some(next) = chars.next() else {
         return Err(Error::syntax(position, Reason::UnterminatedString));
      };

      let unescaped =
         unescape(next).ok_or_else(|| Error::syntax(position, Reason::UnknownEscape(next)))?;

      string.push(unescaped);
      position = position.advance(c).advance(next);
   }

   Ok(string)
}

/// The kind of a [`Token`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[allow(non_camel_case_types)]
pub enum Kind {
   /// A `#!` line at the very start of the source.
   TOKEN_SHEBANG,
   /// Anything that matches [`char::is_whitespace`].
   TOKEN_SPACE,
   /// A `;` comment up to, but not including, the end of the line.
   TOKEN_COMMENT,

   TOKEN_LEFT_PARENTHESIS,
   TOKEN_RIGHT_PARENTHESIS,
   TOKEN_LEFT_BRACKET,
   TOKEN_RIGHT_BRACKET,
   TOKEN_LEFT_CURLYBRACE,
   TOKEN_RIGHT_CURLYBRACE,

   /// The metadata prefix `^`.
   TOKEN_CARET,

   /// A double-quoted string, quotes and escapes included verbatim.
   TOKEN_STRING,

   /// A run of non-delimiter characters. See [`crate::word`].
   TOKEN_WORD,
}

impl Kind {
   /// Whether this token carries no meaning besides separating others.
   #[must_use]
   pub fn is_trivia(self) -> bool {
      matches!(
         self,
         Kind::TOKEN_SHEBANG | Kind::TOKEN_SPACE | Kind::TOKEN_COMMENT
      )
   }
}

/// A token and where it starts.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Token {
   pub kind:     Kind,
   pub text:     String,
   pub position: Position,
}

impl Token {
   /// Returns how many line breaks a space token contains.
   #[must_use]
   pub fn line_breaks(&self) -> usize {
      self.text.bytes().filter(|&c| c == b'\n').count()
   }

   /// Returns the text of a comment token with its leading `;` run and the
   /// spaces after it removed.
   #[must_use]
   pub fn comment_text(&self) -> &str {
      self
         .text
         .trim_start_matches(';')
         .trim_start_matches([' ', '\t'])
         .trim_end()
   }
}

fn is_delimiter(c: char) -> bool {
   c.is_whitespace() || matches!(c, '(' | ')' | '[' | ']' | '{' | '}' | '"' | ';' | '^')
}

/// A lazy tokenizer over a stream of characters.
///
/// Reading from the stream may fail, which is why it yields
/// [`io::Result<char>`]. Such failures are reported as [`Error::Io`].
pub struct Tokenizer<I: Iterator<Item = io::Result<char>>> {
   chars:    PeekMore<I>,
   position: Position,
   at_start: bool,
}

/// Tokenizes an in-memory string.
pub fn tokenize(source: &str) -> Tokenizer<impl Iterator<Item = io::Result<char>> + '_> {
   Tokenizer::new(source.chars().map(Ok::<char, io::Error>))
}

impl<I: Iterator<Item = io::Result<char>>> Tokenizer<I> {
   pub fn new(chars: I) -> Self {
      Self {
         chars:    chars.peekmore(),
         position: Position::start(),
         at_start: true,
      }
   }

   /// The position of the next character to be consumed.
   #[must_use]
   pub fn position(&self) -> Position {
      self.position
   }

   fn peek_nth(&mut self, n: usize) -> Option<char> {
      match self.chars.peek_nth(n) {
         Some(&Ok(c)) => Some(c),
         _ => None,
      }
   }

   fn peek(&mut self) -> Option<char> {
      self.peek_nth(0)
   }

   fn next_char(&mut self) -> Result<Option<char>> {
      match self.chars.next() {
         Some(Ok(c)) => {
            self.position = self.position.advance(c);
            Ok(Some(c))
         },
         Some(Err(error)) => Err(Error::Io(error)),
         None => Ok(None),
      }
   }

   fn consume_while(&mut self, text: &mut String, predicate: impl Fn(char) -> bool) -> Result<()> {
      while let Some(c) = self.peek() {
         if !predicate(c) {
            break;
         }

         self.next_char()?;
         text.push(c);
      }

      Ok(())
   }

   fn consume_string(&mut self, text: &mut String, start: Position) -> Result<()> {
      loop {
         let Some(c) = self.next_char()? else {
            return Err(Error::syntax(start, Reason::UnterminatedString));
         };

         text.push(c);

         match c {
            '"' => return Ok(()),

            '\\' => {
               let Some(escaped) = self.next_char()? else {
                  return Err(Error::syntax(start, Reason::UnterminatedString));
               };

               text.push(escaped);
            },

            _ => {},
         }
      }
   }

   fn next_token(&mut self) -> Result<Option<Token>> {
      let position = self.position;
      let at_start = self.at_start;
      self.at_start = false;

      let Some(c) = self.next_char()? else {
         return Ok(None);
      };

      let mut text = String::from(c);

      let kind = match c {
         '#' if at_start && self.peek() == Some('!') => {
            self.consume_while(&mut text, |c| c != '\n')?;
            Kind::TOKEN_SHEBANG
         },

         c if c.is_whitespace() => {
            self.consume_while(&mut text, char::is_whitespace)?;
            Kind::TOKEN_SPACE
         },

         ';' => {
            self.consume_while(&mut text, |c| c != '\n')?;
            Kind::TOKEN_COMMENT
         },

         '(' => Kind::TOKEN_LEFT_PARENTHESIS,
         ')' => Kind::TOKEN_RIGHT_PARENTHESIS,
         '[' => Kind::TOKEN_LEFT_BRACKET,
         ']' => Kind::TOKEN_RIGHT_BRACKET,
         '{' => Kind::TOKEN_LEFT_CURLYBRACE,
         '}' => Kind::TOKEN_RIGHT_CURLYBRACE,
         '^' => Kind::TOKEN_CARET,

         '"' => {
            self.consume_string(&mut text, position)?;
            Kind::TOKEN_STRING
         },

         _ => {
            self.consume_while(&mut text, |c| !is_delimiter(c))?;
            Kind::TOKEN_WORD
         },
      };

      Ok(Some(Token {
         kind,
         text,
         position,
      }))
   }
}

impl<I: Iterator<Item = io::Result<char>>> Iterator for Tokenizer<I> {
   type Item = Result<Token>;

   fn next(&mut self) -> Option<Self::Item> {
      self.next_token().transpose()
   }
}

#[cfg(test)]
mod tests {
   use pretty_assertions::assert_eq;

   use super::*;

   fn kinds(source: &str) -> Vec<(Kind, String)> {
      tokenize(source)
         .map(|token| token.map(|token| (token.kind, token.text)))
         .collect::<Result<_>>()
         .unwrap()
   }

   #[test]
   fn shebang_only_at_start() {
      assert_eq!(kinds("#!/usr/bin/env kiln\n42"), [
         (Kind::TOKEN_SHEBANG, "#!/usr/bin/env kiln".to_owned()),
         (Kind::TOKEN_SPACE, "\n".to_owned()),
         (Kind::TOKEN_WORD, "42".to_owned()),
      ]);

      assert_eq!(kinds(" #!foo"), [
         (Kind::TOKEN_SPACE, " ".to_owned()),
         (Kind::TOKEN_WORD, "#!foo".to_owned()),
      ]);
   }

   #[test]
   fn delimiters_split_words() {
      assert_eq!(kinds("(foo ./bar/)^:a;c"), [
         (Kind::TOKEN_LEFT_PARENTHESIS, "(".to_owned()),
         (Kind::TOKEN_WORD, "foo".to_owned()),
         (Kind::TOKEN_SPACE, " ".to_owned()),
         (Kind::TOKEN_WORD, "./bar/".to_owned()),
         (Kind::TOKEN_RIGHT_PARENTHESIS, ")".to_owned()),
         (Kind::TOKEN_CARET, "^".to_owned()),
         (Kind::TOKEN_WORD, ":a".to_owned()),
         (Kind::TOKEN_COMMENT, ";c".to_owned()),
      ]);
   }

   #[test]
   fn strings_keep_escapes_verbatim() {
      assert_eq!(kinds(r#""a\"b" x"#), [
         (Kind::TOKEN_STRING, r#""a\"b""#.to_owned()),
         (Kind::TOKEN_SPACE, " ".to_owned()),
         (Kind::TOKEN_WORD, "x".to_owned()),
      ]);
   }

   #[test]
   fn unterminated_string() {
      let error = tokenize("\n  \"abc").find_map(Result::err).unwrap();

      assert_eq!(error.reason(), Some(&Reason::UnterminatedString));
      assert!(matches!(error, Error::Syntax { position, .. } if position == Position { line: 2, column: 3 }));
   }

   #[test]
   fn unescape_all() {
      assert_eq!(
         unescape_string(r#""hello \"\n\\\t\a\f\r\b\v""#, Position::start()).unwrap(),
         "hello \"\n\\\t\x07\x0C\r\x08\x0B",
      );
   }

   #[test]
   fn unknown_escape() {
      let error = unescape_string(r#""ab\q""#, Position::start()).unwrap_err();

      assert_eq!(error.reason(), Some(&Reason::UnknownEscape('q')));
      assert!(matches!(error, Error::Syntax { position, .. } if position == Position { line: 1, column: 4 }));
   }

   #[test]
   fn comment_text() {
      let strip = |source: &str| tokenize(source).next().unwrap().unwrap().comment_text().to_owned();

      assert_eq!(strip("; hello!"), "hello!");
      assert_eq!(strip(";;;   hello!"), "hello!");
      assert_eq!(strip(";; ; hello!"), "; hello!");
      assert_eq!(strip(";"), "");
   }
}
