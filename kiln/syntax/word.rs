//! The grammar of [`Word`]s, the atoms of the language.
//!
//! A word token is classified as a literal, a symbol, a keyword, a command,
//! a keyword chain (`sym:kw:kw2`) or a path chain (`./foo/bar`, `xyz/foo/`,
//! `/absolute/path`). Path chains are built lexically here so that the
//! reader never has to reinterpret already-read forms.

use std::str::FromStr as _;

use crate::{
   Error,
   Position,
   Reason,
   Result,
};

/// One `/`-separated component of a path chain.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Segment {
   File(String),
   Directory(String),
}

/// A classified word.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Word {
   Ignore,
   Null,
   Boolean(bool),
   Integer(num::BigInt),

   Symbol(String),
   Keyword(String),

   /// `.name`
   Command(String),
   /// `./`, `../`, `/` and `name/`
   Directory(String),

   /// `base:key`
   Access { base: Box<Word>, key: String },

   /// `parent/child`
   Extend { parent: Box<Word>, child: Segment },
}

fn is_integer(text: &str) -> bool {
   let digits = text.strip_prefix('-').unwrap_or(text);

   !digits.is_empty() && digits.bytes().all(|c| c.is_ascii_digit())
}

/// Classifies a word token's text. `position` is only used for errors.
pub fn parse(text: &str, position: Position) -> Result<Word> {
   if !text.contains('/') {
      return atom(text, position);
   }

   let (body, trailing_slash) = match text.strip_suffix('/') {
      Some(body) => (body, true),
      None => (text, false),
   };

   let mut parts = body.split('/');
   let first = parts.next().unwrap_or_default();
   let rest = parts.collect::<Vec<_>>();

   if rest.is_empty() {
      return Ok(Word::Directory(first.to_owned()));
   }

   let mut word = match first {
      "" | "." | ".." => Word::Directory(first.to_owned()),
      _ => atom(first, position)?,
   };

   for (index, &part) in rest.iter().enumerate() {
      if part.is_empty() {
         return Err(Error::syntax(position, Reason::EmptySegment(text.to_owned())));
      }

      let child = if index + 1 == rest.len() && !trailing_slash {
         Segment::File(part.to_owned())
      } else {
         Segment::Directory(part.to_owned())
      };

      word = Word::Extend {
         parent: Box::new(word),
         child,
      };
   }

   Ok(word)
}

fn atom(text: &str, position: Position) -> Result<Word> {
   Ok(match text {
      "_" => Word::Ignore,
      "null" => Word::Null,
      "true" => Word::Boolean(true),
      "false" => Word::Boolean(false),

      _ if is_integer(text) => {
         // Only ASCII digits with an optional sign reach this point.
         match num::BigInt::from_str(text) {
            Ok(integer) => Word::Integer(integer),
            Err(_) => Word::Symbol(text.to_owned()),
         }
      },

      _ if text.len() > 1 && text.starts_with(':') => Word::Keyword(text[1..].to_owned()),

      _ if text.len() > 1 && text.starts_with('.') && text != ".." => {
         Word::Command(text[1..].to_owned())
      },

      _ if text.len() > 1 && text.contains(':') => {
         let mut keys = text.split(':');

         let mut word = Word::Symbol(keys.next().unwrap_or_default().to_owned());

         for key in keys {
            if key.is_empty() {
               return Err(Error::syntax(position, Reason::EmptyKeyword(text.to_owned())));
            }

            word = Word::Access {
               base: Box::new(word),
               key:  key.to_owned(),
            };
         }

         word
      },

      _ => Word::Symbol(text.to_owned()),
   })
}

#[cfg(test)]
mod tests {
   use pretty_assertions::assert_eq;

   use super::*;

   fn parse(text: &str) -> Word {
      super::parse(text, Position::start()).unwrap()
   }

   fn extend(parent: Word, child: Segment) -> Word {
      Word::Extend {
         parent: Box::new(parent),
         child,
      }
   }

   fn file(name: &str) -> Segment {
      Segment::File(name.to_owned())
   }

   fn directory(name: &str) -> Segment {
      Segment::Directory(name.to_owned())
   }

   #[test]
   fn literals() {
      assert_eq!(parse("_"), Word::Ignore);
      assert_eq!(parse("null"), Word::Null);
      assert_eq!(parse("true"), Word::Boolean(true));
      assert_eq!(parse("-42"), Word::Integer(num::BigInt::from(-42)));
      assert_eq!(parse("-"), Word::Symbol("-".to_owned()));
      assert_eq!(parse(":foo-bar"), Word::Keyword("foo-bar".to_owned()));
      assert_eq!(parse("'"), Word::Symbol("'".to_owned()));
      assert_eq!(parse("&"), Word::Symbol("&".to_owned()));
   }

   #[test]
   fn commands() {
      assert_eq!(parse(".foo"), Word::Command("foo".to_owned()));
      assert_eq!(parse("."), Word::Symbol(".".to_owned()));
      assert_eq!(parse(".."), Word::Symbol("..".to_owned()));
   }

   #[test]
   fn directories() {
      assert_eq!(parse("./"), Word::Directory(".".to_owned()));
      assert_eq!(parse("../"), Word::Directory("..".to_owned()));
      assert_eq!(parse("/"), Word::Directory(String::new()));
      assert_eq!(parse("foo/"), Word::Directory("foo".to_owned()));
   }

   #[test]
   fn path_chains() {
      assert_eq!(
         parse("./foo"),
         extend(Word::Directory(".".to_owned()), file("foo")),
      );
      assert_eq!(
         parse("./.foo"),
         extend(Word::Directory(".".to_owned()), file(".foo")),
      );
      assert_eq!(
         parse("./foo/"),
         extend(Word::Directory(".".to_owned()), directory("foo")),
      );
      assert_eq!(
         parse("xyz/foo/bar"),
         extend(
            extend(Word::Symbol("xyz".to_owned()), directory("foo")),
            file("bar"),
         ),
      );
      assert_eq!(
         parse("/absolute/path"),
         extend(
            extend(Word::Directory(String::new()), directory("absolute")),
            file("path"),
         ),
      );
   }

   #[test]
   fn keyword_chains() {
      let xyz_foo = Word::Access {
         base: Box::new(Word::Symbol("xyz".to_owned())),
         key:  "foo".to_owned(),
      };

      assert_eq!(parse("xyz:foo"), xyz_foo);
      assert_eq!(parse("xyz:foo:bar"), Word::Access {
         base: Box::new(xyz_foo.clone()),
         key:  "bar".to_owned(),
      });
      assert_eq!(parse("xyz:foo/path"), extend(xyz_foo, file("path")));
   }

   #[test]
   fn empty_components() {
      let error = super::parse("a//b", Position::start()).unwrap_err();
      assert_eq!(error.reason(), Some(&Reason::EmptySegment("a//b".to_owned())));

      let error = super::parse("a::b", Position::start()).unwrap_err();
      assert_eq!(error.reason(), Some(&Reason::EmptyKeyword("a::b".to_owned())));
   }
}
