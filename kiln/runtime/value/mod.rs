use std::{
   fmt::{
      self,
      Write as _,
   },
   sync::Arc,
};

use arcstr::ArcStr;
use derive_more::From;
use kiln_util::Dupe;

mod annotate;
pub use annotate::Annotate;

mod bind;
pub use bind::Bind;

mod combiner;
pub(crate) use combiner::arity;
pub use combiner::{
   Applicative,
   Combiner,
   Compound,
   Native,
   Operative,
};

mod pair;
pub use pair::{
   Items,
   Pair,
};

pub mod path;
pub use path::{
   CommandPath,
   DirPath,
   ExtendPath,
   FileOrDirPath,
   FilePath,
   Path,
   ThunkPath,
};

pub mod pipe;
pub use pipe::{
   Sink,
   Source,
};

mod scope;
pub use scope::Scope;

mod symbol;
pub use symbol::{
   Keyword,
   Symbol,
};

mod thunk;
pub use thunk::{
   Thunk,
   ThunkSpec,
};

/// Every runtime value. Cloning is cheap, all compound variants share their
/// contents behind reference counts.
#[derive(Debug, Clone, From)]
pub enum Value {
   #[from(ignore)]
   Null,
   #[from(ignore)]
   Ignore,

   Bool(bool),
   Int(Arc<num::BigInt>),
   String(ArcStr),

   Symbol(Symbol),
   Keyword(Keyword),

   /// The empty list, shared by both list flavours.
   #[from(ignore)]
   Empty,
   /// A cell of a call form, read from `(...)`.
   #[from(ignore)]
   Pair(Pair),
   /// A cell of a data list, read from `[...]`. Equal to a [`Value::Pair`]
   /// chain with the same elements.
   #[from(ignore)]
   Cons(Pair),

   Bind(Bind),
   Scope(Scope),
   Annotate(Annotate),

   FilePath(FilePath),
   DirPath(DirPath),
   CommandPath(CommandPath),
   ExtendPath(ExtendPath),
   ThunkPath(ThunkPath),

   Thunk(Thunk),

   Operative(Operative),
   Applicative(Applicative),

   Source(Source),
   Sink(Sink),
}

impl Dupe for Value {}

impl From<i64> for Value {
   fn from(integer: i64) -> Self {
      Self::Int(Arc::new(num::BigInt::from(integer)))
   }
}

impl From<num::BigInt> for Value {
   fn from(integer: num::BigInt) -> Self {
      Self::Int(Arc::new(integer))
   }
}

impl From<&str> for Value {
   fn from(string: &str) -> Self {
      Self::String(ArcStr::from(string))
   }
}

impl From<Path> for Value {
   fn from(path: Path) -> Self {
      match path {
         Path::File(path) => Self::FilePath(path),
         Path::Dir(path) => Self::DirPath(path),
         Path::Command(path) => Self::CommandPath(path),
         Path::Extend(path) => Self::ExtendPath(path),
         Path::Thunk(path) => Self::ThunkPath(path),
      }
   }
}

impl From<FileOrDirPath> for Value {
   fn from(path: FileOrDirPath) -> Self {
      match path {
         FileOrDirPath::File(path) => Self::FilePath(path),
         FileOrDirPath::Dir(path) => Self::DirPath(path),
      }
   }
}

impl From<Combiner> for Value {
   fn from(combiner: Combiner) -> Self {
      match combiner {
         Combiner::Operative(operative) => Self::Operative(operative),
         Combiner::Applicative(applicative) => Self::Applicative(applicative),
      }
   }
}

impl PartialEq for Value {
   fn eq(&self, other: &Self) -> bool {
      match (self.unannotated(), other.unannotated()) {
         (&Value::Null, &Value::Null)
         | (&Value::Ignore, &Value::Ignore)
         | (&Value::Empty, &Value::Empty) => true,

         (&Value::Bool(a), &Value::Bool(b)) => a == b,
         (&Value::Int(ref a), &Value::Int(ref b)) => a == b,
         (&Value::String(ref a), &Value::String(ref b)) => a == b,
         (&Value::Symbol(ref a), &Value::Symbol(ref b)) => a == b,
         (&Value::Keyword(ref a), &Value::Keyword(ref b)) => a == b,

         (&(Value::Pair(ref a) | Value::Cons(ref a)), &(Value::Pair(ref b) | Value::Cons(ref b))) => {
            a == b
         },

         (&Value::Bind(ref a), &Value::Bind(ref b)) => a == b,
         (&Value::Scope(ref a), &Value::Scope(ref b)) => a == b,
         (&Value::Thunk(ref a), &Value::Thunk(ref b)) => a == b,
         (&Value::Operative(ref a), &Value::Operative(ref b)) => a == b,
         (&Value::Applicative(ref a), &Value::Applicative(ref b)) => a == b,
         (&Value::Source(ref a), &Value::Source(ref b)) => a == b,
         (&Value::Sink(ref a), &Value::Sink(ref b)) => a == b,

         (a, b) => {
            match (Path::from_value(a), Path::from_value(b)) {
               (Some(a), Some(b)) => a == b,
               _ => false,
            }
         },
      }
   }
}

impl fmt::Display for Value {
   fn fmt(&self, writer: &mut fmt::Formatter<'_>) -> fmt::Result {
      match *self {
         Value::Null => writer.write_str("null"),
         Value::Ignore => writer.write_str("_"),
         Value::Bool(boolean) => write!(writer, "{boolean}"),
         Value::Int(ref integer) => write!(writer, "{integer}"),

         Value::String(ref string) => {
            writer.write_char('"')?;
            for c in string.chars() {
               match kiln_syntax::escape(c) {
                  Some(escaped) => writer.write_str(escaped)?,
                  None => writer.write_char(c)?,
               }
            }
            writer.write_char('"')
         },

         Value::Symbol(ref symbol) => write!(writer, "{symbol}"),
         Value::Keyword(ref keyword) => write!(writer, "{keyword}"),

         Value::Empty => writer.write_str("()"),
         Value::Pair(ref pair) => pair.display(writer, '(', ')'),
         Value::Cons(ref pair) => pair.display(writer, '[', ']'),

         Value::Bind(ref bind) => write!(writer, "{bind}"),
         Value::Scope(ref scope) => write!(writer, "{scope}"),
         Value::Annotate(ref annotate) => write!(writer, "{value}", value = annotate.value()),

         Value::FilePath(ref path) => write!(writer, "{path}"),
         Value::DirPath(ref path) => write!(writer, "{path}"),
         Value::CommandPath(ref path) => write!(writer, "{path}"),
         Value::ExtendPath(ref path) => write!(writer, "{path}"),
         Value::ThunkPath(ref path) => write!(writer, "{path}"),

         Value::Thunk(ref thunk) => write!(writer, "{thunk}"),

         Value::Operative(ref operative) => write!(writer, "{operative}"),
         Value::Applicative(ref applicative) => write!(writer, "{applicative}"),

         Value::Source(ref source) => write!(writer, "{source}"),
         Value::Sink(ref sink) => write!(writer, "{sink}"),
      }
   }
}

impl Value {
   #[must_use]
   pub fn symbol(name: &str) -> Self {
      Self::Symbol(Symbol::new(name))
   }

   #[must_use]
   pub fn keyword(name: &str) -> Self {
      Self::Keyword(Keyword::new(name))
   }

   /// A call form cell.
   #[must_use]
   pub fn pair(a: Value, d: Value) -> Self {
      Self::Pair(Pair::new(a, d))
   }

   /// A data list cell.
   #[must_use]
   pub fn cons(a: Value, d: Value) -> Self {
      Self::Cons(Pair::new(a, d))
   }

   /// A proper call form holding `items`, [`Value::Empty`] when there are none.
   #[must_use]
   pub fn pair_list(items: impl IntoIterator<Item = Value, IntoIter: DoubleEndedIterator>) -> Self {
      items
         .into_iter()
         .rev()
         .fold(Self::Empty, |d, a| Self::pair(a, d))
   }

   /// A proper data list holding `items`, [`Value::Empty`] when there are none.
   #[must_use]
   pub fn cons_list(items: impl IntoIterator<Item = Value, IntoIter: DoubleEndedIterator>) -> Self {
      items
         .into_iter()
         .rev()
         .fold(Self::Empty, |d, a| Self::cons(a, d))
   }

   /// Iterates over the elements of a list of either flavour. Anything that is
   /// not a list yields nothing and becomes the tail.
   #[must_use]
   pub fn items(&self) -> Items {
      Items::new(self.dupe())
   }

   /// Strips every layer of annotation.
   #[must_use]
   pub fn unannotated(&self) -> &Self {
      let mut value = self;

      while let Value::Annotate(ref annotate) = *value {
         value = annotate.value();
      }

      value
   }

   /// Only `false` and `null` are falsy.
   #[must_use]
   pub fn is_truthy(&self) -> bool {
      !matches!(*self.unannotated(), Value::Bool(false) | Value::Null)
   }

   /// A short human name of the variant, used in error messages.
   #[must_use]
   pub fn kind(&self) -> &'static str {
      match *self {
         Value::Null => "null",
         Value::Ignore => "ignore",
         Value::Bool(_) => "bool",
         Value::Int(_) => "int",
         Value::String(_) => "string",
         Value::Symbol(_) => "symbol",
         Value::Keyword(_) => "keyword",
         Value::Empty => "empty list",
         Value::Pair(_) => "pair",
         Value::Cons(_) => "list",
         Value::Bind(_) => "bind",
         Value::Scope(_) => "scope",
         Value::Annotate(_) => "annotation",
         Value::FilePath(_) => "file path",
         Value::DirPath(_) => "directory path",
         Value::CommandPath(_) => "command path",
         Value::ExtendPath(_) => "extended path",
         Value::ThunkPath(_) => "thunk path",
         Value::Thunk(_) => "thunk",
         Value::Operative(_) => "operative",
         Value::Applicative(_) => "applicative",
         Value::Source(_) => "source",
         Value::Sink(_) => "sink",
      }
   }
}

#[cfg(test)]
mod tests {
   use pretty_assertions::assert_eq;

   use super::*;

   #[test]
   fn list_flavours_are_equal() {
      let items = || [Value::from(1), Value::from(2), Value::from(3)];

      assert_eq!(Value::pair_list(items()), Value::cons_list(items()));
      assert_eq!(Value::pair_list([]), Value::Empty);
   }

   #[test]
   fn annotations_are_transparent_to_equality() {
      let annotated = Value::Annotate(Annotate::new(
         Value::from("hi"),
         Some("greeting".into()),
         None,
      ));

      assert_eq!(annotated, Value::from("hi"));
      assert_eq!(annotated.to_string(), "\"hi\"");
   }

   #[test]
   fn only_false_and_null_are_falsy() {
      assert!(!Value::Bool(false).is_truthy());
      assert!(!Value::Null.is_truthy());
      assert!(Value::Empty.is_truthy());
      assert!(Value::from(0).is_truthy());
      assert!(Value::from("").is_truthy());
   }

   #[test]
   fn display_rereads() {
      let value = Value::cons_list([
         Value::from("a\tb\"c"),
         Value::keyword("key"),
         Value::pair(Value::symbol("foo"), Value::symbol("bar")),
      ]);

      assert_eq!(value.to_string(), r#"["a\tb\"c" :key (foo & bar)]"#);
   }
}
