use std::{
   any,
   sync::Arc,
};

use arcstr::ArcStr;
use kiln_util::Dupe;
use num::ToPrimitive as _;
use serde::de::DeserializeOwned;

use crate::{
   Annotate,
   Applicative,
   Bind,
   Combiner,
   CommandPath,
   DecodeError,
   DirPath,
   ExtendPath,
   FileOrDirPath,
   FilePath,
   Keyword,
   Operative,
   Pair,
   Path,
   Scope,
   Sink,
   Source,
   Symbol,
   Thunk,
   ThunkPath,
   Value,
   record,
   value::path,
};

/// A destination a [`Value`] can be decoded into.
///
/// Annotations are looked through, except when decoding into [`Annotate`]
/// or [`Value`] itself.
pub trait Decode: Sized {
   /// A short name of the accepted shape, used in errors.
   const SHAPE: &'static str;

   fn decode(value: &Value) -> Result<Self, DecodeError>;
}

macro_rules! decode_variant {
   ($type:ty, $shape:literal, $pattern:pat => $result:expr) => {
      impl Decode for $type {
         const SHAPE: &'static str = $shape;

         fn decode(value: &Value) -> Result<Self, DecodeError> {
            match *value.unannotated() {
               $pattern => Ok($result),
               _ => Err(DecodeError::new(value, Self::SHAPE)),
            }
         }
      }
   };
}

/// Decodes only from `null`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Null;

/// Decodes only from `_`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Ignore;

/// Decodes only from the empty list.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Empty;

decode_variant!(Null, "null", Value::Null => Null);
decode_variant!(Ignore, "ignore", Value::Ignore => Ignore);
decode_variant!(Empty, "empty list", Value::Empty => Empty);
decode_variant!(bool, "bool", Value::Bool(boolean) => boolean);
decode_variant!(Arc<num::BigInt>, "int", Value::Int(ref integer) => integer.dupe());
decode_variant!(num::BigInt, "int", Value::Int(ref integer) => (**integer).clone());
decode_variant!(ArcStr, "string", Value::String(ref string) => string.clone());
decode_variant!(String, "string", Value::String(ref string) => string.to_string());
decode_variant!(Symbol, "symbol", Value::Symbol(ref symbol) => symbol.dupe());
decode_variant!(Keyword, "keyword", Value::Keyword(ref keyword) => keyword.dupe());
decode_variant!(Pair, "pair", Value::Pair(ref pair) | Value::Cons(ref pair) => pair.dupe());
decode_variant!(Bind, "bind", Value::Bind(ref bind) => bind.dupe());
decode_variant!(Scope, "scope", Value::Scope(ref scope) => scope.dupe());
decode_variant!(FilePath, "file path", Value::FilePath(ref path) => path.dupe());
decode_variant!(DirPath, "directory path", Value::DirPath(ref path) => path.dupe());
decode_variant!(CommandPath, "command path", Value::CommandPath(ref path) => path.dupe());
decode_variant!(ExtendPath, "extended path", Value::ExtendPath(ref path) => path.dupe());
decode_variant!(Operative, "operative", Value::Operative(ref operative) => operative.dupe());
decode_variant!(Source, "source", Value::Source(ref source) => source.dupe());
decode_variant!(Sink, "sink", Value::Sink(ref sink) => sink.dupe());

impl Decode for Value {
   const SHAPE: &'static str = "any value";

   fn decode(value: &Value) -> Result<Self, DecodeError> {
      Ok(value.dupe())
   }
}

impl Decode for Annotate {
   const SHAPE: &'static str = "annotation";

   fn decode(value: &Value) -> Result<Self, DecodeError> {
      match *value {
         Value::Annotate(ref annotate) => Ok(annotate.dupe()),
         _ => Err(DecodeError::new(value, Self::SHAPE)),
      }
   }
}

impl Decode for i64 {
   const SHAPE: &'static str = "int";

   fn decode(value: &Value) -> Result<Self, DecodeError> {
      value.decode::<Arc<num::BigInt>>()?.to_i64().ok_or_else(|| {
         DecodeError::new(value, Self::SHAPE).with_reason("does not fit in 64 bits")
      })
   }
}

impl Decode for Path {
   const SHAPE: &'static str = "path";

   fn decode(value: &Value) -> Result<Self, DecodeError> {
      Path::from_value(value).ok_or_else(|| DecodeError::new(value, Self::SHAPE))
   }
}

impl Decode for FileOrDirPath {
   const SHAPE: &'static str = "file or directory path";

   fn decode(value: &Value) -> Result<Self, DecodeError> {
      match *value.unannotated() {
         Value::FilePath(ref path) => Ok(FileOrDirPath::File(path.dupe())),
         Value::DirPath(ref path) => Ok(FileOrDirPath::Dir(path.dupe())),

         // An evaluated `./foo/` is an extension of `.`, take its logical path.
         Value::ExtendPath(ref path) => {
            let Some(logical) = Path::Extend(path.dupe()).logical() else {
               return Err(DecodeError::new(value, Self::SHAPE)
                  .with_reason("the path is relative to an unresolved parent"));
            };

            Ok(match logical.strip_suffix(path::SEPARATOR) {
               Some(dir) => FileOrDirPath::Dir(DirPath::new(dir)),
               None => FileOrDirPath::File(FilePath::new(&logical)),
            })
         },

         _ => Err(DecodeError::new(value, Self::SHAPE)),
      }
   }
}

// Thunks and thunk paths know how to build themselves from records.

impl Decode for Thunk {
   const SHAPE: &'static str = "thunk";

   fn decode(value: &Value) -> Result<Self, DecodeError> {
      match *value.unannotated() {
         Value::Thunk(ref thunk) => Ok(thunk.dupe()),
         Value::Scope(_) | Value::Bind(_) => value.decode_struct(),
         _ => Err(DecodeError::new(value, Self::SHAPE)),
      }
   }
}

impl Decode for ThunkPath {
   const SHAPE: &'static str = "thunk path";

   fn decode(value: &Value) -> Result<Self, DecodeError> {
      match *value.unannotated() {
         Value::ThunkPath(ref path) => Ok(path.dupe()),
         Value::Scope(_) | Value::Bind(_) => value.decode_struct(),
         _ => Err(DecodeError::new(value, Self::SHAPE)),
      }
   }
}

impl Decode for Applicative {
   const SHAPE: &'static str = "applicative";

   fn decode(value: &Value) -> Result<Self, DecodeError> {
      let operative = match *value.unannotated() {
         Value::Applicative(ref applicative) => return Ok(applicative.dupe()),

         Value::Keyword(ref keyword) => Operative::Keyword(keyword.dupe()),
         Value::Thunk(ref thunk) => Operative::Thunk(thunk.dupe()),

         ref other => {
            match Path::from_value(other) {
               Some(path) => Operative::Path(path),
               None => return Err(DecodeError::new(value, Self::SHAPE)),
            }
         },
      };

      Ok(Applicative::wrap(operative))
   }
}

impl Decode for Combiner {
   const SHAPE: &'static str = "combiner";

   fn decode(value: &Value) -> Result<Self, DecodeError> {
      match *value.unannotated() {
         Value::Operative(ref operative) => Ok(Combiner::Operative(operative.dupe())),
         _ => {
            Applicative::decode(value)
               .map(Combiner::Applicative)
               .map_err(|_| DecodeError::new(value, Self::SHAPE))
         },
      }
   }
}

impl<T: Decode> Decode for Vec<T> {
   const SHAPE: &'static str = "list";

   fn decode(value: &Value) -> Result<Self, DecodeError> {
      let mut items = value.items();
      let decoded = items.by_ref().map(|item| T::decode(&item)).collect::<Result<Vec<_>, _>>()?;

      match *items.tail().unannotated() {
         Value::Empty => Ok(decoded),
         _ => Err(DecodeError::new(value, Self::SHAPE).with_reason("the list is not proper")),
      }
   }
}

impl<T: Decode> Decode for Option<T> {
   const SHAPE: &'static str = T::SHAPE;

   fn decode(value: &Value) -> Result<Self, DecodeError> {
      match *value.unannotated() {
         Value::Null => Ok(None),
         _ => T::decode(value).map(Some),
      }
   }
}

fn short_type_name<T>() -> &'static str {
   let name = any::type_name::<T>();
   let name = name.split('<').next().unwrap_or(name);

   name.rsplit("::").next().unwrap_or(name)
}

impl Value {
   pub fn decode<T: Decode>(&self) -> Result<T, DecodeError> {
      T::decode(self)
   }

   /// Decodes a scope or bind into a record type through serde.
   ///
   /// Keys the record does not declare are rejected, unless the record
   /// flattens the remaining keys into a map.
   pub fn decode_struct<T: DeserializeOwned>(&self) -> Result<T, DecodeError> {
      let destination = short_type_name::<T>();

      match *self.unannotated() {
         ref record @ (Value::Scope(_) | Value::Bind(_)) => {
            T::deserialize(record::ValueDeserializer::new(record.dupe()))
               .map_err(|error| DecodeError::new(self, destination).with_reason(error))
         },

         _ => Err(DecodeError::new(self, destination)),
      }
   }
}

#[cfg(test)]
mod tests {
   use std::collections::BTreeMap;

   use pretty_assertions::assert_eq;
   use serde::Deserialize;

   use super::*;
   use crate::{
      Native,
      value::pipe::{
         InMemorySink,
         InMemorySource,
      },
   };

   fn decodes<T: Decode>(value: &Value) -> bool {
      value.decode::<T>().is_ok()
   }

   #[test]
   fn every_variant_decodes_into_its_own_type() {
      let thunk = Thunk::run(Path::Command(CommandPath::new("make")));

      let cases: Vec<(Value, fn(&Value) -> bool)> = vec![
         (Value::Null, decodes::<Null>),
         (Value::Ignore, decodes::<Ignore>),
         (Value::Bool(true), decodes::<bool>),
         (Value::from(42), decodes::<Arc<num::BigInt>>),
         (Value::from("a"), decodes::<ArcStr>),
         (Value::symbol("a"), decodes::<Symbol>),
         (Value::keyword("a"), decodes::<Keyword>),
         (Value::Empty, decodes::<Empty>),
         (Value::pair_list([Value::from(1)]), decodes::<Pair>),
         (Value::cons_list([Value::from(1)]), decodes::<Pair>),
         (Value::Bind(Bind::from_iter(Vec::new())), decodes::<Bind>),
         (Value::Scope(Scope::empty()), decodes::<Scope>),
         (
            Value::Annotate(Annotate::new(Value::from(1), None, None)),
            decodes::<Annotate>,
         ),
         (Value::FilePath(FilePath::new("file")), decodes::<FilePath>),
         (Value::DirPath(DirPath::new("dir")), decodes::<DirPath>),
         (Value::CommandPath(CommandPath::new("ls")), decodes::<CommandPath>),
         (
            Value::ExtendPath(ExtendPath::new(
               Value::DirPath(DirPath::new(".")),
               FileOrDirPath::File(FilePath::new("file")),
            )),
            decodes::<ExtendPath>,
         ),
         (
            Value::ThunkPath(ThunkPath::new(
               thunk.dupe(),
               FileOrDirPath::File(FilePath::new("out")),
            )),
            decodes::<ThunkPath>,
         ),
         (Value::Thunk(thunk), decodes::<Thunk>),
         (
            Value::Operative(Native::operative("noop", |_, _, _, cont| cont.call(Value::Null))),
            decodes::<Operative>,
         ),
         (
            Value::Applicative(Native::applicative("null", |_| Ok(Value::Null))),
            decodes::<Applicative>,
         ),
         (
            Value::Source(Source::new(InMemorySource::new(Vec::new()))),
            decodes::<Source>,
         ),
         (Value::Sink(Sink::new(InMemorySink::new())), decodes::<Sink>),
      ];

      for (value, decodes) in cases {
         assert!(decodes(&value), "{value:?}");
         assert_eq!(value.decode::<Value>().ok(), Some(value));
      }
   }

   #[test]
   fn unit_variants_do_not_mix() {
      assert!(Value::Null.decode::<Empty>().is_err());
      assert!(Value::Empty.decode::<Null>().is_err());
      assert!(Value::Ignore.decode::<Null>().is_err());
      assert_eq!(Value::Null.decode::<Option<i64>>().ok(), Some(None));
   }

   #[test]
   fn int_is_not_a_path() {
      let Err(error) = Value::from(42).decode::<Path>() else {
         panic!("an int must not decode as a path");
      };

      assert_eq!(error.destination, "path");
      assert_eq!(error.to_string(), "expected path, got int 42");
   }

   #[test]
   fn annotations_are_looked_through() {
      let annotated = Value::Annotate(Annotate::new(Value::from(7), None, None));

      assert_eq!(annotated.decode::<i64>().ok(), Some(7));
      assert!(annotated.decode::<Annotate>().is_ok());
      assert!(Value::from(7).decode::<Annotate>().is_err());
   }

   #[test]
   fn capabilities_become_combiners() {
      assert!(matches!(
         Value::keyword("name").decode::<Combiner>(),
         Ok(Combiner::Applicative(_)),
      ));
      assert!(matches!(
         Value::CommandPath(CommandPath::new("ls")).decode::<Applicative>(),
         Ok(_),
      ));
      assert!(Value::from("ls").decode::<Combiner>().is_err());
   }

   #[test]
   fn resolved_extensions_are_file_or_dir_paths() {
      let extended = Value::ExtendPath(ExtendPath::new(
         Value::DirPath(DirPath::new(".")),
         FileOrDirPath::Dir(DirPath::new("out")),
      ));

      assert_eq!(
         extended.decode::<FileOrDirPath>().ok(),
         Some(FileOrDirPath::Dir(DirPath::new("out"))),
      );

      let unresolved = Value::ExtendPath(ExtendPath::new(
         Value::symbol("base"),
         FileOrDirPath::File(FilePath::new("bin")),
      ));

      assert!(unresolved.decode::<FileOrDirPath>().is_err());
   }

   #[test]
   fn lists_must_be_proper() {
      let proper = Value::cons_list([Value::from(1), Value::from(2)]);
      let improper = Value::cons(Value::from(1), Value::from(2));

      assert_eq!(proper.decode::<Vec<i64>>().ok(), Some(vec![1, 2]));
      assert!(improper.decode::<Vec<i64>>().is_err());
   }

   #[derive(Debug, PartialEq, Deserialize)]
   struct Strict {
      name:  String,
      count: i64,
   }

   #[derive(Debug, PartialEq, Deserialize)]
   struct Loose {
      name: String,

      #[serde(flatten)]
      rest: BTreeMap<String, Value>,
   }

   fn record() -> Value {
      Value::Bind(Bind::from_iter([
         Value::keyword("name"),
         Value::from("kiln"),
         Value::keyword("count"),
         Value::from(3),
         Value::keyword("extra"),
         Value::Bool(true),
      ]))
   }

   #[test]
   fn structs_reject_unknown_keys() {
      let Err(error) = record().decode_struct::<Strict>() else {
         panic!("unknown keys must be rejected");
      };

      assert_eq!(error.destination, "Strict");
      assert!(error.to_string().contains("extra"));
   }

   #[test]
   fn structs_require_their_fields() {
      let record = Value::Bind(Bind::from_iter([Value::keyword("name"), Value::from("kiln")]));

      let Err(error) = record.decode_struct::<Strict>() else {
         panic!("a missing field must be rejected");
      };

      assert_eq!(error.destination, "Strict");
      assert!(error.to_string().contains("count"), "{error}");
   }

   #[test]
   fn flattened_structs_keep_unknown_keys() {
      let loose = record().decode_struct::<Loose>().ok();

      assert_eq!(
         loose,
         Some(Loose {
            name: "kiln".to_owned(),
            rest: BTreeMap::from([
               ("count".to_owned(), Value::from(3)),
               ("extra".to_owned(), Value::Bool(true)),
            ]),
         }),
      );
   }

   #[test]
   fn thunks_decode_from_records() {
      let record = Value::Bind(Bind::from_iter([
         Value::keyword("cmd"),
         Value::CommandPath(CommandPath::new("echo")),
         Value::keyword("args"),
         Value::cons_list([Value::from("hi")]),
      ]));

      let thunk = record.decode::<Thunk>().ok();

      assert_eq!(
         thunk,
         Some(
            Thunk::run(Path::Command(CommandPath::new("echo")))
               .with_args(vec![Value::from("hi")])
         ),
      );
   }
}
