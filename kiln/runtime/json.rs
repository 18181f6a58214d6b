//! Mapping between values and the serde data model.
//!
//! Paths encode as single-purpose objects (`{"file": ...}`, `{"dir": ...}`,
//! `{"command": ...}`, `{"parent": ..., "child": ...}` and
//! `{"thunk": ..., "path": ...}`) and decode back from exactly those key sets.
//! Every other object decodes as a scope. Combiners and pipes cannot be
//! encoded.

use std::fmt;

use kiln_util::{
   Dupe,
   OptionDupedExt as _,
};
use num::ToPrimitive as _;
use serde::{
   Deserialize,
   Serialize,
   de,
   ser::{
      self,
      SerializeMap as _,
   },
};

use crate::{
   CommandPath,
   DecodeError,
   DirPath,
   ExtendPath,
   FileOrDirPath,
   FilePath,
   Scope,
   Symbol,
   Thunk,
   ThunkPath,
   Value,
};

impl Serialize for Value {
   fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
      fn single<S: serde::Serializer>(
         serializer: S,
         key: &str,
         value: &str,
      ) -> Result<S::Ok, S::Error> {
         let mut map = serializer.serialize_map(Some(1))?;
         map.serialize_entry(key, value)?;
         map.end()
      }

      match *self {
         Value::Null | Value::Ignore => serializer.serialize_unit(),
         Value::Bool(boolean) => serializer.serialize_bool(boolean),

         Value::Int(ref integer) => {
            if let Some(integer) = integer.to_i64() {
               serializer.serialize_i64(integer)
            } else if let Some(integer) = integer.to_u64() {
               serializer.serialize_u64(integer)
            } else {
               Err(ser::Error::custom(format_args!(
                  "integer {integer} does not fit in 64 bits"
               )))
            }
         },

         Value::String(ref string) => serializer.serialize_str(string),
         Value::Symbol(ref symbol) => serializer.serialize_str(symbol.name()),
         Value::Keyword(ref keyword) => serializer.serialize_str(keyword.name()),

         Value::Empty | Value::Pair(_) | Value::Cons(_) => {
            let mut items = self.items();
            let collected = items.by_ref().collect::<Vec<_>>();

            if !matches!(*items.tail().unannotated(), Value::Empty) {
               return Err(ser::Error::custom(format_args!(
                  "cannot encode improper list {self}"
               )));
            }

            serializer.collect_seq(collected)
         },

         Value::Bind(ref bind) => {
            if bind.len() % 2 != 0 {
               return Err(ser::Error::custom(format_args!(
                  "cannot encode bind {bind} with a key without a value"
               )));
            }

            let mut map = serializer.serialize_map(Some(bind.len() / 2))?;

            for (key, value) in bind.pairs() {
               match *key.unannotated() {
                  Value::Keyword(ref keyword) => map.serialize_entry(keyword.name(), value)?,
                  Value::Symbol(ref symbol) => map.serialize_entry(symbol.name(), value)?,
                  Value::String(ref string) => map.serialize_entry(string.as_str(), value)?,
                  ref other => {
                     return Err(ser::Error::custom(format_args!(
                        "cannot encode {kind} {other} as an object key",
                        kind = other.kind(),
                     )));
                  },
               }
            }

            map.end()
         },

         Value::Scope(ref scope) => {
            serializer.collect_map(
               scope
                  .visible_bindings()
                  .into_iter()
                  .map(|(symbol, value)| (symbol.name().to_owned(), value)),
            )
         },

         Value::Annotate(ref annotate) => annotate.value().serialize(serializer),

         Value::FilePath(ref path) => single(serializer, "file", path.path()),
         Value::DirPath(ref path) => single(serializer, "dir", path.path()),
         Value::CommandPath(ref path) => single(serializer, "command", path.name()),

         Value::ExtendPath(ref path) => {
            let mut map = serializer.serialize_map(Some(2))?;
            map.serialize_entry("parent", path.parent())?;
            map.serialize_entry("child", &Value::from(path.child().dupe()))?;
            map.end()
         },

         Value::ThunkPath(ref path) => {
            let mut map = serializer.serialize_map(Some(2))?;
            map.serialize_entry("thunk", path.thunk())?;
            map.serialize_entry("path", &Value::from(path.path().dupe()))?;
            map.end()
         },

         Value::Thunk(ref thunk) => thunk.serialize(serializer),

         Value::Operative(_) | Value::Applicative(_) | Value::Source(_) | Value::Sink(_) => {
            Err(ser::Error::custom(format_args!(
               "cannot encode {kind} {self}",
               kind = self.kind(),
            )))
         },
      }
   }
}

impl Value {
   /// Builds the value an object decodes to. Objects with the key set of an
   /// encoded path become that path, everything else becomes a scope.
   pub fn from_entries(entries: Vec<(String, Value)>) -> Result<Value, DecodeError> {
      let mut keys = entries.iter().map(|&(ref key, _)| key.as_str()).collect::<Vec<_>>();
      keys.sort_unstable();

      let get = |wanted: &str| {
         entries
            .iter()
            .find_map(|&(ref key, ref value)| (key == wanted).then_some(value))
      };

      let path = match (keys.as_slice(), get(keys.first().copied().unwrap_or_default())) {
         (&["file"], Some(&Value::String(ref path))) => Some(Value::FilePath(FilePath::new(path))),
         (&["dir"], Some(&Value::String(ref path))) => Some(Value::DirPath(DirPath::new(path))),
         (&["command"], Some(&Value::String(ref name))) => {
            Some(Value::CommandPath(CommandPath::new(name)))
         },

         (&["child", "parent"], Some(child)) => {
            let parent = get("parent").duped().unwrap_or(Value::Null);
            Some(Value::ExtendPath(ExtendPath::new(parent, child.decode()?)))
         },

         (&["path", "thunk"], Some(path)) => {
            let thunk = get("thunk").duped().unwrap_or(Value::Null);
            Some(Value::ThunkPath(ThunkPath::new(
               thunk.decode::<Thunk>()?,
               path.decode::<FileOrDirPath>()?,
            )))
         },

         _ => None,
      };

      if let Some(path) = path {
         return Ok(path);
      }

      let scope = Scope::empty();
      for (key, value) in entries {
         scope.set(Symbol::new(&key), value);
      }

      Ok(Value::Scope(scope))
   }
}

struct ValueVisitor;

impl<'de> de::Visitor<'de> for ValueVisitor {
   type Value = Value;

   fn expecting(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
      formatter.write_str("a value")
   }

   fn visit_unit<E: de::Error>(self) -> Result<Self::Value, E> {
      Ok(Value::Null)
   }

   fn visit_none<E: de::Error>(self) -> Result<Self::Value, E> {
      Ok(Value::Null)
   }

   fn visit_some<D: de::Deserializer<'de>>(self, deserializer: D) -> Result<Self::Value, D::Error> {
      Value::deserialize(deserializer)
   }

   fn visit_bool<E: de::Error>(self, boolean: bool) -> Result<Self::Value, E> {
      Ok(Value::Bool(boolean))
   }

   fn visit_i64<E: de::Error>(self, integer: i64) -> Result<Self::Value, E> {
      Ok(Value::from(integer))
   }

   fn visit_u64<E: de::Error>(self, integer: u64) -> Result<Self::Value, E> {
      Ok(Value::from(num::BigInt::from(integer)))
   }

   fn visit_f64<E: de::Error>(self, float: f64) -> Result<Self::Value, E> {
      Err(E::custom(format_args!(
         "cannot decode {float}, floating point numbers are not supported"
      )))
   }

   fn visit_str<E: de::Error>(self, string: &str) -> Result<Self::Value, E> {
      Ok(Value::from(string))
   }

   fn visit_seq<A: de::SeqAccess<'de>>(self, mut seq: A) -> Result<Self::Value, A::Error> {
      let mut items = Vec::with_capacity(seq.size_hint().unwrap_or(0));

      while let Some(item) = seq.next_element::<Value>()? {
         items.push(item);
      }

      Ok(Value::cons_list(items))
   }

   fn visit_map<A: de::MapAccess<'de>>(self, mut map: A) -> Result<Self::Value, A::Error> {
      let mut entries = Vec::with_capacity(map.size_hint().unwrap_or(0));

      while let Some(entry) = map.next_entry::<String, Value>()? {
         entries.push(entry);
      }

      Value::from_entries(entries).map_err(de::Error::custom)
   }
}

impl<'de> Deserialize<'de> for Value {
   fn deserialize<D: de::Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
      deserializer.deserialize_any(ValueVisitor)
   }
}

#[derive(Deserialize)]
#[serde(deny_unknown_fields)]
struct ThunkPathRecord {
   thunk: Thunk,
   path:  Value,
}

impl<'de> Deserialize<'de> for ThunkPath {
   fn deserialize<D: de::Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
      let record = ThunkPathRecord::deserialize(deserializer)?;

      Ok(ThunkPath::new(
         record.thunk,
         record.path.decode().map_err(de::Error::custom)?,
      ))
   }
}
