//! A serde [`Deserializer`](de::Deserializer) reading straight from runtime
//! values, so any `Deserialize` type can be decoded from a scope or bind.

use std::vec;

use kiln_util::Dupe;
use num::ToPrimitive as _;
use serde::de::{
   self,
   IntoDeserializer as _,
};

use crate::{
   FileOrDirPath,
   Value,
};

#[derive(thiserror::Error, Debug)]
#[error("{0}")]
pub struct RecordError(String);

impl de::Error for RecordError {
   fn custom<T: std::fmt::Display>(message: T) -> Self {
      Self(message.to_string())
   }
}

/// Key/value entries of values that decode as maps, `None` for every other
/// value.
fn entries(value: &Value) -> Result<Option<Vec<(String, Value)>>, RecordError> {
   let file_or_dir = |path: &FileOrDirPath| Value::from(path.dupe());

   Ok(Some(match *value.unannotated() {
      Value::Bind(ref bind) => {
         if bind.len() % 2 != 0 {
            return Err(de::Error::custom(format_args!(
               "bind {bind} has a key without a value"
            )));
         }

         bind
            .pairs()
            .map(|(key, value)| Ok((key_name(key)?, value.dupe())))
            .collect::<Result<Vec<_>, RecordError>>()?
      },

      // Same view the JSON encoding takes: inherited bindings, nearest first.
      Value::Scope(ref scope) => {
         scope
            .visible_bindings()
            .into_iter()
            .map(|(symbol, value)| (symbol.name().to_owned(), value))
            .collect()
      },

      Value::FilePath(ref path) => vec![("file".to_owned(), Value::from(path.path()))],
      Value::DirPath(ref path) => vec![("dir".to_owned(), Value::from(path.path()))],
      Value::CommandPath(ref path) => vec![("command".to_owned(), Value::from(path.name()))],

      Value::ExtendPath(ref path) => {
         vec![
            ("parent".to_owned(), path.parent().dupe()),
            ("child".to_owned(), file_or_dir(path.child())),
         ]
      },

      Value::ThunkPath(ref path) => {
         vec![
            ("thunk".to_owned(), Value::Thunk(path.thunk().dupe())),
            ("path".to_owned(), file_or_dir(path.path())),
         ]
      },

      Value::Thunk(ref thunk) => {
         let spec = thunk.spec();
         let mut entries = vec![("cmd".to_owned(), Value::from(spec.cmd.dupe()))];

         if !spec.args.is_empty() {
            entries.push(("args".to_owned(), Value::cons_list(spec.args.clone())));
         }

         if !spec.stdin.is_empty() {
            entries.push(("stdin".to_owned(), Value::cons_list(spec.stdin.clone())));
         }

         if let Some(ref env) = spec.env {
            entries.push(("env".to_owned(), Value::Scope(env.dupe())));
         }

         if let Some(ref dir) = spec.dir {
            entries.push(("dir".to_owned(), Value::from(dir.dupe())));
         }

         entries
      },

      _ => return Ok(None),
   }))
}

fn key_name(key: &Value) -> Result<String, RecordError> {
   match *key.unannotated() {
      Value::Keyword(ref keyword) => Ok(keyword.name().to_owned()),
      Value::Symbol(ref symbol) => Ok(symbol.name().to_owned()),
      Value::String(ref string) => Ok(string.to_string()),
      ref other => {
         Err(de::Error::custom(format_args!(
            "record keys must be keywords, symbols or strings, got {kind} {other}",
            kind = other.kind(),
         )))
      },
   }
}

/// Deserializes a single [`Value`].
pub struct ValueDeserializer {
   value: Value,
}

impl ValueDeserializer {
   #[must_use]
   pub fn new(value: Value) -> Self {
      Self { value }
   }
}

impl<'de> de::Deserializer<'de> for ValueDeserializer {
   type Error = RecordError;

   fn deserialize_any<V: de::Visitor<'de>>(self, visitor: V) -> Result<V::Value, Self::Error> {
      if let Some(entries) = entries(&self.value)? {
         return visitor.visit_map(MapDeserializer::new(entries));
      }

      match *self.value.unannotated() {
         Value::Null | Value::Ignore => visitor.visit_unit(),
         Value::Bool(boolean) => visitor.visit_bool(boolean),

         Value::Int(ref integer) => {
            if let Some(integer) = integer.to_i64() {
               visitor.visit_i64(integer)
            } else if let Some(integer) = integer.to_u64() {
               visitor.visit_u64(integer)
            } else {
               Err(de::Error::custom(format_args!(
                  "integer {integer} does not fit in 64 bits"
               )))
            }
         },

         Value::String(ref string) => visitor.visit_str(string),
         Value::Symbol(ref symbol) => visitor.visit_str(symbol.name()),
         Value::Keyword(ref keyword) => visitor.visit_str(keyword.name()),

         ref list @ (Value::Empty | Value::Pair(_) | Value::Cons(_)) => {
            let mut items = list.items();
            let collected = items.by_ref().collect::<Vec<_>>();

            if !matches!(*items.tail().unannotated(), Value::Empty) {
               return Err(de::Error::custom(format_args!(
                  "cannot decode improper list {list}"
               )));
            }

            visitor.visit_seq(SeqDeserializer {
               items: collected.into_iter(),
            })
         },

         ref other => {
            Err(de::Error::custom(format_args!(
               "cannot decode {kind} {other}",
               kind = other.kind(),
            )))
         },
      }
   }

   fn deserialize_option<V: de::Visitor<'de>>(self, visitor: V) -> Result<V::Value, Self::Error> {
      match *self.value.unannotated() {
         Value::Null => visitor.visit_none(),
         _ => visitor.visit_some(self),
      }
   }

   fn deserialize_newtype_struct<V: de::Visitor<'de>>(
      self,
      _name: &'static str,
      visitor: V,
   ) -> Result<V::Value, Self::Error> {
      visitor.visit_newtype_struct(self)
   }

   fn deserialize_struct<V: de::Visitor<'de>>(
      self,
      _name: &'static str,
      fields: &'static [&'static str],
      visitor: V,
   ) -> Result<V::Value, Self::Error> {
      let Some(entries) = entries(&self.value)? else {
         return self.deserialize_any(visitor);
      };

      if let Some(&(ref unknown, _)) = entries
         .iter()
         .find(|&&(ref key, _)| !fields.contains(&key.as_str()))
      {
         return Err(de::Error::unknown_field(unknown, fields));
      }

      visitor.visit_map(MapDeserializer::new(entries))
   }

   fn deserialize_enum<V: de::Visitor<'de>>(
      self,
      _name: &'static str,
      _variants: &'static [&'static str],
      visitor: V,
   ) -> Result<V::Value, Self::Error> {
      match *self.value.unannotated() {
         Value::String(ref string) => visitor.visit_enum(string.to_string().into_deserializer()),
         Value::Symbol(ref symbol) => visitor.visit_enum(symbol.name().to_owned().into_deserializer()),
         Value::Keyword(ref keyword) => {
            visitor.visit_enum(keyword.name().to_owned().into_deserializer())
         },
         _ => self.deserialize_any(visitor),
      }
   }

   serde::forward_to_deserialize_any! {
      bool i8 i16 i32 i64 i128 u8 u16 u32 u64 u128 f32 f64 char str string
      bytes byte_buf unit unit_struct seq tuple tuple_struct map identifier
      ignored_any
   }
}

struct SeqDeserializer {
   items: vec::IntoIter<Value>,
}

impl<'de> de::SeqAccess<'de> for SeqDeserializer {
   type Error = RecordError;

   fn next_element_seed<T: de::DeserializeSeed<'de>>(
      &mut self,
      seed: T,
   ) -> Result<Option<T::Value>, Self::Error> {
      self
         .items
         .next()
         .map(|item| seed.deserialize(ValueDeserializer::new(item)))
         .transpose()
   }

   fn size_hint(&self) -> Option<usize> {
      Some(self.items.len())
   }
}

struct MapDeserializer {
   entries: vec::IntoIter<(String, Value)>,
   value:   Option<Value>,
}

impl MapDeserializer {
   fn new(entries: Vec<(String, Value)>) -> Self {
      Self {
         entries: entries.into_iter(),
         value:   None,
      }
   }
}

impl<'de> de::MapAccess<'de> for MapDeserializer {
   type Error = RecordError;

   fn next_key_seed<K: de::DeserializeSeed<'de>>(
      &mut self,
      seed: K,
   ) -> Result<Option<K::Value>, Self::Error> {
      let Some((key, value)) = self.entries.next() else {
         return Ok(None);
      };

      self.value = Some(value);
      seed.deserialize(key.into_deserializer()).map(Some)
   }

   fn next_value_seed<V: de::DeserializeSeed<'de>>(
      &mut self,
      seed: V,
   ) -> Result<V::Value, Self::Error> {
      match self.value.take() {
         Some(value) => seed.deserialize(ValueDeserializer::new(value)),
         None => Err(de::Error::custom("value requested before its key")),
      }
   }

   fn size_hint(&self) -> Option<usize> {
      Some(self.entries.len())
   }
}

#[cfg(test)]
mod tests {
   use pretty_assertions::assert_eq;
   use serde::Deserialize;

   use super::*;
   use crate::{
      Bind,
      Scope,
      Symbol,
   };

   #[derive(Debug, PartialEq, Deserialize)]
   #[serde(rename_all = "kebab-case")]
   enum Mode {
      Fast,
      Careful,
   }

   #[derive(Debug, PartialEq, Deserialize)]
   struct Settings {
      mode:    Mode,
      retries: Option<u32>,
      tags:    Vec<String>,
   }

   #[test]
   fn scopes_decode_into_records() {
      let scope = Scope::empty();
      scope.set(Symbol::new("mode"), Value::keyword("careful"));
      scope.set(Symbol::new("retries"), Value::Null);
      scope.set(
         Symbol::new("tags"),
         Value::cons_list([Value::from("a"), Value::symbol("b")]),
      );

      assert_eq!(
         Value::Scope(scope).decode_struct::<Settings>().ok(),
         Some(Settings {
            mode:    Mode::Careful,
            retries: None,
            tags:    vec!["a".to_owned(), "b".to_owned()],
         }),
      );
   }

   #[test]
   fn child_scopes_decode_with_inherited_bindings() {
      let parent = Scope::empty();
      parent.set(Symbol::new("mode"), Value::keyword("fast"));
      parent.set(Symbol::new("tags"), Value::Empty);

      let child = parent.child();
      child.set(Symbol::new("mode"), Value::keyword("careful"));
      child.set(Symbol::new("retries"), Value::from(2));

      let child = Value::Scope(child);

      assert_eq!(
         child.decode_struct::<Settings>().ok(),
         Some(Settings {
            mode:    Mode::Careful,
            retries: Some(2),
            tags:    Vec::new(),
         }),
      );

      assert_eq!(
         serde_json::to_value(&child).ok(),
         Some(serde_json::json!({ "mode": "careful", "retries": 2, "tags": [] })),
      );
   }

   #[test]
   fn odd_binds_are_rejected() {
      let bind = Value::Bind(Bind::from_iter([Value::keyword("mode")]));

      assert!(bind.decode_struct::<Settings>().is_err());
   }
}
