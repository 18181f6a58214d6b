use std::fmt;

use kiln_util::Dupe;
use rpds::VectorSync;

use crate::Value;

/// An ordered sequence of alternating keys and values, read from `{...}`.
///
/// A bind of odd length is representable so the reader can keep what was
/// written. Evaluating one fails.
#[derive(Debug, Clone)]
pub struct Bind(VectorSync<Value>);

impl Dupe for Bind {}

impl Default for Bind {
   fn default() -> Self {
      Self(VectorSync::new_sync())
   }
}

impl PartialEq for Bind {
   fn eq(&self, other: &Self) -> bool {
      self.len() == other.len() && self.iter().zip(other.iter()).all(|(a, b)| a == b)
   }
}

impl FromIterator<Value> for Bind {
   fn from_iter<I: IntoIterator<Item = Value>>(iter: I) -> Self {
      let mut values = VectorSync::new_sync();

      for value in iter {
         values.push_back_mut(value);
      }

      Self(values)
   }
}

impl fmt::Display for Bind {
   fn fmt(&self, writer: &mut fmt::Formatter<'_>) -> fmt::Result {
      writer.write_str("{")?;

      for (index, value) in self.iter().enumerate() {
         if index != 0 {
            writer.write_str(" ")?;
         }

         write!(writer, "{value}")?;
      }

      writer.write_str("}")
   }
}

impl Bind {
   #[must_use]
   pub fn new() -> Self {
      Self::default()
   }

   #[must_use]
   pub fn len(&self) -> usize {
      self.0.len()
   }

   #[must_use]
   pub fn is_empty(&self) -> bool {
      self.0.is_empty()
   }

   pub fn iter(&self) -> impl Iterator<Item = &Value> {
      self.0.iter()
   }

   /// A new bind with `value` appended.
   #[must_use]
   pub fn push(&self, value: Value) -> Self {
      Self(self.0.push_back(value))
   }

   /// A new bind holding the elements of `self` followed by those of `other`.
   #[must_use]
   pub fn concat(&self, other: &Self) -> Self {
      let mut values = self.0.dupe();

      for value in other.iter() {
         values.push_back_mut(value.dupe());
      }

      Self(values)
   }

   /// Key/value pairs. A trailing key without a value is dropped.
   pub fn pairs(&self) -> impl Iterator<Item = (&Value, &Value)> {
      let mut values = self.0.iter();

      std::iter::from_fn(move || Some((values.next()?, values.next()?)))
   }

   /// The value following the first key equal to `key`.
   #[must_use]
   pub fn get(&self, key: &Value) -> Option<&Value> {
      self
         .pairs()
         .find_map(|(candidate, value)| (candidate == key).then_some(value))
   }
}

#[cfg(test)]
mod tests {
   use pretty_assertions::assert_eq;

   use super::*;

   #[test]
   fn lookup_by_key() {
      let bind = Bind::from_iter([
         Value::keyword("a"),
         Value::from(1),
         Value::keyword("b"),
         Value::from(2),
      ]);

      assert_eq!(bind.get(&Value::keyword("b")), Some(&Value::from(2)));
      assert_eq!(bind.get(&Value::from(1)), None);
      assert_eq!(bind.to_string(), "{:a 1 :b 2}");
   }

   #[test]
   fn concat_keeps_order() {
      let outer = Bind::from_iter([Value::keyword("a"), Value::from(1)]);
      let inner = Bind::from_iter([Value::keyword("b"), Value::from(2)]);

      assert_eq!(outer.concat(&inner).to_string(), "{:a 1 :b 2}");
      assert_eq!(outer.len(), 2);
   }
}
