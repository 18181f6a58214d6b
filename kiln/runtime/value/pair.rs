use std::{
   fmt::{
      self,
      Write as _,
   },
   mem,
   sync::Arc,
};

use kiln_util::Dupe;

use crate::Value;

/// A single list cell. Used by both [`Value::Pair`] and [`Value::Cons`].
#[derive(Debug, Clone)]
pub struct Pair(Arc<(Value, Value)>);

impl Dupe for Pair {}

impl Drop for Pair {
   fn drop(&mut self) {
      // Detaches the tail of every uniquely owned cell so freeing a long list
      // never recurses down its spine.
      let Some(cell) = Arc::get_mut(&mut self.0) else {
         return;
      };

      let mut rest = mem::replace(&mut cell.1, Value::Null);

      while let Value::Pair(mut pair) | Value::Cons(mut pair) = rest {
         rest = match Arc::get_mut(&mut pair.0) {
            Some(cell) => mem::replace(&mut cell.1, Value::Null),
            None => break,
         };
      }
   }
}

impl PartialEq for Pair {
   fn eq(&self, other: &Self) -> bool {
      // Walks the spine iteratively so long lists do not exhaust the stack.
      let (mut this, mut other) = (self.dupe(), other.dupe());

      loop {
         if Arc::ptr_eq(&this.0, &other.0) {
            return true;
         }

         if this.a() != other.a() {
            return false;
         }

         let next = match (this.d().unannotated(), other.d().unannotated()) {
            (
               &(Value::Pair(ref next_this) | Value::Cons(ref next_this)),
               &(Value::Pair(ref next_other) | Value::Cons(ref next_other)),
            ) => (next_this.dupe(), next_other.dupe()),

            (this, other) => return this == other,
         };

         (this, other) = next;
      }
   }
}

impl Pair {
   #[must_use]
   pub fn new(a: Value, d: Value) -> Self {
      Self(Arc::new((a, d)))
   }

   #[must_use]
   pub fn a(&self) -> &Value {
      &self.0.0
   }

   #[must_use]
   pub fn d(&self) -> &Value {
      &self.0.1
   }

   pub(crate) fn display(
      &self,
      writer: &mut fmt::Formatter<'_>,
      open: char,
      close: char,
   ) -> fmt::Result {
      writer.write_char(open)?;

      let mut items = Items::new(Value::Pair(self.dupe()));
      let mut first = true;

      for item in &mut items {
         if !first {
            writer.write_char(' ')?;
         }
         first = false;

         write!(writer, "{item}")?;
      }

      if !matches!(*items.tail(), Value::Empty) {
         write!(writer, " & {tail}", tail = items.tail())?;
      }

      writer.write_char(close)
   }
}

/// Iterator over the elements of a list. Once exhausted, [`Items::tail`] is
/// [`Value::Empty`] for proper lists and the improper tail otherwise.
#[derive(Debug, Clone)]
pub struct Items {
   rest: Value,
}

impl Items {
   pub(crate) fn new(list: Value) -> Self {
      Self { rest: list }
   }

   #[must_use]
   pub fn tail(&self) -> &Value {
      &self.rest
   }
}

impl Iterator for Items {
   type Item = Value;

   fn next(&mut self) -> Option<Self::Item> {
      let (item, rest) = match *self.rest.unannotated() {
         Value::Pair(ref pair) | Value::Cons(ref pair) => (pair.a().dupe(), pair.d().dupe()),
         _ => return None,
      };

      self.rest = rest;
      Some(item)
   }
}

#[cfg(test)]
mod tests {
   use pretty_assertions::assert_eq;

   use super::*;

   #[test]
   fn improper_tail_is_kept() {
      let list = Value::pair(Value::from(1), Value::pair(Value::from(2), Value::symbol("rest")));

      let mut items = list.items();
      assert_eq!(items.by_ref().collect::<Vec<_>>(), [Value::from(1), Value::from(2)]);
      assert_eq!(*items.tail(), Value::symbol("rest"));
      assert_eq!(list.to_string(), "(1 2 & rest)");
   }

   #[test]
   fn long_lists_compare() {
      let a = Value::cons_list((0..200_000).map(Value::from).collect::<Vec<_>>());
      let b = Value::pair_list((0..200_000).map(Value::from).collect::<Vec<_>>());

      assert_eq!(a, b);
   }

   #[test]
   fn long_lists_drop_on_a_small_stack() {
      let dropped = std::thread::Builder::new()
         .stack_size(2 * 1024 * 1024)
         .spawn(|| {
            let list = Value::cons_list((0..1_000_000).map(Value::from).collect::<Vec<_>>());
            let shared = list.clone();

            drop(list);
            assert_eq!(shared.items().count(), 1_000_000);
            drop(shared);
         })
         .and_then(|handle| handle.join().map_err(|_| std::io::Error::other("panicked")));

      assert!(dropped.is_ok());
   }
}
