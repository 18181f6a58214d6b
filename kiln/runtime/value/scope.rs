use std::{
   fmt,
   sync::Arc,
};

use indexmap::IndexMap;
use kiln_util::Dupe;
use parking_lot::RwLock;
use rustc_hash::FxBuildHasher;

use crate::{
   Symbol,
   Value,
};

type Bindings = IndexMap<Symbol, Value, FxBuildHasher>;

struct Inner {
   parents:  Vec<Scope>,
   bindings: RwLock<Bindings>,
}

/// A mutable mapping from symbols to values with an ordered list of parent
/// scopes.
///
/// Lookups consult the scope's own bindings first, then each parent in order,
/// depth-first. Writes only ever touch the scope itself.
#[derive(Clone)]
pub struct Scope(Arc<Inner>);

impl Dupe for Scope {}

impl fmt::Debug for Scope {
   fn fmt(&self, writer: &mut fmt::Formatter<'_>) -> fmt::Result {
      writer
         .debug_struct("Scope")
         .field("bindings", &*self.0.bindings.read())
         .field("parents", &self.0.parents.len())
         .finish()
   }
}

impl fmt::Display for Scope {
   fn fmt(&self, writer: &mut fmt::Formatter<'_>) -> fmt::Result {
      writer.write_str("{")?;

      for (index, (symbol, value)) in self.bindings().into_iter().enumerate() {
         if index != 0 {
            writer.write_str(" ")?;
         }

         write!(writer, ":{symbol} {value}")?;
      }

      writer.write_str("}")
   }
}

impl PartialEq for Scope {
   fn eq(&self, other: &Self) -> bool {
      if Arc::ptr_eq(&self.0, &other.0) {
         return true;
      }

      let (this, other_bindings) = (self.bindings(), other.bindings());

      this.len() == other_bindings.len()
         && this.iter().all(|(symbol, value)| {
            other_bindings
               .iter()
               .any(|(other_symbol, other_value)| symbol == other_symbol && value == other_value)
         })
         && self.0.parents == other.0.parents
   }
}

impl Scope {
   #[must_use]
   pub fn new(parents: Vec<Scope>) -> Self {
      Self(Arc::new(Inner {
         parents,
         bindings: RwLock::new(IndexMap::with_hasher(FxBuildHasher)),
      }))
   }

   /// A scope with no parents and no bindings.
   #[must_use]
   pub fn empty() -> Self {
      Self::new(Vec::new())
   }

   /// A new scope whose only parent is `self`.
   #[must_use]
   pub fn child(&self) -> Self {
      Self::new(vec![self.dupe()])
   }

   #[must_use]
   pub fn parents(&self) -> &[Scope] {
      &self.0.parents
   }

   #[must_use]
   pub fn get(&self, symbol: &Symbol) -> Option<Value> {
      if let Some(value) = self.0.bindings.read().get(symbol) {
         return Some(value.dupe());
      }

      self.0.parents.iter().find_map(|parent| parent.get(symbol))
   }

   /// Binds `symbol` in this scope, shadowing any binding in the parents.
   pub fn set(&self, symbol: Symbol, value: Value) {
      self.0.bindings.write().insert(symbol, value);
   }

   /// The scope's own bindings, in insertion order.
   #[must_use]
   pub fn bindings(&self) -> Vec<(Symbol, Value)> {
      self
         .0
         .bindings
         .read()
         .iter()
         .map(|(symbol, value)| (symbol.dupe(), value.dupe()))
         .collect()
   }

   /// Every visible binding, nearest first. Shadowed bindings are skipped.
   #[must_use]
   pub fn visible_bindings(&self) -> Vec<(Symbol, Value)> {
      let mut visible = Bindings::with_hasher(FxBuildHasher);
      self.collect_visible(&mut visible);
      visible.into_iter().collect()
   }

   fn collect_visible(&self, visible: &mut Bindings) {
      for (symbol, value) in self.0.bindings.read().iter() {
         visible
            .entry(symbol.dupe())
            .or_insert_with(|| value.dupe());
      }

      for parent in &self.0.parents {
         parent.collect_visible(visible);
      }
   }

   #[must_use]
   pub fn ptr_eq(&self, other: &Self) -> bool {
      Arc::ptr_eq(&self.0, &other.0)
   }
}

#[cfg(test)]
mod tests {
   use pretty_assertions::assert_eq;

   use super::*;

   #[test]
   fn set_is_local() {
      let parent = Scope::empty();
      let child = parent.child();

      child.set(Symbol::new("x"), Value::from(1));

      assert_eq!(child.get(&Symbol::new("x")), Some(Value::from(1)));
      assert_eq!(parent.get(&Symbol::new("x")), None);
   }

   #[test]
   fn parents_are_searched_in_order() {
      let first = Scope::empty();
      let second = Scope::empty();

      first.set(Symbol::new("x"), Value::from(1));
      second.set(Symbol::new("x"), Value::from(2));
      second.set(Symbol::new("y"), Value::from(3));

      let scope = Scope::new(vec![first, second]);

      assert_eq!(scope.get(&Symbol::new("x")), Some(Value::from(1)));
      assert_eq!(scope.get(&Symbol::new("y")), Some(Value::from(3)));
      assert_eq!(scope.visible_bindings().len(), 2);
   }

   #[test]
   fn equality_ignores_insertion_order() {
      let a = Scope::empty();
      a.set(Symbol::new("x"), Value::from(1));
      a.set(Symbol::new("y"), Value::from(2));

      let b = Scope::empty();
      b.set(Symbol::new("y"), Value::from(2));
      b.set(Symbol::new("x"), Value::from(1));

      assert_eq!(a, b);
      assert_eq!(a.to_string(), "{:x 1 :y 2}");
   }
}
