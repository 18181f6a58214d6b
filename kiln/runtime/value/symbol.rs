use std::{
   fmt,
   sync::LazyLock,
};

use arcstr::ArcStr;
use dashmap::DashSet;
use kiln_util::Dupe;

static INTERNED: LazyLock<DashSet<ArcStr>> = LazyLock::new(DashSet::new);

fn intern(name: &str) -> ArcStr {
   if let Some(interned) = INTERNED.get(name) {
      return interned.key().clone();
   }

   let interned = ArcStr::from(name);
   INTERNED.insert(interned.clone());
   interned
}

/// An interned identifier, used both as a binder name and as an expression
/// that evaluates by scope lookup.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Symbol(ArcStr);

impl Dupe for Symbol {}

impl fmt::Display for Symbol {
   fn fmt(&self, writer: &mut fmt::Formatter<'_>) -> fmt::Result {
      writer.write_str(&self.0)
   }
}

impl Symbol {
   #[must_use]
   pub fn new(name: &str) -> Self {
      Self(intern(name))
   }

   #[must_use]
   pub fn name(&self) -> &str {
      &self.0
   }
}

/// A self-evaluating interned identifier, written `:name`. Keywords live in
/// a namespace distinct from [`Symbol`]s even when their names match.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Keyword(ArcStr);

impl Dupe for Keyword {}

impl fmt::Display for Keyword {
   fn fmt(&self, writer: &mut fmt::Formatter<'_>) -> fmt::Result {
      write!(writer, ":{name}", name = self.0)
   }
}

impl Keyword {
   #[must_use]
   pub fn new(name: &str) -> Self {
      Self(intern(name))
   }

   #[must_use]
   pub fn name(&self) -> &str {
      &self.0
   }

   /// The symbol with the same name, used for scope lookups.
   #[must_use]
   pub fn symbol(&self) -> Symbol {
      Symbol(self.0.clone())
   }
}
