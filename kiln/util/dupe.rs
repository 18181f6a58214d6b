use std::{
   rc,
   sync,
};

/// Marks clones that only bump a reference count or copy a few words.
///
/// Runtime values share structure, so cloning one is always cheap. Calling
/// `.dupe()` instead of `.clone()` documents that at the call site.
pub trait Dupe: Clone {
   #[inline]
   #[must_use]
   fn dupe(&self) -> Self {
      self.clone()
   }
}

pub trait OptionDupedExt {
   type Item;

   fn duped(self) -> Option<Self::Item>;
}

impl<T: Dupe> OptionDupedExt for Option<&T> {
   type Item = T;

   fn duped(self) -> Option<T> {
      self.map(Dupe::dupe)
   }
}

impl<T: ?Sized> Dupe for sync::Arc<T> {}
impl<T: ?Sized> Dupe for rc::Rc<T> {}

impl<T: Dupe> Dupe for Option<T> {}
impl<A: Dupe, B: Dupe> Dupe for (A, B) {}

impl Dupe for bool {}
impl Dupe for u32 {}
impl Dupe for usize {}
impl Dupe for () {}

impl<T> Dupe for rpds::ListSync<T> {}
impl<T> Dupe for rpds::VectorSync<T> {}
