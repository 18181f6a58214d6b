use std::sync::Arc;

use arcstr::ArcStr;
use kiln_util::Dupe;

use crate::{
   Bind,
   Value,
};

#[derive(Debug)]
struct Inner {
   value:   Value,
   comment: Option<ArcStr>,
   meta:    Option<Bind>,
}

/// A value carrying the comment written next to it and the metadata written
/// before it with `^`. Transparent to evaluation and equality.
#[derive(Debug, Clone)]
pub struct Annotate(Arc<Inner>);

impl Dupe for Annotate {}

impl Annotate {
   #[must_use]
   pub fn new(value: Value, comment: Option<ArcStr>, meta: Option<Bind>) -> Self {
      Self(Arc::new(Inner {
         value,
         comment,
         meta,
      }))
   }

   #[must_use]
   pub fn value(&self) -> &Value {
      &self.0.value
   }

   #[must_use]
   pub fn comment(&self) -> Option<&str> {
      self.0.comment.as_deref()
   }

   #[must_use]
   pub fn meta(&self) -> Option<&Bind> {
      self.0.meta.as_ref()
   }
}
