use std::{
   fmt,
   sync::Arc,
};

use kiln_util::{
   Dupe,
   OptionDupedExt as _,
};

use crate::{
   Context,
   Cont,
   Error,
   FileOrDirPath,
   Keyword,
   Path,
   Ready,
   Scope,
   Thunk,
   ThunkPath,
   Value,
   eval,
};

type NativeFn = dyn Fn(&Context, Value, Scope, Cont) -> Ready + Send + Sync;

/// A combiner implemented in Rust. Receives its operands unevaluated.
pub struct Native {
   name: &'static str,
   call: Box<NativeFn>,
}

impl fmt::Debug for Native {
   fn fmt(&self, writer: &mut fmt::Formatter<'_>) -> fmt::Result {
      writer.debug_tuple("Native").field(&self.name).finish()
   }
}

impl Native {
   /// An operative receiving its operands unevaluated along with the caller's
   /// scope.
   #[must_use]
   pub fn operative(
      name: &'static str,
      call: impl Fn(&Context, Value, Scope, Cont) -> Ready + Send + Sync + 'static,
   ) -> Operative {
      Operative::Native(Arc::new(Self {
         name,
         call: Box::new(call),
      }))
   }

   /// An applicative computing a value from its evaluated arguments.
   #[must_use]
   pub fn applicative(
      name: &'static str,
      call: impl Fn(Vec<Value>) -> crate::Result<Value> + Send + Sync + 'static,
   ) -> Applicative {
      Applicative::wrap(Self::operative(name, move |_, arguments, _, cont| {
         match arguments.decode::<Vec<Value>>() {
            Ok(arguments) => {
               match call(arguments) {
                  Ok(value) => cont.call(value),
                  Err(error) => Ready::Fail(error),
               }
            },

            Err(error) => Ready::Fail(error.into()),
         }
      }))
   }

   #[must_use]
   pub fn name(&self) -> &'static str {
      self.name
   }
}

/// A combiner defined by the program.
pub struct Compound {
   pub formals: Value,
   pub binder:  Value,
   pub body:    Value,
   pub scope:   Scope,
}

// The scope usually binds the compound itself.
impl fmt::Debug for Compound {
   fn fmt(&self, writer: &mut fmt::Formatter<'_>) -> fmt::Result {
      writer
         .debug_struct("Compound")
         .field("formals", &self.formals)
         .field("binder", &self.binder)
         .field("body", &self.body)
         .finish_non_exhaustive()
   }
}

/// A combiner that receives its operands unevaluated.
#[derive(Debug, Clone)]
pub enum Operative {
   Native(Arc<Native>),
   Compound(Arc<Compound>),

   /// Calling a path builds a thunk.
   Path(Path),
   /// Calling a keyword looks it up in a scope.
   Keyword(Keyword),
   /// Calling a thunk yields a path into its output.
   Thunk(Thunk),
}

impl Dupe for Operative {}

impl PartialEq for Operative {
   fn eq(&self, other: &Self) -> bool {
      match (self, other) {
         (&Operative::Native(ref a), &Operative::Native(ref b)) => Arc::ptr_eq(a, b),
         (&Operative::Compound(ref a), &Operative::Compound(ref b)) => Arc::ptr_eq(a, b),
         (&Operative::Path(ref a), &Operative::Path(ref b)) => a == b,
         (&Operative::Keyword(ref a), &Operative::Keyword(ref b)) => a == b,
         (&Operative::Thunk(ref a), &Operative::Thunk(ref b)) => a == b,
         _ => false,
      }
   }
}

impl fmt::Display for Operative {
   fn fmt(&self, writer: &mut fmt::Formatter<'_>) -> fmt::Result {
      match *self {
         Operative::Native(ref native) => write!(writer, "<operative: {name}>", name = native.name),
         Operative::Compound(ref compound) => {
            write!(
               writer,
               "<operative: {formals} {binder}>",
               formals = compound.formals,
               binder = compound.binder,
            )
         },
         Operative::Path(ref path) => write!(writer, "{path}"),
         Operative::Keyword(ref keyword) => write!(writer, "{keyword}"),
         Operative::Thunk(ref thunk) => write!(writer, "{thunk}"),
      }
   }
}

pub(crate) fn arity(name: &str, expected: &str, got: usize) -> Error {
   Error::Arity {
      name: name.to_owned(),
      expected: expected.to_owned(),
      got,
   }
}

impl Operative {
   pub fn call(&self, context: &Context, operands: Value, scope: Scope, cont: Cont) -> Ready {
      match *self {
         Operative::Native(ref native) => (native.call)(context, operands, scope, cont),

         Operative::Compound(ref compound) => {
            let local = compound.scope.child();

            let bound = compound
               .formals
               .bind(&local, operands)
               .and_then(|()| compound.binder.bind(&local, Value::Scope(scope)));

            match bound {
               Ok(()) => eval::sequence(compound.body.dupe(), local, cont),
               Err(error) => Ready::Fail(error),
            }
         },

         Operative::Path(ref path) => {
            match operands.decode::<Vec<Value>>() {
               Ok(args) => cont.call(Value::Thunk(Thunk::run(path.dupe()).with_args(args))),
               Err(error) => Ready::Fail(error.into()),
            }
         },

         Operative::Keyword(ref keyword) => {
            let arguments = match operands.decode::<Vec<Value>>() {
               Ok(arguments) => arguments,
               Err(error) => return Ready::Fail(error.into()),
            };

            let (target, default) = match *arguments.as_slice() {
               [ref target] => (target, None),
               [ref target, ref default] => (target, Some(default)),
               _ => return Ready::Fail(arity(&keyword.to_string(), "1 or 2", arguments.len())),
            };

            let found = match *target.unannotated() {
               Value::Scope(ref scope) => scope.get(&keyword.symbol()),
               Value::Bind(ref bind) => bind.get(&Value::Keyword(keyword.dupe())).duped(),
               ref other => {
                  return Ready::Fail(Error::Decode(crate::DecodeError::new(other, "scope")));
               },
            };

            match found.or_else(|| default.duped()) {
               Some(value) => cont.call(value),
               None => Ready::Fail(Error::UnboundSymbol {
                  symbol: keyword.symbol(),
               }),
            }
         },

         Operative::Thunk(ref thunk) => {
            let arguments = match operands.decode::<Vec<Value>>() {
               Ok(arguments) => arguments,
               Err(error) => return Ready::Fail(error.into()),
            };

            let [ref path] = *arguments.as_slice() else {
               return Ready::Fail(arity(&thunk.to_string(), "1", arguments.len()));
            };

            match path.decode::<FileOrDirPath>() {
               Ok(path) => cont.call(Value::ThunkPath(ThunkPath::new(thunk.dupe(), path))),
               Err(error) => Ready::Fail(error.into()),
            }
         },
      }
   }
}

/// A combiner that evaluates its operands before passing them on to the
/// combiner it wraps.
#[derive(Debug, Clone, PartialEq)]
pub struct Applicative(Arc<Combiner>);

impl Dupe for Applicative {}

impl fmt::Display for Applicative {
   fn fmt(&self, writer: &mut fmt::Formatter<'_>) -> fmt::Result {
      match *self.0 {
         Combiner::Operative(Operative::Native(ref native)) => {
            write!(writer, "<applicative: {name}>", name = native.name)
         },

         Combiner::Operative(Operative::Path(ref path)) => write!(writer, "{path}"),
         Combiner::Operative(Operative::Keyword(ref keyword)) => write!(writer, "{keyword}"),
         Combiner::Operative(Operative::Thunk(ref thunk)) => write!(writer, "{thunk}"),

         ref inner => write!(writer, "<applicative: {inner}>"),
      }
   }
}

impl Applicative {
   #[must_use]
   pub fn wrap(combiner: impl Into<Combiner>) -> Self {
      Self(Arc::new(combiner.into()))
   }

   /// The combiner this applicative passes its evaluated arguments to.
   #[must_use]
   pub fn unwrap(&self) -> Combiner {
      (*self.0).dupe()
   }

   pub fn call(&self, operands: Value, scope: Scope, cont: Cont) -> Ready {
      let inner = self.0.dupe();

      eval::operands(
         operands,
         scope.dupe(),
         cont.then(move |arguments, cont| {
            Ready::Call {
               combiner: (*inner).dupe(),
               operands: arguments,
               scope,
               cont,
            }
         }),
      )
   }
}

#[derive(Debug, Clone, PartialEq, derive_more::From)]
pub enum Combiner {
   Operative(Operative),
   Applicative(Applicative),
}

impl Dupe for Combiner {}

impl fmt::Display for Combiner {
   fn fmt(&self, writer: &mut fmt::Formatter<'_>) -> fmt::Result {
      match *self {
         Combiner::Operative(ref operative) => write!(writer, "{operative}"),
         Combiner::Applicative(ref applicative) => write!(writer, "{applicative}"),
      }
   }
}

impl Combiner {
   pub fn call(&self, context: &Context, operands: Value, scope: Scope, cont: Cont) -> Ready {
      match *self {
         Combiner::Operative(ref operative) => operative.call(context, operands, scope, cont),
         Combiner::Applicative(ref applicative) => applicative.call(operands, scope, cont),
      }
   }
}
