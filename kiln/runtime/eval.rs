//! A continuation-passing evaluator driven by a trampoline.
//!
//! Every step returns a [`Ready`] describing the next step instead of
//! recursing, so tail calls run in constant native stack and evaluation can
//! be cancelled between any two steps.

use kiln_util::Dupe;
use tokio_util::sync::CancellationToken;

use crate::{
   Bind,
   Combiner,
   Error,
   Result,
   Scope,
   Symbol,
   Value,
   value::path,
};

/// Ambient state of an evaluation.
#[derive(Debug, Clone, Default)]
pub struct Context {
   cancellation: CancellationToken,
}

impl Context {
   #[must_use]
   pub fn new() -> Self {
      Self::default()
   }

   /// A context that stops evaluating once `cancellation` is cancelled.
   #[must_use]
   pub fn with_cancellation(cancellation: CancellationToken) -> Self {
      Self { cancellation }
   }

   #[must_use]
   pub fn cancellation(&self) -> &CancellationToken {
      &self.cancellation
   }

   #[must_use]
   pub fn is_cancelled(&self) -> bool {
      self.cancellation.is_cancelled()
   }
}

type Frame = Box<dyn FnOnce(Value, Cont) -> Ready + Send>;

/// What to do with a value once it has been computed.
///
/// Kept as a flat stack of frames, innermost last. A frame receives the
/// computed value together with the frames below it, so no frame owns
/// another and an abandoned continuation is freed without recursing.
#[derive(Default)]
pub struct Cont(Vec<Frame>);

impl Cont {
   /// The continuation that ends evaluation.
   #[must_use]
   pub fn done() -> Self {
      Self::default()
   }

   /// Pushes `frame`, which runs on the next value before the rest of this
   /// continuation.
   #[must_use]
   pub fn then(mut self, frame: impl FnOnce(Value, Cont) -> Ready + Send + 'static) -> Self {
      self.0.push(Box::new(frame));
      self
   }

   /// Hands `value` to this continuation on the next step.
   #[must_use]
   pub fn call(self, value: Value) -> Ready {
      Ready::Return { cont: self, value }
   }

   fn resume(mut self, value: Value) -> Ready {
      match self.0.pop() {
         Some(frame) => frame(value, self),
         None => Ready::Done(value),
      }
   }
}

/// A single pending step of evaluation.
pub enum Ready {
   Eval {
      form:  Value,
      scope: Scope,
      cont:  Cont,
   },

   Call {
      combiner: Combiner,
      operands: Value,
      scope:    Scope,
      cont:     Cont,
   },

   Return {
      cont:  Cont,
      value: Value,
   },

   Done(Value),

   Fail(Error),
}

impl Ready {
   /// Runs steps until evaluation finishes, fails or is cancelled.
   pub fn go(self, context: &Context) -> Result<Value> {
      let mut ready = self;
      let mut steps: u64 = 0;

      loop {
         if context.is_cancelled() {
            tracing::debug!(steps, "evaluation cancelled");
            return Err(Error::Cancelled);
         }

         steps += 1;

         ready = match ready {
            Ready::Eval { form, scope, cont } => eval(context, form, scope, cont),

            Ready::Call {
               combiner,
               operands,
               scope,
               cont,
            } => combiner.call(context, operands, scope, cont),

            Ready::Return { cont, value } => cont.resume(value),

            Ready::Done(value) => {
               tracing::trace!(steps, "evaluation finished");
               return Ok(value);
            },

            Ready::Fail(error) => return Err(error),
         };
      }
   }
}

/// Evaluates `form` in `scope` and runs the trampoline to completion.
pub fn eval_form(context: &Context, form: Value, scope: &Scope) -> Result<Value> {
   Ready::Eval {
      form,
      scope: scope.dupe(),
      cont: Cont::done(),
   }
   .go(context)
}

/// Performs one step of evaluating `form`.
fn eval(_context: &Context, form: Value, scope: Scope, cont: Cont) -> Ready {
   match form {
      Value::Symbol(symbol) => {
         match scope.get(&symbol) {
            Some(value) => cont.call(value),
            None => Ready::Fail(Error::UnboundSymbol { symbol }),
         }
      },

      Value::Pair(pair) => {
         Ready::Eval {
            form:  pair.a().dupe(),
            scope: scope.dupe(),
            cont:  cont.then(move |head, cont| {
               match head.decode::<Combiner>() {
                  Ok(combiner) => {
                     Ready::Call {
                        combiner,
                        operands: pair.d().dupe(),
                        scope,
                        cont,
                     }
                  },

                  Err(_) => Ready::Fail(Error::NotACombiner { value: head }),
               }
            }),
         }
      },

      list @ Value::Cons(_) => operands(list, scope, cont),

      Value::Bind(bind) => eval_bind(bind, scope, cont),

      Value::ExtendPath(path) => {
         Ready::Eval {
            form: path.parent().dupe(),
            scope,
            cont: cont.then(move |parent, cont| {
               match path::extend_value(parent, path.child().dupe()) {
                  Ok(extended) => cont.call(extended),
                  Err(error) => Ready::Fail(error),
               }
            }),
         }
      },

      Value::Annotate(annotate) => {
         Ready::Eval {
            form: annotate.value().dupe(),
            scope,
            cont,
         }
      },

      other => cont.call(other),
   }
}

/// Evaluates every element of a list left to right into a data list. An
/// improper tail is evaluated too and becomes the tail of the result.
pub fn operands(list: Value, scope: Scope, cont: Cont) -> Ready {
   match list {
      Value::Empty => cont.call(Value::Empty),

      Value::Pair(pair) | Value::Cons(pair) => {
         Ready::Eval {
            form: pair.a().dupe(),
            scope: scope.dupe(),
            cont: cont.then(move |head, cont| {
               operands(
                  pair.d().dupe(),
                  scope,
                  cont.then(move |tail, cont| cont.call(Value::cons(head, tail))),
               )
            }),
         }
      },

      Value::Annotate(annotate) => operands(annotate.value().dupe(), scope, cont),

      rest => Ready::Eval {
         form: rest,
         scope,
         cont,
      },
   }
}

/// Evaluates a body in order, passing the last form's value to `cont` in tail
/// position. An empty body yields `null`.
pub fn sequence(body: Value, scope: Scope, cont: Cont) -> Ready {
   match *body.unannotated() {
      Value::Empty => cont.call(Value::Null),

      Value::Pair(ref pair) | Value::Cons(ref pair) => {
         if matches!(*pair.d().unannotated(), Value::Empty) {
            return Ready::Eval {
               form: pair.a().dupe(),
               scope,
               cont,
            };
         }

         let pair = pair.dupe();

         Ready::Eval {
            form: pair.a().dupe(),
            scope: scope.dupe(),
            cont: cont.then(move |_, cont| sequence(pair.d().dupe(), scope, cont)),
         }
      },

      ref other => Ready::Eval {
         form: other.dupe(),
         scope,
         cont,
      },
   }
}

fn binding_name(key: &Value) -> Option<Symbol> {
   match *key.unannotated() {
      Value::Symbol(ref symbol) => Some(symbol.dupe()),
      Value::Keyword(ref keyword) => Some(keyword.symbol()),
      Value::String(ref string) => Some(Symbol::new(string)),
      _ => None,
   }
}

/// Evaluates the values of a bind and collects them into a fresh scope. Keys
/// are not evaluated.
fn eval_bind(bind: Bind, scope: Scope, cont: Cont) -> Ready {
   if bind.len() % 2 != 0 {
      return Ready::Fail(Error::BindMismatch {
         pattern: Value::Bind(bind.dupe()),
         value:   Value::Null,
      });
   }

   let mut names = Vec::with_capacity(bind.len() / 2);
   let mut values = Vec::with_capacity(bind.len() / 2);

   for (key, value) in bind.pairs() {
      let Some(name) = binding_name(key) else {
         return Ready::Fail(Error::BindMismatch {
            pattern: key.dupe(),
            value:   value.dupe(),
         });
      };

      names.push(name);
      values.push(value.dupe());
   }

   operands(
      Value::cons_list(values),
      scope,
      cont.then(move |evaluated, cont| {
         let scope = Scope::empty();

         for (name, value) in names.into_iter().zip(evaluated.items()) {
            scope.set(name, value);
         }

         cont.call(Value::Scope(scope))
      }),
   )
}

impl Value {
   /// Destructures `value` against this pattern, binding symbols in `scope`.
   ///
   /// Symbols bind anything, `_` ignores anything, lists bind element-wise
   /// with an improper tail binding the remaining elements. Any other pattern
   /// must equal the value.
   pub fn bind(&self, scope: &Scope, value: Value) -> Result<()> {
      let mismatch = |value: Value| {
         Err(Error::BindMismatch {
            pattern: self.dupe(),
            value,
         })
      };

      match *self {
         Value::Symbol(ref symbol) => {
            scope.set(symbol.dupe(), value);
            Ok(())
         },

         Value::Ignore => Ok(()),

         Value::Annotate(ref annotate) => annotate.value().bind(scope, value),

         Value::Pair(ref pattern) | Value::Cons(ref pattern) => {
            match *value.unannotated() {
               Value::Pair(ref pair) | Value::Cons(ref pair) => {
                  pattern.a().bind(scope, pair.a().dupe())?;
                  pattern.d().bind(scope, pair.d().dupe())
               },

               _ => mismatch(value),
            }
         },

         _ if *self == value => Ok(()),

         _ => mismatch(value),
      }
   }
}

#[cfg(test)]
mod tests {
   use pretty_assertions::assert_eq;

   use super::*;
   use crate::{
      Native,
      read::read_all,
   };

   fn scope() -> Scope {
      let scope = Scope::empty();

      scope.set(
         Symbol::new("list"),
         Value::Applicative(Native::applicative("list", |arguments| {
            Ok(Value::cons_list(arguments))
         })),
      );

      scope
   }

   fn eval_source(source: &str, scope: &Scope) -> Result<Value> {
      let mut result = Value::Null;

      for form in read_all(source)? {
         result = eval_form(&Context::new(), form, scope)?;
      }

      Ok(result)
   }

   #[test]
   fn unbound_symbols_fail() {
      let Err(Error::UnboundSymbol { symbol }) = eval_source("missing", &scope()) else {
         panic!("evaluating an unbound symbol must fail");
      };

      assert_eq!(symbol, Symbol::new("missing"));
   }

   #[test]
   fn data_lists_evaluate_their_elements() {
      let scope = scope();
      scope.set(Symbol::new("x"), Value::from(1));

      assert_eq!(
         eval_source("[x 2 & x]", &scope).ok(),
         Some(Value::cons(Value::from(1), Value::cons(Value::from(2), Value::from(1)))),
      );
   }

   #[test]
   fn binds_evaluate_to_scopes() {
      let scope = scope();
      scope.set(Symbol::new("x"), Value::from(1));

      let Ok(Value::Scope(result)) = eval_source("{:a x :b (list x)}", &scope) else {
         panic!("a bind must evaluate to a scope");
      };

      assert_eq!(result.get(&Symbol::new("a")), Some(Value::from(1)));
      assert_eq!(
         result.get(&Symbol::new("b")),
         Some(Value::cons_list([Value::from(1)])),
      );

      assert!(matches!(
         eval_source("{:a}", &scope),
         Err(Error::BindMismatch { .. }),
      ));
   }

   #[test]
   fn non_combiners_cannot_be_called() {
      let Err(Error::NotACombiner { value }) = eval_source("(1 2)", &scope()) else {
         panic!("calling an int must fail");
      };

      assert_eq!(value, Value::from(1));
   }

   #[test]
   fn self_evaluating_values() {
      for source in ["42", "\"hi\"", ":key", "null", "_", ".ls", "./"] {
         let form = read_all(source).ok().and_then(|forms| forms.into_iter().next());
         let value = eval_source(source, &scope()).ok();

         assert_eq!(value, form, "{source}");
      }
   }

   #[test]
   fn destructuring() {
      let scope = Scope::empty();
      let pattern = read_all("(a _ & rest)").ok().and_then(|forms| forms.into_iter().next());
      let pattern = pattern.unwrap_or(Value::Null);

      let bound = pattern.bind(
         &scope,
         Value::cons_list([Value::from(1), Value::from(2), Value::from(3)]),
      );

      assert!(bound.is_ok());
      assert_eq!(scope.get(&Symbol::new("a")), Some(Value::from(1)));
      assert_eq!(
         scope.get(&Symbol::new("rest")),
         Some(Value::cons_list([Value::from(3)])),
      );

      assert!(matches!(
         pattern.bind(&scope, Value::from(1)),
         Err(Error::BindMismatch { .. }),
      ));
      assert!(Value::from(1).bind(&scope, Value::from(1)).is_ok());
   }

   #[test]
   fn cancelled_evaluation_stops() {
      let context = Context::new();
      context.cancellation().cancel();

      let result = Ready::Eval {
         form:  Value::from(1),
         scope: Scope::empty(),
         cont:  Cont::done(),
      }
      .go(&context);

      assert!(matches!(result, Err(Error::Cancelled)));
   }
}
