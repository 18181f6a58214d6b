//! The ground scope: the built-in combiners every script starts from.
//!
//! [`new`] builds a fresh, unshared scope each time. Scripts run in children
//! of it, so definitions never leak back into the ground.

use std::sync::Arc;

use kiln_util::{
   Dupe,
   suffix::Arc as _,
};
use num::BigInt;

use crate::{
   Applicative,
   Combiner,
   Compound,
   Cont,
   Context,
   Error,
   FileOrDirPath,
   Native,
   Operative,
   Pair,
   Path,
   Ready,
   Result,
   Scope,
   Sink,
   Source,
   Symbol,
   Thunk,
   Value,
   eval,
   value::{
      arity,
      path,
   },
};

/// Unwraps a result inside a step, failing the evaluation on error.
macro_rules! try_ready {
   ($result:expr) => {
      match $result {
         Ok(value) => value,
         Err(error) => return Ready::Fail(error.into()),
      }
   };
}

type OperativeFn = fn(&Context, Value, Scope, Cont) -> Ready;
type ApplicativeFn = fn(Vec<Value>) -> Result<Value>;

const OPERATIVES: &[(&str, OperativeFn)] = &[
   ("def", def),
   ("op", op),
   ("fn", lambda),
   ("if", if_),
   ("do", do_),
   ("quote", quote),
   ("current-scope", current_scope),
];

const APPLICATIVES: &[(&str, ApplicativeFn)] = &[
   ("wrap", wrap),
   ("unwrap", unwrap),
   ("cons", cons),
   ("first", first),
   ("rest", rest),
   ("list", list),
   ("=", equal),
   ("<", less),
   (">", greater),
   ("+", add),
   ("-", subtract),
   ("*", multiply),
   ("extend", extend),
   ("with-args", with_args),
   ("with-stdin", with_stdin),
   ("with-env", with_env),
   ("with-dir", with_dir),
   ("emit", emit),
   ("next", next),
   ("error", error),
];

/// Builds a new ground scope.
#[must_use]
pub fn new() -> Scope {
   let ground = Scope::empty();

   for &(name, call) in OPERATIVES {
      ground.set(Symbol::new(name), Value::Operative(Native::operative(name, call)));
   }

   for &(name, call) in APPLICATIVES {
      ground.set(Symbol::new(name), Value::Applicative(Native::applicative(name, call)));
   }

   // Evaluates its arguments first, but continues in tail position.
   ground.set(
      Symbol::new("eval"),
      Value::Applicative(Applicative::wrap(Native::operative("eval", eval_in))),
   );

   tracing::trace!(bindings = ground.bindings().len(), "built ground scope");

   ground
}

/// Splits `values` into exactly `N` arguments.
fn exactly<const N: usize>(name: &str, values: Vec<Value>) -> Result<[Value; N]> {
   let got = values.len();

   <[Value; N]>::try_from(values).map_err(|_| arity(name, &N.to_string(), got))
}

fn operands<const N: usize>(name: &str, operands: &Value) -> Result<[Value; N]> {
   exactly(name, operands.decode()?)
}

fn uncons(name: &str, expected: &str, list: &Value) -> Result<(Value, Value)> {
   match *list.unannotated() {
      Value::Pair(ref pair) | Value::Cons(ref pair) => Ok((pair.a().dupe(), pair.d().dupe())),
      _ => Err(arity(name, expected, 0)),
   }
}

fn integers(name: &str, arguments: &[Value]) -> Result<Vec<Arc<BigInt>>> {
   arguments
      .iter()
      .map(|argument| argument.decode::<Arc<BigInt>>())
      .collect::<std::result::Result<_, _>>()
      .map_err(|error| {
         tracing::debug!(name, %error, "non-integer argument");
         error.into()
      })
}

// (def pattern form)
fn def(_: &Context, operands: Value, scope: Scope, cont: Cont) -> Ready {
   let [pattern, form] = try_ready!(self::operands("def", &operands));

   Ready::Eval {
      form,
      scope: scope.dupe(),
      cont: cont.then(move |value, cont| {
         try_ready!(pattern.bind(&scope, value));
         cont.call(pattern)
      }),
   }
}

// (op formals binder & body)
fn op(_: &Context, operands: Value, scope: Scope, cont: Cont) -> Ready {
   let (formals, rest) = try_ready!(uncons("op", "at least 2", &operands));
   let (binder, body) = try_ready!(uncons("op", "at least 2", &rest));

   let compound = Compound {
      formals,
      binder,
      body,
      scope,
   };

   cont.call(Value::Operative(Operative::Compound(compound.arc())))
}

// (fn formals & body)
fn lambda(_: &Context, operands: Value, scope: Scope, cont: Cont) -> Ready {
   let (formals, body) = try_ready!(uncons("fn", "at least 1", &operands));

   let operative = Operative::Compound(
      Compound {
         formals,
         binder: Value::Ignore,
         body,
         scope,
      }
      .arc(),
   );

   cont.call(Value::Applicative(Applicative::wrap(operative)))
}

// (if condition then else?)
fn if_(_: &Context, operands: Value, scope: Scope, cont: Cont) -> Ready {
   let operands = try_ready!(operands.decode::<Vec<Value>>());
   let got = operands.len();

   let mut operands = operands.into_iter();
   let (Some(condition), Some(then), otherwise, None) = (
      operands.next(),
      operands.next(),
      operands.next(),
      operands.next(),
   ) else {
      return Ready::Fail(arity("if", "2 or 3", got));
   };

   Ready::Eval {
      form: condition,
      scope: scope.dupe(),
      cont: cont.then(move |value, cont| {
         Ready::Eval {
            form: if value.is_truthy() {
               then
            } else {
               otherwise.unwrap_or(Value::Null)
            },
            scope,
            cont,
         }
      }),
   }
}

fn do_(_: &Context, operands: Value, scope: Scope, cont: Cont) -> Ready {
   eval::sequence(operands, scope, cont)
}

fn quote(_: &Context, operands: Value, _: Scope, cont: Cont) -> Ready {
   let [form] = try_ready!(self::operands("quote", &operands));
   cont.call(form)
}

fn current_scope(_: &Context, operands: Value, scope: Scope, cont: Cont) -> Ready {
   let [] = try_ready!(self::operands("current-scope", &operands));
   cont.call(Value::Scope(scope))
}

// (eval form scope)
fn eval_in(_: &Context, arguments: Value, _: Scope, cont: Cont) -> Ready {
   let [form, scope] = try_ready!(operands("eval", &arguments));
   let scope = try_ready!(scope.decode::<Scope>());

   Ready::Eval { form, scope, cont }
}

fn wrap(arguments: Vec<Value>) -> Result<Value> {
   let [combiner] = exactly("wrap", arguments)?;
   Ok(Value::Applicative(Applicative::wrap(combiner.decode::<Combiner>()?)))
}

fn unwrap(arguments: Vec<Value>) -> Result<Value> {
   let [applicative] = exactly("unwrap", arguments)?;
   Ok(Value::from(applicative.decode::<Applicative>()?.unwrap()))
}

fn cons(arguments: Vec<Value>) -> Result<Value> {
   let [a, d] = exactly("cons", arguments)?;
   Ok(Value::cons(a, d))
}

fn first(arguments: Vec<Value>) -> Result<Value> {
   let [list] = exactly("first", arguments)?;
   Ok(list.decode::<Pair>()?.a().dupe())
}

fn rest(arguments: Vec<Value>) -> Result<Value> {
   let [list] = exactly("rest", arguments)?;
   Ok(list.decode::<Pair>()?.d().dupe())
}

fn list(arguments: Vec<Value>) -> Result<Value> {
   Ok(Value::cons_list(arguments))
}

fn equal(arguments: Vec<Value>) -> Result<Value> {
   Ok(Value::Bool(
      arguments.windows(2).all(|window| window[0] == window[1]),
   ))
}

fn less(arguments: Vec<Value>) -> Result<Value> {
   let integers = integers("<", &arguments)?;
   Ok(Value::Bool(integers.windows(2).all(|window| window[0] < window[1])))
}

fn greater(arguments: Vec<Value>) -> Result<Value> {
   let integers = integers(">", &arguments)?;
   Ok(Value::Bool(integers.windows(2).all(|window| window[0] > window[1])))
}

fn add(arguments: Vec<Value>) -> Result<Value> {
   let integers = integers("+", &arguments)?;
   Ok(Value::from(integers.iter().map(|integer| &**integer).sum::<BigInt>()))
}

fn multiply(arguments: Vec<Value>) -> Result<Value> {
   let integers = integers("*", &arguments)?;
   Ok(Value::from(integers.iter().map(|integer| &**integer).product::<BigInt>()))
}

// A single argument is negated, more are subtracted from the first.
fn subtract(arguments: Vec<Value>) -> Result<Value> {
   let integers = integers("-", &arguments)?;

   match *integers.as_slice() {
      [] => Err(arity("-", "at least 1", 0)),
      [ref only] => Ok(Value::from(-&**only)),
      [ref first, ref rest @ ..] => {
         Ok(Value::from(rest.iter().fold((**first).clone(), |difference, integer| {
            difference - &**integer
         })))
      },
   }
}

fn extend(arguments: Vec<Value>) -> Result<Value> {
   let [parent, child] = exactly("extend", arguments)?;
   path::extend_value(parent, child.decode::<FileOrDirPath>()?)
}

fn with_args(arguments: Vec<Value>) -> Result<Value> {
   let [thunk, args] = exactly("with-args", arguments)?;
   Ok(Value::Thunk(thunk.decode::<Thunk>()?.with_args(args.decode()?)))
}

fn with_stdin(arguments: Vec<Value>) -> Result<Value> {
   let [thunk, stdin] = exactly("with-stdin", arguments)?;
   Ok(Value::Thunk(thunk.decode::<Thunk>()?.with_stdin(stdin.decode()?)))
}

fn with_env(arguments: Vec<Value>) -> Result<Value> {
   let [thunk, env] = exactly("with-env", arguments)?;
   Ok(Value::Thunk(thunk.decode::<Thunk>()?.with_env(env.decode::<Scope>()?)))
}

fn with_dir(arguments: Vec<Value>) -> Result<Value> {
   let [thunk, dir] = exactly("with-dir", arguments)?;
   Ok(Value::Thunk(thunk.decode::<Thunk>()?.with_dir(dir.decode::<Path>()?)))
}

// (emit value sink)
fn emit(arguments: Vec<Value>) -> Result<Value> {
   let [value, sink] = exactly("emit", arguments)?;
   sink.decode::<Sink>()?.emit(&value)?;
   Ok(value)
}

// (next source default?)
fn next(arguments: Vec<Value>) -> Result<Value> {
   let got = arguments.len();

   let mut arguments = arguments.into_iter();
   let (Some(source), default, None) = (arguments.next(), arguments.next(), arguments.next())
   else {
      return Err(arity("next", "1 or 2", got));
   };

   match source.decode::<Source>()?.next()? {
      Some(value) => Ok(value),
      None => default.ok_or(Error::EndOfSource { pipe: source }),
   }
}

fn error(arguments: Vec<Value>) -> Result<Value> {
   let [message] = exactly("error", arguments)?;
   let message = message.decode::<String>()?;

   kiln_error::bail!("{message}")
}
