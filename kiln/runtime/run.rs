use std::{
   fs,
   io,
};

use kiln_util::Dupe;

use crate::{
   Combiner,
   Cont,
   Context,
   Error,
   Path,
   Reader,
   Ready,
   Result,
   Scope,
   Sink,
   Source,
   Symbol,
   Value,
   eval_form,
};

/// What a script sees of the world it runs in.
#[derive(bon::Builder, Debug, Clone)]
pub struct RunState {
   /// The directory relative paths resolve against.
   pub dir:    Path,
   #[builder(default = Scope::empty())]
   pub env:    Scope,
   pub stdin:  Source,
   pub stdout: Sink,
}

impl RunState {
   /// A child of `ground` with `*dir*`, `*env*`, `*stdin*` and `*stdout*`
   /// bound.
   #[must_use]
   pub fn scope(&self, ground: &Scope) -> Scope {
      let scope = ground.child();

      scope.set(Symbol::new("*dir*"), Value::from(self.dir.dupe()));
      scope.set(Symbol::new("*env*"), Value::Scope(self.env.dupe()));
      scope.set(Symbol::new("*stdin*"), Value::Source(self.stdin.dupe()));
      scope.set(Symbol::new("*stdout*"), Value::Sink(self.stdout.dupe()));

      scope
   }
}

/// Reads and evaluates every form of `read` in `scope`, returning the value
/// of the last one.
#[tracing::instrument(level = "debug", skip_all)]
pub fn eval_reader(context: &Context, scope: &Scope, read: impl io::Read) -> Result<Value> {
   let mut result = Value::Null;
   let mut forms: u64 = 0;

   for form in Reader::new(read) {
      result = eval_form(context, form?, scope)?;
      forms += 1;
   }

   tracing::debug!(forms, "evaluated source");

   Ok(result)
}

#[tracing::instrument(level = "debug", skip_all, fields(path = %path.display()))]
pub fn eval_file(context: &Context, scope: &Scope, path: &std::path::Path) -> Result<Value> {
   let file = fs::File::open(path)?;

   eval_reader(context, scope, file)
}

/// Calls the `main` bound in `scope` without arguments. Returns `null` when
/// nothing is bound to `main`.
#[tracing::instrument(level = "debug", skip_all)]
pub fn run_main(context: &Context, scope: &Scope) -> Result<Value> {
   let Some(main) = scope.get(&Symbol::new("main")) else {
      tracing::debug!("no main to run");
      return Ok(Value::Null);
   };

   let Ok(combiner) = main.decode::<Combiner>() else {
      return Err(Error::NotACombiner { value: main });
   };

   Ready::Call {
      combiner,
      operands: Value::Empty,
      scope: scope.dupe(),
      cont: Cont::done(),
   }
   .go(context)
}

#[cfg(test)]
mod tests {
   use std::io::Write as _;

   use pretty_assertions::assert_eq;

   use super::*;
   use crate::{
      DirPath,
      ground,
      value::pipe::{
         InMemorySink,
         InMemorySource,
      },
   };

   fn state(input: impl IntoIterator<Item = Value>) -> (RunState, InMemorySink) {
      let output = InMemorySink::new();

      let state = RunState::builder()
         .dir(Path::Dir(DirPath::new("project")))
         .stdin(Source::new(InMemorySource::new(input)))
         .stdout(Sink::new(output.clone()))
         .build();

      (state, output)
   }

   #[test]
   fn main_echoes_stdin() {
      let (state, output) = state([Value::from(1), Value::from(2)]);
      let scope = state.scope(&ground::new());
      let context = Context::new();

      let script = "
         (def echo (fn [] (emit (next *stdin*) *stdout*)))
         (def main (fn [] (echo) (echo) :done))
      ";

      assert!(eval_reader(&context, &scope, script.as_bytes()).is_ok());
      assert_eq!(run_main(&context, &scope).ok(), Some(Value::keyword("done")));
      assert_eq!(output.values(), [Value::from(1), Value::from(2)]);
   }

   #[test]
   fn run_scope_bindings() {
      let (state, _) = state([]);
      let scope = state.scope(&ground::new());

      assert_eq!(
         eval_reader(&Context::new(), &scope, "*dir*".as_bytes()).ok(),
         Some(Value::DirPath(DirPath::new("project"))),
      );
      assert!(matches!(
         eval_reader(&Context::new(), &scope, "*env*".as_bytes()),
         Ok(Value::Scope(_)),
      ));
   }

   #[test]
   fn main_is_optional() {
      let scope = ground::new().child();

      assert_eq!(run_main(&Context::new(), &scope).ok(), Some(Value::Null));

      scope.set(Symbol::new("main"), Value::from(1));
      assert!(matches!(
         run_main(&Context::new(), &scope),
         Err(Error::NotACombiner { .. }),
      ));
   }

   #[test]
   fn files_are_evaluated() {
      let path = std::env::temp_dir().join(format!("kiln-run-{pid}.kl", pid = std::process::id()));

      let written = fs::File::create(&path).and_then(|mut file| file.write_all(b"(def x 20) (+ x 22)"));
      assert!(written.is_ok());

      let result = eval_file(&Context::new(), &ground::new().child(), &path);
      let _ = fs::remove_file(&path);

      assert_eq!(result.ok(), Some(Value::from(42)));
   }

   #[test]
   fn syntax_errors_stop_evaluation() {
      let scope = ground::new().child();

      assert!(matches!(
         eval_reader(&Context::new(), &scope, "(def x 1) (def y".as_bytes()),
         Err(Error::Syntax(_)),
      ));
      assert_eq!(scope.get(&Symbol::new("x")), Some(Value::from(1)));
   }
}
