use std::{
   fmt,
   sync::Arc,
};

use kiln_util::Dupe;
use serde::{
   Deserialize,
   Serialize,
   de,
   ser::SerializeMap as _,
};
use sha2::{
   Digest as _,
   Sha256,
};

use crate::{
   Path,
   Scope,
   Value,
};

/// Everything needed to run a command.
#[derive(Debug, Clone, PartialEq, bon::Builder)]
pub struct ThunkSpec {
   pub cmd: Path,

   #[builder(default)]
   pub args: Vec<Value>,

   #[builder(default)]
   pub stdin: Vec<Value>,

   pub env: Option<Scope>,

   pub dir: Option<Path>,
}

impl Serialize for ThunkSpec {
   fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
      let mut map = serializer.serialize_map(None)?;

      map.serialize_entry("cmd", &Value::from(self.cmd.dupe()))?;

      if !self.args.is_empty() {
         map.serialize_entry("args", &self.args)?;
      }

      if !self.stdin.is_empty() {
         map.serialize_entry("stdin", &self.stdin)?;
      }

      if let Some(ref env) = self.env {
         map.serialize_entry("env", &Value::Scope(env.dupe()))?;
      }

      if let Some(ref dir) = self.dir {
         map.serialize_entry("dir", &Value::from(dir.dupe()))?;
      }

      map.end()
   }
}

#[derive(Deserialize)]
#[serde(deny_unknown_fields)]
struct ThunkRecord {
   cmd: Value,

   #[serde(default)]
   args: Vec<Value>,

   #[serde(default)]
   stdin: Vec<Value>,

   #[serde(default)]
   env: Option<Value>,

   #[serde(default)]
   dir: Option<Value>,
}

impl<'de> Deserialize<'de> for ThunkSpec {
   fn deserialize<D: de::Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
      let record = ThunkRecord::deserialize(deserializer)?;

      let decode_path = |value: &Value| -> Result<Path, D::Error> {
         Path::from_value(value).ok_or_else(|| {
            de::Error::custom(format_args!("expected a path, got {kind} {value}", kind = value.kind()))
         })
      };

      let env = match record.env {
         None | Some(Value::Null) => None,
         Some(Value::Scope(scope)) => Some(scope),
         Some(other) => {
            return Err(de::Error::custom(format_args!(
               "expected a scope, got {kind} {other}",
               kind = other.kind(),
            )));
         },
      };

      Ok(ThunkSpec {
         cmd: decode_path(&record.cmd)?,
         args: record.args,
         stdin: record.stdin,
         env,
         dir: match record.dir {
            None | Some(Value::Null) => None,
            Some(ref dir) => Some(decode_path(dir)?),
         },
      })
   }
}

/// A command invocation with its arguments, standard input, environment and
/// working directory. Immutable, every modifier returns a new thunk.
#[derive(Debug, Clone, PartialEq)]
pub struct Thunk(Arc<ThunkSpec>);

impl Dupe for Thunk {}

impl fmt::Display for Thunk {
   fn fmt(&self, writer: &mut fmt::Formatter<'_>) -> fmt::Result {
      write!(writer, "<thunk: ({cmd}", cmd = self.0.cmd)?;

      for arg in &self.0.args {
         write!(writer, " {arg}")?;
      }

      writer.write_str(")>")
   }
}

impl Serialize for Thunk {
   fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
      self.0.serialize(serializer)
   }
}

impl<'de> Deserialize<'de> for Thunk {
   fn deserialize<D: de::Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
      ThunkSpec::deserialize(deserializer).map(Thunk::new)
   }
}

impl Thunk {
   #[must_use]
   pub fn new(spec: ThunkSpec) -> Self {
      Self(Arc::new(spec))
   }

   /// A thunk running `cmd` with no arguments.
   #[must_use]
   pub fn run(cmd: Path) -> Self {
      Self::new(ThunkSpec::builder().cmd(cmd).build())
   }

   #[must_use]
   pub fn spec(&self) -> &ThunkSpec {
      &self.0
   }

   fn modify(&self, modify: impl FnOnce(&mut ThunkSpec)) -> Self {
      let mut spec = (*self.0).clone();
      modify(&mut spec);
      Self::new(spec)
   }

   #[must_use]
   pub fn with_args(&self, args: Vec<Value>) -> Self {
      self.modify(|spec| spec.args = args)
   }

   #[must_use]
   pub fn with_stdin(&self, stdin: Vec<Value>) -> Self {
      self.modify(|spec| spec.stdin = stdin)
   }

   #[must_use]
   pub fn with_env(&self, env: Scope) -> Self {
      self.modify(|spec| spec.env = Some(env))
   }

   #[must_use]
   pub fn with_dir(&self, dir: Path) -> Self {
      self.modify(|spec| spec.dir = Some(dir))
   }

   /// A stable identifier: the hex SHA-256 of the thunk's JSON encoding.
   pub fn name(&self) -> serde_json::Result<String> {
      let encoded = serde_json::to_vec(&*self.0)?;

      Ok(Sha256::digest(&encoded)
         .iter()
         .map(|byte| format!("{byte:02x}"))
         .collect())
   }
}

#[cfg(test)]
mod tests {
   use pretty_assertions::assert_eq;

   use super::*;
   use crate::CommandPath;

   fn echo() -> Thunk {
      Thunk::run(Path::Command(CommandPath::new("echo")))
   }

   #[test]
   fn modifiers_return_new_thunks() {
      let thunk = echo();
      let with_args = thunk.with_args(vec![Value::from("hello")]);

      assert!(thunk.spec().args.is_empty());
      assert_eq!(with_args.spec().args, [Value::from("hello")]);
      assert_ne!(thunk, with_args);
      assert_eq!(with_args.to_string(), "<thunk: (.echo \"hello\")>");
   }

   #[test]
   fn name_is_deterministic() {
      let a = echo().with_args(vec![Value::from(1)]);
      let b = echo().with_args(vec![Value::from(1)]);

      let name = a.name().ok();
      assert_eq!(name, b.name().ok());
      assert_eq!(name.map(|name| name.len()), Some(64));
      assert_ne!(a.name().ok(), echo().name().ok());
   }
}
