use std::{
   fs,
   path::{
      Path,
      PathBuf,
   },
};

use indexmap::IndexMap;
use kiln_error::{
   self as error,
   Contextful as _,
};
use kiln_runtime::{
   Scope,
   Symbol,
   Value,
};
use kiln_util::Dupe as _;

/// Configuration of the `kiln` binary, read from TOML.
#[derive(serde::Deserialize, Debug, Default)]
#[serde(default, deny_unknown_fields, rename_all = "kebab-case")]
pub struct Config {
   /// A `tracing` filter directive, used when `KILN_LOG` is not set.
   pub log: Option<String>,

   /// Bindings of the `*env*` scope scripts run with. Path objects such as
   /// `{ dir = "src" }` become path values.
   pub env: IndexMap<String, Value>,
}

impl Config {
   /// Where the configuration lives when no path is given.
   #[must_use]
   pub fn default_path() -> Option<PathBuf> {
      dirs::config_dir().map(|dir| dir.join("kiln").join("config.toml"))
   }

   pub fn from_toml(source: &str) -> error::Result<Self> {
      toml::from_str(source).context("failed to parse config")
   }

   /// Loads the configuration at `path`, or at [`Config::default_path`] if it
   /// exists. Falls back to the defaults otherwise.
   pub fn load(path: Option<&Path>) -> error::Result<Self> {
      let path = match path {
         Some(path) => path.to_owned(),

         None => {
            match Self::default_path() {
               Some(path) if path.exists() => path,
               _ => return Ok(Self::default()),
            }
         },
      };

      let source = fs::read_to_string(&path).with_context(|| {
         format!(
            "failed to read config from '{path}'",
            path = path.display(),
         )
      })?;

      toml::from_str(&source).with_context(|| {
         format!(
            "failed to parse config at '{path}'",
            path = path.display(),
         )
      })
   }

   /// A fresh scope holding the `env` bindings, in order.
   #[must_use]
   pub fn env_scope(&self) -> Scope {
      let scope = Scope::empty();

      for (name, value) in &self.env {
         scope.set(Symbol::new(name), value.dupe());
      }

      scope
   }
}

#[cfg(test)]
mod tests {
   use kiln_runtime::{
      DirPath,
      Path as ValuePath,
   };
   use pretty_assertions::assert_eq;

   use super::*;

   #[test]
   fn env_values_decode_like_json() {
      let config = Config::from_toml(
         r#"
            log = "kiln=debug"

            [env]
            name = "kiln"
            jobs = 4
            src = { dir = "src" }
         "#,
      );

      let Ok(config) = config else {
         panic!("the config must parse");
      };

      assert_eq!(config.log.as_deref(), Some("kiln=debug"));

      let scope = config.env_scope();
      assert_eq!(scope.get(&Symbol::new("name")), Some(Value::from("kiln")));
      assert_eq!(scope.get(&Symbol::new("jobs")), Some(Value::from(4)));
      assert_eq!(
         scope.get(&Symbol::new("src")),
         Some(Value::from(ValuePath::Dir(DirPath::new("src")))),
      );
   }

   #[test]
   fn unknown_keys_are_rejected() {
      assert!(Config::from_toml("colour = true").is_err());
      assert!(Config::from_toml("[env]\nratio = 0.5").is_err());
   }

   #[test]
   fn empty_config_is_default() {
      let Ok(config) = Config::from_toml("") else {
         panic!("an empty config must parse");
      };

      assert!(config.log.is_none());
      assert!(config.env.is_empty());
   }
}
