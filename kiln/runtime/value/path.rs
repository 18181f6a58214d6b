//! The path algebra: file, directory and command paths, paths extended from
//! an arbitrary parent, and paths into the output of a thunk.

use std::{
   fmt,
   sync::Arc,
};

use arcstr::ArcStr;
use kiln_util::Dupe;

use crate::{
   Error,
   Result,
   Thunk,
   Value,
};

pub const SEPARATOR: char = '/';

/// A path to a file, relative unless it starts with [`SEPARATOR`].
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct FilePath(ArcStr);

/// A path to a directory. The root directory is the empty string.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct DirPath(ArcStr);

/// A command looked up by name, written `.name`.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CommandPath(ArcStr);

impl Dupe for FilePath {}
impl Dupe for DirPath {}
impl Dupe for CommandPath {}

impl FilePath {
   #[must_use]
   pub fn new(path: &str) -> Self {
      Self(ArcStr::from(path))
   }

   #[must_use]
   pub fn path(&self) -> &str {
      &self.0
   }
}

impl DirPath {
   #[must_use]
   pub fn new(path: &str) -> Self {
      Self(ArcStr::from(path))
   }

   #[must_use]
   pub fn root() -> Self {
      Self::new("")
   }

   #[must_use]
   pub fn path(&self) -> &str {
      &self.0
   }

   fn join(&self, child: &FileOrDirPath) -> FileOrDirPath {
      let joined = format!("{parent}{SEPARATOR}{child}", parent = self.0, child = child.name());

      match *child {
         FileOrDirPath::File(_) => FileOrDirPath::File(FilePath::new(&joined)),
         FileOrDirPath::Dir(_) => FileOrDirPath::Dir(DirPath::new(&joined)),
      }
   }
}

impl CommandPath {
   #[must_use]
   pub fn new(name: &str) -> Self {
      Self(ArcStr::from(name))
   }

   #[must_use]
   pub fn name(&self) -> &str {
      &self.0
   }
}

fn is_explicit(path: &str) -> bool {
   path.starts_with(SEPARATOR)
      || path == "."
      || path == ".."
      || path.starts_with("./")
      || path.starts_with("../")
}

impl fmt::Display for FilePath {
   fn fmt(&self, writer: &mut fmt::Formatter<'_>) -> fmt::Result {
      if is_explicit(&self.0) {
         writer.write_str(&self.0)
      } else {
         write!(writer, "./{path}", path = self.0)
      }
   }
}

impl fmt::Display for DirPath {
   fn fmt(&self, writer: &mut fmt::Formatter<'_>) -> fmt::Result {
      if self.0.is_empty() {
         write!(writer, "{SEPARATOR}")
      } else if is_explicit(&self.0) {
         write!(writer, "{path}{SEPARATOR}", path = self.0)
      } else {
         write!(writer, "./{path}{SEPARATOR}", path = self.0)
      }
   }
}

impl fmt::Display for CommandPath {
   fn fmt(&self, writer: &mut fmt::Formatter<'_>) -> fmt::Result {
      write!(writer, ".{name}", name = self.0)
   }
}

/// The segment kinds a path can be extended with.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum FileOrDirPath {
   File(FilePath),
   Dir(DirPath),
}

impl Dupe for FileOrDirPath {}

impl fmt::Display for FileOrDirPath {
   fn fmt(&self, writer: &mut fmt::Formatter<'_>) -> fmt::Result {
      match *self {
         FileOrDirPath::File(ref path) => write!(writer, "{path}"),
         FileOrDirPath::Dir(ref path) => write!(writer, "{path}"),
      }
   }
}

impl FileOrDirPath {
   /// The raw path text, without display prefixes or trailing separators.
   #[must_use]
   pub fn name(&self) -> &str {
      match *self {
         FileOrDirPath::File(ref path) => path.path(),
         FileOrDirPath::Dir(ref path) => path.path(),
      }
   }

   #[must_use]
   pub fn is_dir(&self) -> bool {
      matches!(*self, FileOrDirPath::Dir(_))
   }

   /// The raw path text as a logical path, directories keep a trailing
   /// separator.
   fn raw(&self) -> String {
      match *self {
         FileOrDirPath::File(ref path) => path.path().to_owned(),
         FileOrDirPath::Dir(ref path) => format!("{path}{SEPARATOR}", path = path.path()),
      }
   }

   /// Joins `child` onto this path. Only directories can be extended.
   pub fn extend(&self, child: &FileOrDirPath) -> Result<FileOrDirPath> {
      match *self {
         FileOrDirPath::Dir(ref dir) => Ok(dir.join(child)),
         FileOrDirPath::File(ref file) => {
            Err(Error::PathExtend {
               parent: Value::FilePath(file.dupe()),
               child:  Value::from(child.dupe()),
            })
         },
      }
   }
}

#[derive(Debug)]
struct ExtendInner {
   parent: Value,
   child:  FileOrDirPath,
}

/// A path whose parent is an arbitrary form, resolved at evaluation time.
#[derive(Debug, Clone)]
pub struct ExtendPath(Arc<ExtendInner>);

impl Dupe for ExtendPath {}

impl fmt::Display for ExtendPath {
   fn fmt(&self, writer: &mut fmt::Formatter<'_>) -> fmt::Result {
      let parent = self.0.parent.to_string();
      writer.write_str(&parent)?;

      if !parent.ends_with(SEPARATOR) {
         write!(writer, "{SEPARATOR}")?;
      }

      writer.write_str(self.0.child.name())?;

      if self.0.child.is_dir() {
         write!(writer, "{SEPARATOR}")?;
      }

      Ok(())
   }
}

impl ExtendPath {
   #[must_use]
   pub fn new(parent: Value, child: FileOrDirPath) -> Self {
      Self(Arc::new(ExtendInner { parent, child }))
   }

   #[must_use]
   pub fn parent(&self) -> &Value {
      &self.0.parent
   }

   #[must_use]
   pub fn child(&self) -> &FileOrDirPath {
      &self.0.child
   }

   fn logical(&self) -> Option<String> {
      let parent = match *self.0.parent.unannotated() {
         Value::DirPath(ref dir) => dir_logical(dir),
         Value::ExtendPath(ref path) => path.logical()?,
         _ => return None,
      };

      parent
         .ends_with(SEPARATOR)
         .then(|| normalize(&format!("{parent}{child}", child = self.0.child.raw())))
   }
}

/// A path inside the output of a thunk.
#[derive(Debug, Clone, PartialEq)]
pub struct ThunkPath {
   thunk: Thunk,
   path:  FileOrDirPath,
}

impl Dupe for ThunkPath {}

impl fmt::Display for ThunkPath {
   fn fmt(&self, writer: &mut fmt::Formatter<'_>) -> fmt::Result {
      write!(
         writer,
         "{thunk}{SEPARATOR}{path}",
         thunk = self.thunk,
         path = self.path.name(),
      )?;

      if self.path.is_dir() {
         write!(writer, "{SEPARATOR}")?;
      }

      Ok(())
   }
}

impl ThunkPath {
   #[must_use]
   pub fn new(thunk: Thunk, path: FileOrDirPath) -> Self {
      Self { thunk, path }
   }

   #[must_use]
   pub fn thunk(&self) -> &Thunk {
      &self.thunk
   }

   #[must_use]
   pub fn path(&self) -> &FileOrDirPath {
      &self.path
   }
}

/// Any value that can be used as a path.
#[derive(Debug, Clone)]
pub enum Path {
   File(FilePath),
   Dir(DirPath),
   Command(CommandPath),
   Extend(ExtendPath),
   Thunk(ThunkPath),
}

impl Dupe for Path {}

impl fmt::Display for Path {
   fn fmt(&self, writer: &mut fmt::Formatter<'_>) -> fmt::Result {
      match *self {
         Path::File(ref path) => write!(writer, "{path}"),
         Path::Dir(ref path) => write!(writer, "{path}"),
         Path::Command(ref path) => write!(writer, "{path}"),
         Path::Extend(ref path) => write!(writer, "{path}"),
         Path::Thunk(ref path) => write!(writer, "{path}"),
      }
   }
}

/// Compares logical paths, so `./foo` extended with `bar` equals `./foo/bar`.
impl PartialEq for Path {
   fn eq(&self, other: &Self) -> bool {
      match (self, other) {
         (&Path::Thunk(ref a), &Path::Thunk(ref b)) => a == b,
         (&Path::Command(ref a), &Path::Command(ref b)) => a == b,
         (&(Path::Thunk(_) | Path::Command(_)), _) | (_, &(Path::Thunk(_) | Path::Command(_))) => {
            false
         },

         _ => {
            match (self.logical(), other.logical()) {
               (Some(a), Some(b)) => a == b,

               // Unresolved parents compare structurally.
               _ => {
                  match (self, other) {
                     (&Path::Extend(ref a), &Path::Extend(ref b)) => {
                        a.parent() == b.parent() && a.child() == b.child()
                     },
                     _ => false,
                  }
               },
            }
         },
      }
   }
}

impl From<FileOrDirPath> for Path {
   fn from(path: FileOrDirPath) -> Self {
      match path {
         FileOrDirPath::File(path) => Path::File(path),
         FileOrDirPath::Dir(path) => Path::Dir(path),
      }
   }
}

fn dir_logical(dir: &DirPath) -> String {
   normalize(&format!("{path}{SEPARATOR}", path = dir.path()))
}

/// Drops `.` components and empty components. A trailing separator marks a
/// directory and is kept.
fn normalize(raw: &str) -> String {
   let absolute = raw.starts_with(SEPARATOR);
   let directory = raw.ends_with(SEPARATOR);

   let mut normal = raw
      .split(SEPARATOR)
      .filter(|component| !component.is_empty() && *component != ".")
      .collect::<Vec<_>>()
      .join("/");

   if absolute {
      normal.insert(0, SEPARATOR);
   }

   if normal.is_empty() {
      normal.push('.');
   }

   if directory && !normal.ends_with(SEPARATOR) {
      normal.push(SEPARATOR);
   }

   normal
}

impl Path {
   /// The path a value can act as, if any.
   #[must_use]
   pub fn from_value(value: &Value) -> Option<Self> {
      Some(match *value.unannotated() {
         Value::FilePath(ref path) => Path::File(path.dupe()),
         Value::DirPath(ref path) => Path::Dir(path.dupe()),
         Value::CommandPath(ref path) => Path::Command(path.dupe()),
         Value::ExtendPath(ref path) => Path::Extend(path.dupe()),
         Value::ThunkPath(ref path) => Path::Thunk(path.dupe()),
         _ => return None,
      })
   }

   /// The normalized textual form of a filesystem path, `None` for commands,
   /// thunk paths and extensions of unresolved parents.
   #[must_use]
   pub fn logical(&self) -> Option<String> {
      match *self {
         Path::File(ref path) => Some(normalize(path.path())),
         Path::Dir(ref path) => Some(dir_logical(path)),
         Path::Extend(ref path) => path.logical(),
         Path::Command(_) | Path::Thunk(_) => None,
      }
   }

   /// Appends a segment. Files and commands cannot be extended, thunk paths
   /// keep their thunk and extend the path inside it.
   pub fn extend(&self, child: FileOrDirPath) -> Result<Path> {
      match *self {
         Path::Dir(ref dir) => Ok(Path::Extend(ExtendPath::new(Value::DirPath(dir.dupe()), child))),

         Path::Extend(ref path) if path.child().is_dir() => {
            Ok(Path::Extend(ExtendPath::new(
               Value::ExtendPath(path.dupe()),
               child,
            )))
         },

         Path::Thunk(ref path) => {
            Ok(Path::Thunk(ThunkPath::new(
               path.thunk.dupe(),
               path.path.extend(&child)?,
            )))
         },

         Path::File(_) | Path::Command(_) | Path::Extend(_) => {
            Err(Error::PathExtend {
               parent: Value::from(self.dupe()),
               child:  Value::from(child),
            })
         },
      }
   }
}

/// Resolves an evaluated parent against a child segment.
///
/// A thunk parent yields a path into the thunk's output. Any other parent must
/// be a path.
pub fn extend_value(parent: Value, child: FileOrDirPath) -> Result<Value> {
   match *parent.unannotated() {
      Value::Thunk(ref thunk) => Ok(Value::ThunkPath(ThunkPath::new(thunk.dupe(), child))),

      ref parent => {
         match Path::from_value(parent) {
            Some(path) => path.extend(child).map(Value::from),
            None => {
               Err(Error::PathExtend {
                  parent: parent.dupe(),
                  child:  Value::from(child),
               })
            },
         }
      },
   }
}

#[cfg(test)]
mod tests {
   use pretty_assertions::assert_eq;

   use super::*;
   use crate::ThunkSpec;

   fn file(path: &str) -> FileOrDirPath {
      FileOrDirPath::File(FilePath::new(path))
   }

   fn dir(path: &str) -> FileOrDirPath {
      FileOrDirPath::Dir(DirPath::new(path))
   }

   #[test]
   fn extension_equals_literal_path() {
      let extended = Path::Dir(DirPath::new("."))
         .extend(dir("foo"))
         .and_then(|path| path.extend(file("bar")));

      assert_eq!(extended.ok(), Some(Path::File(FilePath::new("./foo/bar"))));
      assert_eq!(
         Path::File(FilePath::new("foo")),
         Path::File(FilePath::new("./foo")),
      );
      assert_ne!(
         Path::File(FilePath::new("foo")),
         Path::Dir(DirPath::new("foo")),
      );
   }

   #[test]
   fn files_and_commands_do_not_extend() {
      for path in [
         Path::File(FilePath::new("foo")),
         Path::Command(CommandPath::new("ls")),
      ] {
         let Err(Error::PathExtend { parent, child }) = path.extend(file("bar")) else {
            panic!("extending {path} must fail");
         };

         assert_eq!(parent, Value::from(path));
         assert_eq!(child, Value::FilePath(FilePath::new("bar")));
      }
   }

   #[test]
   fn thunk_paths_keep_their_thunk() {
      let thunk = Thunk::new(
         ThunkSpec::builder()
            .cmd(Path::Command(CommandPath::new("build")))
            .build(),
      );

      let Ok(Value::ThunkPath(path)) = extend_value(Value::Thunk(thunk.dupe()), dir("out")) else {
         panic!("a thunk parent must produce a thunk path");
      };

      let Ok(Path::Thunk(extended)) = Path::Thunk(path).extend(file("bin")) else {
         panic!("thunk paths must extend");
      };

      assert_eq!(*extended.thunk(), thunk);
      assert_eq!(*extended.path(), file("out/bin"));
   }

   #[test]
   fn display_is_explicit() {
      assert_eq!(FilePath::new("foo").to_string(), "./foo");
      assert_eq!(DirPath::new("foo").to_string(), "./foo/");
      assert_eq!(DirPath::root().to_string(), "/");
      assert_eq!(DirPath::new("..").to_string(), "../");
      assert_eq!(CommandPath::new("go").to_string(), ".go");

      let extended = ExtendPath::new(
         Value::DirPath(DirPath::root()),
         dir("absolute"),
      );
      let extended = ExtendPath::new(Value::ExtendPath(extended), file("path"));

      assert_eq!(extended.to_string(), "/absolute/path");
      assert_eq!(
         Path::Extend(extended),
         Path::File(FilePath::new("/absolute/path")),
      );
   }
}
