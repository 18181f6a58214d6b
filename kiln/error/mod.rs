//! Error handling utilities for kiln binaries and opaque combiner failures.

use std::{
   error,
   fmt,
   io::{
      self,
      Write as _,
   },
   process,
   result,
   sync::Arc,
};

use kiln_util::Dupe;
use yansi::Paint as _;

/// A type alias for concise use of [`Error`].
pub type Result<T> = result::Result<T, Error>;

/// The error type. Stores an error chain that can be appended to with
/// [`Contextful`]. Formatting it with [`fmt::Debug`] shows the whole chain,
/// outermost context last.
#[derive(Clone)]
pub struct Error(#[doc(hidden)] pub Arc<anyhow::Error>);

impl Dupe for Error {}

impl fmt::Display for Error {
   fn fmt(&self, writer: &mut fmt::Formatter<'_>) -> fmt::Result {
      fmt::Display::fmt(&*self.0, writer)
   }
}

impl fmt::Debug for Error {
   fn fmt(&self, writer: &mut fmt::Formatter<'_>) -> fmt::Result {
      let mut chain = self.0.chain().rev().peekable();

      while let Some(error) = chain.next() {
         let header = if chain.peek().is_none() {
            "error:"
         } else {
            "cause:"
         };

         let message = error.to_string();
         let mut chars = message.char_indices();

         write!(writer, "{header} ", header = header.red().bold())?;

         match (chars.next(), chars.next()) {
            (Some((_, first)), Some((second_start, second))) if second.is_lowercase() => {
               writeln!(
                  writer,
                  "{first_lowercase}{rest}",
                  first_lowercase = first.to_lowercase(),
                  rest = &message[second_start..],
               )?;
            },

            _ => writeln!(writer, "{message}")?,
         }
      }

      Ok(())
   }
}

impl error::Error for Error {
   fn source(&self) -> Option<&(dyn error::Error + 'static)> {
      self.0.source()
   }
}

#[doc(hidden)]
pub mod private {
   pub use anyhow;
}

/// Creates an [`Error`] from the provided format arguments.
///
/// # Example
///
/// ```rs
/// get_result().map_err(|error| error!("found error: {error}"))
/// ```
#[macro_export]
macro_rules! error {
   ($($t:tt)*) => {
      $crate::Error(::std::sync::Arc::new($crate::private::anyhow::anyhow!($($t)*)))
   };
}

/// A macro that boils down to:
///
/// ```rs
/// return Err(error!(arguments));
/// ```
#[macro_export]
macro_rules! bail {
   ($($t:tt)*) => {
      return ::std::result::Result::Err($crate::error!($($t)*).into())
   };
}

/// The type of the context accepted by [`Contextful`].
pub trait Context: fmt::Display + Send + Sync + 'static {}

impl<T: fmt::Display + Send + Sync + 'static> Context for T {}

/// A trait to add context to [`Error`].
pub trait Contextful<T> {
   /// Appends the context to the error chain.
   fn context(self, context: impl Context) -> Result<T>;

   /// Appends the context to the error chain, lazily.
   fn with_context<C: Context>(self, context: impl FnOnce() -> C) -> Result<T>;
}

impl<T> Contextful<T> for Option<T> {
   fn context(self, context: impl Context) -> Result<T> {
      anyhow::Context::context(self, context).map_err(|error| Error(Arc::new(error)))
   }

   fn with_context<C: Context>(self, context: impl FnOnce() -> C) -> Result<T> {
      anyhow::Context::with_context(self, context).map_err(|error| Error(Arc::new(error)))
   }
}

impl<T, E: error::Error + Send + Sync + 'static> Contextful<T> for result::Result<T, E> {
   fn context(self, context: impl Context) -> Result<T> {
      anyhow::Context::context(self, context).map_err(|error| Error(Arc::new(error)))
   }

   fn with_context<C: Context>(self, context: impl FnOnce() -> C) -> Result<T> {
      anyhow::Context::with_context(self, context).map_err(|error| Error(Arc::new(error)))
   }
}

/// The termination type. Meant to be used as the return type of the main
/// function.
///
/// Created from a [`Result`] with [`From`]. Will pretty print the error chain
/// to standard error.
#[derive(Clone)]
pub struct Termination(Option<Error>);

impl<E: Into<Error>> From<result::Result<(), E>> for Termination {
   fn from(result: result::Result<(), E>) -> Self {
      match result {
         Ok(()) => Self::success(),
         Err(error) => Self::error(error.into()),
      }
   }
}

impl process::Termination for Termination {
   fn report(self) -> process::ExitCode {
      match self.0 {
         None => process::ExitCode::SUCCESS,

         Some(error) => {
            let _ = write!(io::stderr(), "{error:?}");
            process::ExitCode::FAILURE
         },
      }
   }
}

impl Termination {
   /// Creates a [`Termination`] from the provided [`Error`].
   #[must_use]
   pub fn error(error: Error) -> Self {
      Self(Some(error))
   }

   /// Creates a successful [`Termination`] that returns success.
   #[must_use]
   pub fn success() -> Self {
      Self(None)
   }
}
