//! Application-level error handling.
//!
//! Library crates in this workspace expose precise, typed errors. Once those errors cross into application code (the
//! CLI, configuration loading, and so on) the exact type rarely matters anymore, and what matters is carrying a
//! readable chain of context up to wherever it gets logged. [`GenericError`] is that type.
#![deny(warnings)]
#![deny(missing_docs)]

use std::fmt::Display;

/// A type-erased error with an attached chain of context.
pub type GenericError = anyhow::Error;

mod private {
    pub trait Sealed {}

    impl<T, E> Sealed for Result<T, E> {}
}

/// Extension methods for attaching context to a failed `Result`.
///
/// Named distinctly from `snafu::ResultExt::context` so both traits can be in scope at once.
pub trait ErrorContext<T, E>: private::Sealed {
    /// Wraps the error with the given context.
    fn error_context<C>(self, context: C) -> Result<T, GenericError>
    where
        C: Display + Send + Sync + 'static;

    /// Wraps the error with context that is only built if an error actually occurred.
    fn with_error_context<C, F>(self, f: F) -> Result<T, GenericError>
    where
        C: Display + Send + Sync + 'static,
        F: FnOnce() -> C;
}

impl<T, E> ErrorContext<T, E> for Result<T, E>
where
    Result<T, E>: anyhow::Context<T, E>,
{
    fn error_context<C>(self, context: C) -> Result<T, GenericError>
    where
        C: Display + Send + Sync + 'static,
    {
        <Self as anyhow::Context<T, E>>::context(self, context)
    }

    fn with_error_context<C, F>(self, f: F) -> Result<T, GenericError>
    where
        C: Display + Send + Sync + 'static,
        F: FnOnce() -> C,
    {
        <Self as anyhow::Context<T, E>>::with_context(self, f)
    }
}
