//! Unified error type.

use thiserror::Error;

/// A type-erased error raised by a handler or middleware.
///
/// This is what flows out of the pipeline as an "unhandled" error and what
/// [`ProblemDetailsMiddleware`](crate::middleware::ProblemDetailsMiddleware)
/// turns into a problem details body.
pub type BoxError = Box<dyn std::error::Error + Send + Sync + 'static>;

/// The error type returned by gangway's fallible operations.
///
/// Application-level errors (404, 422, etc.) are expressed as HTTP
/// [`Response`](crate::Response) values or as [`BoxError`]s carried by them,
/// not as `Error`s. This type surfaces infrastructure and configuration
/// failures.
#[derive(Debug, Error)]
pub enum Error {
    #[error("io: {0}")]
    Io(#[from] std::io::Error),

    #[error("invalid socket address `{0}`")]
    InvalidAddress(String),

    #[error("invalid request path `{path}`")]
    InvalidPath { path: String },

    #[error("fallback path must be non-empty and start with `/`, got `{0}`")]
    InvalidFallbackPath(String),

    #[error("type URI namespace must not be blank")]
    BlankNamespace,
}
