//! Errors that carry, or map onto, problem details.

use std::any::Any;
use std::fmt;

use thiserror::Error;

use super::ProblemDetails;

/// An error that already is a problem details body.
///
/// Return it from a handler to choose the exact response: the problem
/// details middleware forwards it unchanged.
#[derive(Debug, Clone)]
pub struct ProblemDetailsError(pub ProblemDetails);

impl fmt::Display for ProblemDetailsError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} : {}", self.0.type_uri, self.0.title)
    }
}

impl std::error::Error for ProblemDetailsError {}

impl ProblemDetailsError {
    pub fn details(&self) -> &ProblemDetails {
        &self.0
    }

    /// Multi-line dump of every field, for logs.
    pub fn describe(&self) -> String {
        let d = &self.0;
        format!(
            "Type    : {}\nTitle   : {}\nStatus  : {}\nDetail  : {}\nInstance: {}\n",
            d.type_uri,
            d.title,
            d.status.as_u16(),
            d.detail.as_deref().unwrap_or_default(),
            d.instance,
        )
    }
}

impl From<ProblemDetails> for ProblemDetailsError {
    fn from(details: ProblemDetails) -> Self {
        Self(details)
    }
}

/// A single field that failed validation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidationFailure {
    pub field: String,
    pub code: Option<String>,
    pub reason: String,
}

impl ValidationFailure {
    pub fn new(field: impl Into<String>, reason: impl Into<String>) -> Self {
        Self { field: field.into(), code: None, reason: reason.into() }
    }

    pub fn with_code(field: impl Into<String>, code: impl Into<String>, reason: impl Into<String>) -> Self {
        Self { field: field.into(), code: Some(code.into()), reason: reason.into() }
    }
}

/// Input was rejected by validation.
///
/// Mapped by default to a `400` validation problem details body listing
/// every failure under its field.
#[derive(Debug, Clone)]
pub struct ValidationFailed {
    failures: Vec<ValidationFailure>,
}

impl ValidationFailed {
    pub fn new(failures: Vec<ValidationFailure>) -> Self {
        Self { failures }
    }

    pub fn failures(&self) -> &[ValidationFailure] {
        &self.failures
    }
}

impl fmt::Display for ValidationFailed {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "validation failed")?;
        for (i, failure) in self.failures.iter().enumerate() {
            let sep = if i == 0 { ": " } else { "; " };
            write!(f, "{sep}{}: {}", failure.field, failure.reason)?;
        }
        Ok(())
    }
}

impl std::error::Error for ValidationFailed {}

/// A handler panicked.
#[derive(Debug, Error)]
#[error("handler panicked: {message}")]
pub struct PanicError {
    message: String,
}

impl PanicError {
    pub(crate) fn from_payload(payload: &(dyn Any + Send)) -> Self {
        let message = payload
            .downcast_ref::<&'static str>()
            .map(|s| (*s).to_owned())
            .or_else(|| payload.downcast_ref::<String>().cloned())
            .unwrap_or_else(|| "unknown panic payload".to_owned());
        Self { message }
    }

    pub fn message(&self) -> &str {
        &self.message
    }
}
