//! RFC 7807 problem details.
//!
//! [`ProblemDetails`] is the one error body this crate produces. It is built
//! per request by [`ProblemDetailsFactory`] or a mapping registered on
//! [`ProblemDetailsOptions`], and serialized by a [`ProblemDetailsWriter`]
//! chosen from the request's `Accept` header.

mod error;
mod factory;
mod options;
mod writer;

use std::collections::BTreeMap;

use http::StatusCode;
use serde::{Deserialize, Deserializer, Serialize, Serializer};

pub use error::{PanicError, ProblemDetailsError, ValidationFailed, ValidationFailure};
pub use factory::{ProblemDetailsFactory, ValidationOverrides};
pub use options::{ProblemContext, ProblemDetailsOptions};
pub use writer::{
    JsonProblemDetailsWriter, ProblemDetailsService, ProblemDetailsWriter, WriteError,
    XmlProblemDetailsWriter, to_xml,
};

use crate::error::Error;

/// Type URI prefix for problems that are fully described by their status code.
pub const STATUS_TYPE_BASE: &str = "https://httpstatuses.com/";

#[allow(clippy::trivially_copy_pass_by_ref)] // serde requires &T
fn serialize_status<S: Serializer>(status: &StatusCode, serializer: S) -> Result<S::Ok, S::Error> {
    serializer.serialize_u16(status.as_u16())
}

fn deserialize_status<'de, D: Deserializer<'de>>(deserializer: D) -> Result<StatusCode, D::Error> {
    let code = u16::deserialize(deserializer)?;
    StatusCode::from_u16(code).map_err(serde::de::Error::custom)
}

/// RFC 7807 Problem Details for HTTP APIs, with per-field validation errors.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProblemDetails {
    /// URI reference that identifies the problem type.
    #[serde(rename = "type")]
    pub type_uri: String,
    /// Short, human-readable summary of the problem type.
    pub title: String,
    /// Explanation specific to this occurrence.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub detail: Option<String>,
    #[serde(serialize_with = "serialize_status", deserialize_with = "deserialize_status")]
    pub status: StatusCode,
    /// URI reference that identifies this occurrence.
    pub instance: String,
    /// Validation errors keyed by field name.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub validation_errors: Option<BTreeMap<String, Vec<ValidationError>>>,
}

/// One reason a field failed validation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ValidationError {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub code: Option<String>,
    pub reason: String,
}

impl ValidationError {
    pub fn new(reason: impl Into<String>) -> Self {
        Self { code: None, reason: reason.into() }
    }

    pub fn with_code(code: impl Into<String>, reason: impl Into<String>) -> Self {
        Self { code: Some(code.into()), reason: reason.into() }
    }
}

impl ProblemDetails {
    pub fn new(status: StatusCode, type_uri: impl Into<String>, title: impl Into<String>) -> Self {
        Self {
            type_uri: type_uri.into(),
            title: title.into(),
            detail: None,
            status,
            instance: problem_number(),
            validation_errors: None,
        }
    }

    /// Problem details fully described by `status`.
    ///
    /// The type URI points at the status code's documentation and the title
    /// is its reason phrase, except `400 Bad Request`, whose reason phrase
    /// says nothing useful and is replaced by `default_title`.
    pub fn for_status(status: StatusCode, default_title: &str) -> Self {
        let title = if status == StatusCode::BAD_REQUEST {
            default_title
        } else {
            status.canonical_reason().unwrap_or(default_title)
        };
        Self::new(status, format!("{STATUS_TYPE_BASE}{}", status.as_u16()), title)
    }

    #[must_use]
    pub fn with_detail(mut self, detail: impl Into<String>) -> Self {
        self.detail = Some(detail.into());
        self
    }

    #[must_use]
    pub fn with_instance(mut self, instance: impl Into<String>) -> Self {
        self.instance = instance.into();
        self
    }

    #[must_use]
    pub fn with_validation_errors(mut self, errors: BTreeMap<String, Vec<ValidationError>>) -> Self {
        self.validation_errors = Some(errors);
        self
    }
}

/// A fresh identifier for one occurrence of a problem: 32 lowercase hex digits.
pub fn problem_number() -> String {
    uuid::Uuid::new_v4().simple().to_string()
}

/// The type URI for problems raised as error type `T`.
///
/// `urn:{namespace}:{name}`, lowercased, where `name` is the unqualified type
/// name with every occurrence of `Error` removed. Generic arguments are ignored.
///
/// ```rust
/// # use gangway::problem::type_uri_for;
/// struct InsufficientFundsError;
/// assert_eq!(
///     type_uri_for::<InsufficientFundsError>("Bank").unwrap(),
///     "urn:bank:insufficientfunds",
/// );
/// ```
///
/// # Errors
///
/// Returns [`Error::BlankNamespace`] if `namespace` is empty or whitespace.
pub fn type_uri_for<T: ?Sized>(namespace: &str) -> Result<String, Error> {
    if namespace.trim().is_empty() {
        return Err(Error::BlankNamespace);
    }

    let full = std::any::type_name::<T>();
    let bare = full.split('<').next().unwrap_or(full);
    let bare = bare.rsplit("::").next().unwrap_or(bare);
    let name = bare.replace("Error", "");
    let name = if name.is_empty() { "Unknown" } else { name.as_str() };

    Ok(format!("urn:{namespace}:{name}").to_lowercase())
}

#[cfg(test)]
mod tests {
    use super::*;

    struct OrderRejectedError;
    struct ErrorCodeError;
    struct Error;
    struct Plain;

    #[test]
    fn type_uri_strips_error_and_path() {
        assert_eq!(type_uri_for::<OrderRejectedError>("Shop").unwrap(), "urn:shop:orderrejected");
        assert_eq!(type_uri_for::<Plain>("shop").unwrap(), "urn:shop:plain");
        assert_eq!(type_uri_for::<Error>("shop").unwrap(), "urn:shop:unknown");
        assert_eq!(type_uri_for::<Vec<u8>>("shop").unwrap(), "urn:shop:vec");
        assert_eq!(type_uri_for::<ErrorCodeError>("shop").unwrap(), "urn:shop:code");
    }

    #[test]
    fn type_uri_rejects_blank_namespace() {
        assert!(type_uri_for::<Plain>("  ").is_err());
    }

    #[test]
    fn problem_number_is_simple_uuid() {
        let n = problem_number();
        assert_eq!(n.len(), 32);
        assert!(n.chars().all(|c| c.is_ascii_hexdigit() && !c.is_ascii_uppercase()));
        assert_ne!(n, problem_number());
    }

    #[test]
    fn status_shape() {
        let p = ProblemDetails::for_status(StatusCode::NOT_FOUND, "Oops");
        assert_eq!(p.type_uri, "https://httpstatuses.com/404");
        assert_eq!(p.title, "Not Found");
        assert_eq!(p.detail, None);

        let p = ProblemDetails::for_status(StatusCode::BAD_REQUEST, "Oops");
        assert_eq!(p.title, "Oops");
    }

    #[test]
    fn json_shape() {
        let mut errors = BTreeMap::new();
        errors.insert("email".to_owned(), vec![ValidationError::new("required")]);
        let p = ProblemDetails::for_status(StatusCode::BAD_REQUEST, "Oops")
            .with_instance("abc")
            .with_validation_errors(errors);

        let json = serde_json::to_value(&p).unwrap();
        assert_eq!(json, serde_json::json!({
            "type": "https://httpstatuses.com/400",
            "title": "Oops",
            "status": 400,
            "instance": "abc",
            "validationErrors": { "email": [ { "reason": "required" } ] }
        }));

        let back: ProblemDetails = serde_json::from_value(json).unwrap();
        assert_eq!(back, p);
    }
}
