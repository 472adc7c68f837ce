//! Construction of problem details outside the error path.

use std::collections::BTreeMap;
use std::sync::Arc;

use http::StatusCode;

use super::{
    ProblemContext, ProblemDetails, ProblemDetailsOptions, ValidationError, ValidationFailed,
    ValidationFailure, problem_number,
};

/// Caller-supplied fields for a validation problem. `None` keeps the default.
#[derive(Clone, Debug, Default)]
pub struct ValidationOverrides {
    pub status: Option<StatusCode>,
    pub title: Option<String>,
    pub type_uri: Option<String>,
    pub detail: Option<String>,
    pub instance: Option<String>,
}

/// Produces problem details for framework-detected failures, in the same
/// shape the middleware uses for errors.
#[derive(Clone, Debug)]
pub struct ProblemDetailsFactory {
    options: Arc<ProblemDetailsOptions>,
}

impl ProblemDetailsFactory {
    pub fn new(options: Arc<ProblemDetailsOptions>) -> Self {
        Self { options }
    }

    pub fn options(&self) -> &ProblemDetailsOptions {
        &self.options
    }

    /// Problem details for the response's current status.
    ///
    /// Only the status is taken from the context; everything else comes from
    /// the configured status-code mapping so that every body has one shape.
    pub fn create_problem_details(&self, ctx: &ProblemContext<'_>) -> ProblemDetails {
        self.options.map_status(ctx, ctx.status)
    }

    /// Problem details listing `failures` grouped by field.
    ///
    /// Defaults: status `400`, the configured default title and validation
    /// detail, the type URI of [`ValidationFailed`], and a fresh problem
    /// number as instance.
    pub fn create_validation_problem_details(
        &self,
        _ctx: &ProblemContext<'_>,
        failures: &[ValidationFailure],
        overrides: ValidationOverrides,
    ) -> ProblemDetails {
        let type_uri = overrides.type_uri.unwrap_or_else(|| {
            self.options.type_uri_for::<ValidationFailed>().unwrap_or_else(|e| {
                tracing::warn!(error = %e, "falling back to about:blank type URI");
                "about:blank".to_owned()
            })
        });

        ProblemDetails {
            type_uri,
            title: overrides.title.unwrap_or_else(|| self.options.default_title().to_owned()),
            detail: Some(overrides.detail.unwrap_or_else(|| self.options.validation_detail().to_owned())),
            status: overrides.status.unwrap_or(StatusCode::BAD_REQUEST),
            instance: overrides.instance.unwrap_or_else(problem_number),
            validation_errors: Some(group_by_field(failures)),
        }
    }
}

fn group_by_field(failures: &[ValidationFailure]) -> BTreeMap<String, Vec<ValidationError>> {
    let mut grouped: BTreeMap<String, Vec<ValidationError>> = BTreeMap::new();
    for failure in failures {
        grouped.entry(failure.field.clone()).or_default().push(ValidationError {
            code: failure.code.clone(),
            reason: failure.reason.clone(),
        });
    }
    grouped
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::request::RequestHead;
    use http::{HeaderMap, Method, Uri};

    fn factory() -> ProblemDetailsFactory {
        ProblemDetailsFactory::new(Arc::new(
            ProblemDetailsOptions::default().with_namespace("registry").with_default_title("Oops"),
        ))
    }

    fn head() -> RequestHead {
        RequestHead { method: Method::POST, uri: Uri::from_static("/streets"), headers: HeaderMap::new() }
    }

    #[test]
    fn validation_defaults() {
        let head = head();
        let ctx = ProblemContext { request: &head, status: StatusCode::OK };
        let failures = [
            ValidationFailure::with_code("name", "NotEmpty", "name is required"),
            ValidationFailure::new("zip", "must be 4 digits"),
            ValidationFailure::new("name", "name is too short"),
        ];

        let p = factory().create_validation_problem_details(&ctx, &failures, ValidationOverrides::default());

        assert_eq!(p.status, StatusCode::BAD_REQUEST);
        assert_eq!(p.title, "Oops");
        assert_eq!(p.detail.as_deref(), Some("Validation failed!"));
        assert_eq!(p.type_uri, "urn:registry:validationfailed");
        assert_eq!(p.instance.len(), 32);

        let errors = p.validation_errors.unwrap();
        assert_eq!(errors.len(), 2);
        assert_eq!(errors["name"], vec![
            ValidationError::with_code("NotEmpty", "name is required"),
            ValidationError::new("name is too short"),
        ]);
        assert_eq!(errors["zip"], vec![ValidationError::new("must be 4 digits")]);
    }

    #[test]
    fn validation_overrides() {
        let head = head();
        let ctx = ProblemContext { request: &head, status: StatusCode::OK };
        let overrides = ValidationOverrides {
            status: Some(StatusCode::UNPROCESSABLE_ENTITY),
            title: Some("Bad street".to_owned()),
            instance: Some("/streets/1".to_owned()),
            ..ValidationOverrides::default()
        };

        let p = factory().create_validation_problem_details(&ctx, &[], overrides);
        assert_eq!(p.status, StatusCode::UNPROCESSABLE_ENTITY);
        assert_eq!(p.title, "Bad street");
        assert_eq!(p.instance, "/streets/1");
        assert_eq!(p.validation_errors, Some(BTreeMap::new()));
    }

    #[test]
    fn plain_details_follow_status() {
        let head = head();
        let ctx = ProblemContext { request: &head, status: StatusCode::UNAUTHORIZED };
        let p = factory().create_problem_details(&ctx);

        assert_eq!(p.status, StatusCode::UNAUTHORIZED);
        assert_eq!(p.title, "Unauthorized");
        assert_eq!(p.type_uri, "https://httpstatuses.com/401");
    }
}
