//! Configuration of the problem details middleware.

use std::error::Error as StdError;
use std::fmt;
use std::sync::Arc;

use http::StatusCode;

use super::{ProblemDetails, type_uri_for};
use crate::error::Error;
use crate::request::RequestHead;

/// What a mapping gets to look at besides the error itself.
#[derive(Clone, Copy, Debug)]
pub struct ProblemContext<'a> {
    pub request: &'a RequestHead,
    /// Status of the response at the time the problem is being described.
    pub status: StatusCode,
}

/// What a matching mapping produced. A bare status is resolved through the
/// status mapper when the error is handled, not when the mapping is added.
enum Mapped {
    Details(ProblemDetails),
    Status(StatusCode),
}

type ErrorMapper = Arc<
    dyn Fn(&ProblemContext<'_>, &(dyn StdError + Send + Sync + 'static)) -> Option<Mapped>
        + Send
        + Sync,
>;

type StatusMapper = Arc<dyn Fn(&ProblemContext<'_>, StatusCode) -> ProblemDetails + Send + Sync>;

/// Options for [`ProblemDetailsMiddleware`](crate::middleware::ProblemDetailsMiddleware).
///
/// ```rust
/// use gangway::problem::{ProblemDetails, ProblemDetailsOptions};
/// use http::StatusCode;
///
/// #[derive(Debug, thiserror::Error)]
/// #[error("order {0} not found")]
/// struct OrderNotFound(u64);
///
/// let options = ProblemDetailsOptions::default()
///     .with_namespace("shop")
///     .map(|_ctx, e: &OrderNotFound| {
///         ProblemDetails::new(StatusCode::NOT_FOUND, "urn:shop:ordernotfound", "Order not found")
///             .with_detail(e.to_string())
///     })
///     .map_to_status::<std::num::ParseIntError>(StatusCode::BAD_REQUEST);
/// ```
#[derive(Clone)]
pub struct ProblemDetailsOptions {
    namespace: String,
    default_title: String,
    validation_detail: String,
    convert_status_codes: bool,
    error_mappers: Vec<ErrorMapper>,
    status_mapper: Option<StatusMapper>,
}

impl Default for ProblemDetailsOptions {
    fn default() -> Self {
        Self {
            namespace: "problem-details-undefined-namespace".to_owned(),
            default_title: "An error occurred!".to_owned(),
            validation_detail: "Validation failed!".to_owned(),
            convert_status_codes: true,
            error_mappers: Vec::new(),
            status_mapper: None,
        }
    }
}

impl fmt::Debug for ProblemDetailsOptions {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ProblemDetailsOptions")
            .field("namespace", &self.namespace)
            .field("default_title", &self.default_title)
            .field("validation_detail", &self.validation_detail)
            .field("convert_status_codes", &self.convert_status_codes)
            .field("error_mappers", &self.error_mappers.len())
            .field("custom_status_mapper", &self.status_mapper.is_some())
            .finish()
    }
}

impl ProblemDetailsOptions {
    /// Namespace of the `urn:` type URIs derived from error type names.
    #[must_use]
    pub fn with_namespace(mut self, namespace: impl Into<String>) -> Self {
        self.namespace = namespace.into();
        self
    }

    /// Title used where a reason phrase is not descriptive enough
    /// (`400 Bad Request`, validation problems).
    #[must_use]
    pub fn with_default_title(mut self, title: impl Into<String>) -> Self {
        self.default_title = title.into();
        self
    }

    #[must_use]
    pub fn with_validation_detail(mut self, detail: impl Into<String>) -> Self {
        self.validation_detail = detail.into();
        self
    }

    /// Whether bodiless 4xx/5xx responses without an error are also turned
    /// into problem details. On by default.
    #[must_use]
    pub fn convert_status_codes(mut self, enabled: bool) -> Self {
        self.convert_status_codes = enabled;
        self
    }

    /// Map errors of type `E` to problem details.
    ///
    /// Mappings are tried in registration order and the first one whose type
    /// matches wins.
    #[must_use]
    pub fn map<E, F>(mut self, f: F) -> Self
    where
        E: StdError + 'static,
        F: Fn(&ProblemContext<'_>, &E) -> ProblemDetails + Send + Sync + 'static,
    {
        self.error_mappers.push(Arc::new(
            move |ctx: &ProblemContext<'_>, err: &(dyn StdError + Send + Sync + 'static)| {
                err.downcast_ref::<E>().map(|e| Mapped::Details(f(ctx, e)))
            },
        ));
        self
    }

    /// Map errors of type `E` to the status-code shape for `status`, as
    /// described by [`map_status`](Self::map_status) at the time of the error.
    #[must_use]
    pub fn map_to_status<E>(mut self, status: StatusCode) -> Self
    where
        E: StdError + 'static,
    {
        self.error_mappers.push(Arc::new(
            move |_ctx: &ProblemContext<'_>, err: &(dyn StdError + Send + Sync + 'static)| {
                err.is::<E>().then_some(Mapped::Status(status))
            },
        ));
        self
    }

    /// Replace how a bare status code is described.
    #[must_use]
    pub fn map_status_code<F>(mut self, f: F) -> Self
    where
        F: Fn(&ProblemContext<'_>, StatusCode) -> ProblemDetails + Send + Sync + 'static,
    {
        self.status_mapper = Some(Arc::new(f));
        self
    }

    pub fn namespace(&self) -> &str { &self.namespace }
    pub fn default_title(&self) -> &str { &self.default_title }
    pub fn validation_detail(&self) -> &str { &self.validation_detail }
    pub fn converts_status_codes(&self) -> bool { self.convert_status_codes }

    /// The type URI for error type `T` in this namespace.
    ///
    /// # Errors
    ///
    /// Returns [`Error::BlankNamespace`] if the namespace is blank.
    pub fn type_uri_for<T: ?Sized>(&self) -> Result<String, Error> {
        type_uri_for::<T>(&self.namespace)
    }

    pub(crate) fn try_map(
        &self,
        ctx: &ProblemContext<'_>,
        error: &(dyn StdError + Send + Sync + 'static),
    ) -> Option<ProblemDetails> {
        match self.error_mappers.iter().find_map(|mapper| mapper(ctx, error))? {
            Mapped::Details(details) => Some(details),
            Mapped::Status(status) => Some(self.map_status(ctx, status)),
        }
    }

    /// Problem details for a bare status code.
    pub fn map_status(&self, ctx: &ProblemContext<'_>, status: StatusCode) -> ProblemDetails {
        match &self.status_mapper {
            Some(mapper) => mapper(ctx, status),
            None => ProblemDetails::for_status(status, &self.default_title),
        }
    }
}
