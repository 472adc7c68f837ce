//! Errors and bare error statuses to RFC 7807 problem details.

use std::error::Error as StdError;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;

use futures::FutureExt;
use http::StatusCode;
use http::header::CONTENT_TYPE;

use super::{Middleware, Next};
use crate::handler::BoxFuture;
use crate::problem::{
    PanicError, ProblemContext, ProblemDetails, ProblemDetailsError, ProblemDetailsFactory,
    ProblemDetailsOptions, ProblemDetailsService, ValidationFailed, ValidationOverrides,
};
use crate::request::{Request, RequestHead};
use crate::response::Response;

/// Renders every error that reaches it as problem details.
///
/// An error carried by the response (a handler's `Err`, a panic, or a
/// failing inner middleware) is described by, in order:
///
/// 1. the [`ProblemDetails`] inside a [`ProblemDetailsError`], unchanged;
/// 2. the first matching mapping in [`ProblemDetailsOptions`];
/// 3. the validation shape, for [`ValidationFailed`];
/// 4. the status-code shape for `500`, which never includes the error text.
///
/// Without an error, a bodiless 4xx/5xx response is replaced by the
/// status-code shape unless [`ProblemDetailsOptions::convert_status_codes`]
/// turned that off. Headers and extensions of the replaced response are kept.
#[derive(Clone)]
pub struct ProblemDetailsMiddleware {
    inner: Arc<Inner>,
}

struct Inner {
    factory: ProblemDetailsFactory,
    service: ProblemDetailsService,
}

impl ProblemDetailsMiddleware {
    pub fn new(options: ProblemDetailsOptions) -> Self {
        Self::with_service(options, ProblemDetailsService::default())
    }

    pub fn with_service(options: ProblemDetailsOptions, service: ProblemDetailsService) -> Self {
        let factory = ProblemDetailsFactory::new(Arc::new(options));
        Self { inner: Arc::new(Inner { factory, service }) }
    }

    pub fn factory(&self) -> &ProblemDetailsFactory {
        &self.inner.factory
    }
}

impl Middleware for ProblemDetailsMiddleware {
    fn call(&self, req: Request, next: Next) -> BoxFuture {
        let inner = Arc::clone(&self.inner);
        Box::pin(async move {
            let head = req.head();
            let response = match AssertUnwindSafe(next.run(req)).catch_unwind().await {
                Ok(response) => response,
                Err(payload) => Response::failure(PanicError::from_payload(&*payload)),
            };
            inner.complete(&head, response)
        })
    }
}

impl Inner {
    fn complete(&self, head: &RequestHead, mut response: Response) -> Response {
        let ctx = ProblemContext { request: head, status: response.status_code() };

        let details = if let Some(error) = response.take_error() {
            self.details_for_error(&ctx, &*error)
        } else if self.factory.options().converts_status_codes() && is_bare_error(&response) {
            self.factory.create_problem_details(&ctx)
        } else {
            return response;
        };

        let mut written = match self.service.try_write(&ctx, &details) {
            Some(written) => written,
            None => Response::status(StatusCode::INTERNAL_SERVER_ERROR),
        };
        for (name, value) in response.headers() {
            if name != CONTENT_TYPE {
                written.headers_mut().append(name.clone(), value.clone());
            }
        }
        *written.extensions_mut() = std::mem::take(response.extensions_mut());
        written
    }

    fn details_for_error(
        &self,
        ctx: &ProblemContext<'_>,
        error: &(dyn StdError + Send + Sync + 'static),
    ) -> ProblemDetails {
        let method = &ctx.request.method;
        let path = ctx.request.uri.path();

        if let Some(problem) = error.downcast_ref::<ProblemDetailsError>() {
            tracing::debug!(%method, path, error = %problem, "forwarding problem details");
            return problem.details().clone();
        }

        if let Some(details) = self.factory.options().try_map(ctx, error) {
            let status = details.status.as_u16();
            if details.status.is_server_error() {
                tracing::error!(%method, path, %error, status, "mapped error");
            } else {
                tracing::debug!(%method, path, %error, status, "mapped error");
            }
            return details;
        }

        if let Some(validation) = error.downcast_ref::<ValidationFailed>() {
            tracing::debug!(%method, path, %error, "validation failed");
            return self.factory.create_validation_problem_details(
                ctx,
                validation.failures(),
                ValidationOverrides::default(),
            );
        }

        tracing::error!(%method, path, %error, "unhandled error");
        self.factory.options().map_status(ctx, StatusCode::INTERNAL_SERVER_ERROR)
    }
}

fn is_bare_error(response: &Response) -> bool {
    let status = response.status_code();
    (status.is_client_error() || status.is_server_error())
        && response.body().is_empty()
        && !response.headers().contains_key(CONTENT_TYPE)
}
