//! Single-page-app fallback.
//!
//! A client-side router owns URLs like `/orders/42/edit` that the server has
//! no route for. This middleware catches the resulting hard 404 and serves the
//! app's entry point instead, so the client can route the URL itself.

use std::fmt;
use std::sync::Arc;

use http::{Method, StatusCode};
use thiserror::Error;

use super::{Middleware, Next};
use crate::error::Error;
use crate::handler::BoxFuture;
use crate::request::Request;
use crate::response::Response;
use crate::router::RouteMiss;

/// Raised when the fallback path itself is not found.
#[derive(Debug, Error)]
pub enum SpaFallbackError {
    #[error("SPA fallback to `{path}` failed: no route handled the fallback path")]
    FallbackNotFound { path: String },
}

type PathFactory = Arc<dyn Fn(&Request) -> String + Send + Sync>;

/// Options for [`SpaFallback`].
#[derive(Clone)]
pub struct SpaFallbackOptions {
    fallback_path: PathFactory,
    allow_file_extensions: bool,
    throw_if_fallback_fails: bool,
}

impl Default for SpaFallbackOptions {
    /// Falls back to `/index.html`, skips paths with a file extension, and
    /// fails if the fallback is not found either.
    fn default() -> Self {
        Self {
            fallback_path: Arc::new(|_req: &Request| "/index.html".to_owned()),
            allow_file_extensions: false,
            throw_if_fallback_fails: true,
        }
    }
}

impl fmt::Debug for SpaFallbackOptions {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SpaFallbackOptions")
            .field("allow_file_extensions", &self.allow_file_extensions)
            .field("throw_if_fallback_fails", &self.throw_if_fallback_fails)
            .finish_non_exhaustive()
    }
}

impl SpaFallbackOptions {
    /// Always fall back to `path`.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidFallbackPath`] unless `path` starts with `/`.
    pub fn new(path: &str) -> Result<Self, Error> {
        if !path.starts_with('/') {
            return Err(Error::InvalidFallbackPath(path.to_owned()));
        }
        let path = path.to_owned();
        Ok(Self::default().with_path_factory(move |_req| path.clone()))
    }

    /// Choose the fallback path per request, e.g. one entry point per app
    /// mounted under different prefixes.
    #[must_use]
    pub fn with_path_factory<F>(mut self, factory: F) -> Self
    where
        F: Fn(&Request) -> String + Send + Sync + 'static,
    {
        self.fallback_path = Arc::new(factory);
        self
    }

    /// Whether paths whose last segment has a file extension (`/app.js`)
    /// may fall back. Off by default: a missing asset should stay a 404.
    #[must_use]
    pub fn allow_file_extensions(mut self, allow: bool) -> Self {
        self.allow_file_extensions = allow;
        self
    }

    /// Whether a fallback that also ends in 404 becomes a
    /// [`SpaFallbackError`]. On by default; when off, the 404 is returned.
    #[must_use]
    pub fn throw_if_fallback_fails(mut self, throw: bool) -> Self {
        self.throw_if_fallback_fails = throw;
        self
    }

    fn should_fallback(&self, req: &Request, response: &Response) -> bool {
        if response.status_code() != StatusCode::NOT_FOUND || response.error().is_some() {
            return false;
        }

        // Only hard 404s: the router found nothing, no handler said "not found".
        if response.extensions().get::<RouteMiss>().is_none() {
            return false;
        }

        if *req.method() != Method::GET {
            return false;
        }

        if has_file_extension(req.path()) {
            return self.allow_file_extensions;
        }

        true
    }

    fn should_throw(&self, response: &Response) -> bool {
        response.status_code() == StatusCode::NOT_FOUND && self.throw_if_fallback_fails
    }
}

/// Rewrites hard 404s on `GET` to the configured fallback path.
///
/// ```rust
/// use gangway::{Request, Response, Router};
/// use gangway::middleware::{SpaFallback, SpaFallbackOptions};
///
/// # async fn index(_: Request) -> Response { Response::text("") }
/// let app = Router::new()
///     .get("/index.html", index)
///     .layer(SpaFallback::new(SpaFallbackOptions::new("/index.html").unwrap()));
/// ```
#[derive(Clone, Debug)]
pub struct SpaFallback {
    options: Arc<SpaFallbackOptions>,
}

impl SpaFallback {
    pub fn new(options: SpaFallbackOptions) -> Self {
        Self { options: Arc::new(options) }
    }
}

impl Middleware for SpaFallback {
    fn call(&self, req: Request, next: Next) -> BoxFuture {
        let options = Arc::clone(&self.options);
        Box::pin(async move {
            // Only GET can fall back, so only GET pays for the copy.
            let retry = (*req.method() == Method::GET).then(|| req.clone());
            let response = next.clone().run(req).await;

            let Some(mut retry) = retry.filter(|r| options.should_fallback(r, &response)) else {
                return response;
            };

            let target = (options.fallback_path)(&retry);
            tracing::debug!(from = retry.path(), to = %target, "spa fallback");
            if let Err(e) = retry.set_path(&target) {
                return Response::failure(e);
            }

            let response = next.run(retry).await;
            if options.should_throw(&response) {
                return Response::failure(SpaFallbackError::FallbackNotFound { path: target });
            }
            response
        })
    }
}

fn has_file_extension(path: &str) -> bool {
    let segment = path.rsplit('/').next().unwrap_or(path);
    segment.rfind('.').is_some_and(|dot| dot + 1 < segment.len())
}
