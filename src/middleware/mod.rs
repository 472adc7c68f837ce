//! Middleware layer.
//!
//! Middleware intercepts requests and responses and is the right place for
//! cross-cutting concerns. A middleware receives the request and a [`Next`]
//! handle to the rest of the pipeline; it may call `next.run` once, several
//! times (see [`SpaFallback`]), or not at all.
//!
//! Built-in middleware:
//! - [`ProblemDetailsMiddleware`]: renders errors and bare error statuses as
//!   RFC 7807 problem details
//! - [`SpaFallback`]: rewrites hard 404s to a single-page-app entry point
//!
//! ```rust
//! use gangway::Router;
//! use gangway::middleware::{ProblemDetailsMiddleware, SpaFallback, SpaFallbackOptions};
//! use gangway::problem::ProblemDetailsOptions;
//!
//! let app = Router::new()
//!     .layer(ProblemDetailsMiddleware::new(ProblemDetailsOptions::default()))
//!     .layer(SpaFallback::new(SpaFallbackOptions::default()));
//! ```

mod problem_details;
mod spa_fallback;

use std::future::Future;
use std::sync::Arc;

pub use problem_details::ProblemDetailsMiddleware;
pub use spa_fallback::{SpaFallback, SpaFallbackError, SpaFallbackOptions};

use crate::handler::BoxFuture;
use crate::request::Request;
use crate::response::{IntoResponse, Response};
use crate::router::Routes;

/// A request interceptor.
pub trait Middleware: Send + Sync + 'static {
    fn call(&self, req: Request, next: Next) -> BoxFuture;
}

/// The remainder of the pipeline after the current middleware.
///
/// Cloning is cheap, so a middleware may dispatch more than once.
#[derive(Clone)]
pub struct Next {
    chain: Arc<Chain>,
    position: usize,
}

impl Next {
    pub async fn run(self, req: Request) -> Response {
        match self.chain.layers.get(self.position) {
            Some(layer) => {
                let next = Next { chain: Arc::clone(&self.chain), position: self.position + 1 };
                layer.call(req, next).await
            }
            None => self.chain.routes.dispatch(req).await,
        }
    }
}

struct Chain {
    layers: Vec<Arc<dyn Middleware>>,
    routes: Arc<Routes>,
}

/// A frozen router plus its middleware, ready to serve requests.
///
/// This is what the server drives for every connection; tests call
/// [`Pipeline::call`] directly instead of going through a socket.
#[derive(Clone)]
pub struct Pipeline {
    chain: Arc<Chain>,
}

impl Pipeline {
    pub(crate) fn new(layers: Vec<Arc<dyn Middleware>>, routes: Arc<Routes>) -> Self {
        Self { chain: Arc::new(Chain { layers, routes }) }
    }

    pub async fn call(&self, req: Request) -> Response {
        Next { chain: Arc::clone(&self.chain), position: 0 }.run(req).await
    }
}

// ── from_fn ───────────────────────────────────────────────────────────────────

/// Middleware built from an async closure. See [`from_fn`].
pub struct FromFn<F>(F);

/// Turn `async |req, next| -> impl IntoResponse` into a [`Middleware`].
///
/// ```rust
/// use gangway::Router;
/// use gangway::middleware::{from_fn, Next};
/// use gangway::Request;
///
/// let app = Router::new().layer(from_fn(|req: Request, next: Next| async move {
///     let mut res = next.run(req).await;
///     res.headers_mut().insert("x-served-by", http::HeaderValue::from_static("gangway"));
///     res
/// }));
/// ```
pub fn from_fn<F, Fut, R>(f: F) -> FromFn<F>
where
    F: Fn(Request, Next) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = R> + Send + 'static,
    R: IntoResponse + Send + 'static,
{
    FromFn(f)
}

impl<F, Fut, R> Middleware for FromFn<F>
where
    F: Fn(Request, Next) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = R> + Send + 'static,
    R: IntoResponse + Send + 'static,
{
    fn call(&self, req: Request, next: Next) -> BoxFuture {
        let fut = (self.0)(req, next);
        Box::pin(async move { fut.await.into_response() })
    }
}
