//! Radix-tree request router.
//!
//! One tree per HTTP method. O(path-length) lookup. A request that matches no
//! route gets a `404` tagged with [`RouteMiss`], which is how middleware tells
//! a "hard" 404 from one a handler returned on purpose.

use std::collections::HashMap;
use std::sync::Arc;

use http::{Method, StatusCode};
use matchit::Router as MatchitRouter;

use crate::handler::{BoxedHandler, Handler};
use crate::middleware::{Middleware, Pipeline};
use crate::request::Request;
use crate::response::Response;

/// Response extension set when no route matched the request.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct RouteMiss;

/// The application router.
///
/// Build it once at startup, add middleware with [`Router::layer`], and pass
/// it to [`Server::serve`](crate::Server::serve). Every builder method returns
/// `self` so registrations chain naturally.
#[derive(Default)]
pub struct Router {
    routes: Routes,
    layers: Vec<Arc<dyn Middleware>>,
}

impl Router {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a handler for a method + path pair.
    ///
    /// Path parameters use `{name}` syntax and are read with `req.param("name")`:
    ///
    /// ```rust
    /// # use gangway::{Request, Response, Router};
    /// # use http::Method;
    /// # async fn get_user(_: Request) -> Response { Response::text("") }
    /// # async fn create_user(_: Request) -> Response { Response::text("") }
    /// Router::new()
    ///     .on(Method::GET,  "/users/{id}", get_user)
    ///     .on(Method::POST, "/users",      create_user);
    /// ```
    ///
    /// # Panics
    ///
    /// Panics if `path` is not a valid route or collides with an existing one.
    pub fn on(mut self, method: Method, path: &str, handler: impl Handler) -> Self {
        self.routes.trees
            .entry(method)
            .or_default()
            .insert(path, handler.into_boxed_handler())
            .unwrap_or_else(|e| panic!("invalid route `{path}`: {e}"));
        self
    }

    pub fn get(self, path: &str, handler: impl Handler) -> Self {
        self.on(Method::GET, path, handler)
    }

    pub fn post(self, path: &str, handler: impl Handler) -> Self {
        self.on(Method::POST, path, handler)
    }

    /// Append a middleware to the pipeline.
    ///
    /// Middleware runs in registration order: the first layer added is the
    /// outermost and sees the final response last. Register
    /// [`ProblemDetailsMiddleware`](crate::middleware::ProblemDetailsMiddleware)
    /// before [`SpaFallback`](crate::middleware::SpaFallback) so a failed
    /// fallback is rendered as problem details.
    pub fn layer(mut self, middleware: impl Middleware) -> Self {
        self.layers.push(Arc::new(middleware));
        self
    }

    /// Freeze the router into a shareable [`Pipeline`].
    pub fn into_pipeline(self) -> Pipeline {
        Pipeline::new(self.layers, Arc::new(self.routes))
    }
}

/// The route table at the end of every pipeline.
#[derive(Default)]
pub(crate) struct Routes {
    trees: HashMap<Method, MatchitRouter<BoxedHandler>>,
}

impl Routes {
    fn lookup(&self, method: &Method, path: &str) -> Option<(BoxedHandler, HashMap<String, String>)> {
        let tree = self.trees.get(method)?;
        let matched = tree.at(path).ok()?;
        let handler = Arc::clone(matched.value);
        let params = matched.params.iter()
            .map(|(k, v)| (k.to_owned(), v.to_owned()))
            .collect();
        Some((handler, params))
    }

    pub(crate) async fn dispatch(&self, mut req: Request) -> Response {
        match self.lookup(req.method(), req.path()) {
            Some((handler, params)) => {
                req.params = params;
                handler.call(req).await
            }
            None => {
                tracing::debug!(method = %req.method(), path = req.path(), "no route matched");
                let mut response = Response::status(StatusCode::NOT_FOUND);
                response.extensions_mut().insert(RouteMiss);
                response
            }
        }
    }
}
