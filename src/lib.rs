//! # gangway
//!
//! RFC 7807 problem details and single-page-app fallback for HTTP services,
//! on a minimal hyper host.
//!
//! ## What it does
//!
//! - **Problem details**: a handler's `Err`, a panic, or a bodiless 4xx/5xx
//!   becomes an `application/problem+json` body, or `application/problem+xml`
//!   when the client's `Accept` header asks for `application/xml`. Errors you
//!   have not mapped become a generic `500` that leaks nothing.
//! - **SPA fallback**: a `GET` that matched no route is re-dispatched to your
//!   app's entry point so the client-side router can take it from there.
//!
//! The host around them is deliberately small: radix-tree routing via
//! [`matchit`], an ordered middleware pipeline, and a hyper server with
//! graceful shutdown.
//!
//! ## Quick start
//!
//! ```rust,no_run
//! use gangway::{Request, Response, Router, Server};
//! use gangway::middleware::{ProblemDetailsMiddleware, SpaFallback, SpaFallbackOptions};
//! use gangway::problem::ProblemDetailsOptions;
//! use http::StatusCode;
//!
//! #[derive(Debug, thiserror::Error)]
//! #[error("order {0} does not exist")]
//! struct OrderMissing(String);
//!
//! #[tokio::main]
//! async fn main() -> Result<(), gangway::Error> {
//!     let problems = ProblemDetailsOptions::default()
//!         .with_namespace("shop")
//!         .map_to_status::<OrderMissing>(StatusCode::NOT_FOUND);
//!
//!     let app = Router::new()
//!         .get("/api/orders/{id}", get_order)
//!         .get("/index.html", index)
//!         .layer(ProblemDetailsMiddleware::new(problems))
//!         .layer(SpaFallback::new(SpaFallbackOptions::new("/index.html")?));
//!
//!     Server::bind("0.0.0.0:3000").serve(app).await
//! }
//!
//! async fn get_order(req: Request) -> Result<Response, OrderMissing> {
//!     let id = req.param("id").unwrap_or_default();
//!     Err(OrderMissing(id.to_owned()))
//! }
//!
//! async fn index(_req: Request) -> Response {
//!     Response::builder().bytes(gangway::ContentType::Html, "<!doctype html>")
//! }
//! ```

mod error;
mod handler;
mod request;
mod response;
mod router;
mod server;

pub mod middleware;
pub mod problem;

pub use error::{BoxError, Error};
pub use handler::{BoxFuture, Handler};
pub use request::{Request, RequestHead};
pub use response::{ContentType, IntoResponse, Response, ResponseBuilder};
pub use router::{RouteMiss, Router};
pub use server::Server;
