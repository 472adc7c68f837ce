//! Minimal gangway example: a JSON API behind problem details, with a
//! single-page app served for every other GET.
//!
//! Run with:
//!   RUST_LOG=debug cargo run --example basic
//!
//! Try:
//!   curl -i http://localhost:3000/api/orders/42
//!   curl -i http://localhost:3000/api/orders/7 -H 'accept: application/xml'
//!   curl -i -X POST http://localhost:3000/api/orders -d '{"qty":"lots"}'
//!   curl -i http://localhost:3000/api/boom
//!   curl -i http://localhost:3000/orders/42/edit      # SPA fallback
//!   curl -i http://localhost:3000/assets/missing.js   # stays 404

use gangway::middleware::{ProblemDetailsMiddleware, SpaFallback, SpaFallbackOptions};
use gangway::problem::{ProblemContext, ProblemDetails, ProblemDetailsError, ProblemDetailsOptions, ValidationFailed};
use gangway::{ContentType, Request, Response, Router, Server};
use http::StatusCode;

#[derive(Debug, thiserror::Error)]
#[error("order {0} does not exist")]
struct OrderMissing(String);

#[derive(Debug, thiserror::Error)]
#[error("warehouse offline")]
struct WarehouseOffline;

#[derive(serde::Deserialize)]
struct NewOrder {
    qty: u32,
}

#[tokio::main]
async fn main() -> Result<(), gangway::Error> {
    tracing_subscriber::fmt::init();

    let problems = ProblemDetailsOptions::default()
        .with_namespace("shop")
        .map(|ctx: &ProblemContext<'_>, e: &OrderMissing| {
            ProblemDetails::new(StatusCode::NOT_FOUND, "urn:shop:ordermissing", "Order not found")
                .with_detail(e.to_string())
                .with_instance(ctx.request.uri.path())
        });

    // Registration order is outermost first: problem details sees everything
    // the SPA fallback produces, including a failed fallback.
    let app = Router::new()
        .get("/api/orders/{id}", get_order)
        .post("/api/orders", create_order)
        .get("/api/boom", boom)
        .get("/index.html", index)
        .layer(ProblemDetailsMiddleware::new(problems))
        .layer(SpaFallback::new(SpaFallbackOptions::new("/index.html")?));

    Server::bind("0.0.0.0:3000").serve(app).await
}

// GET /api/orders/{id}
//
// 42 exists, 7 is explicitly gone, anything else is an unknown order.
async fn get_order(req: Request) -> Result<Response, gangway::BoxError> {
    let id = req.param("id").unwrap_or_default();
    match id {
        "42" => Ok(Response::json(r#"{"id":42,"qty":3}"#)),
        "7" => Err(ProblemDetailsError::from(
            ProblemDetails::new(StatusCode::GONE, "urn:shop:orderarchived", "Order archived")
                .with_detail("Order 7 was archived last year."),
        )
        .into()),
        other => Err(OrderMissing(other.to_owned()).into()),
    }
}

// POST /api/orders
//
// A body that is not a NewOrder becomes a 400 with validationErrors.
async fn create_order(req: Request) -> Result<Response, ValidationFailed> {
    let order: NewOrder = req.json()?;
    Ok(Response::builder()
        .status(StatusCode::CREATED)
        .header("location", "/api/orders/99")
        .json(format!(r#"{{"id":99,"qty":{}}}"#, order.qty)))
}

// GET /api/boom → generic 500, the error text stays in the log.
async fn boom(_req: Request) -> Result<Response, WarehouseOffline> {
    Err(WarehouseOffline)
}

async fn index(_req: Request) -> Response {
    Response::builder().bytes(
        ContentType::Html,
        "<!doctype html><title>shop</title><div id=app></div>",
    )
}
