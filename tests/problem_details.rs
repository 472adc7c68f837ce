use gangway::middleware::{Pipeline, ProblemDetailsMiddleware};
use gangway::problem::{
    ProblemDetails, ProblemDetailsError, ProblemDetailsOptions, ProblemDetailsService,
    ProblemDetailsWriter, ProblemContext, WriteError,
};
use gangway::{Request, Response, Router};
use http::header::{ACCEPT, ALLOW, CONTENT_TYPE};
use http::{HeaderValue, Method, StatusCode, Uri};
use serde_json::Value;

#[derive(Debug, thiserror::Error)]
#[error("database password is hunter2")]
struct Leaky;

#[derive(Debug, thiserror::Error)]
#[error("street {0} not found")]
struct StreetNotFound(String);

async fn leaky(_req: Request) -> Result<Response, Leaky> {
    Err(Leaky)
}

async fn street(req: Request) -> Result<Response, StreetNotFound> {
    Err(StreetNotFound(req.param("id").unwrap_or_default().to_owned()))
}

async fn conflict(_req: Request) -> Result<Response, ProblemDetailsError> {
    Err(ProblemDetails::new(StatusCode::CONFLICT, "urn:registry:duplicate", "Duplicate street")
        .with_detail("Street 7 already exists.")
        .with_instance("urn:problem:7")
        .into())
}

#[derive(serde::Deserialize)]
#[allow(dead_code)]
struct NewStreet {
    name: String,
}

async fn create_street(req: Request) -> Result<Response, gangway::problem::ValidationFailed> {
    let _street: NewStreet = req.json()?;
    Ok(Response::status(StatusCode::CREATED))
}

async fn explode(_req: Request) -> Response {
    panic!("boom")
}

async fn not_allowed(_req: Request) -> Response {
    Response::builder()
        .status(StatusCode::METHOD_NOT_ALLOWED)
        .header("allow", "GET")
        .no_body()
}

async fn teapot_with_body(_req: Request) -> Response {
    Response::builder().status(StatusCode::IM_A_TEAPOT).text("short and stout")
}

fn routes() -> Router {
    Router::new()
        .get("/leaky", leaky)
        .get("/streets/{id}", street)
        .get("/conflict", conflict)
        .post("/streets", create_street)
        .get("/explode", explode)
        .get("/not-allowed", not_allowed)
        .get("/teapot", teapot_with_body)
}

fn app(options: ProblemDetailsOptions) -> Pipeline {
    routes().layer(ProblemDetailsMiddleware::new(options)).into_pipeline()
}

fn json(res: &Response) -> Value {
    serde_json::from_slice(res.body()).unwrap()
}

#[tokio::test]
async fn unmapped_error_becomes_generic_500() {
    let res = app(ProblemDetailsOptions::default()).call(Request::get("/leaky").unwrap()).await;

    assert_eq!(res.status_code(), StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(res.content_type(), Some("application/problem+json"));
    assert!(res.error().is_none());

    let body = json(&res);
    assert_eq!(body["type"], "https://httpstatuses.com/500");
    assert_eq!(body["title"], "Internal Server Error");
    assert_eq!(body["status"], 500);
    assert!(body.get("detail").is_none());
    assert_eq!(body["instance"].as_str().unwrap().len(), 32);
    assert!(!String::from_utf8_lossy(res.body()).contains("hunter2"));
}

#[tokio::test]
async fn xml_when_accept_asks_for_it() {
    let req = Request::get("/leaky").unwrap()
        .with_header(ACCEPT, HeaderValue::from_static("Application/XML"));
    let res = app(ProblemDetailsOptions::default()).call(req).await;

    assert_eq!(res.status_code(), StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(res.content_type(), Some("application/problem+xml"));
    let xml = String::from_utf8(res.body().to_vec()).unwrap();
    assert!(xml.starts_with("<ProblemDetails><Type>https://httpstatuses.com/500</Type>"));
    assert!(xml.contains("<Status>500</Status>"));
    assert!(!xml.contains("<Detail>"));
}

#[tokio::test]
async fn problem_details_error_is_forwarded_unchanged() {
    let res = app(ProblemDetailsOptions::default()).call(Request::get("/conflict").unwrap()).await;

    assert_eq!(res.status_code(), StatusCode::CONFLICT);
    assert_eq!(json(&res), serde_json::json!({
        "type": "urn:registry:duplicate",
        "title": "Duplicate street",
        "detail": "Street 7 already exists.",
        "status": 409,
        "instance": "urn:problem:7",
    }));
}

#[tokio::test]
async fn configured_mapping_is_applied() {
    let options = ProblemDetailsOptions::default()
        .with_namespace("registry")
        .map(|ctx: &ProblemContext<'_>, e: &StreetNotFound| {
            ProblemDetails::new(StatusCode::NOT_FOUND, "urn:registry:streetnotfound", "Street not found")
                .with_detail(e.to_string())
                .with_instance(ctx.request.uri.path())
        });

    let res = app(options).call(Request::get("/streets/12").unwrap()).await;

    assert_eq!(res.status_code(), StatusCode::NOT_FOUND);
    let body = json(&res);
    assert_eq!(body["type"], "urn:registry:streetnotfound");
    assert_eq!(body["detail"], "street 12 not found");
    assert_eq!(body["instance"], "/streets/12");
}

#[tokio::test]
async fn invalid_body_becomes_validation_problem() {
    let req = Request::new(Method::POST, Uri::from_static("/streets")).with_body(r#"{"naam":"Kerkstraat"}"#);
    let options = ProblemDetailsOptions::default()
        .with_namespace("registry")
        .with_default_title("Er heeft zich een fout voorgedaan!");

    let res = app(options).call(req).await;

    assert_eq!(res.status_code(), StatusCode::BAD_REQUEST);
    let body = json(&res);
    assert_eq!(body["type"], "urn:registry:validationfailed");
    assert_eq!(body["title"], "Er heeft zich een fout voorgedaan!");
    assert_eq!(body["detail"], "Validation failed!");
    assert_eq!(body["validationErrors"]["body"][0]["code"], "InvalidJson");
    assert!(body["validationErrors"]["body"][0]["reason"].as_str().unwrap().contains("name"));
}

#[tokio::test]
async fn user_mapping_overrides_validation_default() {
    let options = ProblemDetailsOptions::default()
        .map_to_status::<gangway::problem::ValidationFailed>(StatusCode::UNPROCESSABLE_ENTITY);
    let req = Request::new(Method::POST, Uri::from_static("/streets")).with_body("not json");

    let res = app(options).call(req).await;

    assert_eq!(res.status_code(), StatusCode::UNPROCESSABLE_ENTITY);
    assert!(json(&res).get("validationErrors").is_none());
}

#[tokio::test]
async fn panic_becomes_generic_500() {
    let res = app(ProblemDetailsOptions::default()).call(Request::get("/explode").unwrap()).await;

    assert_eq!(res.status_code(), StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(json(&res)["title"], "Internal Server Error");
}

#[tokio::test]
async fn bare_status_codes_are_converted() {
    let app = app(ProblemDetailsOptions::default());

    let res = app.call(Request::get("/nowhere").unwrap()).await;
    assert_eq!(res.status_code(), StatusCode::NOT_FOUND);
    assert_eq!(json(&res)["type"], "https://httpstatuses.com/404");
    assert_eq!(json(&res)["title"], "Not Found");

    let res = app.call(Request::get("/not-allowed").unwrap()).await;
    assert_eq!(res.status_code(), StatusCode::METHOD_NOT_ALLOWED);
    assert_eq!(res.headers().get(ALLOW).unwrap(), "GET");
    assert_eq!(res.headers().get_all(CONTENT_TYPE).iter().count(), 1);
    assert_eq!(json(&res)["status"], 405);
}

#[tokio::test]
async fn responses_with_a_body_are_left_alone() {
    let res = app(ProblemDetailsOptions::default()).call(Request::get("/teapot").unwrap()).await;

    assert_eq!(res.status_code(), StatusCode::IM_A_TEAPOT);
    assert_eq!(res.body().as_ref(), b"short and stout");
}

#[tokio::test]
async fn status_conversion_can_be_disabled() {
    let options = ProblemDetailsOptions::default().convert_status_codes(false);
    let res = app(options).call(Request::get("/nowhere").unwrap()).await;

    assert_eq!(res.status_code(), StatusCode::NOT_FOUND);
    assert!(res.body().is_empty());
}

struct Failing;

impl ProblemDetailsWriter for Failing {
    fn can_write(&self, _ctx: &ProblemContext<'_>) -> bool {
        true
    }

    fn write(&self, _ctx: &ProblemContext<'_>, _details: &ProblemDetails) -> Result<Response, WriteError> {
        Err(WriteError::Xml("disk full".to_owned()))
    }
}

#[tokio::test]
async fn write_failure_falls_back_to_bare_500() {
    let middleware = ProblemDetailsMiddleware::with_service(
        ProblemDetailsOptions::default(),
        ProblemDetailsService::default().with_writer(Failing),
    );
    let app = routes().layer(middleware).into_pipeline();

    let res = app.call(Request::get("/conflict").unwrap()).await;

    assert_eq!(res.status_code(), StatusCode::INTERNAL_SERVER_ERROR);
    assert!(res.body().is_empty());
    assert!(res.error().is_none());
}

#[tokio::test]
async fn without_middleware_the_error_is_carried() {
    let res = routes().into_pipeline().call(Request::get("/leaky").unwrap()).await;

    assert_eq!(res.status_code(), StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(res.error().unwrap().to_string(), "database password is hunter2");
}

fn instance_per_path() -> ProblemDetailsOptions {
    ProblemDetailsOptions::default().map_status_code(|ctx: &ProblemContext<'_>, status| {
        ProblemDetails::for_status(status, "Oops").with_instance(format!("urn:shop:{}", ctx.request.uri.path()))
    })
}

#[tokio::test]
async fn status_mapper_describes_unmapped_errors_and_bare_statuses() {
    let app = app(instance_per_path());

    let res = app.call(Request::get("/leaky").unwrap()).await;
    assert_eq!(res.status_code(), StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(json(&res)["instance"], "urn:shop:/leaky");

    let res = app.call(Request::get("/nowhere").unwrap()).await;
    assert_eq!(res.status_code(), StatusCode::NOT_FOUND);
    assert_eq!(json(&res)["instance"], "urn:shop:/nowhere");
}

#[tokio::test]
async fn status_mapping_goes_through_status_mapper() {
    let options = instance_per_path().map_to_status::<Leaky>(StatusCode::CONFLICT);

    let res = app(options).call(Request::get("/leaky").unwrap()).await;

    assert_eq!(res.status_code(), StatusCode::CONFLICT);
    assert_eq!(json(&res)["type"], "https://httpstatuses.com/409");
    assert_eq!(json(&res)["instance"], "urn:shop:/leaky");
}

#[tokio::test]
async fn status_mapping_sees_title_set_later() {
    let options = ProblemDetailsOptions::default()
        .map_to_status::<Leaky>(StatusCode::BAD_REQUEST)
        .with_default_title("Er heeft zich een fout voorgedaan!");

    let res = app(options).call(Request::get("/leaky").unwrap()).await;

    assert_eq!(res.status_code(), StatusCode::BAD_REQUEST);
    assert_eq!(json(&res)["title"], "Er heeft zich een fout voorgedaan!");
}
