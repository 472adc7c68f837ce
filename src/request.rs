//! Incoming HTTP request type.

use std::collections::HashMap;

use bytes::Bytes;
use http::uri::{PathAndQuery, Uri};
use http::{Extensions, HeaderMap, HeaderName, HeaderValue, Method};
use serde::de::DeserializeOwned;

use crate::error::Error;
use crate::problem::{ValidationFailed, ValidationFailure};

/// An incoming HTTP request.
///
/// The body is fully buffered before the request enters the pipeline, which
/// is what lets middleware such as
/// [`SpaFallback`](crate::middleware::SpaFallback) dispatch the same request
/// twice.
#[derive(Clone, Debug)]
pub struct Request {
    method: Method,
    uri: Uri,
    headers: HeaderMap,
    body: Bytes,
    pub(crate) params: HashMap<String, String>,
    extensions: Extensions,
}

/// The parts of a request that outlive its dispatch.
///
/// Middleware takes a `RequestHead` before handing the request to
/// [`Next`](crate::middleware::Next), so it can still inspect the method,
/// URI, and headers once the response comes back.
#[derive(Clone, Debug)]
pub struct RequestHead {
    pub method: Method,
    pub uri: Uri,
    pub headers: HeaderMap,
}

impl Request {
    pub fn new(method: Method, uri: Uri) -> Self {
        Self {
            method,
            uri,
            headers: HeaderMap::new(),
            body: Bytes::new(),
            params: HashMap::new(),
            extensions: Extensions::new(),
        }
    }

    /// Shorthand for a `GET` request to `uri`, for tests and embedding.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidPath`] if `uri` is not a valid request target.
    pub fn get(uri: &str) -> Result<Self, Error> {
        let uri = uri
            .parse::<Uri>()
            .map_err(|_| Error::InvalidPath { path: uri.to_owned() })?;
        Ok(Self::new(Method::GET, uri))
    }

    pub(crate) fn from_parts(parts: http::request::Parts, body: Bytes) -> Self {
        Self {
            method: parts.method,
            uri: parts.uri,
            headers: parts.headers,
            body,
            params: HashMap::new(),
            extensions: parts.extensions,
        }
    }

    pub fn with_header(mut self, name: HeaderName, value: HeaderValue) -> Self {
        self.headers.append(name, value);
        self
    }

    pub fn with_body(mut self, body: impl Into<Bytes>) -> Self {
        self.body = body.into();
        self
    }

    pub fn method(&self) -> &Method { &self.method }
    pub fn uri(&self) -> &Uri { &self.uri }
    pub fn path(&self) -> &str { self.uri.path() }
    pub fn headers(&self) -> &HeaderMap { &self.headers }
    pub fn body(&self) -> &Bytes { &self.body }
    pub fn extensions(&self) -> &Extensions { &self.extensions }
    pub fn extensions_mut(&mut self) -> &mut Extensions { &mut self.extensions }

    /// Case-insensitive header lookup. Non-UTF-8 values read as absent.
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers.get(name).and_then(|v| v.to_str().ok())
    }

    /// Returns a named path parameter.
    ///
    /// For a route `/users/{id}`, `req.param("id")` on `/users/42` returns `Some("42")`.
    pub fn param(&self, key: &str) -> Option<&str> {
        self.params.get(key).map(String::as_str)
    }

    pub fn head(&self) -> RequestHead {
        RequestHead {
            method: self.method.clone(),
            uri: self.uri.clone(),
            headers: self.headers.clone(),
        }
    }

    /// Replaces the path of the request URI, keeping the query string.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidPath`] if the resulting URI does not parse.
    pub fn set_path(&mut self, path: &str) -> Result<(), Error> {
        let invalid = || Error::InvalidPath { path: path.to_owned() };

        let target = match self.uri.query() {
            Some(query) => format!("{path}?{query}"),
            None => path.to_owned(),
        };
        let mut parts = self.uri.clone().into_parts();
        parts.path_and_query = Some(target.parse::<PathAndQuery>().map_err(|_| invalid())?);
        self.uri = Uri::from_parts(parts).map_err(|_| invalid())?;
        Ok(())
    }

    /// Deserializes the body as JSON.
    ///
    /// A body that does not match `T` is a validation failure, not a server
    /// error: the returned [`ValidationFailed`] is rendered as a `400`
    /// problem details response by the problem details middleware.
    ///
    /// # Errors
    ///
    /// Returns [`ValidationFailed`] with a single `body` failure describing
    /// the deserialization error.
    pub fn json<T: DeserializeOwned>(&self) -> Result<T, ValidationFailed> {
        serde_json::from_slice(&self.body).map_err(|e| {
            ValidationFailed::new(vec![ValidationFailure::with_code("body", "InvalidJson", e.to_string())])
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn set_path_keeps_query() {
        let mut req = Request::get("/app/settings?tab=profile").unwrap();
        req.set_path("/index.html").unwrap();

        assert_eq!(req.path(), "/index.html");
        assert_eq!(req.uri().query(), Some("tab=profile"));
    }

    #[test]
    fn set_path_rejects_garbage() {
        let mut req = Request::get("/app").unwrap();
        assert!(matches!(req.set_path("/with space"), Err(Error::InvalidPath { .. })));
        assert_eq!(req.path(), "/app");
    }

    #[test]
    fn json_failure_is_a_validation_failure() {
        #[derive(serde::Deserialize)]
        #[allow(dead_code)]
        struct User { name: String }

        let req = Request::new(Method::POST, Uri::from_static("/users")).with_body("{\"nope\":1}");
        let err = req.json::<User>().err().unwrap();

        assert_eq!(err.failures().len(), 1);
        assert_eq!(err.failures()[0].field, "body");
        assert_eq!(err.failures()[0].code.as_deref(), Some("InvalidJson"));
    }
}
