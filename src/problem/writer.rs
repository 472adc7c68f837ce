//! Content-negotiated serialization of problem details.
//!
//! XML is chosen when the request's `Accept` header asks for
//! `application/xml`; JSON is the default for everything else.

use std::sync::Arc;

use http::header::ACCEPT;
use quick_xml::Writer;
use quick_xml::events::{BytesEnd, BytesStart, BytesText, Event};
use thiserror::Error;

use super::{ProblemContext, ProblemDetails};
use crate::response::{ContentType, Response};

/// Failure to serialize a problem details body.
#[derive(Debug, Error)]
pub enum WriteError {
    #[error("json: {0}")]
    Json(#[from] serde_json::Error),

    #[error("xml: {0}")]
    Xml(String),
}

/// Serializes problem details for requests it accepts.
pub trait ProblemDetailsWriter: Send + Sync + 'static {
    fn can_write(&self, ctx: &ProblemContext<'_>) -> bool;

    /// # Errors
    ///
    /// Returns [`WriteError`] if the body cannot be serialized.
    fn write(&self, ctx: &ProblemContext<'_>, details: &ProblemDetails) -> Result<Response, WriteError>;
}

/// `application/problem+json`. Accepts every request.
#[derive(Clone, Copy, Debug, Default)]
pub struct JsonProblemDetailsWriter;

impl ProblemDetailsWriter for JsonProblemDetailsWriter {
    fn can_write(&self, _ctx: &ProblemContext<'_>) -> bool {
        true
    }

    fn write(&self, _ctx: &ProblemContext<'_>, details: &ProblemDetails) -> Result<Response, WriteError> {
        let body = serde_json::to_vec(details)?;
        Ok(Response::builder().status(details.status).bytes(ContentType::ProblemJson, body))
    }
}

/// `application/problem+xml`, for requests whose `Accept` header contains
/// `application/xml` (ASCII case-insensitive).
#[derive(Clone, Copy, Debug, Default)]
pub struct XmlProblemDetailsWriter;

impl ProblemDetailsWriter for XmlProblemDetailsWriter {
    fn can_write(&self, ctx: &ProblemContext<'_>) -> bool {
        ctx.request.headers.get_all(ACCEPT).iter()
            .filter_map(|v| v.to_str().ok())
            .any(|v| v.to_ascii_lowercase().contains("application/xml"))
    }

    fn write(&self, _ctx: &ProblemContext<'_>, details: &ProblemDetails) -> Result<Response, WriteError> {
        let body = to_xml(details)?;
        Ok(Response::builder().status(details.status).bytes(ContentType::ProblemXml, body))
    }
}

/// Serialize problem details as XML.
///
/// ```text
/// <ProblemDetails>
///   <Type>…</Type><Title>…</Title><Detail>…</Detail><Status>400</Status><Instance>…</Instance>
///   <ValidationErrors>
///     <ValidationError>
///       <Field>name</Field>
///       <Errors><Error><Code>…</Code><Reason>…</Reason></Error></Errors>
///     </ValidationError>
///   </ValidationErrors>
/// </ProblemDetails>
/// ```
///
/// `Detail`, `ValidationErrors` and `Code` are omitted when absent.
///
/// # Errors
///
/// Returns [`WriteError::Xml`] if the XML writer fails.
pub fn to_xml(details: &ProblemDetails) -> Result<Vec<u8>, WriteError> {
    let mut xml = XmlOut(Writer::new(Vec::new()));

    xml.open("ProblemDetails")?;
    xml.element("Type", &details.type_uri)?;
    xml.element("Title", &details.title)?;
    if let Some(detail) = &details.detail {
        xml.element("Detail", detail)?;
    }
    xml.element("Status", &details.status.as_u16().to_string())?;
    xml.element("Instance", &details.instance)?;

    if let Some(fields) = &details.validation_errors {
        xml.open("ValidationErrors")?;
        for (field, errors) in fields {
            xml.open("ValidationError")?;
            xml.element("Field", field)?;
            xml.open("Errors")?;
            for error in errors {
                xml.open("Error")?;
                if let Some(code) = &error.code {
                    xml.element("Code", code)?;
                }
                xml.element("Reason", &error.reason)?;
                xml.close("Error")?;
            }
            xml.close("Errors")?;
            xml.close("ValidationError")?;
        }
        xml.close("ValidationErrors")?;
    }

    xml.close("ProblemDetails")?;
    Ok(xml.0.into_inner())
}

struct XmlOut(Writer<Vec<u8>>);

impl XmlOut {
    fn event(&mut self, event: Event<'_>) -> Result<(), WriteError> {
        self.0.write_event(event).map_err(|e| WriteError::Xml(e.to_string()))
    }

    fn open(&mut self, name: &str) -> Result<(), WriteError> {
        self.event(Event::Start(BytesStart::new(name)))
    }

    fn close(&mut self, name: &str) -> Result<(), WriteError> {
        self.event(Event::End(BytesEnd::new(name)))
    }

    fn element(&mut self, name: &str, text: &str) -> Result<(), WriteError> {
        self.open(name)?;
        self.event(Event::Text(BytesText::new(text)))?;
        self.close(name)
    }
}

/// Picks a writer for each problem and writes it.
///
/// Writers added with [`with_writer`](Self::with_writer) are asked first, then
/// XML, then the JSON default.
#[derive(Clone)]
pub struct ProblemDetailsService {
    writers: Vec<Arc<dyn ProblemDetailsWriter>>,
    fallback: JsonProblemDetailsWriter,
}

impl Default for ProblemDetailsService {
    fn default() -> Self {
        Self { writers: vec![Arc::new(XmlProblemDetailsWriter)], fallback: JsonProblemDetailsWriter }
    }
}

impl ProblemDetailsService {
    #[must_use]
    pub fn with_writer(mut self, writer: impl ProblemDetailsWriter) -> Self {
        self.writers.insert(self.writers.len() - 1, Arc::new(writer));
        self
    }

    /// Write `details` with the first writer that accepts the request.
    ///
    /// Returns `None` if that writer fails; the failure is logged and the
    /// caller decides what to send instead.
    pub fn try_write(&self, ctx: &ProblemContext<'_>, details: &ProblemDetails) -> Option<Response> {
        let writer: &dyn ProblemDetailsWriter = match self.writers.iter().find(|w| w.can_write(ctx)) {
            Some(w) => w.as_ref(),
            None => &self.fallback,
        };

        match writer.write(ctx, details) {
            Ok(response) => Some(response),
            Err(e) => {
                tracing::warn!(error = %e, status = details.status.as_u16(), "failed to write problem details");
                None
            }
        }
    }
}
