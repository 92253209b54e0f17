//! Locally produced responses.
//!
//! # Responsibilities
//! - Immutable [`Response`] value: status, headers, body
//! - [`ResponseBuilder`] for stepwise construction with chained calls
//! - Template rendering for HTML documents built from literal fragments and values
//!
//! # Design Decisions
//! - Default status is 200
//! - Header names are case-insensitive; setting a name twice overwrites
//! - Invalid status codes or header values are reported by `build()`, not mid-chain
//! - `html()` escapes interpolated values; `html_unescaped()` is for trusted markup

use axum::body::{Body, Bytes};
use axum::http::{header, HeaderMap, HeaderName, HeaderValue, StatusCode};
use axum::response::IntoResponse;
use std::fmt::{Display, Write};
use thiserror::Error;

const TEXT_HTML: &str = "text/html";

/// Invalid input supplied to a [`ResponseBuilder`].
#[derive(Debug, Error)]
pub enum ResponseError {
    #[error("invalid status code {0}")]
    InvalidStatus(u16),

    #[error("invalid header name {0:?}")]
    InvalidHeaderName(String),

    #[error("invalid value for header {0:?}")]
    InvalidHeaderValue(String),
}

/// Response payload.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum ResponseBody {
    #[default]
    Empty,
    Text(String),
    Binary(Bytes),
}

impl ResponseBody {
    pub fn len(&self) -> usize {
        match self {
            ResponseBody::Empty => 0,
            ResponseBody::Text(text) => text.len(),
            ResponseBody::Binary(bytes) => bytes.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl From<&str> for ResponseBody {
    fn from(text: &str) -> Self {
        ResponseBody::Text(text.to_string())
    }
}

impl From<String> for ResponseBody {
    fn from(text: String) -> Self {
        ResponseBody::Text(text)
    }
}

impl From<Bytes> for ResponseBody {
    fn from(bytes: Bytes) -> Self {
        ResponseBody::Binary(bytes)
    }
}

impl From<Vec<u8>> for ResponseBody {
    fn from(bytes: Vec<u8>) -> Self {
        ResponseBody::Binary(Bytes::from(bytes))
    }
}

/// An immutable response produced by a handler.
#[derive(Debug, Clone)]
pub struct Response {
    status: StatusCode,
    headers: HeaderMap,
    body: ResponseBody,
}

impl Response {
    pub fn builder() -> ResponseBuilder {
        ResponseBuilder::new()
    }

    pub fn status(&self) -> StatusCode {
        self.status
    }

    pub fn headers(&self) -> &HeaderMap {
        &self.headers
    }

    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers.get(name).and_then(|v| v.to_str().ok())
    }

    pub fn body(&self) -> &ResponseBody {
        &self.body
    }

    /// The body as text, when it is text or UTF-8 bytes.
    pub fn text(&self) -> Option<&str> {
        match &self.body {
            ResponseBody::Empty => Some(""),
            ResponseBody::Text(text) => Some(text),
            ResponseBody::Binary(bytes) => std::str::from_utf8(bytes).ok(),
        }
    }

    /// Start a builder from this response's state, e.g. to change the status of a rendered page.
    pub fn into_builder(self) -> ResponseBuilder {
        ResponseBuilder {
            status: Ok(self.status),
            headers: Ok(self.headers),
            body: self.body,
        }
    }

    /// A short HTML error page with the given status.
    pub fn error_page(status: StatusCode, message: &str) -> Self {
        let title = status.canonical_reason().unwrap_or("Error");
        html(
            &["<html><head><title>", "</title></head><body><h1>", "</h1><p>", "</p></body></html>"],
            &[&title, &title, &message],
        )
        .with_status(status)
    }

    fn with_status(mut self, status: StatusCode) -> Self {
        self.status = status;
        self
    }

    pub fn into_http(self) -> axum::http::Response<Body> {
        let body = match self.body {
            ResponseBody::Empty => Body::empty(),
            ResponseBody::Text(text) => Body::from(text),
            ResponseBody::Binary(bytes) => Body::from(bytes),
        };
        let mut response = axum::http::Response::new(body);
        *response.status_mut() = self.status;
        *response.headers_mut() = self.headers;
        response
    }
}

impl IntoResponse for Response {
    fn into_response(self) -> axum::response::Response {
        self.into_http()
    }
}

/// A string becomes a 200 `text/html` page.
impl From<&str> for Response {
    fn from(text: &str) -> Self {
        html_response(text.to_string())
    }
}

impl From<String> for Response {
    fn from(text: String) -> Self {
        html_response(text)
    }
}

/// Stepwise construction of a [`Response`].
///
/// ```rust,ignore
/// let response = Response::builder()
///     .set_status(201)
///     .set_header("Content-Type", "text/plain")
///     .set_body("created")
///     .build()?;
/// ```
#[derive(Debug)]
pub struct ResponseBuilder {
    status: Result<StatusCode, ResponseError>,
    headers: Result<HeaderMap, ResponseError>,
    body: ResponseBody,
}

impl Default for ResponseBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl ResponseBuilder {
    pub fn new() -> Self {
        Self {
            status: Ok(StatusCode::OK),
            headers: Ok(HeaderMap::new()),
            body: ResponseBody::Empty,
        }
    }

    pub fn set_status(mut self, status: u16) -> Self {
        self.status = StatusCode::from_u16(status).map_err(|_| ResponseError::InvalidStatus(status));
        self
    }

    /// Set a header, replacing any value previously set under the same name.
    pub fn set_header(mut self, name: &str, value: &str) -> Self {
        self.headers = self.headers.and_then(|mut headers| {
            let header_name = HeaderName::from_bytes(name.as_bytes())
                .map_err(|_| ResponseError::InvalidHeaderName(name.to_string()))?;
            let header_value = HeaderValue::from_str(value)
                .map_err(|_| ResponseError::InvalidHeaderValue(name.to_string()))?;
            headers.insert(header_name, header_value);
            Ok(headers)
        });
        self
    }

    pub fn set_body(mut self, body: impl Into<ResponseBody>) -> Self {
        self.body = body.into();
        self
    }

    pub fn build(self) -> Result<Response, ResponseError> {
        Ok(Response {
            status: self.status?,
            headers: self.headers?,
            body: self.body,
        })
    }
}

/// How interpolated values are written into a template.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Escaping {
    /// Escape `& < > " '` so values cannot inject markup.
    Html,
    /// Write values verbatim.
    None,
}

/// Interleave literal segments with stringified values, in source order.
///
/// `segments[0]`, then each value followed by the next segment. Segments
/// beyond `values.len() + 1` are appended at the end.
pub fn render<S: AsRef<str>>(segments: &[S], values: &[&dyn Display], escaping: Escaping) -> String {
    let mut out = String::new();
    let mut segments = segments.iter();
    if let Some(first) = segments.next() {
        out.push_str(first.as_ref());
    }
    for value in values {
        match escaping {
            Escaping::Html => escape_html_into(&mut out, &value.to_string()),
            Escaping::None => {
                let _ = write!(out, "{value}");
            }
        }
        if let Some(segment) = segments.next() {
            out.push_str(segment.as_ref());
        }
    }
    for segment in segments {
        out.push_str(segment.as_ref());
    }
    out
}

/// Render a template into a 200 `text/html` response, escaping values.
pub fn html<S: AsRef<str>>(segments: &[S], values: &[&dyn Display]) -> Response {
    html_response(render(segments, values, Escaping::Html))
}

/// Like [`html`], but values are written verbatim.
pub fn html_unescaped<S: AsRef<str>>(segments: &[S], values: &[&dyn Display]) -> Response {
    html_response(render(segments, values, Escaping::None))
}

fn html_response(document: String) -> Response {
    let mut headers = HeaderMap::new();
    headers.insert(header::CONTENT_TYPE, HeaderValue::from_static(TEXT_HTML));
    Response {
        status: StatusCode::OK,
        headers,
        body: ResponseBody::Text(document),
    }
}

fn escape_html_into(out: &mut String, value: &str) {
    for c in value.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            other => out.push(other),
        }
    }
}
