//! Intercepted request model.
//!
//! # Responsibilities
//! - Carry the inbound request head untouched, so passthrough forwards it unmodified
//! - Hold route params once a route matches
//! - Buffer the body on first access (bytes, text, form data)
//!
//! # Design Decisions
//! - The body is only read when a handler asks for it; unmatched requests
//!   stream straight to the forwarder
//! - Body size is bounded; oversized bodies surface as [`BodyError::TooLarge`]
//! - Form parsing accepts `application/x-www-form-urlencoded` only

use axum::body::{Body, Bytes};
use axum::http::{header, request::Parts, HeaderMap, Method, Request, Uri};
use thiserror::Error;

use crate::routing::pattern::Params;

/// Header carrying the per-request correlation ID.
pub const X_REQUEST_ID: &str = "x-request-id";

const FORM_URLENCODED: &str = "application/x-www-form-urlencoded";

/// Failure reading or decoding a request body.
#[derive(Debug, Error)]
pub enum BodyError {
    #[error("request body exceeds {limit} bytes")]
    TooLarge { limit: usize },

    #[error("failed to read request body: {0}")]
    Read(#[source] axum::Error),

    #[error("request body is not valid UTF-8")]
    InvalidUtf8(#[from] std::string::FromUtf8Error),

    #[error("unsupported content type {0:?} for form data")]
    UnsupportedMediaType(String),
}

enum BodySource {
    Streaming(Body),
    Buffered(Bytes),
}

/// A request as seen by route handlers.
pub struct InterceptedRequest {
    parts: Parts,
    params: Params,
    body: BodySource,
    body_limit: usize,
}

impl InterceptedRequest {
    /// Wrap an inbound request. `body_limit` caps how much of the body handlers may buffer.
    pub fn new(request: Request<Body>, body_limit: usize) -> Self {
        let (parts, body) = request.into_parts();
        Self {
            parts,
            params: Params::new(),
            body: BodySource::Streaming(body),
            body_limit,
        }
    }

    pub fn method(&self) -> &Method {
        &self.parts.method
    }

    pub fn uri(&self) -> &Uri {
        &self.parts.uri
    }

    /// Raw path, still percent-encoded.
    pub fn path(&self) -> &str {
        self.parts.uri.path()
    }

    pub fn headers(&self) -> &HeaderMap {
        &self.parts.headers
    }

    pub fn header(&self, name: &str) -> Option<&str> {
        self.parts.headers.get(name).and_then(|v| v.to_str().ok())
    }

    pub fn request_id(&self) -> Option<&str> {
        self.header(X_REQUEST_ID)
    }

    /// Params of the route that matched. Empty until dispatch attaches them.
    pub fn params(&self) -> &Params {
        &self.params
    }

    pub fn param(&self, name: &str) -> Option<&str> {
        self.params.get(name)
    }

    pub(crate) fn set_params(&mut self, params: Params) {
        self.params = params;
    }

    /// Decoded query string pairs, in order.
    pub fn query(&self) -> Vec<(String, String)> {
        self.parts
            .uri
            .query()
            .map(|q| {
                url::form_urlencoded::parse(q.as_bytes())
                    .into_owned()
                    .collect()
            })
            .unwrap_or_default()
    }

    /// Buffer and return the whole body. Later calls return the same bytes.
    pub async fn bytes(&mut self) -> Result<Bytes, BodyError> {
        let bytes = match std::mem::replace(&mut self.body, BodySource::Buffered(Bytes::new())) {
            BodySource::Buffered(bytes) => bytes,
            BodySource::Streaming(body) => {
                axum::body::to_bytes(body, self.body_limit)
                    .await
                    .map_err(|e| classify_read_error(e, self.body_limit))?
            }
        };
        self.body = BodySource::Buffered(bytes.clone());
        Ok(bytes)
    }

    pub async fn text(&mut self) -> Result<String, BodyError> {
        let bytes = self.bytes().await?;
        Ok(String::from_utf8(bytes.to_vec())?)
    }

    /// Parse the body as URL-encoded form fields.
    ///
    /// A missing `Content-Type` is treated as URL-encoded.
    pub async fn form(&mut self) -> Result<FormData, BodyError> {
        if let Some(content_type) = self.header(header::CONTENT_TYPE.as_str()) {
            let essence = content_type.split(';').next().unwrap_or_default().trim();
            if !essence.eq_ignore_ascii_case(FORM_URLENCODED) {
                return Err(BodyError::UnsupportedMediaType(content_type.to_string()));
            }
        }
        let bytes = self.bytes().await?;
        Ok(FormData::parse(&bytes))
    }

    /// Rebuild the original request for forwarding.
    pub fn into_http(self) -> Request<Body> {
        let body = match self.body {
            BodySource::Streaming(body) => body,
            BodySource::Buffered(bytes) => Body::from(bytes),
        };
        Request::from_parts(self.parts, body)
    }
}

impl std::fmt::Debug for InterceptedRequest {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("InterceptedRequest")
            .field("method", &self.parts.method)
            .field("uri", &self.parts.uri)
            .field("params", &self.params)
            .finish_non_exhaustive()
    }
}

fn classify_read_error(error: axum::Error, limit: usize) -> BodyError {
    let mut source: Option<&(dyn std::error::Error + 'static)> = Some(&error);
    while let Some(err) = source {
        if err.is::<http_body_util::LengthLimitError>() {
            return BodyError::TooLarge { limit };
        }
        source = err.source();
    }
    BodyError::Read(error)
}

/// Decoded form fields.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FormData {
    fields: Vec<(String, String)>,
}

impl FormData {
    pub fn parse(body: &[u8]) -> Self {
        Self {
            fields: url::form_urlencoded::parse(body).into_owned().collect(),
        }
    }

    /// First value for `name`.
    pub fn get(&self, name: &str) -> Option<&str> {
        self.fields
            .iter()
            .find(|(k, _)| k == name)
            .map(|(_, v)| v.as_str())
    }

    pub fn get_all<'a>(&'a self, name: &'a str) -> impl Iterator<Item = &'a str> + 'a {
        self.fields
            .iter()
            .filter(move |(k, _)| k == name)
            .map(|(_, v)| v.as_str())
    }

    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }
}
