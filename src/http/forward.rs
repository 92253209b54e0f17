//! Passthrough forwarding for unmatched requests.
//!
//! # Responsibilities
//! - Deliver the original request to its destination unmodified
//! - Relay the upstream response, or the transport failure, back to the bridge
//!
//! # Design Decisions
//! - Absolute-form HTTP/1 request targets (proxy-style requests) go where they
//!   point; everything else goes to the configured upstream address. HTTP/2
//!   URIs always carry an authority, and it names this router
//! - Method, headers and body stream are passed through untouched
//! - The upstream leg is always HTTP/1.1, whatever version the client spoke
//! - Transport failures are reported as [`ForwardError`], never masked

use axum::body::Body;
use axum::http::uri::{Authority, Scheme};
use axum::http::{Request, Response, Uri, Version};
use hyper::body::Incoming;
use hyper_util::client::legacy::{connect::HttpConnector, Client};
use hyper_util::rt::TokioExecutor;
use std::str::FromStr;
use std::time::Duration;
use thiserror::Error;

use crate::config::{TimeoutConfig, UpstreamConfig};
use crate::routing::handler::BoxFuture;

/// Passthrough failure, relayed to the event source as-is.
#[derive(Debug, Error)]
pub enum ForwardError {
    #[error("no destination for {0}: request is not absolute and no upstream is configured")]
    NoDestination(Uri),

    #[error("invalid upstream URI: {0}")]
    InvalidUri(String),

    #[error("upstream request failed: {0}")]
    Upstream(#[from] hyper_util::client::legacy::Error),

    #[error("upstream did not respond within {0:?}")]
    Timeout(Duration),
}

/// Delivers requests no route claimed.
pub trait Forwarder: Send + Sync + 'static {
    fn forward(&self, request: Request<Body>) -> BoxFuture<'_, Result<Response<Body>, ForwardError>>;
}

/// Forwards over HTTP with a pooled hyper client.
#[derive(Clone)]
pub struct UpstreamForwarder {
    client: Client<HttpConnector, Body>,
    upstream: Option<Authority>,
    timeout: Duration,
}

impl UpstreamForwarder {
    pub fn new(upstream: &UpstreamConfig, timeouts: &TimeoutConfig) -> Result<Self, ForwardError> {
        let upstream = upstream
            .address
            .as_deref()
            .map(|addr| Authority::from_str(addr).map_err(|_| ForwardError::InvalidUri(addr.to_string())))
            .transpose()?;

        let mut connector = HttpConnector::new();
        connector.set_connect_timeout(Some(Duration::from_secs(timeouts.connect_secs)));
        let client = Client::builder(TokioExecutor::new()).build(connector);

        Ok(Self {
            client,
            upstream,
            timeout: Duration::from_secs(timeouts.forward_secs),
        })
    }

    /// Where a request for `uri`, received over `version`, should be delivered.
    fn destination(&self, uri: &Uri, version: Version) -> Result<Uri, ForwardError> {
        let http1 = version != Version::HTTP_2 && version != Version::HTTP_3;
        let proxy_style = http1 && uri.authority().is_some();
        if proxy_style {
            return Ok(uri.clone());
        }
        let authority = self
            .upstream
            .clone()
            .ok_or_else(|| ForwardError::NoDestination(uri.clone()))?;

        let mut parts = uri.clone().into_parts();
        parts.scheme = Some(Scheme::HTTP);
        parts.authority = Some(authority);
        if parts.path_and_query.is_none() {
            parts.path_and_query = Some("/".parse().map_err(|_| ForwardError::InvalidUri(uri.to_string()))?);
        }
        Uri::from_parts(parts).map_err(|e| ForwardError::InvalidUri(e.to_string()))
    }
}

impl Forwarder for UpstreamForwarder {
    fn forward(&self, request: Request<Body>) -> BoxFuture<'_, Result<Response<Body>, ForwardError>> {
        Box::pin(async move {
            let (mut parts, body) = request.into_parts();
            parts.uri = self.destination(&parts.uri, parts.version)?;
            parts.version = Version::HTTP_11;

            tracing::debug!(
                method = %parts.method,
                destination = %parts.uri,
                "Forwarding request"
            );

            let pending = self.client.request(Request::from_parts(parts, body));
            let response = tokio::time::timeout(self.timeout, pending)
                .await
                .map_err(|_| ForwardError::Timeout(self.timeout))??;

            let (parts, body): (_, Incoming) = response.into_parts();
            Ok(Response::from_parts(parts, Body::new(body)))
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn forwarder(upstream: Option<&str>) -> UpstreamForwarder {
        UpstreamForwarder::new(
            &UpstreamConfig {
                address: upstream.map(str::to_string),
            },
            &TimeoutConfig::default(),
        )
        .unwrap()
    }

    #[tokio::test]
    async fn test_origin_form_goes_to_upstream() {
        let fwd = forwarder(Some("127.0.0.1:3000"));
        let uri: Uri = "/pages/index?x=1".parse().unwrap();
        let dest = fwd.destination(&uri, Version::HTTP_11).unwrap();
        assert_eq!(dest.to_string(), "http://127.0.0.1:3000/pages/index?x=1");
    }

    #[tokio::test]
    async fn test_http2_authority_is_not_a_destination() {
        let fwd = forwarder(Some("127.0.0.1:3000"));
        let uri: Uri = "http://127.0.0.1:8080/styles/site.css".parse().unwrap();
        let dest = fwd.destination(&uri, Version::HTTP_2).unwrap();
        assert_eq!(dest.to_string(), "http://127.0.0.1:3000/styles/site.css");
    }

    #[tokio::test]
    async fn test_absolute_uri_kept() {
        let fwd = forwarder(Some("127.0.0.1:3000"));
        let uri: Uri = "http://example.com/a".parse().unwrap();
        assert_eq!(fwd.destination(&uri, Version::HTTP_11).unwrap(), uri);
    }

    #[tokio::test]
    async fn test_no_destination() {
        let fwd = forwarder(None);
        let uri: Uri = "/a".parse().unwrap();
        assert!(matches!(
            fwd.destination(&uri, Version::HTTP_11),
            Err(ForwardError::NoDestination(_))
        ));
    }
}
