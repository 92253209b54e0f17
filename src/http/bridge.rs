//! The interception bridge.
//!
//! # Responsibilities
//! - Single entry point for every inbound request event
//! - Hand matched requests to their handler and resolve with its response
//! - Forward unmatched requests unmodified and relay whatever comes back
//! - Turn handler failures (error, panic, deadline) into a fallback page
//!
//! # Design Decisions
//! - Matching is synchronous; the decision local-vs-forward is made before any await
//! - A matched request always resolves with a well-formed response
//! - Forward failures are returned to the caller untouched
//! - Handler failures are logged with the request ID for operators

use axum::body::Body;
use axum::http::{Request, StatusCode};
use futures_util::FutureExt;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use std::time::{Duration, Instant};

use crate::http::forward::{ForwardError, Forwarder};
use crate::http::request::InterceptedRequest;
use crate::http::response::Response;
use crate::observability::metrics;
use crate::routing::router::{Dispatch, Router};

/// Body of the fallback page served when a handler fails.
pub const HANDLER_FAILURE_MESSAGE: &str = "The request could not be processed.";

/// Why a matched handler produced no response of its own.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum HandlerFailure {
    Error,
    Panic,
    Timeout,
}

impl HandlerFailure {
    fn as_str(self) -> &'static str {
        match self {
            HandlerFailure::Error => "error",
            HandlerFailure::Panic => "panic",
            HandlerFailure::Timeout => "timeout",
        }
    }

    fn status(self) -> StatusCode {
        match self {
            HandlerFailure::Error | HandlerFailure::Panic => StatusCode::INTERNAL_SERVER_ERROR,
            HandlerFailure::Timeout => StatusCode::GATEWAY_TIMEOUT,
        }
    }
}

/// Connects the event source to the route table and the forwarder.
pub struct InterceptionBridge {
    router: Arc<Router>,
    forwarder: Arc<dyn Forwarder>,
    handler_timeout: Duration,
    body_limit: usize,
}

impl InterceptionBridge {
    pub fn new(
        router: Arc<Router>,
        forwarder: Arc<dyn Forwarder>,
        handler_timeout: Duration,
        body_limit: usize,
    ) -> Self {
        Self {
            router,
            forwarder,
            handler_timeout,
            body_limit,
        }
    }

    pub fn router(&self) -> &Router {
        &self.router
    }

    /// Resolve one request event.
    ///
    /// `Ok` carries either a local response (possibly a fallback page) or the
    /// forwarded response. `Err` is only ever a passthrough failure.
    pub async fn handle(
        &self,
        request: Request<Body>,
    ) -> Result<axum::http::Response<Body>, ForwardError> {
        let start = Instant::now();
        let request = InterceptedRequest::new(request, self.body_limit);
        let method = request.method().clone();
        let path = request.path().to_string();
        let request_id = request.request_id().unwrap_or("unknown").to_string();

        let pending = match self.router.dispatch(request) {
            Dispatch::Matched(pending) => pending,
            Dispatch::NoMatch(request) => {
                let result = self.forwarder.forward(request.into_http()).await;
                match &result {
                    Ok(response) => {
                        metrics::record_request(method.as_str(), response.status().as_u16(), "forward", start);
                    }
                    Err(e) => {
                        tracing::warn!(
                            request_id = %request_id,
                            method = %method,
                            path = %path,
                            error = %e,
                            "Passthrough failed"
                        );
                        metrics::record_request(method.as_str(), 0, "forward_error", start);
                    }
                }
                return result;
            }
        };

        let outcome = tokio::time::timeout(
            self.handler_timeout,
            AssertUnwindSafe(pending.future).catch_unwind(),
        )
        .await;

        let failure = match outcome {
            Ok(Ok(Ok(response))) => {
                tracing::debug!(
                    request_id = %request_id,
                    route = %pending.pattern,
                    status = response.status().as_u16(),
                    "Handled locally"
                );
                metrics::record_request(method.as_str(), response.status().as_u16(), "local", start);
                return Ok(response.into_http());
            }
            Ok(Ok(Err(error))) => {
                tracing::error!(
                    request_id = %request_id,
                    method = %method,
                    path = %path,
                    route = %pending.pattern,
                    error = %error,
                    "Handler failed"
                );
                HandlerFailure::Error
            }
            Ok(Err(panic)) => {
                tracing::error!(
                    request_id = %request_id,
                    method = %method,
                    path = %path,
                    route = %pending.pattern,
                    panic = %panic_message(&*panic),
                    "Handler panicked"
                );
                HandlerFailure::Panic
            }
            Err(_) => {
                tracing::error!(
                    request_id = %request_id,
                    method = %method,
                    path = %path,
                    route = %pending.pattern,
                    timeout = ?self.handler_timeout,
                    "Handler timed out"
                );
                HandlerFailure::Timeout
            }
        };

        metrics::record_handler_failure(failure.as_str());
        let status = failure.status();
        metrics::record_request(method.as_str(), status.as_u16(), "fallback", start);
        Ok(Response::error_page(status, HANDLER_FAILURE_MESSAGE).into_http())
    }
}

fn panic_message(panic: &(dyn std::any::Any + Send)) -> &str {
    panic
        .downcast_ref::<&str>()
        .copied()
        .or_else(|| panic.downcast_ref::<String>().map(String::as_str))
        .unwrap_or("non-string panic payload")
}
