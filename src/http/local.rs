//! In-process responder.
//!
//! Serves programmatic calls from the embedding application (no network
//! event) through the same route table the bridge uses.

use axum::body::Body;
use axum::http::{header, Method, Request, StatusCode};
use futures_util::FutureExt;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use std::time::Duration;

use crate::http::request::InterceptedRequest;
use crate::http::response::Response;
use crate::routing::router::{Dispatch, Router};

/// Body served when nothing answers a local call.
pub const LOCAL_FAILURE_BODY: &str = "<div>Error loading content</div>";

/// Deadline for a local handler unless [`LocalResponder::with_handler_timeout`] sets one.
const DEFAULT_HANDLER_TIMEOUT: Duration = Duration::from_secs(30);

/// Answers requests made from inside the process.
#[derive(Clone)]
pub struct LocalResponder {
    router: Arc<Router>,
    body_limit: usize,
    handler_timeout: Duration,
}

impl LocalResponder {
    pub fn new(router: Arc<Router>, body_limit: usize) -> Self {
        Self {
            router,
            body_limit,
            handler_timeout: DEFAULT_HANDLER_TIMEOUT,
        }
    }

    pub fn with_handler_timeout(mut self, timeout: Duration) -> Self {
        self.handler_timeout = timeout;
        self
    }

    /// Dispatch a synthetic request. `form` is sent as a URL-encoded body.
    ///
    /// No matching route, or a handler that errors, panics or overruns its
    /// deadline, yields 404 with [`LOCAL_FAILURE_BODY`].
    pub async fn respond(&self, method: Method, path: &str, form: Option<&str>) -> Response {
        let mut builder = Request::builder().method(method.clone()).uri(path);
        if form.is_some() {
            builder = builder.header(header::CONTENT_TYPE, "application/x-www-form-urlencoded");
        }
        let body = form.map(|f| Body::from(f.to_string())).unwrap_or_else(Body::empty);
        let request = match builder.body(body) {
            Ok(request) => request,
            Err(e) => {
                tracing::warn!(method = %method, path = %path, error = %e, "Invalid local request");
                return not_found();
            }
        };

        match self.router.dispatch(InterceptedRequest::new(request, self.body_limit)) {
            Dispatch::Matched(pending) => {
                let outcome = tokio::time::timeout(
                    self.handler_timeout,
                    AssertUnwindSafe(pending.future).catch_unwind(),
                )
                .await;
                match outcome {
                    Ok(Ok(Ok(response))) => response,
                    Ok(Ok(Err(e))) => {
                        tracing::error!(route = %pending.pattern, error = %e, "Local handler failed");
                        not_found()
                    }
                    Ok(Err(_)) => {
                        tracing::error!(route = %pending.pattern, "Local handler panicked");
                        not_found()
                    }
                    Err(_) => {
                        tracing::error!(
                            route = %pending.pattern,
                            timeout = ?self.handler_timeout,
                            "Local handler timed out"
                        );
                        not_found()
                    }
                }
            }
            Dispatch::NoMatch(_) => {
                tracing::debug!(method = %method, path = %path, "Route not found");
                not_found()
            }
        }
    }
}

fn not_found() -> Response {
    Response::from(LOCAL_FAILURE_BODY)
        .into_builder()
        .set_status(StatusCode::NOT_FOUND.as_u16())
        .build()
        .unwrap_or_else(|_| Response::error_page(StatusCode::NOT_FOUND, "Not Found"))
}
