//! Route table and dispatch.
//!
//! # Responsibilities
//! - Store compiled routes in registration order
//! - Find the first route whose method and pattern accept a request
//! - Attach extracted params to the request, then hand it to the handler
//!
//! # Design Decisions
//! - First registered match wins; there is no specificity scoring
//! - Methods compare exactly as `http::Method` values (case-sensitive)
//! - Registration needs `&mut Router`; once frozen behind `Arc` the table is read-only
//! - Explicit `NoMatch` carrying the untouched request rather than a silent default

use axum::http::Method;
use std::fmt;
use std::sync::Arc;
use tracing::{debug, info};

use crate::http::request::InterceptedRequest;
use crate::routing::handler::{BoxFuture, Handler, HandlerResult};
use crate::routing::pattern::{Params, PathPattern, PatternError};

/// A registered route. Immutable once added to a [`Router`].
pub struct Route {
    method: Method,
    pattern: PathPattern,
    handler: Arc<dyn Handler>,
}

impl Route {
    pub fn method(&self) -> &Method {
        &self.method
    }

    pub fn pattern(&self) -> &PathPattern {
        &self.pattern
    }
}

impl fmt::Debug for Route {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Route")
            .field("method", &self.method)
            .field("pattern", &self.pattern.as_str())
            .finish_non_exhaustive()
    }
}

/// The winning route for a method and path, with its decoded params.
#[derive(Debug)]
pub struct RouteMatch<'a> {
    pub route: &'a Route,
    pub params: Params,
}

/// A matched request whose handler has not run yet.
pub struct PendingResponse {
    /// Template of the route that matched, for logs and metrics.
    pub pattern: Arc<str>,
    /// The handler's work. The handler itself is only invoked on first poll.
    pub future: BoxFuture<'static, HandlerResult>,
}

/// Outcome of [`Router::dispatch`].
pub enum Dispatch {
    Matched(PendingResponse),
    NoMatch(InterceptedRequest),
}

/// Ordered route table.
#[derive(Default)]
pub struct Router {
    routes: Vec<Route>,
}

impl fmt::Debug for Router {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Router").field("routes", &self.routes).finish()
    }
}

impl Router {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a route. A malformed template is rejected and leaves the table unchanged.
    pub fn register<H>(
        &mut self,
        method: Method,
        template: &str,
        handler: H,
    ) -> Result<&mut Self, PatternError>
    where
        H: Handler,
    {
        let pattern = PathPattern::compile(template)?;
        debug!(
            method = %method,
            template = %template,
            params = ?pattern.param_names(),
            position = self.routes.len(),
            "Route registered"
        );
        self.routes.push(Route {
            method,
            pattern,
            handler: Arc::new(handler),
        });
        Ok(self)
    }

    /// Register with a method given as text, e.g. from a config file.
    pub fn register_str<H>(
        &mut self,
        method: &str,
        template: &str,
        handler: H,
    ) -> Result<&mut Self, RegisterError>
    where
        H: Handler,
    {
        let method = Method::from_bytes(method.as_bytes())
            .map_err(|_| RegisterError::InvalidMethod(method.to_string()))?;
        self.register(method, template, handler)?;
        Ok(self)
    }

    pub fn get<H: Handler>(&mut self, template: &str, handler: H) -> Result<&mut Self, PatternError> {
        self.register(Method::GET, template, handler)
    }

    pub fn post<H: Handler>(&mut self, template: &str, handler: H) -> Result<&mut Self, PatternError> {
        self.register(Method::POST, template, handler)
    }

    pub fn put<H: Handler>(&mut self, template: &str, handler: H) -> Result<&mut Self, PatternError> {
        self.register(Method::PUT, template, handler)
    }

    pub fn delete<H: Handler>(&mut self, template: &str, handler: H) -> Result<&mut Self, PatternError> {
        self.register(Method::DELETE, template, handler)
    }

    pub fn patch<H: Handler>(&mut self, template: &str, handler: H) -> Result<&mut Self, PatternError> {
        self.register(Method::PATCH, template, handler)
    }

    pub fn options<H: Handler>(&mut self, template: &str, handler: H) -> Result<&mut Self, PatternError> {
        self.register(Method::OPTIONS, template, handler)
    }

    pub fn head<H: Handler>(&mut self, template: &str, handler: H) -> Result<&mut Self, PatternError> {
        self.register(Method::HEAD, template, handler)
    }

    pub fn routes(&self) -> &[Route] {
        &self.routes
    }

    pub fn len(&self) -> usize {
        self.routes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.routes.is_empty()
    }

    /// Log the routing table once it is complete.
    pub fn log_table(&self) {
        let summary: Vec<String> = self
            .routes
            .iter()
            .map(|r| format!("{} {}", r.method, r.pattern.as_str()))
            .collect();
        info!(routes_count = self.routes.len(), routes = ?summary, "Routing table loaded");
    }

    /// First route accepting `method` and `path`. Never suspends.
    pub fn find(&self, method: &Method, path: &str) -> Option<RouteMatch<'_>> {
        self.routes
            .iter()
            .filter(|route| route.method == *method)
            .find_map(|route| {
                route
                    .pattern
                    .captures(path)
                    .map(|params| RouteMatch { route, params })
            })
    }

    /// Match a request and prepare its handler.
    ///
    /// Params are attached before the returned future is created, so the
    /// handler always sees the complete mapping. Later routes are never tried.
    pub fn dispatch(&self, mut request: InterceptedRequest) -> Dispatch {
        let Some(RouteMatch { route, params }) = self.find(request.method(), request.path()) else {
            debug!(method = %request.method(), path = %request.path(), "No route matched");
            return Dispatch::NoMatch(request);
        };

        debug!(
            method = %request.method(),
            path = %request.path(),
            route = %route.pattern.as_str(),
            params = ?params,
            "Route matched"
        );

        request.set_params(params);
        let handler = Arc::clone(&route.handler);
        Dispatch::Matched(PendingResponse {
            pattern: Arc::from(route.pattern.as_str()),
            future: Box::pin(async move { handler.call(request).await }),
        })
    }
}

/// Failure to register a route whose method arrives as text.
#[derive(Debug, thiserror::Error)]
pub enum RegisterError {
    #[error("invalid HTTP method {0:?}")]
    InvalidMethod(String),

    #[error(transparent)]
    Pattern(#[from] PatternError),
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::http::response::Response;
    use crate::routing::handler::BoxError;
    use axum::body::Body;
    use axum::http::Request;

    fn request(method: Method, uri: &str) -> InterceptedRequest {
        let req = Request::builder()
            .method(method)
            .uri(uri)
            .body(Body::empty())
            .unwrap();
        InterceptedRequest::new(req, 1024)
    }

    async fn body_of(dispatch: Dispatch) -> String {
        match dispatch {
            Dispatch::Matched(pending) => {
                let response = pending.future.await.unwrap();
                response.text().unwrap_or_default().to_string()
            }
            Dispatch::NoMatch(_) => panic!("expected a match"),
        }
    }

    #[tokio::test]
    async fn test_first_registered_route_wins() {
        let mut router = Router::new();
        router
            .get("/items/[id]", |_req: InterceptedRequest| async {
                Ok::<_, BoxError>(Response::from("first"))
            })
            .unwrap()
            .get("/items/*", |_req: InterceptedRequest| async {
                Ok::<_, BoxError>(Response::from("second"))
            })
            .unwrap();

        let body = body_of(router.dispatch(request(Method::GET, "/items/7"))).await;
        assert_eq!(body, "first");

        // Only the wildcard route accepts a nested path.
        let body = body_of(router.dispatch(request(Method::GET, "/items/7/extra"))).await;
        assert_eq!(body, "second");
    }

    #[tokio::test]
    async fn test_method_must_match() {
        let mut router = Router::new();
        router
            .post("/submit", |_req: InterceptedRequest| async {
                Ok::<_, BoxError>(Response::from("posted"))
            })
            .unwrap();

        assert!(matches!(
            router.dispatch(request(Method::GET, "/submit")),
            Dispatch::NoMatch(_)
        ));
        assert!(matches!(
            router.dispatch(request(Method::POST, "/submit")),
            Dispatch::Matched(_)
        ));
    }

    #[tokio::test]
    async fn test_params_visible_to_handler() {
        let mut router = Router::new();
        router
            .post("/submit/[id]/[otherid]/*", |req: InterceptedRequest| async move {
                let params = req.params();
                Ok::<_, BoxError>(Response::from(format!(
                    "{}|{}|{}",
                    params.get("id").unwrap_or_default(),
                    params.get("otherid").unwrap_or_default(),
                    params.get("wildcard").unwrap_or_default(),
                )))
            })
            .unwrap();

        let body = body_of(router.dispatch(request(Method::POST, "/submit/a%20b/9/x/y"))).await;
        assert_eq!(body, "a b|9|x/y");
    }

    #[test]
    fn test_no_match_returns_request() {
        let router = Router::new();
        match router.dispatch(request(Method::GET, "/nothing?q=1")) {
            Dispatch::NoMatch(req) => {
                assert_eq!(req.path(), "/nothing");
                assert!(req.params().is_empty());
            }
            Dispatch::Matched(_) => panic!("empty router matched"),
        }
    }

    #[test]
    fn test_bad_template_leaves_table_unchanged() {
        let mut router = Router::new();
        router
            .get("/ok", |_req: InterceptedRequest| async {
                Ok::<_, BoxError>(Response::from("ok"))
            })
            .unwrap();
        let err = router.get("/broken/[id", |_req: InterceptedRequest| async {
            Ok::<_, BoxError>(Response::from("never"))
        });
        assert!(err.is_err());
        assert_eq!(router.len(), 1);
    }

    #[test]
    fn test_debug_lists_routes_in_order() {
        let mut router = Router::new();
        router
            .get("/a", |_req: InterceptedRequest| async {
                Ok::<_, BoxError>(Response::from("a"))
            })
            .unwrap()
            .post("/b/[id]", |_req: InterceptedRequest| async {
                Ok::<_, BoxError>(Response::from("b"))
            })
            .unwrap();
        let debug = format!("{router:?}");
        let a = debug.find("\"/a\"").unwrap();
        let b = debug.find("\"/b/[id]\"").unwrap();
        assert!(a < b, "{debug}");
    }

    #[test]
    fn test_register_str_is_case_sensitive() {
        let mut router = Router::new();
        router
            .register_str("get", "/lower", |_req: InterceptedRequest| async {
                Ok::<_, BoxError>(Response::from("lower"))
            })
            .unwrap();
        assert!(router.find(&Method::GET, "/lower").is_none());

        let err = router.register_str("BAD METHOD", "/x", |_req: InterceptedRequest| async {
            Ok::<_, BoxError>(Response::from("x"))
        });
        assert!(matches!(err, Err(RegisterError::InvalidMethod(_))));
    }
}
