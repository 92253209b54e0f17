//! Route handlers.

use std::future::Future;
use std::pin::Pin;

use crate::http::request::InterceptedRequest;
use crate::http::response::Response;

pub use tower::BoxError;

/// Boxed, sendable future returned by handlers.
pub type BoxFuture<'a, T> = Pin<Box<dyn Future<Output = T> + Send + 'a>>;

/// What a handler produces: a local response, or an error the bridge turns into a fallback page.
pub type HandlerResult = Result<Response, BoxError>;

/// Produces a response for a matched request.
///
/// Implemented for any `Fn(InterceptedRequest) -> impl Future<Output = HandlerResult>`,
/// so plain `async fn` items register directly.
pub trait Handler: Send + Sync + 'static {
    fn call(&self, request: InterceptedRequest) -> BoxFuture<'static, HandlerResult>;
}

impl<F, Fut> Handler for F
where
    F: Fn(InterceptedRequest) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = HandlerResult> + Send + 'static,
{
    fn call(&self, request: InterceptedRequest) -> BoxFuture<'static, HandlerResult> {
        Box::pin(self(request))
    }
}

/// Serves a fixed response, used for routes declared in the config file.
#[derive(Debug, Clone)]
pub struct StaticResponder {
    response: Response,
}

impl StaticResponder {
    pub fn new(response: Response) -> Self {
        Self { response }
    }
}

impl Handler for StaticResponder {
    fn call(&self, _request: InterceptedRequest) -> BoxFuture<'static, HandlerResult> {
        let response = self.response.clone();
        Box::pin(async move { Ok(response) })
    }
}
