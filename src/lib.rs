//! Request-interception router.
//!
//! Inbound requests are matched against an ordered route table; a match is
//! answered locally by its handler, anything else is forwarded unmodified.

pub mod config;
pub mod demo;
pub mod http;
pub mod lifecycle;
pub mod observability;
pub mod routing;
pub mod store;

pub use config::RouterConfig;
pub use http::{HttpServer, InterceptedRequest, InterceptionBridge, LocalResponder, Response};
pub use lifecycle::Shutdown;
pub use routing::Router;
pub use store::KvStore;
