//! HTTP protocol handling subsystem.
//!
//! # Data Flow
//! ```text
//! TCP connection
//!     → server.rs (Axum setup, request ID, trace span)
//!     → bridge.rs (dispatch decision)
//!         matched:   request.rs (params, body) → handler → response.rs
//!         unmatched: forward.rs (original request → upstream → relayed response)
//!     → Send to client
//!
//! In-process calls:
//!     local.rs → same route table → response.rs
//! ```

pub mod bridge;
pub mod forward;
pub mod local;
pub mod request;
pub mod response;
pub mod server;

pub use bridge::InterceptionBridge;
pub use forward::{ForwardError, Forwarder, UpstreamForwarder};
pub use local::LocalResponder;
pub use request::{BodyError, FormData, InterceptedRequest, X_REQUEST_ID};
pub use response::{html, html_unescaped, render, Escaping, Response, ResponseBody, ResponseBuilder, ResponseError};
pub use server::HttpServer;
