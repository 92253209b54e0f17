//! Routing subsystem.
//!
//! # Data Flow
//! ```text
//! Registration (startup, &mut Router):
//!     (method, template, handler)
//!     → pattern.rs (compile template → anchored matcher + param names)
//!     → router.rs (append Route; order = priority)
//!     → Freeze as Arc<Router>
//!
//! Dispatch (per request):
//!     InterceptedRequest (method, path)
//!     → router.rs (first route with equal method whose pattern matches)
//!     → pattern.rs (decode captures into Params)
//!     → Return: Matched(handler future) or NoMatch(request)
//! ```
//!
//! # Design Decisions
//! - Routes compiled at registration, immutable at runtime
//! - Deterministic: same input always matches same route
//! - First match wins (ordered by registration)
//! - Matching is synchronous; only handlers suspend

pub mod handler;
pub mod pattern;
pub mod router;

pub use handler::{BoxError, BoxFuture, Handler, HandlerResult, StaticResponder};
pub use pattern::{Params, PathPattern, PatternError, WILDCARD_PARAM};
pub use router::{Dispatch, PendingResponse, RegisterError, Route, RouteMatch, Router};
