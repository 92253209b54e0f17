//! Observability subsystem.
//!
//! # Data Flow
//! ```text
//! All subsystems produce:
//!     → logging.rs (structured log events via `tracing`)
//!     → metrics.rs (counters, histograms)
//!
//! Consumers:
//!     → stdout (pretty for development, JSON for log aggregation)
//!     → Metrics endpoint (Prometheus scrape), when enabled
//! ```
//!
//! # Design Decisions
//! - Request ID (`x-request-id`) is attached to every bridge log line
//! - Metrics are cheap; with no exporter installed they are no-ops
//! - Handler failures are always logged, since the event source only
//!   sees the fallback page

pub mod logging;
pub mod metrics;
