//! Configuration management subsystem.
//!
//! # Data Flow
//! ```text
//! config file (TOML)
//!     → loader.rs (parse & deserialize)
//!     → validation.rs (semantic checks, route templates compiled)
//!     → RouterConfig (validated, immutable)
//!     → read once at startup by the server, store and route registration
//! ```
//!
//! # Design Decisions
//! - Config is immutable once loaded; changes require a restart, since
//!   route registration must finish before the first dispatch
//! - All fields have defaults to allow minimal configs
//! - Validation separates syntactic (serde) from semantic checks

pub mod loader;
pub mod schema;
pub mod validation;

pub use loader::{load_config, parse_config, ConfigError};
pub use schema::{
    DemoConfig, ListenerConfig, LogFormat, ObservabilityConfig, RouterConfig, SecurityConfig,
    StaticRouteConfig, StoreConfig, TimeoutConfig, UpstreamConfig,
};
pub use validation::ValidationError;
