//! Persistent key-value storage for handlers.
//!
//! # Data Flow
//! ```text
//! handler
//!     → KvStore::get/set/remove/increment (async)
//!     → spawn_blocking
//!         → open SQLite file (create parent dirs)
//!         → ensure schema (PRAGMA user_version)
//!         → one transaction per operation
//!         → close connection
//!     → value decoded from JSON
//! ```
//!
//! # Design Decisions
//! - One table, keyed by text; values are JSON so any serde value round-trips
//! - A connection lives only for the duration of one operation, so abandoning
//!   a handler mid-flight never leaves a handle open
//! - A missing key is `Ok(None)`; I/O failures are `Err(StoreError)`
//! - Only `increment` is atomic across its read and write; a separate
//!   `get` followed by `set` can race with other handlers

mod sqlite;

pub use sqlite::{KvStore, StoreError, SCHEMA_VERSION, TABLE_NAME};
