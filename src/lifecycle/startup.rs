//! Startup orchestration.
//!
//! # Responsibilities
//! - Register config-declared routes, then the sample routes when enabled
//! - Hand back the finished table, ready to be frozen behind `Arc`
//!
//! # Design Decisions
//! - Config routes come first, so they take precedence over sample routes
//! - Any registration error is fatal

use thiserror::Error;

use crate::config::RouterConfig;
use crate::demo;
use crate::http::response::{Response, ResponseError};
use crate::routing::handler::StaticResponder;
use crate::routing::pattern::PatternError;
use crate::routing::router::{RegisterError, Router};
use crate::store::KvStore;

/// Failure assembling the route table.
#[derive(Debug, Error)]
pub enum StartupError {
    #[error("route {index}: {source}")]
    Route {
        index: usize,
        #[source]
        source: RegisterError,
    },

    #[error("route {index}: {source}")]
    Response {
        index: usize,
        #[source]
        source: ResponseError,
    },

    #[error("sample routes: {0}")]
    Demo(#[from] PatternError),
}

/// Build the route table described by `config`.
pub fn build_routes(config: &RouterConfig, store: &KvStore) -> Result<Router, StartupError> {
    let mut router = Router::new();

    for (index, route) in config.routes.iter().enumerate() {
        let response = Response::builder()
            .set_status(route.status)
            .set_header("Content-Type", &route.content_type)
            .set_body(route.body.as_str())
            .build()
            .map_err(|source| StartupError::Response { index, source })?;
        router
            .register_str(&route.method, &route.path, StaticResponder::new(response))
            .map_err(|source| StartupError::Route { index, source })?;
    }

    if config.demo.enabled {
        demo::register(&mut router, store.clone())?;
    }

    Ok(router)
}
