//! Configuration validation.
//!
//! # Responsibilities
//! - Semantic validation (serde handles syntactic)
//! - Validate addresses, timeouts and limits
//! - Compile every static route template so a bad one fails at startup
//!
//! # Design Decisions
//! - Returns all validation errors, not just first
//! - Validation is pure function: RouterConfig → Result<(), Vec<ValidationError>>
//! - Runs before config is accepted into the system

use std::net::SocketAddr;
use std::str::FromStr;
use axum::http::uri::Authority;
use axum::http::{Method, StatusCode};
use thiserror::Error;

use crate::config::schema::RouterConfig;
use crate::routing::pattern::{PathPattern, PatternError};

/// A single semantic problem in a configuration.
#[derive(Debug, Error)]
pub enum ValidationError {
    #[error("{field}: {value:?} is not a socket address")]
    InvalidAddress { field: &'static str, value: String },

    #[error("{field}: {value:?} is not a host:port authority")]
    InvalidAuthority { field: &'static str, value: String },

    #[error("{0} must be greater than zero")]
    ZeroValue(&'static str),

    #[error("routes[{index}]: invalid method {method:?}")]
    InvalidMethod { index: usize, method: String },

    #[error("routes[{index}]: invalid status {status}")]
    InvalidStatus { index: usize, status: u16 },

    #[error("routes[{index}]: {source}")]
    InvalidTemplate {
        index: usize,
        #[source]
        source: PatternError,
    },
}

pub fn validate_config(config: &RouterConfig) -> Result<(), Vec<ValidationError>> {
    let mut errors = Vec::new();

    check_address(&mut errors, "listener.bind_address", &config.listener.bind_address);
    if let Some(upstream) = &config.upstream.address {
        check_authority(&mut errors, "upstream.address", upstream);
    }
    if config.observability.metrics_enabled {
        check_address(
            &mut errors,
            "observability.metrics_address",
            &config.observability.metrics_address,
        );
    }

    if config.timeouts.handler_secs == 0 {
        errors.push(ValidationError::ZeroValue("timeouts.handler_secs"));
    }
    if config.timeouts.forward_secs == 0 {
        errors.push(ValidationError::ZeroValue("timeouts.forward_secs"));
    }
    if config.timeouts.connect_secs == 0 {
        errors.push(ValidationError::ZeroValue("timeouts.connect_secs"));
    }
    if config.security.max_body_size == 0 {
        errors.push(ValidationError::ZeroValue("security.max_body_size"));
    }

    for (index, route) in config.routes.iter().enumerate() {
        if Method::from_bytes(route.method.as_bytes()).is_err() {
            errors.push(ValidationError::InvalidMethod {
                index,
                method: route.method.clone(),
            });
        }
        if StatusCode::from_u16(route.status).is_err() {
            errors.push(ValidationError::InvalidStatus {
                index,
                status: route.status,
            });
        }
        if let Err(source) = PathPattern::compile(&route.path) {
            errors.push(ValidationError::InvalidTemplate { index, source });
        }
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}

fn check_address(errors: &mut Vec<ValidationError>, field: &'static str, value: &str) {
    if value.parse::<SocketAddr>().is_err() {
        errors.push(ValidationError::InvalidAddress {
            field,
            value: value.to_string(),
        });
    }
}

/// Upstreams may be named by host, so anything the forwarder can dial is accepted.
fn check_authority(errors: &mut Vec<ValidationError>, field: &'static str, value: &str) {
    let valid = Authority::from_str(value)
        .map(|authority| !authority.host().is_empty() && authority.as_str() == value)
        .unwrap_or(false);
    if !valid {
        errors.push(ValidationError::InvalidAuthority {
            field,
            value: value.to_string(),
        });
    }
}
