//! Configuration validation.
//!
//! # Responsibilities
//! - Semantic validation (serde handles syntactic)
//! - Validate value ranges (sizes > 0, addresses parse)
//!
//! # Design Decisions
//! - Returns all validation errors, not just first
//! - Validation is pure function: GatewayConfig → Result<(), Vec<ValidationError>>
//! - The listener section is checked again by `start`, so embedders that
//!   build an `HttpConfig` by hand get the same checks as the binary

use std::net::{IpAddr, SocketAddr};

use thiserror::Error;

use crate::config::schema::{GatewayConfig, HttpConfig};

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("http.bind must not be empty")]
    EmptyBind,

    #[error("http.bind {0:?} is not an IP address")]
    InvalidBind(String),

    #[error("http.access_token must not be empty when set")]
    EmptyAccessToken,

    #[error("http.max_body_size must be greater than zero")]
    ZeroBodySize,

    #[error("http.max_collection_len must be greater than zero")]
    ZeroCollectionLen,

    #[error("observability.metrics_address {0:?} is not a socket address")]
    InvalidMetricsAddress(String),
}

pub fn validate_config(config: &GatewayConfig) -> Result<(), Vec<ValidationError>> {
    let mut errors = http_errors(&config.http);

    let obs = &config.observability;
    if obs.metrics_enabled && obs.metrics_address.parse::<SocketAddr>().is_err() {
        errors.push(ValidationError::InvalidMetricsAddress(obs.metrics_address.clone()));
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}

/// Validate the listener section alone.
pub fn validate_http(http: &HttpConfig) -> Result<(), Vec<ValidationError>> {
    let errors = http_errors(http);
    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}

fn http_errors(http: &HttpConfig) -> Vec<ValidationError> {
    let mut errors = Vec::new();
    let host = http.bind.trim().trim_start_matches('[').trim_end_matches(']');
    if host.is_empty() {
        errors.push(ValidationError::EmptyBind);
    } else if host.parse::<IpAddr>().is_err() {
        errors.push(ValidationError::InvalidBind(http.bind.clone()));
    }
    if http.access_token.as_deref() == Some("") {
        errors.push(ValidationError::EmptyAccessToken);
    }
    if http.max_body_size == 0 {
        errors.push(ValidationError::ZeroBodySize);
    }
    if http.max_collection_len == 0 {
        errors.push(ValidationError::ZeroCollectionLen);
    }
    errors
}
