//! Configuration validation.
//!
//! Semantic checks on top of serde's syntactic ones. Returns all violations,
//! not just the first, so a config file can be fixed in one pass.

use std::net::IpAddr;

use thiserror::Error;

use crate::config::schema::ServerConfig;

/// A single semantic violation in a configuration.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ValidationError {
    #[error("host `{0}` is not a valid IP address")]
    InvalidHost(String),

    #[error("response_timeout_secs must be greater than zero")]
    ZeroResponseTimeout,

    #[error("max_buffered_responses must be greater than zero")]
    ZeroBufferedResponses,

    #[error("max_body_bytes must be greater than zero")]
    ZeroBodyLimit,
}

/// Validate a configuration, collecting every violation.
pub fn validate_config(config: &ServerConfig) -> Result<(), Vec<ValidationError>> {
    let mut errors = Vec::new();

    if config.host.parse::<IpAddr>().is_err() {
        errors.push(ValidationError::InvalidHost(config.host.clone()));
    }
    if config.response_timeout_secs == 0 {
        errors.push(ValidationError::ZeroResponseTimeout);
    }
    if config.max_buffered_responses == 0 {
        errors.push(ValidationError::ZeroBufferedResponses);
    }
    if config.max_body_bytes == 0 {
        errors.push(ValidationError::ZeroBodyLimit);
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}
