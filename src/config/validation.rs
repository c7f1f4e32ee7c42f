//! Configuration validation.
//!
//! # Responsibilities
//! - Semantic validation (serde handles syntactic)
//! - Validate endpoint URLs and reject duplicates
//! - Validate value ranges (ratios, caps, windows)
//!
//! # Design Decisions
//! - Returns all validation errors, not just first
//! - Validation is pure function: AccessConfig → Result<(), Vec<ValidationError>>
//! - Runs before config is accepted into the system

use std::collections::HashSet;
use std::net::SocketAddr;
use thiserror::Error;

use crate::config::schema::AccessConfig;

/// A single semantic problem with a configuration.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("endpoint '{url}' is not a valid URL: {reason}")]
    InvalidUrl { url: String, reason: String },

    #[error("endpoint '{0}' must use http or https")]
    UnsupportedScheme(String),

    #[error("endpoint '{0}' is listed more than once")]
    DuplicateEndpoint(String),

    #[error("{field} must be greater than zero")]
    Zero { field: &'static str },

    #[error("tracker.healthy_success_ratio must be within [0, 1)")]
    RatioOutOfRange,

    #[error("observability.metrics_address '{0}' is not a socket address")]
    InvalidMetricsAddress(String),
}

/// Validate a parsed configuration.
pub fn validate_config(config: &AccessConfig) -> Result<(), Vec<ValidationError>> {
    let mut errors = Vec::new();

    let mut seen = HashSet::new();
    for raw in &config.endpoints.urls {
        match url::Url::parse(raw) {
            Ok(parsed) => {
                if parsed.scheme() != "http" && parsed.scheme() != "https" {
                    errors.push(ValidationError::UnsupportedScheme(raw.clone()));
                }
            }
            Err(e) => errors.push(ValidationError::InvalidUrl {
                url: raw.clone(),
                reason: e.to_string(),
            }),
        }
        if !seen.insert(raw.as_str()) {
            errors.push(ValidationError::DuplicateEndpoint(raw.clone()));
        }
    }

    if config.endpoints.request_timeout_secs == 0 {
        errors.push(ValidationError::Zero {
            field: "endpoints.request_timeout_secs",
        });
    }
    if config.tracker.max_records == 0 {
        errors.push(ValidationError::Zero {
            field: "tracker.max_records",
        });
    }
    if config.tracker.error_rate_window_ms == 0 {
        errors.push(ValidationError::Zero {
            field: "tracker.error_rate_window_ms",
        });
    }
    let ratio = config.tracker.healthy_success_ratio;
    if !(0.0..1.0).contains(&ratio) {
        errors.push(ValidationError::RatioOutOfRange);
    }
    if config.observability.metrics_enabled
        && config.observability.metrics_address.parse::<SocketAddr>().is_err()
    {
        errors.push(ValidationError::InvalidMetricsAddress(
            config.observability.metrics_address.clone(),
        ));
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}
