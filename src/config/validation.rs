//! Configuration validation.
//!
//! # Responsibilities
//! - Semantic validation (serde handles syntactic)
//! - Validate value ranges (timeouts > 0, addresses parseable)
//! - Check the backend launch command is usable
//!
//! # Design Decisions
//! - Returns all validation errors, not just first
//! - Validation is pure function: SupervisorConfig → Result<(), Vec<ValidationError>>
//! - Runs before config is accepted into the system

use std::net::SocketAddr;

use crate::config::schema::SupervisorConfig;

/// A single semantic validation failure.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidationError {
    /// Config field the error refers to, e.g. "backend.address".
    pub field: &'static str,
    pub message: String,
}

impl std::fmt::Display for ValidationError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}: {}", self.field, self.message)
    }
}

/// Validate a configuration, collecting every error found.
pub fn validate_config(config: &SupervisorConfig) -> Result<(), Vec<ValidationError>> {
    let mut errors = Vec::new();

    if config.backend.command.trim().is_empty() {
        errors.push(ValidationError {
            field: "backend.command",
            message: "backend launch command must not be empty".to_string(),
        });
    }

    if config.backend.address.parse::<SocketAddr>().is_err() {
        errors.push(ValidationError {
            field: "backend.address",
            message: format!(
                "'{}' is not a valid host:port address",
                config.backend.address
            ),
        });
    }

    for (field, path) in [
        ("backend.health_path", &config.backend.health_path),
        ("backend.shutdown_path", &config.backend.shutdown_path),
    ] {
        if !path.starts_with('/') {
            errors.push(ValidationError {
                field,
                message: format!("'{path}' must start with '/'"),
            });
        }
    }

    if config.idle.timeout_ms == 0 {
        errors.push(ValidationError {
            field: "idle.timeout_ms",
            message: "idle timeout must be greater than zero".to_string(),
        });
    }

    for (field, secs) in [
        (
            "health.status_timeout_secs",
            config.health.status_timeout_secs,
        ),
        (
            "shutdown.graceful_request_timeout_secs",
            config.shutdown.graceful_request_timeout_secs,
        ),
        ("shutdown.grace_period_secs", config.shutdown.grace_period_secs),
        ("timeouts.request_secs", config.timeouts.request_secs),
    ] {
        if secs == 0 {
            errors.push(ValidationError {
                field,
                message: "must be greater than zero".to_string(),
            });
        }
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}
