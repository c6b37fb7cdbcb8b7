//! Health probing.
//!
//! # Responsibilities
//! - Issue a single bounded-timeout GET against the backend's health
//!   endpoint
//! - Classify the outcome as a status value
//!
//! # Design Decisions
//! - Infallible signature: every network failure resolves to a status,
//!   never an error the caller must handle
//! - No retries; callers decide retry policy
//! - Probe results are ephemeral and never persisted

use std::time::Duration;

use crate::config::BackendConfig;

/// Outcome of a single health probe.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HealthStatus {
    /// The backend answered 200.
    Responsive,
    /// The backend answered with a non-200 status, or not in time.
    Unresponsive,
    /// The connection was refused or could not be established.
    Unreachable,
}

impl HealthStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            HealthStatus::Responsive => "responsive",
            HealthStatus::Unresponsive => "unresponsive",
            HealthStatus::Unreachable => "unreachable",
        }
    }
}

impl std::fmt::Display for HealthStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Probes the backend's health endpoint.
pub struct HealthProber {
    client: reqwest::Client,
    url: String,
}

impl HealthProber {
    pub fn new(backend: &BackendConfig) -> Self {
        Self {
            client: reqwest::Client::new(),
            url: format!("http://{}{}", backend.address, backend.health_path),
        }
    }

    /// Issue one GET against the health endpoint.
    pub async fn probe(&self, timeout: Duration) -> HealthStatus {
        match self.client.get(&self.url).timeout(timeout).send().await {
            Ok(response) if response.status() == reqwest::StatusCode::OK => {
                HealthStatus::Responsive
            }
            Ok(response) => {
                tracing::debug!(status = %response.status(), "health probe got non-200");
                HealthStatus::Unresponsive
            }
            Err(e) if e.is_timeout() => HealthStatus::Unresponsive,
            Err(e) if e.is_connect() => HealthStatus::Unreachable,
            Err(e) => {
                tracing::debug!(error = %e, "health probe failed");
                HealthStatus::Unreachable
            }
        }
    }
}
