//! Configuration schema definitions.
//!
//! This module defines the complete configuration structure for the
//! supervisor. All types derive Serde traits for deserialization from
//! config files.

use std::collections::HashMap;
use std::path::PathBuf;

use serde::{Deserialize, Serialize};

/// Root configuration for the supervisor.
#[derive(Debug, Clone, Deserialize, Serialize, Default)]
#[serde(default)]
pub struct SupervisorConfig {
    /// Listener configuration (bind address).
    pub listener: ListenerConfig,

    /// The supervised backend process and its HTTP endpoints.
    pub backend: BackendConfig,

    /// Idle-shutdown settings.
    pub idle: IdleConfig,

    /// Graceful-shutdown settings.
    pub shutdown: ShutdownConfig,

    /// Health probe settings.
    pub health: HealthConfig,

    /// Timeout configuration.
    pub timeouts: TimeoutConfig,

    /// Control-plane settings.
    pub control: ControlConfig,

    /// Security hardening settings.
    pub security: SecurityConfig,

    /// Observability settings.
    pub observability: ObservabilityConfig,
}

/// Listener configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ListenerConfig {
    /// Bind address (e.g., "127.0.0.1:3001").
    pub bind_address: String,
}

impl Default for ListenerConfig {
    fn default() -> Self {
        Self {
            bind_address: "127.0.0.1:3001".to_string(),
        }
    }
}

/// The backend process to supervise.
///
/// The startup command and working directory are configuration, never
/// inferred at runtime. The backend is opaque beyond its health and
/// shutdown endpoints.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct BackendConfig {
    /// Command used to launch the backend process.
    pub command: String,

    /// Arguments passed to the command.
    pub args: Vec<String>,

    /// Working directory for the backend process.
    pub working_dir: Option<PathBuf>,

    /// Extra environment variables for the backend process.
    pub env: HashMap<String, String>,

    /// Address the backend listens on once started (e.g., "127.0.0.1:8000").
    pub address: String,

    /// Path probed for health checks.
    pub health_path: String,

    /// Path used to request graceful shutdown.
    pub shutdown_path: String,
}

impl Default for BackendConfig {
    fn default() -> Self {
        Self {
            command: "./start_backend.sh".to_string(),
            args: Vec::new(),
            working_dir: None,
            env: HashMap::new(),
            address: "127.0.0.1:8000".to_string(),
            health_path: "/health".to_string(),
            shutdown_path: "/shutdown".to_string(),
        }
    }
}

/// Idle-shutdown configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct IdleConfig {
    /// Duration of no proxied traffic after which the backend is shut
    /// down, in milliseconds.
    pub timeout_ms: u64,
}

impl Default for IdleConfig {
    fn default() -> Self {
        Self {
            timeout_ms: 2 * 60 * 1000,
        }
    }
}

/// Graceful-shutdown configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ShutdownConfig {
    /// Timeout for the call to the backend's shutdown endpoint, in seconds.
    pub graceful_request_timeout_secs: u64,

    /// How long to wait for the process to exit after a graceful
    /// acknowledgment before force-killing, in seconds.
    pub grace_period_secs: u64,
}

impl Default for ShutdownConfig {
    fn default() -> Self {
        Self {
            graceful_request_timeout_secs: 2,
            grace_period_secs: 3,
        }
    }
}

/// Health probe configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct HealthConfig {
    /// Probe timeout for status queries, in seconds.
    pub status_timeout_secs: u64,
}

impl Default for HealthConfig {
    fn default() -> Self {
        Self {
            status_timeout_secs: 5,
        }
    }
}

/// Timeout configuration for request handling.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct TimeoutConfig {
    /// Request timeout (total time for request/response) in seconds.
    pub request_secs: u64,
}

impl Default for TimeoutConfig {
    fn default() -> Self {
        Self { request_secs: 30 }
    }
}

/// Control-plane configuration.
#[derive(Debug, Clone, Deserialize, Serialize, Default)]
#[serde(default)]
pub struct ControlConfig {
    /// API key for authentication (Bearer token). Empty disables auth.
    pub api_key: String,
}

/// Security hardening configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct SecurityConfig {
    /// Maximum buffered request body size in bytes.
    pub max_body_size: usize,
}

impl Default for SecurityConfig {
    fn default() -> Self {
        Self {
            max_body_size: 2 * 1024 * 1024, // 2MB
        }
    }
}

/// Observability configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ObservabilityConfig {
    /// Log level (trace, debug, info, warn, error).
    pub log_level: String,

    /// Enable metrics endpoint.
    pub metrics_enabled: bool,

    /// Metrics endpoint bind address.
    pub metrics_address: String,
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
            metrics_enabled: false,
            metrics_address: "127.0.0.1:9090".to_string(),
        }
    }
}
