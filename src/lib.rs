//! On-demand backend supervisor and reverse proxy.
//!
//! Fronts a single backend HTTP service: starts it lazily on demand,
//! proxies traffic to it, probes its health, and shuts it down again
//! after a period of inactivity.

// Core subsystems
pub mod config;
pub mod control;
pub mod health;
pub mod http;
pub mod supervisor;

// Cross-cutting concerns
pub mod lifecycle;
pub mod observability;

pub use config::SupervisorConfig;
pub use http::HttpServer;
pub use lifecycle::Shutdown;
pub use supervisor::{BackendState, StatusReport, Supervisor};
