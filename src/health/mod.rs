//! Health checking subsystem.
//!
//! A single prober classifies one request against the backend's health
//! endpoint into a status value. There is no periodic monitor and no
//! health state machine: probes answer the current status query and
//! nothing else. Only an observed process exit changes lifecycle state.

pub mod probe;

pub use probe::{HealthProber, HealthStatus};
