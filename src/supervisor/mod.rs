//! Backend supervision subsystem.
//!
//! # Data Flow
//! ```text
//! Control request / idle expiry
//!     → controller.rs (single-flight start/stop, status)
//!     → process.rs (spawn in process group, signal group)
//!     → exit observer (sole path back to Absent)
//!
//! Proxied traffic
//!     → controller.rs note_activity()
//!     → idle.rs (reschedule single-shot deadline)
//!     → expiry channel → controller shutdown routine
//! ```
//!
//! # Design Decisions
//! - One process handle, one timer, one owner: the controller
//! - Probe failures are status answers, never lifecycle transitions
//! - Graceful shutdown asks the backend first, force-kills the whole
//!   process group on timeout or refusal

pub mod controller;
pub mod idle;
pub mod process;
pub mod state;

pub use controller::{StatusReport, Supervisor, SupervisorError};
pub use idle::IdleTimer;
pub use state::BackendState;
