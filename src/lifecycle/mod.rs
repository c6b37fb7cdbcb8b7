//! Lifecycle management subsystem.
//!
//! # Data Flow
//! ```text
//! SIGTERM/SIGINT (signals.rs)
//!     → stop the supervised backend (bounded by the grace period)
//!     → shutdown.rs broadcast
//!     → server drains and exits
//! ```
//!
//! # Design Decisions
//! - The shutdown sequence is an explicit awaited future, not a
//!   fire-and-forget callback chain
//! - The backend is stopped before the supervisor exits

pub mod shutdown;
pub mod signals;

pub use shutdown::Shutdown;
