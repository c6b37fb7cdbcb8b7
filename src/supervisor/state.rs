//! Backend process state machine.
//!
//! # States
//! - Absent: no child process exists
//! - Starting: spawn in progress
//! - Running: child process launched (responsiveness is a separate,
//!   ephemeral probe result)
//! - ShuttingDown: graceful or forced termination in progress
//!
//! # State Transitions
//! ```text
//! Absent → Starting → Running        (start request, spawn success)
//! Starting → Absent                  (spawn failure)
//! Running → ShuttingDown             (idle timeout or explicit stop)
//! ShuttingDown → Absent              (exit observer)
//! any → Absent                       (process exited unexpectedly)
//! ```
//!
//! # Design Decisions
//! - State is stored as an atomic so the proxy and status handlers can
//!   read it without locking
//! - Every write happens inside the lifecycle controller; the exit
//!   observer is the only path that reaches Absent
//! - A failed health probe never changes state

use std::sync::atomic::{AtomicU8, Ordering};

/// Lifecycle state of the supervised backend process.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum BackendState {
    Absent = 0,
    Starting = 1,
    Running = 2,
    ShuttingDown = 3,
}

impl BackendState {
    fn from_u8(value: u8) -> Self {
        match value {
            1 => BackendState::Starting,
            2 => BackendState::Running,
            3 => BackendState::ShuttingDown,
            _ => BackendState::Absent,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            BackendState::Absent => "absent",
            BackendState::Starting => "starting",
            BackendState::Running => "running",
            BackendState::ShuttingDown => "shutting-down",
        }
    }
}

impl std::fmt::Display for BackendState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Lock-free cell holding the current [`BackendState`].
#[derive(Debug)]
pub(crate) struct StateCell(AtomicU8);

impl StateCell {
    pub(crate) fn new(state: BackendState) -> Self {
        Self(AtomicU8::new(state as u8))
    }

    pub(crate) fn get(&self) -> BackendState {
        BackendState::from_u8(self.0.load(Ordering::Acquire))
    }

    pub(crate) fn set(&self, state: BackendState) {
        self.0.store(state as u8, Ordering::Release);
    }
}
