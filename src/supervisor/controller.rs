//! Lifecycle controller.
//!
//! # Responsibilities
//! - Own the single backend process handle and its inactivity timer
//! - Serialize start/stop transitions (single-flight)
//! - Run the graceful-then-forced shutdown sequence
//! - Answer status queries without mutating process state
//!
//! # Design Decisions
//! - All state mutation funnels through this controller; the proxy and
//!   status handlers only read state and invoke operations
//! - The exit observer is the sole path that clears the process slot,
//!   so an unresponsive backend is never conflated with a dead one
//! - Proxied traffic resets the inactivity timer; status polling does
//!   not, so pollers cannot keep the backend alive forever

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, Weak};
use std::time::Duration;

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tokio::process::Child;
use tokio::sync::{mpsc, watch};

use crate::config::SupervisorConfig;
use crate::health::{HealthProber, HealthStatus};
use crate::observability::metrics;
use crate::supervisor::idle::IdleTimer;
use crate::supervisor::process;
use crate::supervisor::state::{BackendState, StateCell};

/// Error surfaced to callers of a lifecycle operation.
#[derive(Debug, Error)]
pub enum SupervisorError {
    /// The backend process could not be spawned.
    #[error("failed to start backend process: {0}")]
    StartFailed(#[source] std::io::Error),
}

/// Answer to a status query.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StatusReport {
    pub active: bool,
    pub message: String,
}

/// Handle to the currently supervised process lifetime.
struct ProcessSlot {
    pid: u32,
    /// Pairs exit events with the process lifetime they belong to.
    generation: u64,
    /// Flips to `true` once the exit observer has recorded the exit.
    exited: watch::Receiver<bool>,
}

/// Owns the backend process lifecycle.
///
/// Created once at startup and shared (via `Arc`) with the proxy and
/// control handlers.
pub struct Supervisor {
    config: SupervisorConfig,
    state: StateCell,
    slot: Mutex<Option<ProcessSlot>>,
    /// Serializes start/stop transitions. Never held by the exit
    /// observer, which must always be able to record an exit.
    ops: tokio::sync::Mutex<()>,
    idle: IdleTimer,
    prober: HealthProber,
    client: reqwest::Client,
    shutdown_url: String,
    generation: AtomicU64,
}

impl Supervisor {
    /// Build a supervisor and spawn its idle-expiry watcher.
    ///
    /// Must be called from within a Tokio runtime.
    pub fn new(config: SupervisorConfig) -> Arc<Self> {
        let (idle, expired_rx) = IdleTimer::new();
        let prober = HealthProber::new(&config.backend);
        let shutdown_url = format!(
            "http://{}{}",
            config.backend.address, config.backend.shutdown_path
        );

        let supervisor = Arc::new(Self {
            config,
            state: StateCell::new(BackendState::Absent),
            slot: Mutex::new(None),
            ops: tokio::sync::Mutex::new(()),
            idle,
            prober,
            client: reqwest::Client::new(),
            shutdown_url,
            generation: AtomicU64::new(0),
        });

        Self::spawn_idle_watcher(Arc::downgrade(&supervisor), expired_rx);
        supervisor
    }

    /// Current lifecycle state. Lock-free; safe to call from any handler.
    pub fn state(&self) -> BackendState {
        self.state.get()
    }

    /// Pid of the currently supervised process, if one exists.
    pub fn current_pid(&self) -> Option<u32> {
        self.slot.lock().unwrap().as_ref().map(|slot| slot.pid)
    }

    /// Record proxied traffic: reschedules the idle shutdown.
    ///
    /// Status polling deliberately does not come through here.
    pub fn note_activity(&self) {
        if self.state.get() == BackendState::Running {
            self.idle.reset(self.idle_timeout());
        }
    }

    /// Start the backend if it is not already running.
    ///
    /// Single-flight: concurrent calls collapse onto one spawn; callers
    /// that lose the race get the current state back. Spawning is
    /// non-blocking, so this returns without waiting for the backend to
    /// become responsive.
    pub async fn request_start(self: &Arc<Self>) -> Result<BackendState, SupervisorError> {
        let _guard = self.ops.lock().await;

        let current = self.state.get();
        if current != BackendState::Absent {
            tracing::info!(state = %current, "backend already present, start request ignored");
            return Ok(current);
        }

        self.state.set(BackendState::Starting);
        tracing::info!(
            command = %self.config.backend.command,
            working_dir = ?self.config.backend.working_dir,
            "starting backend process"
        );

        let mut child = match process::spawn_backend(&self.config.backend) {
            Ok(child) => child,
            Err(e) => {
                self.state.set(BackendState::Absent);
                metrics::record_backend_state(BackendState::Absent);
                tracing::error!(error = %e, "failed to spawn backend process");
                return Err(SupervisorError::StartFailed(e));
            }
        };

        let pid = child.id().unwrap_or_default();
        let generation = self.generation.fetch_add(1, Ordering::Relaxed) + 1;

        process::pump_output(&mut child);

        let (exit_tx, exit_rx) = watch::channel(false);
        *self.slot.lock().unwrap() = Some(ProcessSlot {
            pid,
            generation,
            exited: exit_rx,
        });
        self.state.set(BackendState::Running);
        metrics::record_backend_state(BackendState::Running);

        // Starting counts as activity: a backend nobody talks to after
        // startup still gets shut down.
        self.idle.reset(self.idle_timeout());

        self.spawn_exit_observer(child, generation, exit_tx);

        tracing::info!(pid, generation, "backend process started");
        Ok(BackendState::Running)
    }

    /// Stop the backend: graceful shutdown first, force-kill fallback.
    ///
    /// No-op when no process exists. The inactivity timer is cancelled
    /// on every path out of this function.
    pub async fn request_stop(&self) {
        let _guard = self.ops.lock().await;

        if self.state.get() == BackendState::Absent {
            tracing::debug!("backend not running, stop request ignored");
            return;
        }

        self.state.set(BackendState::ShuttingDown);
        metrics::record_backend_state(BackendState::ShuttingDown);

        let slot = {
            let slot = self.slot.lock().unwrap();
            slot.as_ref().map(|s| (s.pid, s.exited.clone()))
        };
        let Some((pid, mut exited)) = slot else {
            // The exit observer won the race; nothing left to stop.
            self.idle.cancel();
            return;
        };

        tracing::info!(pid, "attempting graceful backend shutdown");

        let graceful_timeout =
            Duration::from_secs(self.config.shutdown.graceful_request_timeout_secs);
        let grace_period = Duration::from_secs(self.config.shutdown.grace_period_secs);

        let acknowledged = match self
            .client
            .post(&self.shutdown_url)
            .timeout(graceful_timeout)
            .send()
            .await
        {
            Ok(response) if response.status().is_success() => true,
            Ok(response) => {
                tracing::warn!(
                    status = %response.status(),
                    "backend shutdown endpoint returned an error"
                );
                false
            }
            Err(e) => {
                tracing::warn!(error = %e, "backend shutdown endpoint did not respond");
                false
            }
        };

        let mut force = !acknowledged;
        if acknowledged {
            match tokio::time::timeout(grace_period, exited.wait_for(|done| *done)).await {
                Ok(Ok(_)) => {
                    tracing::info!(pid, "backend exited gracefully");
                }
                Ok(Err(_)) | Err(_) => {
                    tracing::warn!(
                        pid,
                        grace_period_secs = self.config.shutdown.grace_period_secs,
                        "backend still alive after grace period, force killing"
                    );
                    force = true;
                }
            }
        }

        if force {
            match process::kill_group(pid) {
                Ok(()) => {
                    // The kill was delivered; give the exit observer a
                    // bounded window to record it.
                    let _ = tokio::time::timeout(grace_period, exited.wait_for(|done| *done))
                        .await;
                }
                Err(e) => {
                    // The supervisor cannot self-heal from this; state
                    // stays as-is until the exit observer reports.
                    tracing::error!(pid, error = %e, "failed to force kill backend process group");
                }
            }
        }

        self.idle.cancel();
    }

    /// Answer a status query.
    ///
    /// Probes the backend's health endpoint unless no process exists. A
    /// failed probe answers inactive for this query only; it never
    /// mutates lifecycle state.
    pub async fn query_status(&self) -> StatusReport {
        let state = self.state.get();
        if state == BackendState::Absent {
            return StatusReport {
                active: false,
                message: "backend process is not running".to_string(),
            };
        }

        let timeout = Duration::from_secs(self.config.health.status_timeout_secs);
        let status = self.prober.probe(timeout).await;
        metrics::record_probe(status);

        match status {
            HealthStatus::Responsive => StatusReport {
                active: true,
                message: "backend is active".to_string(),
            },
            HealthStatus::Unresponsive | HealthStatus::Unreachable => {
                tracing::warn!(state = %state, probe = %status, "health probe failed");
                StatusReport {
                    active: false,
                    message: "backend is not responsive or has crashed".to_string(),
                }
            }
        }
    }

    fn idle_timeout(&self) -> Duration {
        Duration::from_millis(self.config.idle.timeout_ms)
    }

    /// Watch the child until the OS reports its termination.
    ///
    /// This observer is the only code that clears the process slot and
    /// transitions state to Absent.
    fn spawn_exit_observer(
        self: &Arc<Self>,
        mut child: Child,
        generation: u64,
        exit_tx: watch::Sender<bool>,
    ) {
        let supervisor = Arc::clone(self);
        tokio::spawn(async move {
            match child.wait().await {
                Ok(status) => {
                    tracing::info!(generation, code = ?status.code(), "backend process exited");
                }
                Err(e) => {
                    tracing::error!(generation, error = %e, "failed to observe backend exit");
                }
            }

            supervisor.on_process_exit(generation);

            // Wake anyone waiting on this process lifetime.
            let _ = exit_tx.send(true);
        });
    }

    fn on_process_exit(&self, generation: u64) {
        let mut slot = self.slot.lock().unwrap();
        let current = slot
            .as_ref()
            .is_some_and(|active| active.generation == generation);

        if current {
            *slot = None;
            self.state.set(BackendState::Absent);
            metrics::record_backend_state(BackendState::Absent);
            self.idle.cancel();
        } else {
            // Stale observer from an earlier process lifetime.
            tracing::debug!(generation, "ignoring exit of superseded process");
        }
    }

    /// Wire idle-timer expirations to the shutdown routine.
    ///
    /// Holds only a weak reference so the watcher dies with the
    /// supervisor instead of keeping it alive.
    fn spawn_idle_watcher(supervisor: Weak<Self>, mut expired_rx: mpsc::UnboundedReceiver<()>) {
        tokio::spawn(async move {
            while expired_rx.recv().await.is_some() {
                let Some(supervisor) = supervisor.upgrade() else {
                    break;
                };
                tracing::info!("inactivity timeout expired, shutting backend down");
                supervisor.request_stop().await;
            }
        });
    }
}

impl Drop for Supervisor {
    fn drop(&mut self) {
        // Last-resort cleanup so a dropped supervisor never orphans its
        // child. The normal path is request_stop().
        if let Ok(slot) = self.slot.lock() {
            if let Some(current) = slot.as_ref() {
                let _ = process::kill_group(current.pid);
            }
        }
    }
}
