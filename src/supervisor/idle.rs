//! Inactivity timer.
//!
//! A resettable single-shot deadline. When the deadline elapses the
//! timer sends exactly one message on its expiry channel and goes inert
//! until the next `reset`.
//!
//! # Concurrency
//! Resets and firings are serialized through one lock and a generation
//! counter: a reset that lands strictly before firing cancels the
//! pending fire; one that lands after is a fresh schedule. The expiry
//! callback can never run twice for a single deadline.

use std::sync::{Arc, Mutex};
use std::time::Duration;

use tokio::sync::mpsc;
use tokio::task::JoinHandle;

#[derive(Default)]
struct TimerInner {
    /// Bumped on every reset/cancel; a pending sleep only fires if its
    /// generation is still current when it wakes.
    generation: u64,
    pending: Option<JoinHandle<()>>,
}

/// Resettable single-shot inactivity timer.
pub struct IdleTimer {
    inner: Arc<Mutex<TimerInner>>,
    expired_tx: mpsc::UnboundedSender<()>,
}

impl IdleTimer {
    /// Create a timer and the channel its expirations are delivered on.
    pub fn new() -> (Self, mpsc::UnboundedReceiver<()>) {
        let (expired_tx, expired_rx) = mpsc::unbounded_channel();
        let timer = Self {
            inner: Arc::new(Mutex::new(TimerInner::default())),
            expired_tx,
        };
        (timer, expired_rx)
    }

    /// Cancel any pending deadline and schedule a new one.
    pub fn reset(&self, timeout: Duration) {
        let mut inner = self.inner.lock().unwrap();
        inner.generation = inner.generation.wrapping_add(1);
        let generation = inner.generation;

        if let Some(pending) = inner.pending.take() {
            pending.abort();
        }

        let shared = Arc::clone(&self.inner);
        let expired_tx = self.expired_tx.clone();
        inner.pending = Some(tokio::spawn(async move {
            tokio::time::sleep(timeout).await;

            // Fire only if no reset/cancel raced ahead of the wakeup.
            let fire = {
                let mut inner = shared.lock().unwrap();
                if inner.generation == generation {
                    inner.pending = None;
                    true
                } else {
                    false
                }
            };

            if fire {
                let _ = expired_tx.send(());
            }
        }));
    }

    /// Clear the pending deadline. No effect if none exists.
    pub fn cancel(&self) {
        let mut inner = self.inner.lock().unwrap();
        inner.generation = inner.generation.wrapping_add(1);
        if let Some(pending) = inner.pending.take() {
            pending.abort();
        }
    }
}
