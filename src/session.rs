//! Shared session state
//!
//! One instance per accepted connection, shared between the receive task,
//! the send loop, and the connection manager. The atomics make flag writes
//! visible across tasks; the notify wakes the send loop out of its blocking
//! terminal read the moment the session stops.

use std::sync::atomic::{AtomicBool, Ordering};

use tokio::sync::Notify;

/// Per-connection flags mediating shutdown and restart decisions.
#[derive(Debug, Default)]
pub struct SessionState {
    /// Receive-loop permission; cleared on disconnect, error, or quit.
    running: AtomicBool,
    /// Tells the connection manager to loop back to accept a new client.
    restart_requested: AtomicBool,
    /// One-shot "session stopped" signal from the receive task to the send
    /// loop.
    stopped: Notify,
}

impl SessionState {
    /// Fresh state for a new accept cycle; both flags start cleared.
    pub fn new() -> Self {
        Self::default()
    }

    /// Grants the receive loop permission to run.
    pub fn begin(&self) {
        self.running.store(true, Ordering::SeqCst);
    }

    pub fn is_running(&self) -> bool {
        self.running.load(Ordering::SeqCst)
    }

    /// Clears the running flag and wakes the send loop. The store is
    /// sequenced before the wakeup, so the send loop never observes the
    /// notification without also observing `running == false`.
    pub fn stop_and_notify(&self) {
        self.running.store(false, Ordering::SeqCst);
        self.stopped.notify_one();
    }

    pub fn request_restart(&self) {
        self.restart_requested.store(true, Ordering::SeqCst);
    }

    pub fn restart_requested(&self) -> bool {
        self.restart_requested.load(Ordering::SeqCst)
    }

    /// Resolves once the session has stopped. `notify_one` stores a permit,
    /// so a stop that lands before this call is not missed.
    pub async fn stopped(&self) {
        self.stopped.notified().await;
    }
}
