// crates/sqlserial-core/src/runtime/sweeper.rs
// ============================================================================
// Module: SQL Serial Sweeper
// Description: Periodic removal of unread completed results.
// Purpose: Bound result-table memory when callers never collect.
// Dependencies: crate::runtime::engine, tracing
// ============================================================================

//! ## Overview
//! The sweeper wakes every `interval`, removes completed entries older than
//! `retention`, and goes back to sleep. Pending entries are never touched.
//! Stopping drops the control channel, which wakes the thread immediately.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::io;
use std::sync::Arc;
use std::sync::mpsc;
use std::sync::mpsc::RecvTimeoutError;
use std::thread;
use std::thread::JoinHandle;
use std::time::Duration;

use tracing::debug;
use tracing::warn;

use crate::runtime::engine::EngineShared;

// ============================================================================
// SECTION: Handle
// ============================================================================

/// Running sweeper thread.
pub(crate) struct SweeperHandle {
    /// Dropping the sender stops the loop.
    stop: mpsc::Sender<()>,
    /// Sweeper thread.
    thread: JoinHandle<()>,
}

impl SweeperHandle {
    /// Spawns the sweeper thread.
    pub(crate) fn spawn(
        shared: Arc<EngineShared>,
        name: String,
        interval: Duration,
        retention: Duration,
    ) -> io::Result<Self> {
        let (stop, stop_rx) = mpsc::channel::<()>();
        let thread = thread::Builder::new().name(name).spawn(move || {
            debug!(interval_ms = interval.as_millis(), "sweeper started");
            loop {
                match stop_rx.recv_timeout(interval) {
                    Err(RecvTimeoutError::Timeout) => {
                        shared.sweep(retention);
                    }
                    Ok(()) | Err(RecvTimeoutError::Disconnected) => break,
                }
            }
            debug!("sweeper stopped");
        })?;
        Ok(Self {
            stop,
            thread,
        })
    }

    /// Stops the sweeper and waits for it to exit.
    pub(crate) fn stop(self) {
        drop(self.stop);
        if self.thread.join().is_err() {
            warn!("sweeper thread panicked");
        }
    }
}
