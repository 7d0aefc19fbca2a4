// crates/sqlserial-core/src/runtime/wait.rs
// ============================================================================
// Module: SQL Serial Wait Handles
// Description: Caller-owned completion signal for one submitted operation.
// Purpose: Block a caller until the executor publishes its result.
// Dependencies: std
// ============================================================================

//! ## Overview
//! A [`WaitHandle`] is a latched condition: once signalled it stays
//! signalled, so a caller that starts waiting after the executor already
//! finished returns immediately instead of missing the wakeup. Clones share
//! the same latch, which lets the engine keep one copy in the result table
//! while the caller waits on another. A handle backs at most one operation:
//! the engine claims it on submission and refuses a handle that is already
//! claimed or signalled.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::sync::Arc;
use std::sync::Condvar;
use std::sync::Mutex;
use std::sync::PoisonError;
use std::sync::atomic::AtomicBool;
use std::sync::atomic::Ordering;
use std::time::Duration;
use std::time::Instant;

// ============================================================================
// SECTION: Wait Handle
// ============================================================================

/// Shared latch state.
#[derive(Debug, Default)]
struct Latch {
    /// Whether the executor has signalled.
    signalled: Mutex<bool>,
    /// Wakes waiters when `signalled` flips.
    condvar: Condvar,
    /// Set once an operation claims the handle.
    claimed: AtomicBool,
}

/// One-shot completion signal shared between a caller and the executor.
///
/// # Invariants
/// - Transitions from unsignalled to signalled at most once.
/// - Any number of threads may wait; all are released by one signal.
#[derive(Debug, Clone, Default)]
pub struct WaitHandle {
    /// Latch shared by all clones.
    latch: Arc<Latch>,
}

impl WaitHandle {
    /// Creates an unsignalled handle.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns true once the executor has signalled.
    #[must_use]
    pub fn is_signalled(&self) -> bool {
        *self.latch.signalled.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Blocks until signalled.
    pub fn wait(&self) {
        let guard = self.latch.signalled.lock().unwrap_or_else(PoisonError::into_inner);
        let _guard = self
            .latch
            .condvar
            .wait_while(guard, |signalled| !*signalled)
            .unwrap_or_else(PoisonError::into_inner);
    }

    /// Blocks until signalled or `timeout` elapses; returns whether signalled.
    #[must_use]
    pub fn wait_timeout(&self, timeout: Duration) -> bool {
        let deadline = Instant::now().checked_add(timeout);
        let mut guard = self.latch.signalled.lock().unwrap_or_else(PoisonError::into_inner);
        while !*guard {
            let remaining = match deadline {
                Some(deadline) => deadline.saturating_duration_since(Instant::now()),
                None => timeout,
            };
            if remaining.is_zero() {
                return false;
            }
            let (next, _) = self
                .latch
                .condvar
                .wait_timeout(guard, remaining)
                .unwrap_or_else(PoisonError::into_inner);
            guard = next;
        }
        true
    }

    /// Claims the handle for one operation; false if already claimed or signalled.
    pub(crate) fn claim(&self) -> bool {
        !self.is_signalled() && !self.latch.claimed.swap(true, Ordering::AcqRel)
    }

    /// Latches the handle and wakes every waiter.
    pub(crate) fn signal(&self) {
        let mut signalled = self.latch.signalled.lock().unwrap_or_else(PoisonError::into_inner);
        *signalled = true;
        self.latch.condvar.notify_all();
    }
}

// ============================================================================
// SECTION: Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use std::thread;
    use std::time::Duration;

    use super::WaitHandle;

    #[test]
    fn signal_before_wait_is_not_lost() {
        let handle = WaitHandle::new();
        handle.signal();
        handle.wait();
        assert!(handle.is_signalled());
    }

    #[test]
    fn signal_releases_every_clone() {
        let handle = WaitHandle::new();
        let waiters: Vec<_> = (0 .. 4)
            .map(|_| {
                let handle = handle.clone();
                thread::spawn(move || handle.wait_timeout(Duration::from_secs(5)))
            })
            .collect();
        handle.signal();
        for waiter in waiters {
            assert_eq!(waiter.join().ok(), Some(true));
        }
    }

    #[test]
    fn handle_is_claimed_once() {
        let handle = WaitHandle::new();
        assert!(handle.claim());
        assert!(!handle.clone().claim());
    }

    #[test]
    fn signalled_handle_cannot_be_claimed() {
        let handle = WaitHandle::new();
        handle.signal();
        assert!(!handle.claim());
    }

    #[test]
    fn wait_timeout_reports_expiry() {
        let handle = WaitHandle::new();
        assert!(!handle.wait_timeout(Duration::from_millis(10)));
        assert!(!handle.is_signalled());
    }
}
