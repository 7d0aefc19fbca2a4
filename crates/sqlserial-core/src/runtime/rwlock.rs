// crates/sqlserial-core/src/runtime/rwlock.rs
// ============================================================================
// Module: SQL Serial Writer-Priority Lock
// Description: Reader/writer lock where queued writers block new readers.
// Purpose: Guard the result table without starving the executor's writes.
// Dependencies: std
// ============================================================================

//! ## Overview
//! [`PriorityGate`] is the bare reader/writer protocol: any number of readers
//! or exactly one writer. As soon as one writer is waiting, readers that
//! arrive afterwards block until every waiting writer has had its turn.
//! [`WriterPriorityLock`] pairs the gate with the data it protects and hands
//! out RAII guards.
//!
//! Write acquisition is not reentrant: a thread that acquires the write side
//! twice without releasing deadlocks. Releasing a side that is not held is a
//! programmer error and panics.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::ops::Deref;
use std::ops::DerefMut;
use std::sync::Condvar;
use std::sync::Mutex;
use std::sync::MutexGuard;
use std::sync::PoisonError;
use std::sync::RwLock;
use std::sync::RwLockReadGuard;
use std::sync::RwLockWriteGuard;

// ============================================================================
// SECTION: Gate
// ============================================================================

/// Counters behind the gate.
#[derive(Debug, Default)]
struct GateState {
    /// Readers currently holding the gate.
    active_readers: usize,
    /// Writers blocked in `acquire_write`.
    waiting_writers: usize,
    /// Whether a writer currently holds the gate.
    writer_active: bool,
}

/// Point-in-time view of gate occupancy.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct GateSnapshot {
    /// Readers currently holding the gate.
    pub active_readers: usize,
    /// Writers waiting for the gate.
    pub waiting_writers: usize,
    /// Whether a writer holds the gate.
    pub writer_active: bool,
}

/// Writer-priority reader/writer gate.
///
/// # Invariants
/// - `writer_active` implies `active_readers == 0`.
/// - No reader is admitted while `waiting_writers > 0` or `writer_active`.
#[derive(Debug, Default)]
pub struct PriorityGate {
    /// Shared counters.
    state: Mutex<GateState>,
    /// Signalled when readers may be admitted.
    readers_ready: Condvar,
    /// Signalled when a writer may be admitted.
    writers_ready: Condvar,
}

impl PriorityGate {
    /// Creates an unlocked gate.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Locks the counters, recovering from poisoning.
    fn state(&self) -> MutexGuard<'_, GateState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Blocks until a shared hold is granted.
    pub fn acquire_read(&self) {
        let guard = self.state();
        let mut state = self
            .readers_ready
            .wait_while(guard, |state| state.writer_active || state.waiting_writers > 0)
            .unwrap_or_else(PoisonError::into_inner);
        state.active_readers += 1;
    }

    /// Releases a shared hold.
    ///
    /// # Panics
    ///
    /// Panics when no read hold is outstanding.
    pub fn release_read(&self) {
        let mut state = self.state();
        assert!(state.active_readers > 0, "release_read called without a read hold");
        state.active_readers -= 1;
        if state.active_readers == 0 && state.waiting_writers > 0 {
            self.writers_ready.notify_one();
        }
    }

    /// Blocks until the exclusive hold is granted.
    pub fn acquire_write(&self) {
        let mut state = self.state();
        state.waiting_writers += 1;
        let mut state = self
            .writers_ready
            .wait_while(state, |state| state.writer_active || state.active_readers > 0)
            .unwrap_or_else(PoisonError::into_inner);
        state.waiting_writers -= 1;
        state.writer_active = true;
    }

    /// Releases the exclusive hold.
    ///
    /// # Panics
    ///
    /// Panics when the write hold is not outstanding.
    pub fn release_write(&self) {
        let mut state = self.state();
        assert!(state.writer_active, "release_write called without the write hold");
        state.writer_active = false;
        if state.waiting_writers > 0 {
            self.writers_ready.notify_one();
        } else {
            self.readers_ready.notify_all();
        }
    }

    /// Acquires a shared hold released when the token drops.
    #[must_use]
    pub fn read(&self) -> ReadToken<'_> {
        self.acquire_read();
        ReadToken {
            gate: self,
        }
    }

    /// Acquires the exclusive hold released when the token drops.
    #[must_use]
    pub fn write(&self) -> WriteToken<'_> {
        self.acquire_write();
        WriteToken {
            gate: self,
        }
    }

    /// Returns current occupancy counters.
    #[must_use]
    pub fn snapshot(&self) -> GateSnapshot {
        let state = self.state();
        GateSnapshot {
            active_readers: state.active_readers,
            waiting_writers: state.waiting_writers,
            writer_active: state.writer_active,
        }
    }
}

/// Shared hold on a [`PriorityGate`].
#[derive(Debug)]
pub struct ReadToken<'a> {
    /// Gate released on drop.
    gate: &'a PriorityGate,
}

impl Drop for ReadToken<'_> {
    fn drop(&mut self) {
        self.gate.release_read();
    }
}

/// Exclusive hold on a [`PriorityGate`].
#[derive(Debug)]
pub struct WriteToken<'a> {
    /// Gate released on drop.
    gate: &'a PriorityGate,
}

impl Drop for WriteToken<'_> {
    fn drop(&mut self) {
        self.gate.release_write();
    }
}

// ============================================================================
// SECTION: Data Lock
// ============================================================================

/// Writer-priority lock around a value.
///
/// # Invariants
/// - The inner `RwLock` is only touched while the matching gate side is held,
///   so it never arbitrates between readers and writers itself.
#[derive(Debug, Default)]
pub struct WriterPriorityLock<T> {
    /// Admission policy.
    gate: PriorityGate,
    /// Protected value.
    data: RwLock<T>,
}

impl<T> WriterPriorityLock<T> {
    /// Wraps `value`.
    #[must_use]
    pub fn new(value: T) -> Self {
        Self {
            gate: PriorityGate::new(),
            data: RwLock::new(value),
        }
    }

    /// Acquires shared access.
    #[must_use]
    pub fn read(&self) -> ReadGuard<'_, T> {
        let token = self.gate.read();
        let inner = self.data.read().unwrap_or_else(PoisonError::into_inner);
        ReadGuard {
            inner,
            _token: token,
        }
    }

    /// Acquires exclusive access.
    #[must_use]
    pub fn write(&self) -> WriteGuard<'_, T> {
        let token = self.gate.write();
        let inner = self.data.write().unwrap_or_else(PoisonError::into_inner);
        WriteGuard {
            inner,
            _token: token,
        }
    }

    /// Returns gate occupancy counters.
    #[must_use]
    pub fn snapshot(&self) -> GateSnapshot {
        self.gate.snapshot()
    }

    /// Consumes the lock and returns the value.
    pub fn into_inner(self) -> T {
        self.data.into_inner().unwrap_or_else(PoisonError::into_inner)
    }
}

/// Shared access guard.
///
/// Field order matters: the data guard drops before the gate is released.
#[derive(Debug)]
pub struct ReadGuard<'a, T> {
    /// Borrow of the protected value.
    inner: RwLockReadGuard<'a, T>,
    /// Gate hold released after `inner`.
    _token: ReadToken<'a>,
}

impl<T> Deref for ReadGuard<'_, T> {
    type Target = T;

    fn deref(&self) -> &T {
        &self.inner
    }
}

/// Exclusive access guard.
///
/// Field order matters: the data guard drops before the gate is released.
#[derive(Debug)]
pub struct WriteGuard<'a, T> {
    /// Mutable borrow of the protected value.
    inner: RwLockWriteGuard<'a, T>,
    /// Gate hold released after `inner`.
    _token: WriteToken<'a>,
}

impl<T> Deref for WriteGuard<'_, T> {
    type Target = T;

    fn deref(&self) -> &T {
        &self.inner
    }
}

impl<T> DerefMut for WriteGuard<'_, T> {
    fn deref_mut(&mut self) -> &mut T {
        &mut self.inner
    }
}

// ============================================================================
// SECTION: Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use std::sync::Arc;
    use std::sync::Barrier;
    use std::thread;

    use super::PriorityGate;
    use super::WriterPriorityLock;

    #[test]
    fn readers_share_the_gate() {
        let gate = Arc::new(PriorityGate::new());
        let barrier = Arc::new(Barrier::new(3));
        let handles: Vec<_> = (0 .. 3)
            .map(|_| {
                let gate = Arc::clone(&gate);
                let barrier = Arc::clone(&barrier);
                thread::spawn(move || {
                    let _token = gate.read();
                    // All three must be inside at once to pass the barrier.
                    barrier.wait();
                })
            })
            .collect();
        for handle in handles {
            assert!(handle.join().is_ok());
        }
        assert_eq!(gate.snapshot().active_readers, 0);
    }

    #[test]
    fn writes_are_visible_to_later_readers() {
        let lock = WriterPriorityLock::new(Vec::new());
        lock.write().push(1);
        lock.write().push(2);
        assert_eq!(*lock.read(), vec![1, 2]);
        assert_eq!(lock.into_inner(), vec![1, 2]);
    }

    #[test]
    fn write_excludes_concurrent_increments() {
        let lock = Arc::new(WriterPriorityLock::new(0_u64));
        let handles: Vec<_> = (0 .. 8)
            .map(|_| {
                let lock = Arc::clone(&lock);
                thread::spawn(move || {
                    for _ in 0 .. 1_000 {
                        let mut guard = lock.write();
                        let next = *guard + 1;
                        *guard = next;
                    }
                })
            })
            .collect();
        for handle in handles {
            assert!(handle.join().is_ok());
        }
        assert_eq!(*lock.read(), 8_000);
    }

    #[test]
    fn guard_release_resets_counters() {
        let lock = WriterPriorityLock::new(());
        {
            let _write = lock.write();
            assert!(lock.snapshot().writer_active);
        }
        {
            let _first = lock.read();
            let _second = lock.read();
            assert_eq!(lock.snapshot().active_readers, 2);
        }
        let snapshot = lock.snapshot();
        assert_eq!(snapshot.active_readers, 0);
        assert!(!snapshot.writer_active);
    }

    #[test]
    #[should_panic(expected = "release_read called without a read hold")]
    fn releasing_unheld_read_panics() {
        PriorityGate::new().release_read();
    }

    #[test]
    #[should_panic(expected = "release_write called without the write hold")]
    fn releasing_unheld_write_panics() {
        PriorityGate::new().release_write();
    }
}
