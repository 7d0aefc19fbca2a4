// crates/sqlserial-core/src/core/time.rs
// ============================================================================
// Module: SQL Serial Time Source
// Description: Clock abstraction used to stamp completed results.
// Purpose: Keep retention decisions replayable by letting hosts supply time.
// Dependencies: std
// ============================================================================

//! ## Overview
//! The engine stamps each completed result with the time reported by a
//! [`Clock`]. Production hosts use [`SystemClock`]; tests drive retention with
//! a [`ManualClock`] so sweeps never depend on wall-clock sleeps.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::sync::Mutex;
use std::sync::PoisonError;
use std::time::Duration;
use std::time::Instant;

// ============================================================================
// SECTION: Clock
// ============================================================================

/// Monotonic time source for completion stamps and sweep decisions.
pub trait Clock: Send + Sync + 'static {
    /// Returns the current instant.
    fn now(&self) -> Instant;
}

/// Clock backed by [`Instant::now`].
#[derive(Debug, Default, Clone, Copy)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> Instant {
        Instant::now()
    }
}

/// Clock that only moves when advanced explicitly.
///
/// # Invariants
/// - Time never moves backwards; [`ManualClock::advance`] only adds.
#[derive(Debug)]
pub struct ManualClock {
    /// Instant captured at construction.
    origin: Instant,
    /// Elapsed offset applied to `origin`.
    offset: Mutex<Duration>,
}

impl Default for ManualClock {
    fn default() -> Self {
        Self::new()
    }
}

impl ManualClock {
    /// Creates a manual clock anchored at the current instant.
    #[must_use]
    pub fn new() -> Self {
        Self {
            origin: Instant::now(),
            offset: Mutex::new(Duration::ZERO),
        }
    }

    /// Moves the clock forward by `delta`.
    pub fn advance(&self, delta: Duration) {
        let mut offset = self.offset.lock().unwrap_or_else(PoisonError::into_inner);
        *offset = offset.saturating_add(delta);
    }
}

impl Clock for ManualClock {
    fn now(&self) -> Instant {
        let offset = *self.offset.lock().unwrap_or_else(PoisonError::into_inner);
        self.origin + offset
    }
}

// ============================================================================
// SECTION: Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use super::Clock;
    use super::ManualClock;

    #[test]
    fn manual_clock_advances_only_when_told() {
        let clock = ManualClock::new();
        let start = clock.now();
        assert_eq!(clock.now(), start);
        clock.advance(Duration::from_secs(5));
        assert_eq!(clock.now().duration_since(start), Duration::from_secs(5));
    }
}
