// crates/sqlserial-core/src/runtime/recording.rs
// ============================================================================
// Module: SQL Serial Recording Storage
// Description: In-memory storage that journals statements instead of running them.
// Purpose: Exercise the engine without a database in tests and demos.
// Dependencies: crate::{core, interfaces}
// ============================================================================

//! ## Overview
//! [`RecordingStorage`] appends every successfully executed statement to a
//! shared journal and answers each operation with a single `sequence` row
//! holding the 1-based execution count. Rules inject failures, panics, or a
//! pause on statements whose SQL contains a given needle. A failing batch
//! leaves nothing in the journal.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::sync::Arc;
use std::sync::Condvar;
use std::sync::Mutex;
use std::sync::MutexGuard;
use std::sync::PoisonError;
use std::time::Duration;
use std::time::Instant;

use crate::core::Operation;
use crate::core::RowSet;
use crate::core::SqlValue;
use crate::core::Statement;
use crate::interfaces::Storage;
use crate::interfaces::StorageError;
use crate::interfaces::StorageErrorKind;

// ============================================================================
// SECTION: Rules
// ============================================================================

/// What a matching rule does.
#[derive(Debug, Clone)]
enum RuleAction {
    /// Fail the operation with this kind.
    Fail(StorageErrorKind),
    /// Panic inside `execute`.
    Panic,
    /// Block until the control is released.
    Pause(PauseControl),
}

/// Statement matcher with an action.
#[derive(Debug, Clone)]
struct Rule {
    /// Substring matched against statement SQL.
    needle: String,
    /// Action on match.
    action: RuleAction,
}

/// Pause state shared between the storage and the test.
#[derive(Debug, Default)]
struct PauseState {
    /// Executions currently blocked.
    paused: usize,
    /// Whether blocked executions may continue.
    released: bool,
}

/// Handle that releases executions paused by [`RecordingStorage::pause_on`].
#[derive(Debug, Clone, Default)]
pub struct PauseControl {
    /// Shared pause state and wakeup.
    inner: Arc<(Mutex<PauseState>, Condvar)>,
}

impl PauseControl {
    /// Locks the pause state.
    fn state(&self) -> MutexGuard<'_, PauseState> {
        self.inner.0.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Blocks until at least one execution is paused or `timeout` elapses.
    #[must_use]
    pub fn wait_until_paused(&self, timeout: Duration) -> bool {
        let deadline = Instant::now() + timeout;
        let mut state = self.state();
        while state.paused == 0 {
            let remaining = deadline.saturating_duration_since(Instant::now());
            if remaining.is_zero() {
                return false;
            }
            state = self.inner.1.wait_timeout(state, remaining).unwrap_or_else(PoisonError::into_inner).0;
        }
        true
    }

    /// Lets every paused and future matching execution continue.
    pub fn release(&self) {
        self.state().released = true;
        self.inner.1.notify_all();
    }

    /// Blocks the calling execution until released.
    fn pause(&self) {
        let mut state = self.state();
        state.paused += 1;
        self.inner.1.notify_all();
        while !state.released {
            state = self.inner.1.wait(state).unwrap_or_else(PoisonError::into_inner);
        }
        state.paused -= 1;
    }
}

// ============================================================================
// SECTION: Storage
// ============================================================================

/// Journaling storage for tests.
///
/// Clones share the journal, so a test can keep one clone for inspection
/// while the engine owns another.
#[derive(Debug, Clone, Default)]
pub struct RecordingStorage {
    /// Statements executed so far, in order.
    journal: Arc<Mutex<Vec<Statement>>>,
    /// Operations executed so far.
    executions: Arc<Mutex<u64>>,
    /// Matching rules, first match wins.
    rules: Vec<Rule>,
    /// Sleep applied to every operation.
    delay: Option<Duration>,
}

impl RecordingStorage {
    /// Creates storage with no rules.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Fails any operation containing a statement whose SQL contains `needle`.
    #[must_use]
    pub fn fail_on(mut self, needle: impl Into<String>, kind: StorageErrorKind) -> Self {
        self.rules.push(Rule {
            needle: needle.into(),
            action: RuleAction::Fail(kind),
        });
        self
    }

    /// Panics on any statement whose SQL contains `needle`.
    #[must_use]
    pub fn panic_on(mut self, needle: impl Into<String>) -> Self {
        self.rules.push(Rule {
            needle: needle.into(),
            action: RuleAction::Panic,
        });
        self
    }

    /// Pauses on statements containing `needle` until the returned control
    /// is released.
    #[must_use]
    pub fn pause_on(mut self, needle: impl Into<String>) -> (Self, PauseControl) {
        let control = PauseControl::default();
        self.rules.push(Rule {
            needle: needle.into(),
            action: RuleAction::Pause(control.clone()),
        });
        (self, control)
    }

    /// Sleeps for `delay` before every operation.
    #[must_use]
    pub const fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    /// Returns the executed statements in order.
    #[must_use]
    pub fn executed(&self) -> Vec<Statement> {
        self.journal.lock().unwrap_or_else(PoisonError::into_inner).clone()
    }

    /// Returns the executed SQL text in order.
    #[must_use]
    pub fn executed_sql(&self) -> Vec<String> {
        self.executed().into_iter().map(|statement| statement.sql).collect()
    }
}

impl Storage for RecordingStorage {
    fn execute(&mut self, operation: &Operation) -> Result<RowSet, StorageError> {
        if let Some(delay) = self.delay {
            std::thread::sleep(delay);
        }
        let mut staged = Vec::with_capacity(operation.statements().len());
        for statement in operation.statements() {
            let rule = self.rules.iter().find(|rule| statement.sql.contains(&rule.needle));
            match rule.map(|rule| &rule.action) {
                Some(RuleAction::Fail(kind)) => {
                    return Err(StorageError::new(
                        *kind,
                        format!("injected failure for `{}`", statement.sql),
                    ));
                }
                Some(RuleAction::Panic) => injected_panic(&statement.sql),
                Some(RuleAction::Pause(control)) => control.pause(),
                None => {}
            }
            staged.push(statement.clone());
        }
        self.journal.lock().unwrap_or_else(PoisonError::into_inner).extend(staged);
        let mut executions = self.executions.lock().unwrap_or_else(PoisonError::into_inner);
        *executions += 1;
        let sequence = i64::try_from(*executions).unwrap_or(i64::MAX);
        Ok(RowSet::new(vec!["sequence".to_string()], vec![vec![SqlValue::Integer(sequence)]]))
    }

    fn label(&self) -> &str {
        "recording"
    }
}

/// Panics with a message naming `sql`.
#[allow(clippy::panic, reason = "Exercises executor panic capture.")]
fn injected_panic(sql: &str) -> ! {
    panic!("injected panic for `{sql}`");
}

// ============================================================================
// SECTION: Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::RecordingStorage;
    use crate::core::Operation;
    use crate::core::SqlValue;
    use crate::core::Statement;
    use crate::interfaces::Storage;
    use crate::interfaces::StorageErrorKind;

    #[test]
    fn failing_batch_records_nothing() {
        let mut storage = RecordingStorage::new().fail_on("Votes", StorageErrorKind::Constraint);
        let batch = Operation::batch(vec![
            Statement::new("UPDATE Users SET votes = 1"),
            Statement::new("INSERT INTO Votes VALUES (1)"),
        ]);
        let error = storage.execute(&batch).err().map(|err| err.kind);
        assert_eq!(error, Some(StorageErrorKind::Constraint));
        assert!(storage.executed().is_empty());
    }

    #[test]
    fn sequence_counts_successful_operations() {
        let mut storage = RecordingStorage::new();
        let observer = storage.clone();
        let first = storage.execute(&Statement::new("SELECT 1").into());
        let second = storage.execute(&Statement::new("SELECT 2").into());
        let sequence = |rows: Option<crate::core::RowSet>| {
            rows.and_then(|rows| rows.first().and_then(|row| row.values().first().cloned()))
        };
        assert_eq!(sequence(first.ok()), Some(SqlValue::Integer(1)));
        assert_eq!(sequence(second.ok()), Some(SqlValue::Integer(2)));
        assert_eq!(observer.executed_sql(), vec!["SELECT 1".to_string(), "SELECT 2".to_string()]);
    }
}
