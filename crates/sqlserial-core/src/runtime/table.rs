// crates/sqlserial-core/src/runtime/table.rs
// ============================================================================
// Module: SQL Serial Result Table
// Description: Operation id to pending/completed result mapping.
// Purpose: Correlate executor output with the caller that submitted the work.
// Dependencies: crate::runtime::{rwlock, wait, error}, tracing
// ============================================================================

//! ## Overview
//! The table is the only structure shared by callers, the executor, and the
//! sweeper. Every access goes through [`WriterPriorityLock`]. Callers only
//! read; the executor is the only writer of `Completed`; the sweeper is the
//! only remover.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::collections::HashMap;
use std::time::Duration;
use std::time::Instant;

use tracing::warn;

use crate::core::OperationId;
use crate::runtime::error::OperationOutcome;
use crate::runtime::rwlock::WriterPriorityLock;
use crate::runtime::wait::WaitHandle;

// ============================================================================
// SECTION: Entries
// ============================================================================

/// State of one operation in the table.
#[derive(Debug, Clone)]
pub enum ResultEntry {
    /// Enqueued and not yet executed.
    Pending(WaitHandle),
    /// Executed (or drained at shutdown).
    Completed {
        /// Rows or the captured error.
        outcome: OperationOutcome,
        /// When the executor published the outcome.
        completed_at: Instant,
    },
}

/// Entry counts by state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct TableCounts {
    /// Entries awaiting execution.
    pub pending: usize,
    /// Entries holding a published outcome.
    pub completed: usize,
}

// ============================================================================
// SECTION: Table
// ============================================================================

/// Shared map of operation results.
///
/// # Invariants
/// - An entry moves `Pending -> Completed` at most once.
/// - `Pending` entries are never removed by a sweep.
#[derive(Debug, Default)]
pub struct ResultTable {
    /// Entries guarded by the writer-priority lock.
    entries: WriterPriorityLock<HashMap<OperationId, ResultEntry>>,
}

impl ResultTable {
    /// Creates an empty table.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Records a freshly submitted operation.
    pub(crate) fn insert_pending(&self, id: OperationId, handle: WaitHandle) {
        self.entries.write().insert(id, ResultEntry::Pending(handle));
    }

    /// Publishes `outcome` for `id` and returns the waiter to signal.
    ///
    /// Returns `None` when `id` is unknown or already completed; the table is
    /// left untouched in that case.
    pub(crate) fn complete(
        &self,
        id: OperationId,
        outcome: OperationOutcome,
        completed_at: Instant,
    ) -> Option<WaitHandle> {
        let handle = match self.entries.read().get(&id) {
            Some(ResultEntry::Pending(handle)) => handle.clone(),
            Some(ResultEntry::Completed {
                ..
            }) => {
                warn!(operation_id = %id, "operation already completed; keeping first outcome");
                return None;
            }
            None => {
                warn!(operation_id = %id, "completed operation has no table entry");
                return None;
            }
        };
        self.entries.write().insert(
            id,
            ResultEntry::Completed {
                outcome,
                completed_at,
            },
        );
        Some(handle)
    }

    /// Publishes `outcome` for every id in `ids` under one write scope.
    pub(crate) fn complete_many(
        &self,
        ids: &[OperationId],
        outcome: &OperationOutcome,
        completed_at: Instant,
    ) -> Vec<WaitHandle> {
        let mut entries = self.entries.write();
        let mut handles = Vec::with_capacity(ids.len());
        for id in ids {
            if let Some(ResultEntry::Pending(handle)) = entries.get(id) {
                handles.push(handle.clone());
                entries.insert(
                    *id,
                    ResultEntry::Completed {
                        outcome: outcome.clone(),
                        completed_at,
                    },
                );
            }
        }
        handles
    }

    /// Completes every pending entry with `outcome` under one write scope.
    pub(crate) fn complete_all_pending(
        &self,
        outcome: &OperationOutcome,
        completed_at: Instant,
    ) -> Vec<WaitHandle> {
        let mut entries = self.entries.write();
        let mut handles = Vec::new();
        for entry in entries.values_mut() {
            if let ResultEntry::Pending(handle) = entry {
                handles.push(handle.clone());
                *entry = ResultEntry::Completed {
                    outcome: outcome.clone(),
                    completed_at,
                };
            }
        }
        handles
    }

    /// Returns the outcome for `id` once completed.
    ///
    /// Pending and unknown ids both return `None`.
    #[must_use]
    pub fn get(&self, id: OperationId) -> Option<OperationOutcome> {
        match self.entries.read().get(&id) {
            Some(ResultEntry::Completed {
                outcome, ..
            }) => Some(outcome.clone()),
            Some(ResultEntry::Pending(_)) | None => None,
        }
    }

    /// Returns true while `id` is waiting for execution.
    #[must_use]
    pub fn is_pending(&self, id: OperationId) -> bool {
        matches!(self.entries.read().get(&id), Some(ResultEntry::Pending(_)))
    }

    /// Returns true when `id` has any entry.
    #[must_use]
    pub fn contains(&self, id: OperationId) -> bool {
        self.entries.read().contains_key(&id)
    }

    /// Removes completed entries older than `retention` at `now`.
    ///
    /// Returns the number of removed entries.
    pub(crate) fn sweep(&self, now: Instant, retention: Duration) -> usize {
        let mut entries = self.entries.write();
        let before = entries.len();
        entries.retain(|_, entry| match entry {
            ResultEntry::Pending(_) => true,
            ResultEntry::Completed {
                completed_at, ..
            } => now.saturating_duration_since(*completed_at) <= retention,
        });
        before - entries.len()
    }

    /// Returns entry counts by state.
    #[must_use]
    pub fn counts(&self) -> TableCounts {
        let entries = self.entries.read();
        entries.values().fold(TableCounts::default(), |mut counts, entry| {
            match entry {
                ResultEntry::Pending(_) => counts.pending += 1,
                ResultEntry::Completed {
                    ..
                } => counts.completed += 1,
            }
            counts
        })
    }
}

// ============================================================================
// SECTION: Tests
// ============================================================================
