// crates/sqlserial-core/src/runtime/error.rs
// ============================================================================
// Module: SQL Serial Engine Errors
// Description: Error taxonomy for submission, execution, and lifecycle.
// Purpose: Separate operation outcomes from engine lifecycle failures.
// Dependencies: thiserror, crate::core, crate::interfaces
// ============================================================================

//! ## Overview
//! Storage failures are captured as operation *results*, never raised across
//! the executor thread. [`EngineError::user_message`] gives a short message
//! that is safe to show end users; the `Display` form carries operator detail.

// ============================================================================
// SECTION: Imports
// ============================================================================

use thiserror::Error;

use crate::core::OperationId;
use crate::core::RowError;
use crate::core::RowSet;
use crate::interfaces::StorageError;
use crate::interfaces::StorageErrorKind;

// ============================================================================
// SECTION: Errors
// ============================================================================

/// Result published for one operation.
pub type OperationOutcome = Result<RowSet, EngineError>;

/// Engine errors.
///
/// # Invariants
/// - Variants are stable for programmatic handling.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum EngineError {
    /// The engine stopped accepting work, or drained the operation at shutdown.
    #[error("engine is shutting down")]
    ShuttingDown,
    /// The storage connection rejected the operation.
    #[error("storage execution failed: {0}")]
    Storage(StorageError),
    /// Result rows could not be mapped into the requested record type.
    #[error("row decode failed: {0}")]
    Decode(RowError),
    /// The caller stopped waiting before the operation completed.
    #[error("timed out waiting for operation {0}")]
    TimedOut(OperationId),
    /// The result was signalled but is no longer in the table.
    #[error("result for operation {0} is unavailable")]
    ResultUnavailable(OperationId),
    /// The wait handle already backs another operation or was signalled.
    #[error("wait handle is already in use; submit each operation with a fresh handle")]
    HandleInUse,
    /// `start` was called on an engine that already started.
    #[error("engine already started")]
    AlreadyStarted,
    /// Engine configuration failed validation.
    #[error("invalid engine config: {0}")]
    InvalidConfig(String),
    /// A background thread could not be spawned.
    #[error("engine runtime error: {0}")]
    Runtime(String),
}

impl EngineError {
    /// Returns a short message that leaks no backend detail.
    #[must_use]
    pub const fn user_message(&self) -> &'static str {
        match self {
            Self::ShuttingDown => "The database is shutting down. Please try again later.",
            Self::Storage(error) => match error.kind {
                StorageErrorKind::Constraint => "That change conflicts with existing data.",
                StorageErrorKind::Busy => "The database is busy. Please try again.",
                _ => "The database could not complete that request.",
            },
            Self::Decode(_) => "The database returned data in an unexpected shape.",
            Self::TimedOut(_) => "The database did not answer in time.",
            Self::ResultUnavailable(_) => "The result of that request has expired.",
            Self::HandleInUse
            | Self::AlreadyStarted
            | Self::InvalidConfig(_)
            | Self::Runtime(_) => {
                "The database service is unavailable."
            }
        }
    }

    /// Returns true for storage execution failures.
    #[must_use]
    pub const fn is_storage(&self) -> bool {
        matches!(self, Self::Storage(_))
    }
}

impl From<StorageError> for EngineError {
    fn from(error: StorageError) -> Self {
        Self::Storage(error)
    }
}

impl From<RowError> for EngineError {
    fn from(error: RowError) -> Self {
        Self::Decode(error)
    }
}

// ============================================================================
// SECTION: Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::EngineError;
    use crate::interfaces::StorageError;

    #[test]
    fn user_message_hides_backend_detail() {
        let error = EngineError::from(StorageError::constraint("UNIQUE constraint failed: Votes.gseed"));
        assert!(!error.user_message().contains("Votes"));
        assert!(error.to_string().contains("Votes.gseed"));
    }

    #[test]
    fn shutting_down_has_stable_message() {
        assert_eq!(EngineError::ShuttingDown.to_string(), "engine is shutting down");
    }
}
