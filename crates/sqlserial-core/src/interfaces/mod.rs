// crates/sqlserial-core/src/interfaces/mod.rs
// ============================================================================
// Module: SQL Serial Interfaces
// Description: Backend-agnostic storage connection interface.
// Purpose: Define the contract the executor drives on its single connection.
// Dependencies: thiserror, crate::core
// ============================================================================

//! ## Overview
//! A [`Storage`] is the one connection the executor owns. It is driven from
//! exactly one thread and never shared, so implementations may wrap handles
//! that are unsafe for concurrent use. Implementations report statement
//! failures as [`StorageError`] values; the executor turns them into
//! per-operation results.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::fmt;

use thiserror::Error;

use crate::core::Operation;
use crate::core::RowSet;

// ============================================================================
// SECTION: Storage Errors
// ============================================================================

/// Classification of storage failures.
///
/// # Invariants
/// - Variants are stable for programmatic handling.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StorageErrorKind {
    /// Constraint violation (unique, foreign key, not null, check).
    Constraint,
    /// Malformed statement or unknown table/column.
    Syntax,
    /// Backend busy or locked by another process.
    Busy,
    /// I/O or file-level failure.
    Io,
    /// Parameter binding or type conversion failure.
    Binding,
    /// Backend panicked while executing the operation.
    Panicked,
    /// Any other backend failure.
    Other,
}

impl StorageErrorKind {
    /// Returns a stable label for the kind.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Constraint => "constraint",
            Self::Syntax => "syntax",
            Self::Busy => "busy",
            Self::Io => "io",
            Self::Binding => "binding",
            Self::Panicked => "panicked",
            Self::Other => "other",
        }
    }
}

impl fmt::Display for StorageErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Failure raised while executing an operation's statements.
///
/// # Invariants
/// - `message` is backend detail for operators; it is not meant for end users.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[error("storage {kind} error: {message}")]
pub struct StorageError {
    /// Failure classification.
    pub kind: StorageErrorKind,
    /// Backend-provided detail.
    pub message: String,
}

impl StorageError {
    /// Creates a storage error.
    #[must_use]
    pub fn new(kind: StorageErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
        }
    }

    /// Creates a constraint violation error.
    #[must_use]
    pub fn constraint(message: impl Into<String>) -> Self {
        Self::new(StorageErrorKind::Constraint, message)
    }

    /// Creates an unclassified backend error.
    #[must_use]
    pub fn other(message: impl Into<String>) -> Self {
        Self::new(StorageErrorKind::Other, message)
    }
}

// ============================================================================
// SECTION: Storage Connection
// ============================================================================

/// The single storage connection driven by the executor.
///
/// # Invariants
/// - `execute` runs every statement of the operation, in order, as one unit
///   and commits before returning `Ok`.
/// - On `Err`, no partial effects of the operation remain visible.
pub trait Storage: Send + 'static {
    /// Executes `operation` and returns the rows of its final statement.
    ///
    /// # Errors
    ///
    /// Returns [`StorageError`] when any statement fails; the whole operation
    /// is abandoned.
    fn execute(&mut self, operation: &Operation) -> Result<RowSet, StorageError>;

    /// Returns a short label for logs (for example the database path).
    fn label(&self) -> &str {
        "storage"
    }
}

impl<S: Storage + ?Sized> Storage for Box<S> {
    fn execute(&mut self, operation: &Operation) -> Result<RowSet, StorageError> {
        (**self).execute(operation)
    }

    fn label(&self) -> &str {
        (**self).label()
    }
}
