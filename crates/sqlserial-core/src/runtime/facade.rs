// crates/sqlserial-core/src/runtime/facade.rs
// ============================================================================
// Module: SQL Serial Request Facade
// Description: Blocking submit-wait-collect helpers on top of the engine.
// Purpose: Give request handlers a one-call way to run an operation.
// Dependencies: crate::{core, runtime}
// ============================================================================

//! ## Overview
//! Each helper allocates a fresh [`WaitHandle`], submits, blocks until the
//! executor signals, and reads the outcome back from the result table.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::time::Duration;

use crate::core::FromRow;
use crate::core::Operation;
use crate::core::OperationId;
use crate::core::RowSet;
use crate::runtime::engine::Engine;
use crate::runtime::error::EngineError;
use crate::runtime::error::OperationOutcome;
use crate::runtime::wait::WaitHandle;

// ============================================================================
// SECTION: Helpers
// ============================================================================

impl Engine {
    /// Submits `operation` and blocks until its outcome is published.
    ///
    /// # Errors
    ///
    /// Returns the storage failure captured for this operation,
    /// [`EngineError::ShuttingDown`] when the engine is closing, or
    /// [`EngineError::ResultUnavailable`] when the result was swept before it
    /// could be read.
    pub fn run_and_wait(&self, operation: impl Into<Operation>) -> OperationOutcome {
        let handle = WaitHandle::new();
        let id = self.submit(operation, &handle)?;
        handle.wait();
        self.collect(id)
    }

    /// Like [`Engine::run_and_wait`] but stops waiting after `timeout`.
    ///
    /// The operation stays queued after a timeout; its result can still be
    /// read later with [`Engine::get_result`] using the id carried by the
    /// error.
    ///
    /// # Errors
    ///
    /// Returns [`EngineError::TimedOut`] when `timeout` elapses first, plus
    /// everything [`Engine::run_and_wait`] can return.
    pub fn run_and_wait_timeout(
        &self,
        operation: impl Into<Operation>,
        timeout: Duration,
    ) -> OperationOutcome {
        let handle = WaitHandle::new();
        let id = self.submit(operation, &handle)?;
        if !handle.wait_timeout(timeout) {
            return Err(EngineError::TimedOut(id));
        }
        self.collect(id)
    }

    /// Runs `operation`; on failure returns whatever `recover` produces.
    pub fn run_or_recover<F>(&self, operation: impl Into<Operation>, recover: F) -> RowSet
    where
        F: FnOnce(EngineError) -> RowSet,
    {
        self.run_and_wait(operation).unwrap_or_else(recover)
    }

    /// Runs `operation` and decodes every returned row as `T`.
    ///
    /// # Errors
    ///
    /// Returns [`EngineError::Decode`] when a row does not fit `T`, plus
    /// everything [`Engine::run_and_wait`] can return.
    pub fn run_mapped<T: FromRow>(&self, operation: impl Into<Operation>) -> Result<Vec<T>, EngineError> {
        let rows = self.run_and_wait(operation)?;
        Ok(rows.decode::<T>()?)
    }

    /// Runs `operation` and decodes the first returned row, if any.
    ///
    /// # Errors
    ///
    /// Same as [`Engine::run_mapped`].
    pub fn run_first<T: FromRow>(
        &self,
        operation: impl Into<Operation>,
    ) -> Result<Option<T>, EngineError> {
        let rows = self.run_and_wait(operation)?;
        rows.first().map(|row| T::from_row(&row)).transpose().map_err(EngineError::Decode)
    }

    /// Reads the outcome of an operation whose handle has been signalled.
    ///
    /// A missing entry (swept, or never issued) maps to
    /// [`EngineError::ResultUnavailable`].
    #[must_use]
    pub fn collect(&self, id: OperationId) -> OperationOutcome {
        self.get_result(id).unwrap_or(Err(EngineError::ResultUnavailable(id)))
    }
}
