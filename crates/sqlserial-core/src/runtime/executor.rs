// crates/sqlserial-core/src/runtime/executor.rs
// ============================================================================
// Module: SQL Serial Executor
// Description: Background loop that owns the storage connection.
// Purpose: Execute queued operations one at a time and publish outcomes.
// Dependencies: crate::{core, interfaces, runtime}, tracing
// ============================================================================

//! ## Overview
//! The executor is the only code that touches the storage connection. It
//! dequeues in FIFO order, executes, publishes the outcome to the result
//! table, and signals the waiter. Storage failures and panics become
//! operation outcomes; the loop keeps going.
//!
//! Once shutdown is observed, the dequeued operation and everything still
//! queued are completed with `ShuttingDown` in one table write, without
//! touching storage.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::any::Any;
use std::panic;
use std::panic::AssertUnwindSafe;
use std::sync::mpsc::Receiver;

use tracing::debug;
use tracing::error;
use tracing::info;
use tracing::warn;

use crate::core::Operation;
use crate::core::OperationId;
use crate::interfaces::Storage;
use crate::interfaces::StorageError;
use crate::interfaces::StorageErrorKind;
use crate::runtime::engine::EngineShared;
use crate::runtime::error::EngineError;
use crate::runtime::error::OperationOutcome;

// ============================================================================
// SECTION: Queue Item
// ============================================================================

/// One queued unit of work.
pub(crate) struct QueuedOperation {
    /// Id assigned at submission.
    pub(crate) id: OperationId,
    /// Statements to execute.
    pub(crate) operation: Operation,
}

// ============================================================================
// SECTION: Loop
// ============================================================================

/// Runs until the queue sender is dropped and the queue is empty.
pub(crate) fn run_executor(
    shared: &EngineShared,
    receiver: &Receiver<QueuedOperation>,
    mut storage: Box<dyn Storage>,
) {
    debug!(storage = storage.label(), "executor started");
    let mut drained = 0_usize;
    while let Ok(queued) = receiver.recv() {
        shared.dequeued(1);
        if shared.is_shutting_down() {
            let mut ids = vec![queued.id];
            ids.extend(receiver.try_iter().map(|rest| rest.id));
            shared.dequeued(ids.len() - 1);
            drained += shared.publish_shutdown(&ids);
            continue;
        }
        let outcome = execute(storage.as_mut(), &queued);
        shared.publish(queued.id, outcome);
    }
    if drained > 0 {
        info!(drained, "executor drained queued operations at shutdown");
    }
    debug!("executor stopped");
}

/// Executes one operation, converting errors and panics into an outcome.
fn execute(storage: &mut dyn Storage, queued: &QueuedOperation) -> OperationOutcome {
    let result = panic::catch_unwind(AssertUnwindSafe(|| storage.execute(&queued.operation)));
    match result {
        Ok(Ok(rows)) => {
            debug!(operation_id = %queued.id, rows = rows.len(), "operation completed");
            Ok(rows)
        }
        Ok(Err(err)) => {
            warn!(
                operation_id = %queued.id,
                kind = %err.kind,
                error = %err.message,
                "operation failed"
            );
            Err(EngineError::Storage(err))
        }
        Err(payload) => {
            let message = panic_message(payload.as_ref());
            error!(operation_id = %queued.id, error = %message, "storage panicked during operation");
            Err(EngineError::Storage(StorageError::new(StorageErrorKind::Panicked, message)))
        }
    }
}

/// Extracts a readable message from a panic payload.
fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(message) = payload.downcast_ref::<&str>() {
        return (*message).to_string();
    }
    if let Some(message) = payload.downcast_ref::<String>() {
        return message.clone();
    }
    "storage panicked".to_string()
}
