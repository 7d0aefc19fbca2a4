// crates/sqlserial-core/tests/common/mod.rs
// ============================================================================
// Module: Common Test Fixtures
// Description: Shared engine builders and outcome helpers for core tests.
// Purpose: Keep engine integration tests short and deterministic.
// Dependencies: sqlserial-core
// ============================================================================

//! ## Overview
//! Builders start engines over [`RecordingStorage`] with a sweep interval long
//! enough that the background sweeper never fires unless a test asks for it.

#![allow(dead_code, reason = "Shared test helpers may be unused in some cases.")]

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::time::Duration;

use sqlserial_core::Engine;
use sqlserial_core::EngineConfig;
use sqlserial_core::EngineError;
use sqlserial_core::OperationOutcome;
use sqlserial_core::RecordingStorage;
use sqlserial_core::SqlValue;
use sqlserial_core::StorageErrorKind;
use sqlserial_core::runtime::config::MAX_INTERVAL_MS;

// ============================================================================
// SECTION: Fixtures
// ============================================================================

/// Upper bound for every blocking wait in the tests.
pub const WAIT: Duration = Duration::from_secs(10);

/// Config whose background sweeper effectively never ticks.
#[must_use]
pub fn quiet_config() -> EngineConfig {
    EngineConfig {
        retention_ms: 60_000,
        sweep_interval_ms: MAX_INTERVAL_MS,
        worker_name: "sqlserial-test".to_string(),
    }
}

/// Builds and starts an engine over `storage`.
#[must_use]
pub fn started_engine(storage: RecordingStorage) -> Engine {
    let engine = Engine::new(storage, quiet_config()).expect("engine config");
    engine.start().expect("engine start");
    engine
}

/// Returns the `sequence` cell of a recording-storage outcome.
#[must_use]
pub fn sequence(outcome: &OperationOutcome) -> Option<i64> {
    let rows = outcome.as_ref().ok()?;
    match rows.first()?.value("sequence")? {
        SqlValue::Integer(value) => Some(*value),
        _ => None,
    }
}

/// Returns the storage error kind of a failed outcome.
#[must_use]
pub fn storage_kind(outcome: &OperationOutcome) -> Option<StorageErrorKind> {
    match outcome {
        Err(EngineError::Storage(error)) => Some(error.kind),
        _ => None,
    }
}
