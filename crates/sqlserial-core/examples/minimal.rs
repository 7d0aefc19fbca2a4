// crates/sqlserial-core/examples/minimal.rs
// ============================================================================
// Module: SQL Serial Minimal Example
// Description: Concurrent callers sharing one engine over recording storage.
// Purpose: Demonstrate submit/wait/collect and the facade helpers.
// Dependencies: sqlserial-core
// ============================================================================

//! ## Overview
//! Four threads submit statements against one engine. Every operation runs on
//! the single executor thread in submission order, and each caller reads back
//! only its own result. No database is needed.

use std::sync::Arc;
use std::thread;

use sqlserial_core::Engine;
use sqlserial_core::EngineConfig;
use sqlserial_core::FromRow;
use sqlserial_core::RecordingStorage;
use sqlserial_core::RowError;
use sqlserial_core::RowRef;
use sqlserial_core::RowSet;
use sqlserial_core::Statement;
use sqlserial_core::StorageErrorKind;

/// Execution counter row produced by the recording backend.
struct Sequence(i64);

impl FromRow for Sequence {
    fn from_row(row: &RowRef<'_>) -> Result<Self, RowError> {
        Ok(Self(row.get("sequence")?))
    }
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let storage = RecordingStorage::new().fail_on("duplicate", StorageErrorKind::Constraint);
    let journal = storage.clone();
    let engine = Arc::new(Engine::new(storage, EngineConfig::default())?);
    engine.start()?;

    let callers: Vec<_> = (0..4)
        .map(|caller| {
            let engine = Arc::clone(&engine);
            thread::spawn(move || {
                let sql = format!("INSERT INTO visits (caller) VALUES ({caller})");
                engine.run_and_wait(Statement::new(sql)).map(|rows| rows.len())
            })
        })
        .collect();
    for caller in callers {
        let rows = caller.join().map_err(|_| "caller thread panicked")??;
        assert_eq!(rows, 1);
    }

    let recovered = engine.run_or_recover(Statement::new("INSERT duplicate"), |err| {
        assert!(err.is_storage());
        RowSet::empty()
    });
    assert!(recovered.is_empty());

    let sequence = engine.run_first::<Sequence>(Statement::new("SELECT 1"))?;
    assert_eq!(sequence.map(|row| row.0), Some(5));

    engine.shutdown();
    assert_eq!(journal.executed().len(), 5);
    Ok(())
}
