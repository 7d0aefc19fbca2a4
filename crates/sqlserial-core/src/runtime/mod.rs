// crates/sqlserial-core/src/runtime/mod.rs
// ============================================================================
// Module: SQL Serial Runtime
// Description: Executor, result table, sweeper, and blocking request helpers.
// Purpose: Serialize operations onto one storage connection and hand results back.
// Dependencies: crate::{core, interfaces}, tracing
// ============================================================================

//! ## Overview
//! Runtime modules implement the serialized execution engine. Submissions
//! flow through one FIFO queue to a single executor thread; results land in a
//! writer-priority guarded table where callers collect them after their wait
//! handle is signalled.

// ============================================================================
// SECTION: Submodules
// ============================================================================

pub mod config;
pub mod engine;
pub mod error;
mod executor;
pub mod facade;
pub mod recording;
pub mod rwlock;
mod sweeper;
pub mod table;
pub mod wait;

// ============================================================================
// SECTION: Re-Exports
// ============================================================================

pub use config::EngineConfig;
pub use engine::Engine;
pub use engine::EngineStats;
pub use error::EngineError;
pub use error::OperationOutcome;
pub use recording::PauseControl;
pub use recording::RecordingStorage;
pub use rwlock::GateSnapshot;
pub use rwlock::PriorityGate;
pub use rwlock::WriterPriorityLock;
pub use table::ResultEntry;
pub use table::ResultTable;
pub use table::TableCounts;
pub use wait::WaitHandle;
