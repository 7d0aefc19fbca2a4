// crates/sqlserial-core/src/lib.rs
// ============================================================================
// Module: SQL Serial Core Library
// Description: Public API surface for the serialized SQL execution engine.
// Purpose: Expose core types, the storage interface, and the runtime engine.
// Dependencies: crate::{core, interfaces, runtime}
// ============================================================================

//! ## Overview
//! SQL Serial funnels every database operation from many concurrent callers
//! through one executor that owns the only storage connection. Operations run
//! one at a time in submission order, and each caller blocks on its own wait
//! handle until its result is published. Storage backends plug in through
//! [`Storage`].

// ============================================================================
// SECTION: Modules
// ============================================================================

pub mod core;
pub mod interfaces;
pub mod runtime;

// ============================================================================
// SECTION: Re-Exports
// ============================================================================

pub use core::*;

pub use interfaces::Storage;
pub use interfaces::StorageError;
pub use interfaces::StorageErrorKind;
pub use runtime::Engine;
pub use runtime::EngineConfig;
pub use runtime::EngineError;
pub use runtime::EngineStats;
pub use runtime::OperationOutcome;
pub use runtime::PauseControl;
pub use runtime::RecordingStorage;
pub use runtime::ResultTable;
pub use runtime::WaitHandle;
pub use runtime::WriterPriorityLock;
