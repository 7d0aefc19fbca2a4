// crates/sqlserial-store-sqlite/src/lib.rs
// ============================================================================
// Module: SQLite Storage
// Description: `Storage` backend over one rusqlite connection.
// Purpose: Provide the concrete connection the serialized engine drives.
// Dependencies: sqlserial-core, rusqlite
// ============================================================================

//! ## Overview
//! This crate provides a SQLite-backed [`Storage`] implementation. The
//! connection is opened once with durability pragmas applied and is then
//! owned by the engine's executor thread. Each batch runs inside its own
//! transaction. Security posture: SQL text is trusted; values must be bound as
//! parameters.
//!
//! [`Storage`]: sqlserial_core::Storage

// ============================================================================
// SECTION: Modules
// ============================================================================

pub mod store;

// ============================================================================
// SECTION: Re-Exports
// ============================================================================

pub use store::DEFAULT_BUSY_TIMEOUT_MS;
pub use store::DEFAULT_DATABASE_FILE;
pub use store::MEMORY_PATH;
pub use store::SqliteJournalMode;
pub use store::SqliteStorage;
pub use store::SqliteStorageConfig;
pub use store::SqliteStorageError;
pub use store::SqliteSyncMode;
pub use store::snapshot_database;
