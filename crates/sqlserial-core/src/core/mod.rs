// crates/sqlserial-core/src/core/mod.rs
// ============================================================================
// Module: SQL Serial Core Types
// Description: Identifiers, operations, values, and time sources.
// Purpose: Group the data model shared by the engine and storage backends.
// Dependencies: serde, thiserror
// ============================================================================

//! ## Overview
//! Core types carry no behavior beyond validation and conversion. The
//! runtime and storage backends build on them.

pub mod identifiers;
pub mod operation;
pub mod time;
pub mod value;

pub use identifiers::OperationId;
pub use operation::Operation;
pub use operation::Statement;
pub use time::Clock;
pub use time::ManualClock;
pub use time::SystemClock;
pub use value::FromRow;
pub use value::FromSqlValue;
pub use value::RowError;
pub use value::RowRef;
pub use value::RowSet;
pub use value::SqlValue;
pub use value::ValueMismatch;
