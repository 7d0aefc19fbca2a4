// crates/sqlserial-config/src/lib.rs
// ============================================================================
// Module: SQL Serial Config Library
// Description: Canonical config model and validation for sqlserial.toml.
// Purpose: Single source of truth for engine, storage, and logging settings.
// Dependencies: sqlserial-core, sqlserial-store-sqlite, serde, toml
// ============================================================================

//! ## Overview
//! `sqlserial-config` defines the configuration file consumed by the
//! `sqlserial` binary. Every section has defaults, unknown keys are rejected,
//! and validation fails closed before any engine or connection is built.

// ============================================================================
// SECTION: Modules
// ============================================================================

pub mod config;

// ============================================================================
// SECTION: Re-Exports
// ============================================================================

pub use config::*;
