// crates/sqlserial-core/src/runtime/config.rs
// ============================================================================
// Module: SQL Serial Engine Config
// Description: Retention and scheduling knobs for the serialized engine.
// Purpose: Provide validated, serde-friendly engine settings with defaults.
// Dependencies: serde, crate::runtime::error
// ============================================================================

//! ## Overview
//! Defaults keep unread results for twenty minutes and sweep on the same
//! cadence. Retention is a memory-bounding policy; callers that fetch their
//! result promptly never observe it.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::time::Duration;

use serde::Deserialize;
use serde::Serialize;

use crate::runtime::error::EngineError;

// ============================================================================
// SECTION: Constants
// ============================================================================

/// Default retention window for unread results (20 minutes).
pub const DEFAULT_RETENTION_MS: u64 = 1_200_000;
/// Default sweeper interval (20 minutes).
pub const DEFAULT_SWEEP_INTERVAL_MS: u64 = 1_200_000;
/// Upper bound for both retention and sweep interval (7 days).
pub const MAX_INTERVAL_MS: u64 = 7 * 24 * 60 * 60 * 1_000;
/// Maximum worker thread name length.
const MAX_WORKER_NAME_LENGTH: usize = 64;

// ============================================================================
// SECTION: Config
// ============================================================================

/// Engine configuration.
///
/// # Invariants
/// - `retention_ms` and `sweep_interval_ms` are in `1 ..= MAX_INTERVAL_MS`.
/// - `worker_name` is non-empty, at most 64 bytes, and contains no NUL.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct EngineConfig {
    /// How long an unread completed result is kept (milliseconds).
    #[serde(default = "default_retention_ms")]
    pub retention_ms: u64,
    /// How often the sweeper runs (milliseconds).
    #[serde(default = "default_sweep_interval_ms")]
    pub sweep_interval_ms: u64,
    /// Name of the executor thread; the sweeper appends `-sweeper`.
    #[serde(default = "default_worker_name")]
    pub worker_name: String,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            retention_ms: DEFAULT_RETENTION_MS,
            sweep_interval_ms: DEFAULT_SWEEP_INTERVAL_MS,
            worker_name: default_worker_name(),
        }
    }
}

impl EngineConfig {
    /// Returns the retention window.
    #[must_use]
    pub const fn retention(&self) -> Duration {
        Duration::from_millis(self.retention_ms)
    }

    /// Returns the sweeper interval.
    #[must_use]
    pub const fn sweep_interval(&self) -> Duration {
        Duration::from_millis(self.sweep_interval_ms)
    }

    /// Validates the configuration.
    ///
    /// # Errors
    ///
    /// Returns [`EngineError::InvalidConfig`] when a field is out of range.
    pub fn validate(&self) -> Result<(), EngineError> {
        validate_interval("retention_ms", self.retention_ms)?;
        validate_interval("sweep_interval_ms", self.sweep_interval_ms)?;
        if self.worker_name.trim().is_empty() {
            return Err(EngineError::InvalidConfig("worker_name must be non-empty".to_string()));
        }
        if self.worker_name.len() > MAX_WORKER_NAME_LENGTH {
            return Err(EngineError::InvalidConfig(format!(
                "worker_name exceeds {MAX_WORKER_NAME_LENGTH} bytes"
            )));
        }
        if self.worker_name.contains('\0') {
            return Err(EngineError::InvalidConfig("worker_name must not contain NUL".to_string()));
        }
        Ok(())
    }
}

/// Validates one millisecond interval field.
fn validate_interval(field: &str, value: u64) -> Result<(), EngineError> {
    if value == 0 {
        return Err(EngineError::InvalidConfig(format!("{field} must be greater than zero")));
    }
    if value > MAX_INTERVAL_MS {
        return Err(EngineError::InvalidConfig(format!(
            "{field} out of range: {value} (max {MAX_INTERVAL_MS})"
        )));
    }
    Ok(())
}

/// Returns the default retention window in milliseconds.
const fn default_retention_ms() -> u64 {
    DEFAULT_RETENTION_MS
}

/// Returns the default sweeper interval in milliseconds.
const fn default_sweep_interval_ms() -> u64 {
    DEFAULT_SWEEP_INTERVAL_MS
}

/// Returns the default executor thread name.
fn default_worker_name() -> String {
    "sqlserial-executor".to_string()
}

// ============================================================================
// SECTION: Tests
// ============================================================================
