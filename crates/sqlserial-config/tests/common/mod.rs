// crates/sqlserial-config/tests/common/mod.rs
// =============================================================================
// Module: Config Test Helpers
// Description: Shared helpers for config validation tests.
// Purpose: Reduce duplication across integration tests for sqlserial-config.
// =============================================================================

#![allow(dead_code, reason = "Test helpers are selectively used across suites.")]

use sqlserial_config::ConfigError;
use sqlserial_config::SqlSerialConfig;

/// Parses a TOML string into a `SqlSerialConfig` without validating it.
pub fn config_from_toml(toml_str: &str) -> Result<SqlSerialConfig, toml::de::Error> {
    toml::from_str(toml_str)
}

/// Returns a minimal config with all defaults applied.
pub fn minimal_config() -> Result<SqlSerialConfig, toml::de::Error> {
    config_from_toml("")
}

/// Asserts that `result` failed and its message contains `needle`.
pub fn assert_invalid<T>(result: Result<T, ConfigError>, needle: &str) -> Result<(), String> {
    match result {
        Err(error) => {
            let message = error.to_string();
            if message.contains(needle) {
                Ok(())
            } else {
                Err(format!("error {message} did not contain {needle}"))
            }
        }
        Ok(_) => Err("expected invalid config".to_string()),
    }
}
