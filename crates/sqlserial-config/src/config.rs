// crates/sqlserial-config/src/config.rs
// ============================================================================
// Module: SQL Serial Configuration
// Description: Configuration loading and validation for sqlserial.
// Purpose: Provide strict, fail-closed config parsing with hard limits.
// Dependencies: sqlserial-core, sqlserial-store-sqlite, serde, toml
// ============================================================================

//! ## Overview
//! Configuration is loaded from a TOML file with strict size and path limits.
//! The file has three optional sections: `[engine]`, `[storage]`, and
//! `[logging]`. Missing sections take their defaults; unknown keys and
//! out-of-range values are rejected.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::env;
use std::fs;
use std::path::Path;
use std::path::PathBuf;

use serde::Deserialize;
use serde::Serialize;
use sqlserial_core::EngineConfig;
use sqlserial_store_sqlite::DEFAULT_DATABASE_FILE;
use sqlserial_store_sqlite::SqliteStorageConfig;
use thiserror::Error;

// ============================================================================
// SECTION: Constants
// ============================================================================

/// Default configuration filename when no path is specified.
pub const DEFAULT_CONFIG_NAME: &str = "sqlserial.toml";
/// Environment variable used to override the config path.
pub const CONFIG_ENV_VAR: &str = "SQLSERIAL_CONFIG";
/// Default database file when `[storage]` or its `path` is omitted.
pub const DEFAULT_DATABASE_PATH: &str = DEFAULT_DATABASE_FILE;
/// Default tracing filter directive.
pub const DEFAULT_LOG_FILTER: &str = "info";
/// Maximum configuration file size in bytes.
pub(crate) const MAX_CONFIG_FILE_SIZE: usize = 1024 * 1024;
/// Maximum length of a single path component.
pub(crate) const MAX_PATH_COMPONENT_LENGTH: usize = 255;
/// Maximum total path length.
pub(crate) const MAX_TOTAL_PATH_LENGTH: usize = 4096;
/// Maximum length of a logging filter directive.
pub(crate) const MAX_LOG_FILTER_LENGTH: usize = 1024;

// ============================================================================
// SECTION: Config Model
// ============================================================================

/// Top-level sqlserial configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct SqlSerialConfig {
    /// Engine retention and scheduling settings.
    #[serde(default)]
    pub engine: EngineConfig,
    /// `SQLite` connection settings.
    #[serde(default = "default_storage")]
    pub storage: SqliteStorageConfig,
    /// Tracing subscriber settings.
    #[serde(default)]
    pub logging: LoggingConfig,
}

impl Default for SqlSerialConfig {
    fn default() -> Self {
        Self {
            engine: EngineConfig::default(),
            storage: default_storage(),
            logging: LoggingConfig::default(),
        }
    }
}

impl SqlSerialConfig {
    /// Loads configuration from disk using the default resolution rules.
    ///
    /// Resolution order: explicit `path`, then `SQLSERIAL_CONFIG`, then
    /// `sqlserial.toml` in the working directory.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] when loading or validation fails.
    pub fn load(path: Option<&Path>) -> Result<Self, ConfigError> {
        let resolved = resolve_path(path)?;
        validate_path(&resolved)?;
        let bytes = fs::read(&resolved).map_err(|err| {
            ConfigError::Io(format!("{}: {err}", resolved.display()))
        })?;
        if bytes.len() > MAX_CONFIG_FILE_SIZE {
            return Err(ConfigError::Invalid("config file exceeds size limit".to_string()));
        }
        let content = std::str::from_utf8(&bytes)
            .map_err(|_| ConfigError::Invalid("config file must be utf-8".to_string()))?;
        Self::from_toml_str(content)
    }

    /// Parses and validates configuration from TOML text.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Parse`] for malformed TOML or unknown keys and
    /// [`ConfigError::Invalid`] when validation fails.
    pub fn from_toml_str(content: &str) -> Result<Self, ConfigError> {
        let config: Self =
            toml::from_str(content).map_err(|err| ConfigError::Parse(err.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// Validates the configuration for internal consistency.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] when configuration is invalid.
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.engine
            .validate()
            .map_err(|err| ConfigError::Invalid(format!("engine: {err}")))?;
        self.storage
            .validate()
            .map_err(|err| ConfigError::Invalid(format!("storage: {err}")))?;
        self.logging.validate()?;
        Ok(())
    }
}

/// Returns the default storage section.
fn default_storage() -> SqliteStorageConfig {
    SqliteStorageConfig::new(DEFAULT_DATABASE_PATH)
}

/// Tracing subscriber settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct LoggingConfig {
    /// `tracing-subscriber` filter directive, overridden by `RUST_LOG`.
    #[serde(default = "default_log_filter")]
    pub filter: String,
    /// Emit ANSI colour codes.
    #[serde(default)]
    pub ansi: bool,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            filter: default_log_filter(),
            ansi: false,
        }
    }
}

impl LoggingConfig {
    /// Validates the filter directive shape.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Invalid`] for empty or oversized filters.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let trimmed = self.filter.trim();
        if trimmed.is_empty() {
            return Err(ConfigError::Invalid("logging.filter must be non-empty".to_string()));
        }
        if trimmed.len() > MAX_LOG_FILTER_LENGTH {
            return Err(ConfigError::Invalid("logging.filter exceeds max length".to_string()));
        }
        Ok(())
    }
}

/// Returns the default tracing filter.
fn default_log_filter() -> String {
    DEFAULT_LOG_FILTER.to_string()
}

// ============================================================================
// SECTION: Errors
// ============================================================================

/// Configuration loading or validation errors.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// I/O failure while reading configuration.
    #[error("config io error: {0}")]
    Io(String),
    /// TOML parsing error.
    #[error("config parse error: {0}")]
    Parse(String),
    /// Invalid configuration data.
    #[error("invalid config: {0}")]
    Invalid(String),
}

// ============================================================================
// SECTION: Helpers
// ============================================================================

/// Resolves the config path from CLI or environment defaults.
fn resolve_path(path: Option<&Path>) -> Result<PathBuf, ConfigError> {
    if let Some(path) = path {
        return Ok(path.to_path_buf());
    }
    if let Ok(env_path) = env::var(CONFIG_ENV_VAR) {
        if env_path.len() > MAX_TOTAL_PATH_LENGTH {
            return Err(ConfigError::Invalid("config path exceeds max length".to_string()));
        }
        return Ok(PathBuf::from(env_path));
    }
    Ok(PathBuf::from(DEFAULT_CONFIG_NAME))
}

/// Validates the resolved path against security limits.
fn validate_path(path: &Path) -> Result<(), ConfigError> {
    let text = path.to_string_lossy();
    if text.len() > MAX_TOTAL_PATH_LENGTH {
        return Err(ConfigError::Invalid("config path exceeds max length".to_string()));
    }
    for component in path.components() {
        let value = component.as_os_str().to_string_lossy();
        if value.len() > MAX_PATH_COMPONENT_LENGTH {
            return Err(ConfigError::Invalid("config path component too long".to_string()));
        }
    }
    Ok(())
}

// ============================================================================
// SECTION: Tests
// ============================================================================
