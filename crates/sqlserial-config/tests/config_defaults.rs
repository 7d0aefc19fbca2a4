//! Default and section parsing tests for sqlserial-config.
// crates/sqlserial-config/tests/config_defaults.rs
// =============================================================================
// Module: Config Defaults Tests
// Description: Validate defaults and explicit section parsing.
// Purpose: Ensure an empty file yields a usable configuration.
// =============================================================================

use std::path::Path;

use sqlserial_config::DEFAULT_DATABASE_PATH;
use sqlserial_config::DEFAULT_LOG_FILTER;
use sqlserial_config::SqlSerialConfig;
use sqlserial_core::EngineConfig;
use sqlserial_store_sqlite::SqliteJournalMode;
use sqlserial_store_sqlite::SqliteSyncMode;

mod common;

type TestResult = Result<(), String>;

#[test]
fn empty_file_uses_defaults() -> TestResult {
    let config = common::minimal_config().map_err(|err| err.to_string())?;
    config.validate().map_err(|err| err.to_string())?;
    if config.engine != EngineConfig::default() {
        return Err("engine defaults mismatch".to_string());
    }
    if config.storage.path != Path::new(DEFAULT_DATABASE_PATH) {
        return Err(format!("unexpected storage path {}", config.storage.path.display()));
    }
    if config.logging.filter != DEFAULT_LOG_FILTER || config.logging.ansi {
        return Err("logging defaults mismatch".to_string());
    }
    if config != SqlSerialConfig::default() {
        return Err("parsed defaults differ from Default".to_string());
    }
    Ok(())
}

#[test]
fn explicit_sections_are_parsed() -> TestResult {
    let config = SqlSerialConfig::from_toml_str(
        r#"
[engine]
retention_ms = 5000
sweep_interval_ms = 1000
worker_name = "orders-db"

[storage]
path = "data/orders.db"
busy_timeout_ms = 250
journal_mode = "delete"
sync_mode = "normal"
foreign_keys = false

[logging]
filter = "sqlserial_core=debug"
ansi = true
"#,
    )
    .map_err(|err| err.to_string())?;
    assert_eq!(config.engine.retention_ms, 5_000);
    assert_eq!(config.engine.sweep_interval_ms, 1_000);
    assert_eq!(config.engine.worker_name, "orders-db");
    assert_eq!(config.storage.path, Path::new("data/orders.db"));
    assert_eq!(config.storage.busy_timeout_ms, 250);
    assert_eq!(config.storage.journal_mode, SqliteJournalMode::Delete);
    assert_eq!(config.storage.sync_mode, SqliteSyncMode::Normal);
    assert!(!config.storage.foreign_keys);
    assert_eq!(config.logging.filter, "sqlserial_core=debug");
    assert!(config.logging.ansi);
    Ok(())
}

#[test]
fn partial_engine_section_keeps_other_defaults() -> TestResult {
    let config = SqlSerialConfig::from_toml_str("[engine]\nretention_ms = 1\n")
        .map_err(|err| err.to_string())?;
    assert_eq!(config.engine.retention_ms, 1);
    assert_eq!(config.engine.sweep_interval_ms, EngineConfig::default().sweep_interval_ms);
    Ok(())
}

#[test]
fn memory_storage_path_is_accepted() -> TestResult {
    let config = SqlSerialConfig::from_toml_str("[storage]\npath = \":memory:\"\n")
        .map_err(|err| err.to_string())?;
    if !config.storage.is_in_memory() {
        return Err("expected in-memory storage".to_string());
    }
    Ok(())
}
