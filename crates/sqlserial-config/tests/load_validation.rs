//! File loading and validation tests for sqlserial-config.
// crates/sqlserial-config/tests/load_validation.rs
// =============================================================================
// Module: Config Load Validation Tests
// Description: Validate file loading limits and fail-closed validation.
// Purpose: Ensure malformed or out-of-range configs never reach the engine.
// =============================================================================

use std::fs;
use std::path::Path;

use sqlserial_config::ConfigError;
use sqlserial_config::DEFAULT_DATABASE_PATH;
use sqlserial_config::SqlSerialConfig;

mod common;

type TestResult = Result<(), String>;

#[test]
fn load_reads_explicit_file() -> TestResult {
    let dir = tempfile::tempdir().map_err(|err| err.to_string())?;
    let path = dir.path().join("sqlserial.toml");
    fs::write(&path, "[engine]\nworker_name = \"from-file\"\n").map_err(|err| err.to_string())?;
    let config = SqlSerialConfig::load(Some(&path)).map_err(|err| err.to_string())?;
    assert_eq!(config.engine.worker_name, "from-file");
    Ok(())
}

#[test]
fn load_missing_file_is_io_error() -> TestResult {
    let dir = tempfile::tempdir().map_err(|err| err.to_string())?;
    let path = dir.path().join("absent.toml");
    match SqlSerialConfig::load(Some(&path)) {
        Err(ConfigError::Io(_)) => Ok(()),
        other => Err(format!("expected io error, got {other:?}")),
    }
}

#[test]
fn load_rejects_oversized_file() -> TestResult {
    let dir = tempfile::tempdir().map_err(|err| err.to_string())?;
    let path = dir.path().join("big.toml");
    let padding = format!("# {}\n", "x".repeat(1024 * 1024));
    fs::write(&path, padding).map_err(|err| err.to_string())?;
    common::assert_invalid(SqlSerialConfig::load(Some(&path)), "size limit")
}

#[test]
fn load_rejects_non_utf8() -> TestResult {
    let dir = tempfile::tempdir().map_err(|err| err.to_string())?;
    let path = dir.path().join("binary.toml");
    fs::write(&path, [0xff_u8, 0xfe, 0x00]).map_err(|err| err.to_string())?;
    common::assert_invalid(SqlSerialConfig::load(Some(&path)), "utf-8")
}

#[test]
fn unknown_keys_are_parse_errors() -> TestResult {
    match SqlSerialConfig::from_toml_str("[engine]\nretention = 5\n") {
        Err(ConfigError::Parse(_)) => {}
        other => return Err(format!("expected parse error, got {other:?}")),
    }
    match SqlSerialConfig::from_toml_str("[metrics]\nenabled = true\n") {
        Err(ConfigError::Parse(_)) => Ok(()),
        other => Err(format!("expected parse error, got {other:?}")),
    }
}

#[test]
fn zero_retention_is_invalid() -> TestResult {
    common::assert_invalid(
        SqlSerialConfig::from_toml_str("[engine]\nretention_ms = 0\n"),
        "engine: ",
    )
}

#[test]
fn blank_worker_name_is_invalid() -> TestResult {
    let mut config = common::minimal_config().map_err(|err| err.to_string())?;
    config.engine.worker_name = "  ".to_string();
    common::assert_invalid(config.validate(), "worker_name")
}

#[test]
fn oversized_busy_timeout_is_invalid() -> TestResult {
    common::assert_invalid(
        SqlSerialConfig::from_toml_str("[storage]\npath = \"db.sqlite\"\nbusy_timeout_ms = 600001\n"),
        "busy_timeout_ms",
    )
}

#[test]
fn blank_log_filter_is_invalid() -> TestResult {
    let mut config = common::minimal_config().map_err(|err| err.to_string())?;
    config.logging.filter = String::new();
    common::assert_invalid(config.validate(), "logging.filter")
}

#[test]
fn storage_section_without_path_uses_default_file() -> TestResult {
    let config = SqlSerialConfig::from_toml_str("[storage]\nbusy_timeout_ms = 10\n")
        .map_err(|err| err.to_string())?;
    if config.storage.path != Path::new(DEFAULT_DATABASE_PATH) {
        return Err(format!("unexpected default path {}", config.storage.path.display()));
    }
    if config.storage.busy_timeout_ms != 10 {
        return Err("busy_timeout_ms should be kept".to_string());
    }
    Ok(())
}
