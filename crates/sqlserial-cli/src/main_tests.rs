// crates/sqlserial-cli/src/main_tests.rs
// ============================================================================
// Module: CLI Main Helpers Tests
// Description: Unit tests for input parsing helpers in the CLI entry point.
// Purpose: Ensure bounded reads and parameter parsing fail closed.
// Dependencies: sqlserial-cli main helpers
// ============================================================================

//! ## Overview
//! Validates `read_bytes_with_limit`, script parsing, and `--param` decoding.

#![allow(
    clippy::panic,
    clippy::print_stdout,
    clippy::print_stderr,
    clippy::unwrap_used,
    clippy::expect_used,
    clippy::use_debug,
    clippy::dbg_macro,
    clippy::panic_in_result_fn,
    clippy::unwrap_in_result,
    reason = "Test-only output and panic-based assertions are permitted."
)]

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::fs;

use sqlserial_core::EngineError;
use sqlserial_core::OperationId;
use sqlserial_core::OperationOutcome;
use sqlserial_core::SqlValue;
use sqlserial_core::StorageError;

use super::OutcomeRecord;
use super::ReadLimitError;
use super::parse_param;
use super::parse_script;
use super::read_bytes_with_limit;

// ============================================================================
// SECTION: Tests
// ============================================================================

#[test]
fn read_bytes_with_limit_allows_small_file() {
    let dir = tempfile::tempdir().expect("temp dir");
    let path = dir.path().join("small.json");
    fs::write(&path, b"ok").expect("write small file");

    let bytes = read_bytes_with_limit(&path, 16).expect("read small file");
    assert_eq!(bytes, b"ok");
}

#[test]
fn read_bytes_with_limit_rejects_large_file() {
    let dir = tempfile::tempdir().expect("temp dir");
    let path = dir.path().join("large.json");
    let limit = 8_usize;
    fs::write(&path, vec![0_u8; limit + 1]).expect("write large file");

    match read_bytes_with_limit(&path, limit).expect_err("expected size limit failure") {
        ReadLimitError::TooLarge {
            size,
            limit: reported,
        } => {
            assert_eq!(size, 9);
            assert_eq!(reported, limit);
        }
        ReadLimitError::Io(err) => panic!("unexpected io error: {err}"),
    }
}

#[test]
fn parse_param_maps_json_values() {
    assert_eq!(parse_param("null").unwrap(), SqlValue::Null);
    assert_eq!(parse_param("42").unwrap(), SqlValue::Integer(42));
    assert_eq!(parse_param("1.5").unwrap(), SqlValue::Real(1.5));
    assert_eq!(parse_param("\"Ada\"").unwrap(), SqlValue::Text("Ada".to_string()));
    assert_eq!(parse_param("true").unwrap(), SqlValue::Integer(1));
    assert_eq!(parse_param("[1,2]").unwrap(), SqlValue::Blob(vec![1, 2]));
}

#[test]
fn parse_param_rejects_objects_and_bare_words() {
    assert!(parse_param("{\"a\":1}").is_err());
    let err = parse_param("Ada").unwrap_err();
    assert!(err.message.contains("invalid --param"));
}

#[test]
fn parse_script_reads_statements_with_params() {
    let statements = parse_script(
        br#"[{"sql":"INSERT INTO t VALUES (?1)","params":[7]},{"sql":"SELECT * FROM t"}]"#,
    )
    .unwrap();
    assert_eq!(statements.len(), 2);
    assert_eq!(statements[0].params, vec![SqlValue::Integer(7)]);
    assert!(statements[1].params.is_empty());
}

#[test]
fn parse_script_rejects_empty_array() {
    let err = parse_script(b"[]").unwrap_err();
    assert!(err.message.contains("no statements"));
}

#[test]
fn outcome_record_carries_error_text() {
    let id = OperationId::from_raw(3).unwrap();
    let outcome: OperationOutcome = Err(EngineError::Storage(StorageError::constraint("UNIQUE failed")));
    let json = serde_json::to_value(OutcomeRecord::new(id, &outcome)).unwrap();
    assert_eq!(json["id"], 3);
    assert_eq!(json["ok"], false);
    assert!(json["error"].as_str().unwrap().contains("UNIQUE failed"));
    assert_eq!(json["message"], "That change conflicts with existing data.");
    assert!(json.get("rows").is_none());
}
