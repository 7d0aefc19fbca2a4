// crates/sqlserial-cli/tests/cli_commands.rs
// ============================================================================
// Module: CLI Command Tests
// Description: End-to-end tests for the sqlserial binary.
// Purpose: Ensure commands route through the engine and report outcomes.
// Dependencies: sqlserial-cli binary
// ============================================================================
//! ## Overview
//! Runs the compiled binary against temporary databases and asserts on the
//! JSON lines it prints and on its exit status.

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
use std::path::Path;
use std::path::PathBuf;
use std::process::Command;
use std::process::Output;

use serde_json::Value;

// ============================================================================
// SECTION: Helpers
// ============================================================================

fn sqlserial_bin() -> PathBuf {
    PathBuf::from(env!("CARGO_BIN_EXE_sqlserial"))
}

fn write_config(dir: &Path) -> PathBuf {
    let config_path = dir.join("sqlserial.toml");
    let database = dir.join("app.db");
    let config = format!(
        "[storage]\npath = \"{}\"\n\n[logging]\nfilter = \"warn\"\n",
        database.display()
    );
    fs::write(&config_path, config).expect("write config");
    config_path
}

fn sqlserial(config: &Path, args: &[&str]) -> Output {
    Command::new(sqlserial_bin())
        .arg("--config")
        .arg(config)
        .args(args)
        .env_remove("RUST_LOG")
        .output()
        .expect("run sqlserial")
}

fn json_lines(output: &Output) -> Vec<Value> {
    String::from_utf8_lossy(&output.stdout)
        .lines()
        .map(|line| serde_json::from_str(line).expect("json line"))
        .collect()
}

// ============================================================================
// SECTION: Tests
// ============================================================================

/// Verifies `exec` persists writes and returns rows keyed by column.
#[test]
fn exec_writes_then_reads_rows() {
    let dir = tempfile::tempdir().expect("temp dir");
    let config = write_config(dir.path());

    let create = sqlserial(&config, &["exec", "CREATE TABLE users (id INTEGER PRIMARY KEY, name TEXT)"]);
    assert!(create.status.success(), "stderr: {}", String::from_utf8_lossy(&create.stderr));

    let insert = sqlserial(
        &config,
        &["exec", "INSERT INTO users (id, name) VALUES (?1, ?2)", "--param", "1", "--param", "\"Ada\""],
    );
    assert!(insert.status.success());
    assert_eq!(json_lines(&insert)[0]["rows_affected"], 1);

    let select = sqlserial(&config, &["exec", "SELECT id, name FROM users"]);
    assert!(select.status.success());
    let lines = json_lines(&select);
    assert_eq!(lines.len(), 1);
    assert_eq!(lines[0]["ok"], true);
    assert_eq!(lines[0]["rows"][0]["name"], "Ada");
    assert_eq!(lines[0]["columns"], serde_json::json!(["id", "name"]));
}

/// Verifies a constraint failure is reported and exits non-zero.
#[test]
fn exec_reports_constraint_failure() {
    let dir = tempfile::tempdir().expect("temp dir");
    let config = write_config(dir.path());
    let setup = sqlserial(&config, &["exec", "CREATE TABLE t (id INTEGER PRIMARY KEY)"]);
    assert!(setup.status.success());
    assert!(sqlserial(&config, &["exec", "INSERT INTO t VALUES (1)"]).status.success());

    let duplicate = sqlserial(&config, &["exec", "INSERT INTO t VALUES (1)"]);
    assert!(!duplicate.status.success());
    let lines = json_lines(&duplicate);
    assert_eq!(lines[0]["ok"], false);
    assert!(lines[0]["error"].as_str().unwrap().contains("constraint"));
}

/// Verifies `run` submits each statement separately and keeps going after a failure.
#[test]
fn run_reports_each_operation_in_order() {
    let dir = tempfile::tempdir().expect("temp dir");
    let config = write_config(dir.path());
    let script = dir.path().join("script.json");
    fs::write(
        &script,
        r#"[
            {"sql": "CREATE TABLE t (id INTEGER PRIMARY KEY)"},
            {"sql": "INSERT INTO t VALUES (?1)", "params": [1]},
            {"sql": "INSERT INTO t VALUES (?1)", "params": [1]},
            {"sql": "INSERT INTO t VALUES (?1)", "params": [2]},
            {"sql": "SELECT count(*) AS n FROM t"}
        ]"#,
    )
    .expect("write script");

    let output = sqlserial(&config, &["run", script.to_str().unwrap()]);
    assert!(!output.status.success());
    let lines = json_lines(&output);
    let ids: Vec<u64> = lines.iter().map(|line| line["id"].as_u64().unwrap()).collect();
    assert_eq!(ids, vec![1, 2, 3, 4, 5]);
    let oks: Vec<bool> = lines.iter().map(|line| line["ok"].as_bool().unwrap()).collect();
    assert_eq!(oks, vec![true, true, false, true, true]);
    assert_eq!(lines[4]["rows"][0]["n"], 2);
}

/// Verifies `run --atomic` rolls the whole script back on failure.
#[test]
fn run_atomic_rolls_back_on_failure() {
    let dir = tempfile::tempdir().expect("temp dir");
    let config = write_config(dir.path());
    assert!(sqlserial(&config, &["exec", "CREATE TABLE t (id INTEGER PRIMARY KEY)"]).status.success());
    let script = dir.path().join("script.json");
    fs::write(
        &script,
        r#"[{"sql": "INSERT INTO t VALUES (1)"}, {"sql": "INSERT INTO t VALUES (1)"}]"#,
    )
    .expect("write script");

    let output = sqlserial(&config, &["run", "--atomic", script.to_str().unwrap()]);
    assert!(!output.status.success());
    assert_eq!(json_lines(&output).len(), 1);

    let count = sqlserial(&config, &["exec", "SELECT count(*) AS n FROM t"]);
    assert_eq!(json_lines(&count)[0]["rows"][0]["n"], 0);
}

/// Verifies `backup` writes a readable copy and refuses to overwrite.
#[test]
fn backup_copies_database() {
    let dir = tempfile::tempdir().expect("temp dir");
    let config = write_config(dir.path());
    assert!(sqlserial(&config, &["exec", "CREATE TABLE t (id INTEGER)"]).status.success());
    assert!(sqlserial(&config, &["exec", "INSERT INTO t VALUES (5)"]).status.success());

    let dest = dir.path().join("copy.db");
    let output = sqlserial(&config, &["backup", dest.to_str().unwrap()]);
    assert!(output.status.success(), "stderr: {}", String::from_utf8_lossy(&output.stderr));
    assert!(dest.exists());

    let read_copy = Command::new(sqlserial_bin())
        .args(["--config", config.to_str().unwrap(), "--database", dest.to_str().unwrap()])
        .args(["exec", "SELECT id FROM t"])
        .output()
        .expect("run sqlserial");
    assert_eq!(json_lines(&read_copy)[0]["rows"][0]["id"], 5);

    let again = sqlserial(&config, &["backup", dest.to_str().unwrap()]);
    assert!(!again.status.success());
}

/// Verifies `config check` accepts a valid file and rejects unknown keys.
#[test]
fn config_check_validates_file() {
    let dir = tempfile::tempdir().expect("temp dir");
    let config = write_config(dir.path());
    let ok = sqlserial(&config, &["config", "check"]);
    assert!(ok.status.success());
    assert!(String::from_utf8_lossy(&ok.stdout).contains("config ok"));

    let bad = dir.path().join("bad.toml");
    fs::write(&bad, "[engine]\nretention_ms = 0\n").expect("write bad config");
    let rejected = sqlserial(&bad, &["config", "check"]);
    assert!(!rejected.status.success());
    assert!(String::from_utf8_lossy(&rejected.stderr).contains("retention_ms"));
}
