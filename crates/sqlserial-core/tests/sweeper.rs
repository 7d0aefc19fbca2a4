// crates/sqlserial-core/tests/sweeper.rs
// ============================================================================
// Module: Result Sweeper Tests
// Description: Retention-window pruning of unread results.
// Purpose: Ensure expired results are removed while pending and fresh ones stay.
// Dependencies: sqlserial-core
// ============================================================================
//! ## Overview
//! Manual sweeps run against a [`ManualClock`] for exact ages; one test lets
//! the background sweeper tick on the system clock.

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

use std::sync::Arc;
use std::thread;
use std::time::Duration;
use std::time::Instant;

use sqlserial_core::Engine;
use sqlserial_core::EngineConfig;
use sqlserial_core::ManualClock;
use sqlserial_core::RecordingStorage;
use sqlserial_core::Statement;
use sqlserial_core::WaitHandle;

mod common;
use crate::common::WAIT;
use crate::common::quiet_config;

#[test]
fn sweep_removes_only_expired_completed_results() {
    let clock = Arc::new(ManualClock::new());
    let (storage, pause) = RecordingStorage::new().pause_on("hold");
    let engine = Engine::with_clock(storage, quiet_config(), clock.clone()).expect("engine");
    engine.start().expect("start");

    let old = WaitHandle::new();
    let old_id = engine.submit(Statement::new("SELECT old"), &old).expect("submit");
    assert!(old.wait_timeout(WAIT));

    clock.advance(Duration::from_secs(50));
    let fresh = WaitHandle::new();
    let fresh_id = engine.submit(Statement::new("SELECT fresh"), &fresh).expect("submit");
    assert!(fresh.wait_timeout(WAIT));

    let held = WaitHandle::new();
    let held_id = engine.submit(Statement::new("SELECT hold"), &held).expect("submit");
    assert!(pause.wait_until_paused(WAIT));

    clock.advance(Duration::from_secs(11));
    assert_eq!(engine.sweep_now(), 1);
    assert_eq!(engine.get_result(old_id), None);
    assert!(engine.get_result(fresh_id).is_some());
    assert!(engine.is_pending(held_id));

    clock.advance(Duration::from_secs(3_600));
    assert_eq!(engine.sweep_now(), 1);
    assert!(engine.is_pending(held_id));

    pause.release();
    assert!(held.wait_timeout(WAIT));
    assert!(engine.get_result(held_id).is_some());
    assert_eq!(engine.stats().swept, 2);
}

#[test]
fn entry_exactly_at_retention_survives() {
    let clock = Arc::new(ManualClock::new());
    let engine = Engine::with_clock(RecordingStorage::new(), quiet_config(), clock.clone()).expect("engine");
    engine.start().expect("start");
    let handle = WaitHandle::new();
    let id = engine.submit(Statement::new("SELECT 1"), &handle).expect("submit");
    assert!(handle.wait_timeout(WAIT));

    clock.advance(Duration::from_millis(quiet_config().retention_ms));
    assert_eq!(engine.sweep_now(), 0);
    clock.advance(Duration::from_millis(1));
    assert_eq!(engine.sweep_now(), 1);
    assert_eq!(engine.get_result(id), None);
}

#[test]
fn background_sweeper_reclaims_unread_results() {
    let config = EngineConfig {
        retention_ms: 1,
        sweep_interval_ms: 10,
        ..quiet_config()
    };
    let engine = Engine::new(RecordingStorage::new(), config).expect("engine");
    engine.start().expect("start");
    let handle = WaitHandle::new();
    let id = engine.submit(Statement::new("SELECT 1"), &handle).expect("submit");
    assert!(handle.wait_timeout(WAIT));

    let deadline = Instant::now() + WAIT;
    while engine.get_result(id).is_some() {
        assert!(Instant::now() < deadline, "sweeper never reclaimed the result");
        thread::sleep(Duration::from_millis(5));
    }
    assert!(engine.stats().swept >= 1);
}
