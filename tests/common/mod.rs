//! Shared test helpers for integration tests
//!
//! This module provides common utilities used across all test files.

#![allow(dead_code)]

use std::sync::Arc;

use assert_cmd::cargo;
use assert_cmd::Command;
use chrono::NaiveDate;
use tempfile::TempDir;

use epochal::core::{
    BusinessCode, Config, FixedClock, RecordId, RequestContext, TemporalService, Timeline,
};
use epochal::entities::OrgUnit;

/// Day used as "today" unless a test says otherwise
pub const TODAY: &str = "2025-03-15";

pub fn date(s: &str) -> NaiveDate {
    s.parse().unwrap()
}

pub fn code(s: &str) -> BusinessCode {
    s.parse().unwrap()
}

/// In-memory service whose clock is pinned to `today`
pub fn service_on(today: &str) -> TemporalService {
    TemporalService::in_memory(Config::default())
        .unwrap()
        .with_clock(Arc::new(FixedClock::on(date(today))))
}

pub fn service() -> TemporalService {
    service_on(TODAY)
}

pub fn ctx() -> RequestContext {
    RequestContext::new("acme".parse().unwrap())
}

/// Insert an org unit version and return its record id
pub fn add_unit(
    service: &mut TemporalService,
    ctx: &RequestContext,
    unit: &str,
    on: &str,
    payload: OrgUnit,
) -> RecordId {
    service
        .insert_version(ctx, &code(unit), payload, date(on), None)
        .unwrap()
        .record_id
}

/// Assert contiguity, open tail and single-current against `today`
pub fn assert_invariants<P>(timeline: &Timeline<P>, today: NaiveDate) {
    let versions = timeline.versions();
    for pair in versions.windows(2) {
        assert_eq!(
            pair[0].end_date,
            pair[1].effective_date.pred_opt(),
            "gap or overlap between {} and {}",
            pair[0].effective_date,
            pair[1].effective_date
        );
    }
    if let Some(last) = versions.last() {
        assert_eq!(last.end_date, None, "tail must be open-ended");
    }

    let current: Vec<_> = versions.iter().filter(|v| v.is_current).collect();
    let expected = versions.iter().filter(|v| v.effective_date <= today).last();
    match expected {
        Some(v) => {
            assert_eq!(current.len(), 1, "exactly one current version expected");
            assert_eq!(current[0].record_id, v.record_id);
        }
        None => assert!(current.is_empty(), "all-future timeline has no current version"),
    }
}

/// Helper to get an epochal command
pub fn epochal() -> Command {
    let mut cmd = Command::new(cargo::cargo_bin!("epochal"));
    cmd.env_remove("EPOCHAL_TENANT")
        .env_remove("EPOCHAL_DB")
        .env_remove("RUST_LOG")
        .env("EPOCHAL_TODAY", TODAY);
    cmd
}

/// Helper to create a test workspace in a temp directory
pub fn setup_workspace() -> TempDir {
    let tmp = TempDir::new().unwrap();
    epochal().current_dir(tmp.path()).arg("init").assert().success();
    tmp
}

/// Run a command in the workspace and return trimmed stdout
pub fn run_ok(tmp: &TempDir, args: &[&str]) -> String {
    let output = epochal().current_dir(tmp.path()).args(args).output().unwrap();
    assert!(
        output.status.success(),
        "epochal {:?} failed: {}",
        args,
        String::from_utf8_lossy(&output.stderr)
    );
    String::from_utf8_lossy(&output.stdout).trim().to_string()
}

/// Add an org unit through the CLI and return its record id
pub fn create_unit(tmp: &TempDir, unit: &str, name: &str, parent: Option<&str>, on: &str) -> String {
    let mut args = vec!["org", "add", unit, "--name", name, "--effective", on, "-f", "id"];
    if let Some(p) = parent {
        args.extend(["--parent", p]);
    }
    run_ok(tmp, &args)
}
