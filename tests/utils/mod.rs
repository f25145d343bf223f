// Shared builders for integration tests
//
// Runs are nightly: run `n` starts at 22:00 on day `n` relative to a base
// date, lasts two hours and carries one execution per test case.

#![allow(dead_code)]

use chrono::{DateTime, Duration, TimeZone, Utc};
use exdrift::model::{ExceptionRecord, ExecutionRecord, RunSequence, TestRun};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

pub const TEST_CASE: &str = "CallupColdReading";

pub fn base() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2024, 1, 1, 22, 0, 0).unwrap()
}

/// Night `n` after `origin`
pub fn night_from(origin: DateTime<Utc>, n: i64) -> DateTime<Utc> {
    origin + Duration::days(n)
}

pub fn exception(process: &str, message: &str, at: DateTime<Utc>) -> ExceptionRecord {
    ExceptionRecord {
        process_name: process.to_string(),
        exception_type: "System.InvalidOperationException".to_string(),
        message: message.to_string(),
        stack: "clr.dll!IL_Throw\nApp.Load()\nApp.Run()".to_string(),
        timestamp: at,
    }
}

/// One run starting at `started_at` with the given messages thrown in `Runner.exe`
pub fn run_at(started_at: DateTime<Utc>, version: &str, messages: &[&str]) -> TestRun {
    let exceptions = messages
        .iter()
        .map(|m| exception("Runner.exe", m, started_at))
        .collect();
    TestRun {
        started_at,
        ended_at: started_at + Duration::hours(2),
        test_cases: BTreeMap::from([(
            TEST_CASE.to_string(),
            vec![ExecutionRecord {
                performed_at: started_at,
                main_module_version: version.to_string(),
                exceptions,
            }],
        )]),
    }
}

/// Consecutive nights from `origin`, one version per night,
/// `presence[i]` listing the messages of night `i`
pub fn nights(origin: DateTime<Utc>, presence: &[&[&str]]) -> Vec<TestRun> {
    presence
        .iter()
        .enumerate()
        .map(|(i, messages)| {
            run_at(
                night_from(origin, i as i64),
                &format!("1.0.{}", i),
                messages,
            )
        })
        .collect()
}

pub fn sequence(runs: Vec<TestRun>) -> RunSequence {
    RunSequence::new(runs)
}

/// Write runs as the JSON input the binary expects
pub fn write_runs(dir: &Path, name: &str, runs: &[TestRun]) -> PathBuf {
    let path = dir.join(name);
    std::fs::write(&path, serde_json::to_string_pretty(runs).unwrap()).unwrap();
    path
}

/// Snapshot files in `dir` whose name contains `marker`
pub fn snapshot_files(dir: &Path, marker: &str) -> Vec<PathBuf> {
    let mut files: Vec<PathBuf> = std::fs::read_dir(dir)
        .unwrap()
        .map(|e| e.unwrap().path())
        .filter(|p| {
            p.file_name()
                .and_then(|n| n.to_str())
                .is_some_and(|n| n.contains(marker))
        })
        .collect();
    files.sort();
    files
}
