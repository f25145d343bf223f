use crate::error::{ExdriftError, Result};
use crate::model::ModuleVersionContext;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::Path;

/// One thrown/rethrown exception captured during a test execution
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExceptionRecord {
    pub process_name: String,
    pub exception_type: String,
    pub message: String,
    #[serde(default)]
    pub stack: String,
    pub timestamp: DateTime<Utc>,
}

/// One execution of a test case on one machine
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExecutionRecord {
    pub performed_at: DateTime<Utc>,
    pub main_module_version: String,
    #[serde(default)]
    pub exceptions: Vec<ExceptionRecord>,
}

/// One timestamped execution of the whole test suite
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TestRun {
    pub started_at: DateTime<Utc>,
    pub ended_at: DateTime<Utc>,
    #[serde(default)]
    pub test_cases: BTreeMap<String, Vec<ExecutionRecord>>,
}

impl TestRun {
    /// Version label of the build under test (earliest execution wins)
    pub fn main_module_version(&self) -> Option<&str> {
        self.test_cases
            .values()
            .flatten()
            .min_by_key(|execution| execution.performed_at)
            .map(|execution| execution.main_module_version.as_str())
    }

    pub fn window(&self) -> RunWindow {
        RunWindow {
            started_at: self.started_at,
            ended_at: self.ended_at,
            module_version: self.main_module_version().map(str::to_string),
        }
    }
}

/// Start, end and build label of a run, kept for reporting and trend lines
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RunWindow {
    pub started_at: DateTime<Utc>,
    pub ended_at: DateTime<Utc>,
    pub module_version: Option<String>,
}

/// Reference to the run a transition record was observed in
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct RunRef {
    pub performed_at: DateTime<Utc>,
    pub run_started_at: DateTime<Utc>,
    pub module_version: String,
}

impl RunRef {
    pub fn new(
        run_started_at: DateTime<Utc>,
        performed_at: DateTime<Utc>,
        module_version: impl Into<String>,
    ) -> Self {
        Self {
            performed_at,
            run_started_at,
            module_version: module_version.into(),
        }
    }
}

/// Chronologically ordered runs of one analysis
#[derive(Debug, Clone, Default)]
pub struct RunSequence {
    runs: Vec<TestRun>,
}

impl RunSequence {
    pub fn new(mut runs: Vec<TestRun>) -> Self {
        runs.sort_by_key(|run| run.started_at);
        Self { runs }
    }

    /// Parse a JSON array of runs
    pub fn from_json_str(json: &str) -> Result<Self> {
        let runs: Vec<TestRun> = serde_json::from_str(json)
            .map_err(|e| ExdriftError::InvalidInput(format!("malformed run sequence: {}", e)))?;
        Ok(Self::new(runs))
    }

    /// Load a JSON array of runs from disk
    pub fn from_json_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path).map_err(|e| {
            ExdriftError::InvalidInput(format!("cannot read {}: {}", path.display(), e))
        })?;
        Self::from_json_str(&content).map_err(|e| match e {
            ExdriftError::InvalidInput(reason) => {
                ExdriftError::InvalidInput(format!("{}: {}", path.display(), reason))
            }
            other => other,
        })
    }

    pub fn runs(&self) -> &[TestRun] {
        &self.runs
    }

    pub fn len(&self) -> usize {
        self.runs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.runs.is_empty()
    }

    pub fn windows(&self) -> Vec<RunWindow> {
        self.runs.iter().map(TestRun::window).collect()
    }

    /// End of the newest run, used to stamp snapshot files
    pub fn latest_end(&self) -> Option<DateTime<Utc>> {
        self.runs.last().map(|run| run.ended_at)
    }

    /// Build labels of the run at `index` and its direct neighbours
    pub fn module_context(&self, index: usize) -> ModuleVersionContext {
        let version = |i: usize| {
            self.runs
                .get(i)
                .and_then(TestRun::main_module_version)
                .map(str::to_string)
        };

        ModuleVersionContext::new(
            index.checked_sub(1).and_then(version),
            version(index),
            version(index + 1),
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::fixtures::day;

    fn run(start: i64, version: &str) -> TestRun {
        let mut test_cases = BTreeMap::new();
        test_cases.insert(
            "CallupColdReading".to_string(),
            vec![ExecutionRecord {
                performed_at: day(start),
                main_module_version: version.to_string(),
                exceptions: vec![],
            }],
        );
        TestRun {
            started_at: day(start),
            ended_at: day(start),
            test_cases,
        }
    }

    #[test]
    fn test_sequence_sorted_by_start() {
        let seq = RunSequence::new(vec![run(2, "b"), run(0, "a"), run(1, "c")]);
        let versions: Vec<_> = seq
            .runs()
            .iter()
            .map(|r| r.main_module_version().unwrap().to_string())
            .collect();
        assert_eq!(versions, vec!["a", "c", "b"]);
    }

    #[test]
    fn test_module_context_at_edges() {
        let seq = RunSequence::new(vec![run(0, "a"), run(1, "b"), run(2, "c")]);

        let first = seq.module_context(0);
        assert_eq!(first.previous, None);
        assert_eq!(first.current.as_deref(), Some("a"));
        assert_eq!(first.following.as_deref(), Some("b"));

        let middle = seq.module_context(1);
        assert_eq!(middle.previous.as_deref(), Some("a"));
        assert_eq!(middle.following.as_deref(), Some("c"));

        let last = seq.module_context(2);
        assert_eq!(last.following, None);
    }

    #[test]
    fn test_main_module_version_uses_earliest_execution() {
        let mut r = run(0, "late");
        r.test_cases.insert(
            "Another".to_string(),
            vec![ExecutionRecord {
                performed_at: day(0) - chrono::Duration::hours(1),
                main_module_version: "early".to_string(),
                exceptions: vec![],
            }],
        );
        assert_eq!(r.main_module_version(), Some("early"));
    }

    #[test]
    fn test_from_json_str_rejects_garbage() {
        let err = RunSequence::from_json_str("{not json").unwrap_err();
        assert!(matches!(err, ExdriftError::InvalidInput(_)));
    }

    #[test]
    fn test_from_json_file_names_path() {
        let err = RunSequence::from_json_file("/definitely/missing/runs.json").unwrap_err();
        assert!(err.to_string().contains("runs.json"));
    }
}
