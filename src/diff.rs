//! Per-run-pair exception diff
//!
//! Reduces each run to its unique exceptions per test case and compares two
//! adjacent runs: whatever disappears is tagged `Ending` at the earlier run,
//! whatever appears is tagged `Starting` at the later run. Exceptions present
//! on both sides produce no record.

use crate::model::{
    ClusterTag, ExceptionIdentity, IdentityNormalizer, RunRef, RunSequence, TransitionRecord,
};
use std::collections::BTreeMap;

/// Transition records of one run pair: test case → identity → record
pub type DiffBatch = BTreeMap<String, BTreeMap<ExceptionIdentity, TransitionRecord>>;

/// First sighting of an identity within one run
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UniqueException {
    pub source: RunRef,
    pub occurrences: u64,
}

/// Duplicate-free exceptions of one run, per test case
#[derive(Debug, Clone, Default)]
pub struct RunExceptions {
    run_index: usize,
    per_test_case: BTreeMap<String, BTreeMap<ExceptionIdentity, UniqueException>>,
}

impl RunExceptions {
    /// Collect the unique exceptions of the run at `run_index`
    pub fn collect(
        sequence: &RunSequence,
        run_index: usize,
        normalizer: &IdentityNormalizer,
    ) -> Self {
        let mut per_test_case = BTreeMap::new();

        let Some(run) = sequence.runs().get(run_index) else {
            return Self {
                run_index,
                per_test_case,
            };
        };
        let run_version = run.main_module_version().unwrap_or_default().to_string();

        for (test_case, executions) in &run.test_cases {
            let mut executions: Vec<_> = executions.iter().collect();
            executions.sort_by_key(|execution| execution.performed_at);

            let mut unique: BTreeMap<ExceptionIdentity, UniqueException> = BTreeMap::new();
            for execution in executions {
                for exception in &execution.exceptions {
                    let identity = ExceptionIdentity::from_record(exception, normalizer);
                    unique
                        .entry(identity)
                        .and_modify(|seen| seen.occurrences += 1)
                        .or_insert_with(|| UniqueException {
                            source: RunRef::new(
                                run.started_at,
                                execution.performed_at,
                                run_version.clone(),
                            ),
                            occurrences: 1,
                        });
                }
            }
            per_test_case.insert(test_case.clone(), unique);
        }

        Self {
            run_index,
            per_test_case,
        }
    }

    pub fn run_index(&self) -> usize {
        self.run_index
    }

    pub fn test_case(&self, name: &str) -> Option<&BTreeMap<ExceptionIdentity, UniqueException>> {
        self.per_test_case.get(name)
    }

    pub fn identity_count(&self) -> usize {
        self.per_test_case.values().map(BTreeMap::len).sum()
    }
}

/// Diff two adjacent runs of `sequence`
pub fn diff_runs(current: &RunExceptions, next: &RunExceptions, sequence: &RunSequence) -> DiffBatch {
    let current_context = sequence.module_context(current.run_index);
    let next_context = sequence.module_context(next.run_index);

    let mut batch = DiffBatch::new();
    let test_cases: std::collections::BTreeSet<&String> = current
        .per_test_case
        .keys()
        .chain(next.per_test_case.keys())
        .collect();

    for test_case in test_cases {
        let (Some(before), Some(after)) = (
            current.per_test_case.get(test_case),
            next.per_test_case.get(test_case),
        ) else {
            tracing::warn!(
                "Missing test case {} in run pair {} -> {}",
                test_case,
                current.run_index,
                next.run_index
            );
            continue;
        };

        let mut records = BTreeMap::new();
        for (identity, seen) in before {
            if !after.contains_key(identity) {
                records.insert(
                    identity.clone(),
                    TransitionRecord::new(
                        seen.source.clone(),
                        current_context.clone(),
                        ClusterTag::Ending,
                    ),
                );
            }
        }
        for (identity, seen) in after {
            if !before.contains_key(identity) {
                records.insert(
                    identity.clone(),
                    TransitionRecord::new(
                        seen.source.clone(),
                        next_context.clone(),
                        ClusterTag::Starting,
                    ),
                );
            }
        }
        batch.insert(test_case.clone(), records);
    }

    batch
}
