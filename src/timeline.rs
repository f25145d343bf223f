//! Timeline aggregation
//!
//! Folds every diff batch of a run sequence into one ordered transition
//! history per identity and test case. Records of the same source run that
//! show up in two adjacent batches (the run where a one-run blip starts and
//! ends) collapse into a single record.

use crate::diff::DiffBatch;
use crate::model::{merge_timeline, TestCaseTimelines, TransitionRecord};
use std::collections::BTreeMap;

/// Aggregate all diff batches into per-test-case timelines
pub fn aggregate(batches: &[DiffBatch]) -> TestCaseTimelines {
    let mut raw: BTreeMap<String, BTreeMap<_, Vec<TransitionRecord>>> = BTreeMap::new();

    for batch in batches {
        for (test_case, records) in batch {
            let per_identity = raw.entry(test_case.clone()).or_default();
            for (identity, record) in records {
                per_identity
                    .entry(identity.clone())
                    .or_default()
                    .push(record.clone());
            }
        }
    }

    let timelines: TestCaseTimelines = raw
        .into_iter()
        .map(|(test_case, per_identity)| {
            let merged = per_identity
                .into_iter()
                .map(|(identity, records)| (identity, merge_timeline(records)))
                .collect();
            (test_case, merged)
        })
        .collect();

    tracing::debug!(
        "Aggregated {} diff batches into {} identities over {} test cases",
        batches.len(),
        timelines.values().map(BTreeMap::len).sum::<usize>(),
        timelines.len()
    );

    timelines
}
