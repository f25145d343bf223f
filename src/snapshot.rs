//! Mergeable relevance snapshots
//!
//! A snapshot groups exception timelines by test case and is the unit that
//! is persisted between invocations. Merging two snapshots unions their
//! identities and folds the records of shared identities, so
//! `a.merge(&a) == a` and the order of merges does not matter.
//!
//! On disk a snapshot is a JSON document:
//!
//! ```json
//! { "Characteristic": "Union",
//!   "PerTestCase": { "TestA": [ { "identity": {..}, "occurrences": [..] } ] } }
//! ```
//!
//! Entries of a test case are sorted by the identity's earliest occurrence.

use crate::characteristic::ExceptionCharacteristic;
use crate::model::{
    merge_timeline, ClusterTag, ExceptionIdentity, ExceptionTimeline, TestCaseTimelines,
    TransitionRecord,
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RelevanceSnapshot {
    per_test_case: TestCaseTimelines,
}

impl RelevanceSnapshot {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a snapshot, normalizing record order and dropping empty entries
    pub fn from_timelines(timelines: TestCaseTimelines) -> Self {
        let per_test_case = timelines
            .into_iter()
            .map(|(test_case, timeline)| {
                let timeline: ExceptionTimeline = timeline
                    .into_iter()
                    .filter(|(_, records)| !records.is_empty())
                    .map(|(identity, records)| (identity, merge_timeline(records)))
                    .collect();
                (test_case, timeline)
            })
            .filter(|(_, timeline)| !timeline.is_empty())
            .collect();
        Self { per_test_case }
    }

    pub fn timelines(&self) -> &TestCaseTimelines {
        &self.per_test_case
    }

    pub fn into_timelines(self) -> TestCaseTimelines {
        self.per_test_case
    }

    pub fn is_empty(&self) -> bool {
        self.per_test_case.is_empty()
    }

    pub fn identity_count(&self) -> usize {
        self.per_test_case.values().map(BTreeMap::len).sum()
    }

    pub fn contains(&self, test_case: &str, identity: &ExceptionIdentity) -> bool {
        self.per_test_case
            .get(test_case)
            .is_some_and(|timeline| timeline.contains_key(identity))
    }

    pub fn records(&self, test_case: &str, identity: &ExceptionIdentity) -> Option<&[TransitionRecord]> {
        self.per_test_case
            .get(test_case)
            .and_then(|timeline| timeline.get(identity))
            .map(Vec::as_slice)
    }

    /// Every (test case, identity, records) triple
    pub fn iter(&self) -> impl Iterator<Item = (&str, &ExceptionIdentity, &[TransitionRecord])> {
        self.per_test_case.iter().flat_map(|(test_case, timeline)| {
            timeline
                .iter()
                .map(move |(identity, records)| (test_case.as_str(), identity, records.as_slice()))
        })
    }

    /// Union with `other`; records of shared identities are folded together
    pub fn merge(&self, other: &RelevanceSnapshot) -> RelevanceSnapshot {
        let mut merged = self.per_test_case.clone();
        for (test_case, timeline) in &other.per_test_case {
            let target = merged.entry(test_case.clone()).or_default();
            for (identity, records) in timeline {
                let combined = target
                    .remove(identity)
                    .unwrap_or_default()
                    .into_iter()
                    .chain(records.iter().cloned());
                target.insert(identity.clone(), merge_timeline(combined));
            }
        }
        Self::from_timelines(merged)
    }

    /// Identities whose latest transition is an appearance
    pub fn still_active(&self) -> RelevanceSnapshot {
        self.filter_latest(|tag| tag == ClusterTag::Starting)
    }

    /// Identities whose latest transition is a disappearance or a blip
    pub fn inactive(&self) -> RelevanceSnapshot {
        self.filter_latest(|tag| matches!(tag, ClusterTag::Ending | ClusterTag::Outlier))
    }

    fn filter_latest(&self, keep: impl Fn(ClusterTag) -> bool) -> RelevanceSnapshot {
        self.filter(|_, _, records| records.last().is_some_and(|r| keep(r.tag)))
    }

    /// Keep the entries accepted by `keep`
    pub fn filter(
        &self,
        mut keep: impl FnMut(&str, &ExceptionIdentity, &[TransitionRecord]) -> bool,
    ) -> RelevanceSnapshot {
        let per_test_case = self
            .per_test_case
            .iter()
            .map(|(test_case, timeline)| {
                let kept: ExceptionTimeline = timeline
                    .iter()
                    .filter(|(identity, records)| keep(test_case, identity, records))
                    .map(|(identity, records)| (identity.clone(), records.clone()))
                    .collect();
                (test_case.clone(), kept)
            })
            .collect();
        Self::from_timelines(per_test_case)
    }

    pub fn to_json(&self) -> serde_json::Result<String> {
        let per_test_case = self
            .per_test_case
            .iter()
            .map(|(test_case, timeline)| {
                let mut entries: Vec<SnapshotEntry> = timeline
                    .iter()
                    .map(|(identity, records)| SnapshotEntry {
                        identity: identity.clone(),
                        occurrences: records.clone(),
                    })
                    .collect();
                entries.sort_by_key(SnapshotEntry::earliest);
                (test_case.clone(), entries)
            })
            .collect();

        serde_json::to_string_pretty(&SnapshotDocument {
            characteristic: ExceptionCharacteristic::Union,
            per_test_case,
        })
    }

    pub fn from_json(json: &str) -> serde_json::Result<Self> {
        let document: SnapshotDocument = serde_json::from_str(json)?;
        if document.characteristic != ExceptionCharacteristic::Union {
            tracing::warn!(
                "Snapshot tagged {} instead of Union, reading it anyway",
                document.characteristic
            );
        }

        let mut timelines = TestCaseTimelines::new();
        for (test_case, entries) in document.per_test_case {
            let timeline = timelines.entry(test_case).or_default();
            for entry in entries {
                timeline
                    .entry(entry.identity)
                    .or_default()
                    .extend(entry.occurrences);
            }
        }
        Ok(Self::from_timelines(timelines))
    }
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
struct SnapshotDocument {
    characteristic: ExceptionCharacteristic,
    #[serde(default)]
    per_test_case: BTreeMap<String, Vec<SnapshotEntry>>,
}

#[derive(Debug, Serialize, Deserialize)]
struct SnapshotEntry {
    identity: ExceptionIdentity,
    #[serde(default)]
    occurrences: Vec<TransitionRecord>,
}

impl SnapshotEntry {
    fn earliest(&self) -> Option<DateTime<Utc>> {
        self.occurrences.iter().map(|r| r.source.performed_at).min()
    }
}
