//! Property-based tests for classification and snapshot merging
//!
//! Random presence matrices (runs × exceptions) with random build labels are
//! run through the volatile analyzer; the resulting timelines must satisfy
//! the partition, merge and aging properties regardless of the pattern.

mod utils;

use chrono::Duration;
use exdrift::analyzer::ExceptionDifferenceAnalyzer;
use exdrift::characteristic::{
    bucket_len, join_buckets, ConsistencyFilter, ExceptionCharacteristic, DETECTORS,
};
use exdrift::config::AnalyzerConfig;
use exdrift::model::TestRun;
use exdrift::relevance::{classify, ExpiryPolicy};
use exdrift::snapshot::RelevanceSnapshot;
use proptest::prelude::*;
use utils::*;

const MESSAGES: [&str; 4] = ["alpha", "beta", "gamma", "delta"];

/// One run per entry: which of the four exceptions were thrown and the build label
fn presence_strategy() -> impl Strategy<Value = Vec<(Vec<bool>, u8)>> {
    prop::collection::vec((prop::collection::vec(any::<bool>(), 4), 0u8..3), 2..10)
}

fn build_runs(presence: &[(Vec<bool>, u8)]) -> Vec<TestRun> {
    presence
        .iter()
        .enumerate()
        .map(|(i, (present, version))| {
            let messages: Vec<&str> = MESSAGES
                .iter()
                .zip(present)
                .filter(|(_, p)| **p)
                .map(|(m, _)| *m)
                .collect();
            run_at(night_from(base(), i as i64), &format!("2.{}", version), &messages)
        })
        .collect()
}

fn snapshot_of(presence: &[(Vec<bool>, u8)]) -> RelevanceSnapshot {
    let analyzer = ExceptionDifferenceAnalyzer::new(AnalyzerConfig::default()).unwrap();
    let analysis = analyzer.analyze(&sequence(build_runs(presence)));
    let all = analysis.activities.all_characteristics_for(&[]);
    RelevanceSnapshot::from_timelines(join_buckets(all.values()))
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(100))]

    #[test]
    fn prop_plain_characteristics_partition_identities(presence in presence_strategy()) {
        let analyzer = ExceptionDifferenceAnalyzer::new(AnalyzerConfig::default()).unwrap();
        let analysis = analyzer.analyze(&sequence(build_runs(&presence)));
        let activities = &analysis.activities;

        let plain = [
            ExceptionCharacteristic::DisjointOutliers,
            ExceptionCharacteristic::DisjointTrends,
            ExceptionCharacteristic::DisjointSporadics,
        ];
        let buckets: Vec<_> = plain.iter().map(|c| activities.characteristic(*c)).collect();

        // every identity lands in exactly one plain bucket
        for (test_case, timeline) in activities.timelines() {
            for identity in timeline.keys() {
                let hits = buckets
                    .iter()
                    .filter(|b| b.get(test_case).is_some_and(|t| t.contains_key(identity)))
                    .count();
                prop_assert_eq!(hits, 1);
            }
        }
        prop_assert_eq!(
            buckets.iter().map(bucket_len).sum::<usize>(),
            activities.identity_count()
        );
    }

    #[test]
    fn prop_refinements_split_parent(presence in presence_strategy()) {
        let analyzer = ExceptionDifferenceAnalyzer::new(AnalyzerConfig::default()).unwrap();
        let analysis = analyzer.analyze(&sequence(build_runs(&presence)));
        let activities = &analysis.activities;

        for parent in DETECTORS.iter().filter(|d| d.consistency == ConsistencyFilter::Any) {
            let parent_bucket = activities.characteristic(parent.characteristic);
            let children: Vec<_> = DETECTORS
                .iter()
                .filter(|d| d.base == parent.base && d.consistency != ConsistencyFilter::Any)
                .map(|d| activities.characteristic(d.characteristic))
                .collect();
            prop_assert_eq!(children.len(), 2);

            prop_assert_eq!(
                bucket_len(&children[0]) + bucket_len(&children[1]),
                bucket_len(&parent_bucket)
            );
            prop_assert_eq!(join_buckets(&children), parent_bucket);
        }
    }

    #[test]
    fn prop_merge_is_idempotent(presence in presence_strategy()) {
        let snapshot = snapshot_of(&presence);
        prop_assert_eq!(snapshot.merge(&snapshot), snapshot);
    }

    #[test]
    fn prop_merge_is_commutative(a in presence_strategy(), b in presence_strategy()) {
        let left = snapshot_of(&a);
        let right = snapshot_of(&b);
        prop_assert_eq!(left.merge(&right), right.merge(&left));
    }

    #[test]
    fn prop_json_round_trip(presence in presence_strategy()) {
        let snapshot = snapshot_of(&presence);
        let json = snapshot.to_json().unwrap();
        prop_assert_eq!(RelevanceSnapshot::from_json(&json).unwrap(), snapshot);
    }

    #[test]
    fn prop_aging_is_monotonic(
        presence in presence_strategy(),
        expiry_night in 0i64..10,
        from_first in any::<bool>(),
    ) {
        let policy = ExpiryPolicy::new(night_from(base(), expiry_night), from_first);
        let first = snapshot_of(&presence);
        let update = classify(
            &RelevanceSnapshot::new(),
            &RelevanceSnapshot::new(),
            &first,
            &policy,
            false,
        );

        // the same exceptions, observed again far inside the window
        let later = ExpiryPolicy::new(night_from(base(), -1000) - Duration::days(1), from_first);
        let again = classify(&update.relevant, &update.irrelevant, &first, &later, false);

        for (test_case, identity, _) in update.irrelevant.iter() {
            prop_assert!(!again.relevant.contains(test_case, identity));
            prop_assert!(again.irrelevant.contains(test_case, identity));
        }
        for (test_case, identity, _) in again.relevant.iter() {
            prop_assert!(!again.irrelevant.contains(test_case, identity));
        }
    }
}
