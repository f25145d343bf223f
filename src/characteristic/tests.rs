// Classification tests over hand-built timelines
//
// Runs are indexed from 0; `record(idx, len, tag)` places a record at run
// `idx` of a `len`-run sequence, so idx 0 and len-1 are edge records.

use super::*;
use crate::model::fixtures::{identity, identity_in, record, record_with_versions};
use crate::model::{ClusterTag, TransitionRecord};
use std::collections::BTreeMap;

const PLAIN: [ExceptionCharacteristic; 3] = [
    ExceptionCharacteristic::DisjointOutliers,
    ExceptionCharacteristic::DisjointTrends,
    ExceptionCharacteristic::DisjointSporadics,
];

fn plain_buckets(records: &[TransitionRecord]) -> Vec<ExceptionCharacteristic> {
    PLAIN
        .into_iter()
        .filter(|c| {
            Detector::for_characteristic(*c)
                .map(|d| d.is_characteristic(records))
                .unwrap_or(false)
        })
        .collect()
}

fn activities_of(entries: Vec<(&str, Vec<TransitionRecord>)>) -> TimeSeriesActivities {
    let timeline = entries
        .into_iter()
        .map(|(msg, records)| (identity(msg), records))
        .collect();
    TimeSeriesActivities::new(BTreeMap::from([("TestA".to_string(), timeline)]))
}

/// E1: edge records at both ends, two blips in between
#[test]
fn test_outlier_scenario() {
    let records = vec![
        record(0, 5, ClusterTag::Ending),
        record(1, 5, ClusterTag::Outlier),
        record(2, 5, ClusterTag::Outlier),
        record(4, 5, ClusterTag::Starting),
    ];
    assert_eq!(
        plain_buckets(&records),
        vec![ExceptionCharacteristic::DisjointOutliers]
    );
}

/// E2: clean start and end
#[test]
fn test_trend_scenario() {
    let records = vec![
        record(1, 5, ClusterTag::Starting),
        record(3, 5, ClusterTag::Ending),
    ];
    assert_eq!(
        plain_buckets(&records),
        vec![ExceptionCharacteristic::DisjointTrends]
    );
}

/// E3: a blip followed by a trend start
#[test]
fn test_sporadic_mixed_scenario() {
    let records = vec![
        record(1, 5, ClusterTag::Outlier),
        record(3, 5, ClusterTag::Starting),
    ];
    assert_eq!(
        plain_buckets(&records),
        vec![ExceptionCharacteristic::DisjointSporadics]
    );
}

/// E4: seen only at the first and last of nine runs
#[test]
fn test_sporadic_all_edge_scenario() {
    let records = vec![
        record(0, 9, ClusterTag::Ending),
        record(8, 9, ClusterTag::Starting),
    ];
    assert_eq!(
        plain_buckets(&records),
        vec![ExceptionCharacteristic::DisjointSporadics]
    );
}

#[test]
fn test_single_edge_record_is_sporadic() {
    let records = vec![record(8, 9, ClusterTag::Starting)];
    assert_eq!(
        plain_buckets(&records),
        vec![ExceptionCharacteristic::DisjointSporadics]
    );
}

#[test]
fn test_consistent_refinement_requires_every_version_change() {
    // versions change only at run 3
    let versions = |i: i64| if i < 3 { "1.0".to_string() } else { "2.0".to_string() };
    let consistent = vec![record_with_versions(3, 6, ClusterTag::Starting, versions)];
    let inconsistent = vec![
        record_with_versions(3, 6, ClusterTag::Starting, versions),
        record_with_versions(4, 6, ClusterTag::Ending, versions),
    ];

    let cons = Detector::for_characteristic(ExceptionCharacteristic::DisjointTrendsConsistentModVDiff)
        .unwrap();
    let incons =
        Detector::for_characteristic(ExceptionCharacteristic::DisjointTrendsInconsistentModVDiff)
            .unwrap();

    assert!(cons.is_characteristic(&consistent));
    assert!(!incons.is_characteristic(&consistent));
    assert!(!cons.is_characteristic(&inconsistent));
    assert!(incons.is_characteristic(&inconsistent));
}

#[test]
fn test_refinements_partition_parent() {
    let samples = vec![
        vec![record(1, 5, ClusterTag::Outlier)],
        vec![record(1, 5, ClusterTag::Starting), record(3, 5, ClusterTag::Ending)],
        vec![record(0, 5, ClusterTag::Ending)],
        vec![record_with_versions(2, 5, ClusterTag::Outlier, |_| "same".to_string())],
    ];

    for records in samples {
        for parent in PLAIN {
            let family: Vec<&Detector> = DETECTORS
                .iter()
                .filter(|d| {
                    d.base == Detector::for_characteristic(parent).unwrap().base
                        && d.consistency != ConsistencyFilter::Any
                })
                .collect();
            assert_eq!(family.len(), 2);

            let parent_hit = Detector::for_characteristic(parent)
                .unwrap()
                .is_characteristic(&records);
            let hits = family.iter().filter(|d| d.is_characteristic(&records)).count();
            assert_eq!(hits, usize::from(parent_hit), "{parent} on {records:?}");
        }
    }
}

#[test]
fn test_union_has_no_detector_and_passes_everything() {
    assert!(Detector::for_characteristic(ExceptionCharacteristic::Union).is_none());

    let activities = activities_of(vec![
        ("trend", vec![record(1, 5, ClusterTag::Starting)]),
        ("blip", vec![record(2, 5, ClusterTag::Outlier)]),
    ]);
    let union = activities.characteristic(ExceptionCharacteristic::Union);
    assert_eq!(bucket_len(&union), 2);
}

#[test]
fn test_projection_keeps_empty_test_cases() {
    let activities = activities_of(vec![("trend", vec![record(1, 5, ClusterTag::Starting)])]);
    let outliers = activities.characteristic(ExceptionCharacteristic::DisjointOutliers);
    assert!(outliers.contains_key("TestA"));
    assert_eq!(bucket_len(&outliers), 0);
}

#[test]
fn test_process_filter_uses_allowlist_containment() {
    let timeline = BTreeMap::from([
        (identity_in("Vortal", "a"), vec![record(1, 5, ClusterTag::Outlier)]),
        (identity_in("w3wp", "b"), vec![record(2, 5, ClusterTag::Outlier)]),
    ]);
    let activities = TimeSeriesActivities::new(BTreeMap::from([("TestA".to_string(), timeline)]));

    let relevant = activities.characteristic_for(
        ExceptionCharacteristic::DisjointOutliers,
        &["Vortal.exe".to_string()],
    );
    assert_eq!(bucket_len(&relevant), 1);
    assert!(relevant["TestA"].contains_key(&identity_in("Vortal", "a")));

    let unfiltered = activities.characteristic_for(ExceptionCharacteristic::DisjointOutliers, &[]);
    assert_eq!(bucket_len(&unfiltered), 2);
}

#[test]
fn test_join_buckets_deduplicates_refinements() {
    let activities = activities_of(vec![("trend", vec![record(1, 5, ClusterTag::Starting)])]);
    let all = activities.all_characteristics_for(&[]);
    let joined = join_buckets(all.values());

    assert_eq!(bucket_len(&joined), 1);
    assert_eq!(joined["TestA"][&identity("trend")].len(), 1);
}

#[test]
fn test_characteristic_names_and_selection() {
    assert_eq!(
        ExceptionCharacteristic::DisjointTrendsConsistentModVDiff.to_string(),
        "DisjointTrendsConsistentModVDiff"
    );
    assert!(!ExceptionCharacteristic::Union.is_selectable());
    assert!(ExceptionCharacteristic::DEFAULT_SELECTION
        .iter()
        .all(|c| c.is_selectable()));
}

#[test]
fn test_characteristic_value_names_are_lowercase() {
    use clap::ValueEnum;
    let parsed = ExceptionCharacteristic::from_str("disjointtrendsconsistentmodvdiff", false);
    assert_eq!(
        parsed,
        Ok(ExceptionCharacteristic::DisjointTrendsConsistentModVDiff)
    );
    assert!(ExceptionCharacteristic::from_str("union", false).is_err());
}
