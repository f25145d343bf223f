use crate::characteristic::{Detector, ExceptionCharacteristic, DETECTORS};
use crate::model::{merge_timeline, ExceptionTimeline, TestCaseTimelines};
use std::collections::BTreeMap;

/// Filtered projection of the timelines: test case → identity → records.
/// Every test case of the source timelines keeps its key, even when empty.
pub type CharacteristicBucket = BTreeMap<String, ExceptionTimeline>;

/// Number of identities over all test cases of a bucket
pub fn bucket_len(bucket: &CharacteristicBucket) -> usize {
    bucket.values().map(BTreeMap::len).sum()
}

/// Union of several buckets; records of an identity found in more than one
/// bucket are merged, so overlapping refinements do not duplicate anything
pub fn join_buckets<'a, I>(buckets: I) -> CharacteristicBucket
where
    I: IntoIterator<Item = &'a CharacteristicBucket>,
{
    let mut joined: CharacteristicBucket = BTreeMap::new();
    for bucket in buckets {
        for (test_case, timeline) in bucket {
            let target = joined.entry(test_case.clone()).or_default();
            for (identity, records) in timeline {
                target
                    .entry(identity.clone())
                    .and_modify(|existing| {
                        let combined = existing.iter().chain(records.iter()).cloned();
                        *existing = merge_timeline(combined);
                    })
                    .or_insert_with(|| records.clone());
            }
        }
    }
    joined
}

/// Classified view over the aggregated timelines of one analysis
#[derive(Debug, Clone, Default)]
pub struct TimeSeriesActivities {
    timelines: TestCaseTimelines,
}

impl TimeSeriesActivities {
    pub fn new(timelines: TestCaseTimelines) -> Self {
        Self { timelines }
    }

    pub fn timelines(&self) -> &TestCaseTimelines {
        &self.timelines
    }

    pub fn identity_count(&self) -> usize {
        bucket_len(&self.timelines)
    }

    /// Identities of every process exhibiting `characteristic`
    pub fn characteristic(&self, characteristic: ExceptionCharacteristic) -> CharacteristicBucket {
        self.characteristic_for(characteristic, &[])
    }

    /// Identities exhibiting `characteristic` whose process matches the allowlist
    pub fn characteristic_for(
        &self,
        characteristic: ExceptionCharacteristic,
        process_names: &[String],
    ) -> CharacteristicBucket {
        let detector = Detector::for_characteristic(characteristic);

        self.timelines
            .iter()
            .map(|(test_case, timeline)| {
                let matching = timeline
                    .iter()
                    .filter(|(identity, _)| identity.is_from_any_process(process_names))
                    .filter(|(_, records)| detector.map_or(true, |d| d.is_characteristic(records)))
                    .map(|(identity, records)| (identity.clone(), records.clone()))
                    .collect();
                (test_case.clone(), matching)
            })
            .collect()
    }

    /// All nine detectable characteristics, optionally narrowed by process
    pub fn all_characteristics_for(
        &self,
        process_names: &[String],
    ) -> BTreeMap<ExceptionCharacteristic, CharacteristicBucket> {
        DETECTORS
            .iter()
            .map(|d| (d.characteristic, self.characteristic_for(d.characteristic, process_names)))
            .collect()
    }
}
