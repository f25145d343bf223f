// Table-driven characteristic detectors
//
// Nine (characteristic → predicate) entries built from three base rules and
// three consistency filters. Edge records (first/last run of the sequence)
// never decide Outlier/Trend membership, but an identity made only of edge
// records is Sporadic.

use crate::characteristic::ExceptionCharacteristic;
use crate::model::{ClusterTag, TransitionRecord};

/// Presence pattern over the non-edge transitions of one identity
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BaseRule {
    Outliers,
    Trends,
    Sporadics,
}

impl BaseRule {
    pub fn matches(self, records: &[TransitionRecord]) -> bool {
        let core: Vec<&TransitionRecord> = records.iter().filter(|r| !r.is_edge_run()).collect();
        let is_outlier = |r: &&TransitionRecord| r.is_tag(ClusterTag::Outlier);

        match self {
            BaseRule::Outliers => !core.is_empty() && core.iter().all(is_outlier),
            BaseRule::Trends => !core.is_empty() && !core.iter().any(is_outlier),
            BaseRule::Sporadics => {
                (core.iter().any(is_outlier) && !core.iter().all(is_outlier))
                    || records.iter().all(TransitionRecord::is_edge_run)
            }
        }
    }
}

/// Refinement by build-change co-occurrence
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConsistencyFilter {
    Any,
    /// Every transition coincided with a module version change
    Consistent,
    Inconsistent,
}

impl ConsistencyFilter {
    pub fn matches(self, records: &[TransitionRecord]) -> bool {
        let all_diff = || records.iter().all(TransitionRecord::has_module_version_diff);
        match self {
            ConsistencyFilter::Any => true,
            ConsistencyFilter::Consistent => all_diff(),
            ConsistencyFilter::Inconsistent => !all_diff(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Detector {
    pub characteristic: ExceptionCharacteristic,
    pub base: BaseRule,
    pub consistency: ConsistencyFilter,
}

impl Detector {
    const fn new(
        characteristic: ExceptionCharacteristic,
        base: BaseRule,
        consistency: ConsistencyFilter,
    ) -> Self {
        Self {
            characteristic,
            base,
            consistency,
        }
    }

    /// Detector for `characteristic`; `Union` has none
    pub fn for_characteristic(characteristic: ExceptionCharacteristic) -> Option<&'static Detector> {
        DETECTORS.iter().find(|d| d.characteristic == characteristic)
    }

    pub fn is_characteristic(&self, records: &[TransitionRecord]) -> bool {
        self.base.matches(records) && self.consistency.matches(records)
    }
}

/// All detectable characteristics, in report order
pub const DETECTORS: [Detector; 9] = {
    use BaseRule as B;
    use ConsistencyFilter as F;
    use ExceptionCharacteristic as C;
    [
        Detector::new(C::DisjointTrends, B::Trends, F::Any),
        Detector::new(C::DisjointTrendsConsistentModVDiff, B::Trends, F::Consistent),
        Detector::new(C::DisjointTrendsInconsistentModVDiff, B::Trends, F::Inconsistent),
        Detector::new(C::DisjointOutliers, B::Outliers, F::Any),
        Detector::new(C::DisjointOutliersConsistentModVDiff, B::Outliers, F::Consistent),
        Detector::new(C::DisjointOutliersInconsistentModVDiff, B::Outliers, F::Inconsistent),
        Detector::new(C::DisjointSporadics, B::Sporadics, F::Any),
        Detector::new(C::DisjointSporadicsConsistentModVDiff, B::Sporadics, F::Consistent),
        Detector::new(C::DisjointSporadicsInconsistentModVDiff, B::Sporadics, F::Inconsistent),
    ]
};
