// Exception time-series characteristics
//
// Aggregated timelines are partitioned into three disjoint presence patterns:
//
// - Outliers:  every non-edge transition is a one-run blip
// - Trends:    every non-edge transition is a clean start or end
// - Sporadics: a mix of both, or an identity seen only at the sequence edges
//
// Each pattern is further split by whether every transition coincided with a
// build (main module version) change. Detectors are plain table entries of
// (base rule, consistency filter); there is no per-variant type.

mod activities;
mod detector;

pub use activities::{bucket_len, join_buckets, CharacteristicBucket, TimeSeriesActivities};
pub use detector::{BaseRule, ConsistencyFilter, Detector, DETECTORS};

use serde::{Deserialize, Serialize};
use std::fmt;

/// Presence pattern of an exception over the analysed run sequence
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Hash,
    PartialOrd,
    Ord,
    Serialize,
    Deserialize,
    clap::ValueEnum,
)]
#[value(rename_all = "lower")]
pub enum ExceptionCharacteristic {
    /// Everything, unpartitioned. Tags persisted snapshots; never selectable.
    #[value(skip)]
    Union,
    DisjointTrends,
    DisjointTrendsConsistentModVDiff,
    DisjointTrendsInconsistentModVDiff,
    DisjointOutliers,
    DisjointOutliersConsistentModVDiff,
    DisjointOutliersInconsistentModVDiff,
    DisjointSporadics,
    DisjointSporadicsConsistentModVDiff,
    DisjointSporadicsInconsistentModVDiff,
}

impl ExceptionCharacteristic {
    /// Selection used when the caller names none
    pub const DEFAULT_SELECTION: [ExceptionCharacteristic; 3] = [
        ExceptionCharacteristic::DisjointOutliers,
        ExceptionCharacteristic::DisjointSporadics,
        ExceptionCharacteristic::DisjointTrends,
    ];

    pub fn is_selectable(self) -> bool {
        self != ExceptionCharacteristic::Union
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Union => "Union",
            Self::DisjointTrends => "DisjointTrends",
            Self::DisjointTrendsConsistentModVDiff => "DisjointTrendsConsistentModVDiff",
            Self::DisjointTrendsInconsistentModVDiff => "DisjointTrendsInconsistentModVDiff",
            Self::DisjointOutliers => "DisjointOutliers",
            Self::DisjointOutliersConsistentModVDiff => "DisjointOutliersConsistentModVDiff",
            Self::DisjointOutliersInconsistentModVDiff => "DisjointOutliersInconsistentModVDiff",
            Self::DisjointSporadics => "DisjointSporadics",
            Self::DisjointSporadicsConsistentModVDiff => "DisjointSporadicsConsistentModVDiff",
            Self::DisjointSporadicsInconsistentModVDiff => {
                "DisjointSporadicsInconsistentModVDiff"
            }
        }
    }
}

impl fmt::Display for ExceptionCharacteristic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[cfg(test)]
mod tests;
