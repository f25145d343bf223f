use crate::model::RunRef;
use serde::{Deserialize, Serialize};

/// Direction of an identity's presence change at a run boundary
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum ClusterTag {
    /// Absent in the previous run, present in this one
    Starting,
    /// Present in this run, absent in the following one
    Ending,
    /// Present in this run only (starts and ends on the same run)
    Outlier,
    Undefinable,
}

impl ClusterTag {
    /// Least upper bound: equal tags stay, Starting + Ending is a one-run blip
    pub fn join(self, other: ClusterTag) -> ClusterTag {
        match (self, other) {
            (a, b) if a == b => a,
            (ClusterTag::Undefinable, b) => b,
            (a, ClusterTag::Undefinable) => a,
            _ => ClusterTag::Outlier,
        }
    }
}

/// Build labels around the run a transition was observed in.
/// `None` marks a neighbour outside the analysed sequence.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ModuleVersionContext {
    pub previous: Option<String>,
    pub current: Option<String>,
    pub following: Option<String>,
}

impl ModuleVersionContext {
    pub fn new(
        previous: Option<String>,
        current: Option<String>,
        following: Option<String>,
    ) -> Self {
        Self {
            previous,
            current,
            following,
        }
    }

    pub fn is_first_run(&self) -> bool {
        self.previous.is_none() && self.current.is_some()
    }

    pub fn is_last_run(&self) -> bool {
        self.following.is_none() && self.current.is_some()
    }

    pub fn current_differs_from_previous(&self) -> bool {
        self.current != self.previous
    }

    pub fn current_differs_from_following(&self) -> bool {
        self.current != self.following
    }

    /// Field-wise combination; known labels win over unknown ones
    pub fn combine(self, other: ModuleVersionContext) -> ModuleVersionContext {
        fn pick(a: Option<String>, b: Option<String>) -> Option<String> {
            match (a, b) {
                (Some(a), Some(b)) => Some(a.max(b)),
                (a, b) => a.or(b),
            }
        }

        ModuleVersionContext {
            previous: pick(self.previous, other.previous),
            current: pick(self.current, other.current),
            following: pick(self.following, other.following),
        }
    }
}

/// One classified occurrence of an identity at a run boundary
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct TransitionRecord {
    pub source: RunRef,
    pub module_versions: ModuleVersionContext,
    pub tag: ClusterTag,
}

impl TransitionRecord {
    pub fn new(source: RunRef, module_versions: ModuleVersionContext, tag: ClusterTag) -> Self {
        Self {
            source,
            module_versions,
            tag,
        }
    }

    /// Anchored at the first or last run, where the opposite side is unknown
    pub fn is_edge_run(&self) -> bool {
        self.module_versions.is_first_run() || self.module_versions.is_last_run()
    }

    pub fn is_tag(&self, tag: ClusterTag) -> bool {
        self.tag == tag
    }

    /// Whether the presence change coincided with a build change
    pub fn has_module_version_diff(&self) -> bool {
        let versions = &self.module_versions;
        match self.tag {
            ClusterTag::Outlier => {
                versions.current_differs_from_previous()
                    && versions.current_differs_from_following()
            }
            ClusterTag::Starting => versions.current_differs_from_previous(),
            ClusterTag::Ending => versions.current_differs_from_following(),
            ClusterTag::Undefinable => true,
        }
    }

    pub fn same_source(&self, other: &TransitionRecord) -> bool {
        self.source == other.source
    }

    /// Collapse two records of the same source run into one
    pub fn merge(self, other: TransitionRecord) -> TransitionRecord {
        debug_assert!(self.same_source(&other));
        TransitionRecord {
            tag: self.tag.join(other.tag),
            module_versions: self.module_versions.combine(other.module_versions),
            source: self.source,
        }
    }
}

/// Order records by run time and collapse records sharing a source run
pub fn merge_timeline<I>(records: I) -> Vec<TransitionRecord>
where
    I: IntoIterator<Item = TransitionRecord>,
{
    let mut sorted: Vec<TransitionRecord> = records.into_iter().collect();
    sorted.sort_by(|a, b| a.source.cmp(&b.source));

    let mut merged: Vec<TransitionRecord> = Vec::with_capacity(sorted.len());
    for record in sorted {
        match merged.pop() {
            Some(last) if last.same_source(&record) => merged.push(last.merge(record)),
            Some(last) => {
                merged.push(last);
                merged.push(record);
            }
            None => merged.push(record),
        }
    }
    merged
}
