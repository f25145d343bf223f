// Core data model for exception time-series analysis
//
// A run sequence (ordered CI nights) is reduced to per-run unique exceptions,
// keyed by a normalized identity. Transitions between adjacent runs are
// recorded as tagged records that later fold into per-identity timelines.
//
// - identity:   normalized exception key (timestamp never takes part in equality)
// - run:        run-sequence input (runs, executions, raw exception records)
// - transition: cluster tags, module-version context, mergeable transition records

mod identity;
mod run;
mod transition;

pub use identity::{ExceptionIdentity, IdentityNormalizer};
pub use run::{ExceptionRecord, ExecutionRecord, RunRef, RunSequence, RunWindow, TestRun};
pub use transition::{merge_timeline, ClusterTag, ModuleVersionContext, TransitionRecord};

use std::collections::BTreeMap;

/// Ordered transition history per identity for one test case
pub type ExceptionTimeline = BTreeMap<ExceptionIdentity, Vec<TransitionRecord>>;

/// Timelines grouped by test case name
pub type TestCaseTimelines = BTreeMap<String, ExceptionTimeline>;
