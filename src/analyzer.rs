//! Exception difference analyzer
//!
//! Walks the run sequence once, diffing every run against its successor,
//! aggregates the diffs into timelines and classifies them. The persistent
//! flavour additionally merges the classification into the snapshot pair of
//! a [`SnapshotStore`].

use crate::characteristic::{
    join_buckets, CharacteristicBucket, ExceptionCharacteristic, TimeSeriesActivities,
};
use crate::config::AnalyzerConfig;
use crate::diff::{diff_runs, DiffBatch, RunExceptions};
use crate::error::{ExdriftError, Result};
use crate::model::{IdentityNormalizer, RunSequence, RunWindow, TestCaseTimelines};
use crate::relevance::{self, RelevanceUpdate};
use crate::snapshot::RelevanceSnapshot;
use crate::store::{FsSnapshotStore, SnapshotStore};
use crate::timeline;
use std::time::{Duration, Instant};

/// Progress of the single forward pass over the runs
enum DiffLoop {
    Empty,
    HaveFirst {
        previous: RunExceptions,
        batches: Vec<DiffBatch>,
    },
}

impl DiffLoop {
    fn advance(self, current: RunExceptions, sequence: &RunSequence) -> Self {
        match self {
            DiffLoop::Empty => DiffLoop::HaveFirst {
                previous: current,
                batches: Vec::new(),
            },
            DiffLoop::HaveFirst {
                previous,
                mut batches,
            } => {
                batches.push(diff_runs(&previous, &current, sequence));
                DiffLoop::HaveFirst {
                    previous: current,
                    batches,
                }
            }
        }
    }

    /// Last run reached: aggregate everything seen so far
    fn finish(self) -> TestCaseTimelines {
        match self {
            DiffLoop::Empty => TestCaseTimelines::new(),
            DiffLoop::HaveFirst { batches, .. } => timeline::aggregate(&batches),
        }
    }
}

/// Result of the persistence step
#[derive(Debug, Clone)]
pub struct PersistedOutcome {
    pub update: RelevanceUpdate,
    /// Classification re-derived from the merged Relevant snapshot
    pub activities: TimeSeriesActivities,
}

/// Everything a report needs about one analysis
#[derive(Debug, Clone)]
pub struct Analysis {
    pub activities: TimeSeriesActivities,
    pub run_windows: Vec<RunWindow>,
    pub selected_characteristics: Vec<ExceptionCharacteristic>,
    pub relevant_process_names: Vec<String>,
    pub still_active_only: bool,
    /// Selected characteristics of relevant processes, joined
    pub console_view: CharacteristicBucket,
    pub persisted: Option<PersistedOutcome>,
    pub elapsed: Duration,
}

impl Analysis {
    pub fn run_count(&self) -> usize {
        self.run_windows.len()
    }

    /// Average wall-clock milliseconds spent per run
    pub fn millis_per_run(&self) -> u128 {
        match self.run_count() {
            0 => 0,
            n => self.elapsed.as_millis() / n as u128,
        }
    }
}

#[derive(Debug, Clone)]
pub struct ExceptionDifferenceAnalyzer {
    config: AnalyzerConfig,
    normalizer: IdentityNormalizer,
}

impl ExceptionDifferenceAnalyzer {
    pub fn new(config: AnalyzerConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self {
            config,
            normalizer: IdentityNormalizer::new()?,
        })
    }

    pub fn config(&self) -> &AnalyzerConfig {
        &self.config
    }

    /// Diff, aggregate and classify without touching any snapshot
    pub fn analyze(&self, sequence: &RunSequence) -> Analysis {
        let stopwatch = Instant::now();
        let activities = self.classify(sequence);
        let console_view = self.console_view(&activities, None);

        Analysis {
            activities,
            run_windows: sequence.windows(),
            selected_characteristics: self.config.selected_characteristics.clone(),
            relevant_process_names: self.config.relevant_process_names.clone(),
            still_active_only: self.config.still_active_only,
            console_view,
            persisted: None,
            elapsed: stopwatch.elapsed(),
        }
    }

    /// Classify, then merge into the snapshot pair held by `store`
    pub fn analyze_persistent<S>(&self, sequence: &RunSequence, store: &mut S) -> Result<Analysis>
    where
        S: SnapshotStore + ?Sized,
    {
        if sequence.is_empty() {
            return Err(ExdriftError::InvalidInput(
                "no test runs to analyse".to_string(),
            ));
        }

        let stopwatch = Instant::now();
        let activities = self.classify(sequence);

        let relevant_processes = &self.config.relevant_process_names;
        let all = activities.all_characteristics_for(relevant_processes);
        let current = RelevanceSnapshot::from_timelines(join_buckets(all.values()));

        let update = relevance::update(
            store,
            &current,
            &self.config.expiry,
            self.config.still_active_only,
        )?;

        let persisted_activities = TimeSeriesActivities::new(update.relevant.timelines().clone());
        let window = sequence.windows();
        let console_view = self.console_view(&persisted_activities, Some(&window));

        Ok(Analysis {
            activities,
            run_windows: window,
            selected_characteristics: self.config.selected_characteristics.clone(),
            relevant_process_names: self.config.relevant_process_names.clone(),
            still_active_only: self.config.still_active_only,
            console_view,
            persisted: Some(PersistedOutcome {
                update,
                activities: persisted_activities,
            }),
            elapsed: stopwatch.elapsed(),
        })
    }

    /// File store in the configured output directory, stamped with the
    /// end of the newest run
    pub fn file_store(&self, sequence: &RunSequence) -> Result<FsSnapshotStore> {
        let stamp = sequence.latest_end().ok_or_else(|| {
            ExdriftError::InvalidInput("no test runs to analyse".to_string())
        })?;
        Ok(FsSnapshotStore::new(
            self.config.output_dir.clone(),
            self.config.analyzer_name.clone(),
            self.config.still_active_only,
            stamp,
        ))
    }

    fn classify(&self, sequence: &RunSequence) -> TimeSeriesActivities {
        let mut progress = DiffLoop::Empty;
        for index in 0..sequence.len() {
            let current = RunExceptions::collect(sequence, index, &self.normalizer);
            tracing::debug!(
                "Run {} has {} unique exceptions",
                index,
                current.identity_count()
            );
            progress = progress.advance(current, sequence);
        }

        let activities = TimeSeriesActivities::new(progress.finish());
        tracing::info!(
            "Diffed {} runs into {} exception timelines",
            sequence.len(),
            activities.identity_count()
        );
        activities
    }

    /// Join the selected characteristics; `window` restricts to identities
    /// seen inside the analysed runs unless only still-active ones are wanted
    fn console_view(
        &self,
        activities: &TimeSeriesActivities,
        window: Option<&[RunWindow]>,
    ) -> CharacteristicBucket {
        let selected: Vec<CharacteristicBucket> = self
            .config
            .selected_characteristics
            .iter()
            .map(|c| activities.characteristic_for(*c, &self.config.relevant_process_names))
            .collect();
        let joined = RelevanceSnapshot::from_timelines(join_buckets(&selected));

        let view = match (self.config.still_active_only, window) {
            (true, _) => joined.still_active(),
            (false, Some(window)) => match (window.first(), window.last()) {
                (Some(first), Some(last)) => {
                    let (from, to) = (first.started_at, last.ended_at);
                    joined.filter(|_, _, records| {
                        records
                            .iter()
                            .any(|r| r.source.performed_at >= from && r.source.performed_at <= to)
                    })
                }
                _ => joined,
            },
            (false, None) => joined,
        };
        view.into_timelines()
    }
}
