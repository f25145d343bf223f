//! Relevance merge with expiry
//!
//! Each invocation merges the freshly classified timelines into the persisted
//! Relevant snapshot, ages out identities whose reference occurrence is not
//! newer than the expiry date, and grows the Irrelevant snapshot. An identity
//! that was ever written as Irrelevant for a test case never returns to
//! Relevant for that test case.

use crate::error::Result;
use crate::model::TransitionRecord;
use crate::snapshot::RelevanceSnapshot;
use crate::store::{SnapshotKind, SnapshotStore};
use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

/// Days an identity stays relevant after its reference occurrence by default
pub const DEFAULT_EXPIRY_DAYS: i64 = 60;

/// When an identity stops being relevant
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExpiryPolicy {
    pub expiry_date: DateTime<Utc>,

    /// Measure from the first occurrence instead of the last one
    pub measure_from_first_occurrence: bool,
}

impl Default for ExpiryPolicy {
    fn default() -> Self {
        Self::days_before(Utc::now(), DEFAULT_EXPIRY_DAYS)
    }
}

impl ExpiryPolicy {
    pub fn new(expiry_date: DateTime<Utc>, measure_from_first_occurrence: bool) -> Self {
        Self {
            expiry_date,
            measure_from_first_occurrence,
        }
    }

    pub fn days_before(now: DateTime<Utc>, days: i64) -> Self {
        Self::new(now - Duration::days(days), false)
    }

    /// Occurrence the expiry date is compared against
    pub fn reference_date(&self, records: &[TransitionRecord]) -> Option<DateTime<Utc>> {
        let dates = records.iter().map(|r| r.source.performed_at);
        if self.measure_from_first_occurrence {
            dates.min()
        } else {
            dates.max()
        }
    }

    /// Strictly newer than the expiry date
    pub fn is_relevant(&self, records: &[TransitionRecord]) -> bool {
        self.reference_date(records)
            .is_some_and(|reference| reference > self.expiry_date)
    }
}

/// Outcome of one merge
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RelevanceUpdate {
    pub relevant: RelevanceSnapshot,
    pub irrelevant: RelevanceSnapshot,
    /// Identities aged out during this merge
    pub expired: usize,
    /// Identities kept out of Relevant because they were already irrelevant
    pub already_irrelevant: usize,
}

/// Merge `current` into the previous snapshot pair
pub fn classify(
    previous_relevant: &RelevanceSnapshot,
    previous_irrelevant: &RelevanceSnapshot,
    current: &RelevanceSnapshot,
    policy: &ExpiryPolicy,
    still_active_only: bool,
) -> RelevanceUpdate {
    let current = if still_active_only {
        current.still_active()
    } else {
        current.clone()
    };
    let candidates = previous_relevant.merge(&current);

    let mut expired = 0;
    let mut already_irrelevant = 0;

    let relevant = candidates.filter(|test_case, identity, records| {
        if previous_irrelevant.contains(test_case, identity) {
            already_irrelevant += 1;
            false
        } else if policy.is_relevant(records) {
            true
        } else {
            expired += 1;
            false
        }
    });
    let newly_irrelevant =
        candidates.filter(|test_case, identity, _| !relevant.contains(test_case, identity));
    let irrelevant = newly_irrelevant.merge(previous_irrelevant);

    tracing::info!(
        "Relevance merge: {} relevant, {} irrelevant ({} expired, {} already irrelevant)",
        relevant.identity_count(),
        irrelevant.identity_count(),
        expired,
        already_irrelevant
    );

    RelevanceUpdate {
        relevant,
        irrelevant,
        expired,
        already_irrelevant,
    }
}

/// Load the previous pair from `store`, merge, save the new pair and prune
///
/// Relevant is written before Irrelevant and stale files are removed last;
/// a failure part way leaves whatever the failing step left behind.
pub fn update<S>(
    store: &mut S,
    current: &RelevanceSnapshot,
    policy: &ExpiryPolicy,
    still_active_only: bool,
) -> Result<RelevanceUpdate>
where
    S: SnapshotStore + ?Sized,
{
    let previous_relevant = store.load(SnapshotKind::Relevant)?;
    let previous_irrelevant = store.load(SnapshotKind::Irrelevant)?;

    let update = classify(
        &previous_relevant,
        &previous_irrelevant,
        current,
        policy,
        still_active_only,
    );

    store.save(SnapshotKind::Relevant, &update.relevant)?;
    store.save(SnapshotKind::Irrelevant, &update.irrelevant)?;
    let pruned = store.prune()?;
    tracing::debug!("Pruned {} stale snapshots", pruned);

    Ok(update)
}
