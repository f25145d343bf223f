//! Snapshot persistence
//!
//! A [`SnapshotStore`] owns the Relevant/Irrelevant snapshot pair of one
//! analyzer configuration. [`FsSnapshotStore`] keeps them as timestamped JSON
//! files in an output directory:
//!
//! `{StillActive}{AnalyzerName}{DetectionRelevantException_|DetectionIrrelevantException_}{yyyyMMdd-HHmmss}.json`
//!
//! The newest file is found by prefix match and a descending sort of the
//! names. No lock is taken on the directory; one process per directory and
//! configuration is assumed.

use crate::error::{ExdriftError, Result};
use crate::snapshot::RelevanceSnapshot;
use chrono::{DateTime, Utc};
use std::collections::HashMap;
use std::path::{Path, PathBuf};

const STILL_ACTIVE_MARKER: &str = "StillActive";
const STAMP_FORMAT: &str = "%Y%m%d-%H%M%S";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SnapshotKind {
    Relevant,
    Irrelevant,
}

impl SnapshotKind {
    pub const ALL: [SnapshotKind; 2] = [SnapshotKind::Relevant, SnapshotKind::Irrelevant];

    fn file_tag(self) -> &'static str {
        match self {
            SnapshotKind::Relevant => "DetectionRelevantException_",
            SnapshotKind::Irrelevant => "DetectionIrrelevantException_",
        }
    }
}

/// Durable home of the snapshot pair
pub trait SnapshotStore {
    /// Newest snapshot of `kind`, empty when none was written yet
    fn load(&self, kind: SnapshotKind) -> Result<RelevanceSnapshot>;

    fn save(&mut self, kind: SnapshotKind, snapshot: &RelevanceSnapshot) -> Result<()>;

    /// Remove every stored snapshot except the ones saved through this store.
    /// Returns the number of removed snapshots.
    fn prune(&mut self) -> Result<usize>;
}

/// Snapshot files in one output directory
#[derive(Debug, Clone)]
pub struct FsSnapshotStore {
    dir: PathBuf,
    analyzer_name: String,
    still_active_only: bool,
    stamp: DateTime<Utc>,
    written: Vec<PathBuf>,
}

impl FsSnapshotStore {
    /// `stamp` is the end time of the newest analysed run
    pub fn new(
        dir: impl Into<PathBuf>,
        analyzer_name: impl Into<String>,
        still_active_only: bool,
        stamp: DateTime<Utc>,
    ) -> Self {
        Self {
            dir: dir.into(),
            analyzer_name: analyzer_name.into(),
            still_active_only,
            stamp,
            written: Vec::new(),
        }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Files written by this store so far
    pub fn written(&self) -> &[PathBuf] {
        &self.written
    }

    /// File name prefix up to and including the last `_`
    pub fn file_prefix(&self, kind: SnapshotKind) -> String {
        format!(
            "{}{}{}",
            if self.still_active_only {
                STILL_ACTIVE_MARKER
            } else {
                ""
            },
            self.analyzer_name,
            kind.file_tag()
        )
    }

    pub fn file_path(&self, kind: SnapshotKind) -> PathBuf {
        self.dir.join(format!(
            "{}{}.json",
            self.file_prefix(kind),
            self.stamp.format(STAMP_FORMAT)
        ))
    }

    /// All stored files of `kind`, newest first
    pub fn list(&self, kind: SnapshotKind) -> Result<Vec<PathBuf>> {
        if !self.dir.is_dir() {
            return Ok(Vec::new());
        }

        let prefix = self.file_prefix(kind);
        let mut files = Vec::new();
        for entry in std::fs::read_dir(&self.dir)? {
            let path = entry?.path();
            let matches = path
                .file_name()
                .and_then(|name| name.to_str())
                .is_some_and(|name| name.starts_with(&prefix) && name.ends_with(".json"));
            if matches && path.is_file() {
                files.push(path);
            }
        }

        files.sort();
        files.reverse();
        Ok(files)
    }

    /// Newest stored file of `kind`
    pub fn locate(&self, kind: SnapshotKind) -> Result<Option<PathBuf>> {
        Ok(self.list(kind)?.into_iter().next())
    }
}

impl SnapshotStore for FsSnapshotStore {
    fn load(&self, kind: SnapshotKind) -> Result<RelevanceSnapshot> {
        let Some(path) = self.locate(kind)? else {
            tracing::debug!("No {:?} snapshot in {}", kind, self.dir.display());
            return Ok(RelevanceSnapshot::new());
        };

        let content =
            std::fs::read_to_string(&path).map_err(|e| ExdriftError::serialization(&path, e))?;
        let snapshot =
            RelevanceSnapshot::from_json(&content).map_err(|e| ExdriftError::serialization(&path, e))?;

        tracing::info!(
            "Loaded {:?} snapshot {} ({} identities)",
            kind,
            path.display(),
            snapshot.identity_count()
        );
        Ok(snapshot)
    }

    fn save(&mut self, kind: SnapshotKind, snapshot: &RelevanceSnapshot) -> Result<()> {
        let path = self.file_path(kind);

        std::fs::create_dir_all(&self.dir).map_err(|e| ExdriftError::serialization(&path, e))?;
        let json = snapshot
            .to_json()
            .map_err(|e| ExdriftError::serialization(&path, e))?;
        std::fs::write(&path, json).map_err(|e| ExdriftError::serialization(&path, e))?;

        tracing::info!(
            "Wrote {:?} snapshot {} ({} identities)",
            kind,
            path.display(),
            snapshot.identity_count()
        );
        if !self.written.contains(&path) {
            self.written.push(path);
        }
        Ok(())
    }

    fn prune(&mut self) -> Result<usize> {
        let mut removed = 0;
        for kind in SnapshotKind::ALL {
            for path in self.list(kind)? {
                if self.written.contains(&path) {
                    continue;
                }
                remove_snapshot(&path)?;
                tracing::debug!("Pruned stale snapshot {}", path.display());
                removed += 1;
            }
        }
        Ok(removed)
    }
}

fn remove_snapshot(path: &Path) -> Result<()> {
    std::fs::remove_file(path).map_err(|source| ExdriftError::Deletion {
        path: path.to_path_buf(),
        source,
    })
}

/// In-memory store keeping every saved generation
#[derive(Debug, Clone, Default)]
pub struct MemorySnapshotStore {
    generations: HashMap<SnapshotKind, Vec<RelevanceSnapshot>>,
    saved_since_prune: HashMap<SnapshotKind, usize>,
}

impl MemorySnapshotStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Store pre-seeded with one generation per kind
    pub fn with_snapshots(relevant: RelevanceSnapshot, irrelevant: RelevanceSnapshot) -> Self {
        let mut store = Self::new();
        store.generations.insert(SnapshotKind::Relevant, vec![relevant]);
        store.generations.insert(SnapshotKind::Irrelevant, vec![irrelevant]);
        store
    }

    /// Number of stored generations of `kind`
    pub fn generation_count(&self, kind: SnapshotKind) -> usize {
        self.generations.get(&kind).map_or(0, Vec::len)
    }
}

impl SnapshotStore for MemorySnapshotStore {
    fn load(&self, kind: SnapshotKind) -> Result<RelevanceSnapshot> {
        Ok(self
            .generations
            .get(&kind)
            .and_then(|generations| generations.last())
            .cloned()
            .unwrap_or_default())
    }

    fn save(&mut self, kind: SnapshotKind, snapshot: &RelevanceSnapshot) -> Result<()> {
        self.generations.entry(kind).or_default().push(snapshot.clone());
        *self.saved_since_prune.entry(kind).or_default() += 1;
        Ok(())
    }

    fn prune(&mut self) -> Result<usize> {
        let mut removed = 0;
        for (kind, generations) in &mut self.generations {
            let keep = self.saved_since_prune.get(kind).copied().unwrap_or(0);
            let stale = generations.len().saturating_sub(keep);
            generations.drain(..stale);
            removed += stale;
        }
        self.saved_since_prune.clear();
        Ok(removed)
    }
}
