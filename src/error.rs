//! Error types for exception-drift analysis
//!
//! Snapshot failures always carry the offending path so a broken CI night can
//! be traced back to the file that stopped the merge.

use std::path::PathBuf;
use thiserror::Error;

/// Errors that can occur while analysing or persisting exception timelines
#[derive(Error, Debug)]
pub enum ExdriftError {
    #[error("Snapshot serialization failed for {path}: {reason}")]
    Serialization { path: PathBuf, reason: String },

    #[error("Can not delete existing file: {path}")]
    Deletion {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Invalid analyzer configuration: {0}")]
    InvalidConfig(String),

    #[error("Invalid run input: {0}")]
    InvalidInput(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl ExdriftError {
    pub(crate) fn serialization(path: impl Into<PathBuf>, reason: impl ToString) -> Self {
        Self::Serialization {
            path: path.into(),
            reason: reason.to_string(),
        }
    }

    /// Path of the snapshot file involved, if any
    pub fn path(&self) -> Option<&std::path::Path> {
        match self {
            Self::Serialization { path, .. } | Self::Deletion { path, .. } => Some(path),
            _ => None,
        }
    }
}

/// Result type for exdrift operations
pub type Result<T> = std::result::Result<T, ExdriftError>;
