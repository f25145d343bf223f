//! exdrift - exception drift analysis over repeated test runs
//!
//! This library diffs the exceptions recorded in consecutive test runs,
//! classifies each exception's presence pattern (outlier, trend, sporadic,
//! split by build-change consistency) and keeps a durable relevance
//! classification across invocations in a pair of JSON snapshots.

pub mod analyzer;
pub mod characteristic;
pub mod cli;
pub mod config;
pub mod diff;
pub mod error;
pub mod model;
pub mod relevance;
pub mod report;
pub mod snapshot;
pub mod store;
pub mod timeline;
pub mod trend;

pub use error::{ExdriftError, Result};
