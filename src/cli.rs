//! CLI argument parsing for exdrift

use crate::characteristic::ExceptionCharacteristic;
use clap::{Parser, ValueEnum};
use std::path::PathBuf;

/// Report output format
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    /// Human-readable text format (default)
    Text,
    /// JSON format for machine parsing
    Json,
}

#[derive(Parser, Debug)]
#[command(name = "exdrift")]
#[command(version)]
#[command(
    about = "Classify exceptions across repeated test runs and track them between invocations",
    long_about = None
)]
pub struct Cli {
    /// JSON file holding the ordered test runs
    #[arg(value_name = "INPUT")]
    pub input: PathBuf,

    /// Directory for the relevance snapshot files
    #[arg(long = "out-dir", value_name = "DIR", default_value = ".")]
    pub out_dir: PathBuf,

    /// Analyzer name used as snapshot file prefix
    #[arg(
        long = "analyzer-name",
        value_name = "NAME",
        default_value = crate::config::DEFAULT_ANALYZER_NAME
    )]
    pub analyzer_name: String,

    /// Characteristic to show (repeatable; default: outliers, sporadics, trends)
    #[arg(long = "characteristic", value_name = "C", value_enum)]
    pub characteristics: Vec<ExceptionCharacteristic>,

    /// Only track exceptions whose latest transition is an appearance
    #[arg(long = "still-active-only")]
    pub still_active_only: bool,

    /// Process whose exceptions are relevant (repeatable, substring match)
    #[arg(long = "relevant-process", value_name = "NAME")]
    pub relevant_processes: Vec<String>,

    /// Expiry date: dd.MM.yyyy, yyyy-MM-dd or now-<days> (default: now-60)
    #[arg(long = "expiry-date", value_name = "SPEC")]
    pub expiry_date: Option<String>,

    /// Measure expiry from the first occurrence instead of the last one
    #[arg(long = "expiry-from-first-occurrence")]
    pub expiry_from_first_occurrence: bool,

    /// Merge the result into the persisted snapshot pair
    #[arg(long = "persist")]
    pub persist: bool,

    /// Output format (text or json)
    #[arg(long = "format", value_enum, default_value = "text")]
    pub format: OutputFormat,

    /// Enable debug tracing output to stderr
    #[arg(long = "debug")]
    pub debug: bool,
}
