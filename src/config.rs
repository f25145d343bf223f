// Analyzer configuration
//
// One configuration names one snapshot pair on disk: the analyzer name and
// the still-active flag form the snapshot file prefix, so two configurations
// sharing an output directory never see each other's files.

use crate::characteristic::ExceptionCharacteristic;
use crate::error::{ExdriftError, Result};
use crate::relevance::ExpiryPolicy;
use chrono::{DateTime, Duration, NaiveDate, TimeZone, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::path::PathBuf;

pub const DEFAULT_ANALYZER_NAME: &str = "ExceptionDifferencePersistentAnalyzer";

/// Configuration of an exception-difference analysis
///
/// # Example
/// ```
/// use exdrift::config::AnalyzerConfig;
/// use exdrift::characteristic::ExceptionCharacteristic;
///
/// let config = AnalyzerConfig::default();
/// assert_eq!(config.analyzer_name, "ExceptionDifferencePersistentAnalyzer");
/// assert_eq!(config.selected_characteristics, ExceptionCharacteristic::DEFAULT_SELECTION.to_vec());
/// assert!(config.validate().is_ok());
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnalyzerConfig {
    /// Prefix of the snapshot files. Must not contain `_` or path separators.
    pub analyzer_name: String,

    /// Characteristics shown in the console view
    pub selected_characteristics: Vec<ExceptionCharacteristic>,

    /// Only track identities whose latest transition is an appearance
    pub still_active_only: bool,

    /// Processes whose exceptions are reported and persisted.
    /// An identity passes when any entry contains its process name; an empty
    /// list passes everything.
    pub relevant_process_names: Vec<String>,

    pub expiry: ExpiryPolicy,

    /// Directory holding the snapshot pair
    pub output_dir: PathBuf,
}

impl Default for AnalyzerConfig {
    fn default() -> Self {
        Self {
            analyzer_name: DEFAULT_ANALYZER_NAME.to_string(),
            selected_characteristics: ExceptionCharacteristic::DEFAULT_SELECTION.to_vec(),
            still_active_only: false,
            relevant_process_names: Vec::new(),
            expiry: ExpiryPolicy::default(),
            output_dir: PathBuf::from("."),
        }
    }
}

impl AnalyzerConfig {
    pub fn with_analyzer_name(mut self, name: impl Into<String>) -> Self {
        self.analyzer_name = name.into();
        self
    }

    /// Replace the selection; an empty iterator keeps the default selection
    pub fn with_characteristics<I>(mut self, characteristics: I) -> Self
    where
        I: IntoIterator<Item = ExceptionCharacteristic>,
    {
        let mut seen = BTreeSet::new();
        let selected: Vec<_> = characteristics
            .into_iter()
            .filter(|c| seen.insert(*c))
            .collect();
        if !selected.is_empty() {
            self.selected_characteristics = selected;
        }
        self
    }

    pub fn with_still_active_only(mut self, still_active_only: bool) -> Self {
        self.still_active_only = still_active_only;
        self
    }

    pub fn with_relevant_processes<I, S>(mut self, names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.relevant_process_names = names.into_iter().map(Into::into).collect();
        self
    }

    pub fn with_expiry(mut self, expiry: ExpiryPolicy) -> Self {
        self.expiry = expiry;
        self
    }

    pub fn with_output_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.output_dir = dir.into();
        self
    }

    pub fn is_selected(&self, characteristic: ExceptionCharacteristic) -> bool {
        self.selected_characteristics.contains(&characteristic)
    }

    /// Validate configuration
    pub fn validate(&self) -> Result<()> {
        if self.analyzer_name.trim().is_empty() {
            return Err(ExdriftError::InvalidConfig(
                "analyzer_name must not be empty".to_string(),
            ));
        }

        if self
            .analyzer_name
            .chars()
            .any(|c| c == '_' || c == '/' || c == '\\' || std::path::is_separator(c))
        {
            return Err(ExdriftError::InvalidConfig(format!(
                "analyzer_name must not contain '_' or path separators, got {:?}",
                self.analyzer_name
            )));
        }

        if self.selected_characteristics.is_empty() {
            return Err(ExdriftError::InvalidConfig(
                "at least one characteristic must be selected".to_string(),
            ));
        }

        if let Some(c) = self
            .selected_characteristics
            .iter()
            .find(|c| !c.is_selectable())
        {
            return Err(ExdriftError::InvalidConfig(format!(
                "{} is not a selectable characteristic",
                c
            )));
        }

        Ok(())
    }
}

/// Parse an expiry date given as `dd.MM.yyyy`, `yyyy-MM-dd` or `now-<days>`
pub fn parse_expiry_date(input: &str, now: DateTime<Utc>) -> Result<DateTime<Utc>> {
    let input = input.trim();

    if let Some(rest) = input.strip_prefix("now") {
        let days = rest
            .trim()
            .strip_prefix('-')
            .map(str::trim)
            .and_then(|days| days.parse::<i64>().ok())
            .filter(|days| *days >= 0)
            .ok_or_else(|| {
                ExdriftError::InvalidConfig(format!(
                    "expected 'now-<days>', got {:?}",
                    input
                ))
            })?;
        return Duration::try_days(days)
            .and_then(|delta| now.checked_sub_signed(delta))
            .ok_or_else(|| {
                ExdriftError::InvalidConfig(format!("expiry date out of range: {:?}", input))
            });
    }

    let date = NaiveDate::parse_from_str(input, "%d.%m.%Y")
        .or_else(|_| NaiveDate::parse_from_str(input, "%Y-%m-%d"))
        .map_err(|_| {
            ExdriftError::InvalidConfig(format!(
                "expiry date must be dd.MM.yyyy, yyyy-MM-dd or now-<days>, got {:?}",
                input
            ))
        })?;
    let midnight = date
        .and_hms_opt(0, 0, 0)
        .ok_or_else(|| ExdriftError::InvalidConfig(format!("invalid date {:?}", input)))?;
    Ok(Utc.from_utc_datetime(&midnight))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 5, 31, 12, 0, 0).unwrap()
    }

    #[test]
    fn test_default_config() {
        let config = AnalyzerConfig::default();
        assert!(!config.still_active_only);
        assert!(config.relevant_process_names.is_empty());
        assert!(!config.expiry.measure_from_first_occurrence);
        assert!(config.expiry.expiry_date < Utc::now() - Duration::days(59));
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_builder() {
        let config = AnalyzerConfig::default()
            .with_analyzer_name("Nightly")
            .with_characteristics([ExceptionCharacteristic::DisjointTrendsConsistentModVDiff])
            .with_relevant_processes(["Vortal.exe"])
            .with_still_active_only(true)
            .with_output_dir("/tmp/out");
        assert!(config.is_selected(ExceptionCharacteristic::DisjointTrendsConsistentModVDiff));
        assert!(!config.is_selected(ExceptionCharacteristic::DisjointTrends));
        assert_eq!(config.relevant_process_names, vec!["Vortal.exe".to_string()]);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_repeated_characteristics_deduplicated() {
        let config = AnalyzerConfig::default().with_characteristics([
            ExceptionCharacteristic::DisjointTrends,
            ExceptionCharacteristic::DisjointOutliers,
            ExceptionCharacteristic::DisjointTrends,
        ]);
        assert_eq!(
            config.selected_characteristics,
            vec![
                ExceptionCharacteristic::DisjointTrends,
                ExceptionCharacteristic::DisjointOutliers,
            ]
        );
    }

    #[test]
    fn test_empty_characteristics_keep_default() {
        let config = AnalyzerConfig::default().with_characteristics([]);
        assert_eq!(config.selected_characteristics.len(), 3);
    }

    #[test]
    #[allow(clippy::field_reassign_with_default)]
    fn test_invalid_analyzer_names() {
        for name in ["", "  ", "My_Analyzer", "dir/analyzer"] {
            let mut config = AnalyzerConfig::default();
            config.analyzer_name = name.to_string();
            assert!(
                matches!(config.validate(), Err(ExdriftError::InvalidConfig(_))),
                "{name:?} accepted"
            );
        }
    }

    #[test]
    #[allow(clippy::field_reassign_with_default)]
    fn test_union_not_selectable() {
        let mut config = AnalyzerConfig::default();
        config.selected_characteristics = vec![ExceptionCharacteristic::Union];
        assert!(config.validate().is_err());

        config.selected_characteristics.clear();
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_parse_expiry_formats() {
        let expected = Utc.with_ymd_and_hms(2024, 3, 1, 0, 0, 0).unwrap();
        assert_eq!(parse_expiry_date("01.03.2024", now()).unwrap(), expected);
        assert_eq!(parse_expiry_date("2024-03-01", now()).unwrap(), expected);
        assert_eq!(
            parse_expiry_date("now-60", now()).unwrap(),
            now() - Duration::days(60)
        );
        assert_eq!(
            parse_expiry_date("now - 7", now()).unwrap(),
            now() - Duration::days(7)
        );
    }

    #[test]
    fn test_parse_expiry_rejects_garbage() {
        for input in [
            "yesterday",
            "now+5",
            "now-",
            "31.02.2024",
            "now--3",
            "now-99999999999999",
            "now-100000000",
        ] {
            assert!(parse_expiry_date(input, now()).is_err(), "{input} accepted");
        }
    }

    #[test]
    fn test_config_serde_round_trip() {
        let config = AnalyzerConfig::default().with_analyzer_name("Nightly");
        let json = serde_json::to_string(&config).unwrap();
        let back: AnalyzerConfig = serde_json::from_str(&json).unwrap();
        assert_eq!(back, config);
    }
}
