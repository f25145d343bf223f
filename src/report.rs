//! Console and JSON rendering of an [`Analysis`]

use crate::analyzer::Analysis;
use crate::characteristic::{bucket_len, ExceptionCharacteristic, DETECTORS};
use crate::model::{ClusterTag, ExceptionIdentity, TransitionRecord};
use crate::trend::{presence_points, LinearTrend};
use serde::Serialize;

/// Counts of one characteristic
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CharacteristicSummary {
    pub characteristic: ExceptionCharacteristic,
    pub total: usize,
    pub relevant: usize,
    /// Relevant identities in the merged snapshot (persistent analyses only)
    pub persisted: Option<usize>,
    pub selected: bool,
    pub per_test_case: Vec<TestCaseCount>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TestCaseCount {
    pub test_case: String,
    pub total: usize,
    pub relevant: usize,
}

pub fn summarize(analysis: &Analysis) -> Vec<CharacteristicSummary> {
    DETECTORS
        .iter()
        .map(|detector| {
            let c = detector.characteristic;
            let all = analysis.activities.characteristic(c);
            let relevant = analysis
                .activities
                .characteristic_for(c, &analysis.relevant_process_names);
            let persisted = analysis.persisted.as_ref().map(|p| {
                bucket_len(&p.activities.characteristic_for(c, &analysis.relevant_process_names))
            });

            let per_test_case = all
                .iter()
                .map(|(test_case, timeline)| TestCaseCount {
                    test_case: test_case.clone(),
                    total: timeline.len(),
                    relevant: relevant.get(test_case).map_or(0, |t| t.len()),
                })
                .collect();

            CharacteristicSummary {
                characteristic: c,
                total: bucket_len(&all),
                relevant: bucket_len(&relevant),
                persisted,
                selected: analysis.selected_characteristics.contains(&c),
                per_test_case,
            }
        })
        .collect()
}

fn occurrence_label(tag: ClusterTag) -> &'static str {
    match tag {
        ClusterTag::Outlier => "Outlier on",
        ClusterTag::Starting => "Trend starts on",
        ClusterTag::Ending => "Trend ends on",
        ClusterTag::Undefinable => "Undefined on",
    }
}

fn trend_of(analysis: &Analysis, records: &[TransitionRecord]) -> Option<LinearTrend> {
    LinearTrend::fit(&presence_points(records, &analysis.run_windows))
}

fn write_identity(
    report: &mut String,
    analysis: &Analysis,
    identity: &ExceptionIdentity,
    records: &[TransitionRecord],
) {
    report.push_str(&format!(
        "  [{}] {}: {}\n",
        identity.process_name, identity.exception_type, identity.message
    ));
    for record in records {
        report.push_str(&format!(
            "    {:<15}: {} {}{}\n",
            occurrence_label(record.tag),
            record.source.performed_at.format("%Y-%m-%d %H:%M:%S"),
            record.source.module_version,
            if record.is_edge_run() { " (edge run)" } else { "" }
        ));
    }
    if let Some(trend) = trend_of(analysis, records) {
        report.push_str(&format!(
            "    {}\t\ty-mean = {}\n",
            trend.equation(),
            trend.y_mean_rounded()
        ));
    }
}

/// Human-readable report
pub fn render_text(analysis: &Analysis) -> String {
    let mut report = String::new();

    report.push_str(&format!(
        "Exception activity over {} test runs: {} exceptions shown{}\n",
        analysis.run_count(),
        bucket_len(&analysis.console_view),
        if analysis.still_active_only {
            " (still active only)"
        } else {
            ""
        }
    ));
    let selection: Vec<&str> = analysis
        .selected_characteristics
        .iter()
        .map(|c| c.as_str())
        .collect();
    report.push_str(&format!("Selected: {}\n", selection.join(", ")));

    for (test_case, timeline) in &analysis.console_view {
        if timeline.is_empty() {
            continue;
        }
        report.push_str(&format!("\n{} ({} exceptions)\n", test_case, timeline.len()));
        for (identity, records) in timeline {
            write_identity(&mut report, analysis, identity, records);
        }
    }

    report.push_str("\n\nTime Series Activities - Overview:\n");
    for summary in summarize(analysis) {
        let mut headline = format!(
            "{} total exception count: {} / from relevant processes: {}",
            summary.characteristic, summary.total, summary.relevant
        );
        if let Some(persisted) = summary.persisted {
            headline.push_str(&format!(" / persisted relevant: {}", persisted));
        }
        report.push_str(&format!(
            "\n{:<100}\t\t{}\n",
            headline,
            if summary.selected {
                "(selected)"
            } else {
                "(unselected)"
            }
        ));
        for count in &summary.per_test_case {
            report.push_str(&format!(
                "{}: {} (total) / {} (relevant)\n",
                count.test_case, count.total, count.relevant
            ));
        }
    }

    if let Some(persisted) = &analysis.persisted {
        report.push_str(&format!(
            "\nSnapshots: {} relevant / {} irrelevant ({} expired now, {} already irrelevant)\n",
            persisted.update.relevant.identity_count(),
            persisted.update.irrelevant.identity_count(),
            persisted.update.expired,
            persisted.update.already_irrelevant
        ));
    }

    report.push_str(&format!(
        "\nElapsed time for analysis: {} seconds\nper TestRun: ~{} ms\n",
        analysis.elapsed.as_secs(),
        analysis.millis_per_run()
    ));
    report
}

#[derive(Serialize)]
struct JsonReport<'a> {
    runs: usize,
    elapsed_ms: u64,
    still_active_only: bool,
    selected: &'a [ExceptionCharacteristic],
    overview: Vec<CharacteristicSummary>,
    exceptions: Vec<JsonException<'a>>,
}

#[derive(Serialize)]
struct JsonException<'a> {
    test_case: &'a str,
    identity: &'a ExceptionIdentity,
    occurrences: &'a [TransitionRecord],
    trend: Option<String>,
    y_mean: Option<f64>,
}

/// Console view as JSON
pub fn render_json(analysis: &Analysis) -> serde_json::Result<String> {
    let exceptions = analysis
        .console_view
        .iter()
        .flat_map(|(test_case, timeline)| {
            timeline.iter().map(move |(identity, records)| {
                let trend = trend_of(analysis, records);
                JsonException {
                    test_case,
                    identity,
                    occurrences: records,
                    trend: trend.map(|t| t.equation()),
                    y_mean: trend.map(|t| t.y_mean_rounded()),
                }
            })
        })
        .collect();

    serde_json::to_string_pretty(&JsonReport {
        runs: analysis.run_count(),
        elapsed_ms: u64::try_from(analysis.elapsed.as_millis()).unwrap_or(u64::MAX),
        still_active_only: analysis.still_active_only,
        selected: &analysis.selected_characteristics,
        overview: summarize(analysis),
        exceptions,
    })
}

impl Analysis {
    /// Generate human-readable report
    pub fn to_report_string(&self) -> String {
        render_text(self)
    }
}
