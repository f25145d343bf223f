// Trend line for report annotation
//
// A timeline is turned into a presence function over the run index
// (1 = exception present in that run) and fitted with ordinary least squares.
// The line is informational only; it never takes part in classification.

use crate::model::{ClusterTag, RunWindow, TransitionRecord};
use trueno::Vector;

/// Presence of an identity per run, as `(run index, 0 or 1)` points
///
/// Only non-edge records are considered. A run carrying a record is 1; runs
/// without a record repeat the level left by the last record (1 after a
/// `Starting`, 0 otherwise). Before the first record the level is 1 when that
/// record is an `Ending`.
pub fn presence_points(records: &[TransitionRecord], runs: &[RunWindow]) -> Vec<(f64, f64)> {
    let core: Vec<&TransitionRecord> = records.iter().filter(|r| !r.is_edge_run()).collect();

    let mut level = match core.first() {
        Some(first) if first.is_tag(ClusterTag::Ending) => 1.0,
        _ => 0.0,
    };

    runs.iter()
        .enumerate()
        .map(|(idx, run)| {
            let here = core
                .iter()
                .find(|r| r.source.run_started_at == run.started_at);
            let value = match here {
                Some(record) => {
                    level = if record.is_tag(ClusterTag::Starting) {
                        1.0
                    } else {
                        0.0
                    };
                    1.0
                }
                None => level,
            };
            (idx as f64, value)
        })
        .collect()
}

/// Least-squares line through presence points
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LinearTrend {
    pub slope: f64,
    pub intercept: f64,
    pub x_mean: f64,
    pub y_mean: f64,
}

impl LinearTrend {
    /// Fit a line; `None` without points. Zero x-variance yields slope 0.
    pub fn fit(points: &[(f64, f64)]) -> Option<Self> {
        if points.is_empty() {
            return None;
        }

        let xs: Vec<f32> = points.iter().map(|(x, _)| *x as f32).collect();
        let ys: Vec<f32> = points.iter().map(|(_, y)| *y as f32).collect();
        let x_mean = f64::from(Vector::from_slice(&xs).mean().unwrap_or(0.0));
        let y_mean = f64::from(Vector::from_slice(&ys).mean().unwrap_or(0.0));

        let (numerator, denominator) = points.iter().fold((0.0, 0.0), |(num, den), (x, y)| {
            let dx = x - x_mean;
            (num + dx * (y - y_mean), den + dx * dx)
        });
        let slope = numerator / denominator;
        let slope = if slope.is_finite() { slope } else { 0.0 };

        Some(Self {
            slope,
            intercept: y_mean - slope * x_mean,
            x_mean,
            y_mean,
        })
    }

    /// `y = 0.07*runidx + 0.07`; the slope term is left out when it rounds to 0
    pub fn equation(&self) -> String {
        let slope = round2(self.slope);
        let intercept = round2(self.intercept);

        let mut equation = String::from("y = ");
        if slope != 0.0 {
            equation.push_str(&format!("{}*runidx ", slope));
        }
        equation.push_str(if intercept >= 0.0 { "+ " } else { "- " });
        equation.push_str(&format!("{}", intercept.abs()));
        equation
    }

    pub fn y_mean_rounded(&self) -> f64 {
        round2(self.y_mean)
    }
}

fn round2(value: f64) -> f64 {
    let rounded = (value * 100.0).round() / 100.0;
    if rounded == 0.0 {
        0.0
    } else {
        rounded
    }
}
