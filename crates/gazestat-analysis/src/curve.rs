//! Per-session contrast curves and their per-participant aggregation.

use gazestat_stats::{descriptive, percentiles};
use serde::{Deserialize, Serialize};

use crate::binning::BinSummary;

/// Scalar derived from each bin.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, derive_more::FromStr)]
#[serde(rename_all = "snake_case")]
#[from_str(rename_all = "snake_case")]
pub enum ContrastMetric {
    /// `blue_pct − red_pct`, in `[-100, 100]`.
    #[default]
    DiffPct,
    /// `blue_pct`, in `[0, 100]`.
    BlueShare,
}

impl ContrastMetric {
    #[must_use]
    pub fn value(self, bin: &BinSummary) -> f64 {
        match self {
            Self::DiffPct => bin.blue_pct() - bin.red_pct(),
            Self::BlueShare => bin.blue_pct(),
        }
    }
}

/// Maps each bin to its contrast value; the output has one value per bin.
///
/// ```
/// use gazestat_analysis::{binning::BinSummary, curve::{ContrastMetric, build_curve}};
///
/// let bin = BinSummary { blue_count: 3, red_count: 1, total: 4, ..BinSummary::empty(0) };
/// assert_eq!(build_curve(&[bin], ContrastMetric::DiffPct), vec![50.0]);
/// assert_eq!(build_curve(&[bin], ContrastMetric::BlueShare), vec![75.0]);
/// ```
#[must_use]
pub fn build_curve(bins: &[BinSummary], metric: ContrastMetric) -> Vec<f64> {
    bins.iter().map(|bin| metric.value(bin)).collect()
}

/// Curve of one session together with the valid-sample count of every bin.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SessionCurve {
    pub values: Vec<f64>,
    pub weights: Vec<u64>,
}

impl SessionCurve {
    #[must_use]
    pub fn from_bins(bins: &[BinSummary], metric: ContrastMetric) -> Self {
        Self {
            values: build_curve(bins, metric),
            weights: bins.iter().map(BinSummary::valid_count).collect(),
        }
    }
}

/// How a participant's session curves are combined.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, derive_more::FromStr)]
#[serde(rename_all = "snake_case")]
#[from_str(rename_all = "snake_case")]
pub enum SessionAggregation {
    #[default]
    Mean,
    Median,
    /// Mean weighted by each session's valid-sample count in the bin; falls
    /// back to the plain mean where every weight is zero.
    Weighted,
}

/// Combines session curves bin by bin into one curve of length `bins`.
///
/// The combined weights are the summed valid counts of every bin, so a `0.0`
/// value with weight 0 means no data rather than no preference.
///
/// Returns `None` when there are no sessions. Shorter session curves count
/// as `0.0` (with zero weight) at the missing bins.
#[must_use]
pub fn aggregate_sessions(
    sessions: &[SessionCurve],
    bins: usize,
    mode: SessionAggregation,
) -> Option<SessionCurve> {
    if sessions.is_empty() {
        return None;
    }
    let mut column = Vec::with_capacity(sessions.len());
    let values = (0..bins)
        .map(|t| {
            column.clear();
            column.extend(
                sessions
                    .iter()
                    .map(|s| s.values.get(t).copied().unwrap_or(0.0)),
            );
            match mode {
                SessionAggregation::Mean => descriptive::mean(&column),
                SessionAggregation::Median => percentiles::median(&column),
                SessionAggregation::Weighted => weighted_mean(sessions, t, &column),
            }
        })
        .collect();
    let weights = (0..bins)
        .map(|t| {
            sessions
                .iter()
                .map(|s| s.weights.get(t).copied().unwrap_or(0))
                .sum::<u64>()
        })
        .collect();
    Some(SessionCurve { values, weights })
}

#[expect(clippy::cast_precision_loss)]
fn weighted_mean(sessions: &[SessionCurve], t: usize, column: &[f64]) -> f64 {
    let weights = sessions
        .iter()
        .map(|s| s.weights.get(t).copied().unwrap_or(0));
    let (sum, total) = column
        .iter()
        .zip(weights)
        .fold((0.0, 0_u64), |(sum, total), (&v, w)| {
            (sum + v * w as f64, total + w)
        });
    if total == 0 {
        descriptive::mean(column)
    } else {
        sum / total as f64
    }
}

/// Aggregated curve of one participant on one test.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ParticipantCurve {
    pub participant: String,
    pub test_name: String,
    /// Number of sessions that contributed.
    pub sessions: usize,
    pub values: Vec<f64>,
    /// Valid samples behind each value, summed over sessions.
    pub weights: Vec<u64>,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn session(values: &[f64], weights: &[u64]) -> SessionCurve {
        SessionCurve {
            values: values.to_vec(),
            weights: weights.to_vec(),
        }
    }

    #[test]
    fn test_metric_ranges() {
        let all_red = BinSummary {
            total: 2,
            red_count: 2,
            ..BinSummary::empty(0)
        };
        assert_eq!(ContrastMetric::DiffPct.value(&all_red), -100.0);
        assert_eq!(ContrastMetric::BlueShare.value(&all_red), 0.0);
        let nothing = BinSummary::empty(1);
        assert_eq!(ContrastMetric::DiffPct.value(&nothing), 0.0);
    }

    #[test]
    fn test_session_curve_weights_are_valid_counts() {
        let bin = BinSummary {
            total: 5,
            invalid_count: 2,
            blue_count: 1,
            red_count: 1,
            index: 0,
        };
        let curve = SessionCurve::from_bins(&[bin], ContrastMetric::DiffPct);
        assert_eq!(curve.values, vec![0.0]);
        assert_eq!(curve.weights, vec![3]);
    }

    #[test]
    fn test_no_sessions() {
        assert_eq!(aggregate_sessions(&[], 3, SessionAggregation::Mean), None);
    }

    #[test]
    fn test_mean_and_median() {
        let sessions = [
            session(&[10.0, 0.0], &[1, 1]),
            session(&[20.0, 0.0], &[1, 1]),
            session(&[90.0, 30.0], &[1, 1]),
            session(&[40.0, 10.0], &[1, 1]),
        ];
        let mean = aggregate_sessions(&sessions, 2, SessionAggregation::Mean).unwrap();
        assert_eq!(mean.values, vec![40.0, 10.0]);
        assert_eq!(mean.weights, vec![4, 4]);
        let median = aggregate_sessions(&sessions, 2, SessionAggregation::Median).unwrap();
        assert_eq!(median.values, vec![30.0, 5.0]);
    }

    #[test]
    fn test_weighted() {
        let sessions = [session(&[100.0, 50.0], &[3, 0]), session(&[0.0, 10.0], &[1, 0])];
        let curve = aggregate_sessions(&sessions, 2, SessionAggregation::Weighted).unwrap();
        assert_eq!(curve.values, vec![75.0, 30.0]);
        assert_eq!(curve.weights, vec![4, 0]);
    }

    #[test]
    fn test_short_sessions_padded() {
        let sessions = [session(&[20.0], &[1]), session(&[40.0, 60.0], &[1, 1])];
        let curve = aggregate_sessions(&sessions, 3, SessionAggregation::Mean).unwrap();
        assert_eq!(curve.values, vec![30.0, 30.0, 0.0]);
        assert_eq!(curve.weights, vec![2, 1, 0]);
    }

    #[test]
    fn test_weights_tell_empty_bin_from_even_split() {
        let even = BinSummary {
            total: 4,
            blue_count: 2,
            red_count: 2,
            ..BinSummary::empty(0)
        };
        let bins = [even, BinSummary::empty(1)];
        let sessions = [
            SessionCurve::from_bins(&bins, ContrastMetric::DiffPct),
            SessionCurve::from_bins(&bins, ContrastMetric::DiffPct),
        ];
        let curve = aggregate_sessions(&sessions, 2, SessionAggregation::Mean).unwrap();
        assert_eq!(curve.values, vec![0.0, 0.0]);
        assert_eq!(curve.weights, vec![8, 0]);
    }

    #[test]
    fn test_parse_names() {
        assert_eq!("median".parse::<SessionAggregation>().ok(), Some(SessionAggregation::Median));
        assert_eq!("diff_pct".parse::<ContrastMetric>().ok(), Some(ContrastMetric::DiffPct));
        assert_eq!("blue_share".parse::<ContrastMetric>().ok(), Some(ContrastMetric::BlueShare));
        assert!("mode".parse::<SessionAggregation>().is_err());
        // Same spelling as the configuration file.
        assert_eq!(
            serde_json::to_value(ContrastMetric::BlueShare).unwrap(),
            serde_json::Value::from("blue_share")
        );
    }
}
