use chrono::{DateTime, Utc};
use gazestat_analysis::{
    aoi::ClassificationSets,
    binning::BinSummary,
    config::AnalysisConfig,
    group::GroupReport,
    sample::SessionKey,
    summary::{BucketSummary, CompareField, ParticipantSummary, ThresholdSplit, TrialSummary},
};
use gazestat_stats::{descriptive::DescriptiveStats, percentiles::Percentiles};
use serde::Serialize;

/// Time series of one participant session
#[derive(Debug, Clone, Serialize)]
pub struct BinsDocument {
    /// When the document was produced
    pub generated_at: DateTime<Utc>,
    pub test_name: String,
    pub participant: String,
    pub session: SessionKey,
    pub sets: ClassificationSets,
    /// Absolute start of bin 0 in milliseconds
    pub anchor_ms: i64,
    /// Bin centers in seconds after the anchor
    pub x_sec: Vec<f64>,
    pub bins: Vec<BinSummary>,
    /// Contrast value per bin
    pub curve: Vec<f64>,
}

/// Group curve with confidence band and cluster significance
#[derive(Debug, Clone, Serialize)]
pub struct GroupDocument {
    pub generated_at: DateTime<Utc>,
    /// Seed of the randomized stages; rerun with it to reproduce the report
    pub seed: u64,
    pub config: AnalysisConfig,
    pub report: GroupReport,
}

/// Whole-trial comparison
#[derive(Debug, Clone, Serialize)]
pub struct SummaryDocument {
    pub generated_at: DateTime<Utc>,
    pub config: AnalysisConfig,
    pub trials: Vec<TrialSummary>,
    pub participants: Vec<ParticipantSummary>,
    pub split: ThresholdSplit,
    /// Distribution of the participant percentages, absent with no participants
    pub distribution: Option<DescriptiveStats>,
    /// Quartiles of the participant percentages
    pub quartiles: Percentiles,
    pub comparisons: Vec<Comparison>,
}

/// Buckets of one catalog field
#[derive(Debug, Clone, Serialize)]
pub struct Comparison {
    pub field: CompareField,
    pub buckets: Vec<BucketSummary>,
}
