//! Whole-trial blue/red summaries.
//!
//! Unlike the time-binned curves, a trial summary counts every sample of a
//! participant on a test at once. Trials roll up into per-participant
//! percentages, which can then be split at a threshold or compared across
//! catalog metadata buckets.
//!
//! Two participant-level percentages are kept:
//!
//! - **discrete**: the plain mean of the participant's trial percentages
//! - **continuous**: blue samples over blue + red samples pooled across trials

use std::collections::BTreeMap;

use gazestat_stats::{descriptive, percentiles};
use serde::{Deserialize, Serialize};

use crate::{
    aoi::{self, AoiSelection, ResolveError},
    binning::{count_classified, pct},
    catalog::{Catalog, CatalogRow},
    sample::{self, GazeSample},
};

/// Counts of one participant on one test.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TrialSummary {
    pub test_name: String,
    pub participant: String,
    /// Recording of the trial's first sample.
    pub recording: String,
    pub total: u64,
    pub valid: u64,
    pub blue: u64,
    pub red: u64,
    pub blue_pct: f64,
    pub valid_pct: f64,
}

/// Which participant percentage is compared against thresholds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, derive_more::FromStr)]
#[serde(rename_all = "snake_case")]
#[from_str(rename_all = "snake_case")]
pub enum SummaryMode {
    /// Mean of trial percentages.
    #[default]
    Discrete,
    /// Pooled blue share.
    Continuous,
}

/// Summarizes every (test, participant) pair of `rows`.
///
/// Trials whose valid percentage is below `min_valid_pct` are dropped.
/// Samples of tests not listed in `rows` are ignored.
pub fn summarize_trials<'a, I>(
    rows: I,
    samples: &[GazeSample],
    selection: &AoiSelection,
    min_valid_pct: f64,
) -> Result<Vec<TrialSummary>, ResolveError>
where
    I: IntoIterator<Item = &'a CatalogRow>,
{
    let trials = sample::group_trials(samples);
    let mut out = vec![];
    for row in rows {
        let sets = aoi::resolve(row, selection)?;
        let test = row.test_name.as_str();
        for ((_, participant), trial) in trials.iter().filter(|((t, _), _)| *t == test) {
            let Some(first) = trial.first() else {
                continue;
            };
            let tally = count_classified(trial.iter().copied(), &sets);
            let valid_pct = tally.valid_pct();
            if valid_pct < min_valid_pct {
                tracing::trace!(test, participant, valid_pct, "trial below valid threshold");
                continue;
            }
            out.push(TrialSummary {
                test_name: row.test_name.clone(),
                participant: (*participant).to_owned(),
                recording: first.session.recording.clone(),
                total: tally.total,
                valid: tally.valid_count(),
                blue: tally.blue_count,
                red: tally.red_count,
                blue_pct: tally.blue_pct(),
                valid_pct,
            });
        }
    }
    tracing::debug!(trials = out.len(), "trials summarized");
    Ok(out)
}

/// Per-participant roll-up of trial summaries.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ParticipantSummary {
    pub participant: String,
    pub trials: usize,
    pub mean_pct: f64,
    pub weighted_pct: f64,
}

impl ParticipantSummary {
    #[must_use]
    pub fn value(&self, mode: SummaryMode) -> f64 {
        match mode {
            SummaryMode::Discrete => self.mean_pct,
            SummaryMode::Continuous => self.weighted_pct,
        }
    }
}

/// Rolls trial summaries up per participant, ordered by participant.
#[must_use]
pub fn summarize_participants<'a, I>(trials: I) -> Vec<ParticipantSummary>
where
    I: IntoIterator<Item = &'a TrialSummary>,
{
    let mut by_participant: BTreeMap<&str, (Vec<f64>, u64, u64)> = BTreeMap::new();
    for trial in trials {
        let (pcts, blue, red) = by_participant.entry(trial.participant.as_str()).or_default();
        pcts.push(trial.blue_pct);
        *blue += trial.blue;
        *red += trial.red;
    }
    by_participant
        .into_iter()
        .map(|(participant, (pcts, blue, red))| ParticipantSummary {
            participant: participant.to_owned(),
            trials: pcts.len(),
            mean_pct: descriptive::mean(&pcts),
            weighted_pct: pct(blue, blue + red),
        })
        .collect()
}

/// Number of participants at or above a threshold and below it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct ThresholdSplit {
    pub above: usize,
    pub below: usize,
}

/// Splits participants by whether their percentage is `>= threshold_pct`.
///
/// ```
/// use gazestat_analysis::summary::{ParticipantSummary, SummaryMode, split_by_threshold};
///
/// let p = |mean_pct, weighted_pct| ParticipantSummary {
///     participant: String::new(),
///     trials: 1,
///     mean_pct,
///     weighted_pct,
/// };
/// let summaries = [p(50.0, 10.0), p(40.0, 90.0)];
/// let split = split_by_threshold(&summaries, 50.0, SummaryMode::Discrete);
/// assert_eq!((split.above, split.below), (1, 1));
/// ```
#[must_use]
pub fn split_by_threshold(
    summaries: &[ParticipantSummary],
    threshold_pct: f64,
    mode: SummaryMode,
) -> ThresholdSplit {
    let above = summaries
        .iter()
        .filter(|s| s.value(mode) >= threshold_pct)
        .count();
    ThresholdSplit {
        above,
        below: summaries.len() - above,
    }
}

/// Catalog field that buckets trials in [`compare_by`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, derive_more::FromStr)]
#[serde(rename_all = "snake_case")]
#[from_str(rename_all = "snake_case")]
pub enum CompareField {
    Group,
    TruthValue,
    OnlyPosition,
    Morpheme,
    Series,
    CaseNo,
}

impl CompareField {
    /// Bucket name of a row; missing values share the bucket `"—"`.
    #[must_use]
    pub fn bucket(self, row: Option<&CatalogRow>) -> String {
        let value = row.and_then(|row| match self {
            Self::Group => row.group.clone(),
            Self::TruthValue => row.truth_value.clone(),
            Self::OnlyPosition => row.only_position.clone(),
            Self::Morpheme => row.morpheme.clone(),
            Self::Series => row.series.clone(),
            Self::CaseNo => row.case_no.map(|n| n.to_string()),
        });
        value.unwrap_or_else(|| "—".to_owned())
    }
}

/// A participant and their percentage within a bucket.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Leader {
    pub participant: String,
    pub pct: f64,
}

/// Participant percentages aggregated over one metadata bucket.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BucketSummary {
    pub bucket: String,
    pub tests: usize,
    pub participants: usize,
    pub mean: f64,
    pub median: f64,
    /// Participants at or above the threshold.
    pub at_or_above: usize,
    /// Up to three participants with the highest percentage.
    pub leaders: Vec<Leader>,
}

/// Groups trials by a catalog field and summarizes each bucket.
///
/// Buckets are ordered by name.
#[must_use]
pub fn compare_by(
    trials: &[TrialSummary],
    catalog: &Catalog,
    field: CompareField,
    mode: SummaryMode,
    threshold_pct: f64,
) -> Vec<BucketSummary> {
    let mut buckets: BTreeMap<String, Vec<&TrialSummary>> = BTreeMap::new();
    for trial in trials {
        let bucket = field.bucket(catalog.find(&trial.test_name));
        buckets.entry(bucket).or_default().push(trial);
    }

    buckets
        .into_iter()
        .map(|(bucket, trials)| {
            let mut tests = trials.iter().map(|t| t.test_name.as_str()).collect::<Vec<_>>();
            tests.sort_unstable();
            tests.dedup();

            let participants = summarize_participants(trials.iter().copied());
            let values = participants
                .iter()
                .map(|p| p.value(mode))
                .collect::<Vec<_>>();
            let mut leaders = participants
                .iter()
                .map(|p| Leader {
                    participant: p.participant.clone(),
                    pct: p.value(mode),
                })
                .collect::<Vec<_>>();
            leaders.sort_by(|a, b| b.pct.total_cmp(&a.pct));
            leaders.truncate(3);

            BucketSummary {
                bucket,
                tests: tests.len(),
                participants: participants.len(),
                mean: descriptive::mean(&values),
                median: percentiles::median(&values),
                at_or_above: split_by_threshold(&participants, threshold_pct, mode).above,
                leaders,
            }
        })
        .collect()
}
