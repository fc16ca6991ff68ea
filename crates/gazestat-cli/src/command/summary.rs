use anyhow::Context as _;
use chrono::Utc;
use gazestat_analysis::{
    catalog::CatalogFilter,
    summary::{
        CompareField, SummaryMode, compare_by, split_by_threshold, summarize_participants,
        summarize_trials,
    },
};
use gazestat_stats::{descriptive::DescriptiveStats, percentiles::Percentiles};

use crate::{
    command::{ConfigArg, InputArg},
    schema::report::{Comparison, SummaryDocument},
    util::Output,
};

const QUARTILES: [f64; 3] = [25.0, 50.0, 75.0];

#[derive(Debug, Clone, clap::Args)]
pub(crate) struct SummaryArg {
    #[clap(flatten)]
    pub(super) input: InputArg,
    #[clap(flatten)]
    pub(super) config: ConfigArg,
    /// Only tests of this group
    #[arg(long)]
    group: Option<String>,
    /// Only tests with this truth value
    #[arg(long)]
    truth_value: Option<String>,
    /// Only tests with this position
    #[arg(long)]
    only_position: Option<String>,
    /// Only tests with this morpheme
    #[arg(long)]
    morpheme: Option<String>,
    /// Only tests of this series
    #[arg(long)]
    series: Option<String>,
    /// Only tests with this case number
    #[arg(long)]
    case_no: Option<i64>,
    /// Drop trials whose valid-sample percentage is below this
    #[arg(long)]
    min_valid_pct: Option<f64>,
    /// Threshold percentage of the participant split
    #[arg(long)]
    threshold_pct: Option<f64>,
    /// Participant percentage to compare (discrete, continuous)
    #[arg(long)]
    pub(super) mode: Option<SummaryMode>,
    /// Catalog field to bucket by (group, truth_value, only_position,
    /// morpheme, series, case_no); repeat for several
    #[arg(long = "compare-by")]
    pub(super) compare_by: Vec<CompareField>,
}

pub(crate) fn run(arg: &SummaryArg) -> anyhow::Result<()> {
    let mut config = arg.config.resolve(&arg.input)?;
    if let Some(pct) = arg.min_valid_pct {
        config.min_valid_pct = pct;
    }
    if let Some(pct) = arg.threshold_pct {
        config.threshold_pct = pct;
    }
    if let Some(mode) = arg.mode {
        config.summary_mode = mode;
    }
    let inputs = arg.input.load()?;

    let filter = CatalogFilter {
        group: arg.group.clone(),
        truth_value: arg.truth_value.clone(),
        only_position: arg.only_position.clone(),
        morpheme: arg.morpheme.clone(),
        series: arg.series.clone(),
        case_no: arg.case_no,
    };
    let trials = summarize_trials(
        inputs.catalog.filter(&filter),
        &inputs.samples,
        &config.selection(),
        config.min_valid_pct,
    )
    .context("Failed to summarize trials")?;
    let participants = summarize_participants(&trials);
    let split = split_by_threshold(&participants, config.threshold_pct, config.summary_mode);
    tracing::info!(
        trials = trials.len(),
        participants = participants.len(),
        above = split.above,
        below = split.below,
        "trials summarized"
    );

    let values = participants
        .iter()
        .map(|p| p.value(config.summary_mode))
        .collect::<Vec<_>>();
    let comparisons = arg
        .compare_by
        .iter()
        .map(|&field| Comparison {
            field,
            buckets: compare_by(
                &trials,
                &inputs.catalog,
                field,
                config.summary_mode,
                config.threshold_pct,
            ),
        })
        .collect();

    let document = SummaryDocument {
        generated_at: Utc::now(),
        distribution: DescriptiveStats::new(values.iter().copied()),
        quartiles: Percentiles::new(&values, &QUARTILES),
        config,
        trials,
        participants,
        split,
        comparisons,
    };
    Output::save_json(&document, arg.input.output.clone())?;
    Ok(())
}
