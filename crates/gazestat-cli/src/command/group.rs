use anyhow::Context as _;
use chrono::Utc;
use gazestat_analysis::{
    config::AnalysisConfig,
    group::{GroupAnalysisRequest, run_group_analysis},
};
use gazestat_stats::cancel::CancelToken;

use crate::{
    command::{ConfigArg, InputArg},
    schema::report::GroupDocument,
    util::{self, Output},
};

#[derive(Debug, Clone, clap::Args)]
pub(crate) struct GroupArg {
    #[clap(flatten)]
    pub(super) input: InputArg,
    #[clap(flatten)]
    pub(super) config: ConfigArg,
    /// Test to include; repeat for several
    #[arg(long = "test", required = true)]
    tests: Vec<String>,
    /// Participant to include; repeat for several (default: everyone)
    #[arg(long = "participant")]
    participants: Vec<String>,
}

pub(crate) fn run(arg: &GroupArg) -> anyhow::Result<()> {
    let GroupArg {
        input,
        config,
        tests,
        participants,
    } = arg;
    let config = config.resolve(input)?;
    let inputs = input.load()?;
    let words = util::read_words_file(input.words.as_deref())?;

    let seed = config.resolve_seed();
    let mut rng = AnalysisConfig::rng(seed);
    let request = GroupAnalysisRequest {
        tests,
        participants: (!participants.is_empty()).then_some(participants.as_slice()),
        config: &config,
    };
    tracing::info!(tests = tests.len(), seed, "running group analysis");
    let report = run_group_analysis(
        &request,
        &inputs.catalog,
        &inputs.samples,
        &words,
        &mut rng,
        &CancelToken::new(),
    )
    .context("Group analysis failed")?;

    if report.participants.is_empty() {
        tracing::warn!("no participant had usable samples");
    }
    tracing::info!(
        participants = report.participants.len(),
        clusters = report.significance.clusters.len(),
        p_value = report.significance.p_value,
        significant = report.significance.any_significant(),
        mean_ci_width = report.curve.mean_ci_width(),
        "group analysis completed"
    );

    let document = GroupDocument {
        generated_at: Utc::now(),
        seed,
        config,
        report,
    };
    Output::save_json(&document, input.output.clone())?;
    Ok(())
}
