use anyhow::Context as _;
use chrono::Utc;
use gazestat_analysis::{
    anchor::resolve_anchor,
    aoi,
    binning::{BinParams, bin_centers_sec, build_bins},
    curve::build_curve,
    sample,
};

use crate::{
    command::{ConfigArg, InputArg},
    schema::report::BinsDocument,
    util::{self, Output},
};

#[derive(Debug, Clone, clap::Args)]
pub(crate) struct BinsArg {
    #[clap(flatten)]
    input: InputArg,
    #[clap(flatten)]
    config: ConfigArg,
    /// Test name
    #[arg(long)]
    test: String,
    /// Participant name
    #[arg(long)]
    participant: String,
    /// Recording name; defaults to the participant's first session
    #[arg(long)]
    recording: Option<String>,
}

pub(crate) fn run(arg: &BinsArg) -> anyhow::Result<()> {
    let BinsArg {
        input,
        config,
        test,
        participant,
        recording,
    } = arg;
    let config = config.resolve(input)?;
    let inputs = input.load()?;
    let words = util::read_words_file(input.words.as_deref())?;

    let row = inputs
        .catalog
        .find(test)
        .with_context(|| format!("Test {test:?} is not in the catalog"))?;
    let sets = aoi::resolve(row, &config.selection())
        .with_context(|| format!("Failed to resolve AOIs of test {test:?}"))?;

    let groups = sample::group_sessions(&inputs.samples, test);
    let sessions = groups
        .get(participant.as_str())
        .with_context(|| format!("No samples of participant {participant:?} on test {test:?}"))?;
    let (session, session_samples) = sessions
        .iter()
        .find(|(key, _)| recording.as_ref().is_none_or(|r| key.recording == *r))
        .with_context(|| format!("No recording {recording:?} for participant {participant:?}"))?;

    let base_ms = session_samples
        .iter()
        .map(|s| s.timestamp_ms)
        .min()
        .context("Session has no samples")?;
    let windows = words
        .iter()
        .filter(|w| w.test_name == *test)
        .cloned()
        .collect::<Vec<_>>();
    let anchor_ms = resolve_anchor(base_ms, &config.anchor, config.shift_ms, &windows)
        .unwrap_or_else(|err| {
            tracing::warn!(%err, "falling back to the session start as anchor");
            base_ms.saturating_add(config.shift_ms)
        });

    let params = BinParams {
        anchor_ms,
        bin_width_ms: config.bin_width_ms,
        num_bins: config.num_bins,
    };
    let bins = build_bins(session_samples.iter().copied(), &params, &sets);
    let valid_bins = bins.iter().filter(|b| b.valid_count() > 0).count();
    tracing::info!(
        samples = session_samples.len(),
        bins = bins.len(),
        valid_bins,
        anchor_ms,
        "session binned"
    );

    let document = BinsDocument {
        generated_at: Utc::now(),
        test_name: test.clone(),
        participant: participant.clone(),
        session: (*session).clone(),
        sets,
        anchor_ms,
        x_sec: bin_centers_sec(config.bin_width_ms, config.num_bins),
        curve: build_curve(&bins, config.metric),
        bins,
    };
    Output::save_json(&document, input.output.clone())?;
    Ok(())
}
