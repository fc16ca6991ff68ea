use std::{io, num::NonZeroUsize, path::PathBuf};

use clap::{ArgAction, Parser, Subcommand};
use gazestat_analysis::{
    anchor::AnchorSpec,
    catalog::Catalog,
    config::{AnalysisConfig, RedModeName},
    curve::{ContrastMetric, SessionAggregation},
    sample::GazeSample,
};
use tracing_subscriber::EnvFilter;

use crate::util;

use self::{bins::BinsArg, group::GroupArg, summary::SummaryArg};

mod bins;
mod group;
mod summary;

#[derive(Debug, Clone, Parser)]
#[command(author, version, about, long_about = None)]
pub struct CommandArgs {
    /// Raise log verbosity (-v debug, -vv trace); overrides RUST_LOG
    #[arg(short, long, global = true, action = ArgAction::Count)]
    verbose: u8,
    #[command(subcommand)]
    mode: Mode,
}

#[derive(Debug, Clone, Subcommand)]
enum Mode {
    /// Bin one participant session and print its time series
    Bins(#[clap(flatten)] BinsArg),
    /// Group curve with bootstrap band and cluster permutation test
    Group(#[clap(flatten)] GroupArg),
    /// Whole-trial summaries, threshold split and bucket comparison
    Summary(#[clap(flatten)] SummaryArg),
}

pub fn run() -> anyhow::Result<()> {
    let args = CommandArgs::parse();
    init_tracing(args.verbose);
    match &args.mode {
        Mode::Bins(arg) => bins::run(arg)?,
        Mode::Group(arg) => group::run(arg)?,
        Mode::Summary(arg) => summary::run(arg)?,
    }
    Ok(())
}

fn init_tracing(verbose: u8) {
    let filter = match verbose {
        0 => EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        1 => EnvFilter::new("debug"),
        _ => EnvFilter::new("trace"),
    };
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(io::stderr)
        .init();
}

/// Input files shared by every subcommand
#[derive(Debug, Clone, clap::Args)]
pub(crate) struct InputArg {
    /// Gaze samples JSON file
    #[arg(long)]
    samples: PathBuf,
    /// Test catalog JSON file
    #[arg(long)]
    catalog: PathBuf,
    /// Word windows JSON file (needed for word-onset anchors)
    #[arg(long)]
    words: Option<PathBuf>,
    /// Analysis configuration JSON file
    #[arg(long)]
    config: Option<PathBuf>,
    /// Output file path
    #[arg(long)]
    output: Option<PathBuf>,
}

pub(crate) struct Inputs {
    samples: Vec<GazeSample>,
    catalog: Catalog,
}

impl InputArg {
    fn load(&self) -> anyhow::Result<Inputs> {
        Ok(Inputs {
            samples: util::read_samples_file(&self.samples)?,
            catalog: util::read_catalog_file(&self.catalog)?,
        })
    }
}

/// Command-line overrides of the configuration file
#[derive(Debug, Clone, Default, clap::Args)]
pub(crate) struct ConfigArg {
    /// Bin width in milliseconds
    #[arg(long)]
    bin_width_ms: Option<u32>,
    /// Number of bins
    #[arg(long)]
    num_bins: Option<usize>,
    /// Shift added to every anchor in milliseconds
    #[arg(long, allow_negative_numbers = true)]
    shift_ms: Option<i64>,
    /// Anchor at the onset of this word
    #[arg(long, conflicts_with = "offset_ms")]
    word: Option<String>,
    /// Anchor at this offset from the session start in milliseconds
    #[arg(long)]
    offset_ms: Option<i64>,
    /// Contrast metric (diff_pct, blue_share)
    #[arg(long)]
    metric: Option<ContrastMetric>,
    /// Session aggregation (mean, median, weighted)
    #[arg(long)]
    aggregation: Option<SessionAggregation>,
    /// Blue AOI field; repeat for several
    #[arg(long = "blue-key")]
    blue_keys: Vec<String>,
    /// Red AOI field; repeat for several (switches to custom red mode)
    #[arg(long = "red-key")]
    red_keys: Vec<String>,
    /// Bootstrap resamples per bin
    #[arg(long)]
    n_boot: Option<usize>,
    /// Two-sided level of the confidence band
    #[arg(long)]
    alpha: Option<f64>,
    /// Cluster-forming |t| threshold
    #[arg(long)]
    threshold: Option<f64>,
    /// Sign-flip permutations
    #[arg(long)]
    n_perm: Option<usize>,
    /// Random seed
    #[arg(long)]
    seed: Option<u64>,
    /// Worker threads
    #[arg(long)]
    threads: Option<NonZeroUsize>,
}

impl ConfigArg {
    /// Loads the configuration file (if any) and applies the overrides.
    pub(crate) fn resolve(&self, input: &InputArg) -> anyhow::Result<AnalysisConfig> {
        let mut config = util::read_config_file(input.config.as_deref())?;
        macro_rules! set {
            ($($field:ident),*) => {
                $(if let Some(value) = self.$field {
                    config.$field = value;
                })*
            };
        }
        set!(bin_width_ms, num_bins, shift_ms, metric, aggregation, n_boot, alpha, threshold, n_perm);
        if self.seed.is_some() {
            config.seed = self.seed;
        }
        if self.threads.is_some() {
            config.threads = self.threads;
        }
        if let Some(word) = &self.word {
            config.anchor = AnchorSpec::WordOnset {
                word: Some(word.clone()),
            };
        }
        if let Some(offset_ms) = self.offset_ms {
            config.anchor = AnchorSpec::SessionStart { offset_ms };
        }
        if !self.blue_keys.is_empty() {
            config.blue_keys.clone_from(&self.blue_keys);
        }
        if !self.red_keys.is_empty() {
            config.red_mode = RedModeName::Custom;
            config.red_keys.clone_from(&self.red_keys);
        }
        let config = config.sanitized();
        tracing::debug!(?config, "configuration resolved");
        Ok(config)
    }
}
