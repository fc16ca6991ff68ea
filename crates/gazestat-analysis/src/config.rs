//! Analysis configuration.
//!
//! [`AnalysisConfig`] gathers every tunable of the pipeline. It deserializes
//! from JSON with every field optional:
//!
//! ```
//! use gazestat_analysis::config::AnalysisConfig;
//!
//! let config: AnalysisConfig = serde_json::from_str(r#"{"num_bins": 10, "n_perm": 0}"#).unwrap();
//! assert_eq!(config.num_bins, 10);
//! assert_eq!(config.bin_width_ms, 100);
//! assert_eq!(config.blue_keys, vec!["correct_AOIs".to_owned()]);
//! ```

use std::num::NonZeroUsize;

use gazestat_stats::{
    bootstrap::{self, BootstrapParams},
    cluster::{self, PermutationParams},
};
use rand::{Rng as _, SeedableRng as _};
use rand_pcg::Pcg32;
use serde::{Deserialize, Serialize};

use crate::{
    anchor::AnchorSpec,
    aoi::{AoiSelection, InvalidCategory, RedMode},
    catalog,
    curve::{ContrastMetric, SessionAggregation},
    summary::SummaryMode,
};

/// Blue field used when none is configured.
pub const DEFAULT_BLUE_KEY: &str = "correct_AOIs";

/// How the red set is chosen, as written in configuration files.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RedModeName {
    #[default]
    Auto,
    Custom,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AnalysisConfig {
    pub bin_width_ms: u32,
    pub num_bins: usize,
    pub anchor: AnchorSpec,
    /// Added to every anchor.
    pub shift_ms: i64,
    pub metric: ContrastMetric,
    pub aggregation: SessionAggregation,
    pub blue_keys: Vec<String>,
    pub red_mode: RedModeName,
    /// Red fields for [`RedModeName::Custom`].
    pub red_keys: Vec<String>,
    pub invalid: Vec<InvalidCategory>,
    pub n_boot: usize,
    pub alpha: f64,
    /// `|t|` threshold of the cluster test.
    pub threshold: f64,
    pub n_perm: usize,
    pub significance: f64,
    /// Seed of the analysis generator; `None` draws one from the OS.
    pub seed: Option<u64>,
    pub threads: Option<NonZeroUsize>,
    /// Trials whose valid percentage is below this are left out of summaries.
    pub min_valid_pct: f64,
    pub threshold_pct: f64,
    pub summary_mode: SummaryMode,
}

impl Default for AnalysisConfig {
    fn default() -> Self {
        Self {
            bin_width_ms: 100,
            num_bins: 25,
            anchor: AnchorSpec::default(),
            shift_ms: 200,
            metric: ContrastMetric::default(),
            aggregation: SessionAggregation::default(),
            blue_keys: vec![DEFAULT_BLUE_KEY.to_owned()],
            red_mode: RedModeName::default(),
            red_keys: vec![],
            invalid: vec![InvalidCategory::Missing],
            n_boot: bootstrap::DEFAULT_N_BOOT,
            alpha: bootstrap::DEFAULT_ALPHA,
            threshold: cluster::DEFAULT_THRESHOLD,
            n_perm: cluster::DEFAULT_N_PERM,
            significance: cluster::DEFAULT_SIGNIFICANCE,
            seed: None,
            threads: None,
            min_valid_pct: 0.0,
            threshold_pct: 50.0,
            summary_mode: SummaryMode::default(),
        }
    }
}

impl AnalysisConfig {
    /// Cleans the AOI selection.
    ///
    /// Unknown AOI keys are dropped, an empty blue list falls back to
    /// [`DEFAULT_BLUE_KEY`], and red keys that are also blue are removed.
    /// Duplicate keys keep their first occurrence.
    #[must_use]
    pub fn sanitized(mut self) -> Self {
        fn known_unique(keys: &mut Vec<String>) {
            let mut seen = Vec::with_capacity(keys.len());
            keys.retain(|k| {
                let keep = catalog::is_aoi_key(k) && !seen.contains(k);
                if keep {
                    seen.push(k.clone());
                }
                keep
            });
        }

        known_unique(&mut self.blue_keys);
        if self.blue_keys.is_empty() {
            self.blue_keys.push(DEFAULT_BLUE_KEY.to_owned());
        }
        known_unique(&mut self.red_keys);
        let blue = &self.blue_keys;
        self.red_keys.retain(|k| !blue.contains(k));
        self.invalid.sort_unstable();
        self.invalid.dedup();
        self
    }

    #[must_use]
    pub fn selection(&self) -> AoiSelection {
        let red_mode = match self.red_mode {
            RedModeName::Auto => RedMode::Auto,
            RedModeName::Custom => RedMode::Custom(self.red_keys.clone()),
        };
        AoiSelection {
            blue_keys: self.blue_keys.clone(),
            red_mode,
            invalid: self.invalid.clone(),
        }
    }

    #[must_use]
    pub fn bootstrap_params(&self) -> BootstrapParams {
        BootstrapParams {
            n_boot: self.n_boot,
            alpha: self.alpha,
            threads: self.threads,
        }
    }

    #[must_use]
    pub fn permutation_params(&self) -> PermutationParams {
        PermutationParams {
            threshold: self.threshold,
            n_perm: self.n_perm,
            significance: self.significance,
            threads: self.threads,
        }
    }

    /// The configured seed, or a fresh one from the thread-local generator.
    #[must_use]
    pub fn resolve_seed(&self) -> u64 {
        self.seed.unwrap_or_else(|| rand::rng().random())
    }

    /// Generator for the randomized stages, seeded with `seed`.
    #[must_use]
    pub fn rng(seed: u64) -> Pcg32 {
        Pcg32::seed_from_u64(seed)
    }
}
