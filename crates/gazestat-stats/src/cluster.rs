//! Cluster-based permutation test for participant curves.
//!
//! # Algorithm
//!
//! 1. At every bin, compute the one-sample t-statistic of the participant
//!    values against zero.
//! 2. Group contiguous bins with `|t| >= threshold` into clusters; a cluster's
//!    mass is the sum of `|t|` over its bins.
//! 3. Build a null distribution of the largest cluster mass by flipping the
//!    sign of whole participant curves at random (one coin per participant per
//!    permutation).
//! 4. The global p-value compares the largest observed mass against that
//!    distribution with add-one smoothing.
//!
//! Every observed cluster reports the same global p-value, and all of their
//! bins are marked significant when it is below the significance level. Only
//! the largest observed cluster is actually compared against the null, so
//! smaller clusters inherit its p-value.

use std::{num::NonZeroUsize, thread};

use rand::Rng;
use serde::Serialize;

use crate::{
    bootstrap::bin_columns,
    cancel::{CancelToken, Cancelled},
    descriptive::SampleMoments,
    parallel,
};

/// Default `|t|` threshold for a bin to join a cluster.
pub const DEFAULT_THRESHOLD: f64 = 2.0;
/// Default number of sign-flip permutations.
pub const DEFAULT_N_PERM: usize = 200;
/// Default significance level applied to the global p-value.
pub const DEFAULT_SIGNIFICANCE: f64 = 0.05;

/// Parameters of [`cluster_permutation`].
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PermutationParams {
    pub threshold: f64,
    pub n_perm: usize,
    pub significance: f64,
    /// Worker threads; `None` uses the available parallelism.
    pub threads: Option<NonZeroUsize>,
}

impl Default for PermutationParams {
    fn default() -> Self {
        Self {
            threshold: DEFAULT_THRESHOLD,
            n_perm: DEFAULT_N_PERM,
            significance: DEFAULT_SIGNIFICANCE,
            threads: None,
        }
    }
}

/// A maximal run of supra-threshold bins (`end` inclusive).
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct ClusterRun {
    pub start: usize,
    pub end: usize,
    pub mass: f64,
}

/// An observed cluster together with the global p-value.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Cluster {
    pub start: usize,
    pub end: usize,
    pub mass: f64,
    pub p: f64,
}

/// Result of [`cluster_permutation`].
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ClusterSignificance {
    /// `true` for bins inside an observed cluster when `p_value` is below the
    /// significance level.
    pub mask: Vec<bool>,
    pub clusters: Vec<Cluster>,
    /// The global p-value shared by all clusters.
    pub p_value: f64,
    /// Observed t-statistic per bin.
    pub t_values: Vec<f64>,
}

impl ClusterSignificance {
    fn empty(bins: usize) -> Self {
        Self {
            mask: vec![false; bins],
            clusters: vec![],
            p_value: 1.0,
            t_values: vec![0.0; bins],
        }
    }

    /// Whether any bin is marked significant.
    #[must_use]
    pub fn any_significant(&self) -> bool {
        self.mask.iter().any(|&m| m)
    }
}

/// Per-bin one-sample t-statistics against zero.
///
/// `columns[t]` holds every participant's value at bin `t`; `signs[p]`
/// multiplies participant `p`'s values.
fn t_series_into(columns: &[Vec<f64>], signs: &[f64], out: &mut Vec<f64>) {
    out.clear();
    out.extend(columns.iter().map(|column| {
        SampleMoments::new(column.iter().zip(signs).map(|(v, s)| v * s)).t_statistic()
    }));
}

/// Computes the observed t-series of participant curves.
///
/// The number of bins is the length of the first curve; an empty input gives
/// an empty series.
///
/// ```
/// use gazestat_stats::cluster::t_series;
///
/// let t = t_series(&[vec![1.0, 0.0], vec![3.0, 0.0]]);
/// // bin 0: mean 2, sd sqrt(2), n 2 => t = 2
/// assert!((t[0] - 2.0).abs() < 1e-12);
/// assert_eq!(t[1], 0.0);
/// ```
#[must_use]
pub fn t_series(curves: &[Vec<f64>]) -> Vec<f64> {
    let bins = curves.first().map_or(0, Vec::len);
    let columns = bin_columns(curves, bins);
    let mut out = Vec::with_capacity(bins);
    t_series_into(&columns, &vec![1.0; curves.len()], &mut out);
    out
}

/// Scans `t_series` left to right and returns every maximal run of bins with
/// `|t| >= threshold`.
///
/// Bins below the threshold never join a cluster; runs are not bridged across
/// gaps.
///
/// ```
/// use gazestat_stats::cluster::find_clusters;
///
/// let runs = find_clusters(&[0.5, 2.5, -3.0, 1.0, 2.0], 2.0);
/// assert_eq!(runs.len(), 2);
/// assert_eq!((runs[0].start, runs[0].end, runs[0].mass), (1, 2, 5.5));
/// assert_eq!((runs[1].start, runs[1].end, runs[1].mass), (4, 4, 2.0));
/// ```
#[must_use]
pub fn find_clusters(t_series: &[f64], threshold: f64) -> Vec<ClusterRun> {
    let mut runs = vec![];
    let mut i = 0;
    while i < t_series.len() {
        if t_series[i].abs() >= threshold {
            let start = i;
            let mut mass = 0.0;
            while i < t_series.len() && t_series[i].abs() >= threshold {
                mass += t_series[i].abs();
                i += 1;
            }
            runs.push(ClusterRun {
                start,
                end: i - 1,
                mass,
            });
        } else {
            i += 1;
        }
    }
    runs
}

/// Largest mass among `runs`, `0.0` if there are none.
#[must_use]
pub fn max_mass(runs: &[ClusterRun]) -> f64 {
    runs.iter().map(|run| run.mass).fold(0.0, f64::max)
}

/// Runs the sign-flip cluster permutation test on participant curves.
///
/// Returns `p = 1` with no mask when there are no participants or
/// `n_perm == 0`. `cancel` is polled before every permutation on every
/// worker; once it is set the test stops and returns [`Cancelled`].
///
/// One base seed is drawn from `rng`, and permutation `k` flips signs with a
/// generator derived from that seed and `k`, so a seeded `rng` reproduces the
/// same p-value for any thread count.
///
/// # Examples
///
/// ```
/// use gazestat_stats::{
///     cancel::CancelToken,
///     cluster::{PermutationParams, cluster_permutation},
/// };
/// use rand::SeedableRng as _;
/// use rand_pcg::Pcg32;
///
/// let curves = vec![vec![0.0; 5]; 4];
/// let mut rng = Pcg32::seed_from_u64(7);
/// let sig = cluster_permutation(&curves, &PermutationParams::default(), &mut rng, &CancelToken::new())
///     .unwrap();
/// assert!(sig.clusters.is_empty());
/// assert!(!sig.any_significant());
/// ```
pub fn cluster_permutation<R>(
    curves: &[Vec<f64>],
    params: &PermutationParams,
    rng: &mut R,
    cancel: &CancelToken,
) -> Result<ClusterSignificance, Cancelled>
where
    R: Rng + ?Sized,
{
    cancel.check()?;
    let Some(first) = curves.first() else {
        return Ok(ClusterSignificance::empty(0));
    };
    let bins = first.len();
    let columns = bin_columns(curves, bins);

    let mut t_values = Vec::with_capacity(bins);
    t_series_into(&columns, &vec![1.0; curves.len()], &mut t_values);
    let observed = find_clusters(&t_values, params.threshold);
    let obs_max = max_mass(&observed);

    let p_value = if params.n_perm == 0 {
        1.0
    } else {
        let exceed = count_null_exceedances(&columns, curves.len(), obs_max, params, rng, cancel)?;
        smoothed_p_value(exceed, params.n_perm)
    };

    let mut mask = vec![false; bins];
    if p_value < params.significance {
        for run in &observed {
            mask[run.start..=run.end].fill(true);
        }
    }
    let clusters = observed
        .iter()
        .map(|run| Cluster {
            start: run.start,
            end: run.end,
            mass: run.mass,
            p: p_value,
        })
        .collect::<Vec<_>>();
    tracing::debug!(
        participants = curves.len(),
        bins,
        clusters = clusters.len(),
        obs_max,
        p_value,
        "cluster permutation test finished"
    );

    Ok(ClusterSignificance {
        mask,
        clusters,
        p_value,
        t_values,
    })
}

/// Add-one smoothed empirical p-value.
#[expect(clippy::cast_precision_loss)]
fn smoothed_p_value(exceed: usize, n_perm: usize) -> f64 {
    (exceed + 1) as f64 / (n_perm + 1) as f64
}

/// Counts permutations whose largest cluster mass reaches `obs_max`.
fn count_null_exceedances<R>(
    columns: &[Vec<f64>],
    participants: usize,
    obs_max: f64,
    params: &PermutationParams,
    rng: &mut R,
    cancel: &CancelToken,
) -> Result<usize, Cancelled>
where
    R: Rng + ?Sized,
{
    let base_seed: u64 = rng.random();
    let workers = parallel::worker_count(params.threads, params.n_perm);
    thread::scope(|s| {
        let handles = parallel::chunk_ranges(params.n_perm, workers)
            .map(|range| {
                s.spawn(move || -> Result<usize, Cancelled> {
                    let mut signs = vec![1.0; participants];
                    let mut t_buf = Vec::with_capacity(columns.len());
                    let mut exceed = 0_usize;
                    for k in range {
                        cancel.check()?;
                        let mut perm_rng = parallel::unit_rng(base_seed, k);
                        for sign in &mut signs {
                            *sign = if perm_rng.random::<f64>() < 0.5 {
                                1.0
                            } else {
                                -1.0
                            };
                        }
                        t_series_into(columns, &signs, &mut t_buf);
                        let perm_max = max_mass(&find_clusters(&t_buf, params.threshold));
                        if perm_max >= obs_max {
                            exceed += 1;
                        }
                    }
                    Ok(exceed)
                })
            })
            .collect::<Vec<_>>();
        handles
            .into_iter()
            .map(|handle| {
                handle
                    .join()
                    .unwrap_or_else(|e| std::panic::resume_unwind(e))
            })
            .sum()
    })
}

#[cfg(test)]
mod tests {
    use rand::SeedableRng as _;
    use rand_pcg::Pcg32;

    use super::*;

    fn params(n_perm: usize, threads: usize) -> PermutationParams {
        PermutationParams {
            n_perm,
            threads: NonZeroUsize::new(threads),
            ..PermutationParams::default()
        }
    }

    fn strong_effect(participants: u8) -> Vec<Vec<f64>> {
        // Positive effect in bins 3..7, noise elsewhere.
        (0..participants)
            .map(|p| {
                (0_u8..12)
                    .map(|t| {
                        let noise = f64::from((p * 5 + t * 3) % 7) - 3.0;
                        if (3..7).contains(&t) { 40.0 + noise } else { noise }
                    })
                    .collect()
            })
            .collect()
    }

    #[test]
    fn test_find_clusters_no_bridging() {
        let runs = find_clusters(&[3.0, 1.9, 3.0], 2.0);
        assert_eq!(runs.len(), 2);
        assert_eq!(runs[0].end, 0);
        assert_eq!(runs[1].start, 2);
    }

    #[test]
    fn test_find_clusters_run_to_end() {
        let runs = find_clusters(&[0.0, -2.0, 2.5], 2.0);
        assert_eq!(runs, vec![ClusterRun { start: 1, end: 2, mass: 4.5 }]);
        assert_eq!(max_mass(&runs), 4.5);
        assert_eq!(max_mass(&[]), 0.0);
    }

    #[test]
    fn test_no_participants() {
        let mut rng = Pcg32::seed_from_u64(1);
        let sig = cluster_permutation(&[], &params(200, 2), &mut rng, &CancelToken::new()).unwrap();
        assert!(sig.mask.is_empty());
        assert!(sig.t_values.is_empty());
        assert!(sig.clusters.is_empty());
        assert_eq!(sig.p_value, 1.0);
    }

    #[test]
    fn test_zero_permutations() {
        let mut rng = Pcg32::seed_from_u64(1);
        let curves = strong_effect(10);
        let sig = cluster_permutation(&curves, &params(0, 2), &mut rng, &CancelToken::new()).unwrap();
        assert_eq!(sig.p_value, 1.0);
        assert!(sig.mask.iter().all(|&m| !m));
        assert!(!sig.clusters.is_empty());
        assert!(sig.clusters.iter().all(|c| c.p == 1.0));
    }

    #[test]
    fn test_zero_curve_has_no_clusters() {
        let mut rng = Pcg32::seed_from_u64(1);
        let curves = vec![vec![0.0; 8], vec![0.0; 8], vec![0.0; 8]];
        let sig = cluster_permutation(&curves, &params(50, 1), &mut rng, &CancelToken::new()).unwrap();
        assert!(sig.clusters.is_empty());
        assert!(sig.t_values.iter().all(|&t| t == 0.0));
        // Every permutation ties the observed zero mass.
        assert_eq!(sig.p_value, 1.0);
    }

    #[test]
    fn test_strong_effect_is_significant() {
        let mut rng = Pcg32::seed_from_u64(17);
        let curves = strong_effect(12);
        let sig = cluster_permutation(&curves, &params(200, 4), &mut rng, &CancelToken::new()).unwrap();
        assert!(sig.p_value < 0.05, "p = {}", sig.p_value);
        for t in 3..7 {
            assert!(sig.mask[t], "bin {t} should be significant");
        }
        let largest = sig
            .clusters
            .iter()
            .max_by(|a, b| a.mass.total_cmp(&b.mass))
            .unwrap();
        assert!(largest.start <= 3 && largest.end >= 6);
    }

    #[test]
    fn test_p_value_lower_bound() {
        let mut rng = Pcg32::seed_from_u64(17);
        let curves = strong_effect(12);
        let sig = cluster_permutation(&curves, &params(99, 3), &mut rng, &CancelToken::new()).unwrap();
        assert!(sig.p_value >= 1.0 / 100.0);
    }

    #[test]
    fn test_seeded_result_independent_of_threads() {
        let curves = strong_effect(6);
        let run = |threads| {
            let mut rng = Pcg32::seed_from_u64(5);
            cluster_permutation(&curves, &params(64, threads), &mut rng, &CancelToken::new()).unwrap()
        };
        assert_eq!(run(1), run(4));
    }

    #[test]
    fn test_cancelled_before_start() {
        let token = CancelToken::new();
        token.cancel();
        let mut rng = Pcg32::seed_from_u64(1);
        let result = cluster_permutation(&strong_effect(4), &params(10, 1), &mut rng, &token);
        assert_eq!(result, Err(Cancelled));
    }
}
