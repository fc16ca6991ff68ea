//! Percentile bootstrap confidence bands for a group mean curve.
//!
//! Each participant contributes one curve (one value per time bin). The group
//! curve is the per-bin mean across participants, and the confidence band is
//! obtained by resampling participants with replacement **independently at
//! every bin**.
//!
//! # Limitation
//!
//! Because every bin is resampled on its own, the band reflects
//! cross-participant variability at each instant but discards the temporal
//! correlation within a participant's curve. It is a pointwise band suited to
//! visualizing uncertainty; it does not support inference about the curve as a
//! whole (use [`crate::cluster`] for that).

use std::{num::NonZeroUsize, thread};

use rand::Rng;
use serde::Serialize;

use crate::{descriptive, parallel, percentiles};

/// Default number of bootstrap resamples per bin.
pub const DEFAULT_N_BOOT: usize = 500;
/// Default two-sided significance level of the band.
pub const DEFAULT_ALPHA: f64 = 0.05;

/// Parameters of [`bootstrap_ci`].
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BootstrapParams {
    /// Number of resamples drawn per bin.
    pub n_boot: usize,
    /// Two-sided level; the band spans the `alpha/2` and `1 - alpha/2` order
    /// statistics of the resampled means.
    pub alpha: f64,
    /// Worker threads; `None` uses the available parallelism.
    pub threads: Option<NonZeroUsize>,
}

impl Default for BootstrapParams {
    fn default() -> Self {
        Self {
            n_boot: DEFAULT_N_BOOT,
            alpha: DEFAULT_ALPHA,
            threads: None,
        }
    }
}

/// Group mean curve with a pointwise confidence band.
///
/// All vectors have the same length `T` (the number of bins).
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct GroupCurve {
    /// Bin centers in seconds.
    pub x_sec: Vec<f64>,
    pub mean: Vec<f64>,
    pub ci_low: Vec<f64>,
    pub ci_high: Vec<f64>,
    /// The input curves, one per participant.
    pub per_participant: Vec<Vec<f64>>,
}

impl GroupCurve {
    /// Number of bins.
    #[must_use]
    pub fn len(&self) -> usize {
        self.x_sec.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.x_sec.is_empty()
    }

    /// Mean width of the confidence band over all bins, `0.0` when empty.
    #[must_use]
    pub fn mean_ci_width(&self) -> f64 {
        let widths = self
            .ci_low
            .iter()
            .zip(&self.ci_high)
            .map(|(lo, hi)| hi - lo)
            .collect::<Vec<_>>();
        descriptive::mean(&widths)
    }
}

/// Values of every participant at each bin (`columns[t][p]`).
///
/// Curves shorter than `bins` contribute `0.0` at the missing positions.
#[must_use]
pub fn bin_columns(curves: &[Vec<f64>], bins: usize) -> Vec<Vec<f64>> {
    (0..bins)
        .map(|t| {
            curves
                .iter()
                .map(|curve| curve.get(t).copied().unwrap_or(0.0))
                .collect()
        })
        .collect()
}

/// Computes the group mean curve and its percentile bootstrap band.
///
/// `x_sec` fixes the number of bins `T`. With one participant or fewer, or
/// with `n_boot == 0`, the band collapses onto the mean.
///
/// A single base seed is drawn from `rng`; every bin then resamples with its
/// own generator derived from that seed and the bin index, so a seeded `rng`
/// gives identical results regardless of the thread count.
///
/// # Examples
///
/// ```
/// use gazestat_stats::bootstrap::{BootstrapParams, bootstrap_ci};
/// use rand::SeedableRng as _;
/// use rand_pcg::Pcg32;
///
/// let curves = vec![vec![10.0, 20.0], vec![30.0, 40.0], vec![20.0, 30.0]];
/// let mut rng = Pcg32::seed_from_u64(1);
/// let group = bootstrap_ci(&curves, &[0.05, 0.15], &BootstrapParams::default(), &mut rng);
///
/// assert_eq!(group.mean, vec![20.0, 30.0]);
/// assert!(group.ci_low[0] <= group.mean[0] && group.mean[0] <= group.ci_high[0]);
/// ```
#[must_use]
pub fn bootstrap_ci<R>(
    curves: &[Vec<f64>],
    x_sec: &[f64],
    params: &BootstrapParams,
    rng: &mut R,
) -> GroupCurve
where
    R: Rng + ?Sized,
{
    let bins = x_sec.len();
    let columns = bin_columns(curves, bins);
    let mean = columns
        .iter()
        .map(|column| descriptive::mean(column))
        .collect::<Vec<_>>();

    let mut ci_low = mean.clone();
    let mut ci_high = mean.clone();
    if curves.len() > 1 && params.n_boot > 0 {
        let base_seed: u64 = rng.random();
        let workers = parallel::worker_count(params.threads, bins);
        let chunk = parallel::chunk_len(bins, workers);
        let columns = &columns;
        thread::scope(|s| {
            for (k, (low, high)) in ci_low
                .chunks_mut(chunk)
                .zip(ci_high.chunks_mut(chunk))
                .enumerate()
            {
                s.spawn(move || {
                    let mut means = Vec::with_capacity(params.n_boot);
                    for (offset, (lo, hi)) in low.iter_mut().zip(high).enumerate() {
                        let t = k * chunk + offset;
                        let mut bin_rng = parallel::unit_rng(base_seed, t);
                        (*lo, *hi) = resample_bin(&columns[t], params, &mut bin_rng, &mut means);
                    }
                });
            }
        });
        tracing::debug!(
            participants = curves.len(),
            bins,
            n_boot = params.n_boot,
            workers,
            "bootstrap band computed"
        );
    }

    GroupCurve {
        x_sec: x_sec.to_vec(),
        mean,
        ci_low,
        ci_high,
        per_participant: curves.to_vec(),
    }
}

/// Bootstraps the mean of one bin's participant values and returns the
/// `(low, high)` percentile bounds.
#[expect(clippy::cast_precision_loss)]
fn resample_bin<R>(
    values: &[f64],
    params: &BootstrapParams,
    rng: &mut R,
    means: &mut Vec<f64>,
) -> (f64, f64)
where
    R: Rng + ?Sized,
{
    let n = values.len();
    means.clear();
    for _ in 0..params.n_boot {
        let sum = (0..n)
            .map(|_| values[rng.random_range(0..n)])
            .sum::<f64>();
        means.push(sum / n as f64);
    }
    means.sort_by(f64::total_cmp);
    let low = percentiles::order_statistic(means, params.alpha / 2.0);
    let high = percentiles::order_statistic(means, 1.0 - params.alpha / 2.0);
    (low, high)
}

#[cfg(test)]
mod tests {
    use rand::SeedableRng as _;
    use rand_pcg::Pcg32;

    use super::*;

    fn params(threads: usize) -> BootstrapParams {
        BootstrapParams {
            threads: NonZeroUsize::new(threads),
            ..BootstrapParams::default()
        }
    }

    #[test]
    fn test_single_participant_collapses_band() {
        let curves = vec![vec![12.0, -5.0, 0.0, 40.0]];
        let x_sec = [0.05, 0.15, 0.25, 0.35];
        let mut rng = Pcg32::seed_from_u64(3);
        let group = bootstrap_ci(&curves, &x_sec, &params(2), &mut rng);
        assert_eq!(group.mean, curves[0]);
        assert_eq!(group.ci_low, group.mean);
        assert_eq!(group.ci_high, group.mean);
    }

    #[test]
    fn test_no_participants() {
        let mut rng = Pcg32::seed_from_u64(3);
        let group = bootstrap_ci(&[], &[0.05, 0.15], &params(1), &mut rng);
        assert_eq!(group.mean, vec![0.0, 0.0]);
        assert_eq!(group.ci_low, vec![0.0, 0.0]);
        assert!(group.per_participant.is_empty());
    }

    #[test]
    fn test_zero_resamples_collapses_band() {
        let curves = vec![vec![0.0], vec![100.0]];
        let mut rng = Pcg32::seed_from_u64(3);
        let p = BootstrapParams {
            n_boot: 0,
            ..params(1)
        };
        let group = bootstrap_ci(&curves, &[0.05], &p, &mut rng);
        assert_eq!(group.ci_low, vec![50.0]);
        assert_eq!(group.ci_high, vec![50.0]);
    }

    #[test]
    fn test_band_brackets_mean() {
        let curves: Vec<Vec<f64>> = (0_u8..12)
            .map(|p| (0_u8..6).map(|t| f64::from(p * 7 % 11) + f64::from(t)).collect())
            .collect();
        let x_sec: Vec<f64> = (0_u8..6).map(|t| f64::from(t) * 0.1).collect();
        let mut rng = Pcg32::seed_from_u64(11);
        let group = bootstrap_ci(&curves, &x_sec, &params(3), &mut rng);
        for t in 0..6 {
            assert!(group.ci_low[t] <= group.mean[t] + 1e-9);
            assert!(group.mean[t] <= group.ci_high[t] + 1e-9);
            assert!(group.ci_low[t] < group.ci_high[t]);
        }
    }

    #[test]
    fn test_constant_bin_has_zero_width() {
        let curves = vec![vec![25.0, 1.0], vec![25.0, 9.0], vec![25.0, 4.0]];
        let mut rng = Pcg32::seed_from_u64(5);
        let group = bootstrap_ci(&curves, &[0.0, 1.0], &params(1), &mut rng);
        assert_eq!(group.ci_low[0], 25.0);
        assert_eq!(group.ci_high[0], 25.0);
    }

    #[test]
    fn test_ragged_curves_pad_with_zero() {
        let curves = vec![vec![10.0, 10.0], vec![20.0]];
        let mut rng = Pcg32::seed_from_u64(5);
        let group = bootstrap_ci(&curves, &[0.0, 1.0], &params(1), &mut rng);
        assert_eq!(group.mean, vec![15.0, 5.0]);
    }

    #[test]
    fn test_seeded_result_independent_of_threads() {
        let curves: Vec<Vec<f64>> = (0_u8..8)
            .map(|p| (0_u8..10).map(|t| f64::from((p * 13 + t * 7) % 17)).collect())
            .collect();
        let x_sec: Vec<f64> = (0_u8..10).map(f64::from).collect();
        let one = bootstrap_ci(&curves, &x_sec, &params(1), &mut Pcg32::seed_from_u64(99));
        let four = bootstrap_ci(&curves, &x_sec, &params(4), &mut Pcg32::seed_from_u64(99));
        assert_eq!(one, four);
    }

    #[test]
    fn test_width_grows_as_participants_shrink() {
        // Alternating values keep the per-bin variance fixed at every n.
        let make = |n: usize| -> Vec<Vec<f64>> {
            (0..n)
                .map(|p| vec![if p % 2 == 0 { 60.0 } else { -60.0 }; 20])
                .collect()
        };
        let x_sec: Vec<f64> = (0_u8..20).map(f64::from).collect();
        let width = |n: usize| {
            let mut rng = Pcg32::seed_from_u64(2024);
            bootstrap_ci(&make(n), &x_sec, &params(2), &mut rng).mean_ci_width()
        };
        let wide = width(4);
        let medium = width(16);
        let narrow = width(64);
        assert!(wide > medium, "{wide} <= {medium}");
        assert!(medium > narrow, "{medium} <= {narrow}");
    }
}
