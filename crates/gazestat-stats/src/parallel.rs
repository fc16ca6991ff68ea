//! Work splitting and per-unit random generators for the resampling tests.
//!
//! Every independent unit of randomized work (one bootstrap bin, one
//! permutation) draws from its own [`Pcg32`] seeded from a base seed and the
//! unit's index. Results therefore depend only on the base seed, never on how
//! units are distributed across threads.

use std::{num::NonZeroUsize, ops::Range, thread};

use rand::SeedableRng as _;
use rand_pcg::Pcg32;

/// Derives a well-mixed 64-bit seed from a base seed and a counter (`SplitMix64`).
#[must_use]
pub fn counter_seed(base_seed: u64, counter: u64) -> u64 {
    let mut z = base_seed.wrapping_add(counter.wrapping_mul(0x9e37_79b9_7f4a_7c15));
    z = (z ^ (z >> 30)).wrapping_mul(0xbf58_476d_1ce4_e5b9);
    z = (z ^ (z >> 27)).wrapping_mul(0x94d0_49bb_1331_11eb);
    z ^ (z >> 31)
}

/// Generator for unit `counter` of a computation seeded with `base_seed`.
#[must_use]
pub fn unit_rng(base_seed: u64, counter: usize) -> Pcg32 {
    Pcg32::seed_from_u64(counter_seed(base_seed, counter as u64))
}

/// Resolves the worker count: the requested value, or the machine's available
/// parallelism, never more than `units` and never zero.
#[must_use]
pub fn worker_count(requested: Option<NonZeroUsize>, units: usize) -> usize {
    let available = requested
        .or_else(|| thread::available_parallelism().ok())
        .map_or(1, NonZeroUsize::get);
    available.min(units).max(1)
}

/// Size of each contiguous chunk when splitting `units` across `workers`.
#[must_use]
pub fn chunk_len(units: usize, workers: usize) -> usize {
    units.div_ceil(workers.max(1)).max(1)
}

/// Splits `0..units` into at most `workers` contiguous ranges.
pub fn chunk_ranges(units: usize, workers: usize) -> impl Iterator<Item = Range<usize>> {
    let len = chunk_len(units, workers);
    (0..units)
        .step_by(len)
        .map(move |start| start..(start + len).min(units))
}
