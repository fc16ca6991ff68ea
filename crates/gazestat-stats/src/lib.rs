//! Statistical inference utilities for gaze-preference curves.
//!
//! This crate provides the numeric layer of the gazestat project:
//!
//! - **Descriptive statistics**: mean, median, variance and sample moments
//! - **Percentiles**: nearest-rank percentiles and order statistics
//! - **Bootstrap**: per-bin percentile bootstrap bands around a group mean curve
//! - **Cluster permutation**: sign-flip cluster-mass permutation test
//! - **Cancellation**: a cooperative cancel flag for long-running tests
//!
//! # Modules
//!
//! - [`descriptive`]: Descriptive statistics for summarizing datasets
//! - [`percentiles`]: Percentile computation and storage
//! - [`bootstrap`]: Group mean curve with a pointwise confidence band
//! - [`cluster`]: Cluster-based permutation significance testing
//! - [`cancel`]: Cooperative cancellation token
//! - [`parallel`]: Work splitting and per-unit seeded generators
//!
//! # Examples
//!
//! ## Group curve with a confidence band
//!
//! ```
//! use gazestat_stats::bootstrap::{BootstrapParams, bootstrap_ci};
//! use rand::SeedableRng as _;
//! use rand_pcg::Pcg32;
//!
//! let curves = vec![vec![10.0, 50.0], vec![30.0, 70.0]];
//! let mut rng = Pcg32::seed_from_u64(0);
//! let group = bootstrap_ci(&curves, &[0.05, 0.15], &BootstrapParams::default(), &mut rng);
//! assert_eq!(group.mean, vec![20.0, 60.0]);
//! ```
//!
//! ## Cluster permutation test
//!
//! ```
//! use gazestat_stats::{
//!     cancel::CancelToken,
//!     cluster::{PermutationParams, cluster_permutation},
//! };
//! use rand::SeedableRng as _;
//! use rand_pcg::Pcg32;
//!
//! let curves = vec![vec![0.0; 10]; 5];
//! let params = PermutationParams { n_perm: 0, ..PermutationParams::default() };
//! let mut rng = Pcg32::seed_from_u64(0);
//! let sig = cluster_permutation(&curves, &params, &mut rng, &CancelToken::new()).unwrap();
//! assert_eq!(sig.p_value, 1.0);
//! ```

pub mod bootstrap;
pub mod cancel;
pub mod cluster;
pub mod descriptive;
pub mod parallel;
pub mod percentiles;
