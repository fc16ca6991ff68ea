//! Gaze preference analysis for visual-world experiments
//!
//! This crate turns raw eye-tracker samples into blue-versus-red preference
//! curves and group-level inference on top of them.
//!
//! # Overview
//!
//! ## Curve Workflow
//!
//! 1. **Resolve AOIs** ([`aoi::resolve`]): Turn a test's catalog row and the
//!    selected AOI fields into disjoint blue/red/invalid label sets
//! 2. **Anchor** ([`anchor::resolve_anchor`]): Find where bin 0 of each session
//!    starts (session start, manual offset or word onset, plus a shift)
//! 3. **Bin** ([`binning::build_bins`]): Count blue, red and invalid samples per
//!    fixed-width time bin
//! 4. **Build Curves** ([`curve::build_curve`]): Reduce bins to a contrast value
//!    and aggregate sessions per participant ([`curve::aggregate_sessions`])
//! 5. **Infer** ([`group::run_group_analysis`]): Bootstrap band and cluster
//!    permutation test over participant curves
//!
//! ## Summary Workflow
//!
//! Whole-trial counts per test and participant ([`summary::summarize_trials`]),
//! participant roll-ups, threshold splits and metadata bucket comparisons.
//!
//! # Modules
//!
//! - [`aoi`]: Box labels, AOI code parsing and classification sets
//! - [`catalog`]: Test metadata rows and AOI field lookup
//! - [`sample`]: Gaze samples and session grouping
//! - [`anchor`]: Session anchors and word windows
//! - [`binning`]: Time bins and per-bin percentages
//! - [`curve`]: Contrast metrics and session aggregation
//! - [`group`]: Full group curve pipeline
//! - [`summary`]: Whole-trial summaries
//! - [`config`]: Analysis configuration
//! - [`request`]: Last-request-wins sequencing for interactive callers
//!
//! Randomized stages take any [`rand::Rng`]; seed a
//! [`rand_pcg::Pcg32`] (see [`config::AnalysisConfig::rng`]) for reproducible
//! results.

pub mod anchor;
pub mod aoi;
pub mod binning;
pub mod catalog;
pub mod config;
pub mod curve;
pub mod group;
pub mod request;
pub mod sample;
pub mod summary;
