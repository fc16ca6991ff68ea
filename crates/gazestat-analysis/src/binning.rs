//! Fixed-width time binning of gaze samples.
//!
//! Samples are placed into `num_bins` consecutive windows of
//! `bin_width_ms` starting at an anchor instant. Each bin counts how many of
//! its samples were invalid, blue or red, and derives percentages from those
//! counts:
//!
//! - `blue_pct = 100 · blue / (blue + red)`
//! - `red_pct = 100 · red / (blue + red)`
//! - `valid_pct = 100 · (total − invalid) / total`
//!
//! Every percentage is `0.0` when its denominator is zero.
//!
//! # Examples
//!
//! ```
//! use std::collections::BTreeSet;
//!
//! use gazestat_analysis::{
//!     aoi::{BoxLabel, ClassificationSets},
//!     binning::{BinParams, build_bins},
//!     sample::{GazeSample, SessionKey},
//! };
//!
//! let sets = ClassificationSets::new(
//!     BTreeSet::from([BoxLabel::Animal1]),
//!     BTreeSet::from([BoxLabel::Animal2]),
//!     BTreeSet::from([BoxLabel::Missing]),
//! );
//! let at = |timestamp_ms, box_label| GazeSample {
//!     timestamp_ms,
//!     participant: "P1".to_owned(),
//!     box_label,
//!     test_name: "T01".to_owned(),
//!     session: SessionKey::default(),
//! };
//! let samples = [at(1_000, BoxLabel::Animal1), at(1_050, BoxLabel::Animal2)];
//! let params = BinParams { anchor_ms: 1_000, bin_width_ms: 100, num_bins: 2 };
//! let bins = build_bins(&samples, &params, &sets);
//!
//! assert_eq!(bins[0].blue_pct(), 50.0);
//! assert_eq!(bins[1].total, 0);
//! ```

use serde::{Serialize, Serializer, ser::SerializeStruct as _};

use crate::{
    aoi::{BoxLabel, ClassificationSets},
    sample::GazeSample,
};

/// Where and how finely to bin.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BinParams {
    /// Absolute start of bin 0 in milliseconds.
    pub anchor_ms: i64,
    /// Width of each bin; values below 1 are treated as 1.
    pub bin_width_ms: u32,
    pub num_bins: usize,
}

impl BinParams {
    #[must_use]
    pub fn effective_width_ms(&self) -> u32 {
        self.bin_width_ms.max(1)
    }

    /// Bin index of an absolute timestamp, if it falls inside the window.
    #[must_use]
    pub fn bin_index(&self, timestamp_ms: i64) -> Option<usize> {
        let rel = timestamp_ms.checked_sub(self.anchor_ms)?;
        if rel < 0 {
            return None;
        }
        let index = usize::try_from(rel / i64::from(self.effective_width_ms())).ok()?;
        (index < self.num_bins).then_some(index)
    }
}

/// Category a sample's label falls into.
#[derive(Debug, Clone, Copy, PartialEq, Eq, derive_more::IsVariant)]
pub enum Classification {
    Invalid,
    Blue,
    Red,
    /// Valid but in neither set.
    Neither,
}

/// Classifies a label; invalid takes precedence over blue and red.
#[must_use]
pub fn classify(label: BoxLabel, sets: &ClassificationSets) -> Classification {
    if sets.invalid().contains(&label) {
        Classification::Invalid
    } else if sets.blue().contains(&label) {
        Classification::Blue
    } else if sets.red().contains(&label) {
        Classification::Red
    } else {
        Classification::Neither
    }
}

/// `100 · part / whole`, or `0.0` when `whole` is zero.
#[expect(clippy::cast_precision_loss)]
#[must_use]
pub fn pct(part: u64, whole: u64) -> f64 {
    if whole == 0 {
        0.0
    } else {
        100.0 * part as f64 / whole as f64
    }
}

/// Sample counts of one time bin.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct BinSummary {
    pub index: usize,
    pub total: u64,
    pub invalid_count: u64,
    pub blue_count: u64,
    pub red_count: u64,
}

impl BinSummary {
    #[must_use]
    pub fn empty(index: usize) -> Self {
        Self {
            index,
            ..Self::default()
        }
    }

    pub fn record(&mut self, class: Classification) {
        self.total += 1;
        match class {
            Classification::Invalid => self.invalid_count += 1,
            Classification::Blue => self.blue_count += 1,
            Classification::Red => self.red_count += 1,
            Classification::Neither => {}
        }
    }

    /// Samples that were not invalid.
    #[must_use]
    pub fn valid_count(&self) -> u64 {
        self.total - self.invalid_count
    }

    #[must_use]
    pub fn blue_pct(&self) -> f64 {
        pct(self.blue_count, self.blue_count + self.red_count)
    }

    #[must_use]
    pub fn red_pct(&self) -> f64 {
        pct(self.red_count, self.blue_count + self.red_count)
    }

    #[must_use]
    pub fn valid_pct(&self) -> f64 {
        pct(self.valid_count(), self.total)
    }
}

impl Serialize for BinSummary {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        let mut s = serializer.serialize_struct("BinSummary", 8)?;
        s.serialize_field("index", &self.index)?;
        s.serialize_field("total", &self.total)?;
        s.serialize_field("invalid_count", &self.invalid_count)?;
        s.serialize_field("blue_count", &self.blue_count)?;
        s.serialize_field("red_count", &self.red_count)?;
        s.serialize_field("blue_pct", &self.blue_pct())?;
        s.serialize_field("red_pct", &self.red_pct())?;
        s.serialize_field("valid_pct", &self.valid_pct())?;
        s.end()
    }
}

/// Bins `samples` relative to `params.anchor_ms`.
///
/// Samples before the anchor or past the last bin are dropped. The input
/// order does not matter; an empty input yields `num_bins` all-zero bins.
#[must_use]
pub fn build_bins<'a, I>(
    samples: I,
    params: &BinParams,
    sets: &ClassificationSets,
) -> Vec<BinSummary>
where
    I: IntoIterator<Item = &'a GazeSample>,
{
    let mut sorted = samples.into_iter().collect::<Vec<_>>();
    sorted.sort_by_key(|s| s.timestamp_ms);

    let mut bins = (0..params.num_bins)
        .map(BinSummary::empty)
        .collect::<Vec<_>>();
    for sample in sorted {
        if let Some(index) = params.bin_index(sample.timestamp_ms) {
            bins[index].record(classify(sample.box_label, sets));
        }
    }
    bins
}

/// Tallies every sample of `samples` without binning.
///
/// The result is shaped like a single bin with index 0, so the same
/// percentage helpers apply to whole trials.
#[must_use]
pub fn count_classified<'a, I>(samples: I, sets: &ClassificationSets) -> BinSummary
where
    I: IntoIterator<Item = &'a GazeSample>,
{
    let mut tally = BinSummary::empty(0);
    for sample in samples {
        tally.record(classify(sample.box_label, sets));
    }
    tally
}

/// Centers of each bin in seconds relative to the anchor; widths below 1 are
/// treated as 1.
#[expect(clippy::cast_precision_loss)]
#[must_use]
pub fn bin_centers_sec(bin_width_ms: u32, num_bins: usize) -> Vec<f64> {
    let width = f64::from(bin_width_ms.max(1));
    (0..num_bins)
        .map(|i| (i as f64 + 0.5) * width / 1000.0)
        .collect()
}

#[cfg(test)]
mod tests {
    use std::collections::BTreeSet;

    use super::*;
    use crate::sample::tests::sample;

    fn sets() -> ClassificationSets {
        ClassificationSets::new(
            BTreeSet::from([BoxLabel::Animal1]),
            BTreeSet::from([BoxLabel::Animal2, BoxLabel::Animal3]),
            BTreeSet::from([BoxLabel::Missing]),
        )
    }

    fn params(num_bins: usize) -> BinParams {
        BinParams {
            anchor_ms: 1_000,
            bin_width_ms: 100,
            num_bins,
        }
    }

    #[test]
    fn test_three_bin_scenario() {
        let samples = vec![
            sample("P", "R", 1_000, BoxLabel::Animal1),
            sample("P", "R", 1_050, BoxLabel::Animal2),
            sample("P", "R", 1_120, BoxLabel::Animal1),
            sample("P", "R", 1_250, BoxLabel::Missing),
        ];
        let bins = build_bins(&samples, &params(3), &sets());
        assert_eq!(bins.len(), 3);

        assert_eq!((bins[0].total, bins[0].blue_count, bins[0].red_count), (2, 1, 1));
        assert_eq!(bins[0].blue_pct(), 50.0);
        assert_eq!(bins[0].red_pct(), 50.0);
        assert_eq!(bins[0].valid_pct(), 100.0);

        assert_eq!(bins[1].blue_pct(), 100.0);
        assert_eq!(bins[1].red_pct(), 0.0);

        assert_eq!((bins[2].total, bins[2].invalid_count), (1, 1));
        assert_eq!(bins[2].valid_pct(), 0.0);
        assert_eq!(bins[2].blue_pct(), 0.0);
        assert_eq!(bins[2].red_pct(), 0.0);
    }

    #[test]
    fn test_out_of_window_samples_dropped() {
        let samples = vec![
            sample("P", "R", 999, BoxLabel::Animal1),
            sample("P", "R", 1_300, BoxLabel::Animal1),
            sample("P", "R", 1_299, BoxLabel::Animal2),
        ];
        let bins = build_bins(&samples, &params(3), &sets());
        assert_eq!(bins.iter().map(|b| b.total).sum::<u64>(), 1);
        assert_eq!(bins[2].red_count, 1);
    }

    #[test]
    fn test_empty_input_gives_zero_bins() {
        let bins = build_bins(&[], &params(4), &sets());
        assert_eq!(bins.len(), 4);
        assert!(bins.iter().enumerate().all(|(i, b)| *b == BinSummary::empty(i)));
    }

    #[test]
    fn test_count_invariants_and_pct_ranges() {
        let labels = [
            BoxLabel::Animal1,
            BoxLabel::Animal2,
            BoxLabel::Other,
            BoxLabel::Missing,
            BoxLabel::Animal3,
            BoxLabel::Object1ForAnimal1,
        ];
        let samples = (0_i64..200)
            .map(|i| sample("P", "R", 1_000 + i * 7, labels[usize::try_from(i).unwrap() % labels.len()]))
            .collect::<Vec<_>>();
        for bin in build_bins(&samples, &params(10), &sets()) {
            assert!(bin.blue_count + bin.red_count + bin.invalid_count <= bin.total);
            for pct in [bin.blue_pct(), bin.red_pct(), bin.valid_pct()] {
                assert!((0.0..=100.0).contains(&pct));
            }
            if bin.blue_count + bin.red_count > 0 {
                assert!((bin.blue_pct() + bin.red_pct() - 100.0).abs() < 1e-9);
            }
        }
    }

    #[test]
    fn test_input_order_does_not_matter() {
        let mut samples = vec![
            sample("P", "R", 1_210, BoxLabel::Animal2),
            sample("P", "R", 1_000, BoxLabel::Animal1),
            sample("P", "R", 1_110, BoxLabel::Missing),
        ];
        let forward = build_bins(&samples, &params(3), &sets());
        samples.reverse();
        assert_eq!(build_bins(&samples, &params(3), &sets()), forward);
    }

    #[test]
    fn test_blue_count_sums_to_direct_count() {
        let labels = [BoxLabel::Animal1, BoxLabel::Animal2, BoxLabel::Missing, BoxLabel::Other];
        let samples = (0_i64..50)
            .map(|i| sample("P", "R", i * 37, labels[usize::try_from(i * 7).unwrap() % labels.len()]))
            .collect::<Vec<_>>();
        let sets = sets();
        let direct = samples
            .iter()
            .filter(|s| sets.blue().contains(&s.box_label) && !sets.invalid().contains(&s.box_label))
            .count();
        let p = BinParams {
            anchor_ms: 0,
            bin_width_ms: 100,
            num_bins: 20,
        };
        let bins = build_bins(&samples, &p, &sets);
        assert_eq!(bins.iter().map(|b| b.total).sum::<u64>(), 50);
        let counted = bins.iter().map(|b| b.blue_count).sum::<u64>();
        assert_eq!(counted, u64::try_from(direct).unwrap());
        assert_eq!(count_classified(&samples, &sets).blue_count, counted);
    }

    #[test]
    fn test_count_classified_tallies_every_sample() {
        let samples = vec![
            sample("P", "R", -5_000, BoxLabel::Animal1),
            sample("P", "R", 0, BoxLabel::Animal2),
            sample("P", "R", 90_000, BoxLabel::Missing),
            sample("P", "R", 90_001, BoxLabel::Other),
        ];
        let tally = count_classified(&samples, &sets());
        assert_eq!(tally.index, 0);
        assert_eq!(
            (tally.total, tally.invalid_count, tally.blue_count, tally.red_count),
            (4, 1, 1, 1)
        );
        assert_eq!(tally.valid_count(), 3);
        assert_eq!(tally.blue_pct(), 50.0);
        assert_eq!(tally.valid_pct(), 75.0);
        assert_eq!(count_classified(&[], &sets()), BinSummary::empty(0));
    }

    #[test]
    fn test_two_participant_scenario() {
        let sets = ClassificationSets::new(
            BTreeSet::from([BoxLabel::Animal1]),
            BTreeSet::from([BoxLabel::Animal2]),
            BTreeSet::from([BoxLabel::Missing]),
        );
        let samples = vec![
            sample("A", "R", 100, BoxLabel::Animal1),
            sample("A", "R", 200, BoxLabel::Animal2),
            sample("A", "R", 1_100, BoxLabel::Animal1),
            sample("A", "R", 2_500, BoxLabel::Missing),
            sample("B", "R", 300, BoxLabel::Animal2),
        ];
        let p = BinParams {
            anchor_ms: 0,
            bin_width_ms: 1_000,
            num_bins: 3,
        };
        let bins = build_bins(samples.iter().filter(|s| s.participant == "A"), &p, &sets);
        let pcts = bins
            .iter()
            .map(|b| (b.blue_pct(), b.valid_pct()))
            .collect::<Vec<_>>();
        assert_eq!(pcts, vec![(50.0, 100.0), (100.0, 100.0), (0.0, 0.0)]);
        assert_eq!((bins[0].blue_count, bins[0].red_count, bins[0].total), (1, 1, 2));
        assert_eq!((bins[1].blue_count, bins[1].red_count, bins[1].total), (1, 0, 1));
        assert_eq!((bins[2].total, bins[2].invalid_count), (1, 1));
    }

    #[test]
    fn test_zero_width_treated_as_one() {
        let p = BinParams {
            anchor_ms: 0,
            bin_width_ms: 0,
            num_bins: 3,
        };
        assert_eq!(p.bin_index(2), Some(2));
        assert_eq!(p.bin_index(3), None);
        assert_eq!(bin_centers_sec(p.bin_width_ms, p.num_bins), vec![0.0005, 0.0015, 0.0025]);
    }

    #[test]
    fn test_bin_centers() {
        assert_eq!(bin_centers_sec(100, 3), vec![0.05, 0.15, 0.25]);
    }

    #[test]
    fn test_serialized_bin_has_percentages() {
        let mut bin = BinSummary::empty(2);
        bin.record(Classification::Blue);
        bin.record(Classification::Red);
        bin.record(Classification::Invalid);
        bin.record(Classification::Red);
        let value = serde_json::to_value(bin).unwrap();
        assert_eq!(value["index"], 2);
        assert_eq!(value["blue_pct"], 100.0 / 3.0);
        assert_eq!(value["valid_pct"], 75.0);
    }
}
