use serde::Serialize;

use crate::percentiles;

/// Descriptive statistics summarizing a dataset.
///
/// This structure contains common measures of central tendency and dispersion
/// for a dataset of `f64` values. Variance is the population variance
/// (divided by `n`).
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DescriptiveStats {
    /// Number of values in the dataset.
    pub count: usize,
    /// The minimum value in the dataset.
    pub min: f64,
    /// The maximum value in the dataset.
    pub max: f64,
    /// The arithmetic mean (average) of the dataset.
    pub mean: f64,
    /// The median of the dataset (mean of the two middle values for even counts).
    pub median: f64,
    /// The variance of the dataset.
    pub variance: f64,
    /// The standard deviation of the dataset.
    pub std_dev: f64,
}

impl DescriptiveStats {
    /// Computes descriptive statistics from unsorted values.
    ///
    /// This method will sort the values internally before computing statistics.
    ///
    /// # Returns
    ///
    /// * `Some(DescriptiveStats)` - if the dataset contains at least one value
    /// * `None` - if the dataset is empty
    ///
    /// # Examples
    ///
    /// ```
    /// # use gazestat_stats::descriptive::DescriptiveStats;
    /// let values = [5.0, 2.0, 4.0, 1.0, 3.0];
    /// let stats = DescriptiveStats::new(values).unwrap();
    /// assert_eq!(stats.min, 1.0);
    /// assert_eq!(stats.max, 5.0);
    /// assert_eq!(stats.mean, 3.0);
    /// assert_eq!(stats.median, 3.0);
    /// ```
    #[must_use]
    pub fn new<I>(values: I) -> Option<Self>
    where
        I: IntoIterator<Item = f64>,
    {
        let mut values = values.into_iter().collect::<Vec<_>>();
        values.sort_by(f64::total_cmp);
        Self::from_sorted(&values)
    }

    /// Computes descriptive statistics from pre-sorted values.
    ///
    /// # Panics
    ///
    /// Panics if `sorted_values` is not sorted in ascending order.
    #[expect(clippy::cast_precision_loss)]
    #[must_use]
    pub fn from_sorted(sorted_values: &[f64]) -> Option<Self> {
        assert!(
            sorted_values.is_sorted_by(|a, b| a <= b),
            "values must be sorted in ascending order"
        );

        let min = *sorted_values.first()?;
        let max = *sorted_values.last()?;
        let count = sorted_values.len();
        let n = count as f64;
        let mean = sorted_values.iter().sum::<f64>() / n;
        let median = percentiles::median_of_sorted(sorted_values);
        let variance = sorted_values
            .iter()
            .map(|v| (v - mean).powi(2))
            .sum::<f64>()
            / n;
        let std_dev = variance.sqrt();

        Some(Self {
            count,
            min,
            max,
            mean,
            median,
            variance,
            std_dev,
        })
    }
}

/// Mean and sample standard deviation of a set of values.
///
/// The standard deviation uses the `n - 1` denominator, floored at 1 so that a
/// single value has a standard deviation of zero instead of NaN. An empty
/// input yields zero for both fields.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SampleMoments {
    pub count: usize,
    pub mean: f64,
    pub std_dev: f64,
}

impl SampleMoments {
    /// Computes the moments in two passes over `values`.
    ///
    /// ```
    /// # use gazestat_stats::descriptive::SampleMoments;
    /// let m = SampleMoments::new([2.0, 4.0, 6.0]);
    /// assert_eq!(m.mean, 4.0);
    /// assert_eq!(m.std_dev, 2.0);
    /// ```
    #[expect(clippy::cast_precision_loss)]
    #[must_use]
    pub fn new<I>(values: I) -> Self
    where
        I: IntoIterator<Item = f64>,
        I::IntoIter: Clone,
    {
        let values = values.into_iter();
        let (count, sum) = values
            .clone()
            .fold((0_usize, 0.0), |(count, sum), v| (count + 1, sum + v));
        let mean = sum / count.max(1) as f64;
        let sum_sq = values.map(|v| (v - mean).powi(2)).sum::<f64>();
        let variance = sum_sq / count.saturating_sub(1).max(1) as f64;
        Self {
            count,
            mean,
            std_dev: variance.max(0.0).sqrt(),
        }
    }

    /// One-sample t-statistic against zero: `mean / (sd / sqrt(n))`.
    ///
    /// Returns `0.0` when the standard deviation is zero.
    #[expect(clippy::cast_precision_loss)]
    #[must_use]
    pub fn t_statistic(&self) -> f64 {
        if self.std_dev > 0.0 {
            let n = self.count.max(1) as f64;
            self.mean / (self.std_dev / n.sqrt())
        } else {
            0.0
        }
    }
}

/// Arithmetic mean, `0.0` for an empty slice.
#[expect(clippy::cast_precision_loss)]
#[must_use]
pub fn mean(values: &[f64]) -> f64 {
    if values.is_empty() {
        return 0.0;
    }
    values.iter().sum::<f64>() / values.len() as f64
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_dataset() {
        assert!(DescriptiveStats::new([]).is_none());
    }

    #[test]
    fn test_even_median_averages_middle_values() {
        let stats = DescriptiveStats::new([4.0, 1.0, 3.0, 2.0]).unwrap();
        assert_eq!(stats.median, 2.5);
        assert_eq!(stats.count, 4);
        assert_eq!(stats.variance, 1.25);
    }

    #[test]
    fn test_sample_moments_single_value() {
        let m = SampleMoments::new([7.0]);
        assert_eq!(m.mean, 7.0);
        assert_eq!(m.std_dev, 0.0);
        assert_eq!(m.t_statistic(), 0.0);
    }

    #[test]
    fn test_sample_moments_empty() {
        let m = SampleMoments::new(std::iter::empty());
        assert_eq!(m.count, 0);
        assert_eq!(m.mean, 0.0);
        assert_eq!(m.t_statistic(), 0.0);
    }

    #[test]
    fn test_t_statistic() {
        // mean 4, sd 2, n 4 => t = 4 / (2 / 2) = 4
        let m = SampleMoments::new([2.0, 4.0, 4.0, 6.0]);
        assert_eq!(m.mean, 4.0);
        let expected_sd = (8.0_f64 / 3.0).sqrt();
        assert!((m.std_dev - expected_sd).abs() < 1e-12);
        assert!((m.t_statistic() - 4.0 / (expected_sd / 2.0)).abs() < 1e-12);
    }

    #[test]
    fn test_mean_of_empty_is_zero() {
        assert_eq!(mean(&[]), 0.0);
        assert_eq!(mean(&[1.0, 2.0]), 1.5);
    }
}
