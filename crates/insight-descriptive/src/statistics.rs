//! Descriptive statistics for a single numeric field
//!
//! Every function here is pure and fails with a validation error on empty
//! input. Spread measures are population measures (divide by `n`).

use crate::moments::MomentSummary;
use insight_core::{Error, Field, Result};
use ordered_float::OrderedFloat;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;

/// Fraction of the first-half mean the halves may differ by and still be stable
pub const TREND_THRESHOLD: f64 = 0.05;

/// Direction of a series, judged by comparing its two halves
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Trend {
    Up,
    Down,
    Stable,
}

impl fmt::Display for Trend {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Trend::Up => "up",
            Trend::Down => "down",
            Trend::Stable => "stable",
        })
    }
}

/// Q1/Q2/Q3 by the exclusive-split median-of-halves method
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Quartiles {
    pub q1: f64,
    pub q2: f64,
    pub q3: f64,
}

impl Quartiles {
    pub fn iqr(&self) -> f64 {
        self.q3 - self.q1
    }
}

/// Immutable snapshot of one numeric field's statistics
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FieldStatistics {
    pub field: String,
    pub mean: f64,
    pub median: f64,
    /// Every value tied at the highest frequency, ascending
    pub mode: Vec<f64>,
    pub std_dev: f64,
    pub variance: f64,
    pub quartiles: Quartiles,
    pub min: f64,
    pub max: f64,
    pub skewness: f64,
    /// Excess kurtosis (normal = 0)
    pub kurtosis: f64,
    pub trend: Trend,
    pub sample_size: usize,
}

impl FieldStatistics {
    /// Combine precomputed moments with the order statistics of `values`
    ///
    /// Moments may come from merged chunk summaries; median, mode, quartiles
    /// and trend always use the full, ordered series.
    pub fn from_moments(name: &str, values: &[f64], moments: &MomentSummary) -> Result<Self> {
        if values.is_empty() {
            return Err(Error::empty_input(name));
        }
        if moments.count() != values.len() {
            return Err(Error::size_mismatch(
                values.len(),
                moments.count(),
                &format!("moment summary for '{name}'"),
            ));
        }

        let mut sorted = values.to_vec();
        sorted.sort_by(f64::total_cmp);

        Ok(Self {
            field: name.to_string(),
            mean: moments.mean(),
            median: median_sorted(&sorted),
            mode: mode(values)?,
            std_dev: moments.std_dev(),
            variance: moments.variance(),
            quartiles: quartiles_sorted(&sorted),
            min: moments.min(),
            max: moments.max(),
            skewness: moments.skewness(),
            kurtosis: moments.kurtosis(),
            trend: trend(values),
            sample_size: values.len(),
        })
    }
}

/// Compute the full statistics snapshot for a numeric field
pub fn compute_field_statistics(field: &Field) -> Result<FieldStatistics> {
    let values = field.numeric_values()?;
    let moments = MomentSummary::from_values(values)?;
    FieldStatistics::from_moments(field.name(), values, &moments)
}

fn non_empty(values: &[f64], operation: &str) -> Result<()> {
    if values.is_empty() {
        Err(Error::empty_input(operation))
    } else {
        Ok(())
    }
}

/// Neumaier-compensated sum
pub fn compensated_sum<I: IntoIterator<Item = f64>>(values: I) -> f64 {
    let mut sum = 0.0;
    let mut compensation = 0.0;
    for v in values {
        let t = sum + v;
        if sum.abs() >= v.abs() {
            compensation += (sum - t) + v;
        } else {
            compensation += (v - t) + sum;
        }
        sum = t;
    }
    sum + compensation
}

pub fn mean(values: &[f64]) -> Result<f64> {
    non_empty(values, "mean")?;
    Ok(compensated_sum(values.iter().copied()) / values.len() as f64)
}

pub fn median(values: &[f64]) -> Result<f64> {
    non_empty(values, "median")?;
    let mut sorted = values.to_vec();
    sorted.sort_by(f64::total_cmp);
    Ok(median_sorted(&sorted))
}

fn median_sorted(sorted: &[f64]) -> f64 {
    let n = sorted.len();
    if n == 0 {
        return f64::NAN;
    }
    let mid = n / 2;
    if n % 2 == 0 {
        (sorted[mid - 1] + sorted[mid]) / 2.0
    } else {
        sorted[mid]
    }
}

/// All values tied at the highest frequency, ascending
pub fn mode(values: &[f64]) -> Result<Vec<f64>> {
    non_empty(values, "mode")?;
    let mut counts: HashMap<OrderedFloat<f64>, usize> = HashMap::new();
    for &v in values {
        *counts.entry(OrderedFloat(v)).or_insert(0) += 1;
    }
    let max_count = counts.values().copied().max().unwrap_or(0);
    let mut modes: Vec<f64> = counts
        .into_iter()
        .filter(|&(_, c)| c == max_count)
        .map(|(v, _)| v.into_inner())
        .collect();
    modes.sort_by(f64::total_cmp);
    Ok(modes)
}

/// Population variance (two-pass, compensated)
pub fn variance(values: &[f64]) -> Result<f64> {
    let m = mean(values)?;
    let ss = compensated_sum(values.iter().map(|&v| (v - m) * (v - m)));
    Ok(ss / values.len() as f64)
}

/// Population standard deviation
pub fn std_dev(values: &[f64]) -> Result<f64> {
    variance(values).map(f64::sqrt)
}

pub fn quartiles(values: &[f64]) -> Result<Quartiles> {
    non_empty(values, "quartiles")?;
    let mut sorted = values.to_vec();
    sorted.sort_by(f64::total_cmp);
    Ok(quartiles_sorted(&sorted))
}

/// Median of the lower and upper halves, the middle value excluded for odd n
fn quartiles_sorted(sorted: &[f64]) -> Quartiles {
    let n = sorted.len();
    let q2 = median_sorted(sorted);
    if n < 2 {
        return Quartiles { q1: q2, q2, q3: q2 };
    }
    Quartiles {
        q1: median_sorted(&sorted[..n / 2]),
        q2,
        q3: median_sorted(&sorted[n.div_ceil(2)..]),
    }
}

/// Sample-adjusted skewness `n/((n-1)(n-2)) * Σ z³` with population sd
///
/// Zero for a constant series or fewer than three values.
pub fn skewness(values: &[f64]) -> Result<f64> {
    MomentSummary::from_values(values).map(|m| m.skewness())
}

/// Excess kurtosis `mean(z⁴) - 3`; zero for a constant series
pub fn kurtosis(values: &[f64]) -> Result<f64> {
    MomentSummary::from_values(values).map(|m| m.kurtosis())
}

fn half_means(values: &[f64]) -> Option<(f64, f64)> {
    if values.len() < 2 {
        return None;
    }
    let (first, second) = values.split_at(values.len() / 2);
    let first_mean = compensated_sum(first.iter().copied()) / first.len() as f64;
    let second_mean = compensated_sum(second.iter().copied()) / second.len() as f64;
    Some((first_mean, second_mean))
}

/// Compare the means of the first and second halves
///
/// Stable when the difference is within [`TREND_THRESHOLD`] of the first-half
/// mean, or when there are fewer than two values. The result depends on
/// row order.
pub fn trend(values: &[f64]) -> Trend {
    let Some((first, second)) = half_means(values) else {
        return Trend::Stable;
    };
    let difference = second - first;
    if difference.abs() <= first.abs() * TREND_THRESHOLD {
        Trend::Stable
    } else if difference > 0.0 {
        Trend::Up
    } else {
        Trend::Down
    }
}

/// Relative change between half means, `|second - first| / |first|`
///
/// Zero when the first-half mean is zero or there are fewer than two values.
pub fn trend_strength(values: &[f64]) -> f64 {
    match half_means(values) {
        Some((first, second)) if first != 0.0 => ((second - first) / first).abs(),
        _ => 0.0,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;

    #[test]
    fn test_revenue_example() {
        let field = Field::numeric("revenue", vec![100.0, 110.0, 120.0, 130.0, 140.0]);
        let stats = compute_field_statistics(&field).unwrap();
        assert_abs_diff_eq!(stats.mean, 120.0);
        assert_abs_diff_eq!(stats.median, 120.0);
        assert_eq!(stats.trend, Trend::Up);
        assert_eq!(stats.sample_size, 5);
        assert_abs_diff_eq!(stats.variance, 200.0, epsilon = 1e-10);
        assert_abs_diff_eq!(stats.std_dev, 200f64.sqrt(), epsilon = 1e-10);
        assert_abs_diff_eq!(stats.skewness, 0.0, epsilon = 1e-12);
        assert_eq!(stats.min, 100.0);
        assert_eq!(stats.max, 140.0);
        // Exclusive split: lower half [100, 110], upper half [130, 140]
        assert_eq!(stats.quartiles, Quartiles { q1: 105.0, q2: 120.0, q3: 135.0 });
    }

    #[test]
    fn test_median_even_length() {
        assert_abs_diff_eq!(median(&[4.0, 1.0, 3.0, 2.0]).unwrap(), 2.5);
    }

    #[test]
    fn test_mode_is_multimodal_safe() {
        assert_eq!(mode(&[1.0, 2.0, 2.0, 3.0, 3.0]).unwrap(), vec![2.0, 3.0]);
        assert_eq!(mode(&[5.0, 1.0, 5.0]).unwrap(), vec![5.0]);
        // All unique: every value ties
        assert_eq!(mode(&[3.0, 1.0, 2.0]).unwrap(), vec![1.0, 2.0, 3.0]);
    }

    #[test]
    fn test_zero_std_dev_gives_zero_shape() {
        let values = [7.0; 6];
        assert_eq!(std_dev(&values).unwrap(), 0.0);
        assert_eq!(skewness(&values).unwrap(), 0.0);
        assert_eq!(kurtosis(&values).unwrap(), 0.0);
    }

    #[test]
    fn test_skewness_and_kurtosis_formulas() {
        let values = [1.0, 2.0, 2.0, 3.0, 9.0];
        let n = values.len() as f64;
        let m = values.iter().sum::<f64>() / n;
        let sd = (values.iter().map(|v| (v - m).powi(2)).sum::<f64>() / n).sqrt();
        let z3: f64 = values.iter().map(|v| ((v - m) / sd).powi(3)).sum();
        let z4: f64 = values.iter().map(|v| ((v - m) / sd).powi(4)).sum();

        assert_abs_diff_eq!(skewness(&values).unwrap(), n / ((n - 1.0) * (n - 2.0)) * z3, epsilon = 1e-12);
        assert_abs_diff_eq!(kurtosis(&values).unwrap(), z4 / n - 3.0, epsilon = 1e-12);
        assert!(skewness(&values).unwrap() > 0.0);
    }

    #[test]
    fn test_trend_rules() {
        assert_eq!(trend(&[]), Trend::Stable);
        assert_eq!(trend(&[42.0]), Trend::Stable);
        assert_eq!(trend(&[100.0, 90.0, 80.0, 70.0]), Trend::Down);
        // 4% change stays inside the threshold
        assert_eq!(trend(&[100.0, 100.0, 104.0, 104.0]), Trend::Stable);
        assert_eq!(trend(&[100.0, 100.0, 106.0, 106.0]), Trend::Up);
        assert_eq!(Trend::Up.to_string(), "up");
    }

    #[test]
    fn test_trend_strength() {
        assert_abs_diff_eq!(trend_strength(&[100.0, 100.0, 150.0, 150.0]), 0.5);
        assert_eq!(trend_strength(&[0.0, 0.0, 5.0]), 0.0);
        assert_eq!(trend_strength(&[3.0]), 0.0);
    }

    #[test]
    fn test_single_value_quartiles() {
        assert_eq!(quartiles(&[4.0]).unwrap(), Quartiles { q1: 4.0, q2: 4.0, q3: 4.0 });
        // Even length: halves split cleanly
        assert_eq!(
            quartiles(&[1.0, 2.0, 3.0, 4.0]).unwrap(),
            Quartiles { q1: 1.5, q2: 2.5, q3: 3.5 }
        );
    }

    #[test]
    fn test_empty_input_is_an_error() {
        assert!(mean(&[]).is_err());
        assert!(median(&[]).is_err());
        assert!(mode(&[]).is_err());
        assert!(variance(&[]).is_err());
        assert!(quartiles(&[]).is_err());
        assert!(compute_field_statistics(&Field::numeric("e", vec![])).is_err());
        assert!(compute_field_statistics(&Field::text("t", ["a"])).is_err());
    }

    #[test]
    fn test_compensated_sum_recovers_small_terms() {
        let values = [1e16, 1.0, -1e16, 1.0];
        assert_eq!(compensated_sum(values.iter().copied()), 2.0);
    }
}
