//! Mergeable central-moment summaries
//!
//! A [`MomentSummary`] holds the count, mean and the second to fourth central
//! sums of a sample. Summaries of disjoint chunks merge with the pairwise
//! update of Chan et al. (extended to M3/M4 by Pébay), so per-chunk work
//! reproduces the moments of the whole field.

use crate::statistics::compensated_sum;
use insight_core::{Error, Result};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct MomentSummary {
    count: usize,
    mean: f64,
    m2: f64,
    m3: f64,
    m4: f64,
    min: f64,
    max: f64,
}

impl Default for MomentSummary {
    /// The empty summary, identity for [`MomentSummary::merge`]
    fn default() -> Self {
        Self {
            count: 0,
            mean: 0.0,
            m2: 0.0,
            m3: 0.0,
            m4: 0.0,
            min: f64::INFINITY,
            max: f64::NEG_INFINITY,
        }
    }
}

impl MomentSummary {
    /// Two-pass summary of a non-empty slice
    pub fn from_values(values: &[f64]) -> Result<Self> {
        if values.is_empty() {
            return Err(Error::empty_input("moment summary"));
        }
        let n = values.len() as f64;
        let mean = compensated_sum(values.iter().copied()) / n;

        let m2 = compensated_sum(values.iter().map(|&v| (v - mean).powi(2)));
        let m3 = compensated_sum(values.iter().map(|&v| (v - mean).powi(3)));
        let m4 = compensated_sum(values.iter().map(|&v| (v - mean).powi(4)));
        let (min, max) = values
            .iter()
            .fold((f64::INFINITY, f64::NEG_INFINITY), |(lo, hi), &v| {
                (lo.min(v), hi.max(v))
            });

        Ok(Self {
            count: values.len(),
            mean,
            m2,
            m3,
            m4,
            min,
            max,
        })
    }

    /// Combine two summaries of disjoint samples
    pub fn merge(&self, other: &MomentSummary) -> MomentSummary {
        if other.count == 0 {
            return *self;
        }
        if self.count == 0 {
            return *other;
        }

        let na = self.count as f64;
        let nb = other.count as f64;
        let n = na + nb;
        let delta = other.mean - self.mean;
        let delta2 = delta * delta;

        let mean = self.mean + delta * nb / n;
        let m2 = self.m2 + other.m2 + delta2 * na * nb / n;
        let m3 = self.m3
            + other.m3
            + delta2 * delta * na * nb * (na - nb) / (n * n)
            + 3.0 * delta * (na * other.m2 - nb * self.m2) / n;
        let m4 = self.m4
            + other.m4
            + delta2 * delta2 * na * nb * (na * na - na * nb + nb * nb) / (n * n * n)
            + 6.0 * delta2 * (na * na * other.m2 + nb * nb * self.m2) / (n * n)
            + 4.0 * delta * (na * other.m3 - nb * self.m3) / n;

        MomentSummary {
            count: self.count + other.count,
            mean,
            m2,
            m3,
            m4,
            min: self.min.min(other.min),
            max: self.max.max(other.max),
        }
    }

    /// Fold any number of chunk summaries in order
    pub fn merge_all<'a, I: IntoIterator<Item = &'a MomentSummary>>(parts: I) -> MomentSummary {
        parts
            .into_iter()
            .fold(MomentSummary::default(), |acc, s| acc.merge(s))
    }

    pub fn count(&self) -> usize {
        self.count
    }

    pub fn mean(&self) -> f64 {
        self.mean
    }

    pub fn min(&self) -> f64 {
        self.min
    }

    pub fn max(&self) -> f64 {
        self.max
    }

    /// Population variance
    pub fn variance(&self) -> f64 {
        if self.count == 0 {
            return 0.0;
        }
        self.m2 / self.count as f64
    }

    pub fn std_dev(&self) -> f64 {
        self.variance().sqrt()
    }

    pub fn skewness(&self) -> f64 {
        if self.count < 3 || self.m2 <= 0.0 {
            return 0.0;
        }
        let n = self.count as f64;
        let sd = self.std_dev();
        n / ((n - 1.0) * (n - 2.0)) * self.m3 / (sd * sd * sd)
    }

    pub fn kurtosis(&self) -> f64 {
        if self.count == 0 || self.m2 <= 0.0 {
            return 0.0;
        }
        let n = self.count as f64;
        n * self.m4 / (self.m2 * self.m2) - 3.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_merge_matches_whole() {
        let values: Vec<f64> = (0..97).map(|i| ((i * 37) % 23) as f64 * 1.7 - 4.0).collect();
        let whole = MomentSummary::from_values(&values).unwrap();

        let parts: Vec<MomentSummary> = values
            .chunks(10)
            .map(|c| MomentSummary::from_values(c).unwrap())
            .collect();
        let merged = MomentSummary::merge_all(&parts);

        assert_eq!(merged.count(), whole.count());
        assert_relative_eq!(merged.mean(), whole.mean(), epsilon = 1e-12);
        assert_relative_eq!(merged.variance(), whole.variance(), epsilon = 1e-10);
        assert_relative_eq!(merged.skewness(), whole.skewness(), epsilon = 1e-9);
        assert_relative_eq!(merged.kurtosis(), whole.kurtosis(), epsilon = 1e-9);
        assert_eq!(merged.min(), whole.min());
        assert_eq!(merged.max(), whole.max());
    }

    #[test]
    fn test_empty_is_merge_identity() {
        let s = MomentSummary::from_values(&[1.0, 2.0, 4.0]).unwrap();
        assert_eq!(s.merge(&MomentSummary::default()), s);
        assert_eq!(MomentSummary::default().merge(&s), s);
        assert!(MomentSummary::from_values(&[]).is_err());
    }

    #[test]
    fn test_constant_chunks_have_zero_shape() {
        let a = MomentSummary::from_values(&[3.0, 3.0]).unwrap();
        let b = MomentSummary::from_values(&[3.0, 3.0, 3.0]).unwrap();
        let merged = a.merge(&b);
        assert_eq!(merged.variance(), 0.0);
        assert_eq!(merged.skewness(), 0.0);
        assert_eq!(merged.kurtosis(), 0.0);
    }
}
