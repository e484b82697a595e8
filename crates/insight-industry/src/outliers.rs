//! Z-score outlier flags

use crate::check_finite;
use insight_core::{Error, Result};
use insight_descriptive::statistics::{mean, std_dev};
use serde::{Deserialize, Serialize};

/// Values more than two standard deviations from the mean are flagged
pub const DEFAULT_Z_THRESHOLD: f64 = 2.0;

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Outlier {
    pub index: usize,
    pub value: f64,
    pub z_score: f64,
}

/// Standard scores against the population mean and standard deviation
///
/// All zeros for a constant series.
pub fn z_scores(values: &[f64]) -> Result<Vec<f64>> {
    check_finite(values, "z-score input")?;
    let m = mean(values)?;
    let sd = std_dev(values)?;
    if sd == 0.0 {
        return Ok(vec![0.0; values.len()]);
    }
    Ok(values.iter().map(|v| (v - m) / sd).collect())
}

/// Values whose `|z|` exceeds `threshold`, in row order
pub fn z_score_outliers(values: &[f64], threshold: f64) -> Result<Vec<Outlier>> {
    if !(threshold.is_finite() && threshold > 0.0) {
        return Err(Error::Validation(format!(
            "Outlier threshold must be positive and finite, got {threshold}"
        )));
    }
    Ok(z_scores(values)?
        .into_iter()
        .zip(values)
        .enumerate()
        .filter(|(_, (z, _))| z.abs() > threshold)
        .map(|(index, (z_score, &value))| Outlier {
            index,
            value,
            z_score,
        })
        .collect())
}
