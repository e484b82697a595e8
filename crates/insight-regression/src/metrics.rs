//! Goodness-of-fit metrics and the prediction confidence band

use insight_core::special::student_t_ppf;
use insight_core::Matrix;
use serde::{Deserialize, Serialize};

/// Two-sided band coverage
pub const BAND_LEVEL: f64 = 0.95;

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FitQuality {
    pub r_squared: f64,
    pub adjusted_r_squared: f64,
    /// `sqrt(SSres / (n - p - 1))`
    pub standard_error: f64,
    /// `SSres / n`
    pub mse: f64,
    pub rmse: f64,
    pub mae: f64,
    pub f_statistic: f64,
    pub aic: f64,
    pub bic: f64,
}

impl FitQuality {
    /// Metrics for `predictors` non-intercept terms
    ///
    /// Requires `actual.len() > predictors + 1`. With zero total variance R²
    /// is 1 for an exact fit and 0 otherwise; an exact fit has an infinite
    /// F statistic. `ln(MSE)` uses MSE floored at the smallest positive
    /// float so AIC/BIC stay finite.
    pub fn compute(actual: &[f64], predicted: &[f64], predictors: usize) -> Self {
        let n = actual.len() as f64;
        let p = predictors as f64;
        let df_resid = n - p - 1.0;

        let mean = actual.iter().sum::<f64>() / n;
        let ss_tot: f64 = actual.iter().map(|y| (y - mean).powi(2)).sum();
        let residuals: Vec<f64> = actual.iter().zip(predicted).map(|(y, f)| y - f).collect();
        let ss_res: f64 = residuals.iter().map(|r| r * r).sum();
        let ss_reg = ss_tot - ss_res;

        let r_squared = if ss_tot == 0.0 {
            if ss_res == 0.0 {
                1.0
            } else {
                0.0
            }
        } else {
            1.0 - ss_res / ss_tot
        };
        let adjusted_r_squared = 1.0 - (1.0 - r_squared) * (n - 1.0) / df_resid;

        let mse = ss_res / n;
        let f_statistic = if predictors == 0 {
            0.0
        } else if ss_res == 0.0 {
            f64::INFINITY
        } else {
            (ss_reg / p) / (ss_res / df_resid)
        };
        let ln_mse = mse.max(f64::MIN_POSITIVE).ln();

        Self {
            r_squared,
            adjusted_r_squared,
            standard_error: (ss_res / df_resid).sqrt(),
            mse,
            rmse: mse.sqrt(),
            mae: residuals.iter().map(|r| r.abs()).sum::<f64>() / n,
            f_statistic,
            aic: n * ln_mse + 2.0 * (p + 1.0),
            bic: n * ln_mse + n.ln() * (p + 1.0),
        }
    }
}

/// Symmetric band around the predictions
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConfidenceBand {
    pub upper: Vec<f64>,
    pub lower: Vec<f64>,
    /// Student-t critical value used for the half-width
    pub critical_value: f64,
}

/// Per-row leverage `1/n + Σj (xij - x̄j)² / Σi (xij - x̄j)²`
///
/// Sums over every non-intercept design column; constant columns
/// contribute nothing.
pub fn leverage(design: &Matrix) -> Vec<f64> {
    let n = design.rows();
    let mut lev = vec![1.0 / n as f64; n];
    for j in 1..design.cols() {
        let col = design.column_values(j);
        let mean = col.iter().sum::<f64>() / n as f64;
        let ss: f64 = col.iter().map(|v| (v - mean).powi(2)).sum();
        if ss <= 0.0 {
            continue;
        }
        for (l, v) in lev.iter_mut().zip(&col) {
            *l += (v - mean).powi(2) / ss;
        }
    }
    lev
}

/// `prediction ± t(0.975, df) · SE · sqrt(leverage)`
pub fn confidence_band(
    predictions: &[f64],
    design: &Matrix,
    standard_error: f64,
    df: usize,
) -> ConfidenceBand {
    let critical_value = student_t_ppf(1.0 - (1.0 - BAND_LEVEL) / 2.0, df as f64);
    let (upper, lower) = predictions
        .iter()
        .zip(leverage(design))
        .map(|(&pred, lev)| {
            let half = critical_value * standard_error * lev.sqrt();
            (pred + half, pred - half)
        })
        .unzip();
    ConfidenceBand {
        upper,
        lower,
        critical_value,
    }
}
