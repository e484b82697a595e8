//! Shapiro-Wilk normality approximation
//!
//! W compares the ordered sample with expected normal order scores. The
//! scores are Blom's `Φ⁻¹((i - 0.375) / (n + 0.25))`, normalized to unit
//! length, in place of the exact Shapiro-Wilk coefficients. The p-value
//! follows Royston (1992): an exact arcsine form for n = 3, and normal
//! approximations of a transformed `ln(1 - W)` for 4..=11 and n >= 12.
//! Royston's fit is calibrated up to n = 5000; larger samples reuse it.

use crate::result::HypothesisTestResult;
use insight_core::special::{normal_cdf, normal_ppf};
use insight_core::{Error, Result};
use insight_descriptive::statistics::{compensated_sum, mean};
use std::f64::consts::PI;

pub const NORMALITY_TEST_NAME: &str = "Normality Test";

/// Smallest sample the statistic is defined for
pub const MIN_NORMALITY_SAMPLES: usize = 3;

/// Shapiro-Wilk `W` with its approximate p-value
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ShapiroWilk {
    pub w: f64,
    pub p_value: f64,
}

/// Blom order scores normalized to unit length
pub fn normal_order_coefficients(n: usize) -> Vec<f64> {
    let scores: Vec<f64> = (1..=n)
        .map(|i| normal_ppf((i as f64 - 0.375) / (n as f64 + 0.25)))
        .collect();
    let norm = scores.iter().map(|m| m * m).sum::<f64>().sqrt();
    scores.into_iter().map(|m| m / norm).collect()
}

/// W statistic and p-value; degenerate samples give `W = 1, p = 1`
pub fn shapiro_wilk(values: &[f64]) -> ShapiroWilk {
    let n = values.len();
    let degenerate = ShapiroWilk { w: 1.0, p_value: 1.0 };
    if n < MIN_NORMALITY_SAMPLES {
        return degenerate;
    }
    let m = match mean(values) {
        Ok(m) => m,
        Err(_) => return degenerate,
    };
    let ss = compensated_sum(values.iter().map(|&v| (v - m) * (v - m)));
    if ss <= 0.0 {
        return degenerate;
    }

    let mut sorted = values.to_vec();
    sorted.sort_by(f64::total_cmp);
    let coefficients = normal_order_coefficients(n);
    // Coefficients are antisymmetric, so pair the tails
    let b: f64 = (0..n / 2)
        .map(|i| coefficients[n - 1 - i] * (sorted[n - 1 - i] - sorted[i]))
        .sum();
    let w = (b * b / ss).clamp(0.0, 1.0);

    ShapiroWilk {
        w,
        p_value: royston_p_value(w, n),
    }
}

struct RoystonParams {
    mu: f64,
    sigma: f64,
    /// Shift applied before the outer log for small samples
    gamma: Option<f64>,
}

fn royston_params(n: usize) -> RoystonParams {
    let nf = n as f64;
    if n <= 11 {
        RoystonParams {
            mu: 0.5440 - 0.39978 * nf + 0.025054 * nf.powi(2) - 0.000_671_4 * nf.powi(3),
            sigma: (1.3822 - 0.77857 * nf + 0.062767 * nf.powi(2) - 0.002_032_2 * nf.powi(3)).exp(),
            gamma: Some(0.459 * nf - 2.273),
        }
    } else {
        let u = nf.ln();
        RoystonParams {
            mu: 0.003_891_5 * u.powi(3) - 0.083751 * u.powi(2) - 0.31082 * u - 1.5861,
            sigma: (0.003_030_2 * u.powi(2) - 0.082676 * u - 0.4803).exp(),
            gamma: None,
        }
    }
}

const ASIN_SQRT_THREE_QUARTERS: f64 = PI / 3.0;

/// Upper-tail probability of W under normality (small W rejects)
pub fn royston_p_value(w: f64, n: usize) -> f64 {
    if n < MIN_NORMALITY_SAMPLES {
        return 1.0;
    }
    if n == 3 {
        let p = 6.0 / PI * (w.sqrt().asin() - ASIN_SQRT_THREE_QUARTERS);
        return p.clamp(0.0, 1.0);
    }
    let params = royston_params(n);
    let y = (1.0 - w).ln();
    let transformed = match params.gamma {
        // Past the transform's pole W is far below any critical value
        Some(gamma) if y >= gamma => return 0.0,
        Some(gamma) => -(gamma - y).ln(),
        None => y,
    };
    let z = (transformed - params.mu) / params.sigma;
    (1.0 - normal_cdf(z)).clamp(0.0, 1.0)
}

/// W below which the test rejects at level `alpha`
pub fn critical_w(n: usize, alpha: f64) -> f64 {
    if n < MIN_NORMALITY_SAMPLES {
        return 0.0;
    }
    if n == 3 {
        let angle = alpha * PI / 6.0 + ASIN_SQRT_THREE_QUARTERS;
        return angle.sin().powi(2);
    }
    let params = royston_params(n);
    let z = normal_ppf(1.0 - alpha);
    let transformed = params.mu + params.sigma * z;
    let y = match params.gamma {
        Some(gamma) => gamma - (-transformed).exp(),
        None => transformed,
    };
    1.0 - y.exp()
}

/// Normality test at level `alpha`
pub fn normality_test(values: &[f64], alpha: f64) -> Result<HypothesisTestResult> {
    if values.iter().any(|v| !v.is_finite()) {
        return Err(Error::non_finite("normality test sample"));
    }
    let n = values.len();
    let sw = shapiro_wilk(values);
    let is_significant = sw.p_value < alpha;

    let interpretation = if n < MIN_NORMALITY_SAMPLES {
        format!("Too few values to assess normality (n = {n}, need at least {MIN_NORMALITY_SAMPLES})")
    } else if sw.w == 1.0 && sw.p_value == 1.0 && is_constant(values) {
        "All values are identical; normality cannot be assessed".to_string()
    } else if is_significant {
        "Data significantly deviates from normal distribution".to_string()
    } else {
        "Data appears to follow a normal distribution".to_string()
    };

    Ok(HypothesisTestResult {
        test_name: NORMALITY_TEST_NAME.to_string(),
        statistic: sw.w,
        p_value: sw.p_value,
        critical_value: critical_w(n, alpha),
        alpha,
        is_significant,
        effect_size: 1.0 - sw.w,
        power: None,
        interpretation,
        degrees_of_freedom: n.saturating_sub(1) as f64,
        sample_size: n,
    })
}

fn is_constant(values: &[f64]) -> bool {
    values.windows(2).all(|w| w[0] == w[1])
}
