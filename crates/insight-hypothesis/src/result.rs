//! Hypothesis test results

use serde::{Deserialize, Serialize};

/// Significance threshold used when the caller does not pick one
pub const DEFAULT_ALPHA: f64 = 0.05;

/// Outcome of one hypothesis test
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HypothesisTestResult {
    pub test_name: String,
    pub statistic: f64,
    pub p_value: f64,
    /// Rejection boundary for `statistic` at `alpha`
    pub critical_value: f64,
    pub alpha: f64,
    pub is_significant: bool,
    pub effect_size: f64,
    /// `None` where the test has no power approximation
    pub power: Option<f64>,
    pub interpretation: String,
    pub degrees_of_freedom: f64,
    pub sample_size: usize,
}
