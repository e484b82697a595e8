//! Tuning parameters shared by the regression families

use insight_core::{Error, Result};
use serde::{Deserialize, Serialize};

/// Iteration cap for quantile IRLS, independent of `max_iterations`
pub const QUANTILE_MAX_ITERATIONS: usize = 200;

/// Parameters for every family; each family reads only the ones it uses
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct RegressionOptions {
    /// Polynomial degree
    pub degree: usize,
    /// Regularization strength for ridge, lasso and elastic-net
    pub alpha: f64,
    /// Elastic-net share of the L1 penalty
    pub l1_ratio: f64,
    /// Minimum marginal R² gain for stepwise selection
    pub threshold: f64,
    /// Target quantile in (0, 1)
    pub quantile: f64,
    /// Number of trailing values per time-series row
    pub lag: usize,
    /// Iteration cap for lasso and logistic
    pub max_iterations: usize,
    /// Convergence tolerance on the largest coefficient change
    pub tolerance: f64,
}

impl Default for RegressionOptions {
    fn default() -> Self {
        Self {
            degree: 2,
            alpha: 1.0,
            l1_ratio: 0.5,
            threshold: 0.05,
            quantile: 0.5,
            lag: 1,
            max_iterations: 100,
            tolerance: 1e-8,
        }
    }
}

impl RegressionOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_degree(mut self, degree: usize) -> Self {
        self.degree = degree;
        self
    }

    pub fn with_alpha(mut self, alpha: f64) -> Self {
        self.alpha = alpha;
        self
    }

    pub fn with_l1_ratio(mut self, l1_ratio: f64) -> Self {
        self.l1_ratio = l1_ratio;
        self
    }

    pub fn with_threshold(mut self, threshold: f64) -> Self {
        self.threshold = threshold;
        self
    }

    pub fn with_quantile(mut self, quantile: f64) -> Self {
        self.quantile = quantile;
        self
    }

    pub fn with_lag(mut self, lag: usize) -> Self {
        self.lag = lag;
        self
    }

    pub fn with_max_iterations(mut self, max_iterations: usize) -> Self {
        self.max_iterations = max_iterations;
        self
    }

    pub fn with_tolerance(mut self, tolerance: f64) -> Self {
        self.tolerance = tolerance;
        self
    }

    /// Reject parameter values no family can use
    pub fn validate(&self) -> Result<()> {
        let invalid = |msg: String| Err(Error::Regression(msg));
        if self.degree == 0 {
            return invalid("Polynomial degree must be at least 1".to_string());
        }
        if !(self.alpha.is_finite() && self.alpha >= 0.0) {
            return invalid(format!("alpha must be finite and non-negative, got {}", self.alpha));
        }
        if !(0.0..=1.0).contains(&self.l1_ratio) {
            return invalid(format!("l1Ratio must be in [0, 1], got {}", self.l1_ratio));
        }
        if !self.threshold.is_finite() {
            return invalid("Stepwise threshold must be finite".to_string());
        }
        if !(self.quantile > 0.0 && self.quantile < 1.0) {
            return invalid(format!("quantile must be in (0, 1), got {}", self.quantile));
        }
        if self.lag == 0 {
            return invalid("Time-series lag must be at least 1".to_string());
        }
        if self.max_iterations == 0 {
            return invalid("max_iterations must be at least 1".to_string());
        }
        if !(self.tolerance.is_finite() && self.tolerance > 0.0) {
            return invalid(format!("tolerance must be positive, got {}", self.tolerance));
        }
        Ok(())
    }
}
