//! Hypothesis tests for insight-stats
//!
//! [`run_hypothesis_tests`] runs a two-sided one-sample t-test against a
//! null mean of 0 and a Shapiro-Wilk normality approximation on one numeric
//! field. Both p-values come from the hand-built special functions in
//! [`insight_core::special`] and are approximations:
//!
//! - t-test p-value: regularized incomplete beta, accurate to ~1e-14
//! - t-test power: central t shifted by `effect · √n`, not the noncentral t
//! - normality: Blom scores instead of exact coefficients, Royston p-value
//!
//! # Example
//!
//! ```rust
//! use insight_core::Field;
//! use insight_hypothesis::{run_hypothesis_tests, DEFAULT_ALPHA};
//!
//! let field = Field::numeric("revenue", vec![100.0, 110.0, 120.0, 130.0, 140.0]);
//! let results = run_hypothesis_tests(&field, DEFAULT_ALPHA).unwrap();
//! assert_eq!(results[0].test_name, "One-Sample t-Test");
//! assert!(results[0].is_significant);
//! assert_eq!(results[1].test_name, "Normality Test");
//! ```

pub mod normality;
pub mod result;

pub use normality::{normality_test, shapiro_wilk, ShapiroWilk};
pub use result::{HypothesisTestResult, DEFAULT_ALPHA};
pub use t_test::{one_sample_t_test, MIN_T_TEST_SAMPLES};

use insight_core::{Error, Field, Result};
use tracing::{debug, instrument};

/// Reject significance levels outside (0, 1)
pub fn validate_alpha(alpha: f64) -> Result<()> {
    if !(alpha > 0.0 && alpha < 1.0) {
        return Err(Error::Validation(format!(
            "Significance level must be in (0, 1), got {alpha}"
        )));
    }
    Ok(())
}

/// Run the t-test and the normality test on a numeric field
///
/// Returns the t-test first. Needs at least two values.
#[instrument(skip(field), fields(field = field.name(), n = field.len()))]
pub fn run_hypothesis_tests(field: &Field, alpha: f64) -> Result<Vec<HypothesisTestResult>> {
    validate_alpha(alpha)?;
    let values = field.numeric_values()?;

    let t = one_sample_t_test(values, alpha)?;
    let normal = normality_test(values, alpha)?;
    debug!(
        "t = {:.4} (p = {:.4}), W = {:.4} (p = {:.4})",
        t.statistic, t.p_value, normal.statistic, normal.p_value
    );
    Ok(vec![t, normal])
}

#[cfg(test)]
mod tests {
    use super::*;
    use insight_core::ErrorKind;

    #[test]
    fn test_alpha_bounds() {
        let field = Field::numeric("x", vec![1.0, 2.0, 3.0]);
        for alpha in [0.0, 1.0, -0.1, f64::NAN] {
            let err = run_hypothesis_tests(&field, alpha).unwrap_err();
            assert_eq!(err.kind(), ErrorKind::Validation);
        }
        assert!(run_hypothesis_tests(&field, 0.01).is_ok());
    }

    #[test]
    fn test_rejects_text_and_short_fields() {
        let text = Field::text("name", ["a", "b", "c"]);
        assert!(run_hypothesis_tests(&text, DEFAULT_ALPHA).is_err());

        let single = Field::numeric("x", vec![3.0]);
        let err = run_hypothesis_tests(&single, DEFAULT_ALPHA).unwrap_err();
        assert!(matches!(err, Error::InsufficientData { expected: 2, actual: 1 }));
    }

    #[test]
    fn test_alpha_flows_into_results() {
        let field = Field::numeric("x", vec![0.3, -0.2, 0.5, 0.1, -0.4, 0.2]);
        let results = run_hypothesis_tests(&field, 0.1).unwrap();
        assert_eq!(results.len(), 2);
        assert!(results.iter().all(|r| r.alpha == 0.1 && r.sample_size == 6));
    }
}
