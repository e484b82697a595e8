//! Fitted regression models

use crate::design::Basis;
use crate::family::RegressionFamily;
use crate::metrics::{ConfidenceBand, FitQuality};
use crate::strategy::Link;
use insight_core::linalg::dot;
use insight_core::{Error, Result};
use serde::{Deserialize, Serialize};

/// Result of one fit call; immutable once built
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RegressionModel {
    pub(crate) family: RegressionFamily,
    pub(crate) dependent: String,
    /// Names of the design columns after the intercept
    pub(crate) terms: Vec<String>,
    /// Intercept first, then one per term
    pub(crate) coefficients: Vec<f64>,
    pub(crate) predictions: Vec<f64>,
    pub(crate) actual_values: Vec<f64>,
    pub(crate) fit_quality: FitQuality,
    pub(crate) confidence_band: ConfidenceBand,
    pub(crate) equation: String,
    pub(crate) selected_features: Option<Vec<String>>,
    pub(crate) iterations: usize,
    pub(crate) converged: bool,
    pub(crate) basis: Basis,
    pub(crate) link: Link,
    /// Width of the raw row `predict` expects
    pub(crate) inputs: usize,
}

impl RegressionModel {
    pub fn family(&self) -> RegressionFamily {
        self.family
    }

    pub fn dependent(&self) -> &str {
        &self.dependent
    }

    pub fn terms(&self) -> &[String] {
        &self.terms
    }

    pub fn coefficients(&self) -> &[f64] {
        &self.coefficients
    }

    pub fn intercept(&self) -> f64 {
        self.coefficients.first().copied().unwrap_or(0.0)
    }

    /// Coefficients after the intercept
    pub fn slopes(&self) -> &[f64] {
        self.coefficients.get(1..).unwrap_or(&[])
    }

    /// In-sample predictions on the response scale
    pub fn predictions(&self) -> &[f64] {
        &self.predictions
    }

    /// Response values the predictions line up with
    ///
    /// For time-series fits this starts `lag` rows into the series.
    pub fn actual_values(&self) -> &[f64] {
        &self.actual_values
    }

    pub fn fit_quality(&self) -> &FitQuality {
        &self.fit_quality
    }

    pub fn r_squared(&self) -> f64 {
        self.fit_quality.r_squared
    }

    pub fn confidence_band(&self) -> &ConfidenceBand {
        &self.confidence_band
    }

    pub fn equation(&self) -> &str {
        &self.equation
    }

    /// Terms kept by stepwise selection; `None` for other families
    pub fn selected_features(&self) -> Option<&[String]> {
        self.selected_features.as_deref()
    }

    /// Solver iterations (1 for direct solves)
    pub fn iterations(&self) -> usize {
        self.iterations
    }

    pub fn converged(&self) -> bool {
        self.converged
    }

    /// Predict the response for one raw input row
    ///
    /// The row has one value per predictor; for time-series fits it holds the
    /// last `lag` values of the series in chronological order.
    pub fn predict(&self, row: &[f64]) -> Result<f64> {
        if row.len() != self.inputs {
            return Err(Error::Regression(format!(
                "Prediction row has {} values, model expects {}",
                row.len(),
                self.inputs
            )));
        }
        if row.iter().any(|v| !v.is_finite()) {
            return Err(Error::Regression(
                "Prediction row contains non-finite values".to_string(),
            ));
        }
        let design = self.basis.expand(row);
        Ok(self.link.inverse(dot(&design, &self.coefficients)))
    }
}

/// Human-readable fitted equation, coefficients to three decimals
pub(crate) fn equation_text(dependent: &str, link: Link, terms: &[String], coefficients: &[f64]) -> String {
    let lhs = match link {
        Link::Identity => dependent.to_string(),
        Link::Logit => format!("logit(P({dependent}))"),
        Link::Log => format!("ln({dependent})"),
    };
    let mut text = format!("{lhs} = {:.3}", coefficients.first().copied().unwrap_or(0.0));
    for (term, &b) in terms.iter().zip(coefficients.iter().skip(1)) {
        let sign = if b < 0.0 { '-' } else { '+' };
        text.push_str(&format!(" {sign} {:.3}×{term}", b.abs()));
    }
    text
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_equation_text() {
        let terms = vec!["price".to_string(), "ads".to_string()];
        let text = equation_text("sales", Link::Identity, &terms, &[90.0, 10.0, -0.5]);
        assert_eq!(text, "sales = 90.000 + 10.000×price - 0.500×ads");

        let text = equation_text("churn", Link::Logit, &terms[..1], &[-1.0, 2.0]);
        assert_eq!(text, "logit(P(churn)) = -1.000 + 2.000×price");
    }
}
