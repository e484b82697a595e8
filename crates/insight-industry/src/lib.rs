//! Domain analyses for insight-stats
//!
//! Analyses that read meaning into field names, the way uploaded business
//! tables are usually labelled:
//!
//! - [`risk`]: volatility, Sharpe ratio and maximum drawdown of a return
//!   series, plus per-field risk factors
//! - [`fraud`]: unusual-amount, unusual-hour and location-hopping flags on
//!   transaction rows
//! - [`outliers`]: z-score outlier flags for any numeric series
//! - [`series`]: growth, seasonality and short forecasts per numeric field
//! - [`retail`]: inventory turnover, stockout risk and restock levels
//! - [`healthcare`]: outcome rates and treatment effectiveness
//!
//! Fields are located with [`find_field`], a case-insensitive match on a
//! fragment of the name (`"return"`, `"sales"`, `"outcome"`, ...).
//!
//! # Example
//!
//! ```rust
//! use insight_core::Field;
//! use insight_industry::risk::{analyze_risk, DEFAULT_RISK_FREE_RATE};
//!
//! let fields = vec![
//!     Field::numeric("monthly_return", vec![0.04, 0.01, -0.02, 0.05, 0.03]),
//!     Field::numeric("exposure", vec![100.0, 120.0, 90.0, 130.0, 140.0]),
//! ];
//! let analysis = analyze_risk(&fields, DEFAULT_RISK_FREE_RATE).unwrap();
//! let metrics = analysis.metrics.unwrap();
//! assert!(metrics.volatility > 0.0);
//! // Compounded wealth falls 2% from its peak after the -2% month
//! assert!((metrics.max_drawdown - 0.02).abs() < 1e-12);
//! ```

pub mod fraud;
pub mod healthcare;
pub mod outliers;
pub mod retail;
pub mod risk;
pub mod series;

pub use fraud::{detect_fraud, FlaggedTransaction, FraudFlag, FraudReport};
pub use healthcare::{analyze_outcomes, treatment_effectiveness, OutcomeSummary, TreatmentEffect};
pub use outliers::{z_score_outliers, Outlier, DEFAULT_Z_THRESHOLD};
pub use retail::{analyze_inventory, analyze_sales_trends, InventoryAnalysis, ProductTrend, RestockLevels};
pub use risk::{analyze_risk, max_drawdown, risk_metrics, sharpe_ratio, RiskAnalysis, RiskFactor, RiskMetrics};
pub use series::{analyze_series, business_metrics, forecast, growth_rate, BusinessMetric, SeriesSummary};

use insight_core::{Error, Field, Result};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Coarse risk bucket shared by the fraud and stockout analyses
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RiskLevel {
    Low,
    Medium,
    High,
}

impl fmt::Display for RiskLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            RiskLevel::Low => "low",
            RiskLevel::Medium => "medium",
            RiskLevel::High => "high",
        })
    }
}

/// First field whose name contains `fragment`, ignoring case
pub fn find_field<'a>(fields: &'a [Field], fragment: &str) -> Option<&'a Field> {
    let fragment = fragment.to_lowercase();
    fields
        .iter()
        .find(|f| f.name().to_lowercase().contains(&fragment))
}

/// Numeric values of the first field named like `fragment`
///
/// `None` when no such field exists or it is not numeric; an error when it
/// is numeric but empty or non-finite.
pub(crate) fn find_numeric<'a>(fields: &'a [Field], fragment: &str) -> Result<Option<&'a [f64]>> {
    match find_field(fields, fragment) {
        Some(field) if field.is_numeric() => field.numeric_values().map(Some),
        _ => Ok(None),
    }
}

/// Text values of the first field named like `fragment`
pub(crate) fn find_text<'a>(fields: &'a [Field], fragment: &str) -> Option<&'a [String]> {
    find_field(fields, fragment).and_then(Field::as_text)
}

pub(crate) fn check_finite(values: &[f64], context: &str) -> Result<()> {
    if values.is_empty() {
        return Err(Error::empty_input(context));
    }
    if values.iter().any(|v| !v.is_finite()) {
        return Err(Error::non_finite(context));
    }
    Ok(())
}

pub(crate) fn missing_field(analysis: &str, needed: &str) -> Error {
    Error::Validation(format!("{analysis} needs {needed}"))
}
