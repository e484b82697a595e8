//! Regression model families

use insight_core::Error;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// The eleven supported model families
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum RegressionFamily {
    /// Simple OLS with exactly one predictor
    Linear,
    /// OLS with one or more predictors
    Multiple,
    Polynomial,
    Ridge,
    Lasso,
    ElasticNet,
    Stepwise,
    Logistic,
    Quantile,
    /// Autoregression on lagged values of the response
    TimeSeries,
    LogLog,
}

impl RegressionFamily {
    pub const ALL: [RegressionFamily; 11] = [
        RegressionFamily::Linear,
        RegressionFamily::Multiple,
        RegressionFamily::Polynomial,
        RegressionFamily::Ridge,
        RegressionFamily::Lasso,
        RegressionFamily::ElasticNet,
        RegressionFamily::Stepwise,
        RegressionFamily::Logistic,
        RegressionFamily::Quantile,
        RegressionFamily::TimeSeries,
        RegressionFamily::LogLog,
    ];

    pub fn name(&self) -> &'static str {
        match self {
            RegressionFamily::Linear => "linear",
            RegressionFamily::Multiple => "multiple",
            RegressionFamily::Polynomial => "polynomial",
            RegressionFamily::Ridge => "ridge",
            RegressionFamily::Lasso => "lasso",
            RegressionFamily::ElasticNet => "elastic-net",
            RegressionFamily::Stepwise => "stepwise",
            RegressionFamily::Logistic => "logistic",
            RegressionFamily::Quantile => "quantile",
            RegressionFamily::TimeSeries => "time-series",
            RegressionFamily::LogLog => "log-log",
        }
    }
}

impl fmt::Display for RegressionFamily {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for RegressionFamily {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let wanted = s.trim().to_ascii_lowercase().replace('_', "-");
        Self::ALL
            .iter()
            .copied()
            .find(|f| f.name() == wanted)
            .ok_or_else(|| Error::unknown_family(s))
    }
}
