//! Family strategy table
//!
//! One row per [`RegressionFamily`]: how raw predictors become design
//! columns, how the response is linked, which solver runs and which
//! predictor counts are accepted. Adding a family means adding a row.

use crate::design::{log_floor, Basis};
use crate::family::RegressionFamily;
use crate::options::RegressionOptions;
use crate::solvers::{self, sigmoid, Solution};
use insight_core::{Matrix, Result};
use serde::{Deserialize, Serialize};

/// Map between the fitted linear predictor and the response scale
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Link {
    Identity,
    /// Predictions are probabilities `sigmoid(Xβ)`
    Logit,
    /// The response is fitted as `ln(y)` and predicted as `exp(Xβ)`
    Log,
}

impl Link {
    /// Response value on the scale the solver fits
    pub fn transform_target(&self, y: f64) -> f64 {
        match self {
            Link::Identity | Link::Logit => y,
            Link::Log => log_floor(y),
        }
    }

    /// Linear predictor back to the response scale
    pub fn inverse(&self, eta: f64) -> f64 {
        match self {
            Link::Identity => eta,
            Link::Logit => sigmoid(eta),
            Link::Log => eta.exp(),
        }
    }
}

pub(crate) type SolveFn = fn(&Matrix, &[f64], &RegressionOptions) -> Result<Solution>;

pub(crate) struct Strategy {
    pub family: RegressionFamily,
    pub basis: fn(&RegressionOptions) -> Basis,
    pub link: Link,
    pub solve: SolveFn,
    pub min_predictors: usize,
    /// `None` for no upper bound
    pub max_predictors: Option<usize>,
    /// Fit on lagged values of the response instead of the supplied predictors
    pub autoregressive: bool,
}

fn identity_basis(_: &RegressionOptions) -> Basis {
    Basis::Identity
}

fn polynomial_basis(options: &RegressionOptions) -> Basis {
    Basis::Polynomial(options.degree)
}

fn log_basis(_: &RegressionOptions) -> Basis {
    Basis::Log
}

const fn row(family: RegressionFamily, solve: SolveFn) -> Strategy {
    Strategy {
        family,
        basis: identity_basis,
        link: Link::Identity,
        solve,
        min_predictors: 1,
        max_predictors: None,
        autoregressive: false,
    }
}

/// Indexed by the declaration order of [`RegressionFamily`]
pub(crate) static STRATEGIES: [Strategy; 11] = [
    Strategy {
        max_predictors: Some(1),
        ..row(RegressionFamily::Linear, solvers::ordinary_least_squares)
    },
    row(RegressionFamily::Multiple, solvers::ordinary_least_squares),
    Strategy {
        basis: polynomial_basis,
        ..row(RegressionFamily::Polynomial, solvers::ordinary_least_squares)
    },
    row(RegressionFamily::Ridge, solvers::ridge),
    row(RegressionFamily::Lasso, solvers::lasso),
    row(RegressionFamily::ElasticNet, solvers::elastic_net),
    row(RegressionFamily::Stepwise, solvers::stepwise),
    Strategy {
        link: Link::Logit,
        ..row(RegressionFamily::Logistic, solvers::logistic)
    },
    row(RegressionFamily::Quantile, solvers::quantile),
    Strategy {
        min_predictors: 0,
        autoregressive: true,
        ..row(RegressionFamily::TimeSeries, solvers::ordinary_least_squares)
    },
    Strategy {
        basis: log_basis,
        link: Link::Log,
        ..row(RegressionFamily::LogLog, solvers::ordinary_least_squares)
    },
];

pub(crate) fn strategy_for(family: RegressionFamily) -> &'static Strategy {
    &STRATEGIES[family as usize]
}
