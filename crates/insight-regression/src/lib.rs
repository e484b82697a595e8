//! Regression engine for insight-stats
//!
//! Eleven model families share one input shape (row-major predictors plus a
//! response) and one output shape ([`RegressionModel`]). Each family is a
//! row in a strategy table that picks the design basis, the response link
//! and the solver; every solver runs on the
//! [`insight_core::linalg`] kernel.
//!
//! | Family | Solver |
//! |---|---|
//! | linear, multiple | OLS on `XᵗXβ = Xᵗy` |
//! | polynomial | OLS on `x¹..x^d` columns |
//! | ridge | OLS with `XᵗX + αI` |
//! | lasso | coordinate descent with soft thresholding |
//! | elastic-net | lasso at `α·l1Ratio` plus ridge at `α·(1-l1Ratio)` |
//! | stepwise | forward selection by marginal R² gain |
//! | logistic | Newton/IRLS, sigmoid predictions |
//! | quantile | IRLS with asymmetric `q`/`(1-q)` weights |
//! | time-series | OLS on `lag` trailing values of the response |
//! | log-log | OLS on `ln` of floored values, predictions exponentiated |
//!
//! # Example
//!
//! ```rust
//! use insight_regression::{fit_regression, RegressionFamily, RegressionOptions};
//!
//! let x: Vec<Vec<f64>> = (1..=5).map(|v| vec![v as f64]).collect();
//! let y = [100.0, 110.0, 120.0, 130.0, 140.0];
//! let model = fit_regression(RegressionFamily::Linear, &x, &y, &RegressionOptions::default()).unwrap();
//! assert!((model.slopes()[0] - 10.0).abs() < 1e-9);
//! assert!((model.intercept() - 90.0).abs() < 1e-9);
//! ```
//!
//! # Limitations
//!
//! Collinear predictors are not rejected: the kernel solves the normal
//! equations as given and may return very large coefficients.

pub mod design;
pub mod family;
pub mod fit;
pub mod metrics;
pub mod model;
pub mod options;
pub mod solvers;
pub mod strategy;

pub use design::Basis;
pub use family::RegressionFamily;
pub use fit::{fit_fields, fit_regression, required_rows};
pub use metrics::{ConfidenceBand, FitQuality};
pub use model::RegressionModel;
pub use options::RegressionOptions;
pub use strategy::Link;
