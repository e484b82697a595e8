//! Design-matrix construction
//!
//! A [`Basis`] maps one raw input row to one design row with a leading
//! intercept column. The same mapping builds the training matrix and
//! serves [`RegressionModel::predict`](crate::RegressionModel::predict), so
//! fitted coefficients always line up with their columns.

use insight_core::{Matrix, Result};
use serde::{Deserialize, Serialize};

/// Values are floored here before a log transform
pub const LOG_FLOOR: f64 = 1e-10;

/// How raw predictors become design columns
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Basis {
    /// Raw predictors
    Identity,
    /// `x¹..x^d` of every predictor, grouped by power
    Polynomial(usize),
    /// `ln(max(x, LOG_FLOOR))` of every predictor
    Log,
}

impl Basis {
    /// Number of design columns, intercept included
    pub fn columns(&self, inputs: usize) -> usize {
        match self {
            Basis::Identity | Basis::Log => inputs + 1,
            Basis::Polynomial(degree) => inputs * degree + 1,
        }
    }

    /// Expand one raw row into a design row
    pub fn expand(&self, raw: &[f64]) -> Vec<f64> {
        let mut row = Vec::with_capacity(self.columns(raw.len()));
        row.push(1.0);
        match *self {
            Basis::Identity => row.extend_from_slice(raw),
            Basis::Log => row.extend(raw.iter().map(|&x| log_floor(x))),
            Basis::Polynomial(degree) => {
                let mut power = raw.to_vec();
                for d in 1..=degree {
                    row.extend_from_slice(&power);
                    if d < degree {
                        for (p, &x) in power.iter_mut().zip(raw) {
                            *p *= x;
                        }
                    }
                }
            }
        }
        row
    }

    /// Name of every design column after the intercept
    pub fn term_names(&self, inputs: &[String]) -> Vec<String> {
        match *self {
            Basis::Identity => inputs.to_vec(),
            Basis::Log => inputs.iter().map(|n| format!("ln({n})")).collect(),
            Basis::Polynomial(degree) => (1..=degree)
                .flat_map(|d| {
                    inputs.iter().map(move |n| {
                        if d == 1 {
                            n.clone()
                        } else {
                            format!("{n}^{d}")
                        }
                    })
                })
                .collect(),
        }
    }

    /// Full design matrix for a set of raw rows
    pub fn design_matrix(&self, rows: &[Vec<f64>]) -> Result<Matrix> {
        let expanded: Vec<Vec<f64>> = rows.iter().map(|r| self.expand(r)).collect();
        Matrix::from_rows(&expanded)
    }
}

pub fn log_floor(x: f64) -> f64 {
    x.max(LOG_FLOOR).ln()
}

/// Rows of `lag` trailing values and their targets
///
/// Row `i` holds `y[i..i + lag]` in chronological order; its target is
/// `y[i + lag]`.
pub fn lagged_rows(y: &[f64], lag: usize) -> (Vec<Vec<f64>>, Vec<f64>) {
    if y.len() <= lag {
        return (Vec::new(), Vec::new());
    }
    let rows = y.windows(lag).take(y.len() - lag).map(<[f64]>::to_vec).collect();
    (rows, y[lag..].to_vec())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_polynomial_expansion_groups_by_power() {
        let row = Basis::Polynomial(3).expand(&[2.0, 3.0]);
        assert_eq!(row, vec![1.0, 2.0, 3.0, 4.0, 9.0, 8.0, 27.0]);
        assert_eq!(Basis::Polynomial(3).columns(2), 7);

        let names = Basis::Polynomial(2).term_names(&["x".to_string()]);
        assert_eq!(names, vec!["x".to_string(), "x^2".to_string()]);
    }

    #[test]
    fn test_log_expansion_floors() {
        let row = Basis::Log.expand(&[std::f64::consts::E, 0.0, -5.0]);
        assert!((row[1] - 1.0).abs() < 1e-15);
        assert_eq!(row[2], LOG_FLOOR.ln());
        assert_eq!(row[3], LOG_FLOOR.ln());
    }

    #[test]
    fn test_lagged_rows() {
        let (rows, targets) = lagged_rows(&[1.0, 2.0, 3.0, 4.0, 5.0], 2);
        assert_eq!(rows, vec![vec![1.0, 2.0], vec![2.0, 3.0], vec![3.0, 4.0]]);
        assert_eq!(targets, vec![3.0, 4.0, 5.0]);
        assert!(lagged_rows(&[1.0, 2.0], 2).0.is_empty());
    }
}
