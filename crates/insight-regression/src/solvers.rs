//! Coefficient solvers
//!
//! Every solver takes a design matrix whose first column is the intercept
//! and returns coefficients in column order. All of them go through
//! [`insight_core::linalg::solve`] or coordinate descent; none allocates
//! beyond its own scratch vectors.

use crate::options::{RegressionOptions, QUANTILE_MAX_ITERATIONS};
use insight_core::linalg::{dot, solve};
use insight_core::{Matrix, Result};
use tracing::debug;

/// Residual magnitudes are floored here before quantile weights divide by them
pub const QUANTILE_RESIDUAL_FLOOR: f64 = 1e-6;

/// Probabilities are clamped to `[P_CLAMP, 1 - P_CLAMP]` in logistic IRLS
const P_CLAMP: f64 = 1e-10;

/// Output of one solver run
#[derive(Debug, Clone, PartialEq)]
pub struct Solution {
    pub coefficients: Vec<f64>,
    pub iterations: usize,
    pub converged: bool,
    /// Predictor indices kept by stepwise selection (intercept excluded)
    pub selected: Option<Vec<usize>>,
}

impl Solution {
    fn direct(coefficients: Vec<f64>) -> Self {
        Self {
            coefficients,
            iterations: 1,
            converged: true,
            selected: None,
        }
    }
}

pub fn fitted_values(x: &Matrix, coefficients: &[f64]) -> Result<Vec<f64>> {
    x.mul_vec(coefficients)
}

fn max_abs_change(a: &[f64], b: &[f64]) -> f64 {
    a.iter()
        .zip(b)
        .map(|(x, y)| (x - y).abs())
        .fold(0.0, f64::max)
}

/// Ordinary least squares on the normal equations `XᵗXβ = Xᵗy`
pub fn ordinary_least_squares(x: &Matrix, y: &[f64], _options: &RegressionOptions) -> Result<Solution> {
    let xty = x.transpose_mul_vec(y, None)?;
    solve(&x.gram(), &xty).map(Solution::direct)
}

/// Ridge: `(XᵗX + αI)β = Xᵗy`, the intercept column penalized too
pub fn ridge(x: &Matrix, y: &[f64], options: &RegressionOptions) -> Result<Solution> {
    ridge_with_alpha(x, y, options.alpha)
}

fn ridge_with_alpha(x: &Matrix, y: &[f64], alpha: f64) -> Result<Solution> {
    let mut xtx = x.gram();
    xtx.add_diagonal(alpha);
    let xty = x.transpose_mul_vec(y, None)?;
    solve(&xtx, &xty).map(Solution::direct)
}

fn soft_threshold(rho: f64, alpha: f64) -> f64 {
    rho.signum() * (rho.abs() - alpha).max(0.0)
}

/// Lasso by cyclic coordinate descent
///
/// Each sweep sets `βj = sign(ρ)·max(0, |ρ| - α) / ‖xj‖²` where ρ is the
/// correlation of column j with the partial residual. Columns with zero
/// norm keep a zero coefficient.
pub fn lasso(x: &Matrix, y: &[f64], options: &RegressionOptions) -> Result<Solution> {
    lasso_with_alpha(x, y, options.alpha, options)
}

fn lasso_with_alpha(x: &Matrix, y: &[f64], alpha: f64, options: &RegressionOptions) -> Result<Solution> {
    let p = x.cols();
    let columns: Vec<Vec<f64>> = (0..p).map(|j| x.column_values(j)).collect();
    let norms: Vec<f64> = columns.iter().map(|c| dot(c, c)).collect();

    let mut beta = vec![0.0; p];
    let mut residual = y.to_vec();
    let mut iterations = 0;
    let mut converged = false;

    while iterations < options.max_iterations {
        iterations += 1;
        let mut max_change: f64 = 0.0;

        for j in 0..p {
            if norms[j] == 0.0 {
                continue;
            }
            let col = &columns[j];
            let old = beta[j];
            let rho = dot(col, &residual) + old * norms[j];
            let new = soft_threshold(rho, alpha) / norms[j];
            if new != old {
                let delta = new - old;
                for (r, &xij) in residual.iter_mut().zip(col) {
                    *r -= xij * delta;
                }
                beta[j] = new;
                max_change = max_change.max(delta.abs());
            }
        }

        if max_change < options.tolerance {
            converged = true;
            break;
        }
    }

    debug!("lasso: {iterations} sweeps, converged={converged}");
    Ok(Solution {
        coefficients: beta,
        iterations,
        converged,
        selected: None,
    })
}

/// Elastic-net as the sum of a lasso fit at `α·l1Ratio` and a ridge fit at
/// `α·(1 - l1Ratio)`
pub fn elastic_net(x: &Matrix, y: &[f64], options: &RegressionOptions) -> Result<Solution> {
    let l1 = lasso_with_alpha(x, y, options.alpha * options.l1_ratio, options)?;
    let l2 = ridge_with_alpha(x, y, options.alpha * (1.0 - options.l1_ratio))?;
    let coefficients = l1
        .coefficients
        .iter()
        .zip(&l2.coefficients)
        .map(|(a, b)| a + b)
        .collect();
    Ok(Solution {
        coefficients,
        iterations: l1.iterations,
        converged: l1.converged,
        selected: None,
    })
}

fn select_columns(x: &Matrix, columns: &[usize]) -> Matrix {
    let mut out = Matrix::zeros(x.rows(), columns.len());
    for i in 0..x.rows() {
        for (k, &j) in columns.iter().enumerate() {
            out[(i, k)] = x[(i, j)];
        }
    }
    out
}

pub(crate) fn r_squared(actual: &[f64], predicted: &[f64]) -> f64 {
    let n = actual.len() as f64;
    let mean = actual.iter().sum::<f64>() / n;
    let ss_tot: f64 = actual.iter().map(|y| (y - mean).powi(2)).sum();
    let ss_res: f64 = actual.iter().zip(predicted).map(|(y, p)| (y - p).powi(2)).sum();
    if ss_tot == 0.0 {
        return if ss_res == 0.0 { 1.0 } else { 0.0 };
    }
    1.0 - ss_res / ss_tot
}

/// Greedy forward selection by marginal R² gain
///
/// The intercept is always in the model. Each round adds the predictor
/// whose inclusion raises R² the most and stops once the best gain falls
/// below `threshold`.
pub fn stepwise(x: &Matrix, y: &[f64], options: &RegressionOptions) -> Result<Solution> {
    let p = x.cols();
    let mut selected: Vec<usize> = Vec::new();
    let mut current_r2 = 0.0;
    let mut rounds = 0;

    while selected.len() + 1 < p {
        rounds += 1;
        let mut best: Option<(usize, f64)> = None;

        for candidate in 1..p {
            if selected.contains(&candidate) {
                continue;
            }
            let mut columns = vec![0];
            columns.extend(&selected);
            columns.push(candidate);
            let sub = select_columns(x, &columns);
            let fit = ordinary_least_squares(&sub, y, options)?;
            let r2 = r_squared(y, &fitted_values(&sub, &fit.coefficients)?);
            if best.map_or(true, |(_, b)| r2 > b) {
                best = Some((candidate, r2));
            }
        }

        match best {
            Some((candidate, r2)) if r2 - current_r2 >= options.threshold => {
                debug!("stepwise: added column {candidate}, R² {current_r2:.4} -> {r2:.4}");
                selected.push(candidate);
                current_r2 = r2;
            }
            _ => break,
        }
    }

    let mut columns = vec![0];
    columns.extend(&selected);
    let fit = ordinary_least_squares(&select_columns(x, &columns), y, options)?;

    let mut coefficients = vec![0.0; p];
    for (&col, &b) in columns.iter().zip(&fit.coefficients) {
        coefficients[col] = b;
    }
    Ok(Solution {
        coefficients,
        iterations: rounds,
        converged: true,
        selected: Some(selected.iter().map(|c| c - 1).collect()),
    })
}

pub fn sigmoid(z: f64) -> f64 {
    1.0 / (1.0 + (-z).exp())
}

/// Logistic regression by Newton-Raphson (IRLS)
///
/// Each step solves `(XᵗWX)δ = Xᵗ(y - p)` with `W = diag(p(1-p))`.
/// Perfectly separable data has no finite optimum; the fit then stops at
/// the iteration cap with large coefficients.
pub fn logistic(x: &Matrix, y: &[f64], options: &RegressionOptions) -> Result<Solution> {
    let mut beta = vec![0.0; x.cols()];
    let mut iterations = 0;
    let mut converged = false;

    while iterations < options.max_iterations {
        iterations += 1;
        let eta = x.mul_vec(&beta)?;
        let probs: Vec<f64> = eta
            .iter()
            .map(|&z| sigmoid(z).clamp(P_CLAMP, 1.0 - P_CLAMP))
            .collect();
        let weights: Vec<f64> = probs.iter().map(|p| p * (1.0 - p)).collect();
        let gradient_target: Vec<f64> = y.iter().zip(&probs).map(|(yi, p)| yi - p).collect();

        let hessian = x.weighted_gram(&weights)?;
        let gradient = x.transpose_mul_vec(&gradient_target, None)?;
        let step = solve(&hessian, &gradient)?;

        let change = step.iter().fold(0.0f64, |m, s| m.max(s.abs()));
        for (b, s) in beta.iter_mut().zip(&step) {
            *b += s;
        }
        if !change.is_finite() {
            break;
        }
        if change < options.tolerance {
            converged = true;
            break;
        }
    }

    debug!("logistic: {iterations} Newton steps, converged={converged}");
    Ok(Solution {
        coefficients: beta,
        iterations,
        converged,
        selected: None,
    })
}

/// Quantile regression by IRLS
///
/// Starts from OLS, then reweights each observation by `q/|r|` above the
/// fit and `(1-q)/|r|` below it, with `|r|` floored at
/// [`QUANTILE_RESIDUAL_FLOOR`]. Stops on convergence or after
/// [`QUANTILE_MAX_ITERATIONS`].
pub fn quantile(x: &Matrix, y: &[f64], options: &RegressionOptions) -> Result<Solution> {
    let q = options.quantile;
    let mut beta = ordinary_least_squares(x, y, options)?.coefficients;
    let mut iterations = 0;
    let mut converged = false;

    while iterations < QUANTILE_MAX_ITERATIONS {
        iterations += 1;
        let fitted = x.mul_vec(&beta)?;
        let weights: Vec<f64> = y
            .iter()
            .zip(&fitted)
            .map(|(yi, fi)| {
                let r = yi - fi;
                let side = if r >= 0.0 { q } else { 1.0 - q };
                side / r.abs().max(QUANTILE_RESIDUAL_FLOOR)
            })
            .collect();

        let lhs = x.weighted_gram(&weights)?;
        let rhs = x.transpose_mul_vec(y, Some(&weights))?;
        let next = solve(&lhs, &rhs)?;
        let change = max_abs_change(&next, &beta);
        beta = next;
        if change < options.tolerance {
            converged = true;
            break;
        }
    }

    debug!("quantile q={q}: {iterations} IRLS steps, converged={converged}");
    Ok(Solution {
        coefficients: beta,
        iterations,
        converged,
        selected: None,
    })
}
