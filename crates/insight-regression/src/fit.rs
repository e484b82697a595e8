//! Fit entry points
//!
//! [`fit_regression`] takes raw row-major predictors; [`fit_fields`] takes
//! numeric fields and names the equation terms after them. Both validate
//! shapes and values before any computation and never return an empty
//! model.

use crate::design::lagged_rows;
use crate::family::RegressionFamily;
use crate::metrics::{confidence_band, FitQuality};
use crate::model::{equation_text, RegressionModel};
use crate::options::RegressionOptions;
use crate::solvers::fitted_values;
use crate::strategy::{strategy_for, Link};
use insight_core::{Error, Field, Result};
use tracing::{debug, instrument};

/// Fit one model family to row-major predictors `x` and response `y`
///
/// Predictors are named `x1..xp` and the response `y`. Time-series fits
/// ignore `x` and regress `y` on its own lagged values.
pub fn fit_regression(
    family: RegressionFamily,
    x: &[Vec<f64>],
    y: &[f64],
    options: &RegressionOptions,
) -> Result<RegressionModel> {
    let width = x.first().map_or(0, Vec::len);
    let names: Vec<String> = (1..=width).map(|i| format!("x{i}")).collect();
    fit_named(family, x, y, &names, "y", options)
}

/// Fit one model family to numeric fields
///
/// Needs at least one independent field besides the dependent one, all of
/// the same length.
pub fn fit_fields(
    family: RegressionFamily,
    independents: &[&Field],
    dependent: &Field,
    options: &RegressionOptions,
) -> Result<RegressionModel> {
    let y = dependent.numeric_values()?;
    let needs_predictors = !strategy_for(family).autoregressive;
    if needs_predictors && independents.is_empty() {
        return Err(Error::Validation(
            "Regression requires at least two numeric fields".to_string(),
        ));
    }

    let columns: Vec<&[f64]> = independents
        .iter()
        .map(|f| f.numeric_values())
        .collect::<Result<_>>()?;
    for (field, column) in independents.iter().zip(&columns) {
        if column.len() != y.len() {
            return Err(Error::size_mismatch(
                y.len(),
                column.len(),
                &format!("field '{}'", field.name()),
            ));
        }
    }

    let rows: Vec<Vec<f64>> = if needs_predictors {
        (0..y.len())
            .map(|i| columns.iter().map(|c| c[i]).collect())
            .collect()
    } else {
        Vec::new()
    };
    let names: Vec<String> = independents.iter().map(|f| f.name().to_string()).collect();
    fit_named(family, &rows, y, &names, dependent.name(), options)
}

/// Fewest rows a fit on `inputs` raw predictors can succeed with
///
/// Every fit keeps at least two residual degrees of freedom beyond its
/// terms. Time-series fits ignore `inputs` and also lose `lag` leading rows.
pub fn required_rows(family: RegressionFamily, inputs: usize, options: &RegressionOptions) -> usize {
    let strategy = strategy_for(family);
    let (inputs, lost) = if strategy.autoregressive {
        (options.lag, options.lag)
    } else {
        (inputs, 0)
    };
    // columns counts the intercept, so terms + 2 is columns + 1
    lost + (strategy.basis)(options).columns(inputs) + 1
}

fn regression_error(msg: impl Into<String>) -> Error {
    Error::Regression(msg.into())
}

fn check_finite(values: &[f64], what: &str) -> Result<()> {
    if values.iter().any(|v| !v.is_finite()) {
        return Err(regression_error(format!("{what} contains NaN or infinite values")));
    }
    Ok(())
}

/// Raw predictor rows after shape checks
fn validated_rows<'a>(
    family: RegressionFamily,
    x: &'a [Vec<f64>],
    y: &[f64],
    max_predictors: Option<usize>,
    min_predictors: usize,
) -> Result<&'a [Vec<f64>]> {
    if x.len() != y.len() {
        return Err(regression_error(format!(
            "Number of samples must match: {} predictor rows, {} responses",
            x.len(),
            y.len()
        )));
    }
    let width = x.first().map_or(0, Vec::len);
    if x.iter().any(|row| row.len() != width) {
        return Err(regression_error("Inconsistent number of features across rows"));
    }
    if width < min_predictors {
        return Err(regression_error(format!(
            "{family} regression needs at least {min_predictors} predictor(s)"
        )));
    }
    if let Some(max) = max_predictors {
        if width > max {
            return Err(regression_error(format!(
                "{family} regression accepts at most {max} predictor(s), got {width}"
            )));
        }
    }
    for row in x {
        check_finite(row, "Predictor data")?;
    }
    Ok(x)
}

#[instrument(skip(family, x, y, names, options), fields(family = %family, n = y.len()))]
fn fit_named(
    family: RegressionFamily,
    x: &[Vec<f64>],
    y: &[f64],
    names: &[String],
    dependent: &str,
    options: &RegressionOptions,
) -> Result<RegressionModel> {
    options.validate()?;
    let strategy = strategy_for(family);

    if y.is_empty() {
        return Err(regression_error("Response has no values"));
    }
    check_finite(y, "Response data")?;

    let (raw_rows, actual, terms_in): (Vec<Vec<f64>>, Vec<f64>, Vec<String>) =
        if strategy.autoregressive {
            let (rows, targets) = lagged_rows(y, options.lag);
            let names = (1..=options.lag)
                .rev()
                .map(|k| format!("{dependent}[t-{k}]"))
                .collect();
            (rows, targets, names)
        } else {
            let rows = validated_rows(
                family,
                x,
                y,
                strategy.max_predictors,
                strategy.min_predictors,
            )?;
            (rows.to_vec(), y.to_vec(), names.to_vec())
        };

    if strategy.link == Link::Logit && actual.iter().any(|v| !(0.0..=1.0).contains(v)) {
        return Err(regression_error("Logistic regression needs responses in [0, 1]"));
    }

    let basis = (strategy.basis)(options);
    let inputs = terms_in.len();
    let columns = basis.columns(inputs);
    let predictors = columns - 1;
    let n = actual.len();
    if n < predictors + 2 {
        return Err(regression_error(format!(
            "{family} regression with {predictors} term(s) needs at least {} observations, got {n}",
            predictors + 2
        )));
    }

    let design = basis.design_matrix(&raw_rows)?;
    let target: Vec<f64> = actual.iter().map(|&v| strategy.link.transform_target(v)).collect();
    let solution = (strategy.solve)(&design, &target, options)?;

    let predictions: Vec<f64> = fitted_values(&design, &solution.coefficients)?
        .into_iter()
        .map(|eta| strategy.link.inverse(eta))
        .collect();
    if predictions.iter().any(|p| !p.is_finite()) {
        return Err(regression_error(format!(
            "{family} fit produced non-finite predictions"
        )));
    }

    let terms = basis.term_names(&terms_in);
    let effective_predictors = solution.selected.as_ref().map_or(predictors, Vec::len);
    let fit_quality = FitQuality::compute(&actual, &predictions, effective_predictors);
    let band = confidence_band(
        &predictions,
        &design,
        fit_quality.standard_error,
        n - effective_predictors - 1,
    );
    let selected_features = solution
        .selected
        .as_ref()
        .map(|idx| idx.iter().filter_map(|&i| terms.get(i).cloned()).collect());
    let equation = equation_text(dependent, strategy.link, &terms, &solution.coefficients);

    debug!(
        "fitted {family}: R²={:.4}, iterations={}, converged={}",
        fit_quality.r_squared, solution.iterations, solution.converged
    );

    Ok(RegressionModel {
        family,
        dependent: dependent.to_string(),
        terms,
        coefficients: solution.coefficients,
        predictions,
        actual_values: actual,
        fit_quality,
        confidence_band: band,
        equation,
        selected_features,
        iterations: solution.iterations,
        converged: solution.converged,
        basis,
        link: strategy.link,
        inputs,
    })
}
