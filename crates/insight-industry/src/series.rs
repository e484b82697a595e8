//! Growth, seasonality and short forecasts of numeric series
//!
//! A series is seasonal with period `p` when its lag-`p` autocorrelation is
//! the largest among lags `2..=n/2` and exceeds [`SEASONALITY_THRESHOLD`].
//! Seasonal series are forecast along their least-squares trend line scaled
//! by a per-phase seasonal index; the rest follow a smoothed linear trend.

use crate::check_finite;
use insight_core::{Error, Field, Result};
use insight_descriptive::statistics::{compensated_sum, trend, Trend};
use serde::{Deserialize, Serialize};
use tracing::{debug, instrument};

/// Points forecast when no horizon is given
pub const FORECAST_HORIZON: usize = 5;

/// Autocorrelation a lag must exceed to count as a season
pub const SEASONALITY_THRESHOLD: f64 = 0.7;

/// Shortest series checked for seasonality
pub const MIN_SEASONAL_LENGTH: usize = 8;

/// Smoothing weight for the trend of a non-seasonal forecast
const TREND_SMOOTHING: f64 = 0.3;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SeriesSummary {
    pub field: String,
    pub trend: Trend,
    pub growth_rate: f64,
    pub seasonality: Option<usize>,
    pub forecast: Vec<f64>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BusinessMetric {
    pub field: String,
    pub growth_rate: f64,
    pub trend: Trend,
    pub summary: String,
}

/// Percent change from the first value to the last
///
/// 0 for fewer than two values or a zero first value.
pub fn growth_rate(values: &[f64]) -> f64 {
    match (values.first(), values.last()) {
        (Some(&first), Some(&last)) if values.len() > 1 && first != 0.0 => {
            (last - first) / first.abs() * 100.0
        }
        _ => 0.0,
    }
}

/// Lag-`lag` autocorrelation about the full-series mean
///
/// Both sums run over the first `n - lag` points. 0 when the lag leaves no
/// pairs or those points have no spread.
pub fn autocorrelation(values: &[f64], lag: usize) -> f64 {
    let n = values.len();
    if lag == 0 || lag >= n {
        return 0.0;
    }
    let m = compensated_sum(values.iter().copied()) / n as f64;
    let numerator = compensated_sum((0..n - lag).map(|i| (values[i] - m) * (values[i + lag] - m)));
    let denominator = compensated_sum(values[..n - lag].iter().map(|v| (v - m) * (v - m)));
    if denominator == 0.0 {
        return 0.0;
    }
    numerator / denominator
}

/// Period of the strongest seasonal lag, if any
pub fn detect_seasonality(values: &[f64]) -> Option<usize> {
    if values.len() < MIN_SEASONAL_LENGTH {
        return None;
    }
    let mut best: Option<(usize, f64)> = None;
    for lag in 2..=values.len() / 2 {
        let r = autocorrelation(values, lag);
        if r > SEASONALITY_THRESHOLD && best.map_or(true, |(_, b)| r > b) {
            best = Some((lag, r));
        }
    }
    best.map(|(lag, _)| lag)
}

/// Least-squares line through `(i, values[i])` as `(slope, intercept)`
fn trend_line(values: &[f64]) -> (f64, f64) {
    let n = values.len() as f64;
    let mean_x = (n - 1.0) / 2.0;
    let mean_y = compensated_sum(values.iter().copied()) / n;
    let sxy = compensated_sum(
        values
            .iter()
            .enumerate()
            .map(|(i, y)| (i as f64 - mean_x) * (y - mean_y)),
    );
    let sxx = compensated_sum((0..values.len()).map(|i| (i as f64 - mean_x).powi(2)));
    let slope = if sxx == 0.0 { 0.0 } else { sxy / sxx };
    (slope, mean_y - slope * mean_x)
}

/// Mean of each phase relative to the overall mean; all 1 for a zero mean
fn seasonal_indices(values: &[f64], period: usize) -> Vec<f64> {
    let overall = compensated_sum(values.iter().copied()) / values.len() as f64;
    (0..period)
        .map(|phase| {
            let phase_values: Vec<f64> = values.iter().skip(phase).step_by(period).copied().collect();
            if overall == 0.0 || phase_values.is_empty() {
                1.0
            } else {
                compensated_sum(phase_values.iter().copied()) / phase_values.len() as f64 / overall
            }
        })
        .collect()
}

/// `horizon` points beyond the end of the series
///
/// Seasonal series follow their trend line times the seasonal index of each
/// future point's phase. Otherwise each step adds a trend that starts as the
/// last difference and is smoothed toward the latest step.
pub fn forecast(values: &[f64], horizon: usize) -> Result<Vec<f64>> {
    check_finite(values, "forecast input")?;
    let n = values.len();
    if let Some(period) = detect_seasonality(values) {
        let (slope, intercept) = trend_line(values);
        let indices = seasonal_indices(values, period);
        return Ok((n..n + horizon)
            .map(|t| (slope * t as f64 + intercept) * indices[t % period])
            .collect());
    }

    let mut last = values[n - 1];
    let mut step = if n > 1 { last - values[n - 2] } else { 0.0 };
    let mut out = Vec::with_capacity(horizon);
    for _ in 0..horizon {
        let next = last + step;
        out.push(next);
        step = TREND_SMOOTHING * (next - last) + (1.0 - TREND_SMOOTHING) * step;
        last = next;
    }
    Ok(out)
}

fn numeric_fields(fields: &[Field], analysis: &str) -> Result<Vec<(String, Vec<f64>)>> {
    let numeric = fields
        .iter()
        .filter(|f| f.is_numeric())
        .map(|f| Ok((f.name().to_string(), f.numeric_values()?.to_vec())))
        .collect::<Result<Vec<_>>>()?;
    if numeric.is_empty() {
        return Err(Error::Validation(format!(
            "{analysis} needs at least one numeric field"
        )));
    }
    Ok(numeric)
}

/// Trend, growth, seasonality and forecast of every numeric field
#[instrument(skip(fields), fields(fields = fields.len()))]
pub fn analyze_series(fields: &[Field], horizon: usize) -> Result<Vec<SeriesSummary>> {
    numeric_fields(fields, "Time series analysis")?
        .into_iter()
        .map(|(field, values)| {
            let seasonality = detect_seasonality(&values);
            debug!("series '{field}': seasonality={seasonality:?}");
            Ok(SeriesSummary {
                trend: trend(&values),
                growth_rate: growth_rate(&values),
                seasonality,
                forecast: forecast(&values, horizon)?,
                field,
            })
        })
        .collect()
}

/// Growth and trend of every numeric field, with a one-line summary
pub fn business_metrics(fields: &[Field]) -> Result<Vec<BusinessMetric>> {
    Ok(numeric_fields(fields, "Business metrics")?
        .into_iter()
        .map(|(field, values)| {
            let growth = growth_rate(&values);
            let direction = trend(&values);
            let summary = match direction {
                Trend::Up => format!("{field} changed {growth:+.1}% with an upward trend"),
                Trend::Down => format!("{field} changed {growth:+.1}% with a downward trend"),
                Trend::Stable => format!("{field} changed {growth:+.1}% and is stable"),
            };
            BusinessMetric {
                field,
                growth_rate: growth,
                trend: direction,
                summary,
            }
        })
        .collect())
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;

    #[test]
    fn test_growth_rate() {
        assert_abs_diff_eq!(growth_rate(&[100.0, 90.0, 150.0]), 50.0, epsilon = 1e-12);
        assert_abs_diff_eq!(growth_rate(&[-50.0, -25.0]), 50.0, epsilon = 1e-12);
        assert_eq!(growth_rate(&[0.0, 10.0]), 0.0);
        assert_eq!(growth_rate(&[7.0]), 0.0);
    }

    #[test]
    fn test_period_four_pattern_is_seasonal() {
        let values: Vec<f64> = (0..16).map(|i| [10.0, 30.0, 30.0, 10.0][i % 4]).collect();
        assert_eq!(detect_seasonality(&values), Some(4));
        assert!(autocorrelation(&values, 4) > 0.99);

        // Too short to judge
        assert_eq!(detect_seasonality(&values[..6]), None);
        assert_eq!(detect_seasonality(&[1.0, 2.0, 3.0, 4.0, 5.0, 6.0, 7.0, 8.0]), None);
    }

    #[test]
    fn test_seasonal_forecast_continues_the_phase() {
        let pattern = [10.0, 30.0, 30.0, 10.0];
        let values: Vec<f64> = (0..16).map(|i| pattern[i % 4]).collect();
        let projected = forecast(&values, 4).unwrap();
        // Flat trend at the mean of 20, so the forecast repeats the pattern
        for (p, expected) in projected.iter().zip(pattern) {
            assert_abs_diff_eq!(*p, expected, epsilon = 1e-9);
        }
    }

    #[test]
    fn test_linear_forecast_keeps_constant_steps() {
        let projected = forecast(&[1.0, 3.0, 5.0], 3).unwrap();
        for (p, expected) in projected.iter().zip([7.0, 9.0, 11.0]) {
            assert_abs_diff_eq!(*p, expected, epsilon = 1e-12);
        }
        assert_eq!(forecast(&[4.0], 2).unwrap(), vec![4.0, 4.0]);
        assert!(forecast(&[], 2).is_err());
    }

    #[test]
    fn test_business_summary() {
        let fields = vec![
            Field::numeric("revenue", vec![100.0, 110.0, 130.0, 150.0]),
            Field::text("region", ["n", "s", "e", "w"]),
        ];
        let metrics = business_metrics(&fields).unwrap();
        assert_eq!(metrics.len(), 1);
        assert_eq!(metrics[0].summary, "revenue changed +50.0% with an upward trend");
        assert!(business_metrics(&fields[1..]).is_err());
    }
}
