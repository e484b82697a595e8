//! Return-series risk metrics and per-field risk factors
//!
//! [`risk_metrics`] treats its input as periodic simple returns. Volatility
//! is the population standard deviation of the returns, the Sharpe ratio is
//! `(mean - risk_free) / volatility`, and the maximum drawdown is measured
//! on the wealth curve `Π(1 + r)` that the returns compound into.

use crate::{check_finite, find_field};
use insight_core::{Error, Field, Result};
use insight_descriptive::statistics::{mean, std_dev, trend, Trend};
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use tracing::{debug, instrument};

/// Per-period risk-free rate assumed when none is given
pub const DEFAULT_RISK_FREE_RATE: f64 = 0.02;

/// Impact above which a factor is flagged for close monitoring
pub const HIGH_IMPACT: f64 = 0.5;

#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RiskMetrics {
    pub volatility: f64,
    pub sharpe_ratio: f64,
    pub max_drawdown: f64,
}

impl RiskMetrics {
    /// Weighted blend of the three metrics; a positive Sharpe ratio adds no risk
    pub fn score(&self) -> f64 {
        self.volatility * 0.4 + (-self.sharpe_ratio).max(0.0) * 0.3 + self.max_drawdown * 0.3
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RiskFactor {
    pub field: String,
    /// Coefficient of variation weighted by the field's trend
    pub impact: f64,
    pub trend: Trend,
    pub recommendations: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RiskAnalysis {
    pub overall_risk: f64,
    /// Sorted by descending absolute impact
    pub factors: Vec<RiskFactor>,
    /// Present when a field named like "return" exists
    pub metrics: Option<RiskMetrics>,
    pub returns_field: Option<String>,
}

/// `(mean - risk_free) / volatility`, 0 for returns without spread
pub fn sharpe_ratio(returns: &[f64], risk_free_rate: f64) -> Result<f64> {
    check_finite(returns, "returns")?;
    let volatility = std_dev(returns)?;
    if volatility == 0.0 {
        return Ok(0.0);
    }
    Ok((mean(returns)? - risk_free_rate) / volatility)
}

/// Largest fractional fall from a running peak of a level series
///
/// Falls are only measured from positive peaks. 0 for a series that never
/// falls.
pub fn max_drawdown(levels: &[f64]) -> Result<f64> {
    check_finite(levels, "drawdown levels")?;
    let mut peak = levels[0];
    let mut worst: f64 = 0.0;
    for &level in levels {
        if level > peak {
            peak = level;
        } else if peak > 0.0 {
            worst = worst.max((peak - level) / peak);
        }
    }
    Ok(worst)
}

/// Wealth of one unit invested before the first return, floored at 0
fn wealth_curve(returns: &[f64]) -> Vec<f64> {
    let mut wealth = 1.0;
    let mut curve = Vec::with_capacity(returns.len() + 1);
    curve.push(wealth);
    for r in returns {
        wealth = (wealth * (1.0 + r)).max(0.0);
        curve.push(wealth);
    }
    curve
}

pub fn risk_metrics(returns: &[f64], risk_free_rate: f64) -> Result<RiskMetrics> {
    check_finite(returns, "returns")?;
    if !risk_free_rate.is_finite() {
        return Err(Error::Validation(format!(
            "Risk-free rate must be finite, got {risk_free_rate}"
        )));
    }
    Ok(RiskMetrics {
        volatility: std_dev(returns)?,
        sharpe_ratio: sharpe_ratio(returns, risk_free_rate)?,
        max_drawdown: max_drawdown(&wealth_curve(returns))?,
    })
}

fn trend_weight(trend: Trend) -> f64 {
    match trend {
        Trend::Up => 1.2,
        Trend::Down => 0.8,
        Trend::Stable => 1.0,
    }
}

fn recommendations(name: &str, impact: f64, trend: Trend) -> Vec<String> {
    let mut out = Vec::new();
    if impact.abs() > HIGH_IMPACT {
        out.push(format!("Monitor {name} closely due to high volatility"));
    }
    if impact > 0.0 {
        match trend {
            Trend::Up => out.push(format!("Consider hedging against rising {name}")),
            Trend::Down => out.push(format!("Evaluate exposure to declining {name}")),
            Trend::Stable => {}
        }
    }
    if out.is_empty() {
        out.push(format!("Maintain current position on {name}"));
    }
    out
}

/// Risk factor of one numeric series
///
/// The impact is the coefficient of variation `σ / |mean|` (0 for a zero
/// mean) scaled by 1.2 for a rising series and 0.8 for a falling one.
pub fn risk_factor(name: &str, values: &[f64]) -> Result<RiskFactor> {
    check_finite(values, name)?;
    let m = mean(values)?;
    let cv = if m == 0.0 { 0.0 } else { std_dev(values)? / m.abs() };
    let direction = trend(values);
    let impact = cv * trend_weight(direction);
    Ok(RiskFactor {
        field: name.to_string(),
        impact,
        trend: direction,
        recommendations: recommendations(name, impact, direction),
    })
}

/// Risk factors for every numeric field, and return metrics when a field
/// named like "return" exists
///
/// The overall risk is `0.6 · mean |impact| + 0.4 · metrics score`.
#[instrument(skip(fields), fields(fields = fields.len()))]
pub fn analyze_risk(fields: &[Field], risk_free_rate: f64) -> Result<RiskAnalysis> {
    let mut factors = fields
        .iter()
        .filter(|f| f.is_numeric())
        .map(|f| risk_factor(f.name(), f.numeric_values()?))
        .collect::<Result<Vec<_>>>()?;
    if factors.is_empty() {
        return Err(Error::Validation(
            "Risk analysis needs at least one numeric field".to_string(),
        ));
    }
    factors.sort_by(|a, b| {
        b.impact
            .abs()
            .partial_cmp(&a.impact.abs())
            .unwrap_or(Ordering::Equal)
    });

    let returns = find_field(fields, "return").filter(|f| f.is_numeric());
    let metrics = returns
        .map(|f| risk_metrics(f.numeric_values()?, risk_free_rate))
        .transpose()?;

    let factor_risk = factors.iter().map(|f| f.impact.abs()).sum::<f64>() / factors.len() as f64;
    let overall_risk = factor_risk * 0.6 + metrics.map_or(0.0, |m| m.score()) * 0.4;
    debug!(
        "risk over {} factors: overall={overall_risk:.4}, returns field={:?}",
        factors.len(),
        returns.map(Field::name)
    );

    Ok(RiskAnalysis {
        overall_risk,
        factors,
        metrics,
        returns_field: returns.map(|f| f.name().to_string()),
    })
}
