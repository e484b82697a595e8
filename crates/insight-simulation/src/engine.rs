//! Scenario simulation over numeric fields

use crate::config::SimulationConfig;
use crate::scenario::{Scenario, ScenarioKind, ScenarioSummary};
use crate::sensitivity::{self, SensitivityAnalysis};
use insight_core::{Error, Field, Result};
use insight_descriptive::statistics::{compensated_sum, mean, std_dev, trend, Trend};
use rand::prelude::*;
use rand_chacha::ChaCha8Rng;
use serde::{Deserialize, Serialize};
use tracing::{debug, instrument};

/// Scales uniform noise on (-1, 1) to a monthly share of the volatility
const NOISE_SCALE: f64 = 0.288_675_134_594_812_9; // sqrt(1/12)

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SimulationResult {
    pub field: String,
    pub trend: Trend,
    pub volatility: f64,
    pub scenarios: Vec<Scenario>,
    pub sensitivity: SensitivityAnalysis,
    pub summary: ScenarioSummary,
}

impl SimulationResult {
    pub fn scenario(&self, kind: ScenarioKind) -> Option<&Scenario> {
        self.scenarios.iter().find(|s| s.kind == kind)
    }
}

/// Multiplier on the scenario adjustment for a historical trend
pub fn trend_factor(trend: Trend) -> f64 {
    match trend {
        Trend::Up => 1.1,
        Trend::Down => 0.9,
        Trend::Stable => 1.0,
    }
}

/// Population standard deviation of consecutive log returns
///
/// 0 for fewer than two values or when any value is not positive.
pub fn volatility(values: &[f64]) -> f64 {
    if values.len() < 2 || values.iter().any(|&v| v <= 0.0) {
        return 0.0;
    }
    let returns: Vec<f64> = values.windows(2).map(|w| (w[1] / w[0]).ln()).collect();
    let n = returns.len() as f64;
    let m = compensated_sum(returns.iter().copied()) / n;
    (compensated_sum(returns.iter().map(|r| (r - m) * (r - m))) / n).sqrt()
}

/// Multiplier applied to a scenario level for one uniform draw on (-1, 1)
///
/// Never negative, however large the volatility.
pub fn noise_multiplier(volatility: f64, draw: f64) -> f64 {
    (1.0 + volatility * NOISE_SCALE * draw).max(0.0)
}

/// Simulate every numeric field with the default configuration
pub fn run_simulation(fields: &[Field]) -> Result<Vec<SimulationResult>> {
    run_simulation_with(fields, &SimulationConfig::default())
}

/// Simulate every numeric field
///
/// Fails when there are no fields, no numeric fields, or a numeric field
/// is empty or holds a non-finite value. Non-numeric fields are skipped.
#[instrument(skip(fields, config), fields(fields = fields.len(), horizon = config.horizon))]
pub fn run_simulation_with(fields: &[Field], config: &SimulationConfig) -> Result<Vec<SimulationResult>> {
    config.validate()?;
    if fields.is_empty() {
        return Err(Error::Simulation(
            "Please upload data before running simulations".to_string(),
        ));
    }
    let numeric: Vec<(&str, &[f64])> = fields
        .iter()
        .filter_map(|f| f.as_numeric().map(|v| (f.name(), v)))
        .collect();
    if numeric.is_empty() {
        return Err(Error::Simulation(
            "Your data must contain numeric fields to run simulations".to_string(),
        ));
    }
    for (name, values) in &numeric {
        if values.is_empty() {
            return Err(Error::Simulation(format!("Numeric field '{name}' is empty")));
        }
        if values.iter().any(|v| !v.is_finite()) {
            return Err(Error::Simulation(format!(
                "Numeric field '{name}' contains NaN or infinite values"
            )));
        }
    }

    let seed = config.seed.unwrap_or_else(|| thread_rng().gen());
    numeric
        .iter()
        .enumerate()
        .map(|(i, (name, values))| {
            let mut rng = ChaCha8Rng::seed_from_u64(seed.wrapping_add(i as u64));
            simulate_field(name, values, config, &mut rng)
        })
        .collect()
}

fn simulate_field<R: Rng>(
    name: &str,
    values: &[f64],
    config: &SimulationConfig,
    rng: &mut R,
) -> Result<SimulationResult> {
    let last = values[values.len() - 1];
    let direction = trend(values);
    let factor = trend_factor(direction);
    let vol = volatility(values);

    // Scenarios share the noise so they differ only by their adjustment.
    // The multiplier is floored at 0 so a positive level never flips sign.
    let noise: Vec<f64> = (0..config.horizon)
        .map(|_| noise_multiplier(vol, rng.gen_range(-1.0..1.0)))
        .collect();

    let probability = |kind: ScenarioKind| match kind {
        ScenarioKind::Best => config.best_probability,
        ScenarioKind::Base => config.base_probability,
        ScenarioKind::Worst => config.worst_probability,
    };
    let scenarios = ScenarioKind::ALL
        .iter()
        .map(|&kind| {
            let adjustment = kind.direction() * config.adjustment;
            let level = last * (1.0 + factor * adjustment);
            Scenario {
                kind,
                name: kind.name().to_string(),
                description: kind.description().to_string(),
                adjustment_percent: adjustment * 100.0,
                probability: probability(kind),
                values: noise.iter().map(|n| level * n).collect(),
            }
        })
        .collect();

    let summary = ScenarioSummary::new(last, config.adjustment, mean(values)?, std_dev(values)?);
    debug!("simulated '{name}': trend={direction}, volatility={vol:.4}");

    Ok(SimulationResult {
        field: name.to_string(),
        trend: direction,
        volatility: vol,
        scenarios,
        sensitivity: sensitivity::analyze(name, values, &config.sensitivity_steps),
        summary,
    })
}
