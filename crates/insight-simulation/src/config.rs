//! Simulation parameters

use insight_core::{Error, Result};
use serde::{Deserialize, Serialize};

/// Tolerance on the scenario probabilities summing to 1
const PROBABILITY_TOLERANCE: f64 = 1e-9;

/// Parameters shared by every field in a simulation run
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct SimulationConfig {
    /// Number of projected points per scenario
    pub horizon: usize,
    /// Fractional adjustment of the best (+) and worst (-) scenarios
    pub adjustment: f64,
    pub best_probability: f64,
    pub base_probability: f64,
    pub worst_probability: f64,
    /// Seed for the projection noise; `None` draws one per run
    pub seed: Option<u64>,
    /// Perturbations of the last value in percent, applied in both directions
    pub sensitivity_steps: Vec<f64>,
}

impl Default for SimulationConfig {
    fn default() -> Self {
        Self {
            horizon: 5,
            adjustment: 0.15,
            best_probability: 0.25,
            base_probability: 0.5,
            worst_probability: 0.25,
            seed: None,
            sensitivity_steps: vec![10.0, 20.0, 30.0],
        }
    }
}

impl SimulationConfig {
    pub fn with_horizon(mut self, horizon: usize) -> Self {
        self.horizon = horizon;
        self
    }

    pub fn with_adjustment(mut self, adjustment: f64) -> Self {
        self.adjustment = adjustment;
        self
    }

    /// Set the best/base/worst probabilities
    pub fn with_probabilities(mut self, best: f64, base: f64, worst: f64) -> Self {
        self.best_probability = best;
        self.base_probability = base;
        self.worst_probability = worst;
        self
    }

    /// Set random seed for reproducibility
    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = Some(seed);
        self
    }

    pub fn with_sensitivity_steps(mut self, steps: Vec<f64>) -> Self {
        self.sensitivity_steps = steps;
        self
    }

    pub fn validate(&self) -> Result<()> {
        if self.horizon == 0 {
            return Err(Error::Validation("Simulation horizon must be at least 1".to_string()));
        }
        if !(0.0..1.0).contains(&self.adjustment) {
            return Err(Error::Validation(format!(
                "Scenario adjustment must be in [0, 1), got {}",
                self.adjustment
            )));
        }
        let probabilities = [self.best_probability, self.base_probability, self.worst_probability];
        if probabilities.iter().any(|p| !(0.0..=1.0).contains(p)) {
            return Err(Error::Validation(
                "Scenario probabilities must be in [0, 1]".to_string(),
            ));
        }
        let total: f64 = probabilities.iter().sum();
        if (total - 1.0).abs() > PROBABILITY_TOLERANCE {
            return Err(Error::Validation(format!(
                "Scenario probabilities must sum to 1, got {total}"
            )));
        }
        if self.sensitivity_steps.iter().any(|s| !s.is_finite() || *s <= 0.0) {
            return Err(Error::Validation(
                "Sensitivity steps must be positive percentages".to_string(),
            ));
        }
        Ok(())
    }
}
