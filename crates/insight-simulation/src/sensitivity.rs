//! Sensitivity of a field to perturbations of its last value

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Direction {
    Positive,
    Negative,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Variation {
    /// Signed perturbation in percent
    pub percentage: f64,
    /// Fractional change of the perturbed value
    pub impact: f64,
    pub direction: Direction,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SensitivityAnalysis {
    pub variable: String,
    pub variations: Vec<Variation>,
    pub elasticity: f64,
}

/// Fractional change of `base` under a `percentage` perturbation
///
/// A zero base has no relative change and reports 0.
pub fn impact(base: f64, percentage: f64) -> f64 {
    if base == 0.0 {
        return 0.0;
    }
    let perturbed = base * (1.0 + percentage / 100.0);
    ((perturbed - base) / base).abs()
}

/// `|percent change from first to last / (n - 1)|`
///
/// 0 for a single value or a zero first value.
pub fn elasticity(values: &[f64]) -> f64 {
    match (values.first(), values.last()) {
        (Some(&first), Some(&last)) if values.len() > 1 && first != 0.0 => {
            let pct = (last - first) / first * 100.0;
            (pct / (values.len() - 1) as f64).abs()
        }
        _ => 0.0,
    }
}

/// Perturb the last value by each step in both directions
pub fn analyze(name: &str, values: &[f64], steps: &[f64]) -> SensitivityAnalysis {
    let base = values.last().copied().unwrap_or(0.0);
    let variations = steps
        .iter()
        .flat_map(|&step| {
            [
                Variation {
                    percentage: step,
                    impact: impact(base, step),
                    direction: Direction::Positive,
                },
                Variation {
                    percentage: -step,
                    impact: impact(base, -step),
                    direction: Direction::Negative,
                },
            ]
        })
        .collect();
    SensitivityAnalysis {
        variable: name.to_string(),
        variations,
        elasticity: elasticity(values),
    }
}
