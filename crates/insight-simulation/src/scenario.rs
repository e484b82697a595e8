//! Scenario projections and their summary

use serde::{Deserialize, Serialize};
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ScenarioKind {
    Best,
    Base,
    Worst,
}

impl ScenarioKind {
    pub const ALL: [ScenarioKind; 3] = [ScenarioKind::Best, ScenarioKind::Base, ScenarioKind::Worst];

    pub fn name(&self) -> &'static str {
        match self {
            ScenarioKind::Best => "Best Case",
            ScenarioKind::Base => "Base Case",
            ScenarioKind::Worst => "Worst Case",
        }
    }

    pub fn description(&self) -> &'static str {
        match self {
            ScenarioKind::Best => "Optimistic scenario with favorable conditions",
            ScenarioKind::Base => "Most likely scenario based on current trends",
            ScenarioKind::Worst => "Conservative scenario with adverse conditions",
        }
    }

    /// Sign applied to the configured adjustment
    pub fn direction(&self) -> f64 {
        match self {
            ScenarioKind::Best => 1.0,
            ScenarioKind::Base => 0.0,
            ScenarioKind::Worst => -1.0,
        }
    }
}

impl fmt::Display for ScenarioKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// One projected path
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Scenario {
    pub kind: ScenarioKind,
    pub name: String,
    pub description: String,
    /// Signed adjustment in percent
    pub adjustment_percent: f64,
    pub probability: f64,
    pub values: Vec<f64>,
}

/// Deterministic best/base/worst figures around the last observed value
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ScenarioSummary {
    pub best_case: f64,
    pub base_case: f64,
    pub worst_case: f64,
    pub range: f64,
    /// `1 - stdDev/|mean|` clamped to [0, 1]; 0 when the mean is 0
    pub confidence: f64,
}

impl ScenarioSummary {
    pub fn new(last: f64, adjustment: f64, mean: f64, std_dev: f64) -> Self {
        let best_case = last * (1.0 + adjustment);
        let worst_case = last * (1.0 - adjustment);
        let confidence = if mean == 0.0 {
            0.0
        } else {
            (1.0 - std_dev / mean.abs()).clamp(0.0, 1.0)
        };
        Self {
            best_case,
            base_case: last,
            worst_case,
            range: best_case - worst_case,
            confidence,
        }
    }
}
