//! Pipeline stages, their status and the weighted progress they report

use crate::config::StageWeights;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::time::Duration;

/// The fixed, ordered stages of a run
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Stage {
    Validation,
    Preprocessing,
    Statistical,
    Regression,
    HypothesisText,
    Simulation,
    Insights,
}

impl Stage {
    /// Execution order
    pub const ALL: [Stage; 7] = [
        Stage::Validation,
        Stage::Preprocessing,
        Stage::Statistical,
        Stage::Regression,
        Stage::HypothesisText,
        Stage::Simulation,
        Stage::Insights,
    ];

    pub fn name(&self) -> &'static str {
        match self {
            Stage::Validation => "Data Validation",
            Stage::Preprocessing => "Data Preprocessing",
            Stage::Statistical => "Statistical Analysis",
            Stage::Regression => "Regression Analysis",
            Stage::HypothesisText => "Hypothesis and Text Analysis",
            Stage::Simulation => "Predictive Simulation",
            Stage::Insights => "Insights Generation",
        }
    }

    pub fn index(&self) -> usize {
        *self as usize
    }
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StageStatus {
    Pending,
    Processing,
    Completed,
    Error,
}

/// Outcome of one stage in a run
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StageReport {
    pub stage: Stage,
    pub status: StageStatus,
    pub duration: Option<Duration>,
    pub error: Option<String>,
}

impl StageReport {
    pub fn pending(stage: Stage) -> Self {
        Self {
            stage,
            status: StageStatus::Pending,
            duration: None,
            error: None,
        }
    }
}

/// Fresh reports for every stage, all pending
pub fn pending_reports() -> Vec<StageReport> {
    Stage::ALL.iter().map(|&s| StageReport::pending(s)).collect()
}

/// Combines per-stage fractions into one percentage that never decreases
#[derive(Debug, Clone)]
pub struct ProgressTracker {
    weights: StageWeights,
    total: f64,
    reported: f64,
}

impl ProgressTracker {
    pub fn new(weights: StageWeights) -> Self {
        Self {
            total: weights.total(),
            weights,
            reported: 0.0,
        }
    }

    /// Overall percentage with `stage` `fraction` done and every earlier stage complete
    pub fn update(&mut self, stage: Stage, fraction: f64) -> f64 {
        let before: f64 = Stage::ALL[..stage.index()]
            .iter()
            .map(|&s| self.weights.weight(s))
            .sum();
        let current = self.weights.weight(stage) * fraction.clamp(0.0, 1.0);
        let percent = ((before + current) / self.total * 100.0).clamp(0.0, 100.0);
        self.reported = self.reported.max(percent);
        self.reported
    }

    pub fn current(&self) -> f64 {
        self.reported
    }
}
