//! Pipeline configuration
//!
//! Every field has a default; a JSON document only needs the keys it
//! overrides.

use crate::stage::Stage;
use bitflags::bitflags;
use insight_core::{Error, Result};
use insight_hypothesis::validate_alpha;
use insight_regression::{RegressionFamily, RegressionOptions};
use insight_simulation::SimulationConfig;
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Rows per chunk
pub const DEFAULT_CHUNK_SIZE: usize = 50_000;
/// Datasets with more rows than this are chunked
pub const DEFAULT_CHUNK_THRESHOLD: usize = 50_000;
pub const DEFAULT_MEMORY_THRESHOLD_BYTES: usize = 200 * 1024 * 1024;
pub const DEFAULT_MEMORY_CHECK_INTERVAL_MS: u64 = 1_000;
/// Worker count when the hardware parallelism is unknown
pub const FALLBACK_WORKERS: usize = 4;
/// |r| at or above which a correlation is reported as strong
pub const DEFAULT_CORRELATION_THRESHOLD: f64 = 0.7;

bitflags! {
    /// Analyses a run performs
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
    #[serde(transparent)]
    pub struct AnalysisSet: u32 {
        const STATISTICS = 1 << 0;
        const CORRELATION = 1 << 1;
        const REGRESSION = 1 << 2;
        const HYPOTHESIS = 1 << 3;
        const TEXT = 1 << 4;
        const SIMULATION = 1 << 5;
        const INSIGHTS = 1 << 6;
    }
}

impl Default for AnalysisSet {
    fn default() -> Self {
        AnalysisSet::all()
    }
}

/// Hardware parallelism, or [`FALLBACK_WORKERS`] when it reports nothing
pub fn default_workers() -> usize {
    match num_cpus::get() {
        0 => FALLBACK_WORKERS,
        n => n,
    }
}

/// Relative progress share of each stage
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct StageWeights {
    pub validation: f64,
    pub preprocessing: f64,
    pub statistical: f64,
    pub regression: f64,
    pub hypothesis_text: f64,
    pub simulation: f64,
    pub insights: f64,
}

impl Default for StageWeights {
    fn default() -> Self {
        Self {
            validation: 10.0,
            preprocessing: 10.0,
            statistical: 30.0,
            regression: 20.0,
            hypothesis_text: 10.0,
            simulation: 10.0,
            insights: 10.0,
        }
    }
}

impl StageWeights {
    pub fn weight(&self, stage: Stage) -> f64 {
        match stage {
            Stage::Validation => self.validation,
            Stage::Preprocessing => self.preprocessing,
            Stage::Statistical => self.statistical,
            Stage::Regression => self.regression,
            Stage::HypothesisText => self.hypothesis_text,
            Stage::Simulation => self.simulation,
            Stage::Insights => self.insights,
        }
    }

    pub fn total(&self) -> f64 {
        Stage::ALL.iter().map(|&s| self.weight(s)).sum()
    }

    pub fn with_weight(mut self, stage: Stage, weight: f64) -> Self {
        let slot = match stage {
            Stage::Validation => &mut self.validation,
            Stage::Preprocessing => &mut self.preprocessing,
            Stage::Statistical => &mut self.statistical,
            Stage::Regression => &mut self.regression,
            Stage::HypothesisText => &mut self.hypothesis_text,
            Stage::Simulation => &mut self.simulation,
            Stage::Insights => &mut self.insights,
        };
        *slot = weight;
        self
    }

    pub fn validate(&self) -> Result<()> {
        for stage in Stage::ALL {
            let w = self.weight(stage);
            if !w.is_finite() || w <= 0.0 {
                return Err(Error::Validation(format!(
                    "Stage weight for {stage} must be positive, got {w}"
                )));
            }
        }
        Ok(())
    }
}

/// Configuration for one pipeline run
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct PipelineConfig {
    pub chunk_size: usize,
    pub chunk_threshold: usize,
    pub memory_threshold_bytes: usize,
    pub memory_check_interval_ms: u64,
    pub workers: usize,
    /// Significance level for the hypothesis tests
    pub alpha: f64,
    pub correlation_threshold: f64,
    pub regression_family: RegressionFamily,
    pub regression_options: RegressionOptions,
    pub simulation: SimulationConfig,
    pub stage_weights: StageWeights,
    pub analyses: AnalysisSet,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            chunk_size: DEFAULT_CHUNK_SIZE,
            chunk_threshold: DEFAULT_CHUNK_THRESHOLD,
            memory_threshold_bytes: DEFAULT_MEMORY_THRESHOLD_BYTES,
            memory_check_interval_ms: DEFAULT_MEMORY_CHECK_INTERVAL_MS,
            workers: default_workers(),
            alpha: insight_hypothesis::DEFAULT_ALPHA,
            correlation_threshold: DEFAULT_CORRELATION_THRESHOLD,
            regression_family: RegressionFamily::Linear,
            regression_options: RegressionOptions::default(),
            simulation: SimulationConfig::default(),
            stage_weights: StageWeights::default(),
            analyses: AnalysisSet::default(),
        }
    }
}

impl PipelineConfig {
    pub fn new() -> Self {
        Self::default()
    }

    /// Parse a JSON document; missing keys keep their defaults
    pub fn from_json(json: &str) -> Result<Self> {
        let config: Self = serde_json::from_str(json)
            .map_err(|e| Error::Validation(format!("Invalid pipeline configuration: {e}")))?;
        config.validate()?;
        Ok(config)
    }

    pub fn to_json(&self) -> Result<String> {
        serde_json::to_string_pretty(self).map_err(|e| Error::Other(e.into()))
    }

    pub fn memory_check_interval(&self) -> Duration {
        Duration::from_millis(self.memory_check_interval_ms)
    }

    pub fn with_chunk_size(mut self, rows: usize) -> Self {
        self.chunk_size = rows;
        self
    }

    pub fn with_chunk_threshold(mut self, rows: usize) -> Self {
        self.chunk_threshold = rows;
        self
    }

    pub fn with_memory_threshold(mut self, bytes: usize) -> Self {
        self.memory_threshold_bytes = bytes;
        self
    }

    pub fn with_memory_check_interval(mut self, interval: Duration) -> Self {
        self.memory_check_interval_ms = interval.as_millis() as u64;
        self
    }

    pub fn with_workers(mut self, workers: usize) -> Self {
        self.workers = workers;
        self
    }

    pub fn with_alpha(mut self, alpha: f64) -> Self {
        self.alpha = alpha;
        self
    }

    pub fn with_regression_family(mut self, family: RegressionFamily) -> Self {
        self.regression_family = family;
        self
    }

    pub fn with_regression_options(mut self, options: RegressionOptions) -> Self {
        self.regression_options = options;
        self
    }

    pub fn with_simulation(mut self, simulation: SimulationConfig) -> Self {
        self.simulation = simulation;
        self
    }

    pub fn with_stage_weights(mut self, weights: StageWeights) -> Self {
        self.stage_weights = weights;
        self
    }

    pub fn with_analyses(mut self, analyses: AnalysisSet) -> Self {
        self.analyses = analyses;
        self
    }

    pub fn validate(&self) -> Result<()> {
        if self.chunk_size == 0 {
            return Err(Error::Validation("Chunk size must be at least 1 row".to_string()));
        }
        if self.workers == 0 {
            return Err(Error::Validation("Worker count must be at least 1".to_string()));
        }
        if self.memory_threshold_bytes == 0 {
            return Err(Error::Validation("Memory threshold must be positive".to_string()));
        }
        if !(0.0..=1.0).contains(&self.correlation_threshold) {
            return Err(Error::Validation(format!(
                "Correlation threshold must be in [0, 1], got {}",
                self.correlation_threshold
            )));
        }
        validate_alpha(self.alpha)?;
        self.stage_weights.validate()?;
        self.regression_options.validate()?;
        self.simulation.validate()?;
        Ok(())
    }
}
