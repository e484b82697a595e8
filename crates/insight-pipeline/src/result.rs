//! Aggregated output of a pipeline run

use crate::insights::Insight;
use crate::stage::{Stage, StageReport};
use insight_core::DataQuality;
use insight_descriptive::{CorrelationMatrix, DatasetSummary, FieldStatistics, TextSummary};
use insight_hypothesis::HypothesisTestResult;
use insight_regression::RegressionModel;
use insight_simulation::SimulationResult;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::time::Duration;
use uuid::Uuid;

/// Hypothesis results for one numeric field
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FieldHypotheses {
    pub field: String,
    pub results: Vec<HypothesisTestResult>,
}

/// An analysis that did not run because the data could not support it
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SkippedAnalysis {
    pub stage: Stage,
    pub analysis: String,
    pub reason: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExecutionMetrics {
    pub total_duration: Duration,
    pub stage_durations: BTreeMap<Stage, Duration>,
    pub chunks_processed: usize,
    pub worker_recycles: usize,
    /// Largest sampled memory figure
    pub peak_memory_bytes: usize,
    pub workers: usize,
}

/// Everything a completed run produced
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AggregatedResult {
    pub trace_id: Uuid,
    pub row_count: usize,
    pub field_count: usize,
    pub chunk_count: usize,
    pub data_quality: DataQuality,
    pub field_statistics: Vec<FieldStatistics>,
    pub dataset_summary: Option<DatasetSummary>,
    pub correlations: Option<CorrelationMatrix>,
    pub regressions: Vec<RegressionModel>,
    pub hypothesis_tests: Vec<FieldHypotheses>,
    pub text_summaries: Vec<TextSummary>,
    pub simulations: Vec<SimulationResult>,
    pub skipped: Vec<SkippedAnalysis>,
    pub insights: Vec<Insight>,
    pub stages: Vec<StageReport>,
    pub metrics: ExecutionMetrics,
}

impl AggregatedResult {
    pub(crate) fn new(trace_id: Uuid, row_count: usize, field_count: usize, data_quality: DataQuality) -> Self {
        Self {
            trace_id,
            row_count,
            field_count,
            chunk_count: 0,
            data_quality,
            field_statistics: Vec::new(),
            dataset_summary: None,
            correlations: None,
            regressions: Vec::new(),
            hypothesis_tests: Vec::new(),
            text_summaries: Vec::new(),
            simulations: Vec::new(),
            skipped: Vec::new(),
            insights: Vec::new(),
            stages: Vec::new(),
            metrics: ExecutionMetrics::default(),
        }
    }

    pub fn statistics_for(&self, field: &str) -> Option<&FieldStatistics> {
        self.field_statistics.iter().find(|s| s.field == field)
    }

    pub fn hypotheses_for(&self, field: &str) -> Option<&[HypothesisTestResult]> {
        self.hypothesis_tests
            .iter()
            .find(|h| h.field == field)
            .map(|h| h.results.as_slice())
    }

    pub fn regression_for(&self, dependent: &str) -> Option<&RegressionModel> {
        self.regressions.iter().find(|m| m.dependent() == dependent)
    }

    pub fn simulation_for(&self, field: &str) -> Option<&SimulationResult> {
        self.simulations.iter().find(|s| s.field == field)
    }
}
