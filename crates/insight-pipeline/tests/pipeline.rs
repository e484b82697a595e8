use approx::assert_relative_eq;
use insight_core::{Error, ErrorKind, Field};
use insight_descriptive::compute_field_statistics;
use insight_pipeline::{
    execute_pipeline, AnalysisSet, EventHandler, InsightKind, MemoryGauge, MetricsHandler, PipelineConfig,
    PipelineEvent, PipelineExecutor, Stage, StageStatus,
};
use insight_regression::{RegressionFamily, RegressionOptions};
use insight_simulation::SimulationConfig;
use proptest::prelude::*;
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;
use std::sync::{Arc, Mutex};
use std::time::Duration;

fn sample_fields(rows: usize, seed: u64) -> Vec<Field> {
    let mut rng = ChaCha8Rng::seed_from_u64(seed);
    let revenue: Vec<f64> = (0..rows).map(|i| 1000.0 + 5.0 * i as f64 + rng.gen_range(-50.0..50.0)).collect();
    let cost: Vec<f64> = revenue.iter().map(|r| 0.6 * r + rng.gen_range(-20.0..20.0)).collect();
    vec![Field::numeric("revenue", revenue), Field::numeric("cost", cost)]
}

fn config() -> PipelineConfig {
    PipelineConfig::default().with_workers(2)
}

#[derive(Clone, Default)]
struct Recorder {
    events: Arc<Mutex<Vec<PipelineEvent>>>,
}

impl EventHandler for Recorder {
    fn handle_event(&self, event: &PipelineEvent) {
        self.events.lock().unwrap().push(event.clone());
    }
}

struct FixedGauge(usize);

impl MemoryGauge for FixedGauge {
    fn used_bytes(&self) -> usize {
        self.0
    }
}

#[test]
fn test_chunked_matches_unchunked() {
    let fields = sample_fields(100, 1);
    let chunked = execute_pipeline(&fields, config().with_chunk_threshold(10).with_chunk_size(7), |_| {}).unwrap();
    let whole = execute_pipeline(&fields, config(), |_| {}).unwrap();

    assert_eq!(chunked.chunk_count, 15);
    assert_eq!(chunked.metrics.chunks_processed, 15);
    assert_eq!(whole.chunk_count, 1);
    assert_eq!(chunked.row_count, 100);

    for field in &fields {
        let direct = compute_field_statistics(field).unwrap();
        let merged = chunked.statistics_for(field.name()).unwrap();
        assert_relative_eq!(merged.mean, direct.mean, max_relative = 1e-12);
        assert_relative_eq!(merged.variance, direct.variance, max_relative = 1e-9);
        assert_relative_eq!(merged.skewness, direct.skewness, epsilon = 1e-9);
        assert_relative_eq!(merged.kurtosis, direct.kurtosis, epsilon = 1e-9);
        assert_eq!(merged.min, direct.min);
        assert_eq!(merged.max, direct.max);
        assert_eq!(merged.median, direct.median);
        assert_eq!(merged.trend, direct.trend);
    }
}

#[test]
fn test_full_run_produces_every_analysis() {
    let mut fields = sample_fields(40, 2);
    fields.push(Field::text("region", (0..40).map(|i| ["north", "south", "east"][i % 3])));

    let mut percents = Vec::new();
    let result = execute_pipeline(&fields, config(), |p| percents.push(p)).unwrap();

    assert_eq!(result.field_count, 3);
    assert_eq!(result.field_statistics.len(), 2);
    assert!(result.dataset_summary.is_some());
    assert!(result.correlations.as_ref().unwrap().get("revenue", "cost").unwrap() > 0.8);
    assert_eq!(result.regressions.len(), 2);
    assert_eq!(result.regression_for("cost").unwrap().dependent(), "cost");
    assert_eq!(result.hypotheses_for("revenue").unwrap().len(), 2);
    assert_eq!(result.text_summaries.len(), 1);
    assert_eq!(result.simulations.len(), 2);
    assert!(result.skipped.is_empty());
    assert!(result.insights.iter().any(|i| i.kind == InsightKind::Correlation));

    assert!(result.stages.iter().all(|s| s.status == StageStatus::Completed));
    assert_eq!(result.metrics.stage_durations.len(), Stage::ALL.len());
    assert_eq!(result.metrics.workers, 2);
    assert!(percents.windows(2).all(|w| w[0] <= w[1]));
    assert_relative_eq!(*percents.last().unwrap(), 100.0, epsilon = 1e-9);
}

#[test]
fn test_events_share_trace_id() {
    let recorder = Recorder::default();
    let mut exec = PipelineExecutor::new(config()).unwrap();
    exec.events().register(recorder.clone()).unwrap();
    let trace_id = exec.trace_id();

    let result = exec.execute(&sample_fields(12, 3), |_| {}).unwrap();
    assert_eq!(result.trace_id, trace_id);

    let events = recorder.events.lock().unwrap();
    assert!(matches!(events.first(), Some(PipelineEvent::PipelineStarted { rows: 12, fields: 2, .. })));
    assert!(matches!(events.last(), Some(PipelineEvent::PipelineCompleted { .. })));
    assert!(events.iter().all(|e| e.trace_id() == trace_id));
    let completed = events
        .iter()
        .filter(|e| matches!(e, PipelineEvent::StageCompleted { .. }))
        .count();
    assert_eq!(completed, Stage::ALL.len());
}

#[test]
fn test_cancel_from_progress_callback() {
    let metrics = MetricsHandler::new();
    let mut exec = PipelineExecutor::new(config()).unwrap();
    exec.events().register(metrics.clone()).unwrap();
    let handle = exec.cancel_handle();

    // Statistical Analysis ends at 50%; the first regression fit moves past 55%
    let err = exec
        .execute(&sample_fields(20, 4), move |p| {
            if p >= 55.0 {
                handle.cancel();
            }
        })
        .unwrap_err();

    assert!(matches!(err, Error::Cancelled));
    let stages = exec.stages();
    for stage in [Stage::Validation, Stage::Preprocessing, Stage::Statistical] {
        assert_eq!(stages[stage.index()].status, StageStatus::Completed);
    }
    assert_eq!(stages[Stage::Regression.index()].status, StageStatus::Error);
    for stage in [Stage::HypothesisText, Stage::Simulation, Stage::Insights] {
        assert_eq!(stages[stage.index()].status, StageStatus::Pending);
    }

    let snapshot = metrics.snapshot().unwrap();
    assert_eq!(snapshot.cancelled_runs, 1);
    assert_eq!(snapshot.completed_runs, 0);
}

#[test]
fn test_cancel_before_start() {
    let mut exec = PipelineExecutor::new(config()).unwrap();
    exec.cancel_handle().cancel();
    let err = exec.execute(&sample_fields(5, 5), |_| {}).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Cancelled);
    assert_eq!(exec.stages()[0].status, StageStatus::Error);
    assert!(exec.stages()[1..].iter().all(|s| s.status == StageStatus::Pending));
}

#[test]
fn test_memory_pressure_recycles_workers() {
    let metrics = MetricsHandler::new();
    let config = config()
        .with_chunk_threshold(10)
        .with_chunk_size(25)
        .with_memory_threshold(10)
        .with_memory_check_interval(Duration::ZERO);
    let mut exec = PipelineExecutor::new(config)
        .unwrap()
        .with_memory_gauge(Arc::new(FixedGauge(1_000)));
    exec.events().register(metrics.clone()).unwrap();

    let fields = sample_fields(100, 6);
    let result = exec.execute(&fields, |_| {}).unwrap();

    // Four chunks in two waves of two, each wave over threshold
    assert_eq!(result.chunk_count, 4);
    assert_eq!(result.metrics.worker_recycles, 2);
    assert_eq!(result.metrics.peak_memory_bytes, 1_000);
    assert_eq!(exec.workers(), 2);

    let snapshot = metrics.snapshot().unwrap();
    assert_eq!(snapshot.worker_recycles, 2);
    assert_eq!(snapshot.memory_warnings, 4);
    assert_eq!(snapshot.chunks_processed, 4);

    let direct = compute_field_statistics(&fields[0]).unwrap();
    assert_relative_eq!(result.field_statistics[0].mean, direct.mean, max_relative = 1e-12);
}

#[test]
fn test_validation_failure_names_stage() {
    let fields = vec![
        Field::numeric("a", vec![1.0, 2.0, 3.0]),
        Field::numeric("b", vec![1.0, 2.0]),
    ];
    let mut exec = PipelineExecutor::new(config()).unwrap();
    let err = exec.execute(&fields, |_| {}).unwrap_err();

    assert_eq!(err.stage(), Some("Data Validation"));
    match err {
        Error::Pipeline { source, .. } => assert_eq!(source.kind(), ErrorKind::Validation),
        other => panic!("expected a pipeline error, got {other:?}"),
    }
    assert_eq!(exec.stages()[0].status, StageStatus::Error);
    assert!(exec.stages()[0].error.is_some());
}

#[test]
fn test_non_finite_values_fail_validation() {
    let fields = vec![Field::numeric("a", vec![1.0, f64::NAN, 3.0])];
    let err = execute_pipeline(&fields, config(), |_| {}).unwrap_err();
    assert_eq!(err.stage(), Some("Data Validation"));
}

#[test]
fn test_regression_failure_names_stage() {
    // Logistic fits need responses in [0, 1]
    let fields = vec![
        Field::numeric("a", vec![1.0, 2.0, 3.0, 4.0, 5.0]),
        Field::numeric("b", vec![3.0, 5.0, 4.0, 6.0, 8.0]),
    ];
    let metrics = MetricsHandler::new();
    let mut exec =
        PipelineExecutor::new(config().with_regression_family(RegressionFamily::Logistic)).unwrap();
    exec.events().register(metrics.clone()).unwrap();

    let err = exec.execute(&fields, |_| {}).unwrap_err();
    assert_eq!(err.stage(), Some("Regression Analysis"));
    match err {
        Error::Pipeline { source, .. } => assert_eq!(source.kind(), ErrorKind::Regression),
        other => panic!("expected a pipeline error, got {other:?}"),
    }
    assert_eq!(exec.stages()[Stage::Statistical.index()].status, StageStatus::Completed);
    assert_eq!(exec.stages()[Stage::Regression.index()].status, StageStatus::Error);
    assert_eq!(metrics.snapshot().unwrap().errors.get("Regression Analysis"), Some(&1));
}

#[test]
fn test_two_rows_skip_regression() {
    let fields = vec![Field::numeric("a", vec![1.0, 2.0]), Field::numeric("b", vec![3.0, 5.0])];
    let metrics = MetricsHandler::new();
    let mut exec = PipelineExecutor::new(config()).unwrap();
    exec.events().register(metrics.clone()).unwrap();
    let result = exec.execute(&fields, |_| {}).unwrap();

    assert!(result.regressions.is_empty());
    assert_eq!(result.skipped.len(), 1);
    assert_eq!(result.skipped[0].stage, Stage::Regression);
    assert_eq!(result.skipped[0].analysis, "Regression");
    assert_eq!(result.skipped[0].reason, "linear regression needs at least 3 rows");
    assert_eq!(exec.stages()[Stage::Regression.index()].status, StageStatus::Completed);
    assert_eq!(result.hypothesis_tests.len(), 2);
    assert!(metrics.snapshot().unwrap().errors.is_empty());

    // A time-series fit also loses its lag
    let options = RegressionOptions::default().with_lag(2);
    let fields = sample_fields(5, 3);
    let result = execute_pipeline(
        &fields,
        config()
            .with_regression_family(RegressionFamily::TimeSeries)
            .with_regression_options(options),
        |_| {},
    )
    .unwrap();
    assert_eq!(result.skipped[0].reason, "time-series regression needs at least 6 rows");
}

#[test]
fn test_single_row_skips_row_hungry_analyses() {
    let fields = vec![
        Field::numeric("a", vec![4.0]),
        Field::numeric("b", vec![7.0]),
        Field::text("label", ["only"]),
    ];
    let result = execute_pipeline(&fields, config(), |_| {}).unwrap();

    let skipped: Vec<(Stage, &str)> =
        result.skipped.iter().map(|s| (s.stage, s.analysis.as_str())).collect();
    assert_eq!(
        skipped,
        [(Stage::Regression, "Regression"), (Stage::HypothesisText, "Hypothesis")]
    );
    assert_eq!(result.skipped[1].reason, "needs at least 2 rows");
    assert!(result.hypothesis_tests.is_empty());
    assert_eq!(result.text_summaries.len(), 1);
    assert_eq!(
        result.insights.iter().filter(|i| i.kind == InsightKind::Skipped).count(),
        2
    );
}

#[test]
fn test_single_numeric_field_skips_pairwise_analyses() {
    let fields = vec![
        Field::numeric("visits", vec![12.0, 15.0, 11.0, 18.0, 20.0, 17.0]),
        Field::text("page", ["home", "cart", "home", "faq", "home", "cart"]),
    ];
    let metrics = MetricsHandler::new();
    let mut exec = PipelineExecutor::new(config()).unwrap();
    exec.events().register(metrics.clone()).unwrap();
    let result = exec.execute(&fields, |_| {}).unwrap();

    let skipped: Vec<&str> = result.skipped.iter().map(|s| s.analysis.as_str()).collect();
    assert_eq!(skipped, ["Correlation", "Regression"]);
    assert!(result.correlations.is_none());
    assert!(result.regressions.is_empty());
    assert_eq!(result.text_summaries[0].most_frequent.as_deref(), Some("home"));
    assert_eq!(result.simulations.len(), 1);
    assert_eq!(
        result.insights.iter().filter(|i| i.kind == InsightKind::Skipped).count(),
        2
    );
    assert_eq!(metrics.snapshot().unwrap().skipped_analyses, 2);
}

#[test]
fn test_analysis_subset() {
    let result = execute_pipeline(
        &sample_fields(30, 7),
        config().with_analyses(AnalysisSet::STATISTICS),
        |_| {},
    )
    .unwrap();
    assert_eq!(result.field_statistics.len(), 2);
    assert!(result.correlations.is_none());
    assert!(result.regressions.is_empty());
    assert!(result.hypothesis_tests.is_empty());
    assert!(result.simulations.is_empty());
    assert!(result.insights.is_empty());
    assert!(result.skipped.is_empty());
}

#[test]
fn test_seeded_runs_repeat() {
    let fields = sample_fields(25, 8);
    let config = config().with_simulation(SimulationConfig::default().with_seed(99));
    let a = execute_pipeline(&fields, config.clone(), |_| {}).unwrap();
    let b = execute_pipeline(&fields, config, |_| {}).unwrap();
    assert_eq!(a.simulations, b.simulations);
    assert_eq!(a.field_statistics, b.field_statistics);
    assert_ne!(a.trace_id, b.trace_id);
}

#[test]
fn test_result_serializes() {
    let result = execute_pipeline(&sample_fields(10, 9), config(), |_| {}).unwrap();
    let json = serde_json::to_value(&result).unwrap();
    assert_eq!(json["rowCount"], 10);
    assert!(json["fieldStatistics"].is_array());
    assert!(json["correlations"].is_object());
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(24))]

    #[test]
    fn prop_chunk_size_does_not_change_moments(
        values in prop::collection::vec(-1e3f64..1e3, 8..120),
        chunk_size in 1usize..40,
    ) {
        let fields = vec![Field::numeric("x", values)];
        let config = PipelineConfig::default()
            .with_workers(3)
            .with_chunk_threshold(0)
            .with_chunk_size(chunk_size)
            .with_analyses(AnalysisSet::STATISTICS);
        let result = execute_pipeline(&fields, config, |_| {}).unwrap();
        let direct = compute_field_statistics(&fields[0]).unwrap();
        let merged = &result.field_statistics[0];

        prop_assert!((merged.mean - direct.mean).abs() <= 1e-9 * (1.0 + direct.mean.abs()));
        prop_assert!((merged.variance - direct.variance).abs() <= 1e-7 * (1.0 + direct.variance));
        prop_assert_eq!(merged.min, direct.min);
        prop_assert_eq!(merged.max, direct.max);
    }
}
