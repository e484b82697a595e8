//! Staged pipeline executor
//!
//! A [`PipelineExecutor`] is built for one run. It owns its worker pool,
//! memory monitor, cancellation flag and event bus; nothing is shared with
//! other runs. Stages run in order and any failure stops the run with the
//! failing stage's name attached.
//!
//! Datasets above the chunking threshold are cut into row-range chunks.
//! Each chunk is an owned copy dispatched to the pool, where it is reduced
//! to per-field [`MomentSummary`] values and sent back over a channel.
//! Chunks go out in waves of at most `workers`; each wave is merged in
//! chunk-index order before the next is dispatched. Order statistics and
//! trend always use the unchunked fields.

use crate::config::{AnalysisSet, PipelineConfig};
use crate::events::{EventBus, PipelineEvent};
use crate::insights::synthesize;
use crate::memory::{ChunkArena, MemoryMonitor, MemoryGauge};
use crate::result::{AggregatedResult, FieldHypotheses, SkippedAnalysis};
use crate::stage::{pending_reports, ProgressTracker, Stage, StageReport, StageStatus};
use insight_core::{Dataset, Error, Field, PipelineChunk, Result};
use insight_descriptive::{compute_correlations, DatasetSummary, FieldStatistics, MomentSummary, TextSummary};
use insight_hypothesis::{run_hypothesis_tests, MIN_T_TEST_SAMPLES};
use insight_regression::{fit_fields, required_rows};
use insight_simulation::run_simulation_with;
use rayon::{ThreadPool, ThreadPoolBuilder};
use std::ops::Range;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{mpsc, Arc};
use std::time::{Duration, Instant};
use tracing::{debug, instrument, warn};
use uuid::Uuid;

/// Shared flag that stops a run at its next checkpoint
#[derive(Debug, Clone, Default)]
pub struct CancelHandle {
    flag: Arc<AtomicBool>,
}

impl CancelHandle {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.flag.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.flag.load(Ordering::SeqCst)
    }
}

fn build_pool(workers: usize) -> Result<ThreadPool> {
    ThreadPoolBuilder::new()
        .num_threads(workers)
        .thread_name(|i| format!("insight-worker-{i}"))
        .build()
        .map_err(|e| Error::Execution(format!("Failed to create thread pool: {e}")))
}

/// Progress callback paired with the weighted tracker
struct Progress<F> {
    tracker: ProgressTracker,
    callback: F,
}

impl<F: FnMut(f64)> Progress<F> {
    fn report(&mut self, stage: Stage, fraction: f64) {
        let percent = self.tracker.update(stage, fraction);
        (self.callback)(percent);
    }
}

/// Per-field moments of one chunk, in numeric-field order
type ChunkMoments = Vec<MomentSummary>;

fn summarize_chunk(chunk: &PipelineChunk) -> Result<ChunkMoments> {
    chunk
        .fields()
        .iter()
        .filter(|f| f.is_numeric())
        .map(|f| MomentSummary::from_values(f.numeric_values()?))
        .collect()
}

/// Runs the analysis stages over one dataset
pub struct PipelineExecutor {
    config: PipelineConfig,
    pool: ThreadPool,
    cancel: CancelHandle,
    events: EventBus,
    arena: ChunkArena,
    gauge: Arc<dyn MemoryGauge>,
    stages: Vec<StageReport>,
    trace_id: Uuid,
    worker_recycles: usize,
    chunks_processed: usize,
    peak_memory: usize,
    started: bool,
}

impl PipelineExecutor {
    /// Validate the configuration and build the worker pool
    pub fn new(config: PipelineConfig) -> Result<Self> {
        config.validate()?;
        let pool = build_pool(config.workers)?;
        let arena = ChunkArena::new();
        Ok(Self {
            gauge: Arc::new(arena.clone()),
            arena,
            pool,
            config,
            cancel: CancelHandle::new(),
            events: EventBus::new(),
            stages: pending_reports(),
            trace_id: Uuid::new_v4(),
            worker_recycles: 0,
            chunks_processed: 0,
            peak_memory: 0,
            started: false,
        })
    }

    /// Replace the default in-flight chunk accounting with another gauge
    pub fn with_memory_gauge(mut self, gauge: Arc<dyn MemoryGauge>) -> Self {
        self.gauge = gauge;
        self
    }

    pub fn config(&self) -> &PipelineConfig {
        &self.config
    }

    pub fn events(&self) -> &EventBus {
        &self.events
    }

    pub fn cancel_handle(&self) -> CancelHandle {
        self.cancel.clone()
    }

    pub fn trace_id(&self) -> Uuid {
        self.trace_id
    }

    /// Stage reports as of now; meaningful after a failed run too
    pub fn stages(&self) -> &[StageReport] {
        &self.stages
    }

    pub fn workers(&self) -> usize {
        self.pool.current_num_threads()
    }

    /// Run every stage over `fields`, reporting overall progress in percent
    ///
    /// The callback runs on the calling thread and may cancel through a
    /// [`CancelHandle`]. A cancelled run returns [`Error::Cancelled`]; a
    /// failed stage returns [`Error::Pipeline`] naming it. Neither returns
    /// partial results. An executor runs once.
    #[instrument(skip(self, fields, on_progress), fields(trace_id = %self.trace_id, field_count = fields.len()))]
    pub fn execute<F>(&mut self, fields: &[Field], on_progress: F) -> Result<AggregatedResult>
    where
        F: FnMut(f64),
    {
        if self.started {
            return Err(Error::Execution(
                "A pipeline executor runs once; build a new one per run".to_string(),
            ));
        }
        self.started = true;
        let run_start = Instant::now();
        let mut progress = Progress {
            tracker: ProgressTracker::new(self.config.stage_weights),
            callback: on_progress,
        };
        self.events.publish(PipelineEvent::PipelineStarted {
            trace_id: self.trace_id,
            timestamp: run_start,
            rows: fields.first().map_or(0, Field::len),
            fields: fields.len(),
        });

        let dataset = self.run_stage(Stage::Validation, &mut progress, |_, _| {
            let dataset = Dataset::new(fields.to_vec())?;
            dataset.validate_values()?;
            Ok(dataset)
        })?;

        let (mut result, ranges) = self.run_stage(Stage::Preprocessing, &mut progress, |exec, _| {
            let result = AggregatedResult::new(
                exec.trace_id,
                dataset.row_count(),
                dataset.width(),
                dataset.data_quality(),
            );
            Ok((result, exec.plan_chunks(&dataset)))
        })?;

        self.run_stage(Stage::Statistical, &mut progress, |exec, progress| {
            exec.statistical(&dataset, &ranges, &mut result, progress)
        })?;
        self.run_stage(Stage::Regression, &mut progress, |exec, progress| {
            exec.regression(&dataset, &mut result, progress)
        })?;
        self.run_stage(Stage::HypothesisText, &mut progress, |exec, _| {
            exec.hypothesis_and_text(&dataset, &mut result)
        })?;
        self.run_stage(Stage::Simulation, &mut progress, |exec, _| {
            exec.simulation(&dataset, &mut result)
        })?;
        self.run_stage(Stage::Insights, &mut progress, |exec, _| {
            if exec.config.analyses.contains(AnalysisSet::INSIGHTS) {
                result.insights = synthesize(&result, exec.config.correlation_threshold);
            }
            Ok(())
        })?;

        let duration = run_start.elapsed();
        result.stages = self.stages.clone();
        result.metrics.total_duration = duration;
        result.metrics.stage_durations = self
            .stages
            .iter()
            .filter_map(|r| r.duration.map(|d| (r.stage, d)))
            .collect();
        result.metrics.chunks_processed = self.chunks_processed;
        result.metrics.worker_recycles = self.worker_recycles;
        result.metrics.peak_memory_bytes = self.peak_memory;
        result.metrics.workers = self.workers();

        self.events.publish(PipelineEvent::PipelineCompleted {
            trace_id: self.trace_id,
            duration,
        });
        debug!("pipeline finished in {duration:?}");
        Ok(result)
    }

    /// Mark `stage` processing, run it, and record the outcome
    fn run_stage<T, F, B>(&mut self, stage: Stage, progress: &mut Progress<F>, body: B) -> Result<T>
    where
        F: FnMut(f64),
        B: FnOnce(&mut Self, &mut Progress<F>) -> Result<T>,
    {
        let started = Instant::now();
        self.check_cancelled(stage, started)?;
        self.set_status(stage, StageStatus::Processing);
        self.events.publish(PipelineEvent::StageStarted {
            trace_id: self.trace_id,
            stage,
        });
        progress.report(stage, 0.0);

        let outcome = body(self, progress);
        let value = match outcome {
            Ok(value) => value,
            Err(Error::Cancelled) => return Err(self.mark_cancelled(stage, started.elapsed())),
            Err(e) => return Err(self.mark_failed(stage, started.elapsed(), e)),
        };
        self.check_cancelled(stage, started)?;

        let duration = started.elapsed();
        let report = &mut self.stages[stage.index()];
        report.status = StageStatus::Completed;
        report.duration = Some(duration);
        self.events.publish(PipelineEvent::StageCompleted {
            trace_id: self.trace_id,
            stage,
            duration,
        });
        progress.report(stage, 1.0);
        debug!("{stage} completed in {duration:?}");
        Ok(value)
    }

    fn set_status(&mut self, stage: Stage, status: StageStatus) {
        self.stages[stage.index()].status = status;
    }

    fn check_cancelled(&mut self, stage: Stage, started: Instant) -> Result<()> {
        if self.cancel.is_cancelled() {
            return Err(self.mark_cancelled(stage, started.elapsed()));
        }
        Ok(())
    }

    fn mark_cancelled(&mut self, stage: Stage, duration: Duration) -> Error {
        let report = &mut self.stages[stage.index()];
        report.status = StageStatus::Error;
        report.duration = Some(duration);
        report.error = Some(Error::Cancelled.to_string());
        self.events.publish(PipelineEvent::PipelineCancelled {
            trace_id: self.trace_id,
            stage,
        });
        warn!("pipeline cancelled during {stage}");
        Error::Cancelled
    }

    fn mark_failed(&mut self, stage: Stage, duration: Duration, error: Error) -> Error {
        let report = &mut self.stages[stage.index()];
        report.status = StageStatus::Error;
        report.duration = Some(duration);
        report.error = Some(error.to_string());
        self.events.publish(PipelineEvent::PipelineError {
            trace_id: self.trace_id,
            stage,
            error: error.to_string(),
        });
        warn!("{stage} failed: {error}");
        Error::in_stage(stage.name(), error)
    }

    fn skip(&self, result: &mut AggregatedResult, stage: Stage, analysis: &str, reason: &str) {
        self.events.publish(PipelineEvent::AnalysisSkipped {
            trace_id: self.trace_id,
            stage,
            reason: format!("{analysis}: {reason}"),
        });
        result.skipped.push(SkippedAnalysis {
            stage,
            analysis: analysis.to_string(),
            reason: reason.to_string(),
        });
    }

    /// Row ranges to dispatch; one range unless the dataset exceeds the threshold
    fn plan_chunks(&self, dataset: &Dataset) -> Vec<Range<usize>> {
        let rows = dataset.row_count();
        if rows > self.config.chunk_threshold {
            dataset.chunk_ranges(self.config.chunk_size)
        } else {
            vec![0..rows]
        }
    }

    fn statistical<F: FnMut(f64)>(
        &mut self,
        dataset: &Dataset,
        ranges: &[Range<usize>],
        result: &mut AggregatedResult,
        progress: &mut Progress<F>,
    ) -> Result<()> {
        let analyses = self.config.analyses;
        let numeric: Vec<&Field> = dataset.numeric_fields().collect();
        if numeric.is_empty() {
            self.skip(result, Stage::Statistical, "Statistics", "no numeric fields");
            return Ok(());
        }

        if analyses.contains(AnalysisSet::STATISTICS) {
            let merged = self.merge_chunks(dataset, ranges, numeric.len(), progress)?;
            result.chunk_count = ranges.len();
            result.field_statistics = numeric
                .iter()
                .zip(&merged)
                .map(|(field, moments)| {
                    FieldStatistics::from_moments(field.name(), field.numeric_values()?, moments)
                })
                .collect::<Result<_>>()?;
            result.dataset_summary = Some(DatasetSummary::from_fields(dataset.fields())?);
        }

        if analyses.contains(AnalysisSet::CORRELATION) {
            if numeric.len() < 2 {
                self.skip(result, Stage::Statistical, "Correlation", "needs at least two numeric fields");
            } else {
                result.correlations = Some(compute_correlations(dataset.fields())?);
            }
        }
        Ok(())
    }

    /// Dispatch chunks in waves and merge their moments in index order
    fn merge_chunks<F: FnMut(f64)>(
        &mut self,
        dataset: &Dataset,
        ranges: &[Range<usize>],
        numeric_fields: usize,
        progress: &mut Progress<F>,
    ) -> Result<ChunkMoments> {
        let total = ranges.len();
        let wave_size = self.workers().max(1);
        let mut monitor = MemoryMonitor::new(
            Arc::clone(&self.gauge),
            self.config.memory_threshold_bytes,
            self.config.memory_check_interval(),
        );
        let mut merged = vec![MomentSummary::default(); numeric_fields];

        for (wave_index, wave) in ranges.chunks(wave_size).enumerate() {
            if self.cancel.is_cancelled() {
                return Err(Error::Cancelled);
            }
            let base = wave_index * wave_size;
            let abort = Arc::new(AtomicBool::new(false));
            let (tx, rx) = mpsc::channel::<(usize, Result<ChunkMoments>)>();

            for (offset, range) in wave.iter().enumerate() {
                let index = base + offset;
                let chunk = dataset.slice(index, range.clone())?;
                let guard = self.arena.reserve(chunk.heap_bytes());
                let tx = tx.clone();
                let cancel = self.cancel.clone();
                let abort = Arc::clone(&abort);
                self.pool.spawn(move || {
                    let _guard = guard;
                    let outcome = if cancel.is_cancelled() || abort.load(Ordering::SeqCst) {
                        Err(Error::Cancelled)
                    } else {
                        summarize_chunk(&chunk)
                    };
                    // The receiver is gone only if the run already failed
                    let _ = tx.send((index, outcome));
                });
            }
            drop(tx);

            let mut slots: Vec<Option<ChunkMoments>> = vec![None; wave.len()];
            let mut failure: Option<Error> = None;
            let mut pressure = false;
            for (index, outcome) in rx.iter() {
                match outcome {
                    Ok(moments) => {
                        slots[index - base] = Some(moments);
                        self.chunks_processed += 1;
                        self.events.publish(PipelineEvent::ChunkCompleted {
                            trace_id: self.trace_id,
                            index,
                            rows: ranges[index].len(),
                            total_chunks: total,
                        });
                        progress.report(Stage::Statistical, self.chunks_processed as f64 / total as f64);
                    }
                    Err(e) => {
                        abort.store(true, Ordering::SeqCst);
                        // Keep the first real failure over follow-on cancellations
                        if !matches!(failure, Some(ref f) if !matches!(f, Error::Cancelled)) {
                            failure = Some(e);
                        }
                    }
                }
                if let Some(used) = monitor.check(Instant::now()) {
                    pressure = true;
                    self.events.publish(PipelineEvent::MemoryPressure {
                        trace_id: self.trace_id,
                        used_bytes: used,
                        threshold_bytes: monitor.threshold(),
                    });
                    warn!("memory use {used} bytes over threshold {}", monitor.threshold());
                }
            }
            self.peak_memory = self.peak_memory.max(monitor.peak());

            if let Some(e) = failure {
                return Err(e);
            }
            for (offset, slot) in slots.into_iter().enumerate() {
                let moments = slot.ok_or_else(|| {
                    Error::Execution(format!("Chunk {} produced no result", base + offset))
                })?;
                for (acc, part) in merged.iter_mut().zip(&moments) {
                    *acc = acc.merge(part);
                }
            }
            if pressure {
                self.recycle_workers()?;
            }
        }
        Ok(merged)
    }

    /// Replace the pool once the current wave has drained
    fn recycle_workers(&mut self) -> Result<()> {
        let workers = self.workers();
        self.pool = build_pool(workers)?;
        self.worker_recycles += 1;
        self.events.publish(PipelineEvent::WorkersRecycled {
            trace_id: self.trace_id,
            workers,
        });
        debug!("recycled {workers} workers");
        Ok(())
    }

    /// Each numeric field against the first other numeric field
    fn regression<F: FnMut(f64)>(
        &mut self,
        dataset: &Dataset,
        result: &mut AggregatedResult,
        progress: &mut Progress<F>,
    ) -> Result<()> {
        if !self.config.analyses.contains(AnalysisSet::REGRESSION) {
            return Ok(());
        }
        let numeric: Vec<&Field> = dataset.numeric_fields().collect();
        if numeric.len() < 2 {
            self.skip(result, Stage::Regression, "Regression", "needs at least two numeric fields");
            return Ok(());
        }
        let family = self.config.regression_family;
        let needed = required_rows(family, 1, &self.config.regression_options);
        if dataset.row_count() < needed {
            let reason = format!("{family} regression needs at least {needed} rows");
            self.skip(result, Stage::Regression, "Regression", &reason);
            return Ok(());
        }

        for (i, dependent) in numeric.iter().enumerate() {
            if self.cancel.is_cancelled() {
                return Err(Error::Cancelled);
            }
            let predictor = if i == 0 { numeric[1] } else { numeric[0] };
            let model = fit_fields(
                family,
                &[predictor],
                dependent,
                &self.config.regression_options,
            )?;
            result.regressions.push(model);
            progress.report(Stage::Regression, (i + 1) as f64 / numeric.len() as f64);
        }
        Ok(())
    }

    fn hypothesis_and_text(&mut self, dataset: &Dataset, result: &mut AggregatedResult) -> Result<()> {
        let analyses = self.config.analyses;
        let has_numeric = dataset.numeric_fields().next().is_some();
        if analyses.contains(AnalysisSet::HYPOTHESIS) && has_numeric {
            if dataset.row_count() < MIN_T_TEST_SAMPLES {
                let reason = format!("needs at least {MIN_T_TEST_SAMPLES} rows");
                self.skip(result, Stage::HypothesisText, "Hypothesis", &reason);
            } else {
                for field in dataset.numeric_fields() {
                    result.hypothesis_tests.push(FieldHypotheses {
                        field: field.name().to_string(),
                        results: run_hypothesis_tests(field, self.config.alpha)?,
                    });
                }
            }
        }
        if analyses.contains(AnalysisSet::TEXT) {
            result.text_summaries = dataset
                .text_fields()
                .map(TextSummary::from_field)
                .collect::<Result<_>>()?;
        }
        Ok(())
    }

    fn simulation(&mut self, dataset: &Dataset, result: &mut AggregatedResult) -> Result<()> {
        if !self.config.analyses.contains(AnalysisSet::SIMULATION) {
            return Ok(());
        }
        if dataset.numeric_fields().next().is_none() {
            self.skip(result, Stage::Simulation, "Simulation", "no numeric fields");
            return Ok(());
        }
        result.simulations = run_simulation_with(dataset.fields(), &self.config.simulation)?;
        Ok(())
    }
}

/// Build an executor for one run and execute it
pub fn execute_pipeline<F>(fields: &[Field], config: PipelineConfig, on_progress: F) -> Result<AggregatedResult>
where
    F: FnMut(f64),
{
    PipelineExecutor::new(config)?.execute(fields, on_progress)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn small_config() -> PipelineConfig {
        PipelineConfig::default().with_workers(2)
    }

    #[test]
    fn test_cancel_handle_is_shared() {
        let handle = CancelHandle::new();
        let clone = handle.clone();
        clone.cancel();
        assert!(handle.is_cancelled());
    }

    #[test]
    fn test_plan_chunks() {
        let fields = vec![Field::numeric("x", (0..25).map(f64::from).collect())];
        let dataset = Dataset::new(fields).unwrap();

        let exec = PipelineExecutor::new(small_config().with_chunk_threshold(100)).unwrap();
        assert_eq!(exec.plan_chunks(&dataset), vec![0..25]);

        let exec = PipelineExecutor::new(small_config().with_chunk_threshold(10).with_chunk_size(10)).unwrap();
        assert_eq!(exec.plan_chunks(&dataset), vec![0..10, 10..20, 20..25]);
    }

    #[test]
    fn test_runs_once() {
        let fields = vec![Field::numeric("x", vec![1.0, 2.0, 3.0])];
        let mut exec = PipelineExecutor::new(small_config()).unwrap();
        assert!(exec.execute(&fields, |_| {}).is_ok());
        let err = exec.execute(&fields, |_| {}).unwrap_err();
        assert_eq!(err.kind(), insight_core::ErrorKind::Execution);
    }

    #[test]
    fn test_summarize_chunk_skips_text() {
        let dataset = Dataset::new(vec![
            Field::numeric("x", vec![1.0, 2.0, 3.0, 4.0]),
            Field::text("t", ["a", "b", "c", "d"]),
            Field::numeric("y", vec![4.0, 3.0, 2.0, 1.0]),
        ])
        .unwrap();
        let chunk = dataset.slice(0, 1..3).unwrap();
        let moments = summarize_chunk(&chunk).unwrap();
        assert_eq!(moments.len(), 2);
        assert_eq!(moments[0].count(), 2);
        assert_eq!(moments[1].mean(), 2.5);
    }
}
