//! Event-based pipeline notification system
//!
//! Observers (logging, metrics, UIs) register an [`EventHandler`] on the
//! executor's [`EventBus`] and see every stage transition, chunk completion
//! and memory action without the executor knowing about them.

use crate::stage::Stage;
use insight_core::{Error, Result};
use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};
use uuid::Uuid;

/// Event emitted during a pipeline run
#[derive(Debug, Clone)]
pub enum PipelineEvent {
    PipelineStarted {
        trace_id: Uuid,
        timestamp: Instant,
        rows: usize,
        fields: usize,
    },

    PipelineCompleted {
        trace_id: Uuid,
        duration: Duration,
    },

    /// A stage failed; the run stops here
    PipelineError {
        trace_id: Uuid,
        stage: Stage,
        error: String,
    },

    PipelineCancelled {
        trace_id: Uuid,
        stage: Stage,
    },

    StageStarted {
        trace_id: Uuid,
        stage: Stage,
    },

    StageCompleted {
        trace_id: Uuid,
        stage: Stage,
        duration: Duration,
    },

    /// An analysis was skipped for lack of suitable fields
    AnalysisSkipped {
        trace_id: Uuid,
        stage: Stage,
        reason: String,
    },

    ChunkCompleted {
        trace_id: Uuid,
        index: usize,
        rows: usize,
        total_chunks: usize,
    },

    /// Sampled memory use crossed the configured threshold
    MemoryPressure {
        trace_id: Uuid,
        used_bytes: usize,
        threshold_bytes: usize,
    },

    /// The worker pool was torn down and rebuilt
    WorkersRecycled {
        trace_id: Uuid,
        workers: usize,
    },
}

impl PipelineEvent {
    pub fn trace_id(&self) -> Uuid {
        match self {
            PipelineEvent::PipelineStarted { trace_id, .. }
            | PipelineEvent::PipelineCompleted { trace_id, .. }
            | PipelineEvent::PipelineError { trace_id, .. }
            | PipelineEvent::PipelineCancelled { trace_id, .. }
            | PipelineEvent::StageStarted { trace_id, .. }
            | PipelineEvent::StageCompleted { trace_id, .. }
            | PipelineEvent::AnalysisSkipped { trace_id, .. }
            | PipelineEvent::ChunkCompleted { trace_id, .. }
            | PipelineEvent::MemoryPressure { trace_id, .. }
            | PipelineEvent::WorkersRecycled { trace_id, .. } => *trace_id,
        }
    }
}

/// Trait for handling pipeline events
pub trait EventHandler: Send + Sync {
    fn handle_event(&self, event: &PipelineEvent);

    /// Check if this handler is interested in a particular event type
    fn is_interested(&self, event: &PipelineEvent) -> bool {
        let _ = event;
        true
    }

    /// Get the name of this handler for debugging
    fn name(&self) -> &str {
        std::any::type_name::<Self>()
    }
}

/// Event bus for distributing events to multiple handlers
pub struct EventBus {
    handlers: Arc<Mutex<Vec<Box<dyn EventHandler>>>>,
    enabled: Arc<Mutex<bool>>,
}

impl EventBus {
    pub fn new() -> Self {
        Self {
            handlers: Arc::new(Mutex::new(Vec::new())),
            enabled: Arc::new(Mutex::new(true)),
        }
    }

    pub fn register<H>(&self, handler: H) -> Result<()>
    where
        H: EventHandler + 'static,
    {
        let mut handlers = self
            .handlers
            .lock()
            .map_err(|e| Error::Execution(format!("Failed to lock handlers: {e}")))?;
        handlers.push(Box::new(handler));
        Ok(())
    }

    /// Emit an event to all interested handlers
    pub fn emit(&self, event: PipelineEvent) -> Result<()> {
        let enabled = self
            .enabled
            .lock()
            .map_err(|e| Error::Execution(format!("Failed to check enabled state: {e}")))?;
        if !*enabled {
            return Ok(());
        }

        let handlers = self
            .handlers
            .lock()
            .map_err(|e| Error::Execution(format!("Failed to lock handlers: {e}")))?;
        for handler in handlers.iter() {
            if handler.is_interested(&event) {
                handler.handle_event(&event);
            }
        }
        Ok(())
    }

    /// Emit, logging instead of failing when the bus is poisoned
    pub fn publish(&self, event: PipelineEvent) {
        if let Err(e) = self.emit(event) {
            log::warn!("Dropped pipeline event: {e}");
        }
    }

    pub fn set_enabled(&self, enabled: bool) -> Result<()> {
        let mut state = self
            .enabled
            .lock()
            .map_err(|e| Error::Execution(format!("Failed to lock enabled state: {e}")))?;
        *state = enabled;
        Ok(())
    }

    pub fn is_enabled(&self) -> Result<bool> {
        let state = self
            .enabled
            .lock()
            .map_err(|e| Error::Execution(format!("Failed to check enabled state: {e}")))?;
        Ok(*state)
    }

    pub fn handler_count(&self) -> Result<usize> {
        let handlers = self
            .handlers
            .lock()
            .map_err(|e| Error::Execution(format!("Failed to lock handlers: {e}")))?;
        Ok(handlers.len())
    }
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new()
    }
}

impl Clone for EventBus {
    fn clone(&self) -> Self {
        Self {
            handlers: Arc::clone(&self.handlers),
            enabled: Arc::clone(&self.enabled),
        }
    }
}

/// Logs run-level events at a fixed level, everything else at trace
pub struct LoggingHandler {
    level: log::Level,
}

impl LoggingHandler {
    pub fn new(level: log::Level) -> Self {
        Self { level }
    }
}

impl EventHandler for LoggingHandler {
    fn handle_event(&self, event: &PipelineEvent) {
        match event {
            PipelineEvent::PipelineStarted {
                trace_id,
                rows,
                fields,
                ..
            } => {
                log::log!(self.level, "Pipeline started: {trace_id} ({rows} rows, {fields} fields)");
            }
            PipelineEvent::PipelineCompleted { trace_id, duration } => {
                log::log!(self.level, "Pipeline completed: {trace_id} in {duration:?}");
            }
            PipelineEvent::PipelineError {
                trace_id,
                stage,
                error,
            } => {
                log::error!("Pipeline error in {stage}: {error} (trace: {trace_id})");
            }
            PipelineEvent::PipelineCancelled { trace_id, stage } => {
                log::log!(self.level, "Pipeline cancelled during {stage} (trace: {trace_id})");
            }
            PipelineEvent::AnalysisSkipped { stage, reason, .. } => {
                log::log!(self.level, "{stage}: skipped, {reason}");
            }
            PipelineEvent::MemoryPressure {
                used_bytes,
                threshold_bytes,
                ..
            } => {
                log::warn!("Memory use {used_bytes} bytes exceeds threshold of {threshold_bytes} bytes");
            }
            _ => {
                log::trace!("Pipeline event: {event:?}");
            }
        }
    }
}

/// Counters aggregated by [`MetricsHandler`]
#[derive(Debug, Clone, Default, PartialEq)]
pub struct EventMetrics {
    pub total_runs: usize,
    pub completed_runs: usize,
    pub cancelled_runs: usize,
    pub chunks_processed: usize,
    pub memory_warnings: usize,
    pub worker_recycles: usize,
    pub skipped_analyses: usize,
    /// Failures per stage name
    pub errors: HashMap<String, usize>,
}

/// Aggregates counts across every run it observes
#[derive(Clone, Default)]
pub struct MetricsHandler {
    metrics: Arc<Mutex<EventMetrics>>,
}

impl MetricsHandler {
    pub fn new() -> Self {
        Self::default()
    }

    /// Get a snapshot of current metrics
    pub fn snapshot(&self) -> Result<EventMetrics> {
        let metrics = self
            .metrics
            .lock()
            .map_err(|e| Error::Execution(format!("Failed to lock metrics: {e}")))?;
        Ok(metrics.clone())
    }
}

impl EventHandler for MetricsHandler {
    fn handle_event(&self, event: &PipelineEvent) {
        let Ok(mut metrics) = self.metrics.lock() else {
            log::error!("Failed to lock metrics");
            return;
        };

        match event {
            PipelineEvent::PipelineStarted { .. } => metrics.total_runs += 1,
            PipelineEvent::PipelineCompleted { .. } => metrics.completed_runs += 1,
            PipelineEvent::PipelineCancelled { .. } => metrics.cancelled_runs += 1,
            PipelineEvent::ChunkCompleted { .. } => metrics.chunks_processed += 1,
            PipelineEvent::MemoryPressure { .. } => metrics.memory_warnings += 1,
            PipelineEvent::WorkersRecycled { .. } => metrics.worker_recycles += 1,
            PipelineEvent::AnalysisSkipped { .. } => metrics.skipped_analyses += 1,
            PipelineEvent::PipelineError { stage, .. } => {
                *metrics.errors.entry(stage.name().to_string()).or_insert(0) += 1;
            }
            _ => {}
        }
    }
}
