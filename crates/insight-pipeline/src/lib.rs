//! Staged analysis pipeline
//!
//! Runs every analysis in the workspace over one dataset, in a fixed stage
//! order, and aggregates the outcome into an [`AggregatedResult`]:
//!
//! 1. Data Validation
//! 2. Data Preprocessing (quality ratios and the chunk plan)
//! 3. Statistical Analysis (chunked moments, order statistics, correlation)
//! 4. Regression Analysis
//! 5. Hypothesis and Text Analysis
//! 6. Predictive Simulation
//! 7. Insights Generation
//!
//! Large datasets are split into row chunks and reduced on a rayon pool;
//! the merged moments match an unchunked pass. A run can be cancelled
//! from its progress callback, and observers can subscribe to its
//! [`EventBus`].
//!
//! # Example
//!
//! ```
//! use insight_core::Field;
//! use insight_pipeline::{execute_pipeline, PipelineConfig};
//!
//! let fields = vec![
//!     Field::numeric("revenue", vec![100.0, 120.0, 130.0, 160.0, 170.0, 200.0]),
//!     Field::numeric("customers", vec![10.0, 12.0, 13.0, 15.0, 18.0, 20.0]),
//! ];
//! let config = PipelineConfig::default().with_workers(2);
//!
//! let mut last = 0.0;
//! let result = execute_pipeline(&fields, config, |pct| last = pct).unwrap();
//!
//! assert_eq!(result.row_count, 6);
//! assert_eq!(result.regressions.len(), 2);
//! assert!(result.correlations.unwrap().get("revenue", "customers").unwrap() > 0.9);
//! assert!((last - 100.0).abs() < 1e-9);
//! ```

pub mod config;
pub mod events;
pub mod executor;
pub mod insights;
pub mod memory;
pub mod result;
pub mod stage;

pub use config::{AnalysisSet, PipelineConfig, StageWeights};
pub use events::{EventBus, EventHandler, EventMetrics, LoggingHandler, MetricsHandler, PipelineEvent};
pub use executor::{execute_pipeline, CancelHandle, PipelineExecutor};
pub use insights::{synthesize, Insight, InsightKind};
pub use memory::{ArenaGuard, ChunkArena, MemoryMonitor, MemoryGauge};
pub use result::{AggregatedResult, ExecutionMetrics, FieldHypotheses, SkippedAnalysis};
pub use stage::{ProgressTracker, Stage, StageReport, StageStatus};

pub use insight_core::{Error, Result};
