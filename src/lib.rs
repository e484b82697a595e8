//! # insight-stats
//!
//! Numerical analysis engine for tabular field data. A dataset is a set of
//! named, equal-length fields; the engine computes descriptive statistics,
//! pairwise correlation, eleven regression families, hypothesis tests and
//! scenario simulations over it, either one operation at a time or through
//! the staged [`pipeline`].
//!
//! ## Crates
//!
//! - [`core`]: field store, shared error type, linear algebra and special functions
//! - [`descriptive`]: per-field statistics, mergeable moments, correlation
//! - [`regression`]: the regression engine
//! - [`hypothesis`]: one-sample t-test and normality test
//! - [`simulation`]: best/base/worst scenarios and sensitivity analysis
//! - [`pipeline`]: chunked, cancellable execution of every analysis
//! - [`industry`]: finance risk, fraud flags, retail, healthcare and series analyses
//!
//! ## Quick start
//!
//! ```rust
//! use insight_stats::prelude::*;
//!
//! let fields = vec![
//!     Field::numeric("spend", vec![10.0, 12.0, 15.0, 18.0, 21.0, 25.0]),
//!     Field::numeric("sales", vec![105.0, 118.0, 151.0, 176.0, 214.0, 246.0]),
//! ];
//!
//! let model = fit_fields(
//!     RegressionFamily::Linear,
//!     &[&fields[0]],
//!     &fields[1],
//!     &RegressionOptions::default(),
//! )
//! .unwrap();
//! assert!(model.r_squared() > 0.98);
//!
//! let result = execute_pipeline(&fields, PipelineConfig::default(), |_| {}).unwrap();
//! assert_eq!(result.field_statistics.len(), 2);
//! ```

pub use insight_core as core;
pub use insight_descriptive as descriptive;
pub use insight_hypothesis as hypothesis;
pub use insight_industry as industry;
pub use insight_pipeline as pipeline;
pub use insight_regression as regression;
pub use insight_simulation as simulation;

pub use insight_core::{Error, ErrorKind, Result};

/// Common imports
pub mod prelude {
    pub use insight_core::{Dataset, Error, ErrorKind, Field, FieldKind, Result};
    pub use insight_descriptive::{
        compute_correlations, compute_field_statistics, CorrelationMatrix, FieldStatistics, Trend,
    };
    pub use insight_hypothesis::{normality_test, one_sample_t_test, HypothesisTestResult};
    pub use insight_pipeline::{
        execute_pipeline, AggregatedResult, AnalysisSet, CancelHandle, PipelineConfig, PipelineExecutor,
    };
    pub use insight_regression::{fit_fields, fit_regression, RegressionFamily, RegressionModel, RegressionOptions};
    pub use insight_simulation::{run_simulation, ScenarioKind, SimulationConfig, SimulationResult};
}
