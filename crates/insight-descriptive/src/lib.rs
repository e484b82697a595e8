//! Descriptive statistics for insight-stats
//!
//! Field-level statistics ([`compute_field_statistics`]), chunk-mergeable
//! moment summaries ([`MomentSummary`]), pairwise Pearson correlation
//! ([`compute_correlations`]) and dataset/text summaries.
//!
//! # Example
//!
//! ```rust
//! use insight_core::Field;
//! use insight_descriptive::{compute_field_statistics, Trend};
//!
//! let revenue = Field::numeric("revenue", vec![100.0, 110.0, 120.0, 130.0, 140.0]);
//! let stats = compute_field_statistics(&revenue).unwrap();
//! assert_eq!(stats.median, 120.0);
//! assert_eq!(stats.trend, Trend::Up);
//! ```

pub mod correlation;
pub mod moments;
pub mod statistics;
pub mod summary;

pub use correlation::{compute_correlations, pearson, CorrelationMatrix, PairKey};
pub use moments::MomentSummary;
pub use statistics::{
    compute_field_statistics, kurtosis, mean, median, mode, quartiles, skewness, std_dev, trend,
    trend_strength, variance, FieldStatistics, Quartiles, Trend,
};
pub use summary::{DatasetSummary, TextSummary};
