//! Error types for the analysis engine
//!
//! Provides a unified error type for all insight-stats crates. Every error
//! carries a machine-readable [`ErrorKind`] next to its human-readable message.

use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

/// Core error type for analysis operations
#[derive(Error, Debug)]
pub enum Error {
    /// Malformed, missing or inconsistent input, caught before computation
    #[error("Validation error: {0}")]
    Validation(String),

    /// Too few samples for the requested operation
    #[error("Insufficient data: expected at least {expected} samples, got {actual}")]
    InsufficientData { expected: usize, actual: usize },

    /// Regression shape/validity violation or unknown family
    #[error("Regression error: {0}")]
    Regression(String),

    /// Simulation input violation (no numeric fields, non-finite values)
    #[error("Simulation error: {0}")]
    Simulation(String),

    /// A pipeline stage failed; wraps the stage's own error
    #[error("Pipeline failed at stage '{stage}': {source}")]
    Pipeline {
        stage: String,
        #[source]
        source: Box<Error>,
    },

    /// The run was cancelled before it finished
    #[error("Pipeline execution cancelled")]
    Cancelled,

    /// Threading or worker-pool error
    #[error("Execution error: {0}")]
    Execution(String),

    /// Other errors
    #[error("Other error: {0}")]
    Other(#[from] anyhow::Error),
}

/// Machine-readable error category
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ErrorKind {
    Validation,
    Regression,
    Simulation,
    Pipeline,
    Cancelled,
    Execution,
    Other,
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ErrorKind::Validation => "validation",
            ErrorKind::Regression => "regression",
            ErrorKind::Simulation => "simulation",
            ErrorKind::Pipeline => "pipeline",
            ErrorKind::Cancelled => "cancelled",
            ErrorKind::Execution => "execution",
            ErrorKind::Other => "other",
        };
        f.write_str(name)
    }
}

/// Result type alias using our Error type
pub type Result<T> = std::result::Result<T, Error>;

impl Error {
    /// Machine-readable category of this error
    pub fn kind(&self) -> ErrorKind {
        match self {
            Error::Validation(_) | Error::InsufficientData { .. } => ErrorKind::Validation,
            Error::Regression(_) => ErrorKind::Regression,
            Error::Simulation(_) => ErrorKind::Simulation,
            Error::Pipeline { .. } => ErrorKind::Pipeline,
            Error::Cancelled => ErrorKind::Cancelled,
            Error::Execution(_) => ErrorKind::Execution,
            Error::Other(_) => ErrorKind::Other,
        }
    }

    /// Create an error for empty input
    pub fn empty_input(operation: &str) -> Self {
        tracing::debug!("empty input passed to {operation}");
        Self::InsufficientData {
            expected: 1,
            actual: 0,
        }
    }

    /// Create an error for size mismatch
    pub fn size_mismatch(expected: usize, actual: usize, context: &str) -> Self {
        Self::Validation(format!(
            "Size mismatch in {context}: expected {expected}, got {actual}"
        ))
    }

    /// Create an error for NaN/Inf values
    pub fn non_finite(context: &str) -> Self {
        Self::Validation(format!("{context} contains NaN or infinite values"))
    }

    /// Create an error for an unrecognised regression family name
    pub fn unknown_family(name: &str) -> Self {
        Self::Regression(format!("Unknown regression family '{name}'"))
    }

    /// Wrap a stage failure with the stage's name
    pub fn in_stage(stage: impl Into<String>, source: Error) -> Self {
        Self::Pipeline {
            stage: stage.into(),
            source: Box::new(source),
        }
    }

    /// For pipeline errors, the name of the failing stage
    pub fn stage(&self) -> Option<&str> {
        match self {
            Error::Pipeline { stage, .. } => Some(stage),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = Error::Validation("field 'x' has no values".to_string());
        assert_eq!(err.to_string(), "Validation error: field 'x' has no values");

        let err = Error::InsufficientData { expected: 10, actual: 5 };
        assert_eq!(err.to_string(), "Insufficient data: expected at least 10 samples, got 5");

        let err = Error::Regression("singular design".to_string());
        assert_eq!(err.to_string(), "Regression error: singular design");

        let err = Error::Simulation("no numeric fields".to_string());
        assert_eq!(err.to_string(), "Simulation error: no numeric fields");

        assert_eq!(Error::Cancelled.to_string(), "Pipeline execution cancelled");
    }

    #[test]
    fn test_error_kinds() {
        assert_eq!(Error::Validation(String::new()).kind(), ErrorKind::Validation);
        assert_eq!(Error::empty_input("mean").kind(), ErrorKind::Validation);
        assert_eq!(Error::unknown_family("spline").kind(), ErrorKind::Regression);
        assert_eq!(Error::Simulation(String::new()).kind(), ErrorKind::Simulation);
        assert_eq!(Error::Cancelled.kind(), ErrorKind::Cancelled);
        assert_eq!(ErrorKind::Regression.to_string(), "regression");
    }

    #[test]
    fn test_error_helper_functions() {
        match Error::empty_input("median") {
            Error::InsufficientData { expected, actual } => {
                assert_eq!(expected, 1);
                assert_eq!(actual, 0);
            }
            _ => panic!("Wrong error type"),
        }

        let err = Error::size_mismatch(100, 50, "field 'price'");
        assert_eq!(
            err.to_string(),
            "Validation error: Size mismatch in field 'price': expected 100, got 50"
        );

        let err = Error::non_finite("input data");
        assert_eq!(err.to_string(), "Validation error: input data contains NaN or infinite values");

        let err = Error::unknown_family("spline");
        assert_eq!(err.to_string(), "Regression error: Unknown regression family 'spline'");
    }

    #[test]
    fn test_pipeline_wrapping() {
        let inner = Error::Validation("ragged fields".to_string());
        let err = Error::in_stage("Validation", inner);

        assert_eq!(err.kind(), ErrorKind::Pipeline);
        assert_eq!(err.stage(), Some("Validation"));
        assert!(err.to_string().contains("Validation"));
        assert!(err.to_string().contains("ragged fields"));

        let source = std::error::Error::source(&err).unwrap();
        assert_eq!(source.to_string(), "Validation error: ragged fields");
    }

    #[test]
    fn test_error_from_anyhow() {
        let err: Error = anyhow::anyhow!("custom error message").into();
        assert_eq!(err.kind(), ErrorKind::Other);
        assert!(err.to_string().contains("custom error message"));
    }
}
