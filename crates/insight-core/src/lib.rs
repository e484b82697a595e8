//! Core types for the insight-stats analysis engine
//!
//! This crate holds the pieces every other insight crate builds on:
//!
//! - [`field`]: the typed columnar field store ([`Field`], [`Dataset`])
//! - [`error`]: the shared [`Error`] type with machine-readable kinds
//! - [`linalg`]: dense matrices and the Gaussian-elimination solver
//! - [`special`]: log-gamma, incomplete beta, Student-t and normal
//!   distribution approximations
//!
//! # Example
//!
//! ```rust
//! use insight_core::{linalg::{solve, Matrix}, Dataset, Field};
//!
//! let ds = Dataset::new(vec![
//!     Field::numeric("revenue", vec![100.0, 110.0, 120.0]),
//!     Field::text("region", ["north", "south", "east"]),
//! ])
//! .unwrap();
//! assert_eq!(ds.row_count(), 3);
//!
//! let a = Matrix::from_rows(&[vec![2.0, 1.0], vec![1.0, 3.0]]).unwrap();
//! let x: Vec<f64> = solve(&a, &[3.0, 5.0]).unwrap();
//! assert!((x[0] - 0.8).abs() < 1e-12);
//! ```

pub mod error;
pub mod field;
pub mod linalg;
pub mod special;

pub use error::{Error, ErrorKind, Result};
pub use field::{DataQuality, Dataset, Field, FieldKind, FieldValues, PipelineChunk};
pub use linalg::Matrix;
