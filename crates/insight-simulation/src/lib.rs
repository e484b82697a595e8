//! Scenario simulation for insight-stats
//!
//! For each numeric field, [`run_simulation`] projects a best, base and
//! worst path a fixed number of points ahead of the last observed value,
//! perturbs that value for a sensitivity table, and summarizes the spread.
//!
//! Each projected point is
//! `last · (1 + trendFactor · adjustment) · (1 + volatility · √(1/12) · u)`
//! with `u` uniform on (-1, 1). The trend factor is 1.1 for an upward
//! series, 0.9 for a downward one and 1.0 otherwise; the adjustment is
//! +15 %, 0 and -15 % by default. All scenarios of a field share the same
//! draws of `u`, so a seeded run is reproducible and the paths differ only
//! by their adjustment.
//!
//! # Example
//!
//! ```rust
//! use insight_core::Field;
//! use insight_simulation::{run_simulation_with, ScenarioKind, SimulationConfig};
//!
//! let fields = vec![Field::numeric("units", vec![40.0, 40.0, 40.0, 40.0])];
//! let config = SimulationConfig::default().with_seed(1);
//! let results = run_simulation_with(&fields, &config).unwrap();
//! let best = results[0].scenario(ScenarioKind::Best).unwrap();
//! assert!(best.values.iter().all(|&v| (v - 46.0).abs() < 1e-9));
//! ```

pub mod config;
pub mod engine;
pub mod scenario;
pub mod sensitivity;

pub use config::SimulationConfig;
pub use engine::{
    noise_multiplier, run_simulation, run_simulation_with, trend_factor, volatility, SimulationResult,
};
pub use scenario::{Scenario, ScenarioKind, ScenarioSummary};
pub use sensitivity::{Direction, SensitivityAnalysis, Variation};
