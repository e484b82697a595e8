//! End-to-end behaviour of the simulation engine

use approx::{assert_abs_diff_eq, assert_relative_eq};
use insight_core::{ErrorKind, Field};
use insight_simulation::{
    run_simulation, run_simulation_with, Direction, ScenarioKind, SimulationConfig,
};
use proptest::prelude::*;

fn seeded() -> SimulationConfig {
    SimulationConfig::default().with_seed(2024)
}

#[test]
fn flat_series_collapses_to_fixed_multiples() {
    let last = 80.0;
    let fields = vec![Field::numeric("stock", vec![last; 6])];
    let result = &run_simulation(&fields).unwrap()[0];

    assert_eq!(result.volatility, 0.0);
    for (kind, multiple) in [
        (ScenarioKind::Best, 1.15),
        (ScenarioKind::Base, 1.0),
        (ScenarioKind::Worst, 0.85),
    ] {
        let scenario = result.scenario(kind).unwrap();
        assert_eq!(scenario.values.len(), 5);
        for &v in &scenario.values {
            assert_relative_eq!(v, last * multiple, max_relative = 1e-15);
        }
    }
    assert_eq!(result.summary.best_case, result.scenario(ScenarioKind::Best).unwrap().values[0]);
    assert_eq!(result.summary.confidence, 1.0);
}

#[test]
fn revenue_projection() {
    let fields = vec![Field::numeric("revenue", vec![100.0, 110.0, 120.0, 130.0, 140.0])];
    let result = &run_simulation_with(&fields, &seeded()).unwrap()[0];

    assert_eq!(result.trend.to_string(), "up");
    let best = result.scenario(ScenarioKind::Best).unwrap();
    assert_abs_diff_eq!(best.adjustment_percent, 15.0, epsilon = 1e-12);
    assert_eq!(best.name, "Best Case");

    // Noise stays within ±volatility·√(1/12) of the scenario level
    let level = 140.0 * (1.0 + 1.1 * 0.15);
    let bound = result.volatility * (1.0f64 / 12.0).sqrt();
    for &v in &best.values {
        assert!((v / level - 1.0).abs() <= bound + 1e-12);
    }

    assert_abs_diff_eq!(result.sensitivity.elasticity, 10.0, epsilon = 1e-9);
    assert_eq!(result.sensitivity.variations.len(), 6);
    assert_eq!(result.sensitivity.variations[3].direction, Direction::Negative);
    assert_abs_diff_eq!(result.summary.range, 140.0 * 0.3, epsilon = 1e-9);
}

#[test]
fn seeded_runs_repeat() {
    let fields = vec![
        Field::numeric("a", vec![3.0, 5.0, 4.0, 6.0, 7.0]),
        Field::text("label", ["p", "q", "r", "s", "t"]),
        Field::numeric("b", vec![9.0, 7.0, 8.0, 6.0, 5.0]),
    ];
    let first = run_simulation_with(&fields, &seeded()).unwrap();
    let second = run_simulation_with(&fields, &seeded()).unwrap();
    assert_eq!(first, second);
    assert_eq!(first.len(), 2);
    assert_eq!(first[1].field, "b");
}

#[test]
fn input_failures_are_simulation_errors() {
    let err = run_simulation(&[]).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Simulation);

    let err = run_simulation(&[Field::text("name", ["x"])]).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Simulation);
    assert!(err.to_string().contains("numeric fields"));

    let err = run_simulation(&[Field::numeric("x", vec![1.0, f64::NAN])]).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Simulation);

    let err = run_simulation(&[Field::numeric("x", vec![])]).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Simulation);

    let bad = SimulationConfig::default().with_horizon(0);
    let err = run_simulation_with(&[Field::numeric("x", vec![1.0])], &bad).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Validation);
}

#[test]
fn volatile_series_keeps_scenario_order() {
    let fields = vec![Field::numeric("x", vec![1.0, 1000.0, 1.0, 1000.0, 1.0])];
    for seed in 0..20 {
        let config = SimulationConfig::default().with_seed(seed);
        let result = &run_simulation_with(&fields, &config).unwrap()[0];
        assert!(result.volatility * (1.0f64 / 12.0).sqrt() > 1.0);

        let best = &result.scenario(ScenarioKind::Best).unwrap().values;
        let base = &result.scenario(ScenarioKind::Base).unwrap().values;
        let worst = &result.scenario(ScenarioKind::Worst).unwrap().values;
        for i in 0..best.len() {
            assert!(
                best[i] >= base[i] && base[i] >= worst[i] && worst[i] >= 0.0,
                "seed {seed} i {i}: best={} base={} worst={}",
                best[i],
                base[i],
                worst[i]
            );
        }
    }
}

proptest! {
    #[test]
    fn probabilities_sum_to_one_and_paths_ordered(
        values in prop::collection::vec(1.0f64..1e4, 1..40),
        seed in any::<u64>(),
    ) {
        let fields = vec![Field::numeric("x", values)];
        let config = SimulationConfig::default().with_seed(seed);
        let result = &run_simulation_with(&fields, &config).unwrap()[0];

        let total: f64 = result.scenarios.iter().map(|s| s.probability).sum();
        prop_assert!((total - 1.0).abs() < 1e-12);

        // Positive levels times a non-negative multiplier keep the order
        let best = &result.scenario(ScenarioKind::Best).unwrap().values;
        let base = &result.scenario(ScenarioKind::Base).unwrap().values;
        let worst = &result.scenario(ScenarioKind::Worst).unwrap().values;
        for i in 0..best.len() {
            prop_assert!(best[i] >= base[i], "best {} < base {} at {}", best[i], base[i], i);
            prop_assert!(base[i] >= worst[i], "base {} < worst {} at {}", base[i], worst[i], i);
            prop_assert!(worst[i] >= 0.0, "negative projection {} at {}", worst[i], i);
            prop_assert!(best[i].is_finite());
        }
    }
}
