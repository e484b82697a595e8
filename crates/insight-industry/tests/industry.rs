//! Domain analyses over realistic tables

use approx::assert_abs_diff_eq;
use insight_core::{ErrorKind, Field};
use insight_industry::fraud::FraudFlag;
use insight_industry::risk::DEFAULT_RISK_FREE_RATE;
use insight_industry::series::FORECAST_HORIZON;
use insight_industry::{
    analyze_inventory, analyze_risk, analyze_sales_trends, analyze_series, detect_fraud,
    risk_metrics, z_score_outliers, RiskLevel, DEFAULT_Z_THRESHOLD,
};
use proptest::prelude::*;

const HOUR: i64 = 3_600_000;

#[test]
fn portfolio_risk() {
    let fields = vec![
        Field::numeric("fund_return", vec![0.05, -0.10, 0.02, 0.08, -0.04, 0.06]),
        Field::numeric("fx_rate", vec![1.10, 1.12, 1.11, 1.30, 1.35, 1.40]),
        Field::text("quarter", ["q1", "q2", "q3", "q4", "q1", "q2"]),
    ];
    let analysis = analyze_risk(&fields, DEFAULT_RISK_FREE_RATE).unwrap();
    assert_eq!(analysis.returns_field.as_deref(), Some("fund_return"));
    assert_eq!(analysis.factors.len(), 2);
    // Returns swing around a small mean, so their variation dominates
    assert_eq!(analysis.factors[0].field, "fund_return");

    let metrics = analysis.metrics.unwrap();
    // 1.05 falls to 0.945
    assert_abs_diff_eq!(metrics.max_drawdown, 0.10, epsilon = 1e-12);
    assert!(metrics.sharpe_ratio < 0.0);
    assert!(analysis.overall_risk > 0.0);

    let err = analyze_risk(&fields[2..], DEFAULT_RISK_FREE_RATE).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Validation);
}

#[test]
fn card_transactions() {
    let day = 30 * 24 * HOUR;
    let fields = vec![
        Field::text("txn_id", ["t1", "t2", "t3", "t4", "t5", "t6", "t7", "t8", "t9", "t10"]),
        Field::numeric(
            "amount",
            vec![20.0, 25.0, 22.0, 18.0, 24.0, 21.0, 19.0, 23.0, 20.0, 900.0],
        ),
        Field::datetime(
            "timestamp",
            vec![
                day + 9 * HOUR,
                day + 10 * HOUR,
                day + 11 * HOUR,
                day + 12 * HOUR,
                day + 13 * HOUR,
                day + 14 * HOUR,
                day + 15 * HOUR,
                day + 16 * HOUR,
                day + 3 * HOUR,
                day + 3 * HOUR + 20 * 60_000,
            ],
        ),
        Field::text(
            "location",
            ["leeds", "leeds", "leeds", "leeds", "leeds", "leeds", "leeds", "leeds", "york", "lima"],
        ),
    ];
    let report = detect_fraud(&fields).unwrap();

    let ids: Vec<&str> = report.transactions.iter().map(|t| t.id.as_str()).collect();
    assert_eq!(ids, ["t9", "t10"]);
    assert_eq!(report.transactions[0].flags, vec![FraudFlag::UnusualTime, FraudFlag::MultipleLocations]);
    assert_eq!(report.transactions[0].level, RiskLevel::Medium);

    let last = &report.transactions[1];
    assert_eq!(
        last.flags,
        vec![FraudFlag::UnusualAmount, FraudFlag::UnusualTime, FraudFlag::MultipleLocations]
    );
    assert_abs_diff_eq!(last.risk_score, 0.9, epsilon = 1e-12);
    assert_eq!(last.level, RiskLevel::High);
    assert_eq!(last.confidence, 1.0);

    assert_eq!(report.total_flagged(), 2);
    assert_eq!(report.distribution.high, 1);
    assert_eq!(report.distribution.medium, 1);
    assert_eq!(report.common_patterns[0], (FraudFlag::UnusualTime, 2));
}

#[test]
fn store_inventory() {
    let fields = vec![
        Field::text("product", ["tea", "jam", "tea", "jam", "tea", "jam"]),
        Field::numeric("inventory", vec![40.0, 300.0, 35.0, 290.0, 30.0, 280.0]),
        Field::numeric("sales", vec![8.0, 10.0, 10.0, 10.0, 12.0, 10.0]),
    ];
    let analysis = analyze_inventory(&fields).unwrap();
    assert_abs_diff_eq!(analysis.turnover_rate, 60.0 / (975.0 / 6.0), epsilon = 1e-12);

    let tea = &analysis.stockout_risk[0];
    assert_eq!(tea.product, "tea");
    assert_eq!(tea.days_until_stockout, Some(4.0));
    assert_eq!(tea.risk, RiskLevel::High);
    assert_eq!(analysis.stockout_risk[1].risk, RiskLevel::Low);
    assert_eq!(analysis.restock_levels[1].minimum, 70.0);

    let trends = analyze_sales_trends(&fields, FORECAST_HORIZON).unwrap();
    assert_eq!(trends.len(), 2);
    assert_abs_diff_eq!(trends[0].growth_rate, 50.0, epsilon = 1e-12);
    assert_eq!(trends[0].forecast.len(), FORECAST_HORIZON);
    assert_eq!(trends[1].forecast, vec![10.0; FORECAST_HORIZON]);

    let err = analyze_inventory(&fields[..1]).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Validation);
}

#[test]
fn seasonal_demand_forecast() {
    let weekly = [120.0, 80.0, 80.0, 120.0];
    let demand: Vec<f64> = (0..24).map(|i| weekly[i % 4]).collect();
    let summaries = analyze_series(&[Field::numeric("demand", demand)], 4).unwrap();
    assert_eq!(summaries[0].seasonality, Some(4));
    for (p, expected) in summaries[0].forecast.iter().zip(weekly) {
        assert_abs_diff_eq!(*p, expected, epsilon = 1e-9);
    }
}

proptest! {
    #[test]
    fn drawdown_is_a_fraction(returns in prop::collection::vec(-2.0f64..2.0, 1..50)) {
        let metrics = risk_metrics(&returns, 0.0).unwrap();
        prop_assert!((0.0..=1.0).contains(&metrics.max_drawdown));
        prop_assert!(metrics.volatility >= 0.0);
    }

    #[test]
    fn outliers_lie_beyond_the_threshold(values in prop::collection::vec(-1e3f64..1e3, 2..60)) {
        let outliers = z_score_outliers(&values, DEFAULT_Z_THRESHOLD).unwrap();
        // Chebyshev: at most 1/k² of the values lie k deviations out
        prop_assert!(outliers.len() * 4 <= values.len());
        for o in &outliers {
            prop_assert!(o.z_score.abs() > DEFAULT_Z_THRESHOLD);
            prop_assert_eq!(values[o.index], o.value);
        }
    }
}
