//! Human-readable findings synthesized from a run's analyses

use crate::result::AggregatedResult;
use insight_descriptive::Trend;
use insight_hypothesis::normality::NORMALITY_TEST_NAME;
use insight_hypothesis::t_test::T_TEST_NAME;
use insight_simulation::ScenarioKind;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum InsightKind {
    DataQuality,
    Correlation,
    Trend,
    Significance,
    Normality,
    Regression,
    Simulation,
    Skipped,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Insight {
    pub kind: InsightKind,
    /// Field the finding is about, if it concerns one
    pub field: Option<String>,
    pub message: String,
}

impl Insight {
    fn new(kind: InsightKind, field: Option<&str>, message: String) -> Self {
        Self {
            kind,
            field: field.map(str::to_string),
            message,
        }
    }
}

/// Findings in a fixed order: data quality, correlations, trends, tests,
/// regression, simulation, then skipped analyses
pub fn synthesize(result: &AggregatedResult, correlation_threshold: f64) -> Vec<Insight> {
    let mut insights = Vec::new();

    let quality = result.data_quality;
    if quality.completeness < 1.0 {
        insights.push(Insight::new(
            InsightKind::DataQuality,
            None,
            format!(
                "{:.1}% of values are missing or blank",
                (1.0 - quality.completeness) * 100.0
            ),
        ));
    }

    if let Some(matrix) = &result.correlations {
        for (pair, r) in matrix.strong_pairs(correlation_threshold) {
            let sign = if r >= 0.0 { "positive" } else { "negative" };
            insights.push(Insight::new(
                InsightKind::Correlation,
                None,
                format!(
                    "Strong {sign} correlation between {} and {} (r = {r:.3})",
                    pair.first(),
                    pair.second()
                ),
            ));
        }
    }

    for stats in &result.field_statistics {
        if stats.trend != Trend::Stable {
            let direction = if stats.trend == Trend::Up { "an upward" } else { "a downward" };
            insights.push(Insight::new(
                InsightKind::Trend,
                Some(&stats.field),
                format!("{} shows {direction} trend", stats.field),
            ));
        }
    }

    for field in &result.hypothesis_tests {
        for test in &field.results {
            if !test.is_significant {
                continue;
            }
            if test.test_name == T_TEST_NAME {
                insights.push(Insight::new(
                    InsightKind::Significance,
                    Some(&field.field),
                    format!(
                        "Mean of {} is significantly different from 0 (p = {:.4})",
                        field.field, test.p_value
                    ),
                ));
            } else if test.test_name == NORMALITY_TEST_NAME {
                insights.push(Insight::new(
                    InsightKind::Normality,
                    Some(&field.field),
                    format!(
                        "{} deviates from a normal distribution (W = {:.3}, p = {:.4})",
                        field.field, test.statistic, test.p_value
                    ),
                ));
            }
        }
    }

    let best = result
        .regressions
        .iter()
        .filter(|m| m.r_squared().is_finite())
        .max_by(|a, b| a.r_squared().total_cmp(&b.r_squared()));
    if let Some(model) = best {
        insights.push(Insight::new(
            InsightKind::Regression,
            Some(model.dependent()),
            format!(
                "Best-fitting {} model: {} (R² = {:.3})",
                model.family(),
                model.equation(),
                model.r_squared()
            ),
        ));
    }

    for sim in &result.simulations {
        let last = |kind| {
            sim.scenario(kind)
                .and_then(|s| s.values.last().copied())
                .unwrap_or(f64::NAN)
        };
        insights.push(Insight::new(
            InsightKind::Simulation,
            Some(&sim.field),
            format!(
                "{} projects between {:.2} (worst) and {:.2} (best), base {:.2}; confidence {:.0}%",
                sim.field,
                last(ScenarioKind::Worst),
                last(ScenarioKind::Best),
                last(ScenarioKind::Base),
                sim.summary.confidence * 100.0
            ),
        ));
    }

    for skipped in &result.skipped {
        insights.push(Insight::new(
            InsightKind::Skipped,
            None,
            format!("{} skipped: {}", skipped.analysis, skipped.reason),
        ));
    }

    insights
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::result::SkippedAnalysis;
    use crate::stage::Stage;
    use insight_core::{DataQuality, Field};
    use insight_descriptive::{compute_correlations, compute_field_statistics};
    use uuid::Uuid;

    fn empty_result(completeness: f64) -> AggregatedResult {
        AggregatedResult::new(
            Uuid::new_v4(),
            5,
            2,
            DataQuality {
                completeness,
                validity: completeness,
            },
        )
    }

    #[test]
    fn test_correlation_and_trend_insights() {
        let fields = vec![
            Field::numeric("a", vec![1.0, 2.0, 3.0, 4.0, 5.0]),
            Field::numeric("b", vec![5.0, 4.0, 3.0, 2.0, 1.0]),
        ];
        let mut result = empty_result(1.0);
        result.correlations = Some(compute_correlations(&fields).unwrap());
        result.field_statistics = fields.iter().map(|f| compute_field_statistics(f).unwrap()).collect();

        let insights = synthesize(&result, 0.7);
        assert_eq!(insights[0].kind, InsightKind::Correlation);
        assert!(insights[0].message.contains("Strong negative correlation between a and b"));
        let trends: Vec<_> = insights.iter().filter(|i| i.kind == InsightKind::Trend).collect();
        assert_eq!(trends.len(), 2);
        assert_eq!(trends[0].message, "a shows an upward trend");
        assert_eq!(trends[1].message, "b shows a downward trend");
    }

    #[test]
    fn test_quality_and_skipped_insights() {
        let mut result = empty_result(0.75);
        result.skipped.push(SkippedAnalysis {
            stage: Stage::Regression,
            analysis: "Regression".to_string(),
            reason: "needs at least two numeric fields".to_string(),
        });
        let insights = synthesize(&result, 0.7);
        assert_eq!(insights.len(), 2);
        assert_eq!(insights[0].message, "25.0% of values are missing or blank");
        assert_eq!(
            insights[1].message,
            "Regression skipped: needs at least two numeric fields"
        );
    }
}
