//! Patient outcome and treatment summaries
//!
//! An outcome counts as a success when its text contains "success" in any
//! case.

use crate::{find_field, find_numeric, find_text, missing_field};
use insight_core::{Error, Field, FieldValues, Result};
use insight_descriptive::correlation::pearson;
use insight_descriptive::statistics::mean;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use tracing::instrument;

/// |r| above which a numeric field is reported as an outcome risk factor
pub const RISK_FACTOR_CORRELATION: f64 = 0.3;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OutcomeRiskFactor {
    pub field: String,
    /// Pearson correlation with the success indicator
    pub correlation: f64,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OutcomeSummary {
    pub success_rate: Option<f64>,
    pub readmission_rate: Option<f64>,
    pub mean_recovery_time: Option<f64>,
    pub risk_factors: Vec<OutcomeRiskFactor>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TreatmentEffect {
    pub treatment: String,
    pub patients: usize,
    /// Share of successful outcomes
    pub effectiveness: f64,
    /// `√patients / 10`, capped at 1
    pub confidence: f64,
    /// Distinct non-blank side effects in order of first report
    pub side_effects: Vec<String>,
}

fn is_success(outcome: &str) -> bool {
    outcome.to_lowercase().contains("success")
}

/// Readmission flags from a boolean field or a numeric 0/1 field
fn readmissions(fields: &[Field]) -> Result<Option<Vec<bool>>> {
    Ok(match find_field(fields, "readmission").map(Field::values) {
        Some(FieldValues::Boolean(flags)) => Some(flags.clone()),
        Some(FieldValues::Numeric(_)) => {
            find_numeric(fields, "readmission")?.map(|v| v.iter().map(|&x| x == 1.0).collect())
        }
        _ => None,
    })
}

fn share(flags: impl ExactSizeIterator<Item = bool>) -> Option<f64> {
    let total = flags.len();
    (total > 0).then(|| flags.filter(|&f| f).count() as f64 / total as f64)
}

/// Success, readmission and recovery summaries of a patient table
///
/// Each rate is `None` when its field (named like "outcome", "readmission"
/// or "recovery") is absent. Risk factors are the numeric fields whose
/// correlation with success exceeds [`RISK_FACTOR_CORRELATION`] in
/// magnitude.
#[instrument(skip(fields), fields(fields = fields.len()))]
pub fn analyze_outcomes(fields: &[Field]) -> Result<OutcomeSummary> {
    let outcomes = find_text(fields, "outcome");
    let success: Option<Vec<f64>> = outcomes.map(|o| {
        o.iter()
            .map(|s| if is_success(s) { 1.0 } else { 0.0 })
            .collect()
    });

    let mut risk_factors = Vec::new();
    if let Some(indicator) = &success {
        for field in fields.iter().filter(|f| f.is_numeric()) {
            let values = field.numeric_values()?;
            if values.len() != indicator.len() {
                return Err(Error::size_mismatch(indicator.len(), values.len(), field.name()));
            }
            let r = pearson(values, indicator);
            if r.abs() > RISK_FACTOR_CORRELATION {
                risk_factors.push(OutcomeRiskFactor {
                    field: field.name().to_string(),
                    correlation: r,
                });
            }
        }
    }

    Ok(OutcomeSummary {
        success_rate: outcomes.and_then(|o| share(o.iter().map(|s| is_success(s)))),
        readmission_rate: readmissions(fields)?.and_then(|r| share(r.into_iter())),
        mean_recovery_time: find_numeric(fields, "recovery")?.map(mean).transpose()?,
        risk_factors,
    })
}

/// Effectiveness of each treatment, in order of first appearance
///
/// Needs text fields named like "treatment" and "outcome". A text field
/// named like "side" lists side effects.
pub fn treatment_effectiveness(fields: &[Field]) -> Result<Vec<TreatmentEffect>> {
    let needed = "text 'treatment' and 'outcome' fields";
    let treatments =
        find_text(fields, "treatment").ok_or_else(|| missing_field("Treatment analysis", needed))?;
    let outcomes =
        find_text(fields, "outcome").ok_or_else(|| missing_field("Treatment analysis", needed))?;
    if treatments.len() != outcomes.len() {
        return Err(Error::size_mismatch(treatments.len(), outcomes.len(), "treatment and outcome"));
    }
    let side_effects = find_text(fields, "side");

    let mut effects: Vec<TreatmentEffect> = Vec::new();
    let mut successes: Vec<usize> = Vec::new();
    let mut position: HashMap<&str, usize> = HashMap::new();
    for (row, (treatment, outcome)) in treatments.iter().zip(outcomes).enumerate() {
        let slot = *position.entry(treatment.as_str()).or_insert_with(|| {
            effects.push(TreatmentEffect {
                treatment: treatment.clone(),
                patients: 0,
                effectiveness: 0.0,
                confidence: 0.0,
                side_effects: Vec::new(),
            });
            successes.push(0);
            effects.len() - 1
        });
        let effect = &mut effects[slot];
        effect.patients += 1;
        if is_success(outcome) {
            successes[slot] += 1;
        }
        if let Some(reported) = side_effects.and_then(|s| s.get(row)) {
            let reported = reported.trim();
            if !reported.is_empty() && !effect.side_effects.iter().any(|e| e == reported) {
                effect.side_effects.push(reported.to_string());
            }
        }
    }

    for (effect, &wins) in effects.iter_mut().zip(&successes) {
        effect.effectiveness = wins as f64 / effect.patients as f64;
        effect.confidence = ((effect.patients as f64).sqrt() / 10.0).min(1.0);
    }
    Ok(effects)
}
