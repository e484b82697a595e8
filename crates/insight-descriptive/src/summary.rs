//! Dataset-level and text-field summaries

use crate::statistics::{compensated_sum, trend_strength};
use insight_core::{Error, Field, Result};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Aggregate view over every numeric field of a dataset
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct DatasetSummary {
    /// Mean of all numeric values pooled together
    pub average_mean: f64,
    /// Population variance of the pooled values
    pub overall_variance: f64,
    /// Mean over fields of `|second-half mean - first-half mean| / |first-half mean|`
    pub trend_strength: f64,
    pub numeric_fields: usize,
}

impl DatasetSummary {
    /// Summarise the numeric fields; fails when there are none
    pub fn from_fields(fields: &[Field]) -> Result<Self> {
        let numeric: Vec<&[f64]> = fields
            .iter()
            .filter(|f| f.is_numeric())
            .map(Field::numeric_values)
            .collect::<Result<_>>()?;
        if numeric.is_empty() {
            return Err(Error::Validation(
                "Dataset summary requires at least one numeric field".to_string(),
            ));
        }

        let count: usize = numeric.iter().map(|v| v.len()).sum();
        let pooled = || numeric.iter().flat_map(|v| v.iter().copied());
        let average_mean = compensated_sum(pooled()) / count as f64;
        let overall_variance =
            compensated_sum(pooled().map(|v| (v - average_mean).powi(2))) / count as f64;
        let trend_strength =
            numeric.iter().map(|v| trend_strength(v)).sum::<f64>() / numeric.len() as f64;

        Ok(Self {
            average_mean,
            overall_variance,
            trend_strength,
            numeric_fields: numeric.len(),
        })
    }
}

/// Counts and lengths for one text field
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TextSummary {
    pub field: String,
    pub total_count: usize,
    pub unique_count: usize,
    /// Mean length in characters
    pub average_length: f64,
    /// Most frequent value; ties go to the first occurrence
    pub most_frequent: Option<String>,
}

impl TextSummary {
    pub fn from_field(field: &Field) -> Result<Self> {
        let values = field.as_text().ok_or_else(|| {
            Error::Validation(format!(
                "Field '{}' is {}, expected text",
                field.name(),
                field.kind().name()
            ))
        })?;

        let mut counts: HashMap<&str, (usize, usize)> = HashMap::new();
        for (i, v) in values.iter().enumerate() {
            counts.entry(v.as_str()).or_insert((0, i)).0 += 1;
        }
        let most_frequent = counts
            .iter()
            .max_by(|a, b| a.1 .0.cmp(&b.1 .0).then(b.1 .1.cmp(&a.1 .1)))
            .map(|(v, _)| v.to_string());

        let total_chars: usize = values.iter().map(|v| v.chars().count()).sum();
        let average_length = if values.is_empty() {
            0.0
        } else {
            total_chars as f64 / values.len() as f64
        };

        Ok(Self {
            field: field.name().to_string(),
            total_count: values.len(),
            unique_count: counts.len(),
            average_length,
            most_frequent,
        })
    }
}
