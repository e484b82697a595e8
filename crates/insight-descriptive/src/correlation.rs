//! Pairwise Pearson correlation across numeric fields
//!
//! # Conventions
//!
//! - A field paired with itself has correlation exactly 1. The diagonal is
//!   never computed or stored; [`CorrelationMatrix::get`] answers it.
//! - A pair with fewer than two overlapping samples, or where either side
//!   has zero variance, reports 0. This is a defaulted answer, not a
//!   statistically meaningful one.
//! - Non-numeric fields are ignored.

use crate::statistics::compensated_sum;
use insight_core::{Error, Field, Result};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashSet};
use std::fmt;

/// Order-independent identifier for an unordered pair of field names
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct PairKey {
    first: String,
    second: String,
}

impl PairKey {
    pub fn new(a: &str, b: &str) -> Self {
        let (first, second) = if a <= b { (a, b) } else { (b, a) };
        Self {
            first: first.to_string(),
            second: second.to_string(),
        }
    }

    pub fn first(&self) -> &str {
        &self.first
    }

    pub fn second(&self) -> &str {
        &self.second
    }

    pub fn is_diagonal(&self) -> bool {
        self.first == self.second
    }
}

/// Both names are quoted and escaped, so no two pairs render alike
impl fmt::Display for PairKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({:?}, {:?})", self.first, self.second)
    }
}

/// Pearson coefficients for every unordered pair of distinct numeric fields
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CorrelationMatrix {
    fields: Vec<String>,
    #[serde(with = "pair_entries")]
    pairs: BTreeMap<PairKey, f64>,
}

/// Pairs serialize as a list of `[key, coefficient]` entries
mod pair_entries {
    use super::PairKey;
    use serde::{Deserialize, Deserializer, Serializer};
    use std::collections::BTreeMap;

    pub fn serialize<S: Serializer>(
        pairs: &BTreeMap<PairKey, f64>,
        serializer: S,
    ) -> std::result::Result<S::Ok, S::Error> {
        serializer.collect_seq(pairs.iter())
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(
        deserializer: D,
    ) -> std::result::Result<BTreeMap<PairKey, f64>, D::Error> {
        let entries = Vec::<(PairKey, f64)>::deserialize(deserializer)?;
        Ok(entries.into_iter().collect())
    }
}

impl CorrelationMatrix {
    /// Coefficient for a pair, `Some(1.0)` for a known field with itself
    pub fn get(&self, a: &str, b: &str) -> Option<f64> {
        if a == b {
            return self.fields.iter().any(|f| f == a).then_some(1.0);
        }
        self.pairs.get(&PairKey::new(a, b)).copied()
    }

    /// Off-diagonal pairs in key order
    pub fn pairs(&self) -> impl Iterator<Item = (&PairKey, f64)> {
        self.pairs.iter().map(|(k, &v)| (k, v))
    }

    /// Numeric field names in column order
    pub fn fields(&self) -> &[String] {
        &self.fields
    }

    /// Number of off-diagonal pairs
    pub fn len(&self) -> usize {
        self.pairs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pairs.is_empty()
    }

    /// Pairs with `|r| >= threshold`, strongest first
    pub fn strong_pairs(&self, threshold: f64) -> Vec<(&PairKey, f64)> {
        let mut strong: Vec<_> = self.pairs().filter(|(_, r)| r.abs() >= threshold).collect();
        strong.sort_by(|a, b| b.1.abs().total_cmp(&a.1.abs()));
        strong
    }
}

/// Pearson coefficient on the overlapping prefix of two series
///
/// Returns 0 for fewer than two overlapping samples or zero variance.
pub fn pearson(x: &[f64], y: &[f64]) -> f64 {
    let n = x.len().min(y.len());
    if n < 2 {
        return 0.0;
    }
    let (x, y) = (&x[..n], &y[..n]);
    let mean_x = compensated_sum(x.iter().copied()) / n as f64;
    let mean_y = compensated_sum(y.iter().copied()) / n as f64;

    let mut sxy = 0.0;
    let mut sxx = 0.0;
    let mut syy = 0.0;
    for (&xi, &yi) in x.iter().zip(y) {
        let dx = xi - mean_x;
        let dy = yi - mean_y;
        sxy += dx * dy;
        sxx += dx * dx;
        syy += dy * dy;
    }

    let denom = (sxx * syy).sqrt();
    if denom == 0.0 || !denom.is_finite() {
        return 0.0;
    }
    (sxy / denom).clamp(-1.0, 1.0)
}

/// Correlate every unordered pair of numeric fields
///
/// Fails if a numeric field is empty or holds non-finite values, or if two
/// numeric fields share a name.
pub fn compute_correlations(fields: &[Field]) -> Result<CorrelationMatrix> {
    let numeric: Vec<(&str, &[f64])> = fields
        .iter()
        .filter(|f| f.is_numeric())
        .map(|f| Ok((f.name(), f.numeric_values()?)))
        .collect::<Result<_>>()?;

    let mut seen = HashSet::with_capacity(numeric.len());
    for (name, _) in &numeric {
        if !seen.insert(*name) {
            return Err(Error::Validation(format!("Duplicate field name '{name}'")));
        }
    }

    let mut pairs = BTreeMap::new();
    for (i, (name_a, a)) in numeric.iter().enumerate() {
        for (name_b, b) in &numeric[i + 1..] {
            pairs.insert(PairKey::new(name_a, name_b), pearson(a, b));
        }
    }
    tracing::debug!(
        "computed {} correlation pairs over {} numeric fields",
        pairs.len(),
        numeric.len()
    );

    Ok(CorrelationMatrix {
        fields: numeric.iter().map(|(n, _)| n.to_string()).collect(),
        pairs,
    })
}
