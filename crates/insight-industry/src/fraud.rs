//! Transaction fraud flags
//!
//! Each row of a transaction table can raise three flags:
//!
//! - an amount more than [`DEFAULT_Z_THRESHOLD`] standard deviations above
//!   the mean amount
//! - a timestamp before 06:00 or after 22:59 UTC
//! - more than one distinct location among the rows within an hour of it
//!
//! Only rows with at least one flag are reported.

use crate::outliers::{z_scores, DEFAULT_Z_THRESHOLD};
use crate::{find_field, find_numeric, find_text, missing_field, RiskLevel};
use insight_core::{Error, Field, FieldValues, Result};
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};
use std::fmt;
use tracing::{debug, instrument};

const HOUR_MS: i64 = 3_600_000;
const DAY_MS: i64 = 24 * HOUR_MS;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum FraudFlag {
    UnusualAmount,
    UnusualTime,
    MultipleLocations,
}

impl FraudFlag {
    /// Contribution to a row's risk score, in tenths
    fn weight_tenths(self) -> u32 {
        match self {
            FraudFlag::UnusualAmount => 3,
            FraudFlag::UnusualTime => 2,
            FraudFlag::MultipleLocations => 4,
        }
    }
}

impl fmt::Display for FraudFlag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            FraudFlag::UnusualAmount => "Unusual amount",
            FraudFlag::UnusualTime => "Unusual time",
            FraudFlag::MultipleLocations => "Multiple locations",
        })
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FlaggedTransaction {
    pub row: usize,
    /// Value of the id field, or the row number when there is none
    pub id: String,
    pub flags: Vec<FraudFlag>,
    pub risk_score: f64,
    pub confidence: f64,
    pub level: RiskLevel,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RiskDistribution {
    pub high: usize,
    pub medium: usize,
    pub low: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FraudReport {
    pub transactions: Vec<FlaggedTransaction>,
    pub distribution: RiskDistribution,
    /// Up to three flags with their counts, most frequent first
    pub common_patterns: Vec<(FraudFlag, usize)>,
}

impl FraudReport {
    pub fn total_flagged(&self) -> usize {
        self.transactions.len()
    }
}

fn level(score_tenths: u32) -> RiskLevel {
    if score_tenths > 7 {
        RiskLevel::High
    } else if score_tenths > 4 {
        RiskLevel::Medium
    } else {
        RiskLevel::Low
    }
}

/// Hour of day (UTC) of an epoch-millisecond timestamp
pub fn utc_hour(millis: i64) -> i64 {
    millis.rem_euclid(DAY_MS) / HOUR_MS
}

fn timestamps(fields: &[Field]) -> Option<&[i64]> {
    ["time", "date"].iter().find_map(|fragment| {
        match find_field(fields, fragment).map(Field::values) {
            Some(FieldValues::DateTime(millis)) => Some(millis.as_slice()),
            _ => None,
        }
    })
}

/// Rows whose hour window holds more than one distinct location
fn location_hops(times: &[i64], locations: &[String]) -> Vec<bool> {
    let mut order: Vec<usize> = (0..times.len()).collect();
    order.sort_by_key(|&i| times[i]);
    let sorted: Vec<i64> = order.iter().map(|&i| times[i]).collect();

    let mut hops = vec![false; times.len()];
    for (row, &t) in times.iter().enumerate() {
        let start = sorted.partition_point(|&s| s <= t - HOUR_MS);
        let end = sorted.partition_point(|&s| s < t + HOUR_MS);
        let distinct: HashSet<&str> = order[start..end]
            .iter()
            .map(|&i| locations[i].as_str())
            .collect();
        hops[row] = end - start > 1 && distinct.len() > 1;
    }
    hops
}

/// Flag suspicious rows of a transaction table
///
/// Needs a numeric field named like "amount". A datetime field named like
/// "time" or "date" enables the hour check, and together with a text field
/// named like "location" the location check. Ids come from a text field
/// named like "id".
#[instrument(skip(fields), fields(fields = fields.len()))]
pub fn detect_fraud(fields: &[Field]) -> Result<FraudReport> {
    let amounts = find_numeric(fields, "amount")?
        .ok_or_else(|| missing_field("Fraud detection", "a numeric 'amount' field"))?;
    let rows = amounts.len();
    let times = timestamps(fields);
    let locations = find_text(fields, "location");
    let ids = find_text(fields, "id");
    for len in [times.map(<[i64]>::len), locations.map(<[String]>::len), ids.map(<[String]>::len)]
        .into_iter()
        .flatten()
    {
        if len != rows {
            return Err(Error::size_mismatch(rows, len, "transaction fields"));
        }
    }

    let z = z_scores(amounts)?;
    let hops = match (times, locations) {
        (Some(t), Some(l)) => location_hops(t, l),
        _ => vec![false; rows],
    };

    let mut transactions = Vec::new();
    for row in 0..rows {
        let mut flags = Vec::new();
        if z[row] > DEFAULT_Z_THRESHOLD {
            flags.push(FraudFlag::UnusualAmount);
        }
        if let Some(t) = times {
            let hour = utc_hour(t[row]);
            if !(6..=22).contains(&hour) {
                flags.push(FraudFlag::UnusualTime);
            }
        }
        if hops[row] {
            flags.push(FraudFlag::MultipleLocations);
        }
        if flags.is_empty() {
            continue;
        }

        let tenths: u32 = flags.iter().map(|f| f.weight_tenths()).sum();
        let risk_score = f64::from(tenths) / 10.0;
        transactions.push(FlaggedTransaction {
            row,
            id: ids.map_or_else(|| row.to_string(), |ids| ids[row].clone()),
            confidence: (0.3 + 0.2 * flags.len() as f64 + 0.5 * risk_score).min(1.0),
            flags,
            risk_score,
            level: level(tenths),
        });
    }

    let mut distribution = RiskDistribution::default();
    let mut counts: HashMap<FraudFlag, usize> = HashMap::new();
    for t in &transactions {
        match t.level {
            RiskLevel::High => distribution.high += 1,
            RiskLevel::Medium => distribution.medium += 1,
            RiskLevel::Low => distribution.low += 1,
        }
        for &flag in &t.flags {
            *counts.entry(flag).or_insert(0) += 1;
        }
    }
    let mut common_patterns: Vec<(FraudFlag, usize)> = counts.into_iter().collect();
    common_patterns.sort_by(|a, b| b.1.cmp(&a.1).then(a.0.cmp(&b.0)));
    common_patterns.truncate(3);

    debug!("flagged {} of {rows} transactions", transactions.len());
    Ok(FraudReport {
        transactions,
        distribution,
        common_patterns,
    })
}
