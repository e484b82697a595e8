//! Inventory and per-product sales analysis
//!
//! Sales rows are read as daily unit sales. A product's stock on hand is
//! its inventory value in the first row that names it.

use crate::series::{detect_seasonality, forecast, growth_rate};
use crate::{find_numeric, find_text, missing_field, RiskLevel};
use insight_core::{Error, Field, Result};
use insight_descriptive::statistics::{compensated_sum, std_dev, trend, Trend};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use tracing::{debug, instrument};

/// Days of cover below which stockout risk is high
pub const HIGH_RISK_DAYS: f64 = 7.0;
/// Days of cover below which stockout risk is medium
pub const MEDIUM_RISK_DAYS: f64 = 14.0;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StockoutRisk {
    pub product: String,
    pub risk: RiskLevel,
    /// `None` when the product has no positive average sales
    pub days_until_stockout: Option<f64>,
}

/// Stock targets from average daily sales: a week, two weeks, and a month
/// plus two standard deviations
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RestockLevels {
    pub product: String,
    pub minimum: f64,
    pub optimal: f64,
    pub maximum: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InventoryAnalysis {
    pub turnover_rate: f64,
    pub stockout_risk: Vec<StockoutRisk>,
    pub restock_levels: Vec<RestockLevels>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProductTrend {
    pub product: String,
    pub trend: Trend,
    pub growth_rate: f64,
    pub seasonality: Option<usize>,
    pub forecast: Vec<f64>,
}

/// Total sales over average inventory; 0 without positive average inventory
pub fn inventory_turnover(inventory: &[f64], sales: &[f64]) -> f64 {
    if inventory.is_empty() || sales.is_empty() {
        return 0.0;
    }
    let average = compensated_sum(inventory.iter().copied()) / inventory.len() as f64;
    if average <= 0.0 {
        return 0.0;
    }
    compensated_sum(sales.iter().copied()) / average
}

fn average(values: &[f64]) -> f64 {
    compensated_sum(values.iter().copied()) / values.len() as f64
}

pub fn stockout_risk(product: &str, stock: f64, sales: &[f64]) -> StockoutRisk {
    let daily = average(sales);
    let days = (daily > 0.0).then(|| (stock / daily).round());
    let risk = match days {
        Some(d) if d < HIGH_RISK_DAYS => RiskLevel::High,
        Some(d) if d < MEDIUM_RISK_DAYS => RiskLevel::Medium,
        _ => RiskLevel::Low,
    };
    StockoutRisk {
        product: product.to_string(),
        risk,
        days_until_stockout: days,
    }
}

pub fn restock_levels(product: &str, sales: &[f64]) -> Result<RestockLevels> {
    let daily = average(sales);
    let spread = std_dev(sales)?;
    Ok(RestockLevels {
        product: product.to_string(),
        minimum: (daily * 7.0).ceil(),
        optimal: (daily * 14.0).ceil(),
        maximum: (daily * 30.0 + 2.0 * spread).ceil(),
    })
}

/// Row indices of each product in order of first appearance
fn group_rows(products: &[String]) -> Vec<(&str, Vec<usize>)> {
    let mut groups: Vec<(&str, Vec<usize>)> = Vec::new();
    let mut position: HashMap<&str, usize> = HashMap::new();
    for (row, product) in products.iter().enumerate() {
        let slot = *position.entry(product.as_str()).or_insert_with(|| {
            groups.push((product.as_str(), Vec::new()));
            groups.len() - 1
        });
        groups[slot].1.push(row);
    }
    groups
}

fn check_len(expected: usize, actual: usize, context: &str) -> Result<()> {
    if expected != actual {
        return Err(Error::size_mismatch(expected, actual, context));
    }
    Ok(())
}

/// Turnover for the whole table, and stockout risk and restock levels per
/// product when a text field named like "product" exists
///
/// Needs numeric fields named like "inventory" and "sales".
#[instrument(skip(fields), fields(fields = fields.len()))]
pub fn analyze_inventory(fields: &[Field]) -> Result<InventoryAnalysis> {
    let needed = "numeric 'inventory' and 'sales' fields";
    let inventory = find_numeric(fields, "inventory")?
        .ok_or_else(|| missing_field("Inventory analysis", needed))?;
    let sales =
        find_numeric(fields, "sales")?.ok_or_else(|| missing_field("Inventory analysis", needed))?;
    check_len(inventory.len(), sales.len(), "inventory and sales")?;

    let mut stockout = Vec::new();
    let mut restock = Vec::new();
    if let Some(products) = find_text(fields, "product") {
        check_len(sales.len(), products.len(), "sales and product")?;
        for (product, rows) in group_rows(products) {
            let product_sales: Vec<f64> = rows.iter().map(|&r| sales[r]).collect();
            stockout.push(stockout_risk(product, inventory[rows[0]], &product_sales));
            restock.push(restock_levels(product, &product_sales)?);
        }
    }
    debug!("inventory analysis over {} products", stockout.len());

    Ok(InventoryAnalysis {
        turnover_rate: inventory_turnover(inventory, sales),
        stockout_risk: stockout,
        restock_levels: restock,
    })
}

/// Trend, growth, seasonality and forecast of each product's sales
///
/// Needs a numeric field named like "sales" and a text field named like
/// "product".
pub fn analyze_sales_trends(fields: &[Field], horizon: usize) -> Result<Vec<ProductTrend>> {
    let needed = "a numeric 'sales' field and a text 'product' field";
    let sales = find_numeric(fields, "sales")?.ok_or_else(|| missing_field("Sales trends", needed))?;
    let products = find_text(fields, "product").ok_or_else(|| missing_field("Sales trends", needed))?;
    check_len(sales.len(), products.len(), "sales and product")?;

    group_rows(products)
        .into_iter()
        .map(|(product, rows)| {
            let series: Vec<f64> = rows.iter().map(|&r| sales[r]).collect();
            Ok(ProductTrend {
                product: product.to_string(),
                trend: trend(&series),
                growth_rate: growth_rate(&series),
                seasonality: detect_seasonality(&series),
                forecast: forecast(&series, horizon)?,
            })
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;

    #[test]
    fn test_turnover() {
        assert_abs_diff_eq!(inventory_turnover(&[50.0, 150.0], &[30.0, 70.0]), 1.0, epsilon = 1e-12);
        assert_eq!(inventory_turnover(&[0.0, 0.0], &[5.0, 5.0]), 0.0);
        assert_eq!(inventory_turnover(&[], &[]), 0.0);
    }

    #[test]
    fn test_stockout_buckets() {
        assert_eq!(stockout_risk("a", 30.0, &[10.0]).risk, RiskLevel::High);
        assert_eq!(stockout_risk("a", 100.0, &[10.0]).risk, RiskLevel::Medium);
        let slow = stockout_risk("a", 500.0, &[10.0, 10.0]);
        assert_eq!(slow.risk, RiskLevel::Low);
        assert_eq!(slow.days_until_stockout, Some(50.0));

        let unsold = stockout_risk("b", 5.0, &[0.0, 0.0]);
        assert_eq!(unsold.risk, RiskLevel::Low);
        assert_eq!(unsold.days_until_stockout, None);
    }

    #[test]
    fn test_restock_levels() {
        // mean 10, population σ 2
        let levels = restock_levels("a", &[8.0, 12.0, 8.0, 12.0]).unwrap();
        assert_eq!(levels.minimum, 70.0);
        assert_eq!(levels.optimal, 140.0);
        assert_eq!(levels.maximum, 304.0);
    }

    #[test]
    fn test_group_rows_keeps_first_appearance_order() {
        let products: Vec<String> = ["b", "a", "b", "c", "a"].iter().map(|s| s.to_string()).collect();
        let groups = group_rows(&products);
        assert_eq!(groups, vec![("b", vec![0, 2]), ("a", vec![1, 4]), ("c", vec![3])]);
    }
}
