use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt;

use crate::model::InventoryRecord;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StockCount {
    pub out_of_stock: bool,
    pub count: i64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NameCount {
    pub name: String,
    pub sku_count: i64,
}

/// Name, price and discount of a product line.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct DiscountRow {
    pub name: String,
    pub mrp: Decimal,
    pub discount_percent: Decimal,
}

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct PriceRow {
    pub name: String,
    pub mrp: Decimal,
}

/// One group of a per-category aggregate. `None` is the NULL category,
/// which grouping keeps as a group of its own.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CategoryTotal {
    pub category: Option<String>,
    pub value: Decimal,
}

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct PricePerGramRow {
    pub name: String,
    pub weight_in_gms: i32,
    pub discounted_selling_price: Decimal,
    pub price_per_gram: Decimal,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum WeightBand {
    Low,
    Medium,
    Bulk,
}

impl WeightBand {
    pub const MEDIUM_FROM_GMS: i32 = 1000;
    pub const BULK_FROM_GMS: i32 = 5000;

    pub fn for_weight(weight_in_gms: i32) -> Self {
        if weight_in_gms < Self::MEDIUM_FROM_GMS {
            WeightBand::Low
        } else if weight_in_gms < Self::BULK_FROM_GMS {
            WeightBand::Medium
        } else {
            WeightBand::Bulk
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            WeightBand::Low => "Low",
            WeightBand::Medium => "Medium",
            WeightBand::Bulk => "Bulk",
        }
    }
}

impl fmt::Display for WeightBand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for WeightBand {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "Low" => Ok(WeightBand::Low),
            "Medium" => Ok(WeightBand::Medium),
            "Bulk" => Ok(WeightBand::Bulk),
            other => Err(anyhow::anyhow!("Unknown weight band: {}", other)),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct WeightBandRow {
    pub name: String,
    pub weight_in_gms: i32,
    pub band: WeightBand,
}

/// Rows returned by a query, one variant per result shape.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "rows", rename_all = "snake_case")]
pub enum QueryResult {
    Count(i64),
    Records(Vec<InventoryRecord>),
    Categories(Vec<String>),
    StockCounts(Vec<StockCount>),
    NameCounts(Vec<NameCount>),
    Discounts(Vec<DiscountRow>),
    Prices(Vec<PriceRow>),
    CategoryTotals(Vec<CategoryTotal>),
    PricePerGram(Vec<PricePerGramRow>),
    WeightBands(Vec<WeightBandRow>),
}

impl QueryResult {
    /// Number of result rows (a count is a single row).
    pub fn len(&self) -> usize {
        match self {
            QueryResult::Count(_) => 1,
            QueryResult::Records(rows) => rows.len(),
            QueryResult::Categories(rows) => rows.len(),
            QueryResult::StockCounts(rows) => rows.len(),
            QueryResult::NameCounts(rows) => rows.len(),
            QueryResult::Discounts(rows) => rows.len(),
            QueryResult::Prices(rows) => rows.len(),
            QueryResult::CategoryTotals(rows) => rows.len(),
            QueryResult::PricePerGram(rows) => rows.len(),
            QueryResult::WeightBands(rows) => rows.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
