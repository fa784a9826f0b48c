//! The fixed query catalog.
//!
//! Each [`Query`] is a read-only statement over the `inventory` table. The
//! SQL text lives in `store::sql`; [`Query::evaluate`] is the same statement
//! evaluated over rows in memory, with the same filters, groupings, rounding
//! and ordering (including tie-breakers), so both backends agree row for row.

use anyhow::{anyhow, Result};
use itertools::Itertools;
use rust_decimal::{Decimal, RoundingStrategy};
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::collections::BTreeMap;

use crate::model::{
    CategoryTotal, DiscountRow, InventoryRecord, NameCount, PricePerGramRow, PriceRow,
    QueryResult, StockCount, WeightBand, WeightBandRow,
};

pub const DEFAULT_SAMPLE_LIMIT: i64 = 10;
pub const DEFAULT_TOP_DISCOUNTS: i64 = 10;
pub const DEFAULT_HIGH_MRP: i64 = 300;
pub const DEFAULT_PREMIUM_MRP: i64 = 500;
pub const DEFAULT_LOW_DISCOUNT: i64 = 10;
pub const DEFAULT_TOP_CATEGORIES: i64 = 5;
pub const DEFAULT_MIN_WEIGHT_GMS: i32 = 100;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "query", rename_all = "snake_case")]
pub enum Query {
    // Exploration
    RowCount,
    Sample { limit: i64 },
    NullCategory,
    DistinctCategories,
    StockStatus,
    DuplicateNames,
    ZeroPriced,
    // Business questions
    TopDiscounts { limit: i64 },
    OutOfStockHighMrp { min_mrp: Decimal },
    RevenueByCategory,
    PremiumLowDiscount { min_mrp: Decimal, max_discount: Decimal },
    TopCategoriesByDiscount { limit: i64 },
    PricePerGram { min_weight: i32 },
    WeightBands,
    InventoryWeightByCategory,
}

impl Query {
    /// Queries run against the freshly loaded table, before cleaning.
    pub fn exploration(sample_limit: i64) -> Vec<Query> {
        vec![
            Query::RowCount,
            Query::Sample {
                limit: sample_limit,
            },
            Query::NullCategory,
            Query::DistinctCategories,
            Query::StockStatus,
            Query::DuplicateNames,
            Query::ZeroPriced,
        ]
    }

    /// Business questions, run on the cleaned table.
    pub fn business() -> Vec<Query> {
        vec![
            Query::TopDiscounts {
                limit: DEFAULT_TOP_DISCOUNTS,
            },
            Query::OutOfStockHighMrp {
                min_mrp: Decimal::from(DEFAULT_HIGH_MRP),
            },
            Query::RevenueByCategory,
            Query::PremiumLowDiscount {
                min_mrp: Decimal::from(DEFAULT_PREMIUM_MRP),
                max_discount: Decimal::from(DEFAULT_LOW_DISCOUNT),
            },
            Query::TopCategoriesByDiscount {
                limit: DEFAULT_TOP_CATEGORIES,
            },
            Query::PricePerGram {
                min_weight: DEFAULT_MIN_WEIGHT_GMS,
            },
            Query::WeightBands,
            Query::InventoryWeightByCategory,
        ]
    }

    pub fn title(&self) -> String {
        match self {
            Query::RowCount => "Row count".to_string(),
            Query::Sample { limit } => format!("Sample of {} rows", limit),
            Query::NullCategory => "Rows without a category".to_string(),
            Query::DistinctCategories => "Product categories".to_string(),
            Query::StockStatus => "Products in stock vs out of stock".to_string(),
            Query::DuplicateNames => "Product names present multiple times".to_string(),
            Query::ZeroPriced => "Rows with a zero price".to_string(),
            Query::TopDiscounts { limit } => {
                format!("Top {} best-value products by discount", limit)
            }
            Query::OutOfStockHighMrp { min_mrp } => {
                format!("Out-of-stock products with MRP above {}", min_mrp)
            }
            Query::RevenueByCategory => "Estimated revenue per category".to_string(),
            Query::PremiumLowDiscount {
                min_mrp,
                max_discount,
            } => format!(
                "Products with MRP above {} and discount below {}%",
                min_mrp, max_discount
            ),
            Query::TopCategoriesByDiscount { limit } => {
                format!("Top {} categories by average discount", limit)
            }
            Query::PricePerGram { min_weight } => {
                format!("Price per gram for products of at least {} g", min_weight)
            }
            Query::WeightBands => "Products by weight band".to_string(),
            Query::InventoryWeightByCategory => "Total inventory weight per category".to_string(),
        }
    }

    /// Evaluate the statement over `rows`.
    ///
    /// Aggregates that leave the `Decimal` range fail with an error instead
    /// of panicking.
    pub fn evaluate(&self, rows: &[InventoryRecord]) -> Result<QueryResult> {
        let result = match self {
            Query::RowCount => QueryResult::Count(rows.len() as i64),
            Query::Sample { limit } => QueryResult::Records(
                by_sku(rows.iter().cloned())
                    .into_iter()
                    .take(limit_to_usize(*limit))
                    .collect(),
            ),
            Query::NullCategory => QueryResult::Records(by_sku(
                rows.iter().filter(|r| r.category.is_none()).cloned(),
            )),
            Query::DistinctCategories => QueryResult::Categories(
                rows.iter()
                    .filter_map(|r| r.category.clone())
                    .sorted()
                    .dedup()
                    .collect(),
            ),
            Query::StockStatus => {
                let mut counts: BTreeMap<bool, i64> = BTreeMap::new();
                for row in rows {
                    *counts.entry(row.out_of_stock).or_default() += 1;
                }
                QueryResult::StockCounts(
                    counts
                        .into_iter()
                        .map(|(out_of_stock, count)| StockCount {
                            out_of_stock,
                            count,
                        })
                        .collect(),
                )
            }
            Query::DuplicateNames => {
                let mut counts: BTreeMap<&str, i64> = BTreeMap::new();
                for row in rows {
                    *counts.entry(row.name.as_str()).or_default() += 1;
                }
                QueryResult::NameCounts(
                    counts
                        .into_iter()
                        .filter(|(_, count)| *count > 1)
                        .sorted_by(|a, b| b.1.cmp(&a.1).then_with(|| a.0.cmp(b.0)))
                        .map(|(name, sku_count)| NameCount {
                            name: name.to_string(),
                            sku_count,
                        })
                        .collect(),
                )
            }
            Query::ZeroPriced => QueryResult::Records(by_sku(
                rows.iter()
                    .filter(|r| r.mrp.is_zero() || r.discounted_selling_price.is_zero())
                    .cloned(),
            )),
            Query::TopDiscounts { limit } => QueryResult::Discounts(
                rows.iter()
                    .map(discount_row)
                    .sorted_by(|a, b| {
                        b.discount_percent
                            .cmp(&a.discount_percent)
                            .then_with(|| a.name.cmp(&b.name))
                            .then_with(|| a.mrp.cmp(&b.mrp))
                    })
                    .dedup()
                    .take(limit_to_usize(*limit))
                    .collect(),
            ),
            Query::OutOfStockHighMrp { min_mrp } => QueryResult::Prices(
                rows.iter()
                    .filter(|r| r.out_of_stock && r.mrp > *min_mrp)
                    .map(|r| PriceRow {
                        name: r.name.clone(),
                        mrp: r.mrp,
                    })
                    .sorted_by(|a, b| b.mrp.cmp(&a.mrp).then_with(|| a.name.cmp(&b.name)))
                    .dedup()
                    .collect(),
            ),
            Query::RevenueByCategory => QueryResult::CategoryTotals(sum_by_category(rows, |r| {
                r.discounted_selling_price
                    .checked_mul(Decimal::from(r.available_quantity))
                    .ok_or_else(|| out_of_range(r))
            })?),
            Query::PremiumLowDiscount {
                min_mrp,
                max_discount,
            } => QueryResult::Discounts(
                rows.iter()
                    .filter(|r| r.mrp > *min_mrp && r.discount_percent < *max_discount)
                    .map(discount_row)
                    .sorted_by(|a, b| {
                        b.mrp
                            .cmp(&a.mrp)
                            .then_with(|| b.discount_percent.cmp(&a.discount_percent))
                            .then_with(|| a.name.cmp(&b.name))
                    })
                    .dedup()
                    .collect(),
            ),
            Query::TopCategoriesByDiscount { limit } => {
                let mut groups: BTreeMap<Option<&str>, (Decimal, i64)> = BTreeMap::new();
                for row in rows {
                    let entry = groups.entry(row.category.as_deref()).or_default();
                    entry.0 = entry
                        .0
                        .checked_add(row.discount_percent)
                        .ok_or_else(|| out_of_range(row))?;
                    entry.1 += 1;
                }
                QueryResult::CategoryTotals(
                    groups
                        .into_iter()
                        .map(|(category, (sum, count))| CategoryTotal {
                            category: category.map(str::to_string),
                            value: round_2(sum / Decimal::from(count)),
                        })
                        .sorted_by(|a, b| {
                            b.value
                                .cmp(&a.value)
                                .then_with(|| nulls_last(&a.category, &b.category))
                        })
                        .take(limit_to_usize(*limit))
                        .collect(),
                )
            }
            Query::PricePerGram { min_weight } => QueryResult::PricePerGram(
                rows.iter()
                    // The weight filter also keeps zero weights out of the division.
                    .filter(|r| r.weight_in_gms >= *min_weight && r.weight_in_gms > 0)
                    .map(|r| PricePerGramRow {
                        name: r.name.clone(),
                        weight_in_gms: r.weight_in_gms,
                        discounted_selling_price: r.discounted_selling_price,
                        price_per_gram: round_2(
                            r.discounted_selling_price / Decimal::from(r.weight_in_gms),
                        ),
                    })
                    .sorted_by(|a, b| {
                        a.price_per_gram
                            .cmp(&b.price_per_gram)
                            .then_with(|| a.name.cmp(&b.name))
                            .then_with(|| a.weight_in_gms.cmp(&b.weight_in_gms))
                            .then_with(|| {
                                a.discounted_selling_price
                                    .cmp(&b.discounted_selling_price)
                            })
                    })
                    .dedup()
                    .collect(),
            ),
            Query::WeightBands => QueryResult::WeightBands(
                rows.iter()
                    .map(|r| WeightBandRow {
                        name: r.name.clone(),
                        weight_in_gms: r.weight_in_gms,
                        band: WeightBand::for_weight(r.weight_in_gms),
                    })
                    .sorted_by(|a, b| {
                        a.name
                            .cmp(&b.name)
                            .then_with(|| a.weight_in_gms.cmp(&b.weight_in_gms))
                    })
                    .dedup()
                    .collect(),
            ),
            Query::InventoryWeightByCategory => {
                QueryResult::CategoryTotals(sum_by_category(rows, |r| {
                    Ok(Decimal::from(
                        i64::from(r.weight_in_gms) * i64::from(r.available_quantity),
                    ))
                })?)
            }
        };
        Ok(result)
    }
}

/// `ROUND(x, 2)` as PostgreSQL does it for `numeric`.
pub fn round_2(value: Decimal) -> Decimal {
    value.round_dp_with_strategy(2, RoundingStrategy::MidpointAwayFromZero)
}

/// Ascending order with the NULL category last, as `NULLS LAST` orders it.
pub fn nulls_last(a: &Option<String>, b: &Option<String>) -> Ordering {
    match (a, b) {
        (Some(a), Some(b)) => a.cmp(b),
        (Some(_), None) => Ordering::Less,
        (None, Some(_)) => Ordering::Greater,
        (None, None) => Ordering::Equal,
    }
}

fn out_of_range(row: &InventoryRecord) -> anyhow::Error {
    anyhow!("numeric value out of range (sku_id {})", row.sku_id)
}

fn limit_to_usize(limit: i64) -> usize {
    usize::try_from(limit).unwrap_or(0)
}

fn by_sku(rows: impl Iterator<Item = InventoryRecord>) -> Vec<InventoryRecord> {
    rows.sorted_by_key(|r| r.sku_id).collect()
}

fn discount_row(record: &InventoryRecord) -> DiscountRow {
    DiscountRow {
        name: record.name.clone(),
        mrp: record.mrp,
        discount_percent: record.discount_percent,
    }
}

/// `SUM(expr) ... GROUP BY category ORDER BY total, category NULLS LAST`.
fn sum_by_category(
    rows: &[InventoryRecord],
    value: impl Fn(&InventoryRecord) -> Result<Decimal>,
) -> Result<Vec<CategoryTotal>> {
    let mut groups: BTreeMap<Option<&str>, Decimal> = BTreeMap::new();
    for row in rows {
        let addend = value(row)?;
        let total = groups.entry(row.category.as_deref()).or_default();
        *total = total.checked_add(addend).ok_or_else(|| out_of_range(row))?;
    }
    Ok(groups
        .into_iter()
        .map(|(category, value)| CategoryTotal {
            category: category.map(str::to_string),
            value,
        })
        .sorted_by(|a, b| {
            a.value
                .cmp(&b.value)
                .then_with(|| nulls_last(&a.category, &b.category))
        })
        .collect())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::str::FromStr;

    fn dec(s: &str) -> Decimal {
        Decimal::from_str(s).unwrap()
    }

    fn record(
        sku_id: i32,
        category: Option<&str>,
        name: &str,
        mrp: &str,
        discount: &str,
        price: &str,
        quantity: i32,
        weight: i32,
        out_of_stock: bool,
    ) -> InventoryRecord {
        InventoryRecord {
            sku_id,
            category: category.map(str::to_string),
            name: name.to_string(),
            mrp: dec(mrp),
            discount_percent: dec(discount),
            available_quantity: quantity,
            discounted_selling_price: dec(price),
            weight_in_gms: weight,
            out_of_stock,
            quantity: 1,
        }
    }

    fn rows() -> Vec<InventoryRecord> {
        vec![
            record(1, Some("Munchies"), "Chips", "20", "0", "20", 10, 52, false),
            record(2, Some("Munchies"), "Bhujia", "110", "18", "90", 3, 400, false),
            record(3, Some("Beverages"), "Tea", "560", "30", "392", 0, 1000, true),
            record(4, Some("Beverages"), "Cola", "40", "5", "38", 8, 750, false),
            record(5, None, "Jaggery", "9", "0", "9", 5, 1000, false),
            record(6, Some("Munchies"), "Chips", "20", "0", "20", 4, 52, false),
            record(7, Some("Beverages"), "Energy Drink", "600", "5", "570", 0, 250, true),
        ]
    }

    #[test]
    fn test_exploration_queries() {
        let rows = rows();
        assert_eq!(Query::RowCount.evaluate(&rows).unwrap(), QueryResult::Count(7));
        assert_eq!(
            Query::DistinctCategories.evaluate(&rows).unwrap(),
            QueryResult::Categories(vec!["Beverages".to_string(), "Munchies".to_string()])
        );
        assert_eq!(
            Query::StockStatus.evaluate(&rows).unwrap(),
            QueryResult::StockCounts(vec![
                StockCount { out_of_stock: false, count: 5 },
                StockCount { out_of_stock: true, count: 2 },
            ])
        );
        assert_eq!(
            Query::DuplicateNames.evaluate(&rows).unwrap(),
            QueryResult::NameCounts(vec![NameCount {
                name: "Chips".to_string(),
                sku_count: 2
            }])
        );
        match Query::NullCategory.evaluate(&rows).unwrap() {
            QueryResult::Records(found) => {
                assert_eq!(found.len(), 1);
                assert_eq!(found[0].sku_id, 5);
            }
            other => panic!("unexpected result: {:?}", other),
        }
        match (Query::Sample { limit: 3 }).evaluate(&rows).unwrap() {
            QueryResult::Records(found) => {
                assert_eq!(found.iter().map(|r| r.sku_id).collect::<Vec<_>>(), vec![1, 2, 3]);
            }
            other => panic!("unexpected result: {:?}", other),
        }
    }

    #[test]
    fn test_top_discounts_are_distinct_and_ordered() {
        let result = Query::TopDiscounts { limit: 3 }.evaluate(&rows()).unwrap();
        let QueryResult::Discounts(found) = result else {
            panic!("expected discounts");
        };
        let names: Vec<_> = found.iter().map(|r| r.name.as_str()).collect();
        assert_eq!(names, vec!["Tea", "Bhujia", "Cola"]);

        // The two "Chips" rows collapse into one line.
        let QueryResult::Discounts(all) = (Query::TopDiscounts { limit: 100 }).evaluate(&rows()).unwrap()
        else {
            panic!("expected discounts");
        };
        assert_eq!(all.iter().filter(|r| r.name == "Chips").count(), 1);
        assert_eq!(all.len(), 6);
    }

    #[test]
    fn test_out_of_stock_high_mrp() {
        let result = Query::OutOfStockHighMrp {
            min_mrp: Decimal::from(300),
        }
        .evaluate(&rows()).unwrap();
        assert_eq!(
            result,
            QueryResult::Prices(vec![
                PriceRow { name: "Energy Drink".to_string(), mrp: dec("600") },
                PriceRow { name: "Tea".to_string(), mrp: dec("560") },
            ])
        );
    }

    #[test]
    fn test_revenue_by_category_keeps_null_group() {
        let QueryResult::CategoryTotals(totals) = Query::RevenueByCategory.evaluate(&rows()).unwrap() else {
            panic!("expected totals");
        };
        // Munchies: 20*10 + 90*3 + 20*4 = 550, Beverages: 38*8 = 304, NULL: 9*5 = 45
        assert_eq!(
            totals,
            vec![
                CategoryTotal { category: None, value: dec("45") },
                CategoryTotal { category: Some("Beverages".to_string()), value: dec("304") },
                CategoryTotal { category: Some("Munchies".to_string()), value: dec("550") },
            ]
        );
    }

    #[test]
    fn test_average_discount_rounds_half_away_from_zero() {
        let QueryResult::CategoryTotals(totals) =
            (Query::TopCategoriesByDiscount { limit: 2 }).evaluate(&rows()).unwrap()
        else {
            panic!("expected totals");
        };
        // Beverages: (30 + 5 + 5) / 3 = 13.333.., Munchies: 18 / 3 = 6
        assert_eq!(totals.len(), 2);
        assert_eq!(totals[0].category.as_deref(), Some("Beverages"));
        assert_eq!(totals[0].value, dec("13.33"));
        assert_eq!(totals[1].value, dec("6.00"));
        assert_eq!(round_2(dec("0.125")), dec("0.13"));
        assert_eq!(round_2(dec("-0.125")), dec("-0.13"));
    }

    #[test]
    fn test_premium_low_discount() {
        let result = Query::PremiumLowDiscount {
            min_mrp: Decimal::from(500),
            max_discount: Decimal::from(10),
        }
        .evaluate(&rows()).unwrap();
        assert_eq!(
            result,
            QueryResult::Discounts(vec![DiscountRow {
                name: "Energy Drink".to_string(),
                mrp: dec("600"),
                discount_percent: dec("5"),
            }])
        );
    }

    #[test]
    fn test_price_per_gram_filters_light_products() {
        let QueryResult::PricePerGram(found) =
            (Query::PricePerGram { min_weight: 100 }).evaluate(&rows()).unwrap()
        else {
            panic!("expected price per gram");
        };
        assert!(found.iter().all(|r| r.weight_in_gms >= 100));
        assert!(found.iter().all(|r| r.name != "Chips"));
        assert_eq!(found[0].name, "Jaggery");
        assert_eq!(found[0].price_per_gram, dec("0.01"));
        assert!(found
            .windows(2)
            .all(|pair| pair[0].price_per_gram <= pair[1].price_per_gram));
    }

    #[test]
    fn test_weight_bands_and_total_weight() {
        let QueryResult::WeightBands(bands) = Query::WeightBands.evaluate(&rows()).unwrap() else {
            panic!("expected weight bands");
        };
        assert_eq!(bands.len(), 6);
        let tea = bands.iter().find(|r| r.name == "Tea").unwrap();
        assert_eq!(tea.band, WeightBand::Medium);

        let QueryResult::CategoryTotals(totals) =
            Query::InventoryWeightByCategory.evaluate(&rows()).unwrap()
        else {
            panic!("expected totals");
        };
        let munchies = totals
            .iter()
            .find(|t| t.category.as_deref() == Some("Munchies"))
            .unwrap();
        assert_eq!(munchies.value, Decimal::from(52 * 10 + 400 * 3 + 52 * 4));
    }

    #[test]
    fn test_aggregate_overflow_is_an_error() {
        let huge = "40000000000000000000";
        let rows = vec![
            record(1, Some("Bulk"), "Pallet", huge, "0", huge, i32::MAX, 1000, false),
            record(2, Some("Bulk"), "Pallet", huge, "0", huge, i32::MAX, 1000, false),
        ];
        let err = Query::RevenueByCategory.evaluate(&rows).unwrap_err();
        assert!(err.to_string().contains("out of range"));

        let max = Decimal::MAX.to_string();
        let rows = vec![
            record(1, Some("Bulk"), "Pallet", "1", &max, "1", 1, 1000, false),
            record(2, Some("Bulk"), "Crate", "1", &max, "1", 1, 1000, false),
        ];
        assert!((Query::TopCategoriesByDiscount { limit: 5 }).evaluate(&rows).is_err());
        assert!(Query::InventoryWeightByCategory.evaluate(&rows).is_ok());
    }

    #[test]
    fn test_empty_table() {
        for query in Query::exploration(5).into_iter().chain(Query::business()) {
            let result = query.evaluate(&[]).unwrap();
            match query {
                Query::RowCount => assert_eq!(result, QueryResult::Count(0)),
                _ => assert!(result.is_empty(), "{} should be empty", query.title()),
            }
        }
    }
}
