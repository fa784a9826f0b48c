//! Text and JSON rendering of query results.

use itertools::Itertools;
use std::fmt::Write;

use crate::config::OutputFormat;
use crate::logic::{PipelineReport, QueryOutcome};
use crate::model::QueryResult;

const NULL: &str = "NULL";

/// Column headers and cell text for a result.
fn to_cells(result: &QueryResult) -> (Vec<&'static str>, Vec<Vec<String>>) {
    match result {
        QueryResult::Count(count) => (vec!["count"], vec![vec![count.to_string()]]),
        QueryResult::Records(rows) => (
            vec![
                "sku_id",
                "category",
                "name",
                "mrp",
                "discount_percent",
                "available_quantity",
                "discounted_selling_price",
                "weight_in_gms",
                "out_of_stock",
                "quantity",
            ],
            rows.iter()
                .map(|r| {
                    vec![
                        r.sku_id.to_string(),
                        r.category.clone().unwrap_or_else(|| NULL.to_string()),
                        r.name.clone(),
                        r.mrp.normalize().to_string(),
                        r.discount_percent.normalize().to_string(),
                        r.available_quantity.to_string(),
                        r.discounted_selling_price.normalize().to_string(),
                        r.weight_in_gms.to_string(),
                        r.out_of_stock.to_string(),
                        r.quantity.to_string(),
                    ]
                })
                .collect(),
        ),
        QueryResult::Categories(rows) => (
            vec!["category"],
            rows.iter().map(|c| vec![c.clone()]).collect(),
        ),
        QueryResult::StockCounts(rows) => (
            vec!["out_of_stock", "count"],
            rows.iter()
                .map(|r| vec![r.out_of_stock.to_string(), r.count.to_string()])
                .collect(),
        ),
        QueryResult::NameCounts(rows) => (
            vec!["name", "sku_count"],
            rows.iter()
                .map(|r| vec![r.name.clone(), r.sku_count.to_string()])
                .collect(),
        ),
        QueryResult::Discounts(rows) => (
            vec!["name", "mrp", "discount_percent"],
            rows.iter()
                .map(|r| {
                    vec![
                        r.name.clone(),
                        r.mrp.normalize().to_string(),
                        r.discount_percent.normalize().to_string(),
                    ]
                })
                .collect(),
        ),
        QueryResult::Prices(rows) => (
            vec!["name", "mrp"],
            rows.iter()
                .map(|r| vec![r.name.clone(), r.mrp.normalize().to_string()])
                .collect(),
        ),
        QueryResult::CategoryTotals(rows) => (
            vec!["category", "value"],
            rows.iter()
                .map(|r| {
                    vec![
                        r.category.clone().unwrap_or_else(|| NULL.to_string()),
                        r.value.normalize().to_string(),
                    ]
                })
                .collect(),
        ),
        QueryResult::PricePerGram(rows) => (
            vec!["name", "weight_in_gms", "discounted_selling_price", "price_per_gram"],
            rows.iter()
                .map(|r| {
                    vec![
                        r.name.clone(),
                        r.weight_in_gms.to_string(),
                        r.discounted_selling_price.normalize().to_string(),
                        r.price_per_gram.normalize().to_string(),
                    ]
                })
                .collect(),
        ),
        QueryResult::WeightBands(rows) => (
            vec!["name", "weight_in_gms", "band"],
            rows.iter()
                .map(|r| vec![r.name.clone(), r.weight_in_gms.to_string(), r.band.to_string()])
                .collect(),
        ),
    }
}

fn format_line(cells: &[&str], widths: &[usize]) -> String {
    cells
        .iter()
        .zip(widths)
        .map(|(cell, width)| format!("{:<width$}", cell, width = *width))
        .join(" | ")
        .trim_end()
        .to_string()
}

/// Render a result as an aligned text table.
pub fn render_table(result: &QueryResult) -> String {
    let (headers, rows) = to_cells(result);
    let widths: Vec<usize> = headers
        .iter()
        .enumerate()
        .map(|(i, header)| {
            rows.iter()
                .map(|row| row[i].chars().count())
                .chain(std::iter::once(header.len()))
                .max()
                .unwrap_or(0)
        })
        .collect();

    let mut out = String::new();
    out.push_str(&format_line(&headers, &widths));
    out.push('\n');
    out.push_str(&widths.iter().map(|w| "-".repeat(*w)).join("-+-"));
    out.push('\n');
    for row in &rows {
        let cells: Vec<&str> = row.iter().map(String::as_str).collect();
        out.push_str(&format_line(&cells, &widths));
        out.push('\n');
    }
    let _ = write!(out, "({} rows)", rows.len());
    out
}

fn render_outcomes(out: &mut String, heading: &str, outcomes: &[QueryOutcome]) {
    let _ = writeln!(out, "== {} ==\n", heading);
    for outcome in outcomes {
        let _ = writeln!(out, "-- {}\n{}\n", outcome.title, render_table(&outcome.result));
    }
}

/// Render a whole pipeline run.
pub fn render_report(report: &PipelineReport, format: OutputFormat) -> anyhow::Result<String> {
    match format {
        OutputFormat::Json => Ok(serde_json::to_string_pretty(report)?),
        OutputFormat::Table => {
            let mut out = String::new();
            let _ = writeln!(
                out,
                "Imported {} of {} rows ({:?}, {} batches)\n",
                report.import.rows_inserted,
                report.import.rows_read,
                report.import.mode,
                report.import.batches
            );
            render_outcomes(&mut out, "Exploration", &report.exploration);

            let _ = writeln!(out, "== Cleaning ==\n");
            for outcome in &report.cleanup.steps {
                let _ = writeln!(out, "{}: {} rows", outcome.step.describe(), outcome.rows_affected);
            }
            let _ = writeln!(
                out,
                "Rows before: {}, after: {}\n",
                report.cleanup.rows_before, report.cleanup.rows_after
            );

            render_outcomes(&mut out, "Business questions", &report.business);
            Ok(out)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{CategoryTotal, DiscountRow, PriceRow, StockCount};
    use rust_decimal::Decimal;

    #[test]
    fn test_table_alignment() {
        let result = QueryResult::StockCounts(vec![
            StockCount { out_of_stock: false, count: 19 },
            StockCount { out_of_stock: true, count: 9 },
        ]);
        let table = render_table(&result);
        let lines: Vec<&str> = table.lines().collect();
        assert_eq!(lines[0], "out_of_stock | count");
        assert_eq!(lines[1], "-------------+------");
        assert_eq!(lines[2], "false        | 19");
        assert_eq!(lines[3], "true         | 9");
        assert_eq!(lines[4], "(2 rows)");
    }

    #[test]
    fn test_null_category_is_shown() {
        let result = QueryResult::CategoryTotals(vec![CategoryTotal {
            category: None,
            value: Decimal::new(4500, 2),
        }]);
        let table = render_table(&result);
        assert!(table.contains("NULL"));
        assert!(table.contains("45"));
    }

    #[test]
    fn test_prices_print_without_trailing_zeros() {
        let price: Decimal = "25.9900000000000000".parse().unwrap();
        let result = QueryResult::Prices(vec![PriceRow {
            name: "Tea".to_string(),
            mrp: price,
        }]);
        let table = render_table(&result);
        assert!(table.contains("Tea  | 25.99"));
        assert!(!table.contains("25.990"));

        let result = QueryResult::Discounts(vec![DiscountRow {
            name: "Tea".to_string(),
            mrp: price,
            discount_percent: "30.00".parse().unwrap(),
        }]);
        let table = render_table(&result);
        assert!(table.contains("| 25.99 | 30"));
    }
}
