//! Bulk load of the snapshot CSV.

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Deserializer, Serialize};
use std::io::Read;
use std::path::Path;
use std::str::FromStr;

use itertools::Itertools;

use crate::model::NewInventoryRecord;
use crate::store::traits::Store;

pub const DEFAULT_BATCH_SIZE: usize = 500;

/// How rows get into the table.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ImportMode {
    /// Parse the file here and insert in multi-row batches.
    #[default]
    Insert,
    /// Hand the file to the database's own bulk loader.
    Copy,
}

/// Header of the export, in the column order `COPY` loads by position.
pub const EXPORT_HEADER: [&str; 9] = [
    "Category",
    "name",
    "mrp",
    "discountPercent",
    "availableQuantity",
    "discountedSellingPrice",
    "weightInGms",
    "outOfStock",
    "quantity",
];

#[derive(Debug, thiserror::Error)]
pub enum ImportError {
    #[error("failed to read snapshot: {0}")]
    Io(#[from] std::io::Error),
    #[error("snapshot is not valid UTF-8 (line {})", line_label(.line))]
    Encoding { line: Option<u64> },
    #[error("line {}: {}", line_label(.line), .message)]
    Malformed { line: Option<u64>, message: String },
    #[error("line {}: product name is required", line_label(.line))]
    MissingName { line: Option<u64> },
    #[error(
        "bulk copy needs the columns in export order ({}), found: {}",
        EXPORT_HEADER.join(","),
        .found
    )]
    ColumnOrder { found: String },
}

fn line_label(line: &Option<u64>) -> String {
    match line {
        Some(line) => line.to_string(),
        None => "unknown".to_string(),
    }
}

impl From<csv::Error> for ImportError {
    fn from(err: csv::Error) -> Self {
        let line = err.position().map(|p| p.line());
        match err.into_kind() {
            csv::ErrorKind::Io(io) => ImportError::Io(io),
            csv::ErrorKind::Utf8 { .. } => ImportError::Encoding { line },
            csv::ErrorKind::Deserialize { err, .. } => ImportError::Malformed {
                line,
                message: err.to_string(),
            },
            other => ImportError::Malformed {
                line,
                message: format!("{:?}", other),
            },
        }
    }
}

/// A row of the export, keyed by the export's header names.
#[derive(Debug, Deserialize)]
struct CsvRow {
    #[serde(rename = "Category", default)]
    category: Option<String>,
    #[serde(default)]
    name: String,
    #[serde(deserialize_with = "deserialize_decimal")]
    mrp: Decimal,
    #[serde(rename = "discountPercent", deserialize_with = "deserialize_decimal")]
    discount_percent: Decimal,
    #[serde(rename = "availableQuantity")]
    available_quantity: i32,
    #[serde(rename = "discountedSellingPrice", deserialize_with = "deserialize_decimal")]
    discounted_selling_price: Decimal,
    #[serde(rename = "weightInGms")]
    weight_in_gms: i32,
    #[serde(rename = "outOfStock", deserialize_with = "deserialize_flag")]
    out_of_stock: bool,
    quantity: i32,
}

fn deserialize_decimal<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Decimal, D::Error> {
    let raw = String::deserialize(deserializer)?;
    Decimal::from_str(raw.trim())
        .map_err(|e| serde::de::Error::custom(format!("invalid number {:?}: {}", raw, e)))
}

/// Full and one-letter boolean spellings PostgreSQL accepts. Its longer
/// prefixes (`tr`, `fals`, ...) are rejected.
fn deserialize_flag<'de, D: Deserializer<'de>>(deserializer: D) -> Result<bool, D::Error> {
    let raw = String::deserialize(deserializer)?;
    match raw.trim().to_ascii_lowercase().as_str() {
        "true" | "t" | "yes" | "y" | "on" | "1" => Ok(true),
        "false" | "f" | "no" | "n" | "off" | "0" => Ok(false),
        other => Err(serde::de::Error::custom(format!("invalid boolean {:?}", other))),
    }
}

impl CsvRow {
    fn into_new_record(self, line: Option<u64>) -> Result<NewInventoryRecord, ImportError> {
        let name = self.name.trim().to_string();
        if name.is_empty() {
            return Err(ImportError::MissingName { line });
        }
        let category = self
            .category
            .map(|c| c.trim().to_string())
            .filter(|c| !c.is_empty());

        Ok(NewInventoryRecord {
            category,
            name,
            mrp: self.mrp,
            discount_percent: self.discount_percent,
            available_quantity: self.available_quantity,
            discounted_selling_price: self.discounted_selling_price,
            weight_in_gms: self.weight_in_gms,
            out_of_stock: self.out_of_stock,
            quantity: self.quantity,
        })
    }
}

/// Parse a whole snapshot. The first bad row aborts the load.
pub fn read_records<R: Read>(reader: R) -> Result<Vec<NewInventoryRecord>, ImportError> {
    let mut csv_reader = csv::ReaderBuilder::new()
        .has_headers(true)
        .trim(csv::Trim::All)
        .from_reader(reader);
    let headers = csv_reader.headers()?.clone();

    let mut records = Vec::new();
    let mut raw = csv::StringRecord::new();
    while csv_reader.read_record(&mut raw)? {
        let line = raw.position().map(|p| p.line());
        let row: CsvRow = raw.deserialize(Some(&headers)).map_err(|err| ImportError::Malformed {
            line,
            message: err.to_string(),
        })?;
        records.push(row.into_new_record(line)?);
    }

    Ok(records)
}

/// Check that the header lists the columns in [`EXPORT_HEADER`] order.
/// `COPY` maps columns by position, so any other order would load values
/// into the wrong columns.
pub fn check_copy_header(csv: &[u8]) -> Result<(), ImportError> {
    let mut csv_reader = csv::ReaderBuilder::new()
        .has_headers(true)
        .trim(csv::Trim::All)
        .from_reader(csv);
    let headers = csv_reader.headers()?;
    if headers.iter().eq(EXPORT_HEADER.iter().copied()) {
        Ok(())
    } else {
        Err(ImportError::ColumnOrder {
            found: headers.iter().join(","),
        })
    }
}

pub fn read_file(path: impl AsRef<Path>) -> Result<Vec<NewInventoryRecord>, ImportError> {
    let file = std::fs::File::open(path.as_ref())?;
    read_records(std::io::BufReader::new(file))
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ImportSummary {
    pub mode: ImportMode,
    pub rows_read: u64,
    pub rows_inserted: u64,
    pub batches: u64,
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
}

/// Insert parsed rows in batches of `batch_size`. A failing batch rolls
/// back the whole load.
pub async fn import_records<S: Store + ?Sized>(
    store: &S,
    records: &[NewInventoryRecord],
    batch_size: usize,
) -> Result<ImportSummary> {
    let started_at = Utc::now();
    let batch_size = batch_size.max(1);
    let batches = records.chunks(batch_size).len() as u64;

    let rows_inserted = store
        .insert_records(records, batch_size)
        .await
        .context("Failed to insert inventory snapshot")?;

    log::info!("Imported {} rows in {} batches", rows_inserted, batches);
    Ok(ImportSummary {
        mode: ImportMode::Insert,
        rows_read: records.len() as u64,
        rows_inserted,
        batches,
        started_at,
        finished_at: Utc::now(),
    })
}

/// Load raw CSV bytes with the given mode.
pub async fn import_csv<S: Store + ?Sized>(
    store: &S,
    csv: &[u8],
    mode: ImportMode,
    batch_size: usize,
) -> Result<ImportSummary> {
    match mode {
        ImportMode::Insert => {
            let records = read_records(csv).context("Failed to parse inventory snapshot")?;
            import_records(store, &records, batch_size).await
        }
        ImportMode::Copy => {
            let started_at = Utc::now();
            check_copy_header(csv).context("Failed to bulk-copy inventory snapshot")?;
            let rows = store
                .copy_csv(csv)
                .await
                .context("Failed to bulk-copy inventory snapshot")?;
            log::info!("Copied {} rows", rows);
            Ok(ImportSummary {
                mode,
                rows_read: rows,
                rows_inserted: rows,
                batches: 1,
                started_at,
                finished_at: Utc::now(),
            })
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    const HEADER: &str = "Category,name,mrp,discountPercent,availableQuantity,discountedSellingPrice,weightInGms,outOfStock,quantity";

    #[test]
    fn test_read_records_parses_export_format() {
        let csv = format!(
            "{}\nFruits & Vegetables,Onion,2500,10,3,2250,1000,FALSE,1\n,Loose Jaggery,900,0,5,900,1000,TRUE,1000\n",
            HEADER
        );
        let records = read_records(csv.as_bytes()).unwrap();
        assert_eq!(records.len(), 2);
        assert_eq!(records[0].category.as_deref(), Some("Fruits & Vegetables"));
        assert_eq!(records[0].mrp, Decimal::from(2500));
        assert!(!records[0].out_of_stock);
        assert_eq!(records[1].category, None);
        assert!(records[1].out_of_stock);
        assert_eq!(records[1].quantity, 1000);
    }

    #[test]
    fn test_columns_matched_by_header_and_bom_tolerated() {
        let csv = "\u{feff}name,Category,quantity,mrp,discountPercent,discountedSellingPrice,availableQuantity,weightInGms,outOfStock\nTea,Beverages,1,56000,30.5,39200,0,1000,t\n";
        let records = read_records(csv.as_bytes()).unwrap();
        assert_eq!(records[0].name, "Tea");
        assert_eq!(records[0].discount_percent, Decimal::from_str("30.5").unwrap());
        assert!(records[0].out_of_stock);
    }

    #[test]
    fn test_invalid_utf8_is_an_encoding_error() {
        let mut bytes = format!("{}\nMunchies,", HEADER).into_bytes();
        bytes.extend_from_slice(&[0xff, 0xfe]);
        bytes.extend_from_slice(b",2000,0,10,2000,52,FALSE,1\n");

        assert!(matches!(
            read_records(bytes.as_slice()),
            Err(ImportError::Encoding { .. })
        ));
    }

    #[test]
    fn test_malformed_row_reports_line() {
        let csv = format!(
            "{}\nMunchies,Chips,2000,0,10,2000,52,FALSE,1\nMunchies,Bhujia,abc,0,10,2000,52,FALSE,1\n",
            HEADER
        );
        match read_records(csv.as_bytes()) {
            Err(ImportError::Malformed { line, message }) => {
                assert_eq!(line, Some(3));
                assert!(message.contains("abc"));
            }
            other => panic!("expected malformed row, got {:?}", other),
        }

        let bad_flag = format!("{}\nMunchies,Chips,2000,0,10,2000,52,maybe,1\n", HEADER);
        assert!(matches!(
            read_records(bad_flag.as_bytes()),
            Err(ImportError::Malformed { .. })
        ));
    }

    #[test]
    fn test_missing_name() {
        let csv = format!("{}\nMunchies,  ,2000,0,10,2000,52,FALSE,1\n", HEADER);
        assert!(matches!(
            read_records(csv.as_bytes()),
            Err(ImportError::MissingName { line: Some(2) })
        ));
    }

    #[test]
    fn test_read_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "{}", HEADER).unwrap();
        writeln!(file, "Beverages,Coca-Cola,4000,5,8,3800,750,FALSE,1").unwrap();
        file.flush().unwrap();

        let records = read_file(file.path()).unwrap();
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].name, "Coca-Cola");

        assert!(matches!(
            read_file("/definitely/not/here.csv"),
            Err(ImportError::Io(_))
        ));
    }

    #[test]
    fn test_on_off_flags() {
        let csv = format!(
            "{}\nMunchies,Chips,2000,0,10,2000,52,on,1\nMunchies,Bhujia,2000,0,10,2000,52,OFF,1\n",
            HEADER
        );
        let records = read_records(csv.as_bytes()).unwrap();
        assert!(records[0].out_of_stock);
        assert!(!records[1].out_of_stock);
    }

    #[test]
    fn test_error_messages_show_plain_line_numbers() {
        let csv = format!("{}\nMunchies,  ,2000,0,10,2000,52,FALSE,1\n", HEADER);
        let err = read_records(csv.as_bytes()).unwrap_err();
        assert_eq!(err.to_string(), "line 2: product name is required");

        let err = ImportError::Encoding { line: None };
        assert_eq!(err.to_string(), "snapshot is not valid UTF-8 (line unknown)");
    }

    #[test]
    fn test_copy_header_must_follow_export_order() {
        let csv = format!("\u{feff}{}\nMunchies,Chips,2000,0,10,2000,52,FALSE,1\n", HEADER);
        assert!(check_copy_header(csv.as_bytes()).is_ok());

        let swapped = "name,Category,mrp,discountPercent,availableQuantity,discountedSellingPrice,weightInGms,outOfStock,quantity\n";
        match check_copy_header(swapped.as_bytes()) {
            Err(ImportError::ColumnOrder { found }) => assert!(found.starts_with("name,Category")),
            other => panic!("expected column order error, got {:?}", other),
        }

        let missing = "Category,name,mrp\n";
        assert!(matches!(
            check_copy_header(missing.as_bytes()),
            Err(ImportError::ColumnOrder { .. })
        ));
    }
}
