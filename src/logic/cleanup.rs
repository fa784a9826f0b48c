use anyhow::{Context, Result};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::logic::Query;
use crate::model::{InventoryRecord, QueryResult};
use crate::store::traits::Store;

pub const DEFAULT_PAISE_THRESHOLD: i64 = 1000;

/// The mutating statements applied to the loaded snapshot.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "step", rename_all = "snake_case")]
pub enum CleanupStep {
    /// `DELETE ... WHERE mrp = 0`
    DeleteZeroMrp,
    /// `DELETE ... WHERE discounted_selling_price = 0`
    DeleteZeroSellingPrice,
    /// Divide both price columns by 100 where `mrp` exceeds the threshold.
    /// Prices above it are taken to be in paise.
    ConvertPaiseToRupees { threshold: Decimal },
}

impl CleanupStep {
    /// The three statements in the order they run.
    pub fn standard(paise_threshold: Decimal) -> Vec<CleanupStep> {
        vec![
            CleanupStep::DeleteZeroMrp,
            CleanupStep::DeleteZeroSellingPrice,
            CleanupStep::ConvertPaiseToRupees {
                threshold: paise_threshold,
            },
        ]
    }

    pub fn describe(&self) -> String {
        match self {
            CleanupStep::DeleteZeroMrp => "Delete rows with zero MRP".to_string(),
            CleanupStep::DeleteZeroSellingPrice => {
                "Delete rows with zero selling price".to_string()
            }
            CleanupStep::ConvertPaiseToRupees { threshold } => {
                format!("Convert prices from paise to rupees where MRP > {}", threshold)
            }
        }
    }

    /// Apply the statement to rows held in memory, returning the number of
    /// rows deleted or updated.
    pub fn apply(&self, rows: &mut Vec<InventoryRecord>) -> u64 {
        match self {
            CleanupStep::DeleteZeroMrp => delete_where(rows, |r| r.mrp.is_zero()),
            CleanupStep::DeleteZeroSellingPrice => {
                delete_where(rows, |r| r.discounted_selling_price.is_zero())
            }
            CleanupStep::ConvertPaiseToRupees { threshold } => {
                let mut updated = 0;
                for row in rows.iter_mut().filter(|r| r.mrp > *threshold) {
                    row.mrp /= Decimal::ONE_HUNDRED;
                    row.discounted_selling_price /= Decimal::ONE_HUNDRED;
                    updated += 1;
                }
                updated
            }
        }
    }
}

fn delete_where(
    rows: &mut Vec<InventoryRecord>,
    predicate: impl Fn(&InventoryRecord) -> bool,
) -> u64 {
    let before = rows.len();
    rows.retain(|r| !predicate(r));
    (before - rows.len()) as u64
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CleanupOutcome {
    pub step: CleanupStep,
    pub rows_affected: u64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CleanupReport {
    pub rows_before: i64,
    pub rows_after: i64,
    pub steps: Vec<CleanupOutcome>,
}

/// Run `steps` in order against the store.
pub async fn run_cleanup<S: Store + ?Sized>(
    store: &S,
    steps: &[CleanupStep],
) -> Result<CleanupReport> {
    let rows_before = row_count(store).await?;
    let mut outcomes = Vec::with_capacity(steps.len());

    for step in steps {
        let rows_affected = store
            .apply_cleanup(step)
            .await
            .with_context(|| format!("Failed to run cleanup step: {}", step.describe()))?;
        log::info!("{}: {} rows", step.describe(), rows_affected);
        outcomes.push(CleanupOutcome {
            step: step.clone(),
            rows_affected,
        });
    }

    let rows_after = row_count(store).await?;
    Ok(CleanupReport {
        rows_before,
        rows_after,
        steps: outcomes,
    })
}

async fn row_count<S: Store + ?Sized>(store: &S) -> Result<i64> {
    match store.run_query(&Query::RowCount).await? {
        QueryResult::Count(count) => Ok(count),
        other => Err(anyhow::anyhow!("Row count returned {:?}", other)),
    }
}
