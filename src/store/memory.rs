use anyhow::{anyhow, Context, Result};
use parking_lot::RwLock;

use crate::logic::import::{check_copy_header, read_records};
use crate::logic::{CleanupStep, Query};
use crate::model::{InventoryRecord, NewInventoryRecord, QueryResult, SkuId};
use crate::store::sql::{CATEGORY_MAX_CHARS, NAME_MAX_CHARS, TABLE};
use crate::store::traits::{CleanupStore, QueryStore, RecordStore, SchemaStore, Store};

#[derive(Debug)]
struct Table {
    rows: Vec<InventoryRecord>,
    /// Next value of the `sku_id` sequence. Deletes never rewind it.
    next_sku_id: SkuId,
}

impl Table {
    fn new() -> Self {
        Self {
            rows: Vec::new(),
            next_sku_id: 1,
        }
    }
}

/// In-process stand-in for the database table.
///
/// Statements behave as they do against PostgreSQL: the table has to be
/// created before use, `sku_id` comes from a sequence, inserts are all or
/// nothing, `name` may not be empty and text columns keep their `VARCHAR`
/// lengths.
#[derive(Debug, Default)]
pub struct MemoryStore {
    table: RwLock<Option<Table>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

fn missing_table() -> anyhow::Error {
    anyhow!("relation \"{}\" does not exist", TABLE)
}

fn check_constraints(record: &NewInventoryRecord) -> Result<()> {
    if record.name.trim().is_empty() {
        return Err(anyhow!(
            "null value in column \"name\" of relation \"{}\" violates not-null constraint",
            TABLE
        ));
    }
    if record.name.chars().count() > NAME_MAX_CHARS {
        return Err(anyhow!(
            "value too long for type character varying({})",
            NAME_MAX_CHARS
        ));
    }
    if let Some(category) = &record.category {
        if category.chars().count() > CATEGORY_MAX_CHARS {
            return Err(anyhow!(
                "value too long for type character varying({})",
                CATEGORY_MAX_CHARS
            ));
        }
    }
    Ok(())
}

#[async_trait::async_trait]
impl SchemaStore for MemoryStore {
    async fn create_table(&self) -> Result<()> {
        let mut table = self.table.write();
        if table.is_some() {
            return Err(anyhow!("relation \"{}\" already exists", TABLE));
        }
        *table = Some(Table::new());
        Ok(())
    }

    async fn drop_table(&self) -> Result<bool> {
        Ok(self.table.write().take().is_some())
    }

    async fn table_exists(&self) -> Result<bool> {
        Ok(self.table.read().is_some())
    }
}

#[async_trait::async_trait]
impl RecordStore for MemoryStore {
    async fn insert_records(
        &self,
        records: &[NewInventoryRecord],
        batch_size: usize,
    ) -> Result<u64> {
        let mut guard = self.table.write();
        let table = guard.as_mut().ok_or_else(missing_table)?;

        for (index, chunk) in records.chunks(batch_size.max(1)).enumerate() {
            for record in chunk {
                check_constraints(record)
                    .with_context(|| format!("Failed to insert batch {}", index + 1))?;
            }
        }

        for record in records {
            let sku_id = table.next_sku_id;
            table.next_sku_id += 1;
            table.rows.push(record.clone().into_record(sku_id));
        }
        Ok(records.len() as u64)
    }

    async fn copy_csv(&self, csv: &[u8]) -> Result<u64> {
        if !self.table_exists().await? {
            return Err(missing_table());
        }
        check_copy_header(csv)?;
        let records = read_records(csv)?;
        self.insert_records(&records, records.len()).await
    }

    async fn list_records(&self) -> Result<Vec<InventoryRecord>> {
        let guard = self.table.read();
        let table = guard.as_ref().ok_or_else(missing_table)?;
        Ok(table.rows.clone())
    }
}

#[async_trait::async_trait]
impl CleanupStore for MemoryStore {
    async fn apply_cleanup(&self, step: &CleanupStep) -> Result<u64> {
        let mut guard = self.table.write();
        let table = guard.as_mut().ok_or_else(missing_table)?;
        Ok(step.apply(&mut table.rows))
    }
}

#[async_trait::async_trait]
impl QueryStore for MemoryStore {
    async fn run_query(&self, query: &Query) -> Result<QueryResult> {
        let guard = self.table.read();
        let table = guard.as_ref().ok_or_else(missing_table)?;
        query.evaluate(&table.rows)
    }
}

impl Store for MemoryStore {}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal::Decimal;

    fn new_record(name: &str, mrp: i64) -> NewInventoryRecord {
        NewInventoryRecord {
            category: Some("Beverages".to_string()),
            name: name.to_string(),
            mrp: Decimal::from(mrp),
            discount_percent: Decimal::ZERO,
            available_quantity: 1,
            discounted_selling_price: Decimal::from(mrp),
            weight_in_gms: 250,
            out_of_stock: false,
            quantity: 1,
        }
    }

    #[tokio::test]
    async fn test_statements_need_a_table() {
        let store = MemoryStore::new();
        let err = store.insert_records(&[new_record("Cola", 40)], 1).await.unwrap_err();
        assert!(err.to_string().contains("does not exist"));
        assert!(store.run_query(&Query::RowCount).await.is_err());
        assert!(store.apply_cleanup(&CleanupStep::DeleteZeroMrp).await.is_err());
        assert!(!store.drop_table().await.unwrap());
    }

    #[tokio::test]
    async fn test_create_twice_conflicts() {
        let store = MemoryStore::new();
        store.create_table().await.unwrap();
        let err = store.create_table().await.unwrap_err();
        assert!(err.to_string().contains("already exists"));
        assert!(store.drop_table().await.unwrap());
        store.create_table().await.unwrap();
    }

    #[tokio::test]
    async fn test_sku_ids_come_from_a_sequence() {
        let store = MemoryStore::new();
        store.create_table().await.unwrap();
        store
            .insert_records(&[new_record("Cola", 40), new_record("Free sample", 0)], 10)
            .await
            .unwrap();
        store.apply_cleanup(&CleanupStep::DeleteZeroMrp).await.unwrap();
        store.insert_records(&[new_record("Tea", 560)], 10).await.unwrap();

        let ids: Vec<_> = store
            .list_records()
            .await
            .unwrap()
            .into_iter()
            .map(|r| r.sku_id)
            .collect();
        assert_eq!(ids, vec![1, 3]);
    }

    #[tokio::test]
    async fn test_insert_is_all_or_nothing() {
        let store = MemoryStore::new();
        store.create_table().await.unwrap();
        let err = store
            .insert_records(&[new_record("Cola", 40), new_record("", 10)], 1)
            .await
            .unwrap_err();
        assert!(format!("{:#}", err).contains("not-null"));
        assert_eq!(
            store.run_query(&Query::RowCount).await.unwrap(),
            QueryResult::Count(0)
        );
    }

    #[tokio::test]
    async fn test_varchar_lengths_are_enforced() {
        let store = MemoryStore::new();
        store.create_table().await.unwrap();

        let long_name = new_record(&"x".repeat(NAME_MAX_CHARS + 1), 40);
        let err = store
            .insert_records(&[new_record("Cola", 40), long_name], 1)
            .await
            .unwrap_err();
        assert!(format!("{:#}", err).contains("Failed to insert batch 2"));
        assert!(format!("{:#}", err).contains("character varying(150)"));

        let mut long_category = new_record("Tea", 560);
        long_category.category = Some("é".repeat(CATEGORY_MAX_CHARS + 1));
        let err = store.insert_records(&[long_category], 10).await.unwrap_err();
        assert!(format!("{:#}", err).contains("character varying(120)"));

        // Multi-byte characters count once each.
        let mut at_limit = new_record(&"é".repeat(NAME_MAX_CHARS), 40);
        at_limit.category = Some("é".repeat(CATEGORY_MAX_CHARS));
        assert_eq!(store.insert_records(&[at_limit], 10).await.unwrap(), 1);
        assert_eq!(
            store.run_query(&Query::RowCount).await.unwrap(),
            QueryResult::Count(1)
        );
    }
}
