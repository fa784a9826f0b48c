use crate::logic::{CleanupStep, Query};
use crate::model::{InventoryRecord, NewInventoryRecord, QueryResult};
use anyhow::Result;

/// Table lifecycle.
#[async_trait::async_trait]
pub trait SchemaStore: Send + Sync {
    /// Create the `inventory` table. Fails if it already exists.
    async fn create_table(&self) -> Result<()>;
    /// Drop the table if present; returns whether there was one.
    async fn drop_table(&self) -> Result<bool>;
    async fn table_exists(&self) -> Result<bool>;
}

#[async_trait::async_trait]
pub trait RecordStore: Send + Sync {
    /// Insert rows in one transaction, one multi-row statement per
    /// `batch_size` rows. The table assigns `sku_id`s.
    async fn insert_records(&self, records: &[NewInventoryRecord], batch_size: usize)
        -> Result<u64>;
    /// Bulk-load a CSV export with the header row the export ships with.
    async fn copy_csv(&self, csv: &[u8]) -> Result<u64>;
    /// Every row, ordered by `sku_id`.
    async fn list_records(&self) -> Result<Vec<InventoryRecord>>;
}

#[async_trait::async_trait]
pub trait CleanupStore: Send + Sync {
    /// Run one mutating statement, returning the affected row count.
    async fn apply_cleanup(&self, step: &CleanupStep) -> Result<u64>;
}

#[async_trait::async_trait]
pub trait QueryStore: Send + Sync {
    async fn run_query(&self, query: &Query) -> Result<QueryResult>;
}

pub trait Store: SchemaStore + RecordStore + CleanupStore + QueryStore + Send + Sync {}
