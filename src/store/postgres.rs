use anyhow::{Context, Result};
use sqlx::postgres::{PgPoolOptions, PgRow};
use sqlx::{PgPool, Postgres, QueryBuilder, Row};

use crate::logic::{CleanupStep, Query};
use crate::model::{
    CategoryTotal, DiscountRow, InventoryRecord, NameCount, NewInventoryRecord, PricePerGramRow,
    PriceRow, QueryResult, StockCount, WeightBandRow,
};
use crate::store::sql;
use crate::store::traits::{CleanupStore, QueryStore, RecordStore, SchemaStore, Store};

/// Nine bind parameters per row; PostgreSQL caps a statement at 65535.
const MAX_ROWS_PER_INSERT: usize = 7000;

#[derive(Debug, Clone)]
pub struct PostgresStore {
    pool: PgPool,
}

impl PostgresStore {
    /// Create a new PostgreSQL store with the given database URL
    pub async fn new(database_url: &str, max_connections: u32) -> Result<Self> {
        let pool = PgPoolOptions::new()
            .max_connections(max_connections)
            .connect(database_url)
            .await
            .context("Failed to create PostgreSQL connection pool")?;

        Ok(Self { pool })
    }

    /// Get a reference to the connection pool
    pub fn pool(&self) -> &PgPool {
        &self.pool
    }
}

fn record_from_row(row: &PgRow) -> Result<InventoryRecord> {
    Ok(InventoryRecord {
        sku_id: row.try_get("sku_id")?,
        category: row.try_get("category")?,
        name: row.try_get("name")?,
        mrp: row.try_get("mrp")?,
        discount_percent: row.try_get("discount_percent")?,
        available_quantity: row.try_get("available_quantity")?,
        discounted_selling_price: row.try_get("discounted_selling_price")?,
        weight_in_gms: row.try_get("weight_in_gms")?,
        out_of_stock: row.try_get("out_of_stock")?,
        quantity: row.try_get("quantity")?,
    })
}

fn records_from_rows(rows: &[PgRow]) -> Result<Vec<InventoryRecord>> {
    rows.iter().map(record_from_row).collect()
}

fn category_totals(rows: &[PgRow]) -> Result<Vec<CategoryTotal>> {
    rows.iter()
        .map(|row| {
            Ok(CategoryTotal {
                category: row.try_get("category")?,
                value: row.try_get("total")?,
            })
        })
        .collect()
}

fn discount_rows(rows: &[PgRow]) -> Result<Vec<DiscountRow>> {
    rows.iter()
        .map(|row| {
            Ok(DiscountRow {
                name: row.try_get("name")?,
                mrp: row.try_get("mrp")?,
                discount_percent: row.try_get("discount_percent")?,
            })
        })
        .collect()
}

#[async_trait::async_trait]
impl SchemaStore for PostgresStore {
    async fn create_table(&self) -> Result<()> {
        sqlx::query(sql::CREATE_TABLE)
            .execute(&self.pool)
            .await
            .context("Failed to create inventory table")?;
        Ok(())
    }

    async fn drop_table(&self) -> Result<bool> {
        let existed = self.table_exists().await?;
        sqlx::query(sql::DROP_TABLE)
            .execute(&self.pool)
            .await
            .context("Failed to drop inventory table")?;
        Ok(existed)
    }

    async fn table_exists(&self) -> Result<bool> {
        let row = sqlx::query(sql::TABLE_EXISTS)
            .fetch_one(&self.pool)
            .await
            .context("Failed to look up inventory table")?;
        Ok(row.try_get("present")?)
    }
}

#[async_trait::async_trait]
impl RecordStore for PostgresStore {
    async fn insert_records(
        &self,
        records: &[NewInventoryRecord],
        batch_size: usize,
    ) -> Result<u64> {
        let mut inserted = 0;
        let mut tx = self.pool.begin().await.context("Failed to begin insert")?;

        // Dropping `tx` on an error rolls back every batch sent so far.
        let batch_size = batch_size.clamp(1, MAX_ROWS_PER_INSERT);
        for (index, chunk) in records.chunks(batch_size).enumerate() {
            let mut builder: QueryBuilder<Postgres> = QueryBuilder::new(sql::INSERT_COLUMNS);
            builder.push_values(chunk, |mut b, record| {
                b.push_bind(&record.category)
                    .push_bind(&record.name)
                    .push_bind(record.mrp)
                    .push_bind(record.discount_percent)
                    .push_bind(record.available_quantity)
                    .push_bind(record.discounted_selling_price)
                    .push_bind(record.weight_in_gms)
                    .push_bind(record.out_of_stock)
                    .push_bind(record.quantity);
            });
            let result = builder
                .build()
                .execute(&mut *tx)
                .await
                .with_context(|| format!("Failed to insert batch {}", index + 1))?;
            inserted += result.rows_affected();
        }

        tx.commit().await.context("Failed to commit insert")?;
        Ok(inserted)
    }

    async fn copy_csv(&self, csv: &[u8]) -> Result<u64> {
        let mut conn = self
            .pool
            .acquire()
            .await
            .context("Failed to acquire connection for COPY")?;
        let mut copy = conn
            .copy_in_raw(sql::COPY_CSV)
            .await
            .context("Failed to start COPY")?;
        copy.send(csv).await.context("Failed to stream CSV to COPY")?;
        let rows = copy.finish().await.context("COPY was rejected")?;
        Ok(rows)
    }

    async fn list_records(&self) -> Result<Vec<InventoryRecord>> {
        let rows = sqlx::query(sql::SELECT_ALL)
            .fetch_all(&self.pool)
            .await
            .context("Failed to list inventory rows")?;
        records_from_rows(&rows)
    }
}

#[async_trait::async_trait]
impl CleanupStore for PostgresStore {
    async fn apply_cleanup(&self, step: &CleanupStep) -> Result<u64> {
        let statement = sqlx::query(sql::cleanup(step));
        let statement = match step {
            CleanupStep::ConvertPaiseToRupees { threshold } => statement.bind(*threshold),
            CleanupStep::DeleteZeroMrp | CleanupStep::DeleteZeroSellingPrice => statement,
        };
        let result = statement
            .execute(&self.pool)
            .await
            .with_context(|| format!("Failed to execute: {}", step.describe()))?;
        Ok(result.rows_affected())
    }
}

#[async_trait::async_trait]
impl QueryStore for PostgresStore {
    async fn run_query(&self, query: &Query) -> Result<QueryResult> {
        let statement = sqlx::query(sql::query(query));
        let statement = match query {
            Query::Sample { limit }
            | Query::TopDiscounts { limit }
            | Query::TopCategoriesByDiscount { limit } => statement.bind(*limit),
            Query::OutOfStockHighMrp { min_mrp } => statement.bind(*min_mrp),
            Query::PremiumLowDiscount {
                min_mrp,
                max_discount,
            } => statement.bind(*min_mrp).bind(*max_discount),
            Query::PricePerGram { min_weight } => statement.bind(*min_weight),
            Query::RowCount
            | Query::NullCategory
            | Query::DistinctCategories
            | Query::StockStatus
            | Query::DuplicateNames
            | Query::ZeroPriced
            | Query::RevenueByCategory
            | Query::WeightBands
            | Query::InventoryWeightByCategory => statement,
        };

        let rows = statement
            .fetch_all(&self.pool)
            .await
            .with_context(|| format!("Failed to run query: {}", query.title()))?;

        let result = match query {
            Query::RowCount => {
                let row = rows
                    .first()
                    .ok_or_else(|| anyhow::anyhow!("COUNT returned no rows"))?;
                QueryResult::Count(row.try_get("count")?)
            }
            Query::Sample { .. } | Query::NullCategory | Query::ZeroPriced => {
                QueryResult::Records(records_from_rows(&rows)?)
            }
            Query::DistinctCategories => QueryResult::Categories(
                rows.iter()
                    .map(|row| row.try_get("category"))
                    .collect::<Result<_, _>>()?,
            ),
            Query::StockStatus => QueryResult::StockCounts(
                rows.iter()
                    .map(|row| {
                        Ok(StockCount {
                            out_of_stock: row.try_get("out_of_stock")?,
                            count: row.try_get("count")?,
                        })
                    })
                    .collect::<Result<_>>()?,
            ),
            Query::DuplicateNames => QueryResult::NameCounts(
                rows.iter()
                    .map(|row| {
                        Ok(NameCount {
                            name: row.try_get("name")?,
                            sku_count: row.try_get("sku_count")?,
                        })
                    })
                    .collect::<Result<_>>()?,
            ),
            Query::TopDiscounts { .. } | Query::PremiumLowDiscount { .. } => {
                QueryResult::Discounts(discount_rows(&rows)?)
            }
            Query::OutOfStockHighMrp { .. } => QueryResult::Prices(
                rows.iter()
                    .map(|row| {
                        Ok(PriceRow {
                            name: row.try_get("name")?,
                            mrp: row.try_get("mrp")?,
                        })
                    })
                    .collect::<Result<_>>()?,
            ),
            Query::RevenueByCategory
            | Query::TopCategoriesByDiscount { .. }
            | Query::InventoryWeightByCategory => QueryResult::CategoryTotals(category_totals(&rows)?),
            Query::PricePerGram { .. } => QueryResult::PricePerGram(
                rows.iter()
                    .map(|row| {
                        Ok(PricePerGramRow {
                            name: row.try_get("name")?,
                            weight_in_gms: row.try_get("weight_in_gms")?,
                            discounted_selling_price: row.try_get("discounted_selling_price")?,
                            price_per_gram: row.try_get("price_per_gram")?,
                        })
                    })
                    .collect::<Result<_>>()?,
            ),
            Query::WeightBands => QueryResult::WeightBands(
                rows.iter()
                    .map(|row| {
                        let band: String = row.try_get("band")?;
                        Ok(WeightBandRow {
                            name: row.try_get("name")?,
                            weight_in_gms: row.try_get("weight_in_gms")?,
                            band: band.parse()?,
                        })
                    })
                    .collect::<Result<_>>()?,
            ),
        };

        Ok(result)
    }
}

impl Store for PostgresStore {}
