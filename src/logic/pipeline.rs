use anyhow::{Context, Result};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::config::AppConfig;
use crate::logic::cleanup::{run_cleanup, CleanupReport, CleanupStep, DEFAULT_PAISE_THRESHOLD};
use crate::logic::import::{import_csv, ImportMode, ImportSummary, DEFAULT_BATCH_SIZE};
use crate::logic::queries::{Query, DEFAULT_SAMPLE_LIMIT};
use crate::model::QueryResult;
use crate::store::traits::Store;

#[derive(Debug, Clone, PartialEq)]
pub struct PipelineOptions {
    pub import_mode: ImportMode,
    pub batch_size: usize,
    pub paise_threshold: Decimal,
    pub sample_limit: i64,
}

impl Default for PipelineOptions {
    fn default() -> Self {
        Self {
            import_mode: ImportMode::Insert,
            batch_size: DEFAULT_BATCH_SIZE,
            paise_threshold: Decimal::from(DEFAULT_PAISE_THRESHOLD),
            sample_limit: DEFAULT_SAMPLE_LIMIT,
        }
    }
}

impl PipelineOptions {
    pub fn from_config(config: &AppConfig) -> Self {
        Self {
            import_mode: config.import.mode,
            batch_size: config.import.batch_size,
            paise_threshold: config.cleaning.paise_threshold,
            sample_limit: config.report.sample_limit,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QueryOutcome {
    pub title: String,
    pub query: Query,
    pub result: QueryResult,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PipelineReport {
    pub import: ImportSummary,
    pub exploration: Vec<QueryOutcome>,
    pub cleanup: CleanupReport,
    pub business: Vec<QueryOutcome>,
}

/// Run each query in order, stopping at the first failure.
pub async fn run_queries<S: Store + ?Sized>(
    store: &S,
    queries: Vec<Query>,
) -> Result<Vec<QueryOutcome>> {
    let mut outcomes = Vec::with_capacity(queries.len());
    for query in queries {
        let title = query.title();
        let result = store.run_query(&query).await?;
        log::debug!("{}: {} rows", title, result.len());
        outcomes.push(QueryOutcome {
            title,
            query,
            result,
        });
    }
    Ok(outcomes)
}

/// Fresh table, bulk load, exploration, cleanup, business queries.
pub async fn run_pipeline<S: Store + ?Sized>(
    store: &S,
    csv: &[u8],
    options: &PipelineOptions,
) -> Result<PipelineReport> {
    if store.drop_table().await? {
        log::info!("Dropped existing inventory table");
    }
    store
        .create_table()
        .await
        .context("Failed to create inventory schema")?;

    let import = import_csv(store, csv, options.import_mode, options.batch_size).await?;
    let exploration = run_queries(store, Query::exploration(options.sample_limit)).await?;
    let cleanup = run_cleanup(store, &CleanupStep::standard(options.paise_threshold)).await?;
    log::info!(
        "Cleanup left {} of {} rows",
        cleanup.rows_after,
        cleanup.rows_before
    );
    let business = run_queries(store, Query::business()).await?;

    Ok(PipelineReport {
        import,
        exploration,
        cleanup,
        business,
    })
}
