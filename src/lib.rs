pub mod config;
pub mod logic;
pub mod model;
pub mod render;
pub mod seed;
pub mod store;

// Export logic types
pub use logic::{
    read_records, run_cleanup, run_pipeline, CleanupReport, CleanupStep, ImportError,
    ImportMode, ImportSummary, PipelineOptions, PipelineReport, Query, QueryOutcome,
};

// Export all model types
pub use model::*;

// Export store types
pub use store::{MemoryStore, PostgresStore, Store};

use anyhow::Context;
use crate::config::{AppConfig, Backend};

/// Read the configured snapshot, falling back to the bundled sample.
pub fn load_snapshot(config: &AppConfig) -> anyhow::Result<Vec<u8>> {
    match &config.import.csv_path {
        Some(path) => std::fs::read(path)
            .with_context(|| format!("Failed to read snapshot {}", path.display())),
        None => {
            log::warn!("No import.csv_path configured, using the bundled sample snapshot");
            Ok(seed::SAMPLE_CSV.as_bytes().to_vec())
        }
    }
}

/// Run the whole exercise against the configured backend.
pub async fn run(config: &AppConfig) -> anyhow::Result<PipelineReport> {
    let csv = load_snapshot(config)?;
    let options = PipelineOptions::from_config(config);

    match config.database.backend {
        Backend::Postgres => {
            let database_url = config.database_url()?;
            log::info!("Connecting to PostgreSQL...");
            let store = PostgresStore::new(&database_url, config.database.max_connections).await?;
            run_pipeline(&store, &csv, &options).await
        }
        Backend::Memory => {
            log::info!("Using the in-memory table");
            run_pipeline(&MemoryStore::new(), &csv, &options).await
        }
    }
}
