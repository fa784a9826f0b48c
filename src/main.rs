use inventory_insights::config::AppConfig;
use inventory_insights::render::render_report;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load environment variables from .env file if it exists
    dotenvy::dotenv().ok();

    // Initialize logging with explicit filter to suppress sqlx debug logs
    use env_logger::Builder;
    use log::LevelFilter;

    Builder::new()
        .filter_level(LevelFilter::Info) // Default to Info for everything
        .filter_module("sqlx", LevelFilter::Warn) // Suppress sqlx Debug logs
        .parse_default_env()
        .init();

    let config = AppConfig::load()?;
    log::info!(
        "Configuration loaded: backend={:?}, import mode={:?}",
        config.database.backend,
        config.import.mode
    );

    let report = inventory_insights::run(&config).await?;
    println!("{}", render_report(&report, config.report.format)?);

    Ok(())
}
