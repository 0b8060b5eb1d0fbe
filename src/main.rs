use anyhow::{Context, Result};
use std::time::Duration;
use tracing_subscriber::EnvFilter;

use largest_banks_etl::{HttpFetcher, Pipeline, PipelineConfig};

fn main() -> Result<()> {
    init_tracing();

    let config = PipelineConfig::from_env().context("Failed to load configuration")?;
    tracing::debug!(?config, "configuration loaded");

    let fetcher = HttpFetcher::new(Duration::from_secs(config.request_timeout_secs))?;
    let pipeline = Pipeline::new(config, Box::new(fetcher));

    let report = pipeline.run().context("ETL run failed")?;

    println!(
        "✓ {} banks written (version {})",
        report.table.len(),
        largest_banks_etl::VERSION
    );

    // Log verification
    println!("Log file contents:");
    print!("{}", pipeline.log().contents()?);

    Ok(())
}

/// Progress goes to stderr; stdout carries the report
fn init_tracing() {
    let env_filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("largest_banks_etl=info"));

    tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_writer(std::io::stderr)
        .init();
}
