// Largest Banks ETL - Core Library
// Scrapes the bank ranking, converts currencies, loads CSV + SQLite

pub mod config;
pub mod csv_sink;
pub mod db;
pub mod error;
pub mod extractor;
pub mod fetcher;
pub mod logger;
pub mod model;
pub mod pipeline;
pub mod transformer;

// Re-export commonly used types
pub use config::PipelineConfig;
pub use csv_sink::{read_csv, write_csv};
pub use db::{
    close_database, count_rows, open_database, open_in_memory, run_query, write_table, ResultSet,
};
pub use error::{EtlError, PipelineError, Stage};
pub use extractor::{extract, TableSelector};
pub use fetcher::{fetch, fetch_to_file, Fetch, HttpFetcher};
pub use logger::{LogEntry, ProgressLog};
pub use model::{BankRecord, BankTable, ExtractedBank};
pub use pipeline::{default_queries, Pipeline, RunReport};
pub use transformer::{
    load_exchange_rates, transform, transform_with_rate_file, Currency, ExchangeRateTable,
};

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
