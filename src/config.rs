//! Pipeline configuration.
//!
//! All paths, URLs and names a run touches live in one [`PipelineConfig`].
//! Defaults reproduce the quarterly report setup; a TOML file can override
//! any subset of keys.

use serde::Deserialize;
use std::fs;
use std::path::{Path, PathBuf};

use crate::error::EtlError;
use crate::extractor::TableSelector;

/// Environment variable naming an optional TOML config file
pub const CONFIG_ENV_VAR: &str = "BANKS_ETL_CONFIG";

pub const DEFAULT_DATA_URL: &str =
    "https://web.archive.org/web/20230908091635/https://en.wikipedia.org/wiki/List_of_largest_banks";
pub const DEFAULT_EXCHANGE_RATE_URL: &str = "https://cf-courses-data.s3.us.cloud-object-storage.appdomain.cloud/IBMSkillsNetwork-PY0221EN-Coursera/labs/v2/exchange_rate.csv";

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct PipelineConfig {
    /// Page holding the bank ranking table
    pub data_url: String,
    /// Remote `Currency,Rate` CSV
    pub exchange_rate_url: String,
    /// Where the rate CSV is downloaded to
    pub local_rate_path: PathBuf,
    pub output_csv_path: PathBuf,
    pub database_path: PathBuf,
    pub table_name: String,
    pub log_path: PathBuf,
    pub table_selector: TableSelector,
    pub request_timeout_secs: u64,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        PipelineConfig {
            data_url: DEFAULT_DATA_URL.to_string(),
            exchange_rate_url: DEFAULT_EXCHANGE_RATE_URL.to_string(),
            local_rate_path: PathBuf::from("./exchange_rate.csv"),
            output_csv_path: PathBuf::from("./Largest_banks_data.csv"),
            database_path: PathBuf::from("Banks.db"),
            table_name: "Largest_banks".to_string(),
            log_path: PathBuf::from("code_log.txt"),
            table_selector: TableSelector::First,
            request_timeout_secs: 30,
        }
    }
}

impl PipelineConfig {
    /// Load from a TOML file; absent keys keep their defaults.
    pub fn from_toml_file(path: &Path) -> Result<Self, EtlError> {
        let raw = fs::read_to_string(path).map_err(|source| EtlError::io(path, source))?;
        Self::from_toml_str(&raw)
    }

    pub fn from_toml_str(raw: &str) -> Result<Self, EtlError> {
        let config: PipelineConfig = toml::from_str(raw)
            .map_err(|e| EtlError::Config(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// Config file named by `BANKS_ETL_CONFIG`, or the defaults.
    pub fn from_env() -> Result<Self, EtlError> {
        match std::env::var_os(CONFIG_ENV_VAR) {
            Some(path) => Self::from_toml_file(Path::new(&path)),
            None => Ok(Self::default()),
        }
    }

    pub fn validate(&self) -> Result<(), EtlError> {
        if self.data_url.trim().is_empty() {
            return Err(EtlError::Config("data_url is empty".to_string()));
        }
        if self.exchange_rate_url.trim().is_empty() {
            return Err(EtlError::Config("exchange_rate_url is empty".to_string()));
        }
        if !is_sql_identifier(&self.table_name) {
            return Err(EtlError::Config(format!(
                "table_name '{}' is not a plain SQL identifier",
                self.table_name
            )));
        }
        if self.request_timeout_secs == 0 {
            return Err(EtlError::Config("request_timeout_secs must be positive".to_string()));
        }
        Ok(())
    }
}

/// `[A-Za-z_][A-Za-z0-9_]*` - the table name is interpolated into DDL.
pub fn is_sql_identifier(name: &str) -> bool {
    let mut chars = name.chars();
    match chars.next() {
        Some(c) if c.is_ascii_alphabetic() || c == '_' => {}
        _ => return false,
    }
    chars.all(|c| c.is_ascii_alphanumeric() || c == '_')
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_match_report_layout() {
        let config = PipelineConfig::default();
        assert_eq!(config.table_name, "Largest_banks");
        assert_eq!(config.log_path, PathBuf::from("code_log.txt"));
        assert_eq!(config.output_csv_path, PathBuf::from("./Largest_banks_data.csv"));
        assert_eq!(config.table_selector, TableSelector::First);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_partial_toml_keeps_defaults() {
        let config = PipelineConfig::from_toml_str(
            r#"
            database_path = "/tmp/q3.db"
            table_selector = { heading = "By market capitalization" }
            "#,
        )
        .unwrap();

        assert_eq!(config.database_path, PathBuf::from("/tmp/q3.db"));
        assert_eq!(
            config.table_selector,
            TableSelector::ByHeading("By market capitalization".to_string())
        );
        assert_eq!(config.table_name, "Largest_banks");
        assert_eq!(config.data_url, DEFAULT_DATA_URL);
    }

    #[test]
    fn test_first_selector_from_string() {
        let config = PipelineConfig::from_toml_str(r#"table_selector = "first""#).unwrap();
        assert_eq!(config.table_selector, TableSelector::First);
    }

    #[test]
    fn test_rejects_unsafe_table_name() {
        let result = PipelineConfig::from_toml_str(r#"table_name = "banks; DROP TABLE x""#);
        assert!(matches!(result, Err(EtlError::Config(_))));
    }

    #[test]
    fn test_rejects_bad_toml() {
        let result = PipelineConfig::from_toml_str("table_name = ");
        assert!(matches!(result, Err(EtlError::Config(_))));
    }

    #[test]
    fn test_sql_identifier() {
        assert!(is_sql_identifier("Largest_banks"));
        assert!(is_sql_identifier("_q3"));
        assert!(!is_sql_identifier("3banks"));
        assert!(!is_sql_identifier(""));
        assert!(!is_sql_identifier("banks-2024"));
    }
}
