// Pipeline orchestrator - runs every stage in order for one report

use rusqlite::types::Value;

use crate::config::PipelineConfig;
use crate::csv_sink::write_csv;
use crate::db::{close_database, count_rows, open_database, run_query, write_table, ResultSet};
use crate::error::{EtlError, PipelineError, Stage, StageContext};
use crate::extractor::extract;
use crate::fetcher::{fetch, fetch_to_file, Fetch};
use crate::logger::ProgressLog;
use crate::model::{BankRecord, BankTable, ExtractedBank};
use crate::transformer::transform_with_rate_file;

/// What a successful run produced
#[derive(Debug)]
pub struct RunReport {
    pub table: BankTable,
    /// (query text, result) for every illustrative query, in order
    pub queries: Vec<(String, ResultSet)>,
}

/// The fixed set of illustrative queries printed at the end of a run
pub fn default_queries(table_name: &str) -> Vec<String> {
    vec![
        format!("SELECT * FROM {}", table_name),
        format!("SELECT AVG(MC_GBP_Billion) FROM {}", table_name),
        format!("SELECT Name FROM {} LIMIT 5", table_name),
        format!(
            "SELECT Name, MC_USD_Billion FROM {} ORDER BY MC_USD_Billion DESC LIMIT 1",
            table_name
        ),
    ]
}

pub struct Pipeline {
    config: PipelineConfig,
    fetcher: Box<dyn Fetch>,
    log: ProgressLog,
}

impl Pipeline {
    pub fn new(config: PipelineConfig, fetcher: Box<dyn Fetch>) -> Self {
        let log = ProgressLog::new(config.log_path.clone());
        Pipeline {
            config,
            fetcher,
            log,
        }
    }

    pub fn log(&self) -> &ProgressLog {
        &self.log
    }

    /// Run download -> extract -> transform -> load -> query.
    ///
    /// Stops at the first failing stage. Outputs of stages that already
    /// finished (rate file, CSV) stay on disk.
    pub fn run(&self) -> Result<RunReport, PipelineError> {
        let config = &self.config;
        let log = &self.log;

        log.clear().in_stage(Stage::Setup)?;
        log.log_progress("ETL run started").in_stage(Stage::Setup)?;

        fetch_to_file(
            self.fetcher.as_ref(),
            &config.exchange_rate_url,
            &config.local_rate_path,
            log,
        )
        .in_stage(Stage::DownloadRates)?;

        let page = fetch(self.fetcher.as_ref(), &config.data_url, log).in_stage(Stage::FetchPage)?;
        let html = String::from_utf8_lossy(&page);

        let banks = extract(&html, &config.table_selector, log).in_stage(Stage::Extract)?;
        println!("Extracted Data:");
        println!("{}", render_extracted(&banks));

        let table = transform_with_rate_file(banks, &config.local_rate_path, log)
            .in_stage(Stage::Transform)?;
        println!("Transformed Data:");
        println!("{}", render_table(&table));

        write_csv(&table, &config.output_csv_path, log).in_stage(Stage::LoadCsv)?;

        let conn = open_database(&config.database_path)
            .map_err(|e| log.failed("Opening database", e))
            .in_stage(Stage::LoadDatabase)?;
        write_table(&conn, &table, &config.table_name, log).in_stage(Stage::LoadDatabase)?;

        let mut queries = Vec::new();
        for sql in default_queries(&config.table_name) {
            let result = run_query(&conn, &sql, log).in_stage(Stage::Query)?;
            queries.push((sql, result));
        }

        self.verify(&conn, &table).in_stage(Stage::Verify)?;

        close_database(conn)
            .map_err(|e| log.failed("Closing database", e))
            .in_stage(Stage::Verify)?;

        log.log_progress("ETL run completed").in_stage(Stage::Verify)?;

        Ok(RunReport { table, queries })
    }

    /// The stored table must hold exactly this run's records
    fn verify(&self, conn: &rusqlite::Connection, table: &[BankRecord]) -> Result<(), EtlError> {
        let stored = count_rows(conn, &self.config.table_name)
            .map_err(|e| self.log.failed("Verification", e))?;

        if stored != table.len() as i64 {
            let err = EtlError::Storage(format!(
                "{} holds {} rows, expected {}",
                self.config.table_name,
                stored,
                table.len()
            ));
            return Err(self.log.failed("Verification", err));
        }

        self.log
            .log_progress(&format!("Verification completed ({} rows)", stored))
    }
}

/// Extracted records as an aligned text table
pub fn render_extracted(banks: &[ExtractedBank]) -> String {
    ResultSet {
        columns: vec!["Name".to_string(), "MC_USD_Billion".to_string()],
        rows: banks
            .iter()
            .map(|b| vec![Value::Text(b.name.clone()), Value::Real(b.mc_usd_billion)])
            .collect(),
    }
    .to_string()
}

/// Final records as an aligned text table
pub fn render_table(table: &[BankRecord]) -> String {
    ResultSet {
        columns: crate::model::COLUMNS.iter().map(|c| c.to_string()).collect(),
        rows: table
            .iter()
            .map(|r| {
                vec![
                    Value::Text(r.name.clone()),
                    Value::Real(r.mc_usd_billion),
                    Value::Real(r.mc_gbp_billion),
                    Value::Real(r.mc_eur_billion),
                    Value::Real(r.mc_inr_billion),
                ]
            })
            .collect(),
    }
    .to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_queries_target_table() {
        let queries = default_queries("Largest_banks");

        assert_eq!(queries.len(), 4);
        assert_eq!(queries[0], "SELECT * FROM Largest_banks");
        assert_eq!(queries[2], "SELECT Name FROM Largest_banks LIMIT 5");
        assert!(queries.iter().all(|q| q.contains("Largest_banks")));
    }

    #[test]
    fn test_render_table_has_header_and_rows() {
        let table = vec![BankRecord {
            name: "HSBC".to_string(),
            mc_usd_billion: 160.0,
            mc_gbp_billion: 128.0,
            mc_eur_billion: 148.8,
            mc_inr_billion: 13200.0,
        }];

        let text = render_table(&table);
        let lines: Vec<&str> = text.lines().collect();

        assert!(lines[0].starts_with("Name  MC_USD_Billion"));
        assert!(lines[1].starts_with("HSBC  160.0"));
        assert_eq!(lines.len(), 2);
    }

    #[test]
    fn test_render_extracted_empty() {
        assert_eq!(render_extracted(&[]), "Name  MC_USD_Billion\n");
    }
}
