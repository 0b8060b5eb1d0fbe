use rusqlite::types::Value;
use rusqlite::{params, Connection};
use std::fmt;
use std::path::Path;

use crate::config::is_sql_identifier;
use crate::error::EtlError;
use crate::logger::ProgressLog;
use crate::model::BankRecord;

// ============================================================================
// CONNECTION
// ============================================================================

/// Open (or create) the SQLite file at `path`
pub fn open_database(path: &Path) -> Result<Connection, EtlError> {
    Connection::open(path)
        .map_err(|e| EtlError::Storage(format!("cannot open {}: {}", path.display(), e)))
}

pub fn open_in_memory() -> Result<Connection, EtlError> {
    Connection::open_in_memory().map_err(|e| EtlError::Storage(e.to_string()))
}

pub fn close_database(conn: Connection) -> Result<(), EtlError> {
    conn.close()
        .map_err(|(_, e)| EtlError::Storage(format!("cannot close database: {}", e)))
}

// ============================================================================
// RELATIONAL SINK
// ============================================================================

/// Replace table `table_name` with the rows of `table`
///
/// Drop, create and insert run in a single transaction: readers see either
/// the previous dataset or the new one, never a mix.
pub fn write_table(
    conn: &Connection,
    table: &[BankRecord],
    table_name: &str,
    log: &ProgressLog,
) -> Result<usize, EtlError> {
    log.log_progress("Data loading to database started")?;

    match replace_table(conn, table, table_name) {
        Ok(inserted) => {
            log.log_progress(&format!(
                "Data loading to database completed ({} rows into {})",
                inserted, table_name
            ))?;
            Ok(inserted)
        }
        Err(e) => Err(log.failed("Data loading to database", e)),
    }
}

fn replace_table(
    conn: &Connection,
    table: &[BankRecord],
    table_name: &str,
) -> Result<usize, EtlError> {
    if !is_sql_identifier(table_name) {
        return Err(EtlError::Storage(format!("invalid table name '{}'", table_name)));
    }
    let storage = |e: rusqlite::Error| EtlError::Storage(e.to_string());

    let tx = conn.unchecked_transaction().map_err(storage)?;

    tx.execute(&format!("DROP TABLE IF EXISTS {}", table_name), [])
        .map_err(storage)?;

    tx.execute(
        &format!(
            "CREATE TABLE {} (
                Name TEXT NOT NULL,
                MC_USD_Billion REAL NOT NULL,
                MC_GBP_Billion REAL NOT NULL,
                MC_EUR_Billion REAL NOT NULL,
                MC_INR_Billion REAL NOT NULL
            )",
            table_name
        ),
        [],
    )
    .map_err(storage)?;

    let mut inserted = 0;
    {
        let mut stmt = tx
            .prepare(&format!(
                "INSERT INTO {} (Name, MC_USD_Billion, MC_GBP_Billion, MC_EUR_Billion, MC_INR_Billion)
                 VALUES (?1, ?2, ?3, ?4, ?5)",
                table_name
            ))
            .map_err(storage)?;

        for record in table {
            inserted += stmt
                .execute(params![
                    record.name,
                    record.mc_usd_billion,
                    record.mc_gbp_billion,
                    record.mc_eur_billion,
                    record.mc_inr_billion,
                ])
                .map_err(storage)?;
        }
    }

    tx.commit().map_err(storage)?;
    Ok(inserted)
}

/// Row count of `table_name`
pub fn count_rows(conn: &Connection, table_name: &str) -> Result<i64, EtlError> {
    if !is_sql_identifier(table_name) {
        return Err(EtlError::Query(format!("invalid table name '{}'", table_name)));
    }
    conn.query_row(&format!("SELECT COUNT(*) FROM {}", table_name), [], |row| row.get(0))
        .map_err(|e| EtlError::Query(e.to_string()))
}

// ============================================================================
// QUERY RUNNER
// ============================================================================

/// Column names and rows returned by a query
#[derive(Debug, Clone, PartialEq)]
pub struct ResultSet {
    pub columns: Vec<String>,
    pub rows: Vec<Vec<Value>>,
}

impl ResultSet {
    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Values of one column, by name
    pub fn column(&self, name: &str) -> Option<Vec<&Value>> {
        let index = self.columns.iter().position(|c| c == name)?;
        Some(self.rows.iter().map(|row| &row[index]).collect())
    }
}

fn render_value(value: &Value) -> String {
    match value {
        Value::Null => "NULL".to_string(),
        Value::Integer(i) => i.to_string(),
        Value::Real(f) => format!("{:?}", f),
        Value::Text(s) => s.clone(),
        Value::Blob(b) => format!("<{} bytes>", b.len()),
    }
}

impl fmt::Display for ResultSet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let rendered: Vec<Vec<String>> = self
            .rows
            .iter()
            .map(|row| row.iter().map(render_value).collect())
            .collect();

        let mut widths: Vec<usize> = self.columns.iter().map(|c| c.chars().count()).collect();
        for row in &rendered {
            for (i, cell) in row.iter().enumerate() {
                widths[i] = widths[i].max(cell.chars().count());
            }
        }

        let header: Vec<String> = self
            .columns
            .iter()
            .zip(&widths)
            .map(|(c, w)| format!("{:<width$}", c, width = *w))
            .collect();
        writeln!(f, "{}", header.join("  ").trim_end())?;

        for row in &rendered {
            let cells: Vec<String> = row
                .iter()
                .zip(&widths)
                .map(|(c, w)| format!("{:<width$}", c, width = *w))
                .collect();
            writeln!(f, "{}", cells.join("  ").trim_end())?;
        }

        Ok(())
    }
}

/// Run a read query and print it with its result
///
/// `sql` is executed as given; callers own the query text.
pub fn run_query(conn: &Connection, sql: &str, log: &ProgressLog) -> Result<ResultSet, EtlError> {
    log.log_progress("Query execution started")?;
    println!("{}", sql);

    match query(conn, sql) {
        Ok(result) => {
            println!("{}", result);
            log.log_progress(&format!("Query execution completed ({} rows)", result.len()))?;
            Ok(result)
        }
        Err(e) => Err(log.failed("Query execution", e)),
    }
}

fn query(conn: &Connection, sql: &str) -> Result<ResultSet, EtlError> {
    let query_err = |e: rusqlite::Error| EtlError::Query(e.to_string());

    let mut stmt = conn.prepare(sql).map_err(query_err)?;
    let columns: Vec<String> = stmt.column_names().into_iter().map(String::from).collect();

    let mut rows = Vec::new();
    let mut cursor = stmt.query([]).map_err(query_err)?;
    while let Some(row) = cursor.next().map_err(query_err)? {
        let mut values = Vec::with_capacity(columns.len());
        for i in 0..columns.len() {
            values.push(row.get::<_, Value>(i).map_err(query_err)?);
        }
        rows.push(values);
    }

    Ok(ResultSet { columns, rows })
}
