// CSV sink - writes the report table to a flat file

use std::io;
use std::path::Path;

use crate::error::EtlError;
use crate::logger::ProgressLog;
use crate::model::{BankRecord, BankTable};

/// Write `table` to `path` with the report header, replacing any existing file
pub fn write_csv(table: &[BankRecord], path: &Path, log: &ProgressLog) -> Result<(), EtlError> {
    log.log_progress("Data loading to CSV started")?;

    match write_records(table, path) {
        Ok(()) => {
            log.log_progress(&format!(
                "Data loading to CSV completed ({} rows -> {})",
                table.len(),
                path.display()
            ))?;
            Ok(())
        }
        Err(e) => Err(log.failed("Data loading to CSV", e)),
    }
}

fn write_records(table: &[BankRecord], path: &Path) -> Result<(), EtlError> {
    let to_io = |e: csv::Error| EtlError::io(path, io::Error::from(e));

    let mut writer = csv::Writer::from_path(path).map_err(to_io)?;

    if table.is_empty() {
        // serialize() only emits the header alongside the first record
        writer.write_record(crate::model::COLUMNS).map_err(to_io)?;
    }
    for record in table {
        writer.serialize(record).map_err(to_io)?;
    }

    writer.flush().map_err(|e| EtlError::io(path, e))
}

/// Read a report CSV back into a table
pub fn read_csv(path: &Path) -> Result<BankTable, EtlError> {
    let to_io = |e: csv::Error| EtlError::io(path, io::Error::from(e));

    let mut reader = csv::Reader::from_path(path).map_err(to_io)?;

    let mut table = Vec::new();
    for result in reader.deserialize() {
        let record: BankRecord = result.map_err(to_io)?;
        table.push(record);
    }

    Ok(table)
}
