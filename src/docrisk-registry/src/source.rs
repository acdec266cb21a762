//! Ingestion sources for the administrative import.
//!
//! Regulators publish the broker list as a spreadsheet. The first two
//! columns are taken as name and registration number, the first row is a
//! header, and any further columns are ignored. Rows missing either value
//! are skipped.

use std::path::Path;

use calamine::{open_workbook_auto, Data, Reader};
use tracing::{info, warn};

use crate::error::RegistryError;
use crate::snapshot::BrokerRecord;
use crate::store::read_json_records;

/// Format of an import source, derived from the file extension.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SourceFormat {
    /// `.json` array of records.
    Json,
    /// `.csv` with a header row.
    Csv,
    /// `.xlsx`, `.xlsm`, `.xls`, `.ods`; first worksheet.
    Workbook,
}

impl SourceFormat {
    /// Detect the format of an import source.
    pub fn detect(path: &Path) -> Result<Self, RegistryError> {
        let ext = path
            .extension()
            .and_then(|e| e.to_str())
            .map(str::to_ascii_lowercase);
        match ext.as_deref() {
            Some("json") => Ok(Self::Json),
            Some("csv") => Ok(Self::Csv),
            Some("xlsx" | "xlsm" | "xls" | "ods") => Ok(Self::Workbook),
            _ => Err(RegistryError::UnsupportedFormat {
                path: path.to_path_buf(),
            }),
        }
    }
}

/// Read broker records from any supported import source.
pub fn read_source_records(path: &Path) -> Result<Vec<BrokerRecord>, RegistryError> {
    if !path.exists() {
        return Err(RegistryError::NotFound {
            path: path.to_path_buf(),
        });
    }
    match SourceFormat::detect(path)? {
        SourceFormat::Json => read_json_records(path),
        SourceFormat::Csv => read_csv_records(path),
        SourceFormat::Workbook => read_workbook_records(path),
    }
}

/// Read the first two columns of a CSV file, skipping the header row.
pub fn read_csv_records(path: &Path) -> Result<Vec<BrokerRecord>, RegistryError> {
    let sheet_error = |e: csv::Error| RegistryError::Sheet {
        path: path.to_path_buf(),
        reason: e.to_string(),
    };
    let mut reader = csv::ReaderBuilder::new()
        .has_headers(true)
        .flexible(true)
        .from_path(path)
        .map_err(sheet_error)?;

    let mut rows = Vec::new();
    for row in reader.records() {
        let row = row.map_err(sheet_error)?;
        rows.push((
            row.get(0).unwrap_or_default().to_string(),
            row.get(1).unwrap_or_default().to_string(),
        ));
    }
    Ok(collect_rows(path, rows))
}

/// Read the first two columns of the first worksheet, skipping the header row.
pub fn read_workbook_records(path: &Path) -> Result<Vec<BrokerRecord>, RegistryError> {
    let sheet_error = |reason: String| RegistryError::Sheet {
        path: path.to_path_buf(),
        reason,
    };
    let mut workbook = open_workbook_auto(path).map_err(|e| sheet_error(e.to_string()))?;
    let range = workbook
        .worksheet_range_at(0)
        .ok_or_else(|| sheet_error("workbook has no worksheets".into()))?
        .map_err(|e| sheet_error(e.to_string()))?;

    let rows = range
        .rows()
        .skip(1)
        .map(|row| {
            (
                row.first().map(cell_text).unwrap_or_default(),
                row.get(1).map(cell_text).unwrap_or_default(),
            )
        })
        .collect();
    Ok(collect_rows(path, rows))
}

/// Spreadsheet cell as text. Whole numbers lose the trailing `.0`.
fn cell_text(cell: &Data) -> String {
    match cell {
        Data::Empty => String::new(),
        Data::String(s) => s.clone(),
        Data::Float(f) if f.fract() == 0.0 && f.abs() < 1e15 => format!("{:.0}", f),
        other => other.to_string(),
    }
}

fn collect_rows(path: &Path, rows: Vec<(String, String)>) -> Vec<BrokerRecord> {
    let total = rows.len();
    let records: Vec<BrokerRecord> = rows
        .into_iter()
        .filter(|(name, number)| !name.trim().is_empty() && !number.trim().is_empty())
        .map(|(name, number)| BrokerRecord::new(name, number))
        .collect();

    let skipped = total - records.len();
    if skipped > 0 {
        warn!(
            path = %path.display(),
            skipped,
            "Rows without a name or registration number skipped"
        );
    }
    info!(path = %path.display(), rows = records.len(), "Read broker source");
    records
}
