use std::fs::File;
use std::io::Write;
use std::path::Path;

use crate::error::DecodeError;
use crate::record::{
    JobRecord, BUDGET_COLUMN, DATE_CREATED_COLUMN, ID_COLUMN, JOB_TYPE_COLUMN, LABEL_COLUMN,
    PREDICTED_COLUMN, SNIPPET_COLUMN, TITLE_COLUMN,
};
use crate::store::RecordStore;

/// What to include in an export.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum ExportMode {
    /// Every record, every column.
    #[default]
    Full,
    /// `id,label` for labelled records only.
    LabelsOnly,
}

/// Rows ready to be written: a header plus one value per header per row.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ExportTable {
    pub headers: Vec<String>,
    pub rows: Vec<Vec<String>>,
}

impl ExportTable {
    /// Row `index` as a column-to-value map.
    pub fn row_map(&self, index: usize) -> Option<std::collections::BTreeMap<&str, &str>> {
        let row = self.rows.get(index)?;
        Some(
            self.headers
                .iter()
                .map(String::as_str)
                .zip(row.iter().map(String::as_str))
                .collect(),
        )
    }
}

/// Column set for records that were not imported with one: the known fields
/// that any record carries, then extra columns in sorted order.
fn derive_columns<'a>(records: impl Iterator<Item = &'a JobRecord>) -> Vec<String> {
    let mut columns: Vec<String> = [ID_COLUMN, TITLE_COLUMN, SNIPPET_COLUMN]
        .iter()
        .map(|c| c.to_string())
        .collect();
    let mut optional = [false; 3];
    let mut predicted = false;
    let mut extra = std::collections::BTreeSet::new();

    for record in records {
        optional[0] |= record.job_type.is_some();
        optional[1] |= record.budget.is_some();
        optional[2] |= record.date_created.is_some();
        predicted |= record.predicted.is_some();
        extra.extend(record.extra.keys().cloned());
    }

    let names = [JOB_TYPE_COLUMN, BUDGET_COLUMN, DATE_CREATED_COLUMN];
    for (name, present) in names.iter().zip(optional) {
        if present {
            columns.push(name.to_string());
        }
    }
    columns.extend(extra);
    // Label is always exported so the file can be re-imported as a labels file.
    columns.push(LABEL_COLUMN.to_string());
    if predicted {
        columns.push(PREDICTED_COLUMN.to_string());
    }
    columns
}

/// Flattens the store into export rows.
///
/// `columns` overrides the header. Otherwise the column set captured at
/// import time is used, falling back to one derived from the records.
/// Absent fields export as empty strings.
pub fn export_rows(
    store: &RecordStore,
    columns: Option<&[String]>,
    mode: ExportMode,
) -> ExportTable {
    let headers: Vec<String> = match (mode, columns) {
        (ExportMode::LabelsOnly, _) => vec![ID_COLUMN.to_string(), LABEL_COLUMN.to_string()],
        (ExportMode::Full, Some(columns)) => columns.to_vec(),
        (ExportMode::Full, None) if !store.columns().is_empty() => store.columns().to_vec(),
        (ExportMode::Full, None) => derive_columns(store.iter().map(|r| r.as_ref())),
    };

    let rows = store
        .iter()
        .filter(|record| mode == ExportMode::Full || record.is_labelled())
        .map(|record| {
            headers
                .iter()
                .map(|column| record.field(column).unwrap_or_default())
                .collect()
        })
        .collect();

    ExportTable { headers, rows }
}

/// Writes a table as RFC 4180 CSV.
pub fn write_table<W: Write>(writer: W, table: &ExportTable) -> Result<(), DecodeError> {
    let mut writer = csv::Writer::from_writer(writer);
    writer
        .write_record(&table.headers)
        .map_err(DecodeError::Encode)?;
    for row in &table.rows {
        writer.write_record(row).map_err(DecodeError::Encode)?;
    }
    writer
        .flush()
        .map_err(|e| DecodeError::Encode(csv::Error::from(e)))?;
    Ok(())
}

/// Writes a table to `path`, creating or truncating the file.
pub fn write_table_to_path(path: &Path, table: &ExportTable) -> Result<(), DecodeError> {
    let file = File::create(path).map_err(|e| DecodeError::WriteFile {
        path: path.to_path_buf(),
        source: e,
    })?;
    write_table(file, table)?;
    log::info!("Wrote {} rows to {}", table.rows.len(), path.display());
    Ok(())
}
