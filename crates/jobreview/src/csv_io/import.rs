//! CSV decoding and merge-by-id import.

use std::fs::File;
use std::io::Read;
use std::path::{Path, PathBuf};

use crate::error::DecodeError;
use crate::record::{JobField, JobRecord, Row, ID_COLUMN, LABEL_COLUMN};

/// Name of the separate labels file in two-file mode.
pub const LABELS_FILE_NAME: &str = "labels.csv";

/// A decoded CSV file: header row plus one map per data row.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CsvTable {
    pub headers: Vec<String>,
    pub rows: Vec<Row>,
}

/// Result of an import: the records plus the column set to export them with.
#[derive(Debug, Clone, Default)]
pub struct ImportedCollection {
    pub records: Vec<JobRecord>,
    /// Feature headers, then any extra label-file headers, always including
    /// `label`.
    pub columns: Vec<String>,
    /// Feature rows without a usable id.
    pub skipped_rows: usize,
    /// Label rows whose id matched no feature row.
    pub dropped_labels: usize,
}

/// Decodes a CSV document with a header row. The header must contain `id`.
pub fn read_table<R: Read>(reader: R, source_name: &str) -> Result<CsvTable, DecodeError> {
    let csv_error = |source| DecodeError::Csv {
        source_name: source_name.to_string(),
        source,
    };

    let mut reader = csv::ReaderBuilder::new()
        .has_headers(true)
        .trim(csv::Trim::Headers)
        .from_reader(reader);

    let headers: Vec<String> = reader
        .headers()
        .map_err(csv_error)?
        .iter()
        .map(str::to_string)
        .collect();

    if !headers.iter().any(|h| h == ID_COLUMN) {
        return Err(DecodeError::MissingIdColumn {
            source_name: source_name.to_string(),
        });
    }

    let mut rows = Vec::new();
    for record in reader.records() {
        let record = record.map_err(csv_error)?;
        let row: Row = headers
            .iter()
            .cloned()
            .zip(record.iter().map(str::to_string))
            .collect();
        rows.push(row);
    }

    log::debug!(
        "Decoded {} rows with {} columns from {}",
        rows.len(),
        headers.len(),
        source_name
    );

    Ok(CsvTable { headers, rows })
}

/// Reads and decodes a CSV file.
pub fn read_table_from_path(path: &Path) -> Result<CsvTable, DecodeError> {
    let file = File::open(path).map_err(|e| DecodeError::ReadFile {
        path: path.to_path_buf(),
        source: e,
    })?;
    read_table(file, &path.display().to_string())
}

/// The `labels.csv` that sits next to a features file.
pub fn labels_path_for(features_path: &Path) -> PathBuf {
    features_path
        .parent()
        .map(|dir| dir.join(LABELS_FILE_NAME))
        .unwrap_or_else(|| PathBuf::from(LABELS_FILE_NAME))
}

/// Builds records from feature rows, optionally merging label rows by id.
///
/// Without label rows every feature row becomes a record as-is. With label
/// rows, records start with an empty label and each label row whose id
/// matches a record has its non-id fields merged in; label rows with no
/// matching record are dropped.
pub fn import_rows(feature_rows: Vec<Row>, label_rows: Option<Vec<Row>>) -> ImportedCollection {
    let mut collection = ImportedCollection::default();
    let merging = label_rows.is_some();

    for row in feature_rows {
        match JobRecord::from_row(row) {
            Some(mut record) => {
                if merging {
                    record.label = None;
                }
                collection.records.push(record);
            }
            None => collection.skipped_rows += 1,
        }
    }

    if collection.skipped_rows > 0 {
        log::warn!(
            "Skipped {} feature rows without an id",
            collection.skipped_rows
        );
    }

    if let Some(label_rows) = label_rows {
        collection.dropped_labels = merge_labels(&mut collection.records, label_rows);
    }

    collection
}

fn merge_labels(records: &mut [JobRecord], label_rows: Vec<Row>) -> usize {
    let positions: std::collections::HashMap<String, usize> = records
        .iter()
        .enumerate()
        .map(|(i, r)| (r.id.to_string(), i))
        .collect();

    let mut dropped = 0;
    for mut row in label_rows {
        let target = row
            .remove(ID_COLUMN)
            .and_then(|id| positions.get(id.trim()).copied());
        let Some(index) = target else {
            dropped += 1;
            continue;
        };
        let record = &mut records[index];
        for (column, value) in row {
            if let Some(field) = JobField::from_column(&column) {
                record.set_field(&field, Some(value));
            }
        }
    }

    if dropped > 0 {
        log::debug!("Dropped {} label rows with no matching job", dropped);
    }
    dropped
}

/// Imports decoded tables and computes the export column set.
pub fn import_tables(features: CsvTable, labels: Option<CsvTable>) -> ImportedCollection {
    let mut columns = features.headers;
    let label_rows = labels.map(|table| {
        for header in table.headers {
            if header != ID_COLUMN && !columns.contains(&header) {
                columns.push(header);
            }
        }
        table.rows
    });
    if !columns.iter().any(|c| c == LABEL_COLUMN) {
        columns.push(LABEL_COLUMN.to_string());
    }

    let mut collection = import_rows(features.rows, label_rows);
    collection.columns = columns;
    collection
}

/// Imports a features file and, if given, a labels file.
///
/// Both files are fully decoded before anything is built, so a decode
/// failure in either leaves nothing half-imported.
pub fn import_files(
    features_path: &Path,
    labels_path: Option<&Path>,
) -> Result<ImportedCollection, DecodeError> {
    let features = read_table_from_path(features_path)?;
    let labels = labels_path.map(read_table_from_path).transpose()?;
    let collection = import_tables(features, labels);

    log::info!(
        "Imported {} jobs from {}",
        collection.records.len(),
        features_path.display()
    );
    Ok(collection)
}

/// Two-file mode: imports `features_path` and merges the sibling
/// `labels.csv` when it exists.
pub fn import_with_sibling_labels(features_path: &Path) -> Result<ImportedCollection, DecodeError> {
    let labels_path = labels_path_for(features_path);
    if labels_path.is_file() && labels_path != features_path {
        import_files(features_path, Some(&labels_path))
    } else {
        import_files(features_path, None)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn row(pairs: &[(&str, &str)]) -> Row {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    #[test]
    fn test_merge_drops_unmatched_label_rows() {
        let features = vec![row(&[("id", "a"), ("title", "X")])];
        let labels = vec![
            row(&[("id", "a"), ("label", "Good")]),
            row(&[("id", "b"), ("label", "Bad")]),
        ];

        let collection = import_rows(features, Some(labels));
        assert_eq!(collection.records.len(), 1);
        let record = &collection.records[0];
        assert_eq!(record.id.as_str(), "a");
        assert_eq!(record.title, "X");
        assert_eq!(record.label.as_deref(), Some("Good"));
        assert_eq!(collection.dropped_labels, 1);
    }

    #[test]
    fn test_merge_seeds_empty_label() {
        let features = vec![
            row(&[("id", "a"), ("label", "Bad")]),
            row(&[("id", "b"), ("label", "Maybe")]),
        ];
        let labels = vec![row(&[("id", "b"), ("label", "Good")])];

        let collection = import_rows(features, Some(labels));
        assert_eq!(collection.records[0].label, None);
        assert_eq!(collection.records[1].label.as_deref(), Some("Good"));
    }

    #[test]
    fn test_single_source_keeps_rows_as_is() {
        let features = vec![
            row(&[("id", "a"), ("label", "Bad")]),
            row(&[("id", ""), ("title", "orphan")]),
        ];
        let collection = import_rows(features, None);
        assert_eq!(collection.records.len(), 1);
        assert_eq!(collection.records[0].label.as_deref(), Some("Bad"));
        assert_eq!(collection.skipped_rows, 1);
    }

    #[test]
    fn test_read_table_requires_id_column() {
        let err = read_table("title,label\nX,Good\n".as_bytes(), "inline").unwrap_err();
        assert!(matches!(err, DecodeError::MissingIdColumn { .. }));
    }

    #[test]
    fn test_read_table_rejects_ragged_rows() {
        let err = read_table("id,title\na,X,extra\n".as_bytes(), "inline").unwrap_err();
        assert!(matches!(err, DecodeError::Csv { .. }));
    }

    #[test]
    fn test_read_table_handles_quoted_fields() {
        let table = read_table(
            "id,title,snippet\na,\"Rust, async\",\"line one\nline two\"\n".as_bytes(),
            "inline",
        )
        .unwrap();
        assert_eq!(table.headers, vec!["id", "title", "snippet"]);
        assert_eq!(table.rows[0]["title"], "Rust, async");
        assert_eq!(table.rows[0]["snippet"], "line one\nline two");
    }

    #[test]
    fn test_import_tables_columns_include_label() {
        let features = read_table("id,title\na,X\n".as_bytes(), "features").unwrap();
        let collection = import_tables(features, None);
        assert_eq!(collection.columns, vec!["id", "title", "label"]);

        let features = read_table("id,title\na,X\n".as_bytes(), "features").unwrap();
        let labels = read_table("id,label,note\na,Good,ok\n".as_bytes(), "labels").unwrap();
        let collection = import_tables(features, Some(labels));
        assert_eq!(collection.columns, vec!["id", "title", "label", "note"]);
        assert_eq!(
            collection.records[0].extra.get("note").map(String::as_str),
            Some("ok")
        );
    }

    #[test]
    fn test_labels_path_for_sibling() {
        let path = labels_path_for(Path::new("/data/jobs.csv"));
        assert_eq!(path, PathBuf::from("/data/labels.csv"));
    }
}
