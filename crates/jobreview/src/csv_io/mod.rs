//! CSV import with merge-by-id, and CSV export.

mod export;
mod import;

pub use export::{export_rows, write_table, write_table_to_path, ExportMode, ExportTable};
pub use import::{
    import_files, import_rows, import_tables, import_with_sibling_labels, labels_path_for,
    read_table, read_table_from_path, CsvTable, ImportedCollection, LABELS_FILE_NAME,
};
