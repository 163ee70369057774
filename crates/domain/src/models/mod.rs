//! Domain models for the Partner Console export client.

pub mod columns;
pub mod export;
pub mod filters;

pub use columns::{
    default_columns, normalize_columns, optional_columns, required_columns, ColumnFormat,
    ColumnSpec,
};
pub use export::{
    ExportFormat, ExportOptions, ExportRequest, ExportStatus, ExportTask, ExportTaskStatus,
    DEFAULT_EXPORT_ROWS, MAX_EXPORT_ROWS, SHEET_NAME_MAX_CHARS,
};
pub use filters::{AmountRange, DateRange, ExportFilters, RecordKind};
