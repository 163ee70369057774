//! Export task domain models.
//!
//! An export job is created once, stays immutable, and is observed through
//! its polled status resource until it reaches a terminal state.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::str::FromStr;
use validator::Validate;

use super::columns::{normalize_columns, ColumnSpec};
use super::filters::ExportFilters;

/// Maximum rows any export may request.
pub const MAX_EXPORT_ROWS: u32 = 50_000;

/// Default row cap for a fresh export.
pub const DEFAULT_EXPORT_ROWS: u32 = 10_000;

/// Excel limits worksheet names to 31 characters.
pub const SHEET_NAME_MAX_CHARS: usize = 31;

/// Export file format.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum ExportFormat {
    #[default]
    Excel,
    Csv,
}

impl ExportFormat {
    /// File extension for saved exports, without the dot.
    pub fn extension(&self) -> &'static str {
        match self {
            ExportFormat::Excel => "xlsx",
            ExportFormat::Csv => "csv",
        }
    }
}

impl FromStr for ExportFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "excel" | "xlsx" => Ok(ExportFormat::Excel),
            "csv" => Ok(ExportFormat::Csv),
            _ => Err(format!("Unknown export format: {}", s)),
        }
    }
}

impl std::fmt::Display for ExportFormat {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ExportFormat::Excel => write!(f, "excel"),
            ExportFormat::Csv => write!(f, "csv"),
        }
    }
}

/// Backend-side job status.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ExportStatus {
    Queued,
    Processing,
    Completed,
    Failed,
}

impl ExportStatus {
    /// COMPLETED and FAILED admit no further transitions.
    pub fn is_terminal(&self) -> bool {
        matches!(self, ExportStatus::Completed | ExportStatus::Failed)
    }
}

impl FromStr for ExportStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_uppercase().as_str() {
            "QUEUED" => Ok(ExportStatus::Queued),
            "PROCESSING" => Ok(ExportStatus::Processing),
            "COMPLETED" => Ok(ExportStatus::Completed),
            "FAILED" => Ok(ExportStatus::Failed),
            _ => Err(format!("Unknown export status: {}", s)),
        }
    }
}

impl std::fmt::Display for ExportStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ExportStatus::Queued => write!(f, "QUEUED"),
            ExportStatus::Processing => write!(f, "PROCESSING"),
            ExportStatus::Completed => write!(f, "COMPLETED"),
            ExportStatus::Failed => write!(f, "FAILED"),
        }
    }
}

/// Caller-tunable output options.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct ExportOptions {
    pub include_header: bool,

    /// Append a summary block (totals, counts) after the data rows.
    pub include_stats: bool,

    /// Worksheet name, at most [`SHEET_NAME_MAX_CHARS`] characters.
    #[serde(skip_serializing_if = "Option::is_none")]
    #[validate(length(min = 1, max = 31, message = "Sheet name too long"))]
    pub sheet_name: Option<String>,

    /// Row cap, at most [`MAX_EXPORT_ROWS`].
    #[validate(range(min = 1, max = 50_000, message = "Row cap out of range"))]
    pub max_rows: u32,
}

impl Default for ExportOptions {
    fn default() -> Self {
        Self {
            include_header: true,
            include_stats: false,
            sheet_name: None,
            max_rows: DEFAULT_EXPORT_ROWS,
        }
    }
}

/// Request body submitted to the export backend.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExportRequest {
    pub format: ExportFormat,
    pub filters: ExportFilters,
    pub columns: Vec<ColumnSpec>,
    pub options: ExportOptions,
}

impl ExportRequest {
    /// Build a request, forcing the required column set for the filtered
    /// dataset regardless of the caller's selection.
    pub fn new(
        format: ExportFormat,
        filters: ExportFilters,
        selected_columns: &[ColumnSpec],
        options: ExportOptions,
    ) -> Self {
        let columns = normalize_columns(filters.record_kind, selected_columns);
        Self {
            format,
            filters,
            columns,
            options,
        }
    }
}

/// Creation-time result of a submitted export. Immutable once returned.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExportTask {
    pub export_id: String,
    pub status: ExportStatus,
    /// Advisory estimate in seconds.
    pub estimated_time: u64,
    pub created_at: DateTime<Utc>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

/// Polled status resource for one export job.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExportTaskStatus {
    pub status: ExportStatus,
    /// 0-100, non-decreasing while PROCESSING.
    pub progress: u8,
    pub processed_rows: i64,
    pub total_rows: i64,
    /// Present iff status == COMPLETED.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub download_url: Option<String>,
    /// Present iff status == FAILED.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    /// Download link validity deadline, only when COMPLETED.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub expires_at: Option<DateTime<Utc>>,
}

impl ExportTaskStatus {
    pub fn is_terminal(&self) -> bool {
        self.status.is_terminal()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::columns::{optional_columns, required_columns};
    use crate::models::filters::RecordKind;

    #[test]
    fn test_export_format_from_str() {
        assert_eq!(ExportFormat::from_str("excel").unwrap(), ExportFormat::Excel);
        assert_eq!(ExportFormat::from_str("xlsx").unwrap(), ExportFormat::Excel);
        assert_eq!(ExportFormat::from_str("CSV").unwrap(), ExportFormat::Csv);
        assert!(ExportFormat::from_str("pdf").is_err());
    }

    #[test]
    fn test_export_format_extension() {
        assert_eq!(ExportFormat::Excel.extension(), "xlsx");
        assert_eq!(ExportFormat::Csv.extension(), "csv");
    }

    #[test]
    fn test_export_status_terminal() {
        assert!(!ExportStatus::Queued.is_terminal());
        assert!(!ExportStatus::Processing.is_terminal());
        assert!(ExportStatus::Completed.is_terminal());
        assert!(ExportStatus::Failed.is_terminal());
    }

    #[test]
    fn test_export_status_wire_values() {
        assert_eq!(
            serde_json::to_value(ExportStatus::Queued).unwrap(),
            "QUEUED"
        );
        assert_eq!(
            serde_json::from_value::<ExportStatus>(serde_json::json!("PROCESSING")).unwrap(),
            ExportStatus::Processing
        );
    }

    #[test]
    fn test_export_status_from_str() {
        assert_eq!(
            ExportStatus::from_str("completed").unwrap(),
            ExportStatus::Completed
        );
        assert_eq!(
            ExportStatus::from_str("FAILED").unwrap(),
            ExportStatus::Failed
        );
        assert!(ExportStatus::from_str("EXPIRED").is_err());
    }

    #[test]
    fn test_export_options_defaults() {
        let options = ExportOptions::default();
        assert!(options.include_header);
        assert!(!options.include_stats);
        assert_eq!(options.max_rows, DEFAULT_EXPORT_ROWS);
        assert!(options.validate().is_ok());
    }

    #[test]
    fn test_export_options_rejects_row_cap_overflow() {
        let options = ExportOptions {
            max_rows: MAX_EXPORT_ROWS + 1,
            ..Default::default()
        };
        assert!(options.validate().is_err());
    }

    #[test]
    fn test_export_options_rejects_long_sheet_name() {
        let options = ExportOptions {
            sheet_name: Some("x".repeat(32)),
            ..Default::default()
        };
        assert!(options.validate().is_err());
    }

    #[test]
    fn test_request_columns_are_superset_of_required() {
        for kind in [
            RecordKind::Orders,
            RecordKind::MembershipCards,
            RecordKind::Partners,
            RecordKind::Settlements,
        ] {
            let request = ExportRequest::new(
                ExportFormat::Excel,
                ExportFilters::for_kind(kind),
                &optional_columns(kind),
                ExportOptions::default(),
            );
            for req in required_columns(kind) {
                assert!(
                    request.columns.iter().any(|c| c.field == req.field),
                    "missing required column {} for {}",
                    req.field,
                    kind
                );
            }
        }
    }

    #[test]
    fn test_task_status_wire_shape() {
        let status = ExportTaskStatus {
            status: ExportStatus::Completed,
            progress: 100,
            processed_rows: 1200,
            total_rows: 1200,
            download_url: Some("https://files.example.com/exports/a.xlsx".to_string()),
            error: None,
            expires_at: None,
        };
        let json = serde_json::to_value(&status).unwrap();
        assert_eq!(json["status"], "COMPLETED");
        assert_eq!(json["processedRows"], 1200);
        assert!(json.get("error").is_none());
    }

    #[test]
    fn test_task_deserializes_backend_payload() {
        let task: ExportTask = serde_json::from_str(
            r#"{
                "exportId": "export_9f2c",
                "status": "QUEUED",
                "estimatedTime": 15,
                "createdAt": "2026-08-08T09:30:00Z",
                "message": "queued"
            }"#,
        )
        .unwrap();
        assert_eq!(task.export_id, "export_9f2c");
        assert_eq!(task.status, ExportStatus::Queued);
        assert_eq!(task.estimated_time, 15);
    }
}
