//! Export backend abstraction.
//!
//! The coordinator talks to the backend only through this trait, so tests
//! can script job lifecycles without a server and without shared global
//! state.

pub mod http;

use domain::models::{ExportRequest, ExportTask, ExportTaskStatus};

use crate::error::ExportError;

pub use http::HttpExportBackend;

/// Backend contract consumed by the coordinator.
#[async_trait::async_trait]
pub trait ExportBackend: Send + Sync {
    /// Submit an export request. Returns the created task, initially QUEUED.
    async fn submit(&self, request: &ExportRequest) -> Result<ExportTask, ExportError>;

    /// Read the current status of a job. Safely repeatable.
    async fn status(&self, export_id: &str) -> Result<ExportTaskStatus, ExportError>;

    /// Fetch the bytes behind a completed job's download URL.
    async fn fetch(&self, download_url: &str) -> Result<Vec<u8>, ExportError>;
}
