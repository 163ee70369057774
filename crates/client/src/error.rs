//! Export client error taxonomy.
//!
//! Backend-reported messages pass through unmodified; the client performs
//! no interpretation or remapping. Nothing here is fatal to the process:
//! every failure is scoped to a single export job and recoverable through
//! `reset()` plus a new `start_export()`.

use chrono::{DateTime, Utc};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ExportError {
    /// Export request rejected or unreachable at creation time. No job was
    /// created; the message is the backend's, verbatim.
    #[error("{0}")]
    Submission(String),

    /// The backend reported the job FAILED; carries its `error` field
    /// verbatim.
    #[error("{0}")]
    Backend(String),

    /// Transient polling failures exceeded the retry budget.
    #[error("Polling failed after {attempts} attempts: {message}")]
    PollExhausted { attempts: u32, message: String },

    /// The download link's validity deadline has passed.
    #[error("Download link expired at {0}")]
    DownloadExpired(DateTime<Utc>),

    /// Fetching or persisting the export file failed.
    #[error("Download failed: {0}")]
    Download(String),

    /// Local validation rejected the request before submission.
    #[error("Invalid export request: {0}")]
    InvalidRequest(String),

    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl From<validator::ValidationErrors> for ExportError {
    fn from(errors: validator::ValidationErrors) -> Self {
        let mut details: Vec<String> = errors
            .field_errors()
            .iter()
            .flat_map(|(field, errors)| {
                errors.iter().map(move |e| {
                    e.message
                        .clone()
                        .map(|m| m.to_string())
                        .unwrap_or_else(|| format!("Invalid value for {}", field))
                })
            })
            .collect();
        details.sort();
        ExportError::InvalidRequest(details.join("; "))
    }
}
