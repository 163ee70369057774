//! Common test utilities for integration tests.
//!
//! Provides a scripted export backend so coordinator lifecycles can be
//! exercised without a server and without shared global state.

// Allow dead code in this module - these are helper utilities that may not be
// used by all integration tests but are intentionally available.
#![allow(dead_code)]

use chrono::{Duration as ChronoDuration, Utc};
use std::collections::VecDeque;
use std::sync::Mutex;
use std::time::Duration;
use tokio::time::Instant;
use uuid::Uuid;

use domain::models::{ExportRequest, ExportStatus, ExportTask, ExportTaskStatus};
use partner_export_client::backend::ExportBackend;
use partner_export_client::error::ExportError;

/// One scripted reply to a status poll.
pub enum PollReply {
    Status(ExportTaskStatus),
    TransientError(String),
    /// Response that takes this long to arrive.
    Delayed(Duration, ExportTaskStatus),
}

/// Export backend driven by a scripted reply queue.
///
/// `submit` succeeds with a fresh job id unless a submission error is
/// configured. Each `status` call consumes one scripted reply; an exhausted
/// script keeps answering PROCESSING so polling continues.
pub struct ScriptedBackend {
    submit_error: Option<String>,
    replies: Mutex<VecDeque<PollReply>>,
    pub submitted: Mutex<Vec<ExportRequest>>,
    /// (virtual instant, export id) per status call.
    pub polls: Mutex<Vec<(Instant, String)>>,
    pub fetched: Mutex<Vec<String>>,
    file_bytes: Vec<u8>,
}

impl ScriptedBackend {
    pub fn new() -> Self {
        Self {
            submit_error: None,
            replies: Mutex::new(VecDeque::new()),
            submitted: Mutex::new(Vec::new()),
            polls: Mutex::new(Vec::new()),
            fetched: Mutex::new(Vec::new()),
            file_bytes: b"order_no,amount\nO-1,1200\n".to_vec(),
        }
    }

    /// Backend that rejects every submission with the given message.
    pub fn failing_submission(message: &str) -> Self {
        Self {
            submit_error: Some(message.to_string()),
            ..Self::new()
        }
    }

    pub fn push(&self, reply: PollReply) {
        self.replies.lock().unwrap().push_back(reply);
    }

    pub fn poll_count(&self) -> usize {
        self.polls.lock().unwrap().len()
    }

    pub fn processing(progress: u8, processed_rows: i64, total_rows: i64) -> ExportTaskStatus {
        ExportTaskStatus {
            status: ExportStatus::Processing,
            progress,
            processed_rows,
            total_rows,
            download_url: None,
            error: None,
            expires_at: None,
        }
    }

    pub fn queued() -> ExportTaskStatus {
        ExportTaskStatus {
            status: ExportStatus::Queued,
            progress: 0,
            processed_rows: 0,
            total_rows: 0,
            download_url: None,
            error: None,
            expires_at: None,
        }
    }

    pub fn completed(download_url: &str) -> ExportTaskStatus {
        ExportTaskStatus {
            status: ExportStatus::Completed,
            progress: 100,
            processed_rows: 1200,
            total_rows: 1200,
            download_url: Some(download_url.to_string()),
            error: None,
            expires_at: Some(Utc::now() + ChronoDuration::hours(24)),
        }
    }

    pub fn completed_with_expiry(
        download_url: &str,
        expires_at: chrono::DateTime<Utc>,
    ) -> ExportTaskStatus {
        ExportTaskStatus {
            expires_at: Some(expires_at),
            ..Self::completed(download_url)
        }
    }

    pub fn failed(error: &str) -> ExportTaskStatus {
        ExportTaskStatus {
            status: ExportStatus::Failed,
            progress: 0,
            processed_rows: 0,
            total_rows: 0,
            download_url: None,
            error: Some(error.to_string()),
            expires_at: None,
        }
    }
}

#[async_trait::async_trait]
impl ExportBackend for ScriptedBackend {
    async fn submit(&self, request: &ExportRequest) -> Result<ExportTask, ExportError> {
        self.submitted.lock().unwrap().push(request.clone());

        if let Some(message) = &self.submit_error {
            return Err(ExportError::Submission(message.clone()));
        }

        Ok(ExportTask {
            export_id: format!("export_{}", Uuid::new_v4().simple()),
            status: ExportStatus::Queued,
            estimated_time: 5,
            created_at: Utc::now(),
            message: None,
        })
    }

    async fn status(&self, export_id: &str) -> Result<ExportTaskStatus, ExportError> {
        self.polls
            .lock()
            .unwrap()
            .push((Instant::now(), export_id.to_string()));

        let reply = self.replies.lock().unwrap().pop_front();
        match reply {
            Some(PollReply::Status(status)) => Ok(status),
            Some(PollReply::TransientError(message)) => Err(ExportError::Backend(message)),
            Some(PollReply::Delayed(delay, status)) => {
                tokio::time::sleep(delay).await;
                Ok(status)
            }
            None => Ok(Self::processing(99, 0, 0)),
        }
    }

    async fn fetch(&self, download_url: &str) -> Result<Vec<u8>, ExportError> {
        self.fetched.lock().unwrap().push(download_url.to_string());
        Ok(self.file_bytes.clone())
    }
}
