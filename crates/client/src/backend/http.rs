//! HTTP implementation of the export backend contract.

use reqwest::{Client, StatusCode};
use serde::Deserialize;
use std::time::Duration;
use tracing::debug;

use domain::models::{ExportRequest, ExportTask, ExportTaskStatus};

use crate::config::BackendConfig;
use crate::error::ExportError;

use super::ExportBackend;

/// Error body shape returned by the backend on non-2xx responses.
#[derive(Debug, Deserialize)]
struct ErrorBody {
    #[allow(dead_code)]
    error: String,
    message: String,
}

/// Export backend reached over HTTP.
pub struct HttpExportBackend {
    client: Client,
    base_url: String,
}

impl HttpExportBackend {
    /// Create a backend client from configuration.
    pub fn new(config: &BackendConfig) -> Result<Self, ExportError> {
        let client = Client::builder()
            .timeout(Duration::from_secs(config.request_timeout_secs))
            .build()?;

        Ok(Self {
            client,
            base_url: config.base_url.trim_end_matches('/').to_string(),
        })
    }

    fn endpoint(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    async fn error_message(response: reqwest::Response) -> String {
        let status = response.status();
        let body = response.bytes().await.unwrap_or_default();
        message_from_body(status, &body)
    }
}

/// Extract the backend's own message from an error body, falling back to
/// the HTTP status when the body is not the expected shape.
fn message_from_body(status: StatusCode, body: &[u8]) -> String {
    match serde_json::from_slice::<ErrorBody>(body) {
        Ok(parsed) => parsed.message,
        Err(_) => format!("Export backend returned {}", status),
    }
}

#[async_trait::async_trait]
impl ExportBackend for HttpExportBackend {
    async fn submit(&self, request: &ExportRequest) -> Result<ExportTask, ExportError> {
        let response = self
            .client
            .post(self.endpoint("/export"))
            .json(request)
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(ExportError::Submission(Self::error_message(response).await));
        }

        let task = response.json::<ExportTask>().await?;
        debug!(export_id = %task.export_id, "Export job created");
        Ok(task)
    }

    async fn status(&self, export_id: &str) -> Result<ExportTaskStatus, ExportError> {
        let response = self
            .client
            .get(self.endpoint(&format!("/export/{}/status", export_id)))
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(ExportError::Backend(Self::error_message(response).await));
        }

        Ok(response.json::<ExportTaskStatus>().await?)
    }

    async fn fetch(&self, download_url: &str) -> Result<Vec<u8>, ExportError> {
        let response = self.client.get(download_url).send().await?;

        if !response.status().is_success() {
            return Err(ExportError::Download(format!(
                "Download returned {}",
                response.status()
            )));
        }

        Ok(response.bytes().await?.to_vec())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_endpoint_strips_trailing_slash() {
        let backend = HttpExportBackend::new(&BackendConfig {
            base_url: "http://localhost:8080/api/".to_string(),
            request_timeout_secs: 5,
        })
        .unwrap();

        assert_eq!(
            backend.endpoint("/export"),
            "http://localhost:8080/api/export"
        );
        assert_eq!(
            backend.endpoint("/export/export_1/status"),
            "http://localhost:8080/api/export/export_1/status"
        );
    }

    #[test]
    fn test_message_from_body_uses_backend_message() {
        let body = br#"{"error": "validation_error", "message": "filters required"}"#;
        assert_eq!(
            message_from_body(StatusCode::BAD_REQUEST, body),
            "filters required"
        );
    }

    #[test]
    fn test_message_from_body_falls_back_to_status() {
        let message = message_from_body(StatusCode::BAD_GATEWAY, b"<html>oops</html>");
        assert!(message.contains("502"));
    }
}
