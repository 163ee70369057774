//! Download handoff for completed exports.
//!
//! Completed jobs hand back either a plain URL or, for small files, a
//! base64 `data:` URL inlined by the backend. Both end up as a file named
//! after the current date and the job's format.

use base64::{engine::general_purpose::STANDARD, Engine};
use chrono::{DateTime, Utc};
use std::path::{Path, PathBuf};
use tracing::info;

use domain::models::ExportFormat;

use crate::error::ExportError;

/// Deterministic filename for a saved export: date plus format extension.
pub fn export_filename(format: ExportFormat, now: DateTime<Utc>) -> String {
    format!(
        "partner_export_{}.{}",
        now.format("%Y%m%d"),
        format.extension()
    )
}

/// Whether a download URL carries its payload inline.
pub fn is_data_url(url: &str) -> bool {
    url.starts_with("data:")
}

/// Decode a base64 `data:` URL into its payload bytes.
pub fn decode_data_url(url: &str) -> Result<Vec<u8>, ExportError> {
    let rest = url
        .strip_prefix("data:")
        .ok_or_else(|| ExportError::Download("Not a data URL".to_string()))?;

    let (meta, payload) = rest
        .split_once(',')
        .ok_or_else(|| ExportError::Download("Malformed data URL".to_string()))?;

    if !meta.ends_with(";base64") {
        return Err(ExportError::Download(
            "Only base64 data URLs are supported".to_string(),
        ));
    }

    STANDARD
        .decode(payload)
        .map_err(|e| ExportError::Download(format!("Invalid base64 payload: {}", e)))
}

/// Write export bytes under `dir`, creating it if needed.
pub async fn save_export(dir: &Path, filename: &str, bytes: &[u8]) -> Result<PathBuf, ExportError> {
    tokio::fs::create_dir_all(dir).await?;

    let path = dir.join(filename);
    tokio::fs::write(&path, bytes).await?;

    info!(path = %path.display(), size = bytes.len(), "Export saved");
    Ok(path)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn test_export_filename_is_deterministic() {
        let when = Utc.with_ymd_and_hms(2026, 8, 8, 14, 30, 0).unwrap();
        assert_eq!(
            export_filename(ExportFormat::Excel, when),
            "partner_export_20260808.xlsx"
        );
        assert_eq!(
            export_filename(ExportFormat::Csv, when),
            "partner_export_20260808.csv"
        );
    }

    #[test]
    fn test_decode_data_url_roundtrip() {
        let payload = b"card_no,status\nC-1,ACTIVE\n";
        let url = format!("data:text/csv;base64,{}", STANDARD.encode(payload));

        assert!(is_data_url(&url));
        assert_eq!(decode_data_url(&url).unwrap(), payload);
    }

    #[test]
    fn test_decode_data_url_rejects_plain_urls() {
        assert!(!is_data_url("https://files.example.com/a.xlsx"));
        assert!(decode_data_url("https://files.example.com/a.xlsx").is_err());
        assert!(decode_data_url("data:text/csv,plain%20text").is_err());
        assert!(decode_data_url("data:text/csv;base64,!!!").is_err());
    }

    #[tokio::test]
    async fn test_save_export_writes_bytes() {
        let dir = tempfile::tempdir().unwrap();
        let nested = dir.path().join("exports");

        let path = save_export(&nested, "partner_export_20260808.csv", b"a,b\n1,2\n")
            .await
            .unwrap();

        assert_eq!(tokio::fs::read(&path).await.unwrap(), b"a,b\n1,2\n");
    }
}
