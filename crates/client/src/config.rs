use serde::Deserialize;
use std::str::FromStr;

use domain::models::{
    optional_columns, ColumnSpec, ExportFilters, ExportFormat, ExportOptions, RecordKind,
};

#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    pub backend: BackendConfig,

    #[serde(default)]
    pub polling: PollingConfig,

    #[serde(default)]
    pub download: DownloadConfig,

    #[serde(default)]
    pub logging: LoggingConfig,

    /// Export job driven by the `partner-export` binary.
    #[serde(default)]
    pub export: ExportJobConfig,
}

#[derive(Debug, Clone, Deserialize)]
pub struct BackendConfig {
    /// Base URL of the export backend, e.g. `https://console.example.com/api`.
    pub base_url: String,

    #[serde(default = "default_request_timeout")]
    pub request_timeout_secs: u64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct PollingConfig {
    #[serde(default = "default_poll_interval_ms")]
    pub interval_ms: u64,

    /// Consecutive transient poll failures tolerated before giving up.
    #[serde(default = "default_max_transient_failures")]
    pub max_transient_failures: u32,
}

impl Default for PollingConfig {
    fn default() -> Self {
        Self {
            interval_ms: default_poll_interval_ms(),
            max_transient_failures: default_max_transient_failures(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct DownloadConfig {
    #[serde(default = "default_download_dir")]
    pub dir: String,
}

impl Default for DownloadConfig {
    fn default() -> Self {
        Self {
            dir: default_download_dir(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct LoggingConfig {
    #[serde(default = "default_log_level")]
    pub level: String,

    #[serde(default = "default_log_format")]
    pub format: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            format: default_log_format(),
        }
    }
}

/// Declarative description of the export the binary runs.
#[derive(Debug, Clone, Deserialize)]
pub struct ExportJobConfig {
    #[serde(default = "default_record_kind")]
    pub record_kind: String,

    #[serde(default = "default_format")]
    pub format: String,

    /// Optional catalog columns to include on top of the required set,
    /// by field key.
    #[serde(default)]
    pub columns: Vec<String>,

    /// Record-status filter values; empty means all.
    #[serde(default)]
    pub statuses: Vec<String>,

    #[serde(default)]
    pub keyword: Option<String>,

    #[serde(default)]
    pub partner_no: Option<String>,

    #[serde(default = "default_max_rows")]
    pub max_rows: u32,

    #[serde(default)]
    pub sheet_name: Option<String>,
}

impl Default for ExportJobConfig {
    fn default() -> Self {
        Self {
            record_kind: default_record_kind(),
            format: default_format(),
            columns: Vec::new(),
            statuses: Vec::new(),
            keyword: None,
            partner_no: None,
            max_rows: default_max_rows(),
            sheet_name: None,
        }
    }
}

// Default value functions
fn default_request_timeout() -> u64 {
    30
}
fn default_poll_interval_ms() -> u64 {
    2000
}
fn default_max_transient_failures() -> u32 {
    3
}
fn default_download_dir() -> String {
    ".".to_string()
}
fn default_log_level() -> String {
    "info".to_string()
}
fn default_log_format() -> String {
    "pretty".to_string()
}
fn default_record_kind() -> String {
    "orders".to_string()
}
fn default_format() -> String {
    "excel".to_string()
}
fn default_max_rows() -> u32 {
    domain::models::DEFAULT_EXPORT_ROWS
}

/// Configuration validation error
#[derive(Debug, thiserror::Error)]
pub enum ConfigValidationError {
    #[error("Missing required configuration: {0}")]
    MissingRequired(String),

    #[error("Invalid configuration value: {0}")]
    InvalidValue(String),
}

impl Config {
    /// Load configuration from files and environment variables.
    ///
    /// Loading order (later sources override earlier):
    /// 1. config/default.toml - base configuration with defaults
    /// 2. config/local.toml - local overrides (optional, not in git)
    /// 3. Environment variables with PARTNER_EXPORT__ prefix
    pub fn load() -> Result<Self, config::ConfigError> {
        let config = config::Config::builder()
            .add_source(config::File::with_name("config/default").required(false))
            .add_source(config::File::with_name("config/local").required(false))
            .add_source(config::Environment::with_prefix("PARTNER_EXPORT").separator("__"))
            .build()?;

        let cfg: Self = config.try_deserialize()?;
        cfg.validate()
            .map_err(|e| config::ConfigError::Message(e.to_string()))?;
        Ok(cfg)
    }

    /// Load configuration for testing with custom overrides, without
    /// touching the filesystem.
    #[cfg(test)]
    pub fn load_for_test(overrides: &[(&str, &str)]) -> Result<Self, config::ConfigError> {
        let defaults = r#"
            [backend]
            base_url = "http://localhost:8080/api"
            request_timeout_secs = 30

            [polling]
            interval_ms = 2000
            max_transient_failures = 3

            [download]
            dir = "."

            [logging]
            level = "info"
            format = "pretty"

            [export]
            record_kind = "orders"
            format = "excel"
        "#;

        let mut builder = config::Config::builder()
            .add_source(config::File::from_str(defaults, config::FileFormat::Toml));

        for (key, value) in overrides {
            builder = builder.set_override(*key, *value)?;
        }

        builder.build()?.try_deserialize()
    }

    /// Validate configuration values.
    fn validate(&self) -> Result<(), ConfigValidationError> {
        if self.backend.base_url.is_empty() {
            return Err(ConfigValidationError::MissingRequired(
                "PARTNER_EXPORT__BACKEND__BASE_URL environment variable must be set".to_string(),
            ));
        }

        if self.polling.interval_ms == 0 {
            return Err(ConfigValidationError::InvalidValue(
                "Polling interval cannot be 0".to_string(),
            ));
        }

        if self.polling.max_transient_failures == 0 {
            return Err(ConfigValidationError::InvalidValue(
                "max_transient_failures cannot be 0".to_string(),
            ));
        }

        Ok(())
    }
}

impl ExportJobConfig {
    /// Dataset this job exports.
    pub fn record_kind(&self) -> Result<RecordKind, ConfigValidationError> {
        RecordKind::from_str(&self.record_kind).map_err(ConfigValidationError::InvalidValue)
    }

    /// Output format for this job.
    pub fn format(&self) -> Result<ExportFormat, ConfigValidationError> {
        ExportFormat::from_str(&self.format).map_err(ConfigValidationError::InvalidValue)
    }

    /// Build the typed filter payload.
    pub fn filters(&self) -> Result<ExportFilters, ConfigValidationError> {
        let mut filters = ExportFilters::for_kind(self.record_kind()?);
        filters.statuses = self.statuses.clone();
        filters.keyword = self.keyword.clone();
        filters.partner_no = self.partner_no.clone();
        Ok(filters)
    }

    /// Resolve configured field keys against the optional-column catalog.
    /// Unknown keys are rejected rather than silently dropped.
    pub fn selected_columns(&self) -> Result<Vec<ColumnSpec>, ConfigValidationError> {
        let catalog = optional_columns(self.record_kind()?);
        let mut selected = Vec::with_capacity(self.columns.len());
        for field in &self.columns {
            let column = catalog.iter().find(|c| &c.field == field).ok_or_else(|| {
                ConfigValidationError::InvalidValue(format!(
                    "Unknown optional column '{}' for {}",
                    field, self.record_kind
                ))
            })?;
            selected.push(column.clone());
        }
        Ok(selected)
    }

    /// Output options for this job.
    pub fn options(&self) -> ExportOptions {
        ExportOptions {
            sheet_name: self.sheet_name.clone(),
            max_rows: self.max_rows,
            ..Default::default()
        }
    }
}
