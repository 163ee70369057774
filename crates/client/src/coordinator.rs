//! Export lifecycle coordinator.
//!
//! Drives one export job from request to terminal state: submission,
//! fixed-interval status polling, completion/failure detection, and
//! download handoff. At most one polling loop is active per coordinator;
//! starting a new job supersedes the previous one, and teardown or reset
//! cancels polling outright. A status response that loses the race with
//! cancellation is discarded, never applied.

use chrono::{DateTime, Utc};
use metrics::counter;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::sync::watch;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};
use validator::Validate;

use domain::models::{
    default_columns, normalize_columns, ColumnSpec, ExportFilters, ExportFormat, ExportOptions,
    ExportRequest, ExportStatus, ExportTask, ExportTaskStatus, RecordKind,
};

use crate::backend::ExportBackend;
use crate::config::PollingConfig;
use crate::download;
use crate::error::ExportError;

/// Coordinator-local lifecycle state, distinct from the backend job status.
#[derive(Debug, Clone, PartialEq)]
pub enum ExportStep {
    /// Staging filters and columns; nothing submitted.
    Config,
    /// Job submitted; the polling loop advances this state.
    Processing {
        export_id: String,
        progress: u8,
        processed_rows: i64,
        total_rows: i64,
    },
    /// File ready for download until `expires_at`.
    Completed {
        export_id: String,
        download_url: String,
        expires_at: Option<DateTime<Utc>>,
    },
    /// Submission or job failure; `message` is the backend's, verbatim.
    Error { message: String },
}

impl ExportStep {
    pub fn name(&self) -> &'static str {
        match self {
            ExportStep::Config => "config",
            ExportStep::Processing { .. } => "processing",
            ExportStep::Completed { .. } => "completed",
            ExportStep::Error { .. } => "error",
        }
    }
}

/// Polling cadence and transient-failure budget.
#[derive(Debug, Clone, Copy)]
pub struct CoordinatorSettings {
    pub poll_interval: Duration,
    pub max_transient_failures: u32,
}

impl Default for CoordinatorSettings {
    fn default() -> Self {
        Self {
            poll_interval: Duration::from_millis(2000),
            max_transient_failures: 3,
        }
    }
}

impl From<&PollingConfig> for CoordinatorSettings {
    fn from(config: &PollingConfig) -> Self {
        Self {
            poll_interval: Duration::from_millis(config.interval_ms),
            max_transient_failures: config.max_transient_failures,
        }
    }
}

/// Job currently owned by the coordinator.
struct ActiveJob {
    export_id: String,
    format: ExportFormat,
    expires_at: Option<DateTime<Utc>>,
    cancel: CancellationToken,
}

struct Inner {
    job: Option<ActiveJob>,
    selected_columns: Vec<ColumnSpec>,
    options: ExportOptions,
}

struct Shared {
    backend: Arc<dyn ExportBackend>,
    record_kind: RecordKind,
    settings: CoordinatorSettings,
    step_tx: watch::Sender<ExportStep>,
    inner: Mutex<Inner>,
}

/// Coordinates the lifecycle of bulk exports for one dataset.
pub struct ExportCoordinator {
    shared: Arc<Shared>,
}

impl ExportCoordinator {
    /// Create a coordinator for the given dataset.
    pub fn new(
        backend: Arc<dyn ExportBackend>,
        record_kind: RecordKind,
        settings: CoordinatorSettings,
    ) -> Self {
        let (step_tx, _) = watch::channel(ExportStep::Config);
        Self {
            shared: Arc::new(Shared {
                backend,
                record_kind,
                settings,
                step_tx,
                inner: Mutex::new(Inner {
                    job: None,
                    selected_columns: default_columns(record_kind),
                    options: ExportOptions::default(),
                }),
            }),
        }
    }

    pub fn record_kind(&self) -> RecordKind {
        self.shared.record_kind
    }

    /// Observe step transitions. The receiver always holds the latest step.
    pub fn subscribe(&self) -> watch::Receiver<ExportStep> {
        self.shared.step_tx.subscribe()
    }

    /// Current step.
    pub fn step(&self) -> ExportStep {
        self.shared.step_tx.borrow().clone()
    }

    /// Currently staged column selection (required set always included).
    pub fn selected_columns(&self) -> Vec<ColumnSpec> {
        self.shared.lock().selected_columns.clone()
    }

    /// Currently staged output options.
    pub fn options(&self) -> ExportOptions {
        self.shared.lock().options.clone()
    }

    /// Stage a column selection. Omitted required columns are re-added.
    /// Only meaningful while configuring; ignored in any other step.
    pub fn update_selected_columns(&self, selected: &[ColumnSpec]) {
        if !matches!(self.step(), ExportStep::Config) {
            debug!("Column update ignored outside config step");
            return;
        }
        let mut inner = self.shared.lock();
        inner.selected_columns = normalize_columns(self.shared.record_kind, selected);
    }

    /// Stage output options. Only meaningful while configuring.
    pub fn update_options(&self, options: ExportOptions) {
        if !matches!(self.step(), ExportStep::Config) {
            debug!("Options update ignored outside config step");
            return;
        }
        self.shared.lock().options = options;
    }

    /// Submit an export and begin polling its status.
    ///
    /// The request always carries the full required column set for the
    /// dataset. A previous non-terminal job's polling loop is superseded.
    /// On submission failure the step becomes `error` with the backend's
    /// message and no polling starts.
    pub async fn start_export(
        &self,
        format: ExportFormat,
        filters: ExportFilters,
        selected_columns: &[ColumnSpec],
        options: ExportOptions,
    ) -> Result<ExportTask, ExportError> {
        if filters.record_kind != self.shared.record_kind {
            return Err(ExportError::InvalidRequest(format!(
                "This coordinator exports {}, not {}",
                self.shared.record_kind, filters.record_kind
            )));
        }
        filters.validate()?;
        options.validate()?;

        // Supersede any previous job before touching the backend.
        {
            let mut inner = self.shared.lock();
            if let Some(previous) = inner.job.take() {
                debug!(export_id = %previous.export_id, "Superseding active export job");
                previous.cancel.cancel();
            }
            inner.selected_columns =
                normalize_columns(self.shared.record_kind, selected_columns);
            inner.options = options.clone();
        }

        let request = ExportRequest::new(format, filters, selected_columns, options);

        let task = match self.shared.backend.submit(&request).await {
            Ok(task) => task,
            Err(e) => {
                let message = e.to_string();
                error!(error = %message, "Export submission failed");
                counter!("export_submissions_failed_total").increment(1);
                self.shared
                    .step_tx
                    .send_replace(ExportStep::Error { message });
                return Err(e);
            }
        };

        let cancel = CancellationToken::new();
        {
            let mut inner = self.shared.lock();
            if let Some(previous) = inner.job.replace(ActiveJob {
                export_id: task.export_id.clone(),
                format,
                expires_at: None,
                cancel: cancel.clone(),
            }) {
                previous.cancel.cancel();
            }
        }

        info!(
            export_id = %task.export_id,
            estimated_time = task.estimated_time,
            format = %format,
            "Export job submitted"
        );
        counter!("export_jobs_started_total").increment(1);

        self.shared.step_tx.send_replace(ExportStep::Processing {
            export_id: task.export_id.clone(),
            progress: 0,
            processed_rows: 0,
            total_rows: 0,
        });

        tokio::spawn(poll_job(
            Arc::clone(&self.shared),
            task.export_id.clone(),
            cancel,
        ));

        Ok(task)
    }

    /// Save a completed export under `dir`.
    ///
    /// A no-op (`Ok(None)`) unless the step is `completed` with a download
    /// URL. Refuses links whose validity deadline has passed. The filename
    /// derives from the current date and the job's format.
    pub async fn download_file(&self, dir: &Path) -> Result<Option<PathBuf>, ExportError> {
        let (url, format, expires_at) = {
            let inner = self.shared.lock();
            match (&*self.shared.step_tx.borrow(), inner.job.as_ref()) {
                (ExportStep::Completed { download_url, .. }, Some(job)) => {
                    (download_url.clone(), job.format, job.expires_at)
                }
                _ => {
                    debug!("Download requested outside completed step; ignoring");
                    return Ok(None);
                }
            }
        };

        if let Some(expires) = expires_at {
            if Utc::now() > expires {
                return Err(ExportError::DownloadExpired(expires));
            }
        }

        let bytes = if download::is_data_url(&url) {
            download::decode_data_url(&url)?
        } else {
            self.shared.backend.fetch(&url).await?
        };

        let filename = download::export_filename(format, Utc::now());
        let path = download::save_export(dir, &filename, &bytes).await?;
        Ok(Some(path))
    }

    /// Return to the configuring step from any state.
    ///
    /// Cancels polling, detaches from the backend job without cancelling it
    /// server-side, and restores the column selection to the required-only
    /// set. Staged options are kept.
    pub fn reset(&self) {
        let mut inner = self.shared.lock();
        if let Some(job) = inner.job.take() {
            debug!(export_id = %job.export_id, "Detaching from export job");
            job.cancel.cancel();
        }
        inner.selected_columns = default_columns(self.shared.record_kind);
        self.shared.step_tx.send_replace(ExportStep::Config);
        info!("Export coordinator reset");
    }
}

impl Drop for ExportCoordinator {
    fn drop(&mut self) {
        if let Ok(mut inner) = self.shared.inner.lock() {
            if let Some(job) = inner.job.take() {
                job.cancel.cancel();
            }
        }
    }
}

impl Shared {
    fn lock(&self) -> std::sync::MutexGuard<'_, Inner> {
        self.inner.lock().expect("coordinator state lock poisoned")
    }

    /// Fold one polled status into the step machine. Returns true when the
    /// job reached a terminal state and polling must stop.
    fn apply_status(&self, export_id: &str, status: ExportTaskStatus) -> bool {
        let mut inner = self.lock();

        // The job may have been superseded or reset while the response was
        // in flight; a stale update must not touch the step.
        let matches_current = inner
            .job
            .as_ref()
            .map(|job| job.export_id == export_id)
            .unwrap_or(false);
        if !matches_current {
            debug!(export_id = %export_id, "Dropping stale status update");
            return true;
        }

        match status.status {
            ExportStatus::Queued | ExportStatus::Processing => {
                self.step_tx.send_replace(ExportStep::Processing {
                    export_id: export_id.to_string(),
                    progress: status.progress,
                    processed_rows: status.processed_rows,
                    total_rows: status.total_rows,
                });
                false
            }
            ExportStatus::Completed => {
                match status.download_url {
                    Some(url) => {
                        if let Some(job) = inner.job.as_mut() {
                            job.expires_at = status.expires_at;
                        }
                        info!(
                            export_id = %export_id,
                            rows = status.processed_rows,
                            "Export job completed"
                        );
                        counter!("export_jobs_completed_total").increment(1);
                        self.step_tx.send_replace(ExportStep::Completed {
                            export_id: export_id.to_string(),
                            download_url: url,
                            expires_at: status.expires_at,
                        });
                    }
                    None => {
                        warn!(export_id = %export_id, "Completed status carried no download URL");
                        counter!("export_jobs_failed_total").increment(1);
                        inner.job = None;
                        self.step_tx.send_replace(ExportStep::Error {
                            message: "Export completed without a download URL".to_string(),
                        });
                    }
                }
                true
            }
            ExportStatus::Failed => {
                let message = status
                    .error
                    .unwrap_or_else(|| "Export failed".to_string());
                error!(export_id = %export_id, error = %message, "Export job failed");
                counter!("export_jobs_failed_total").increment(1);
                inner.job = None;
                self.step_tx.send_replace(ExportStep::Error { message });
                true
            }
        }
    }

    /// Transition to `error` after the transient-failure budget is spent.
    fn fail_polling(&self, export_id: &str, attempts: u32, message: String) {
        let mut inner = self.lock();
        let matches_current = inner
            .job
            .as_ref()
            .map(|job| job.export_id == export_id)
            .unwrap_or(false);
        if !matches_current {
            return;
        }
        inner.job = None;

        let error = ExportError::PollExhausted { attempts, message };
        error!(export_id = %export_id, error = %error, "Giving up on export job");
        counter!("export_jobs_failed_total").increment(1);
        self.step_tx.send_replace(ExportStep::Error {
            message: error.to_string(),
        });
    }
}

/// Polling loop for one job. Lives on the runtime until the job reaches a
/// terminal state or the token is cancelled, whichever comes first.
async fn poll_job(shared: Arc<Shared>, export_id: String, cancel: CancellationToken) {
    let mut interval = tokio::time::interval(shared.settings.poll_interval);

    // Skip the first immediate tick
    interval.tick().await;

    let mut failures: u32 = 0;
    loop {
        tokio::select! {
            biased;
            _ = cancel.cancelled() => {
                debug!(export_id = %export_id, "Polling cancelled");
                return;
            }
            _ = interval.tick() => {}
        }

        let result = tokio::select! {
            biased;
            _ = cancel.cancelled() => {
                debug!(export_id = %export_id, "Polling cancelled mid-request");
                return;
            }
            result = shared.backend.status(&export_id) => result,
        };

        match result {
            Ok(status) => {
                failures = 0;
                if shared.apply_status(&export_id, status) {
                    return;
                }
            }
            Err(e) => {
                failures += 1;
                warn!(
                    export_id = %export_id,
                    attempt = failures,
                    error = %e,
                    "Transient poll failure"
                );
                if failures >= shared.settings.max_transient_failures {
                    shared.fail_polling(&export_id, failures, e.to_string());
                    return;
                }
            }
        }
    }
}
