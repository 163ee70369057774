use anyhow::{bail, Context, Result};
use std::path::Path;
use std::sync::Arc;
use tracing::info;

use partner_export_client::backend::HttpExportBackend;
use partner_export_client::config::Config;
use partner_export_client::coordinator::{CoordinatorSettings, ExportCoordinator, ExportStep};
use partner_export_client::logging;

#[tokio::main]
async fn main() -> Result<()> {
    // Load .env file if present
    dotenvy::dotenv().ok();

    // Load configuration
    let config = Config::load()?;

    // Initialize logging
    logging::init_logging(&config.logging);

    info!(
        "Starting Partner Console export client v{}",
        env!("CARGO_PKG_VERSION")
    );

    let job = &config.export;
    let record_kind = job.record_kind()?;
    let format = job.format()?;
    let filters = job.filters()?;
    let columns = job.selected_columns()?;
    let options = job.options();

    let backend = Arc::new(HttpExportBackend::new(&config.backend)?);
    let coordinator = ExportCoordinator::new(
        backend,
        record_kind,
        CoordinatorSettings::from(&config.polling),
    );

    let mut steps = coordinator.subscribe();
    let task = coordinator
        .start_export(format, filters, &columns, options)
        .await?;
    info!(export_id = %task.export_id, "Waiting for export to finish");

    loop {
        steps
            .changed()
            .await
            .context("Export coordinator went away")?;
        let step = steps.borrow_and_update().clone();
        match step {
            ExportStep::Processing {
                progress,
                processed_rows,
                total_rows,
                ..
            } => {
                info!(progress, processed_rows, total_rows, "Export in progress");
            }
            ExportStep::Completed { .. } => {
                let saved = coordinator
                    .download_file(Path::new(&config.download.dir))
                    .await?;
                match saved {
                    Some(path) => info!(path = %path.display(), "Export downloaded"),
                    None => bail!("Completed export had nothing to download"),
                }
                return Ok(());
            }
            ExportStep::Error { message } => bail!("Export failed: {}", message),
            ExportStep::Config => {}
        }
    }
}
