//! JSON output of batch reports.
//!
//! When `--report` is given, the [`BatchReport`] is serialized next to the
//! human-readable summary so other tooling can pick up saved paths and
//! failures:
//!
//! ```json
//! {
//!   "generated_at": "2024-03-05T09:08:07+08:00",
//!   "items": [
//!     { "url": "https://...", "status": "saved", "title": "Hello", "path": "blog/Hello.md" },
//!     { "url": "https://...", "status": "failed", "stage": "fetch", "error": "..." }
//!   ],
//!   "succeeded": 1,
//!   "failed": 1
//! }
//! ```

use chrono::Local;
use serde::Serialize;
use std::path::Path;
use tokio::fs;
use tracing::{error, info, instrument};

use crate::error::PipelineError;
use crate::models::BatchReport;

#[derive(Serialize)]
struct ReportFile<'a> {
    generated_at: String,
    #[serde(flatten)]
    report: &'a BatchReport,
}

/// Write a [`BatchReport`] as pretty-printed JSON, creating parent directories.
#[instrument(level = "info", skip_all, fields(path = %path.display()))]
pub async fn write_report(report: &BatchReport, path: &Path) -> Result<(), PipelineError> {
    let file = ReportFile {
        generated_at: Local::now().to_rfc3339(),
        report,
    };
    let json = serde_json::to_string_pretty(&file)
        .map_err(|e| PipelineError::filesystem(path, std::io::Error::other(e)))?;

    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        if let Err(e) = fs::create_dir_all(parent).await {
            error!(dir = %parent.display(), error = %e, "Failed to create report dir");
            return Err(PipelineError::filesystem(parent, e));
        }
    }

    fs::write(path, json)
        .await
        .map_err(|e| PipelineError::filesystem(path, e))?;
    info!(items = report.total(), "Wrote JSON report");
    Ok(())
}
