//! JSON report output.
//!
//! Reports are grouped by the requested window:
//! ```text
//! json_output_dir/
//! └── 2025-01-16_2025-01-20.json
//! ```
//! A later run over the same window replaces the file.

use crate::models::DiscoveryReport;
use std::error::Error;
use std::path::{Path, PathBuf};
use tokio::fs;
use tracing::{error, info, instrument};

/// Path of the report file for a window.
pub fn report_path(json_output_dir: &str, report: &DiscoveryReport) -> PathBuf {
    Path::new(json_output_dir).join(format!("{}_{}.json", report.start_date, report.end_date))
}

/// Write a [`DiscoveryReport`] as pretty-printed JSON and return its path.
///
/// # Errors
///
/// Returns an error if serialization, directory creation or the write fails.
#[instrument(level = "info", skip_all, fields(json_output_dir = %json_output_dir))]
pub async fn write_report(report: &DiscoveryReport, json_output_dir: &str) -> Result<PathBuf, Box<dyn Error>> {
    let json = serde_json::to_string_pretty(report)?;

    if let Err(e) = fs::create_dir_all(json_output_dir).await {
        error!(error = %e, "Failed to create JSON dir");
        return Err(e.into());
    }

    let path = report_path(json_output_dir, report);
    fs::write(&path, json).await?;
    info!(path = %path.display(), articles = report.articles.len(), "Wrote discovery report");
    Ok(path)
}
