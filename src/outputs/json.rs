//! JSON report output.
//!
//! Each run writes one file under a directory named for the local date, so a
//! day's runs sort together and never overwrite each other.

use chrono::{DateTime, Local};
use serde::Serialize;
use std::error::Error;
use std::path::PathBuf;
use tokio::fs;
use tracing::{error, info, instrument};

/// Path of the report for a run started at `now`:
/// `{json_output_dir}/{YYYY-MM-DD}/{HH-MM-SS}.json`.
pub fn report_path(json_output_dir: &str, now: &DateTime<Local>) -> PathBuf {
    PathBuf::from(json_output_dir)
        .join(now.format("%Y-%m-%d").to_string())
        .join(format!("{}.json", now.format("%H-%M-%S")))
}

/// Serialize `report` and write it to [`report_path`], creating the date
/// directory as needed. Returns the path written.
#[instrument(level = "info", skip_all, fields(json_output_dir = %json_output_dir))]
pub async fn write_report<T: Serialize>(
    report: &T,
    json_output_dir: &str,
    now: &DateTime<Local>,
) -> Result<PathBuf, Box<dyn Error>> {
    let json = serde_json::to_string(report)?;
    let path = report_path(json_output_dir, now);

    if let Some(dir) = path.parent() {
        info!(dir = %dir.display(), "Ensuring JSON directory exists");
        if let Err(e) = fs::create_dir_all(dir).await {
            error!(dir = %dir.display(), error = %e, "Failed to create JSON dir");
            return Err(e.into());
        }
    }

    fs::write(&path, json).await?;
    info!(path = %path.display(), "Wrote JSON report");
    Ok(path)
}
