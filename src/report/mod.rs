//! Report rendering
//!
//! This module contains:
//! - `narrative` - Full text report, one section per area
//! - `summary` - Short decision summary
//! - `table` - Per-area CSV table
//!
//! Rendering is pure: the same `BatchReport` always renders to the same
//! text. Files are only touched by `write_reports`.

pub mod narrative;
pub mod summary;
pub mod table;

use std::path::{Path, PathBuf};

use tracing::info;

use crate::config::ReportFiles;
use crate::engine::BatchReport;

const RULE_WIDTH: usize = 80;

/// Longest diagnostic printed in text reports
const DIAGNOSTIC_WIDTH: usize = 200;

#[derive(Debug, thiserror::Error)]
pub enum ReportError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    #[error("Formatting error: {0}")]
    Format(#[from] std::fmt::Error),

    #[error("Table is not valid UTF-8: {0}")]
    Utf8(#[from] std::string::FromUtf8Error),
}

/// The three rendered report documents
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RenderedReports {
    pub narrative: String,
    pub summary: String,
    pub table: String,
}

pub fn render(report: &BatchReport) -> Result<RenderedReports, ReportError> {
    Ok(RenderedReports {
        narrative: narrative::render(report)?,
        summary: summary::render(report)?,
        table: table::render(report)?,
    })
}

/// Write all reports into `dir`, replacing existing files. Returns the
/// written paths in narrative, summary, table order.
pub fn write_reports(
    reports: &RenderedReports,
    dir: impl AsRef<Path>,
    names: &ReportFiles,
) -> Result<Vec<PathBuf>, ReportError> {
    let dir = dir.as_ref();
    std::fs::create_dir_all(dir)?;

    let mut written = Vec::with_capacity(3);
    for (name, content) in [
        (&names.narrative, &reports.narrative),
        (&names.summary, &reports.summary),
        (&names.table, &reports.table),
    ] {
        let path = dir.join(name);
        std::fs::write(&path, content)?;
        info!("Wrote {}", path.display());
        written.push(path);
    }
    Ok(written)
}

fn rule(c: char) -> String {
    std::iter::repeat(c).take(RULE_WIDTH).collect()
}

fn km2(value: f64) -> String {
    format!("{:.1}", value)
}

fn processing_seconds(report: &BatchReport) -> f64 {
    (report.finished_at - report.started_at).num_milliseconds() as f64 / 1000.0
}

fn diagnostic(text: &str) -> String {
    crate::engine::tail(text, DIAGNOSTIC_WIDTH)
}
