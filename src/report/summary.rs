//! Quick summary: what finished, what didn't, and what to do next

use std::fmt::Write;

use super::{km2, rule, ReportError};
use crate::engine::{BatchReport, FailureKind};

pub fn render(report: &BatchReport) -> Result<String, ReportError> {
    let mut out = String::new();
    let totals = &report.totals;
    let failed: Vec<_> = report.failed().collect();

    writeln!(out, "SUMO BATCH - QUICK SUMMARY")?;
    writeln!(out, "{}", rule('='))?;
    writeln!(out, "Run ID: {}", report.run_id)?;
    writeln!(out, "Generated: {}", report.finished_at.format("%Y-%m-%d %H:%M:%S UTC"))?;
    writeln!(out)?;

    if failed.is_empty() {
        writeln!(out, "Status: ✓ all {} areas completed", report.configured_areas())?;
    } else {
        writeln!(
            out,
            "Status: ✗ {}/{} areas completed, {} failed",
            totals.areas_completed,
            report.configured_areas(),
            failed.len()
        )?;
    }
    writeln!(out)?;

    writeln!(out, "Completed:")?;
    for result in report.all_entries().filter(|r| r.is_success()) {
        writeln!(
            out,
            "  ✓ {} - {} junctions, {} road segments, {} vehicles",
            result.area_name,
            result.network_metrics.junction_count,
            result.network_metrics.edge_count,
            result.vehicle_count
        )?;
    }

    if !failed.is_empty() {
        writeln!(out)?;
        writeln!(out, "Failed:")?;
        for result in &failed {
            match &result.failure {
                Some(f) => writeln!(out, "  ✗ {} - {}: {}", result.area_name, f.stage, f.kind)?,
                None => writeln!(out, "  ✗ {}", result.area_name)?,
            }
        }
    }

    writeln!(out)?;
    write!(out, "Coverage: {} km² completed", km2(report.completed_coverage_km2()))?;
    if failed.is_empty() {
        writeln!(out)?;
    } else {
        writeln!(out, ", {} km² pending", km2(report.pending_coverage_km2()))?;
    }
    writeln!(
        out,
        "Totals: {} junctions, {} road segments, {} vehicles",
        totals.total_junctions, totals.total_edges, totals.total_vehicles
    )?;

    if !failed.is_empty() {
        writeln!(out)?;
        writeln!(out, "Next steps:")?;
        for result in &failed {
            if let Some(f) = &result.failure {
                writeln!(out, "  - {}: {}", result.area_name, next_step(f.kind))?;
            }
        }
    }

    Ok(out)
}

fn next_step(kind: FailureKind) -> &'static str {
    match kind {
        FailureKind::InputMissing => "download the OSM extract into the work directory and rerun",
        FailureKind::ToolNotFound => "install SUMO or point `tools` in batch.yaml at the binaries",
        FailureKind::ToolExecutionFailed => "inspect the diagnostic in the full report",
        FailureKind::ToolTimedOut => "raise the stage timeout or use a smaller extract",
        FailureKind::OutputArtifactMissing => "check the work directory is writable and rerun",
    }
}
