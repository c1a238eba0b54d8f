//! Narrative report: every area in detail, overall statistics, run commands

use std::fmt::Write;

use super::{diagnostic, km2, processing_seconds, rule, ReportError};
use crate::engine::{AreaResult, BatchReport};

pub fn render(report: &BatchReport) -> Result<String, ReportError> {
    let mut out = String::new();
    let heavy = rule('=');

    writeln!(out, "{}", heavy)?;
    writeln!(out, "SUMO TRAFFIC SCENARIOS - BATCH REPORT")?;
    writeln!(out, "{}", heavy)?;
    writeln!(out)?;
    writeln!(out, "Run ID: {}", report.run_id)?;
    writeln!(out, "Generated: {}", report.finished_at.format("%Y-%m-%d %H:%M:%S UTC"))?;
    writeln!(out, "Processing Time: {:.1}s", processing_seconds(report))?;
    writeln!(out)?;

    writeln!(out, "{}", heavy)?;
    writeln!(out, "COMPLETED AREAS")?;
    writeln!(out, "{}", heavy)?;
    writeln!(out)?;
    for (i, result) in report.all_entries().enumerate() {
        area_section(&mut out, i + 1, result)?;
    }

    let totals = &report.totals;
    writeln!(out, "{}", heavy)?;
    writeln!(out, "OVERALL STATISTICS")?;
    writeln!(out, "{}", heavy)?;
    writeln!(out)?;
    writeln!(
        out,
        "Total Areas Completed: {}/{}",
        totals.areas_completed,
        report.configured_areas()
    )?;
    writeln!(out, "Total Junctions: {}", totals.total_junctions)?;
    writeln!(out, "Total Road Segments: {}", totals.total_edges)?;
    writeln!(out, "Total Vehicles: {}", totals.total_vehicles)?;
    writeln!(out, "Total Coverage: {} km²", km2(report.completed_coverage_km2()))?;
    writeln!(out)?;

    writeln!(out, "{}", heavy)?;
    writeln!(out, "HOW TO RUN SIMULATIONS")?;
    writeln!(out, "{}", heavy)?;
    writeln!(out)?;
    for result in report.all_entries().filter(|r| r.is_success()) {
        if let Some(config) = result.config_path() {
            writeln!(out, "{}: sumo-gui -c {}", result.area_name, config.display())?;
        }
    }
    writeln!(out)?;
    writeln!(out, "{}", heavy)?;

    Ok(out)
}

fn area_section(out: &mut String, number: usize, result: &AreaResult) -> Result<(), ReportError> {
    writeln!(out, "{}. {}", number, result.area_name)?;
    writeln!(out, "   Status: {}", result.status)?;

    match &result.failure {
        Some(failure) => {
            writeln!(out, "   Failed Stage: {}", failure.stage)?;
            writeln!(out, "   Failure: {}", failure.kind)?;
            writeln!(out, "   Diagnostic: {}", diagnostic(&failure.diagnostic))?;
        }
        None => {
            writeln!(out, "   Junctions: {}", result.network_metrics.junction_count)?;
            writeln!(out, "   Road Segments: {}", result.network_metrics.edge_count)?;
            writeln!(out, "   Vehicles: {}", result.vehicle_count)?;
            if let Some(config) = result.config_path() {
                writeln!(out, "   Config: {}", config.display())?;
            }
        }
    }
    if let Some(coverage) = result.coverage_km2 {
        writeln!(out, "   Coverage: {} km²", km2(coverage))?;
    }
    if !result.key_roads.is_empty() {
        writeln!(out, "   Key Roads: {}", result.key_roads.join(" & "))?;
    }
    writeln!(out)?;
    Ok(())
}
