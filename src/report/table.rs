//! Per-area CSV table, baseline first

use serde::Serialize;

use super::{km2, ReportError};
use crate::engine::{AreaResult, BatchReport};

#[derive(Serialize)]
struct Row {
    #[serde(rename = "Area Name")]
    area_name: String,
    #[serde(rename = "Key Roads")]
    key_roads: String,
    #[serde(rename = "Status")]
    status: String,
    #[serde(rename = "Junctions")]
    junctions: Option<u64>,
    #[serde(rename = "Road Segments")]
    road_segments: Option<u64>,
    #[serde(rename = "Coverage (km²)")]
    coverage: String,
    #[serde(rename = "Vehicles")]
    vehicles: Option<u64>,
    #[serde(rename = "Failed Stage")]
    failed_stage: String,
    #[serde(rename = "Failure")]
    failure: String,
    #[serde(rename = "Config")]
    config: String,
}

impl Row {
    fn new(result: &AreaResult) -> Self {
        // Counts of failed areas are meaningless, leave them blank
        let measured = |value: u64| result.is_success().then_some(value);
        Self {
            area_name: result.area_name.clone(),
            key_roads: result.key_roads.join(" & "),
            status: result.status.to_string(),
            junctions: measured(result.network_metrics.junction_count),
            road_segments: measured(result.network_metrics.edge_count),
            coverage: result.coverage_km2.map(km2).unwrap_or_default(),
            vehicles: measured(result.vehicle_count),
            failed_stage: result
                .failed_stage()
                .map(|s| s.to_string())
                .unwrap_or_default(),
            failure: result
                .failure
                .as_ref()
                .map(|f| f.kind.to_string())
                .unwrap_or_default(),
            config: result
                .config_path()
                .map(|p| p.display().to_string())
                .unwrap_or_default(),
        }
    }
}

pub fn render(report: &BatchReport) -> Result<String, ReportError> {
    let mut writer = csv::Writer::from_writer(Vec::new());
    for result in report.all_entries() {
        writer.serialize(Row::new(result))?;
    }
    let bytes = writer
        .into_inner()
        .map_err(|e| ReportError::Io(e.into_error()))?;
    Ok(String::from_utf8(bytes)?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::BaselineSpec;
    use crate::engine::{aggregate, AreaStatus, FailureKind, StageFailure, StageName};
    use std::collections::BTreeMap;

    #[test]
    fn test_header_and_rows() {
        let failed = AreaResult {
            area_name: "MG Road".to_string(),
            status: AreaStatus::Failed,
            failure: Some(StageFailure {
                stage: StageName::SourceCheck,
                kind: FailureKind::InputMissing,
                diagnostic: "required file not found: mg_road.osm".to_string(),
            }),
            network_metrics: Default::default(),
            vehicle_count: 100,
            coverage_km2: Some(1.5),
            key_roads: vec!["Trinity Circle".to_string(), "Anil Kumble Circle".to_string()],
            artifacts: BTreeMap::new(),
            stages: Vec::new(),
        };
        let report = aggregate(&BaselineSpec::default(), vec![failed]);
        let table = render(&report).unwrap();
        let lines: Vec<_> = table.lines().collect();

        assert_eq!(
            lines[0],
            "Area Name,Key Roads,Status,Junctions,Road Segments,Coverage (km²),Vehicles,Failed Stage,Failure,Config"
        );
        assert_eq!(
            lines[1],
            "Electronic City,,Success,94,198,1.5,100,,,electronic_city.sumocfg"
        );
        assert_eq!(
            lines[2],
            "MG Road,Trinity Circle & Anil Kumble Circle,Failed,,,1.5,,source-check,input missing,"
        );
        assert_eq!(lines.len(), 3);
    }
}
