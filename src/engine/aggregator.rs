//! Result aggregation
//!
//! Totals start from the baseline and grow by each successful area. Failed
//! areas are kept in the report but never contribute to totals.

use chrono::Utc;
use tracing::debug;
use uuid::Uuid;

use super::result::{AreaResult, BatchReport, Totals};
use crate::config::BaselineSpec;

pub struct ResultAggregator {
    run_id: String,
    started_at: chrono::DateTime<Utc>,
    baseline: AreaResult,
    results: Vec<AreaResult>,
    totals: Totals,
}

impl ResultAggregator {
    pub fn new(baseline: &BaselineSpec) -> Self {
        let baseline = AreaResult::baseline(baseline);
        let mut totals = Totals::default();
        totals.add(&baseline);
        Self {
            run_id: Uuid::new_v4().to_string(),
            started_at: Utc::now(),
            baseline,
            results: Vec::new(),
            totals,
        }
    }

    pub fn run_id(&self) -> &str {
        &self.run_id
    }

    pub fn totals(&self) -> Totals {
        self.totals
    }

    pub fn record(&mut self, result: AreaResult) {
        self.totals.add(&result);
        debug!(
            "Recorded {} ({}), {} areas completed",
            result.area_name, result.status, self.totals.areas_completed
        );
        self.results.push(result);
    }

    pub fn finish(self) -> BatchReport {
        BatchReport {
            run_id: self.run_id,
            started_at: self.started_at,
            finished_at: Utc::now(),
            baseline: self.baseline,
            area_results: self.results,
            totals: self.totals,
        }
    }
}

/// Aggregate already-collected results in the given order
pub fn aggregate(baseline: &BaselineSpec, results: impl IntoIterator<Item = AreaResult>) -> BatchReport {
    let mut aggregator = ResultAggregator::new(baseline);
    for result in results {
        aggregator.record(result);
    }
    aggregator.finish()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::result::{AreaStatus, NetworkMetrics};
    use std::collections::BTreeMap;

    fn area(name: &str, status: AreaStatus, junctions: u64, edges: u64, vehicles: u64) -> AreaResult {
        AreaResult {
            area_name: name.to_string(),
            status,
            failure: None,
            network_metrics: NetworkMetrics {
                junction_count: junctions,
                edge_count: edges,
            },
            vehicle_count: vehicles,
            coverage_km2: None,
            key_roads: Vec::new(),
            artifacts: BTreeMap::new(),
            stages: Vec::new(),
        }
    }

    #[test]
    fn test_baseline_only() {
        let report = aggregate(&BaselineSpec::default(), Vec::new());
        assert_eq!(
            report.totals,
            Totals {
                areas_completed: 1,
                total_junctions: 94,
                total_edges: 198,
                total_vehicles: 100,
            }
        );
        assert_eq!(report.configured_areas(), 1);
        assert!(report.all_succeeded());
    }

    #[test]
    fn test_failed_areas_excluded_from_totals() {
        let report = aggregate(
            &BaselineSpec::default(),
            vec![
                area("A", AreaStatus::Success, 85, 180, 100),
                area("B", AreaStatus::Failed, 40, 90, 100),
            ],
        );

        assert_eq!(
            report.totals,
            Totals {
                areas_completed: 2,
                total_junctions: 179,
                total_edges: 378,
                total_vehicles: 200,
            }
        );
        assert_eq!(report.configured_areas(), 3);
        assert!(!report.all_succeeded());
        assert_eq!(report.failed().count(), 1);
        // Failed areas remain in the report
        assert_eq!(report.area_results[1].area_name, "B");
    }

    #[test]
    fn test_totals_independent_of_order() {
        let results = vec![
            area("A", AreaStatus::Success, 85, 180, 100),
            area("B", AreaStatus::Failed, 0, 0, 100),
            area("C", AreaStatus::Success, 120, 260, 100),
        ];
        let mut reversed = results.clone();
        reversed.reverse();

        let forward = aggregate(&BaselineSpec::default(), results);
        let backward = aggregate(&BaselineSpec::default(), reversed);

        assert_eq!(forward.totals, backward.totals);
        assert_eq!(forward.area_results[0].area_name, "A");
        assert_eq!(backward.area_results[0].area_name, "C");
    }

    #[test]
    fn test_unique_run_ids() {
        let a = ResultAggregator::new(&BaselineSpec::default());
        let b = ResultAggregator::new(&BaselineSpec::default());
        assert_ne!(a.run_id(), b.run_id());
    }
}
