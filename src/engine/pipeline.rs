//! Per-area pipeline
//!
//! Runs the stage plan of one area in order, stopping at the first failed
//! stage. Areas never share artifacts, so pipelines for different areas can
//! run concurrently against the same `AreaPipeline`.

use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Instant;

use tracing::{error, info, instrument};

use super::assemble::ConfigTemplates;
use super::error::BatchError;
use super::invoker::ToolInvoker;
use super::measure::NetworkMarkers;
use super::result::{
    AreaResult, AreaStatus, ArtifactKind, NetworkMetrics, StageOutcome, StageRecord,
};
use super::stage::{plan, AreaContext, Precondition, Stage, StageName, StageRun};
use crate::config::{AreaSpec, BatchConfig};

pub struct AreaPipeline {
    config: Arc<BatchConfig>,
    invoker: Arc<dyn ToolInvoker>,
    markers: NetworkMarkers,
    templates: ConfigTemplates,
}

impl AreaPipeline {
    pub fn new(config: Arc<BatchConfig>, invoker: Arc<dyn ToolInvoker>) -> Result<Self, BatchError> {
        let markers = NetworkMarkers::new(&config.markers)?;
        let templates = ConfigTemplates::new()?;
        Ok(Self {
            config,
            invoker,
            markers,
            templates,
        })
    }

    pub fn config(&self) -> &BatchConfig {
        &self.config
    }

    /// Process one area end to end. Never fails: every problem becomes part
    /// of the returned `AreaResult`.
    #[instrument(skip(self, spec), fields(area = %spec.name))]
    pub async fn process(&self, spec: &AreaSpec) -> AreaResult {
        info!("Processing area: {}", spec.name);
        let ctx = AreaContext::new(spec, &self.config);

        let mut result = AreaResult {
            area_name: spec.name.clone(),
            status: AreaStatus::Failed,
            failure: None,
            network_metrics: NetworkMetrics::default(),
            vehicle_count: self.config.traffic.vehicles,
            coverage_km2: spec.coverage_km2,
            key_roads: spec.key_roads.clone(),
            artifacts: BTreeMap::new(),
            stages: Vec::new(),
        };

        let started = Instant::now();
        let source_check =
            StageRun::check(StageName::SourceCheck, &[Precondition::input(&ctx.source)])
                .unwrap_or_else(|| {
                    StageRun::passed(StageOutcome::completed(Some(ctx.source.clone())))
                });
        if !self.record(&mut result, StageName::SourceCheck, source_check, started) {
            return result;
        }

        for stage in plan(&ctx, &self.config) {
            let name = stage.name();
            let started = Instant::now();
            let run = self.run_stage(&stage, &mut result).await;
            if !self.record(&mut result, name, run, started) {
                return result;
            }
        }

        result.status = AreaStatus::Success;
        result.artifacts = BTreeMap::from([
            (ArtifactKind::Network, ctx.network),
            (ArtifactKind::Trips, ctx.trips),
            (ArtifactKind::Routes, ctx.routes),
            (ArtifactKind::Additional, ctx.additional),
            (ArtifactKind::Config, ctx.config),
        ]);

        info!(
            "Area {} complete: {} junctions, {} edges",
            spec.name, result.network_metrics.junction_count, result.network_metrics.edge_count
        );
        result
    }

    async fn run_stage(&self, stage: &Stage, result: &mut AreaResult) -> StageRun {
        match stage {
            Stage::Tool(tool) => tool.run(self.invoker.as_ref()).await,
            Stage::Measure { network } => {
                result.network_metrics = self.markers.measure(network).await;
                StageRun::passed(StageOutcome::completed(None))
            }
            Stage::Assemble(assemble) => assemble.run(&self.templates).await,
        }
    }

    /// Append the stage record; returns whether the pipeline may continue
    fn record(&self, result: &mut AreaResult, stage: StageName, run: StageRun, started: Instant) -> bool {
        result.stages.push(StageRecord {
            stage,
            outcome: run.outcome,
            elapsed_ms: started.elapsed().as_millis() as u64,
        });

        match run.failure {
            Some(failure) => {
                error!(
                    "Area {} failed at {} ({}): {}",
                    result.area_name, failure.stage, failure.kind, failure.diagnostic
                );
                result.failure = Some(failure);
                false
            }
            None => true,
        }
    }
}
