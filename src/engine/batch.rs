//! Batch runner
//!
//! Drives every selected area through an `AreaPipeline` and aggregates the
//! results. With `parallel(1)` areas run one after another; with a higher
//! limit a semaphore bounds the number of concurrent pipelines and a single
//! consumer restores registry order before recording results.
//!
//! ```rust,no_run
//! use sumo_batch::{BatchConfig, BatchRunner};
//!
//! # async fn demo() -> Result<(), sumo_batch::BatchError> {
//! let report = BatchRunner::new(BatchConfig::default())
//!     .parallel(4)
//!     .filter(|name| name != "Hebbal")
//!     .run()
//!     .await?;
//! println!("{} areas completed", report.totals.areas_completed);
//! # Ok(())
//! # }
//! ```

use std::collections::BTreeMap;
use std::sync::Arc;

use futures::future::join_all;
use tokio::sync::{mpsc, Semaphore};
use tracing::{info, warn};

use super::aggregator::ResultAggregator;
use super::error::BatchError;
use super::invoker::{ProcessInvoker, ToolInvoker};
use super::pipeline::AreaPipeline;
use super::result::{AreaResult, BatchReport};
use crate::config::{AreaSpec, BatchConfig};

pub struct BatchRunner {
    config: BatchConfig,
    max_concurrent: usize,
    invoker: Option<Arc<dyn ToolInvoker>>,
    filter: Option<Box<dyn Fn(&str) -> bool + Send + Sync>>,
}

impl BatchRunner {
    pub fn new(config: BatchConfig) -> Self {
        Self {
            max_concurrent: config.parallel,
            config,
            invoker: None,
            filter: None,
        }
    }

    pub fn parallel(mut self, max: usize) -> Self {
        self.max_concurrent = max;
        self
    }

    /// Replace the process-backed invoker
    pub fn invoker(mut self, invoker: Arc<dyn ToolInvoker>) -> Self {
        self.invoker = Some(invoker);
        self
    }

    /// Only process areas whose name passes `f`
    pub fn filter<F>(mut self, f: F) -> Self
    where
        F: Fn(&str) -> bool + Send + Sync + 'static,
    {
        self.filter = Some(Box::new(f));
        self
    }

    /// Areas that `run` will process, in registry order
    pub fn selected_areas(&self) -> Vec<AreaSpec> {
        self.config
            .areas
            .iter()
            .filter(|a| self.filter.as_ref().map(|f| f(&a.name)).unwrap_or(true))
            .cloned()
            .collect()
    }

    pub async fn run(self) -> Result<BatchReport, BatchError> {
        self.config.validate()?;

        let areas = self.selected_areas();
        if areas.len() < self.config.areas.len() {
            info!(
                "Selected {} of {} configured areas",
                areas.len(),
                self.config.areas.len()
            );
        }

        let invoker = self
            .invoker
            .clone()
            .unwrap_or_else(|| Arc::new(ProcessInvoker::new(self.config.diagnostic_limit)));
        let baseline = self.config.baseline.clone();
        let max_concurrent = self.max_concurrent.max(1);
        let pipeline = Arc::new(AreaPipeline::new(Arc::new(self.config), invoker)?);

        let mut aggregator = ResultAggregator::new(&baseline);
        info!(
            "Starting batch {} over {} areas (parallel: {})",
            aggregator.run_id(),
            areas.len(),
            max_concurrent
        );

        if max_concurrent == 1 || areas.len() <= 1 {
            for area in &areas {
                aggregator.record(pipeline.process(area).await);
            }
        } else {
            for result in run_concurrent(pipeline, areas, max_concurrent).await? {
                aggregator.record(result);
            }
        }

        let report = aggregator.finish();
        let totals = &report.totals;
        info!(
            "Batch finished: {}/{} areas completed, {} junctions, {} edges, {} vehicles",
            totals.areas_completed,
            report.configured_areas(),
            totals.total_junctions,
            totals.total_edges,
            totals.total_vehicles
        );
        Ok(report)
    }
}

async fn run_concurrent(
    pipeline: Arc<AreaPipeline>,
    areas: Vec<AreaSpec>,
    max_concurrent: usize,
) -> Result<Vec<AreaResult>, BatchError> {
    let semaphore = Arc::new(Semaphore::new(max_concurrent));
    let (tx, mut rx) = mpsc::channel::<(usize, AreaResult)>(areas.len());
    let names: Vec<String> = areas.iter().map(|a| a.name.clone()).collect();

    let mut handles = Vec::with_capacity(areas.len());
    for (index, area) in areas.into_iter().enumerate() {
        let sem = semaphore.clone();
        let pipeline = pipeline.clone();
        let tx = tx.clone();

        handles.push(tokio::spawn(async move {
            // The semaphore is never closed, so a permit always arrives
            let _permit = sem.acquire_owned().await.ok();
            let result = pipeline.process(&area).await;
            let _ = tx.send((index, result)).await;
        }));
    }
    drop(tx);

    // Single consumer: buffer early arrivals until their turn comes
    let mut ordered = Vec::with_capacity(names.len());
    let mut early: BTreeMap<usize, AreaResult> = BTreeMap::new();
    while let Some((index, result)) = rx.recv().await {
        early.insert(index, result);
        while let Some(next) = early.remove(&ordered.len()) {
            ordered.push(next);
        }
    }

    for joined in join_all(handles).await {
        joined?;
    }

    if ordered.len() < names.len() {
        let missing = names[ordered.len()].clone();
        warn!("No result received for {}", missing);
        return Err(BatchError::MissingResult(missing));
    }

    Ok(ordered)
}
