//! # SUMO Batch
//!
//! Batch conversion of OpenStreetMap extracts into runnable SUMO traffic
//! scenarios, one isolated pipeline per area, with consolidated reporting.
//!
//! ## Features
//!
//! - **Per-area pipelines** - convert, measure, synthesize trips, compute routes, assemble config
//! - **Failure isolation** - a failed area is recorded, never fatal to the batch
//! - **Bounded parallelism** - run several areas at once, reports stay in registry order
//! - **Reports** - narrative text, quick summary and a CSV table
//!
//! ## Pipeline
//!
//! Each area runs these stages in order, stopping at the first failure:
//!
//! - **source-check**: the OSM extract must exist
//! - **convert**: `netconvert` builds the road network
//! - **measure**: junction and edge counts
//! - **synthesize-trips**: `randomTrips.py` generates demand
//! - **compute-routes**: `duarouter` turns trips into routes
//! - **assemble-config**: the `.sumocfg` and additional file are written
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use sumo_batch::{report, BatchConfig, BatchRunner};
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let config = BatchConfig::load("batch.yaml")?;
//!     let reports = config.reports.clone();
//!     let output_dir = config.output_dir.clone();
//!
//!     let batch = BatchRunner::new(config).parallel(2).run().await?;
//!     let rendered = report::render(&batch)?;
//!     report::write_reports(&rendered, &output_dir, &reports)?;
//!
//!     println!(
//!         "{}/{} areas completed",
//!         batch.totals.areas_completed,
//!         batch.configured_areas()
//!     );
//!     Ok(())
//! }
//! ```

pub mod config;
pub mod engine;
pub mod report;

// Re-export main types
pub use config::{
    default_registry, AreaSpec, BaselineSpec, BatchConfig, ConfigError, DEFAULT_CONFIG_FILE,
};
pub use engine::{
    aggregate, AreaPipeline, AreaResult, AreaStatus, BatchError, BatchReport, BatchRunner,
    FailureKind, NetworkMetrics, ProcessInvoker, ResultAggregator, StageName, StageOutcome,
    ToolInvoker, Totals,
};
pub use report::{render, write_reports, RenderedReports, ReportError};

/// Prelude module for convenient imports
pub mod prelude {
    pub use crate::config::{AreaSpec, BaselineSpec, BatchConfig};
    pub use crate::engine::{
        AreaResult, AreaStatus, BatchError, BatchReport, BatchRunner, FailureKind, ProcessInvoker,
        StageName, StageOutcome, ToolInvoker, Totals,
    };
    pub use crate::report::{render, write_reports, RenderedReports};
}
