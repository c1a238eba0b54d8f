//! Batch conversion engine
//!
//! This module contains:
//! - `invoker` - External tool invocation with timeouts
//! - `stage` - Stage plan, preconditions and tool stages
//! - `measure` - Junction and edge counting
//! - `assemble` - Simulation configuration rendering
//! - `pipeline` - Per-area stage sequencing
//! - `aggregator` - Totals over the baseline and successful areas
//! - `batch` - Sequential and bounded-parallel batch runner
//! - `result` - Stage, area, and batch result types
//! - `error` - Batch error types

pub mod aggregator;
pub mod assemble;
pub mod batch;
pub mod error;
pub mod invoker;
pub mod measure;
pub mod pipeline;
pub mod result;
pub mod stage;

pub use aggregator::{aggregate, ResultAggregator};
pub use assemble::{AssembleStage, ConfigTemplates, ScenarioFiles};
pub use batch::BatchRunner;
pub use error::{AssembleError, BatchError};
pub use invoker::{locate_tool, tail, ProcessInvoker, ToolInvoker};
pub use measure::NetworkMarkers;
pub use pipeline::AreaPipeline;
pub use result::{
    AreaResult, AreaStatus, ArtifactKind, BatchReport, FailureKind, NetworkMetrics, StageFailure,
    StageOutcome, StageRecord, Totals, EXIT_NO_STATUS, EXIT_TOOL_NOT_FOUND,
};
pub use stage::{plan, AreaContext, Precondition, Stage, StageName, StageRun, ToolStage};
