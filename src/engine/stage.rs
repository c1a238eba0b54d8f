//! Pipeline stages
//!
//! A stage is one step of an area's pipeline together with its contract:
//! the files it needs before it may start and the artifact it must leave
//! behind. Tool stages wrap a `ToolInvoker` call; `Measure` and
//! `AssembleConfig` run in-process.

use std::fmt;
use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use super::assemble::AssembleStage;
use super::invoker::ToolInvoker;
use super::result::{FailureKind, StageFailure, StageOutcome};
use crate::config::{AreaSpec, BatchConfig};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum StageName {
    /// Source extract must exist before anything runs
    SourceCheck,
    Convert,
    Measure,
    SynthesizeTrips,
    ComputeRoutes,
    AssembleConfig,
}

impl StageName {
    pub fn as_str(&self) -> &'static str {
        match self {
            StageName::SourceCheck => "source-check",
            StageName::Convert => "convert",
            StageName::Measure => "measure",
            StageName::SynthesizeTrips => "synthesize-trips",
            StageName::ComputeRoutes => "compute-routes",
            StageName::AssembleConfig => "assemble-config",
        }
    }
}

impl fmt::Display for StageName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Per-area file locations
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AreaContext {
    pub area_name: String,
    pub source: PathBuf,
    pub network: PathBuf,
    pub trips: PathBuf,
    pub routes: PathBuf,
    pub additional: PathBuf,
    pub config: PathBuf,
}

impl AreaContext {
    pub fn new(spec: &AreaSpec, config: &BatchConfig) -> Self {
        let slug = spec.slug();
        let artifact = |suffix: &str| config.work_dir.join(format!("{}{}", slug, suffix));
        Self {
            area_name: spec.name.clone(),
            source: config.source_path(spec),
            network: artifact(".net.xml"),
            trips: artifact(".trips.xml"),
            routes: artifact(".rou.xml"),
            additional: artifact(".add.xml"),
            config: artifact(".sumocfg"),
        }
    }
}

/// A file that has to exist before a stage may start
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Precondition {
    pub path: PathBuf,

    /// Reported when the file is absent
    pub kind: FailureKind,
}

impl Precondition {
    pub fn input(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            kind: FailureKind::InputMissing,
        }
    }

    pub fn tool(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            kind: FailureKind::ToolNotFound,
        }
    }

    fn describe(&self) -> String {
        match self.kind {
            FailureKind::ToolNotFound => format!("tool not found: {}", self.path.display()),
            _ => format!("required file not found: {}", self.path.display()),
        }
    }
}

/// What running a single stage produced
#[derive(Debug, Clone)]
pub struct StageRun {
    pub outcome: StageOutcome,
    pub failure: Option<StageFailure>,
}

impl StageRun {
    pub fn passed(outcome: StageOutcome) -> Self {
        Self {
            outcome,
            failure: None,
        }
    }

    pub fn failed(stage: StageName, kind: FailureKind, outcome: StageOutcome) -> Self {
        let diagnostic = outcome.diagnostic();
        Self {
            outcome,
            failure: Some(StageFailure {
                stage,
                kind,
                diagnostic,
            }),
        }
    }

    /// Fails with `stage` when any precondition is unmet, before any work happens
    pub fn check(stage: StageName, preconditions: &[Precondition]) -> Option<Self> {
        preconditions
            .iter()
            .find(|p| !p.path.exists())
            .map(|p| {
                warn!("{}: {}", stage, p.describe());
                Self::failed(stage, p.kind, StageOutcome::not_started(p.describe()))
            })
    }
}

/// A stage backed by an external command
#[derive(Debug, Clone)]
pub struct ToolStage {
    pub name: StageName,
    pub command: String,
    pub args: Vec<String>,
    pub output: PathBuf,
    pub preconditions: Vec<Precondition>,
    pub timeout: Duration,
}

impl ToolStage {
    pub async fn run(&self, invoker: &dyn ToolInvoker) -> StageRun {
        if let Some(failed) = StageRun::check(self.name, &self.preconditions) {
            return failed;
        }

        clear_stale(&self.output).await;

        let mut outcome = invoker
            .invoke(&self.command, &self.args, self.timeout)
            .await;

        if let Some(kind) = outcome.failure_kind() {
            return StageRun::failed(self.name, kind, outcome);
        }

        // A zero exit is necessary, not sufficient
        if !self.output.exists() {
            warn!(
                "{} exited successfully but {} is missing",
                self.command,
                self.output.display()
            );
            outcome.succeeded = false;
            outcome.stderr_tail = format!(
                "{} exited successfully but did not produce {}",
                self.command,
                self.output.display()
            );
            return StageRun::failed(self.name, FailureKind::OutputArtifactMissing, outcome);
        }

        outcome.output_artifact = Some(self.output.clone());
        StageRun::passed(outcome)
    }
}

/// Remove an artifact left by an earlier run so only this run's output counts
pub(crate) async fn clear_stale(path: &Path) {
    match tokio::fs::remove_file(path).await {
        Ok(()) => debug!("Removed stale {}", path.display()),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
        Err(e) => warn!("Could not remove stale {}: {}", path.display(), e),
    }
}

/// One entry of an area's stage plan
#[derive(Debug, Clone)]
pub enum Stage {
    Tool(ToolStage),
    Measure { network: PathBuf },
    Assemble(AssembleStage),
}

impl Stage {
    pub fn name(&self) -> StageName {
        match self {
            Stage::Tool(t) => t.name,
            Stage::Measure { .. } => StageName::Measure,
            Stage::Assemble(_) => StageName::AssembleConfig,
        }
    }
}

/// Build the fixed stage sequence for one area
pub fn plan(ctx: &AreaContext, config: &BatchConfig) -> Vec<Stage> {
    vec![
        Stage::Tool(convert_stage(ctx, config)),
        Stage::Measure {
            network: ctx.network.clone(),
        },
        Stage::Tool(trips_stage(ctx, config)),
        Stage::Tool(routes_stage(ctx, config)),
        Stage::Assemble(AssembleStage::new(ctx, &config.traffic)),
    ]
}

fn path_arg(path: &Path) -> String {
    path.display().to_string()
}

pub fn convert_stage(ctx: &AreaContext, config: &BatchConfig) -> ToolStage {
    let mut args = vec![
        "--osm-files".to_string(),
        path_arg(&ctx.source),
        "--output-file".to_string(),
        path_arg(&ctx.network),
        "--geometry.remove".to_string(),
        "--ramps.guess".to_string(),
        "--junctions.join".to_string(),
        "--tls.guess-signals".to_string(),
        "--tls.discard-simple".to_string(),
        "--tls.join".to_string(),
    ];
    if let Some(tls_type) = &config.network.tls_default_type {
        args.push("--tls.default-type".to_string());
        args.push(tls_type.clone());
    }
    args.extend([
        "--remove-edges.isolated".to_string(),
        "--keep-edges.by-vclass".to_string(),
        config.network.vehicle_class.clone(),
    ]);
    args.extend(config.network.extra_args.iter().cloned());

    ToolStage {
        name: StageName::Convert,
        command: config.tools.netconvert.clone(),
        args,
        output: ctx.network.clone(),
        preconditions: vec![Precondition::input(&ctx.source)],
        timeout: config.timeouts.convert(),
    }
}

pub fn trips_stage(ctx: &AreaContext, config: &BatchConfig) -> ToolStage {
    let traffic = &config.traffic;
    let script = config.tools.random_trips_script();
    let args = vec![
        path_arg(&script),
        "-n".to_string(),
        path_arg(&ctx.network),
        "-o".to_string(),
        path_arg(&ctx.trips),
        "-b".to_string(),
        traffic.begin.to_string(),
        "-e".to_string(),
        traffic.end.to_string(),
        "-p".to_string(),
        traffic.period.to_string(),
        "--fringe-factor".to_string(),
        traffic.fringe_factor.to_string(),
        "--trip-attributes".to_string(),
        traffic.trip_attributes.clone(),
        "--vehicle-class".to_string(),
        traffic.vehicle_class.clone(),
    ];

    ToolStage {
        name: StageName::SynthesizeTrips,
        command: config.tools.python.clone(),
        args,
        output: ctx.trips.clone(),
        preconditions: vec![Precondition::input(&ctx.network), Precondition::tool(script)],
        timeout: config.timeouts.trips(),
    }
}

pub fn routes_stage(ctx: &AreaContext, config: &BatchConfig) -> ToolStage {
    let args = vec![
        "-n".to_string(),
        path_arg(&ctx.network),
        "-t".to_string(),
        path_arg(&ctx.trips),
        "-o".to_string(),
        path_arg(&ctx.routes),
        "--ignore-errors".to_string(),
        "--no-warnings".to_string(),
        "--begin".to_string(),
        config.traffic.begin.to_string(),
        "--end".to_string(),
        config.traffic.end.to_string(),
    ];

    ToolStage {
        name: StageName::ComputeRoutes,
        command: config.tools.duarouter.clone(),
        args,
        output: ctx.routes.clone(),
        preconditions: vec![
            Precondition::input(&ctx.network),
            Precondition::input(&ctx.trips),
        ],
        timeout: config.timeouts.routes(),
    }
}
