//! Stage, area, and batch result types

use std::collections::BTreeMap;
use std::fmt;
use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::stage::StageName;
use crate::config::BaselineSpec;

/// Exit code reported when the executable could not be spawned at all.
/// Negative, so it never collides with a real process status.
pub const EXIT_TOOL_NOT_FOUND: i32 = -127;

/// Exit code reported when the process ended without a status (killed by a
/// signal, timed out, or never started because of a precondition)
pub const EXIT_NO_STATUS: i32 = -1;

/// Why an area's pipeline stopped
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FailureKind {
    /// A required input file was absent
    InputMissing,
    /// The external binary (or script) is not available
    ToolNotFound,
    /// The tool ran and exited nonzero
    ToolExecutionFailed,
    /// The tool exceeded its time budget and was killed
    ToolTimedOut,
    /// The tool reported success but its artifact is not on disk
    OutputArtifactMissing,
}

impl FailureKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            FailureKind::InputMissing => "input missing",
            FailureKind::ToolNotFound => "tool not found",
            FailureKind::ToolExecutionFailed => "tool execution failed",
            FailureKind::ToolTimedOut => "tool timed out",
            FailureKind::OutputArtifactMissing => "output artifact missing",
        }
    }
}

impl fmt::Display for FailureKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Result of one tool invocation (or of a local stage standing in for one)
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StageOutcome {
    pub succeeded: bool,
    pub exit_code: i32,
    pub stdout_tail: String,
    pub stderr_tail: String,
    pub timed_out: bool,
    pub output_artifact: Option<PathBuf>,
}

impl StageOutcome {
    /// Successful local stage that produced `artifact`
    pub fn completed(artifact: Option<PathBuf>) -> Self {
        Self {
            succeeded: true,
            exit_code: 0,
            stdout_tail: String::new(),
            stderr_tail: String::new(),
            timed_out: false,
            output_artifact: artifact,
        }
    }

    /// Synthetic failure for a run that never started
    pub fn not_started(reason: impl Into<String>) -> Self {
        Self {
            succeeded: false,
            exit_code: EXIT_NO_STATUS,
            stdout_tail: String::new(),
            stderr_tail: reason.into(),
            timed_out: false,
            output_artifact: None,
        }
    }

    pub fn tool_not_found(command: &str) -> Self {
        Self {
            exit_code: EXIT_TOOL_NOT_FOUND,
            ..Self::not_started(format!("executable not found: {}", command))
        }
    }

    pub fn timed_out(limit_secs: f64, stdout_tail: String, stderr_tail: String) -> Self {
        let stderr_tail = if stderr_tail.is_empty() {
            format!("timed out after {}s", limit_secs)
        } else {
            stderr_tail
        };
        Self {
            succeeded: false,
            exit_code: EXIT_NO_STATUS,
            stdout_tail,
            stderr_tail,
            timed_out: true,
            output_artifact: None,
        }
    }

    /// Classify an unsuccessful outcome; `None` when the tool succeeded
    pub fn failure_kind(&self) -> Option<FailureKind> {
        if self.succeeded {
            None
        } else if self.timed_out {
            Some(FailureKind::ToolTimedOut)
        } else if self.exit_code == EXIT_TOOL_NOT_FOUND {
            Some(FailureKind::ToolNotFound)
        } else {
            Some(FailureKind::ToolExecutionFailed)
        }
    }

    /// Short text for failure records: stderr first, then stdout
    pub fn diagnostic(&self) -> String {
        if !self.stderr_tail.is_empty() {
            self.stderr_tail.clone()
        } else if !self.stdout_tail.is_empty() {
            self.stdout_tail.clone()
        } else {
            format!("exited with code {}", self.exit_code)
        }
    }
}

/// Where and why an area pipeline stopped
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StageFailure {
    pub stage: StageName,
    pub kind: FailureKind,
    pub diagnostic: String,
}

/// One executed stage, in execution order
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StageRecord {
    pub stage: StageName,
    pub outcome: StageOutcome,
    pub elapsed_ms: u64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum AreaStatus {
    Success,
    Failed,
}

impl fmt::Display for AreaStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AreaStatus::Success => f.write_str("Success"),
            AreaStatus::Failed => f.write_str("Failed"),
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct NetworkMetrics {
    pub junction_count: u64,
    pub edge_count: u64,
}

/// Files produced for one area
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ArtifactKind {
    Network,
    Trips,
    Routes,
    Additional,
    Config,
}

/// Outcome of processing one area
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AreaResult {
    pub area_name: String,
    pub status: AreaStatus,
    pub failure: Option<StageFailure>,
    pub network_metrics: NetworkMetrics,

    /// Configured vehicle count, not a measurement
    pub vehicle_count: u64,

    pub coverage_km2: Option<f64>,

    #[serde(default)]
    pub key_roads: Vec<String>,

    pub artifacts: BTreeMap<ArtifactKind, PathBuf>,
    pub stages: Vec<StageRecord>,
}

impl AreaResult {
    /// A trusted, already-completed area
    pub fn baseline(spec: &BaselineSpec) -> Self {
        let mut artifacts = BTreeMap::new();
        artifacts.insert(ArtifactKind::Config, spec.config_file.clone());
        Self {
            area_name: spec.name.clone(),
            status: AreaStatus::Success,
            failure: None,
            network_metrics: NetworkMetrics {
                junction_count: spec.junctions,
                edge_count: spec.edges,
            },
            vehicle_count: spec.vehicles,
            coverage_km2: spec.coverage_km2,
            key_roads: spec.key_roads.clone(),
            artifacts,
            stages: Vec::new(),
        }
    }

    pub fn is_success(&self) -> bool {
        self.status == AreaStatus::Success
    }

    pub fn failed_stage(&self) -> Option<StageName> {
        self.failure.as_ref().map(|f| f.stage)
    }

    pub fn artifact(&self, kind: ArtifactKind) -> Option<&Path> {
        self.artifacts.get(&kind).map(|p| p.as_path())
    }

    /// Simulation configuration to hand to `sumo`/`sumo-gui`
    pub fn config_path(&self) -> Option<&Path> {
        self.artifact(ArtifactKind::Config)
    }
}

/// Sums over the baseline and every successful area
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Totals {
    pub areas_completed: u64,
    pub total_junctions: u64,
    pub total_edges: u64,
    pub total_vehicles: u64,
}

impl Totals {
    /// Count `result` if, and only if, it succeeded
    pub fn add(&mut self, result: &AreaResult) {
        if !result.is_success() {
            return;
        }
        self.areas_completed += 1;
        self.total_junctions += result.network_metrics.junction_count;
        self.total_edges += result.network_metrics.edge_count;
        self.total_vehicles += result.vehicle_count;
    }
}

/// Everything one batch run produced
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BatchReport {
    pub run_id: String,
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
    pub baseline: AreaResult,

    /// In processing order
    pub area_results: Vec<AreaResult>,

    pub totals: Totals,
}

impl BatchReport {
    /// Processed areas plus the baseline
    pub fn configured_areas(&self) -> usize {
        self.area_results.len() + 1
    }

    /// Whether every processed area reached Success
    pub fn all_succeeded(&self) -> bool {
        self.area_results.iter().all(|r| r.is_success())
    }

    pub fn succeeded(&self) -> impl Iterator<Item = &AreaResult> {
        self.area_results.iter().filter(|r| r.is_success())
    }

    pub fn failed(&self) -> impl Iterator<Item = &AreaResult> {
        self.area_results.iter().filter(|r| !r.is_success())
    }

    /// Baseline first, then processed areas
    pub fn all_entries(&self) -> impl Iterator<Item = &AreaResult> {
        std::iter::once(&self.baseline).chain(self.area_results.iter())
    }

    /// Surface covered by completed areas (baseline included), in km²
    pub fn completed_coverage_km2(&self) -> f64 {
        self.all_entries()
            .filter(|r| r.is_success())
            .filter_map(|r| r.coverage_km2)
            .sum()
    }

    pub fn pending_coverage_km2(&self) -> f64 {
        self.failed().filter_map(|r| r.coverage_km2).sum()
    }
}
