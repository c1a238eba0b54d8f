//! Batch configuration
//!
//! Configuration for a batch run, loaded from batch.yaml. Every field has a
//! default, so an empty document (or no file at all) reproduces the built-in
//! seven-area run:
//!
//! ```yaml
//! parallel: 2
//! work_dir: ./data
//! output_dir: ./reports
//!
//! tools:
//!   netconvert: /opt/sumo/bin/netconvert
//!   random_trips: /opt/sumo/tools/randomTrips.py
//!
//! timeouts:
//!   convert: 600
//!
//! traffic:
//!   end: 3600
//!   period: 2
//!   vehicles: 1800
//!
//! areas:
//!   - name: Hebbal
//!     source_file: hebbal.osm
//!     coverage_km2: 2.1
//! ```

use std::collections::{HashMap, HashSet};
use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};

use super::area::{default_registry, slugify, AreaSpec, BaselineSpec};

/// File looked up in the current directory when no config is given
pub const DEFAULT_CONFIG_FILE: &str = "batch.yaml";

const DEFAULT_SUMO_HOME: &str = "/usr/local/share/sumo";

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("YAML parse error in {file}: {error}")]
    Yaml {
        file: String,
        error: serde_yaml::Error,
    },

    #[error("Duplicate area name: {0}")]
    DuplicateArea(String),

    #[error("Areas {first} and {second} share the artifact name {slug}")]
    DuplicateSlug {
        first: String,
        second: String,
        slug: String,
    },

    #[error("Invalid configuration: {0}")]
    Invalid(String),
}

/// External executables invoked by the pipeline
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ToolsConfig {
    pub netconvert: String,
    pub duarouter: String,

    /// Interpreter for the trip synthesis script
    pub python: String,

    /// Explicit path to randomTrips.py; resolved from SUMO_HOME when unset
    pub random_trips: Option<PathBuf>,
}

impl Default for ToolsConfig {
    fn default() -> Self {
        Self {
            netconvert: "netconvert".to_string(),
            duarouter: "duarouter".to_string(),
            python: "python3".to_string(),
            random_trips: None,
        }
    }
}

impl ToolsConfig {
    pub fn random_trips_script(&self) -> PathBuf {
        if let Some(path) = &self.random_trips {
            return path.clone();
        }
        let sumo_home =
            std::env::var("SUMO_HOME").unwrap_or_else(|_| DEFAULT_SUMO_HOME.to_string());
        Path::new(&sumo_home).join("tools").join("randomTrips.py")
    }
}

/// Per-stage wall-clock budgets, in seconds
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct TimeoutsConfig {
    pub convert: u64,
    pub trips: u64,
    pub routes: u64,
}

impl Default for TimeoutsConfig {
    fn default() -> Self {
        Self {
            convert: 300,
            trips: 120,
            routes: 120,
        }
    }
}

impl TimeoutsConfig {
    pub fn convert(&self) -> Duration {
        Duration::from_secs(self.convert)
    }

    pub fn trips(&self) -> Duration {
        Duration::from_secs(self.trips)
    }

    pub fn routes(&self) -> Duration {
        Duration::from_secs(self.routes)
    }
}

/// Network conversion options beyond the fixed normalization flags
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct NetworkConfig {
    /// Only edges usable by this class are kept
    pub vehicle_class: String,

    /// e.g. `actuated`; netconvert's own default applies when unset
    pub tls_default_type: Option<String>,

    pub extra_args: Vec<String>,
}

impl Default for NetworkConfig {
    fn default() -> Self {
        Self {
            vehicle_class: "passenger".to_string(),
            tls_default_type: None,
            extra_args: Vec::new(),
        }
    }
}

/// Demand generation and simulation window
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct TrafficConfig {
    pub begin: u32,
    pub end: u32,

    /// Seconds between vehicle insertions
    pub period: f64,

    /// Configured vehicle count reported per area (not measured)
    pub vehicles: u64,

    /// Preference for trips starting/ending at the network fringe
    pub fringe_factor: f64,

    pub trip_attributes: String,
    pub vehicle_class: String,

    /// `time-to-teleport` written into every generated configuration
    pub teleport_timeout: u32,
}

impl Default for TrafficConfig {
    fn default() -> Self {
        Self {
            begin: 0,
            end: 1000,
            period: 10.0,
            vehicles: 100,
            fringe_factor: 10.0,
            trip_attributes: r#"departLane="best" departSpeed="max""#.to_string(),
            vehicle_class: "passenger".to_string(),
            teleport_timeout: 300,
        }
    }
}

/// Textual markers counted in the network artifact
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct MarkerConfig {
    pub junction: String,
    pub edge: String,
}

impl Default for MarkerConfig {
    fn default() -> Self {
        Self {
            junction: "<junction".to_string(),
            edge: "<edge".to_string(),
        }
    }
}

/// Names of the report files written to `output_dir`
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ReportFiles {
    pub narrative: String,
    pub summary: String,
    pub table: String,
}

impl Default for ReportFiles {
    fn default() -> Self {
        Self {
            narrative: "ALL_AREAS_COMPLETE_REPORT.txt".to_string(),
            summary: "Quick_Summary.txt".to_string(),
            table: "Area_Coverage_Details.csv".to_string(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BatchConfig {
    /// Number of areas processed at once; 1 runs strictly in sequence
    #[serde(default = "default_parallel")]
    pub parallel: usize,

    /// Where source extracts are read and artifacts are written
    #[serde(default = "default_dir")]
    pub work_dir: PathBuf,

    #[serde(default = "default_dir")]
    pub output_dir: PathBuf,

    /// Characters of tool output kept for failure records
    #[serde(default = "default_diagnostic_limit")]
    pub diagnostic_limit: usize,

    #[serde(default)]
    pub tools: ToolsConfig,

    #[serde(default)]
    pub timeouts: TimeoutsConfig,

    #[serde(default)]
    pub network: NetworkConfig,

    #[serde(default)]
    pub traffic: TrafficConfig,

    #[serde(default)]
    pub markers: MarkerConfig,

    #[serde(default)]
    pub reports: ReportFiles,

    #[serde(default = "default_registry")]
    pub areas: Vec<AreaSpec>,

    #[serde(default)]
    pub baseline: BaselineSpec,
}

fn default_parallel() -> usize {
    1
}

fn default_dir() -> PathBuf {
    PathBuf::from(".")
}

fn default_diagnostic_limit() -> usize {
    200
}

impl Default for BatchConfig {
    fn default() -> Self {
        Self {
            parallel: default_parallel(),
            work_dir: default_dir(),
            output_dir: default_dir(),
            diagnostic_limit: default_diagnostic_limit(),
            tools: ToolsConfig::default(),
            timeouts: TimeoutsConfig::default(),
            network: NetworkConfig::default(),
            traffic: TrafficConfig::default(),
            markers: MarkerConfig::default(),
            reports: ReportFiles::default(),
            areas: default_registry(),
            baseline: BaselineSpec::default(),
        }
    }
}

impl BatchConfig {
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path)?;
        Self::from_yaml(&content).map_err(|e| ConfigError::Yaml {
            file: path.display().to_string(),
            error: e,
        })
    }

    pub fn from_yaml(content: &str) -> Result<Self, serde_yaml::Error> {
        // An empty document deserializes as unit, not as an empty mapping
        if content.trim().is_empty() {
            return Ok(Self::default());
        }
        serde_yaml::from_str(content)
    }

    /// Check the invariants the pipeline relies on
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.parallel == 0 {
            return Err(ConfigError::Invalid("parallel must be at least 1".into()));
        }
        if self.traffic.period <= 0.0 {
            return Err(ConfigError::Invalid(
                "traffic.period must be positive".into(),
            ));
        }
        if self.traffic.end <= self.traffic.begin {
            return Err(ConfigError::Invalid(format!(
                "traffic.end ({}) must be after traffic.begin ({})",
                self.traffic.end, self.traffic.begin
            )));
        }
        if self.markers.junction.is_empty() || self.markers.edge.is_empty() {
            return Err(ConfigError::Invalid("markers must not be empty".into()));
        }

        let mut seen = HashSet::new();
        seen.insert(self.baseline.name.as_str());
        // Artifact paths derive from the slug, so two areas may not share one
        let mut slugs = HashMap::new();
        slugs.insert(slugify(&self.baseline.name), self.baseline.name.as_str());
        for area in &self.areas {
            if area.name.trim().is_empty() {
                return Err(ConfigError::Invalid("area name must not be empty".into()));
            }
            if !seen.insert(area.name.as_str()) {
                return Err(ConfigError::DuplicateArea(area.name.clone()));
            }
            let slug = area.slug();
            if let Some(first) = slugs.get(&slug) {
                return Err(ConfigError::DuplicateSlug {
                    first: first.to_string(),
                    second: area.name.clone(),
                    slug,
                });
            }
            slugs.insert(slug, area.name.as_str());
        }
        Ok(())
    }

    /// Source extract of an area, resolved against `work_dir`
    pub fn source_path(&self, area: &AreaSpec) -> PathBuf {
        if area.source_file.is_absolute() {
            area.source_file.clone()
        } else {
            self.work_dir.join(&area.source_file)
        }
    }

    pub fn area(&self, name: &str) -> Option<&AreaSpec> {
        self.areas.iter().find(|a| a.name == name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = BatchConfig::default();
        assert_eq!(config.parallel, 1);
        assert_eq!(config.areas.len(), 7);
        assert_eq!(config.traffic.vehicles, 100);
        assert_eq!(config.timeouts.convert(), Duration::from_secs(300));
        assert_eq!(config.baseline.junctions, 94);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_parse_empty_document() {
        let config = BatchConfig::from_yaml("").unwrap();
        assert_eq!(config.areas.len(), 7);
        assert_eq!(config.diagnostic_limit, 200);
    }

    #[test]
    fn test_parse_partial_sections() {
        let yaml = r#"
parallel: 3
traffic:
  end: 3600
  period: 2
timeouts:
  convert: 600
"#;
        let config = BatchConfig::from_yaml(yaml).unwrap();
        assert_eq!(config.parallel, 3);
        assert_eq!(config.traffic.end, 3600);
        assert_eq!(config.traffic.period, 2.0);
        // Untouched fields keep their defaults
        assert_eq!(config.traffic.vehicles, 100);
        assert_eq!(config.timeouts.convert, 600);
        assert_eq!(config.timeouts.trips, 120);
        assert_eq!(config.tools.netconvert, "netconvert");
    }

    #[test]
    fn test_explicit_areas_replace_registry() {
        let yaml = r#"
areas:
  - name: Alpha
    source_file: alpha.osm
"#;
        let config = BatchConfig::from_yaml(yaml).unwrap();
        assert_eq!(config.areas.len(), 1);
        assert!(config.area("Alpha").is_some());
        assert!(config.area("Hebbal").is_none());
    }

    #[test]
    fn test_duplicate_area_rejected() {
        let mut config = BatchConfig::default();
        config.areas.push(AreaSpec::new("Hebbal", "other.osm"));
        assert!(matches!(
            config.validate(),
            Err(ConfigError::DuplicateArea(name)) if name == "Hebbal"
        ));
    }

    #[test]
    fn test_area_clashing_with_baseline_rejected() {
        let mut config = BatchConfig::default();
        config.areas = vec![AreaSpec::new("Electronic City", "ec.osm")];
        assert!(matches!(
            config.validate(),
            Err(ConfigError::DuplicateArea(_))
        ));
    }

    #[test]
    fn test_zero_parallel_rejected() {
        let config = BatchConfig {
            parallel: 0,
            ..Default::default()
        };
        assert!(matches!(config.validate(), Err(ConfigError::Invalid(_))));
    }

    #[test]
    fn test_source_path_resolution() {
        let config = BatchConfig {
            work_dir: PathBuf::from("/data"),
            ..Default::default()
        };
        let relative = AreaSpec::new("A", "a.osm");
        let absolute = AreaSpec::new("B", "/elsewhere/b.osm");
        assert_eq!(config.source_path(&relative), PathBuf::from("/data/a.osm"));
        assert_eq!(
            config.source_path(&absolute),
            PathBuf::from("/elsewhere/b.osm")
        );
    }

    #[test]
    fn test_explicit_random_trips_script() {
        let tools = ToolsConfig {
            random_trips: Some(PathBuf::from("/opt/randomTrips.py")),
            ..Default::default()
        };
        assert_eq!(
            tools.random_trips_script(),
            PathBuf::from("/opt/randomTrips.py")
        );
    }
}
