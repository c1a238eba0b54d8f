//! Batch configuration types
//!
//! This module contains:
//! - `area` - AreaSpec, BaselineSpec and the built-in area registry
//! - `batch_config` - BatchConfig loaded from batch.yaml

pub mod area;
pub mod batch_config;

pub use area::{default_registry, AreaSpec, BaselineSpec, BoundingBox};
pub use batch_config::{
    BatchConfig, ConfigError, MarkerConfig, NetworkConfig, ReportFiles, TimeoutsConfig,
    ToolsConfig, TrafficConfig, DEFAULT_CONFIG_FILE,
};
