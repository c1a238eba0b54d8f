//! Batch error types
//!
//! Per-area failures are data (see `FailureKind`); these errors are the
//! faults that abort a whole batch.

use std::path::PathBuf;

use crate::config::ConfigError;

#[derive(Debug, thiserror::Error)]
pub enum BatchError {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("Template error: {0}")]
    Template(#[from] handlebars::TemplateError),

    #[error("Invalid network marker: {0}")]
    Marker(#[from] regex::Error),

    #[error("Area task failed: {0}")]
    Task(#[from] tokio::task::JoinError),

    #[error("No result received for area: {0}")]
    MissingResult(String),
}

/// Why a scenario configuration could not be written
#[derive(Debug, thiserror::Error)]
pub enum AssembleError {
    #[error("rendering {template}: {source}")]
    Render {
        template: &'static str,
        #[source]
        source: handlebars::RenderError,
    },

    #[error("writing {}: {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}
