//! Simulation configuration assembly
//!
//! Renders the (empty) additional-infrastructure file and the `.sumocfg`
//! run configuration from fixed templates. File references inside the
//! configuration are bare file names: every artifact of an area lives in the
//! same directory as its configuration.

use std::path::{Path, PathBuf};

use handlebars::Handlebars;
use serde::Serialize;
use tracing::{info, warn};

use super::error::AssembleError;
use super::result::{FailureKind, StageOutcome};
use super::stage::{clear_stale, AreaContext, Precondition, StageName, StageRun};
use crate::config::TrafficConfig;

const ADDITIONAL_TEMPLATE: &str = r#"<?xml version="1.0" encoding="UTF-8"?>
<additional xmlns:xsi="http://www.w3.org/2001/XMLSchema-instance" xsi:noNamespaceSchemaLocation="http://sumo.dlr.de/xsd/additional_file.xsd">
</additional>
"#;

const SUMOCFG_TEMPLATE: &str = r#"<?xml version="1.0" encoding="UTF-8"?>
<configuration xmlns:xsi="http://www.w3.org/2001/XMLSchema-instance" xsi:noNamespaceSchemaLocation="http://sumo.dlr.de/xsd/sumoConfiguration.xsd">
    <input>
        <net-file value="{{net_file}}"/>
        <route-files value="{{route_file}}"/>
        <additional-files value="{{additional_file}}"/>
    </input>
    <time>
        <begin value="{{begin}}"/>
        <end value="{{end}}"/>
    </time>
    <processing>
        <time-to-teleport value="{{teleport_timeout}}"/>
    </processing>
</configuration>
"#;

/// Values substituted into the configuration template
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ScenarioFiles {
    pub net_file: String,
    pub route_file: String,
    pub additional_file: String,
    pub begin: u32,
    pub end: u32,
    pub teleport_timeout: u32,
}

/// Compiled templates, shared by every area of a batch
pub struct ConfigTemplates {
    registry: Handlebars<'static>,
}

impl ConfigTemplates {
    pub fn new() -> Result<Self, handlebars::TemplateError> {
        let mut registry = Handlebars::new();
        registry.set_strict_mode(true);
        registry.register_template_string("additional", ADDITIONAL_TEMPLATE)?;
        registry.register_template_string("sumocfg", SUMOCFG_TEMPLATE)?;
        Ok(Self { registry })
    }

    pub fn render_additional(&self) -> Result<String, handlebars::RenderError> {
        self.registry.render("additional", &())
    }

    pub fn render_config(&self, files: &ScenarioFiles) -> Result<String, handlebars::RenderError> {
        self.registry.render("sumocfg", files)
    }
}

#[derive(Debug, Clone)]
pub struct AssembleStage {
    pub additional: PathBuf,
    pub config: PathBuf,
    pub files: ScenarioFiles,
    pub preconditions: Vec<Precondition>,
}

impl AssembleStage {
    pub fn new(ctx: &AreaContext, traffic: &TrafficConfig) -> Self {
        Self {
            additional: ctx.additional.clone(),
            config: ctx.config.clone(),
            files: ScenarioFiles {
                net_file: file_name(&ctx.network),
                route_file: file_name(&ctx.routes),
                additional_file: file_name(&ctx.additional),
                begin: traffic.begin,
                end: traffic.end,
                teleport_timeout: traffic.teleport_timeout,
            },
            preconditions: vec![
                Precondition::input(&ctx.network),
                Precondition::input(&ctx.routes),
            ],
        }
    }

    pub async fn run(&self, templates: &ConfigTemplates) -> StageRun {
        if let Some(failed) = StageRun::check(StageName::AssembleConfig, &self.preconditions) {
            return failed;
        }

        clear_stale(&self.additional).await;
        clear_stale(&self.config).await;

        if let Err(e) = self.write_all(templates).await {
            warn!("Could not assemble configuration: {}", e);
            return StageRun::failed(
                StageName::AssembleConfig,
                FailureKind::OutputArtifactMissing,
                StageOutcome::not_started(e.to_string()),
            );
        }

        info!("Config created: {}", self.config.display());
        StageRun::passed(StageOutcome::completed(Some(self.config.clone())))
    }

    async fn write_all(&self, templates: &ConfigTemplates) -> Result<(), AssembleError> {
        let additional = templates
            .render_additional()
            .map_err(|source| AssembleError::Render {
                template: "additional",
                source,
            })?;
        let config = templates
            .render_config(&self.files)
            .map_err(|source| AssembleError::Render {
                template: "sumocfg",
                source,
            })?;

        write(&self.additional, &additional).await?;
        write(&self.config, &config).await
    }
}

async fn write(path: &Path, content: &str) -> Result<(), AssembleError> {
    tokio::fs::write(path, content)
        .await
        .map_err(|source| AssembleError::Io {
            path: path.to_path_buf(),
            source,
        })
}

fn file_name(path: &Path) -> String {
    path.file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.display().to_string())
}
