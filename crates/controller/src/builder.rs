//! Builder for AgentPipeline.

use std::sync::Arc;

use xs_core::{
    traits::{ModelClient, ToolRegistry},
    types::Scenario,
    Error, Result,
};

use crate::pipeline::{AgentPipeline, DirectImage, PipelineConfig};
use crate::prompts;

/// Builder for constructing an AgentPipeline.
pub struct PipelineBuilder {
    scenario: Scenario,
    name: Option<String>,
    role: Option<String>,
    client: Option<Arc<dyn ModelClient>>,
    tools: Option<Arc<dyn ToolRegistry>>,
    direct: Option<DirectImage>,
    config: PipelineConfig,
}

impl PipelineBuilder {
    /// Create a new builder with the scenario's default name and role.
    pub fn new(scenario: Scenario) -> Self {
        Self {
            scenario,
            name: None,
            role: None,
            client: None,
            tools: None,
            direct: None,
            config: PipelineConfig::default(),
        }
    }

    /// Set the display name.
    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    /// Override the system role.
    pub fn with_role(mut self, role: impl Into<String>) -> Self {
        self.role = Some(role.into());
        self
    }

    /// Set the model client.
    pub fn with_client(mut self, client: Arc<dyn ModelClient>) -> Self {
        self.client = Some(client);
        self
    }

    /// Set the toolset.
    pub fn with_tools(mut self, tools: Arc<dyn ToolRegistry>) -> Self {
        self.tools = Some(tools);
        self
    }

    /// Role and answer cleanup for requests that carry an image.
    pub fn with_direct_image(mut self, role: impl Into<String>, finish: fn(&str) -> String) -> Self {
        self.direct = Some(DirectImage {
            role: role.into(),
            finish,
        });
        self
    }

    /// Set the configuration.
    pub fn with_config(mut self, config: PipelineConfig) -> Self {
        self.config = config;
        self
    }

    /// Build the pipeline. A model client is required.
    pub fn build(self) -> Result<AgentPipeline> {
        let client = self.client.ok_or_else(|| {
            Error::Config(format!("no model client for the {} pipeline", self.scenario))
        })?;

        Ok(AgentPipeline {
            scenario: self.scenario,
            name: self
                .name
                .unwrap_or_else(|| prompts::pipeline_name(self.scenario).to_string()),
            system_role: self
                .role
                .unwrap_or_else(|| prompts::system_role(self.scenario).to_string()),
            client,
            tools: self.tools,
            direct: self.direct,
            config: self.config,
        })
    }
}
