//! Pipeline registry: one pipeline per scenario, built once at startup.

use std::path::Path;
use std::sync::Arc;

use xs_core::{
    config::AppConfig,
    traits::{ModelClient, Pipeline, Tool, ToolRegistry},
    types::Scenario,
    Result,
};
use xs_skills::{
    ocr_answer, CreateImagesTool, DefaultToolRegistry, DownloadVideoTool, ImagesReaderTool,
    OcrImageTool, OCR_ROLE,
};

use crate::pipeline::{AgentPipeline, PipelineConfig};

/// Position of a scenario in `Scenario::ALL`.
fn slot(scenario: Scenario) -> usize {
    match scenario {
        Scenario::Text => 0,
        Scenario::Tool => 1,
        Scenario::Vision => 2,
        Scenario::Ocr => 3,
    }
}

/// Total table from scenario to pipeline. Read-only after construction.
pub struct PipelineRegistry {
    pipelines: [Arc<dyn Pipeline>; 4],
}

impl PipelineRegistry {
    /// Build a registry by asking `make` for each scenario's pipeline.
    pub fn from_fn<F>(make: F) -> Self
    where
        F: FnMut(Scenario) -> Arc<dyn Pipeline>,
    {
        Self {
            pipelines: Scenario::ALL.map(make),
        }
    }

    /// Pipeline serving a scenario.
    pub fn get(&self, scenario: Scenario) -> &Arc<dyn Pipeline> {
        &self.pipelines[slot(scenario)]
    }

    /// Model identifier configured for a scenario.
    pub fn model_for(&self, scenario: Scenario) -> &str {
        self.get(scenario).model_id()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Arc<dyn Pipeline>> {
        self.pipelines.iter()
    }
}

fn toolset(tools: &[&Arc<dyn Tool>]) -> Result<Arc<dyn ToolRegistry>> {
    let registry = DefaultToolRegistry::new();
    for tool in tools {
        registry.register_shared(Arc::clone(tool))?;
    }
    Ok(Arc::new(registry))
}

/// Construct the pipelines of every scenario.
///
/// `client_for` yields the model client of a scenario; it is called once
/// per scenario. Image tools use the vision and OCR clients.
pub fn build_registry<F>(config: &AppConfig, working_dir: &Path, mut client_for: F) -> Result<PipelineRegistry>
where
    F: FnMut(Scenario) -> Result<Arc<dyn ModelClient>>,
{
    let text_client = client_for(Scenario::Text)?;
    let tool_client = client_for(Scenario::Tool)?;
    let vision_client = client_for(Scenario::Vision)?;
    let ocr_client = client_for(Scenario::Ocr)?;

    let images_reader: Arc<dyn Tool> =
        Arc::new(ImagesReaderTool::new(vision_client.clone(), working_dir));
    let ocr_image: Arc<dyn Tool> = Arc::new(OcrImageTool::new(
        ocr_client.clone(),
        config.security.clone(),
        working_dir,
    ));
    let create_images: Arc<dyn Tool> = Arc::new(CreateImagesTool);
    let download_video: Arc<dyn Tool> = Arc::new(DownloadVideoTool::new(working_dir));

    let pipeline_config = PipelineConfig {
        max_tool_iterations: config.system.max_tool_iterations,
    };

    let text = AgentPipeline::builder(Scenario::Text)
        .with_client(text_client)
        .with_config(pipeline_config.clone())
        .build()?;
    let tool = AgentPipeline::builder(Scenario::Tool)
        .with_client(tool_client)
        .with_tools(toolset(&[&download_video, &create_images, &images_reader, &ocr_image])?)
        .with_config(pipeline_config.clone())
        .build()?;
    let vision = AgentPipeline::builder(Scenario::Vision)
        .with_client(vision_client)
        .with_tools(toolset(&[&images_reader])?)
        .with_config(pipeline_config.clone())
        .build()?;
    let ocr = AgentPipeline::builder(Scenario::Ocr)
        .with_client(ocr_client)
        .with_tools(toolset(&[&ocr_image])?)
        .with_direct_image(OCR_ROLE, ocr_answer)
        .with_config(pipeline_config)
        .build()?;

    tracing::debug!(
        text = %text.model_id(),
        tool = %tool.model_id(),
        vision = %vision.model_id(),
        ocr = %ocr.model_id(),
        "Pipelines ready"
    );

    Ok(PipelineRegistry {
        pipelines: [
            Arc::new(text),
            Arc::new(tool),
            Arc::new(vision),
            Arc::new(ocr),
        ],
    })
}
