//! Agent pipeline: one system role, one model, an optional toolset.
//!
//! Invocation runs a tool loop:
//! 1. Send the system role and the request to the model
//! 2. If the model asks for tools, run them and feed the results back
//! 3. Repeat until the model answers without tool calls or the round
//!    limit is reached

use async_trait::async_trait;
use std::sync::Arc;

use xs_core::{
    traits::{ModelClient, Pipeline, TextStream, ToolRegistry},
    types::{AgentResponse, ChatMessage, Request, ResponseSegment, Scenario, ToolCall},
    Error, Result,
};

/// Pipeline configuration.
#[derive(Debug, Clone)]
pub struct PipelineConfig {
    /// Maximum model rounds per invocation.
    pub max_tool_iterations: usize,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            max_tool_iterations: 6,
        }
    }
}

/// How a pipeline answers a request that carries its own image.
///
/// No tools are offered then, so the model gets a role that asks for the
/// answer itself, and `finish` shapes the answer text.
#[derive(Debug, Clone)]
pub struct DirectImage {
    pub role: String,
    pub finish: fn(&str) -> String,
}

/// Pipeline serving one scenario.
pub struct AgentPipeline {
    pub(crate) scenario: Scenario,
    pub(crate) name: String,
    pub(crate) system_role: String,
    pub(crate) client: Arc<dyn ModelClient>,
    pub(crate) tools: Option<Arc<dyn ToolRegistry>>,
    pub(crate) direct: Option<DirectImage>,
    pub(crate) config: PipelineConfig,
}

impl AgentPipeline {
    /// Create a new builder for a scenario's pipeline.
    pub fn builder(scenario: Scenario) -> crate::builder::PipelineBuilder {
        crate::builder::PipelineBuilder::new(scenario)
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn system_role(&self) -> &str {
        &self.system_role
    }

    pub fn has_tools(&self) -> bool {
        self.tools.is_some()
    }

    /// Direct-image handling, when it applies to `request`.
    fn direct_for(&self, request: &Request) -> Option<&DirectImage> {
        request.image.as_ref().and(self.direct.as_ref())
    }

    fn initial_messages(&self, request: &Request) -> Vec<ChatMessage> {
        let role = match self.direct_for(request) {
            Some(direct) => direct.role.clone(),
            None => self.system_role.clone(),
        };
        let mut user = ChatMessage::user(request.prompt());
        if let Some(image) = &request.image {
            user = user.with_image(image);
        }
        vec![ChatMessage::system(role), user]
    }

    /// Run one tool call and describe its result for the model.
    async fn observe(&self, call: &ToolCall) -> String {
        let Some(tools) = &self.tools else {
            return format!("Tool '{}' not available (no tools configured)", call.name);
        };

        tracing::info!(scenario = %self.scenario, tool = %call.name, "Executing tool call");
        match tools.execute(&call.name, call.arguments.clone()).await {
            Ok(output) if output.success => output.content,
            Ok(output) => format!("Tool '{}' failed:\n{}", call.name, output.content),
            Err(e) => {
                tracing::warn!(tool = %call.name, error = %e, "Tool call failed");
                format!("Tool '{}' error: {}", call.name, e)
            }
        }
    }
}

#[async_trait]
impl Pipeline for AgentPipeline {
    fn scenario(&self) -> Scenario {
        self.scenario
    }

    fn model_id(&self) -> &str {
        self.client.model_id()
    }

    async fn invoke(&self, request: &Request) -> Result<AgentResponse> {
        let mut messages = self.initial_messages(request);

        // An attached image is answered directly, without tools.
        let definitions = match (&self.tools, &request.image) {
            (Some(tools), None) => tools.list().await?,
            _ => Vec::new(),
        };

        let max_rounds = self.config.max_tool_iterations.max(1);
        tracing::debug!(
            pipeline = %self.name,
            trace_id = %request.trace_id,
            tools = definitions.len(),
            "Invoking pipeline"
        );

        for round in 0..max_rounds {
            let reply = self.client.chat(&messages, &definitions).await?;

            if reply.tool_calls.is_empty() {
                tracing::debug!(pipeline = %self.name, round, "Pipeline answered");
                if let Some(direct) = self.direct_for(request) {
                    let text = (direct.finish)(&reply.text_content());
                    return Ok(AgentResponse::new(vec![ResponseSegment::text(text)]));
                }
                return Ok(AgentResponse::new(reply.segments));
            }

            messages.push(ChatMessage::assistant(
                reply.text_content(),
                reply.tool_calls.clone(),
            ));
            for call in &reply.tool_calls {
                let observation = self.observe(call).await;
                messages.push(ChatMessage::tool(call.name.clone(), observation));
            }
        }

        tracing::warn!(pipeline = %self.name, rounds = max_rounds, "Tool loop did not finish");
        Err(Error::MaxIterationsExceeded(max_rounds))
    }

    async fn stream(&self, request: &Request) -> Result<TextStream> {
        let messages = self.initial_messages(request);
        self.client.chat_stream(&messages).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use xs_core::{
        mocks::{RecordingTool, ScriptedModel},
        types::{ModelReply, ResponseSegment, Role},
    };
    use xs_skills::DefaultToolRegistry;

    fn tool_registry(tool: Arc<RecordingTool>) -> Arc<dyn ToolRegistry> {
        let registry = DefaultToolRegistry::new();
        registry.register_shared(tool).unwrap();
        Arc::new(registry)
    }

    #[tokio::test]
    async fn test_plain_answer() {
        let model = Arc::new(ScriptedModel::constant("text-model", "你好！"));
        let pipeline = AgentPipeline::builder(Scenario::Text)
            .with_role("be nice")
            .with_client(model.clone())
            .build()
            .unwrap();

        let request = Request::new("你好").with_working_dir("/home/me");
        let response = pipeline.invoke(&request).await.unwrap();

        assert_eq!(response.first_text().as_deref(), Some("你好！"));
        assert_eq!(pipeline.model_id(), "text-model");
        let call = &model.calls()[0];
        assert_eq!(call[0].role, Role::System);
        assert_eq!(call[1].content, "你好 当前目录为：/home/me");
    }

    #[tokio::test]
    async fn test_tool_loop_feeds_results_back() {
        let tool = Arc::new(RecordingTool::new("images_reader", "一只猫"));
        let model = Arc::new(ScriptedModel::new(
            "vision-model",
            vec![
                ModelReply::tool_calls(vec![ToolCall::new(
                    "images_reader",
                    json!({"prompt": "这是什么", "image_dir": "cat.png"}),
                )]),
                ModelReply {
                    segments: vec![
                        ResponseSegment::reasoning("the tool said cat"),
                        ResponseSegment::text("图片里是一只猫"),
                    ],
                    tool_calls: vec![],
                },
            ],
        ));
        let pipeline = AgentPipeline::builder(Scenario::Vision)
            .with_client(model.clone())
            .with_tools(tool_registry(tool.clone()))
            .build()
            .unwrap();

        let response = pipeline.invoke(&Request::new("cat.png 是什么")).await.unwrap();

        assert_eq!(response.first_text().as_deref(), Some("图片里是一只猫"));
        assert_eq!(tool.calls()[0]["image_dir"], "cat.png");
        assert_eq!(model.offered_tools()[0], vec!["images_reader".to_string()]);

        let second = &model.calls()[1];
        let observation = second.last().unwrap();
        assert_eq!(observation.role, Role::Tool);
        assert_eq!(observation.content, "一只猫");
    }

    #[tokio::test]
    async fn test_unknown_tool_is_observed_not_raised() {
        let tool = Arc::new(RecordingTool::new("known", "ok"));
        let model = Arc::new(ScriptedModel::new(
            "m",
            vec![
                ModelReply::tool_calls(vec![ToolCall::new("unknown", json!({}))]),
                ModelReply::text("done"),
            ],
        ));
        let pipeline = AgentPipeline::builder(Scenario::Tool)
            .with_client(model.clone())
            .with_tools(tool_registry(tool))
            .build()
            .unwrap();

        let response = pipeline.invoke(&Request::new("x")).await.unwrap();
        assert_eq!(response.first_text().as_deref(), Some("done"));
        assert!(model.calls()[1].last().unwrap().content.contains("unknown"));
    }

    #[tokio::test]
    async fn test_round_limit() {
        let tool = Arc::new(RecordingTool::new("loop", "again"));
        let model = Arc::new(ScriptedModel::new(
            "m",
            vec![ModelReply::tool_calls(vec![ToolCall::new("loop", json!({}))])],
        ));
        let pipeline = AgentPipeline::builder(Scenario::Tool)
            .with_client(model.clone())
            .with_tools(tool_registry(tool.clone()))
            .with_config(PipelineConfig {
                max_tool_iterations: 3,
            })
            .build()
            .unwrap();

        let result = pipeline.invoke(&Request::new("x")).await;
        assert!(matches!(result, Err(Error::MaxIterationsExceeded(3))));
        assert_eq!(model.call_count(), 3);
        assert_eq!(tool.calls().len(), 3);
    }

    #[tokio::test]
    async fn test_attached_image_skips_tools() {
        let tool = Arc::new(RecordingTool::new("ocr_image", "unused"));
        let model = Arc::new(ScriptedModel::constant("ocr-model", "发票"));
        let pipeline = AgentPipeline::builder(Scenario::Ocr)
            .with_client(model.clone())
            .with_tools(tool_registry(tool))
            .build()
            .unwrap();

        let request = Request::new("请识别图片中的所有文字内容。").with_image("/tmp/scan.png");
        pipeline.invoke(&request).await.unwrap();

        assert!(model.offered_tools()[0].is_empty());
        assert_eq!(model.calls()[0][1].images.len(), 1);
    }

    fn shout(text: &str) -> String {
        format!("{}!", text.trim())
    }

    #[tokio::test]
    async fn test_direct_image_role_and_finish() {
        let model = Arc::new(ScriptedModel::new(
            "ocr-model",
            vec![
                ModelReply {
                    segments: vec![
                        ResponseSegment::reasoning("looking"),
                        ResponseSegment::text(" 发票 "),
                    ],
                    tool_calls: vec![],
                },
                ModelReply::text("plain"),
            ],
        ));
        let pipeline = AgentPipeline::builder(Scenario::Ocr)
            .with_client(model.clone())
            .with_direct_image("read it yourself", shout)
            .build()
            .unwrap();

        let with_image = Request::new("识别").with_image("/tmp/scan.png");
        let response = pipeline.invoke(&with_image).await.unwrap();
        assert_eq!(response.content, vec![ResponseSegment::text("发票!")]);
        assert_eq!(model.calls()[0][0].content, "read it yourself");

        // Without an image the scenario role and raw answer are kept.
        let response = pipeline.invoke(&Request::new("识别")).await.unwrap();
        assert_eq!(response.first_text().as_deref(), Some("plain"));
        assert_eq!(model.calls()[1][0].content, pipeline.system_role());
    }

    #[tokio::test]
    async fn test_model_failure_propagates() {
        let model = Arc::new(ScriptedModel::constant("m", "x").failing_first("refused"));
        let pipeline = AgentPipeline::builder(Scenario::Text)
            .with_client(model)
            .build()
            .unwrap();

        let err = pipeline.invoke(&Request::new("hi")).await.unwrap_err();
        assert_eq!(err.kind(), "ModelProvider");
    }
}
