//! Mock implementations of core traits for testing.
//!
//! Shared by the unit and integration tests of every crate in the
//! workspace.

use async_trait::async_trait;
use futures::stream;
use serde_json::Value;
use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;

use crate::{
    traits::{ModelClient, Pipeline, TextStream, Tool},
    types::{AgentResponse, ChatMessage, ModelReply, Request, Scenario, ToolDefinition, ToolOutput},
    Error, Result,
};

// =============================================================================
// Mock Model Client
// =============================================================================

/// Scripted model client that replays queued replies in order.
///
/// Once the script runs out, the last reply is repeated. Every call's
/// messages are recorded for inspection.
pub struct ScriptedModel {
    model_id: String,
    replies: Mutex<VecDeque<std::result::Result<ModelReply, String>>>,
    last: Mutex<Option<ModelReply>>,
    chunks: Vec<String>,
    calls: Mutex<Vec<Vec<ChatMessage>>>,
    offered_tools: Mutex<Vec<Vec<String>>>,
}

impl ScriptedModel {
    /// Create a mock with a queue of replies.
    pub fn new(model_id: &str, replies: Vec<ModelReply>) -> Self {
        Self {
            model_id: model_id.to_string(),
            replies: Mutex::new(replies.into_iter().map(Ok).collect()),
            last: Mutex::new(None),
            chunks: Vec::new(),
            calls: Mutex::new(Vec::new()),
            offered_tools: Mutex::new(Vec::new()),
        }
    }

    /// Create a mock that always answers with the same text.
    pub fn constant(model_id: &str, text: &str) -> Self {
        Self::new(model_id, vec![ModelReply::text(text)])
    }

    /// Queue a failure before the scripted replies.
    pub fn failing_first(self, message: &str) -> Self {
        self.replies
            .lock()
            .unwrap()
            .push_front(Err(message.to_string()));
        self
    }

    /// Chunks returned by `chat_stream`.
    pub fn with_chunks(mut self, chunks: &[&str]) -> Self {
        self.chunks = chunks.iter().map(|c| c.to_string()).collect();
        self
    }

    /// Number of `chat` calls made.
    pub fn call_count(&self) -> usize {
        self.calls.lock().unwrap().len()
    }

    /// Messages of every `chat` call.
    pub fn calls(&self) -> Vec<Vec<ChatMessage>> {
        self.calls.lock().unwrap().clone()
    }

    /// Tool names offered on every `chat` call.
    pub fn offered_tools(&self) -> Vec<Vec<String>> {
        self.offered_tools.lock().unwrap().clone()
    }
}

#[async_trait]
impl ModelClient for ScriptedModel {
    fn model_id(&self) -> &str {
        &self.model_id
    }

    async fn chat(&self, messages: &[ChatMessage], tools: &[ToolDefinition]) -> Result<ModelReply> {
        self.calls.lock().unwrap().push(messages.to_vec());
        self.offered_tools
            .lock()
            .unwrap()
            .push(tools.iter().map(|t| t.name.clone()).collect());

        let next = self.replies.lock().unwrap().pop_front();
        match next {
            Some(Ok(reply)) => {
                *self.last.lock().unwrap() = Some(reply.clone());
                Ok(reply)
            }
            Some(Err(message)) => Err(Error::model_provider(message)),
            None => Ok(self
                .last
                .lock()
                .unwrap()
                .clone()
                .unwrap_or_else(|| ModelReply::text("FINAL ANSWER: Done"))),
        }
    }

    async fn chat_stream(&self, messages: &[ChatMessage]) -> Result<TextStream> {
        self.calls.lock().unwrap().push(messages.to_vec());
        let chunks: Vec<Result<String>> = self.chunks.iter().cloned().map(Ok).collect();
        Ok(Box::pin(stream::iter(chunks)))
    }
}

// =============================================================================
// Mock Pipeline
// =============================================================================

/// Pipeline that fails a fixed number of times before answering.
pub struct FlakyPipeline {
    scenario: Scenario,
    model_id: String,
    failures: usize,
    answer: String,
    attempts: AtomicUsize,
}

impl FlakyPipeline {
    pub fn new(scenario: Scenario, failures: usize, answer: &str) -> Self {
        Self {
            scenario,
            model_id: format!("mock-{}", scenario),
            failures,
            answer: answer.to_string(),
            attempts: AtomicUsize::new(0),
        }
    }

    /// A pipeline that never succeeds.
    pub fn always_failing(scenario: Scenario) -> Self {
        Self::new(scenario, usize::MAX, "")
    }

    /// Number of `invoke` calls made.
    pub fn attempts(&self) -> usize {
        self.attempts.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl Pipeline for FlakyPipeline {
    fn scenario(&self) -> Scenario {
        self.scenario
    }

    fn model_id(&self) -> &str {
        &self.model_id
    }

    async fn invoke(&self, _request: &Request) -> Result<AgentResponse> {
        let attempt = self.attempts.fetch_add(1, Ordering::SeqCst) + 1;
        if attempt <= self.failures {
            return Err(Error::model_provider(format!("connection refused (attempt {})", attempt)));
        }
        Ok(AgentResponse::text(self.answer.clone()))
    }
}

// =============================================================================
// Mock Tool
// =============================================================================

/// Tool that records its arguments and answers with a fixed text.
pub struct RecordingTool {
    name: String,
    answer: String,
    calls: Mutex<Vec<Value>>,
}

impl RecordingTool {
    pub fn new(name: &str, answer: &str) -> Self {
        Self {
            name: name.to_string(),
            answer: answer.to_string(),
            calls: Mutex::new(Vec::new()),
        }
    }

    pub fn calls(&self) -> Vec<Value> {
        self.calls.lock().unwrap().clone()
    }
}

#[async_trait]
impl Tool for RecordingTool {
    fn name(&self) -> &str {
        &self.name
    }

    fn description(&self) -> &str {
        "Records calls for tests"
    }

    fn parameters(&self) -> Value {
        serde_json::json!({ "type": "object", "properties": {} })
    }

    async fn execute(&self, args: Value) -> Result<ToolOutput> {
        self.calls.lock().unwrap().push(args);
        Ok(ToolOutput::text(self.answer.clone()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use futures::StreamExt;

    #[tokio::test]
    async fn test_scripted_model_replays_then_repeats() {
        let model = ScriptedModel::new("m", vec![ModelReply::text("one"), ModelReply::text("two")])
            .failing_first("boom");

        assert!(model.chat(&[], &[]).await.is_err());
        assert_eq!(model.chat(&[], &[]).await.unwrap().text_content(), "one");
        assert_eq!(model.chat(&[], &[]).await.unwrap().text_content(), "two");
        assert_eq!(model.chat(&[], &[]).await.unwrap().text_content(), "two");
        assert_eq!(model.call_count(), 4);
    }

    #[tokio::test]
    async fn test_scripted_model_streams_chunks() {
        let model = ScriptedModel::constant("m", "x").with_chunks(&["a", "b"]);
        let chunks: Vec<String> = model
            .chat_stream(&[])
            .await
            .unwrap()
            .map(|c| c.unwrap())
            .collect()
            .await;
        assert_eq!(chunks, vec!["a", "b"]);
    }

    #[tokio::test]
    async fn test_flaky_pipeline_counts_attempts() {
        let pipeline = FlakyPipeline::new(Scenario::Text, 1, "ok");
        let request = Request::new("hi");
        assert!(pipeline.invoke(&request).await.is_err());
        assert!(pipeline.invoke(&request).await.is_ok());
        assert_eq!(pipeline.attempts(), 2);
    }
}
