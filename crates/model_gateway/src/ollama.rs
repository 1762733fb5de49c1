//! HTTP clients for the Ollama chat API.
//!
//! [`OllamaTransport`] owns the connection pool and the wire protocol.
//! [`SilentOllamaClient`] and [`OllamaClient`] differ only in how they ask
//! the model to handle its reasoning and how they read it back.

use async_trait::async_trait;
use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use bytes::{Buf, BytesMut};
use futures::stream::{self, BoxStream, StreamExt};
use std::collections::VecDeque;
use tracing::{debug, warn};

use xs_core::{
    config::SamplingProfile,
    traits::{ModelClient, TextStream},
    types::{ChatMessage, ModelReply, ResponseSegment, ToolCall, ToolDefinition},
    Error, Result,
};

use crate::thinking::{split_thinking, ThinkFilter};
use crate::wire::{ApiError, ChatChunk, ChatRequest, WireMessage, WireOptions, WireTool, WireToolCall};

/// Stop sequences used when the model cannot be told to skip reasoning.
pub const THINKING_STOP_SEQUENCES: [&str; 2] = ["<thinking>", "</thinking>"];

/// Shared HTTP plumbing for one model on one Ollama server.
#[derive(Debug, Clone)]
pub struct OllamaTransport {
    client: reqwest::Client,
    base_url: String,
    model: String,
    options: WireOptions,
}

impl OllamaTransport {
    pub fn new(base_url: impl Into<String>, model: impl Into<String>, profile: SamplingProfile) -> Result<Self> {
        let base_url: String = base_url.into();
        // No request timeout: a chat round is bounded only by the dispatcher's attempts.
        let client = reqwest::Client::builder()
            .build()
            .map_err(|e| Error::model_provider(format!("failed to build HTTP client: {e}")))?;

        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            model: model.into(),
            options: WireOptions::from(profile),
        })
    }

    pub fn with_stop(mut self, stop: &[&str]) -> Self {
        self.options.stop = stop.iter().map(|s| s.to_string()).collect();
        self
    }

    pub fn model(&self) -> &str {
        &self.model
    }

    fn chat_url(&self) -> String {
        format!("{}/api/chat", self.base_url)
    }

    async fn build_request(
        &self,
        messages: &[ChatMessage],
        tools: &[ToolDefinition],
        stream: bool,
        think: Option<bool>,
    ) -> Result<ChatRequest> {
        let mut wire = Vec::with_capacity(messages.len());
        for message in messages {
            wire.push(encode_message(message).await?);
        }

        Ok(ChatRequest {
            model: self.model.clone(),
            messages: wire,
            tools: tools.iter().map(WireTool::from).collect(),
            options: self.options.clone(),
            stream,
            think,
        })
    }

    async fn send(&self, request: &ChatRequest) -> Result<reqwest::Response> {
        let response = self
            .client
            .post(self.chat_url())
            .json(request)
            .send()
            .await
            .map_err(|e| map_transport_error(e, &self.base_url))?;

        let status = response.status();
        debug!(model = %self.model, status = %status, stream = request.stream, "chat response received");

        if status.is_success() {
            return Ok(response);
        }

        let body = response.text().await.unwrap_or_default();
        let message = match serde_json::from_str::<ApiError>(&body) {
            Ok(api_err) => format!("Ollama error ({status}): {}", api_err.error),
            Err(_) => format!("Ollama returned {status}: {body}"),
        };
        warn!(model = %self.model, status = %status, "chat request rejected");
        Err(Error::model_provider(message))
    }

    /// Run one non-streaming chat round and return the reply message.
    pub async fn complete(
        &self,
        messages: &[ChatMessage],
        tools: &[ToolDefinition],
        think: Option<bool>,
    ) -> Result<WireMessage> {
        let request = self.build_request(messages, tools, false, think).await?;
        let response = self.send(&request).await?;

        let body = response
            .text()
            .await
            .map_err(|e| Error::model_provider(format!("failed to read response body: {e}")))?;
        let chunk: ChatChunk = serde_json::from_str(&body)
            .map_err(|e| Error::model_provider(format!("failed to parse chat response: {e}")))?;

        if let Some(error) = chunk.error {
            return Err(Error::model_provider(error));
        }
        chunk
            .message
            .ok_or_else(|| Error::model_provider("chat response has no message"))
    }

    /// Start a streaming chat round. Only answer text is yielded.
    pub async fn stream(&self, messages: &[ChatMessage], think: Option<bool>) -> Result<TextStream> {
        let request = self.build_request(messages, &[], true, think).await?;
        let response = self.send(&request).await?;
        Ok(ndjson_text_stream(response.bytes_stream().boxed()))
    }
}

async fn encode_message(message: &ChatMessage) -> Result<WireMessage> {
    let mut images = Vec::with_capacity(message.images.len());
    for path in &message.images {
        let bytes = tokio::fs::read(path).await.map_err(|e| {
            Error::invalid_image(format!("无法读取图片 {}: {e}", path.display()))
        })?;
        images.push(STANDARD.encode(bytes));
    }

    Ok(WireMessage {
        role: message.role.as_str().to_string(),
        content: message.content.clone(),
        thinking: None,
        images,
        tool_calls: message.tool_calls.iter().map(WireToolCall::from).collect(),
        tool_name: message.tool_name.clone(),
    })
}

fn map_transport_error(err: reqwest::Error, base_url: &str) -> Error {
    if err.is_timeout() {
        Error::Timeout(format!("request to {base_url} timed out: {err}"))
    } else if err.is_connect() {
        Error::BackendUnavailable(format!("cannot connect to {base_url}: {err}"))
    } else {
        Error::model_provider(format!("HTTP request failed: {err}"))
    }
}

fn tool_calls_of(message: &mut WireMessage) -> Vec<ToolCall> {
    std::mem::take(&mut message.tool_calls)
        .into_iter()
        .map(ToolCall::from)
        .collect()
}

struct NdjsonState {
    body: BoxStream<'static, reqwest::Result<bytes::Bytes>>,
    buffer: BytesMut,
    pending: VecDeque<Result<String>>,
    filter: ThinkFilter,
    finished: bool,
}

impl NdjsonState {
    /// Decode every complete line in the buffer.
    fn drain_lines(&mut self) {
        while let Some(pos) = self.buffer.iter().position(|b| *b == b'\n') {
            let line = self.buffer.split_to(pos);
            self.buffer.advance(1);
            self.decode(&line);
        }
    }

    fn emit(&mut self, text: String) {
        if !text.is_empty() {
            self.pending.push_back(Ok(text));
        }
    }

    /// Release held-back text and end the stream.
    fn flush(&mut self) {
        let rest = self.filter.finish();
        self.emit(rest);
        self.finished = true;
    }

    fn decode(&mut self, line: &[u8]) {
        if self.finished || line.iter().all(u8::is_ascii_whitespace) {
            return;
        }
        match serde_json::from_slice::<ChatChunk>(line) {
            Ok(chunk) => {
                if let Some(error) = chunk.error {
                    self.pending.push_back(Err(Error::model_provider(error)));
                    self.finished = true;
                    return;
                }
                if let Some(message) = chunk.message {
                    let visible = self.filter.push(&message.content);
                    self.emit(visible);
                }
                if chunk.done {
                    self.flush();
                }
            }
            Err(e) => {
                self.pending
                    .push_back(Err(Error::model_provider(format!("malformed stream line: {e}"))));
                self.finished = true;
            }
        }
    }
}

/// Turn an NDJSON body into a stream of `message.content` deltas with
/// reasoning spans removed.
fn ndjson_text_stream(body: BoxStream<'static, reqwest::Result<bytes::Bytes>>) -> TextStream {
    let state = NdjsonState {
        body,
        buffer: BytesMut::new(),
        pending: VecDeque::new(),
        filter: ThinkFilter::new(),
        finished: false,
    };

    stream::unfold(state, |mut state| async move {
        loop {
            if let Some(item) = state.pending.pop_front() {
                return Some((item, state));
            }
            if state.finished {
                return None;
            }
            match state.body.next().await {
                Some(Ok(bytes)) => {
                    state.buffer.extend_from_slice(&bytes);
                    state.drain_lines();
                }
                Some(Err(e)) => {
                    state
                        .pending
                        .push_back(Err(Error::model_provider(format!("stream interrupted: {e}"))));
                    state.finished = true;
                }
                None => {
                    let rest = state.buffer.split();
                    state.decode(&rest);
                    if !state.finished {
                        state.flush();
                    }
                }
            }
        }
    })
    .boxed()
}

/// Client that asks the model not to think and keeps any reasoning it
/// returns anyway out of the answer text.
#[derive(Debug, Clone)]
pub struct SilentOllamaClient {
    transport: OllamaTransport,
}

impl SilentOllamaClient {
    pub fn new(transport: OllamaTransport) -> Self {
        Self { transport }
    }
}

#[async_trait]
impl ModelClient for SilentOllamaClient {
    fn model_id(&self) -> &str {
        self.transport.model()
    }

    async fn chat(&self, messages: &[ChatMessage], tools: &[ToolDefinition]) -> Result<ModelReply> {
        let mut message = self.transport.complete(messages, tools, Some(false)).await?;
        let tool_calls = tool_calls_of(&mut message);

        let mut segments = Vec::new();
        if let Some(thinking) = message.thinking.filter(|t| !t.trim().is_empty()) {
            segments.push(ResponseSegment::reasoning(thinking.trim()));
        }
        segments.extend(split_thinking(&message.content));

        Ok(ModelReply { segments, tool_calls })
    }

    async fn chat_stream(&self, messages: &[ChatMessage]) -> Result<TextStream> {
        self.transport.stream(messages, Some(false)).await
    }
}

/// Client that cuts generation at reasoning tags.
#[derive(Debug, Clone)]
pub struct OllamaClient {
    transport: OllamaTransport,
}

impl OllamaClient {
    pub fn new(transport: OllamaTransport) -> Self {
        Self {
            transport: transport.with_stop(&THINKING_STOP_SEQUENCES),
        }
    }
}

#[async_trait]
impl ModelClient for OllamaClient {
    fn model_id(&self) -> &str {
        self.transport.model()
    }

    async fn chat(&self, messages: &[ChatMessage], tools: &[ToolDefinition]) -> Result<ModelReply> {
        let mut message = self.transport.complete(messages, tools, None).await?;
        let tool_calls = tool_calls_of(&mut message);

        let mut segments = Vec::new();
        if let Some(thinking) = message.thinking.filter(|t| !t.trim().is_empty()) {
            segments.push(ResponseSegment::reasoning(thinking));
        }
        // Stop sequences only cut `<thinking>`; `<think>` spans still arrive.
        segments.extend(split_thinking(&message.content));

        Ok(ModelReply { segments, tool_calls })
    }

    async fn chat_stream(&self, messages: &[ChatMessage]) -> Result<TextStream> {
        self.transport.stream(messages, None).await
    }
}
