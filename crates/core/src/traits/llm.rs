//! Model gateway traits.

use async_trait::async_trait;
use futures::stream::BoxStream;

use crate::error::Result;
use crate::types::{ChatMessage, ModelReply, ToolDefinition};

/// Stream of incremental answer text.
pub type TextStream = BoxStream<'static, Result<String>>;

/// Model client interface.
#[async_trait]
pub trait ModelClient: Send + Sync {
    /// Identifier of the model behind this client.
    fn model_id(&self) -> &str;

    /// Run one chat round, optionally offering tools.
    async fn chat(&self, messages: &[ChatMessage], tools: &[ToolDefinition]) -> Result<ModelReply>;

    /// Stream the answer text of one chat round. Reasoning is not streamed.
    async fn chat_stream(&self, messages: &[ChatMessage]) -> Result<TextStream>;
}
