use serde::{Deserialize, Serialize};
use std::path::PathBuf;

use super::{ResponseSegment, ToolCall};

// =============================================================================
// Chat Types (Model Gateway I/O)
// =============================================================================

/// Role of a chat message.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    System,
    User,
    Assistant,
    Tool,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::System => "system",
            Role::User => "user",
            Role::Assistant => "assistant",
            Role::Tool => "tool",
        }
    }
}

/// Chat message for model interactions.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChatMessage {
    /// Message role.
    pub role: Role,
    /// Message content.
    pub content: String,
    /// Image files attached to the message.
    #[serde(default)]
    pub images: Vec<PathBuf>,
    /// Tool calls issued by the assistant.
    #[serde(default)]
    pub tool_calls: Vec<ToolCall>,
    /// Name of the tool that produced this message.
    #[serde(default)]
    pub tool_name: Option<String>,
}

impl ChatMessage {
    fn with_role(role: Role, content: impl Into<String>) -> Self {
        Self {
            role,
            content: content.into(),
            images: Vec::new(),
            tool_calls: Vec::new(),
            tool_name: None,
        }
    }

    pub fn system(content: impl Into<String>) -> Self {
        Self::with_role(Role::System, content)
    }

    pub fn user(content: impl Into<String>) -> Self {
        Self::with_role(Role::User, content)
    }

    /// Assistant turn that requested tool calls.
    pub fn assistant(content: impl Into<String>, tool_calls: Vec<ToolCall>) -> Self {
        Self {
            tool_calls,
            ..Self::with_role(Role::Assistant, content)
        }
    }

    /// Result of a tool call.
    pub fn tool(name: impl Into<String>, content: impl Into<String>) -> Self {
        Self {
            tool_name: Some(name.into()),
            ..Self::with_role(Role::Tool, content)
        }
    }

    /// Attach an image file.
    pub fn with_image(mut self, path: impl Into<PathBuf>) -> Self {
        self.images.push(path.into());
        self
    }
}

/// Reply from a single model round.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ModelReply {
    /// Content segments, reasoning kept separate from text.
    pub segments: Vec<ResponseSegment>,
    /// Tool calls requested by the model.
    pub tool_calls: Vec<ToolCall>,
}

impl ModelReply {
    /// Reply with a single text segment.
    pub fn text(text: impl Into<String>) -> Self {
        Self {
            segments: vec![ResponseSegment::text(text)],
            tool_calls: Vec::new(),
        }
    }

    /// Reply requesting tool calls.
    pub fn tool_calls(calls: Vec<ToolCall>) -> Self {
        Self {
            segments: Vec::new(),
            tool_calls: calls,
        }
    }

    /// Concatenated text segments, reasoning excluded.
    pub fn text_content(&self) -> String {
        self.segments
            .iter()
            .filter_map(|s| match s {
                ResponseSegment::Text(t) => Some(t.as_str()),
                _ => None,
            })
            .collect::<Vec<_>>()
            .join("")
    }
}
