use serde::{Deserialize, Serialize};
use serde_json::Value;

// =============================================================================
// Response Types (Pipeline Output)
// =============================================================================

/// One unit of a model's structured response.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", content = "data", rename_all = "lowercase")]
pub enum ResponseSegment {
    /// Answer text shown to the user.
    Text(String),
    /// Internal deliberation. Never displayed.
    Reasoning(String),
    /// Anything else the backend produced.
    Other(Value),
}

impl ResponseSegment {
    /// Create a text segment.
    pub fn text(text: impl Into<String>) -> Self {
        Self::Text(text.into())
    }

    /// Create a reasoning segment.
    pub fn reasoning(text: impl Into<String>) -> Self {
        Self::Reasoning(text.into())
    }

    /// Whether this segment is reasoning, either typed or tagged as
    /// `"thinking"` inside an opaque payload.
    pub fn is_reasoning(&self) -> bool {
        match self {
            Self::Reasoning(_) => true,
            Self::Other(value) => matches!(
                value.get("type").and_then(Value::as_str),
                Some("thinking") | Some("reasoning")
            ),
            Self::Text(_) => false,
        }
    }

    /// Text to display for this segment, or `None` for reasoning.
    ///
    /// Opaque payloads are probed in order: a `text` field, a `content`
    /// field, a text field of a `"type": "text"` block, and finally the
    /// whole payload stringified.
    pub fn display_text(&self) -> Option<String> {
        if self.is_reasoning() {
            return None;
        }
        match self {
            Self::Text(text) => Some(text.clone()),
            Self::Reasoning(_) => None,
            Self::Other(value) => Some(extract_display_text(value)),
        }
    }
}

fn extract_display_text(value: &Value) -> String {
    if let Some(text) = value.as_str() {
        return text.to_string();
    }
    if let Some(text) = value.get("text").and_then(field_as_string) {
        return text;
    }
    if let Some(content) = value.get("content").and_then(field_as_string) {
        return content;
    }
    if value.get("type").and_then(Value::as_str) == Some("text") {
        if let Some(text) = value
            .get("data")
            .or_else(|| value.get("value"))
            .and_then(field_as_string)
        {
            return text;
        }
    }
    value.to_string()
}

fn field_as_string(value: &Value) -> Option<String> {
    match value {
        Value::Null => None,
        Value::String(s) => Some(s.clone()),
        other => Some(other.to_string()),
    }
}

/// Response returned by a pipeline.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AgentResponse {
    /// Ordered response segments.
    pub content: Vec<ResponseSegment>,
}

impl AgentResponse {
    /// Create a response from segments.
    pub fn new(content: Vec<ResponseSegment>) -> Self {
        Self { content }
    }

    /// Create a response holding a single text segment.
    pub fn text(text: impl Into<String>) -> Self {
        Self {
            content: vec![ResponseSegment::text(text)],
        }
    }

    /// Whether the response carries no segments at all.
    pub fn is_empty(&self) -> bool {
        self.content.is_empty()
    }

    /// First displayable text, skipping reasoning and blank segments.
    pub fn first_text(&self) -> Option<String> {
        self.content
            .iter()
            .filter_map(ResponseSegment::display_text)
            .find(|t| !t.trim().is_empty())
    }
}
