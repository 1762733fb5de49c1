//! Error types for xs.

use thiserror::Error;

/// Result type alias using xs's Error type.
pub type Result<T> = std::result::Result<T, Error>;

/// Core error type for xs.
#[derive(Error, Debug)]
pub enum Error {
    // =========================================================================
    // Request Errors
    // =========================================================================
    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    #[error("Invalid image: {0}")]
    InvalidImage(String),

    #[error("Clipboard error: {0}")]
    Clipboard(String),

    // =========================================================================
    // Pipeline Errors
    // =========================================================================
    #[error("Tool not found: {0}")]
    ToolNotFound(String),

    #[error("Tool execution failed: {0}")]
    ToolExecution(String),

    #[error("Tool loop exceeded max iterations: {0}")]
    MaxIterationsExceeded(usize),

    // =========================================================================
    // Model Backend Errors
    // =========================================================================
    #[error("Model provider error: {0}")]
    ModelProvider(String),

    #[error("Backend unavailable: {0}")]
    BackendUnavailable(String),

    #[error("Timeout: {0}")]
    Timeout(String),

    // =========================================================================
    // Generic Errors
    // =========================================================================
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Internal error: {0}")]
    Internal(String),

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl Error {
    /// Create an invalid request error.
    pub fn invalid_request(msg: impl Into<String>) -> Self {
        Self::InvalidRequest(msg.into())
    }

    /// Create an invalid image error.
    pub fn invalid_image(msg: impl Into<String>) -> Self {
        Self::InvalidImage(msg.into())
    }

    /// Create a tool not found error.
    pub fn tool_not_found(name: impl Into<String>) -> Self {
        Self::ToolNotFound(name.into())
    }

    /// Create a tool execution error.
    pub fn tool_execution(msg: impl Into<String>) -> Self {
        Self::ToolExecution(msg.into())
    }

    /// Create a model provider error.
    pub fn model_provider(msg: impl Into<String>) -> Self {
        Self::ModelProvider(msg.into())
    }

    /// Create an internal error.
    pub fn internal(msg: impl Into<String>) -> Self {
        Self::Internal(msg.into())
    }

    /// Short, stable name of the error variant.
    ///
    /// Shown to the user next to the error description when a request
    /// cannot be served.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::InvalidRequest(_) => "InvalidRequest",
            Self::InvalidImage(_) => "InvalidImage",
            Self::Clipboard(_) => "Clipboard",
            Self::ToolNotFound(_) => "ToolNotFound",
            Self::ToolExecution(_) => "ToolExecution",
            Self::MaxIterationsExceeded(_) => "MaxIterationsExceeded",
            Self::ModelProvider(_) => "ModelProvider",
            Self::BackendUnavailable(_) => "BackendUnavailable",
            Self::Timeout(_) => "Timeout",
            Self::Config(_) => "Config",
            Self::Io(_) => "Io",
            Self::Serialization(_) => "Serialization",
            Self::Internal(_) => "Internal",
            Self::Other(_) => "Other",
        }
    }
}

impl From<config::ConfigError> for Error {
    fn from(err: config::ConfigError) -> Self {
        Self::Config(err.to_string())
    }
}
