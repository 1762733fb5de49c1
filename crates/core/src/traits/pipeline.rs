//! Pipeline traits.

use async_trait::async_trait;

use crate::error::{Error, Result};
use crate::traits::TextStream;
use crate::types::{AgentResponse, Request, Scenario};

/// A role prompt, a toolset and a model bound together to serve one scenario.
#[async_trait]
pub trait Pipeline: Send + Sync {
    /// Scenario served by this pipeline.
    fn scenario(&self) -> Scenario;

    /// Identifier of the configured model.
    fn model_id(&self) -> &str;

    /// Process a request and return the full response.
    async fn invoke(&self, request: &Request) -> Result<AgentResponse>;

    /// Stream answer text for a request.
    async fn stream(&self, request: &Request) -> Result<TextStream> {
        let _ = request;
        Err(Error::internal(format!(
            "streaming is not supported by the {} pipeline",
            self.scenario()
        )))
    }
}
