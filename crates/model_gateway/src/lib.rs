//! Model gateway for xs.
//!
//! This crate provides:
//! - Ollama chat clients implementing `ModelClient`
//! - Reasoning/answer separation for thinking models
//! - Backend health probing and auto-start

pub mod health;
pub mod ollama;
pub mod thinking;
pub mod wire;

pub use health::BackendProbe;
pub use ollama::{OllamaClient, OllamaTransport, SilentOllamaClient, THINKING_STOP_SEQUENCES};
pub use thinking::{split_thinking, ThinkFilter};

use std::sync::Arc;

use xs_core::{
    config::{AppConfig, SamplingProfile},
    traits::ModelClient,
    types::Scenario,
    Result,
};

/// Create the model client of a scenario from configuration.
///
/// `models.use_enhanced` picks the client flavour once for all scenarios.
pub fn create_client(config: &AppConfig, scenario: Scenario) -> Result<Arc<dyn ModelClient>> {
    let transport = OllamaTransport::new(
        config.system.base_url(),
        config.model_for(scenario),
        SamplingProfile::for_scenario(scenario),
    )?;

    tracing::debug!(
        scenario = %scenario,
        model = %transport.model(),
        enhanced = config.models.use_enhanced,
        "Creating model client"
    );

    if config.models.use_enhanced {
        Ok(Arc::new(SilentOllamaClient::new(transport)))
    } else {
        Ok(Arc::new(OllamaClient::new(transport)))
    }
}
