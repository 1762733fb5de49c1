use config::{Config, Environment, File, FileFormat};
use serde::{Deserialize, Deserializer, Serialize};
use std::path::Path;
use std::time::Duration;

use crate::error::Result;
use crate::types::Scenario;

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct AppConfig {
    #[serde(default)]
    pub models: ModelsConfig,
    #[serde(default)]
    pub system: SystemConfig,
    #[serde(default)]
    pub security: SecurityConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ModelsConfig {
    pub text_model: String,
    pub tool_model: String,
    pub vision_model: String,
    pub ocr_model: String,
    /// Use the thinking-aware client instead of the plain one.
    pub use_enhanced: bool,
    /// Stream answers of the text scenario.
    pub streaming: bool,
}

impl Default for ModelsConfig {
    fn default() -> Self {
        Self {
            text_model: "gpt-oss:20b".into(),
            tool_model: "zdolny/qwen3-coder58k-tools:latest".into(),
            vision_model: "qwen3-vl:8b".into(),
            ocr_model: "qwen3-vl:8b".into(),
            use_enhanced: true,
            streaming: true,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SystemConfig {
    pub ollama_host: String,
    pub ollama_port: u16,
    /// Total attempts per dispatch, first attempt included.
    pub max_retries: u32,
    /// Seconds between attempts.
    pub retry_delay: u64,
    /// Seconds allowed for the backend health probe.
    pub connection_timeout: u64,
    pub max_tool_iterations: usize,
    pub auto_start_backend: bool,
    pub startup_wait_secs: u64,
}

impl Default for SystemConfig {
    fn default() -> Self {
        Self {
            ollama_host: "127.0.0.1".into(),
            ollama_port: 11434,
            max_retries: 3,
            retry_delay: 2,
            connection_timeout: 5,
            max_tool_iterations: 6,
            auto_start_backend: true,
            startup_wait_secs: 30,
        }
    }
}

impl SystemConfig {
    /// Base URL of the model server.
    pub fn base_url(&self) -> String {
        format!("http://{}:{}", self.ollama_host, self.ollama_port)
    }

    pub fn retry_delay(&self) -> Duration {
        Duration::from_secs(self.retry_delay)
    }

    pub fn connection_timeout(&self) -> Duration {
        Duration::from_secs(self.connection_timeout)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SecurityConfig {
    pub max_file_size_mb: u64,
    #[serde(deserialize_with = "string_or_list")]
    pub allowed_image_formats: Vec<String>,
    pub max_input_length: usize,
    pub max_filename_length: usize,
    pub clipboard_retries: u32,
}

impl Default for SecurityConfig {
    fn default() -> Self {
        Self {
            max_file_size_mb: 10,
            allowed_image_formats: ["png", "jpg", "jpeg", "gif", "webp", "bmp"]
                .iter()
                .map(|s| s.to_string())
                .collect(),
            max_input_length: 10_000,
            max_filename_length: 256,
            clipboard_retries: 3,
        }
    }
}

impl SecurityConfig {
    pub fn max_file_size_bytes(&self) -> u64 {
        self.max_file_size_mb * 1024 * 1024
    }

    /// Whether a path has one of the allowed image extensions.
    pub fn is_allowed_image(&self, path: &Path) -> bool {
        path.extension()
            .and_then(|e| e.to_str())
            .map(|ext| {
                let ext = ext.to_lowercase();
                self.allowed_image_formats.iter().any(|f| f.eq_ignore_ascii_case(&ext))
            })
            .unwrap_or(false)
    }
}

/// Ini files carry lists as comma separated strings.
fn string_or_list<'de, D>(deserializer: D) -> std::result::Result<Vec<String>, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum StringOrList {
        String(String),
        List(Vec<String>),
    }

    Ok(match StringOrList::deserialize(deserializer)? {
        StringOrList::String(s) => s
            .split(',')
            .map(|item| item.trim().to_lowercase())
            .filter(|item| !item.is_empty())
            .collect(),
        StringOrList::List(items) => items.into_iter().map(|s| s.trim().to_lowercase()).collect(),
    })
}

/// Sampling options for one scenario's model.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SamplingProfile {
    pub temperature: f32,
    pub top_p: f32,
    pub num_predict: u32,
    pub repeat_penalty: Option<f32>,
}

impl SamplingProfile {
    pub fn for_scenario(scenario: Scenario) -> Self {
        match scenario {
            // Tool calls need determinism and short output.
            Scenario::Tool => Self { temperature: 0.3, top_p: 0.9, num_predict: 512, repeat_penalty: None },
            Scenario::Text => Self { temperature: 0.7, top_p: 0.9, num_predict: 1024, repeat_penalty: None },
            Scenario::Vision => Self { temperature: 0.5, top_p: 0.9, num_predict: 1024, repeat_penalty: None },
            Scenario::Ocr => Self { temperature: 0.1, top_p: 0.8, num_predict: 512, repeat_penalty: Some(1.1) },
        }
    }
}

impl AppConfig {
    /// Load configuration.
    ///
    /// Sources, later ones winning: built-in defaults, `model_config.{ini,toml,yaml,json}`
    /// in the working directory (or `path` when given), `XS__SECTION__KEY`
    /// environment variables.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let mut builder = Config::builder().add_source(Config::try_from(&AppConfig::default())?);

        builder = match path {
            Some(path) => builder.add_source(File::from(path).required(true)),
            None => builder.add_source(File::with_name("model_config").required(false)),
        };

        let settings = builder
            .add_source(Environment::with_prefix("XS").separator("__"))
            .build()?;

        Ok(settings.try_deserialize()?)
    }

    /// Load configuration from an in-memory ini document on top of the defaults.
    pub fn from_ini(content: &str) -> Result<Self> {
        let settings = Config::builder()
            .add_source(Config::try_from(&AppConfig::default())?)
            .add_source(File::from_str(content, FileFormat::Ini))
            .build()?;

        Ok(settings.try_deserialize()?)
    }

    /// Model identifier configured for a scenario.
    pub fn model_for(&self, scenario: Scenario) -> &str {
        match scenario {
            Scenario::Text => &self.models.text_model,
            Scenario::Tool => &self.models.tool_model,
            Scenario::Vision => &self.models.vision_model,
            Scenario::Ocr => &self.models.ocr_model,
        }
    }
}
