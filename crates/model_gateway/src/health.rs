//! Backend availability: probe the Ollama server and start it when absent.

use std::process::Stdio;
use std::time::Duration;
use tokio::time::Instant;
use tracing::{info, warn};

use xs_core::{config::SystemConfig, Error, Result};

const POLL_INTERVAL: Duration = Duration::from_secs(2);
const PROGRESS_EVERY: Duration = Duration::from_secs(10);

/// Probes `GET /api/tags` and optionally launches `ollama serve`.
#[derive(Debug, Clone)]
pub struct BackendProbe {
    client: reqwest::Client,
    base_url: String,
    program: String,
    auto_start: bool,
    startup_wait: Duration,
    poll_interval: Duration,
}

impl BackendProbe {
    pub fn new(system: &SystemConfig) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(system.connection_timeout())
            .build()
            .map_err(|e| Error::internal(format!("failed to build HTTP client: {e}")))?;

        Ok(Self {
            client,
            base_url: system.base_url(),
            program: "ollama".to_string(),
            auto_start: system.auto_start_backend,
            startup_wait: Duration::from_secs(system.startup_wait_secs),
            poll_interval: POLL_INTERVAL,
        })
    }

    pub fn with_base_url(mut self, url: impl Into<String>) -> Self {
        let url: String = url.into();
        self.base_url = url.trim_end_matches('/').to_string();
        self
    }

    /// Program launched with `serve` when the backend is down.
    pub fn with_program(mut self, program: impl Into<String>) -> Self {
        self.program = program.into();
        self
    }

    pub fn with_poll_interval(mut self, interval: Duration) -> Self {
        self.poll_interval = interval;
        self
    }

    /// True when the server answers the model listing with success.
    pub async fn is_available(&self) -> bool {
        let url = format!("{}/api/tags", self.base_url);
        match self.client.get(&url).send().await {
            Ok(response) => response.status().is_success(),
            Err(e) => {
                info!(url = %url, error = %e, "backend probe failed");
                false
            }
        }
    }

    /// Make sure the backend answers, starting it if allowed.
    ///
    /// `progress` receives the user-facing status lines.
    pub async fn ensure_available(&self, mut progress: impl FnMut(&str)) -> Result<()> {
        if self.is_available().await {
            return Ok(());
        }
        if !self.auto_start {
            return Err(Error::BackendUnavailable(format!(
                "Ollama服务未运行 ({})",
                self.base_url
            )));
        }

        progress("检测到Ollama服务未运行，正在启动...");
        tokio::process::Command::new(&self.program)
            .arg("serve")
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .spawn()
            .map_err(|e| {
                Error::BackendUnavailable(format!("未找到Ollama命令。请确保已安装Ollama。({e})"))
            })?;

        let started = Instant::now();
        let mut next_report = PROGRESS_EVERY;
        while started.elapsed() < self.startup_wait {
            tokio::time::sleep(self.poll_interval).await;
            if self.is_available().await {
                info!(waited_ms = started.elapsed().as_millis() as u64, "backend started");
                progress("Ollama服务已成功启动！");
                return Ok(());
            }
            let elapsed = started.elapsed();
            if elapsed >= next_report {
                progress(&format!("Ollama服务仍在启动中... ({}s)", elapsed.as_secs()));
                next_report += PROGRESS_EVERY;
            }
        }

        warn!(wait_secs = self.startup_wait.as_secs(), "backend did not start in time");
        Err(Error::BackendUnavailable(
            "Ollama服务启动超时，请手动检查。".to_string(),
        ))
    }
}
