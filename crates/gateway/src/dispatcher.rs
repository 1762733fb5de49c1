//! Dispatcher: runs the pipeline of a classified scenario under a bounded
//! retry policy.
//!
//! Backend failures never cross this boundary. Once every attempt has
//! failed, the caller receives an ordinary response holding a
//! user-facing explanation of the last error.

use std::sync::{Arc, Mutex};
use std::time::Duration;

use xs_controller::PipelineRegistry;
use xs_core::{
    config::SystemConfig,
    types::{AgentResponse, Request, Scenario},
    Error,
};

/// Remediation hints appended to the terminal failure message.
const REMEDIATION: &str = "建议：\n1. 检查Ollama服务是否正常运行\n2. 等待片刻后重试\n3. 尝试重启Ollama服务";

/// Sink for user-facing status lines.
///
/// Status lines are part of the program output, separate from logs.
pub trait StatusReporter: Send + Sync {
    fn report(&self, line: &str);
}

/// Writes status lines to stdout.
#[derive(Debug, Default, Clone, Copy)]
pub struct StdoutReporter;

impl StatusReporter for StdoutReporter {
    fn report(&self, line: &str) {
        println!("{}", line);
    }
}

/// Collects status lines in memory.
#[derive(Debug, Default)]
pub struct MemoryReporter {
    lines: Mutex<Vec<String>>,
}

impl MemoryReporter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Lines reported so far.
    pub fn lines(&self) -> Vec<String> {
        self.lines
            .lock()
            .map(|lines| lines.clone())
            .unwrap_or_default()
    }
}

impl StatusReporter for MemoryReporter {
    fn report(&self, line: &str) {
        if let Ok(mut lines) = self.lines.lock() {
            lines.push(line.to_string());
        }
    }
}

/// Fixed-delay retry policy. No backoff growth, no jitter.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Total attempts, including the first.
    pub max_attempts: usize,
    /// Pause between consecutive attempts.
    pub delay: Duration,
}

impl RetryPolicy {
    pub fn new(max_attempts: usize, delay: Duration) -> Self {
        Self {
            max_attempts: max_attempts.max(1),
            delay,
        }
    }

    pub fn from_config(config: &SystemConfig) -> Self {
        Self::new(config.max_retries as usize, config.retry_delay())
    }
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::new(3, Duration::from_secs(2))
    }
}

/// Invokes pipelines from a registry.
pub struct Dispatcher<'a> {
    registry: &'a PipelineRegistry,
    policy: RetryPolicy,
    reporter: Arc<dyn StatusReporter>,
}

impl<'a> Dispatcher<'a> {
    pub fn new(registry: &'a PipelineRegistry, reporter: Arc<dyn StatusReporter>) -> Self {
        Self {
            registry,
            policy: RetryPolicy::default(),
            reporter,
        }
    }

    pub fn with_policy(mut self, policy: RetryPolicy) -> Self {
        self.policy = policy;
        self
    }

    pub fn policy(&self) -> RetryPolicy {
        self.policy
    }

    pub fn registry(&self) -> &'a PipelineRegistry {
        self.registry
    }

    pub fn reporter(&self) -> &Arc<dyn StatusReporter> {
        &self.reporter
    }

    /// Report the scenario and the model that will serve it.
    pub fn announce(&self, scenario: Scenario) {
        let model = self.registry.get(scenario).model_id();
        tracing::info!(scenario = %scenario, model = model, "Dispatching request");
        self.reporter
            .report(&format!("[系统] 检测到场景类型: {}", scenario));
        self.reporter.report(&format!("[系统] 当前使用模型: {}", model));
    }

    /// Announce the selection, then run the pipeline with retries.
    pub async fn dispatch(&self, scenario: Scenario, request: &Request) -> AgentResponse {
        self.announce(scenario);
        self.invoke_with_retry(scenario, request).await
    }

    /// Run the pipeline of `scenario`, retrying failures.
    ///
    /// Attempts are strictly sequential and all use the same request.
    pub async fn invoke_with_retry(&self, scenario: Scenario, request: &Request) -> AgentResponse {
        let pipeline = self.registry.get(scenario);
        let max_attempts = self.policy.max_attempts;
        let mut last_error = None;

        for attempt in 1..=max_attempts {
            match pipeline.invoke(request).await {
                Ok(response) => {
                    tracing::debug!(scenario = %scenario, attempt, "Pipeline succeeded");
                    return response;
                }
                Err(e) => {
                    tracing::warn!(
                        scenario = %scenario,
                        attempt,
                        error = %e,
                        trace_id = %request.trace_id,
                        "Pipeline attempt failed"
                    );
                    if attempt < max_attempts {
                        self.reporter
                            .report(&format!("[系统] 第{}次尝试失败，正在重试...", attempt));
                        self.report_error(&e);
                        tokio::time::sleep(self.policy.delay).await;
                    } else {
                        self.reporter.report("[系统] 所有重试均失败");
                        self.report_error(&e);
                    }
                    last_error = Some(e);
                }
            }
        }

        let message = match last_error {
            Some(e) => failure_message(&e),
            None => failure_message(&Error::internal("no attempt was made")),
        };
        AgentResponse::text(message)
    }

    fn report_error(&self, error: &Error) {
        self.reporter
            .report(&format!("[系统] 错误类型: {}", error.kind()));
        self.reporter.report(&format!("[系统] 错误详情: {}", error));
    }
}

/// Terminal message shown when every attempt failed.
pub fn failure_message(error: &Error) -> String {
    format!(
        "抱歉，处理请求时遇到问题（{}）：{}\n\n{}",
        error.kind(),
        error,
        REMEDIATION
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use xs_core::{mocks::FlakyPipeline, Pipeline};

    fn registry_with(scenario: Scenario, pipeline: Arc<FlakyPipeline>) -> PipelineRegistry {
        PipelineRegistry::from_fn(|s| -> Arc<dyn Pipeline> {
            if s == scenario {
                pipeline.clone()
            } else {
                Arc::new(FlakyPipeline::new(s, 0, "unused"))
            }
        })
    }

    #[tokio::test(start_paused = true)]
    async fn test_succeeds_on_third_attempt() {
        let pipeline = Arc::new(FlakyPipeline::new(Scenario::Vision, 2, "看到一只猫"));
        let registry = registry_with(Scenario::Vision, pipeline.clone());
        let reporter = Arc::new(MemoryReporter::new());
        let dispatcher = Dispatcher::new(&registry, reporter.clone());

        let start = tokio::time::Instant::now();
        let response = dispatcher
            .dispatch(Scenario::Vision, &Request::new("cat.png"))
            .await;

        assert_eq!(response.first_text().as_deref(), Some("看到一只猫"));
        assert_eq!(pipeline.attempts(), 3);
        // two pauses of two seconds each
        let elapsed = start.elapsed();
        assert!(elapsed >= Duration::from_secs(4) && elapsed < Duration::from_secs(5));

        let lines = reporter.lines();
        assert_eq!(lines[0], "[系统] 检测到场景类型: vision");
        assert_eq!(lines[1], "[系统] 当前使用模型: mock-vision");
        assert!(lines.contains(&"[系统] 第1次尝试失败，正在重试...".to_string()));
        assert!(lines.contains(&"[系统] 第2次尝试失败，正在重试...".to_string()));
    }

    #[tokio::test(start_paused = true)]
    async fn test_exhaustion_yields_message() {
        let pipeline = Arc::new(FlakyPipeline::always_failing(Scenario::Text));
        let registry = registry_with(Scenario::Text, pipeline.clone());
        let dispatcher = Dispatcher::new(&registry, Arc::new(MemoryReporter::new()));

        let response = dispatcher
            .dispatch(Scenario::Text, &Request::new("你好"))
            .await;

        assert_eq!(pipeline.attempts(), 3);
        let text = response.first_text().unwrap();
        assert!(text.contains("connection refused (attempt 3)"));
        assert!(text.contains("ModelProvider"));
        assert!(text.contains("检查Ollama服务是否正常运行"));
    }

    #[tokio::test(start_paused = true)]
    async fn test_custom_policy() {
        let pipeline = Arc::new(FlakyPipeline::always_failing(Scenario::Tool));
        let registry = registry_with(Scenario::Tool, pipeline.clone());
        let dispatcher = Dispatcher::new(&registry, Arc::new(MemoryReporter::new()))
            .with_policy(RetryPolicy::new(5, Duration::from_millis(100)));

        let start = tokio::time::Instant::now();
        dispatcher
            .invoke_with_retry(Scenario::Tool, &Request::new("x"))
            .await;

        assert_eq!(pipeline.attempts(), 5);
        let elapsed = start.elapsed();
        assert!(elapsed >= Duration::from_millis(400) && elapsed < Duration::from_millis(500));
    }

    #[test]
    fn test_policy_never_zero() {
        assert_eq!(RetryPolicy::new(0, Duration::ZERO).max_attempts, 1);
        let config = SystemConfig::default();
        let policy = RetryPolicy::from_config(&config);
        assert_eq!(policy, RetryPolicy::default());
    }
}
