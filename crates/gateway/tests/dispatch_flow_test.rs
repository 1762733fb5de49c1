use std::sync::Arc;
use std::time::Duration;

use xs_controller::PipelineRegistry;
use xs_core::mocks::FlakyPipeline;
use xs_core::traits::Pipeline;
use xs_core::types::{Request, Scenario};
use xs_gateway::{Dispatcher, MemoryReporter, Renderer, RequestHandler, RetryPolicy};

fn flaky_registry(failures: usize) -> (PipelineRegistry, Vec<Arc<FlakyPipeline>>) {
    let pipelines: Vec<Arc<FlakyPipeline>> = Scenario::ALL
        .iter()
        .map(|s| Arc::new(FlakyPipeline::new(*s, failures, &format!("{} ok", s))))
        .collect();
    let registry = PipelineRegistry::from_fn(|s| -> Arc<dyn Pipeline> {
        let index = Scenario::ALL.iter().position(|x| *x == s).unwrap_or(0);
        pipelines[index].clone()
    });
    (registry, pipelines)
}

#[tokio::test(start_paused = true)]
async fn test_exhausted_retries_are_rendered_not_raised() {
    let (registry, pipelines) = flaky_registry(usize::MAX);
    let reporter = Arc::new(MemoryReporter::new());
    let handler = RequestHandler::new(Dispatcher::new(&registry, reporter.clone()));
    let mut renderer = Renderer::new(Vec::new());

    let shown = handler
        .handle(&Request::new("下载视频 http://example.com/a.mp4"), &mut renderer)
        .await
        .expect("writer never fails");

    assert!(shown.starts_with("抱歉，处理请求时遇到问题"));
    assert!(shown.contains("connection refused (attempt 3)"));
    assert!(shown.contains("2. 等待片刻后重试"));

    let tool = &pipelines[Scenario::ALL.iter().position(|s| *s == Scenario::Tool).unwrap()];
    assert_eq!(tool.attempts(), 3);

    let lines = reporter.lines();
    assert_eq!(lines[0], "[系统] 检测到场景类型: tool");
    assert!(lines.contains(&"[系统] 所有重试均失败".to_string()));
    assert!(lines.contains(&"[系统] 错误类型: ModelProvider".to_string()));
}

#[tokio::test(start_paused = true)]
async fn test_each_scenario_reaches_its_pipeline() {
    let (registry, _) = flaky_registry(0);
    let handler = RequestHandler::new(Dispatcher::new(&registry, Arc::new(MemoryReporter::new())))
        .with_streaming(false);

    let cases = [
        ("ocr 请识别这张发票", "ocr ok"),
        ("下载视频 http://example.com/a.mp4", "tool ok"),
        ("report.png", "vision ok"),
        ("你好，今天天气怎么样", "text ok"),
    ];

    for (input, expected) in cases {
        let mut renderer = Renderer::new(Vec::new());
        let shown = handler.handle(&Request::new(input), &mut renderer).await.unwrap();
        assert_eq!(shown, expected, "input: {}", input);
    }
}

#[tokio::test(start_paused = true)]
async fn test_retry_delay_is_fixed() {
    let (registry, pipelines) = flaky_registry(2);
    let dispatcher = Dispatcher::new(&registry, Arc::new(MemoryReporter::new()))
        .with_policy(RetryPolicy::new(3, Duration::from_secs(2)));

    let start = tokio::time::Instant::now();
    let response = dispatcher.dispatch(Scenario::Ocr, &Request::new("ocr x")).await;
    let elapsed = start.elapsed();

    assert_eq!(response.first_text().as_deref(), Some("ocr ok"));
    assert!(elapsed >= Duration::from_secs(4) && elapsed < Duration::from_secs(5));
    let ocr = &pipelines[Scenario::ALL.iter().position(|s| *s == Scenario::Ocr).unwrap()];
    assert_eq!(ocr.attempts(), 3);
}
