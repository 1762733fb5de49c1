use serde_json::{json, Value};
use std::sync::Arc;
use std::time::Duration;
use wiremock::matchers::{body_partial_json, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

use xs_controller::{build_registry, PipelineRegistry};
use xs_core::config::AppConfig;
use xs_core::types::Request;
use xs_gateway::{Dispatcher, MemoryReporter, Renderer, RequestHandler, RetryPolicy};
use xs_model_gateway::create_client;

// =============================================================================
// Helpers
// =============================================================================

fn config_for(server: &MockServer) -> AppConfig {
    let mut config = AppConfig::default();
    let address = server.address();
    config.system.ollama_host = address.ip().to_string();
    config.system.ollama_port = address.port();
    config
}

fn registry_for(config: &AppConfig, dir: &std::path::Path) -> PipelineRegistry {
    build_registry(config, dir, |scenario| create_client(config, scenario)).unwrap()
}

fn chat_reply(message: Value) -> ResponseTemplate {
    ResponseTemplate::new(200).set_body_json(json!({"message": message, "done": true}))
}

async fn serve(
    registry: &PipelineRegistry,
    streaming: bool,
    request: &Request,
) -> (String, Vec<String>) {
    let reporter = Arc::new(MemoryReporter::new());
    let dispatcher = Dispatcher::new(registry, reporter.clone())
        .with_policy(RetryPolicy::new(3, Duration::ZERO));
    let handler = RequestHandler::new(dispatcher).with_streaming(streaming);

    let mut out = Renderer::new(Vec::new());
    handler.handle(request, &mut out).await.unwrap();
    (String::from_utf8(out.into_inner()).unwrap(), reporter.lines())
}

// =============================================================================
// Flows
// =============================================================================

#[tokio::test]
async fn test_text_request_streams_from_backend() {
    let server = MockServer::start().await;
    let body = concat!(
        "{\"message\":{\"role\":\"assistant\",\"content\":\"你好\"},\"done\":false}\n",
        "{\"message\":{\"role\":\"assistant\",\"content\":\"！\"},\"done\":false}\n",
        "{\"message\":{\"role\":\"assistant\",\"content\":\"\"},\"done\":true}\n",
    );
    Mock::given(method("POST"))
        .and(path("/api/chat"))
        .and(body_partial_json(json!({"model": "gpt-oss:20b", "stream": true})))
        .respond_with(ResponseTemplate::new(200).set_body_raw(body, "application/x-ndjson"))
        .mount(&server)
        .await;

    let dir = tempfile::tempdir().unwrap();
    let config = config_for(&server);
    let registry = registry_for(&config, dir.path());

    let request = Request::new("你好").with_working_dir("/home/me");
    let (shown, status) = serve(&registry, true, &request).await;

    assert_eq!(shown, "你好！\n");
    assert_eq!(
        status,
        vec!["[系统] 检测到场景类型: text", "[系统] 当前使用模型: gpt-oss:20b"]
    );

    let sent = server.received_requests().await.unwrap();
    let body: Value = sent[0].body_json().unwrap();
    assert_eq!(body["messages"][1]["content"], "你好 当前目录为：/home/me");
    assert_eq!(body["options"]["temperature"].as_f64().map(|t| (t * 10.0).round()), Some(7.0));
}

#[tokio::test]
async fn test_vision_request_runs_image_tool() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/api/chat"))
        .respond_with(chat_reply(json!({
            "role": "assistant",
            "content": "",
            "tool_calls": [{"function": {
                "name": "images_reader",
                "arguments": {"prompt": "这是什么", "image_dir": "cat.png"}
            }}]
        })))
        .up_to_n_times(1)
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/api/chat"))
        .respond_with(chat_reply(json!({
            "role": "assistant",
            "content": "<think>橙色的毛</think>一只橘猫"
        })))
        .up_to_n_times(1)
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/api/chat"))
        .respond_with(chat_reply(json!({
            "role": "assistant",
            "content": "图片里是一只橘猫",
            "thinking": "工具已经回答"
        })))
        .mount(&server)
        .await;

    let dir = tempfile::tempdir().unwrap();
    std::fs::write(dir.path().join("cat.png"), b"png").unwrap();
    let config = config_for(&server);
    let registry = registry_for(&config, dir.path());

    let request = Request::new("cat.png 是什么").with_working_dir(dir.path().display().to_string());
    let (shown, status) = serve(&registry, true, &request).await;

    assert_eq!(shown, "图片里是一只橘猫\n");
    assert_eq!(status[0], "[系统] 检测到场景类型: vision");
    assert_eq!(status[1], "[系统] 当前使用模型: qwen3-vl:8b");

    let sent = server.received_requests().await.unwrap();
    assert_eq!(sent.len(), 3);
    let tool_call: Value = sent[1].body_json().unwrap();
    assert_eq!(tool_call["messages"][1]["images"], json!(["cG5n"]));
    assert!(tool_call.get("tools").is_none());
    let final_round: Value = sent[2].body_json().unwrap();
    let observation = final_round["messages"].as_array().unwrap().last().unwrap().clone();
    assert_eq!(observation["role"], "tool");
    assert_eq!(observation["content"], "一只橘猫");
}

#[tokio::test]
async fn test_failing_backend_is_reported_not_raised() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/api/chat"))
        .respond_with(ResponseTemplate::new(500).set_body_json(json!({"error": "out of memory"})))
        .mount(&server)
        .await;

    let dir = tempfile::tempdir().unwrap();
    let config = config_for(&server);
    let registry = registry_for(&config, dir.path());

    let (shown, status) = serve(&registry, true, &Request::new("讲个笑话")).await;

    assert!(shown.starts_with("抱歉，处理请求时遇到问题（ModelProvider）"));
    assert!(shown.contains("out of memory"));
    assert!(status.iter().any(|l| l.starts_with("[系统] 流式响应失败，切换到普通模式")));
    assert_eq!(status.last().map(String::as_str), Some("[系统] 错误详情: Model provider error: Ollama error (500 Internal Server Error): out of memory"));
    assert!(status.contains(&"[系统] 所有重试均失败".to_string()));

    // one streaming attempt, then three buffered attempts
    assert_eq!(server.received_requests().await.unwrap().len(), 4);
}
