use futures::StreamExt;
use serde_json::json;
use std::fs;
use std::sync::Arc;

use xs_controller::{build_registry, PipelineRegistry};
use xs_core::config::AppConfig;
use xs_core::mocks::ScriptedModel;
use xs_core::traits::{ModelClient, Pipeline};
use xs_core::types::{ModelReply, Request, Role, Scenario, ToolCall};

struct Models {
    text: Arc<ScriptedModel>,
    tool: Arc<ScriptedModel>,
    vision: Arc<ScriptedModel>,
    ocr: Arc<ScriptedModel>,
}

impl Models {
    fn for_scenario(&self, scenario: Scenario) -> Arc<dyn ModelClient> {
        match scenario {
            Scenario::Text => self.text.clone(),
            Scenario::Tool => self.tool.clone(),
            Scenario::Vision => self.vision.clone(),
            Scenario::Ocr => self.ocr.clone(),
        }
    }
}

fn registry_with(models: &Models, dir: &std::path::Path) -> PipelineRegistry {
    build_registry(&AppConfig::default(), dir, |s| Ok(models.for_scenario(s))).unwrap()
}

#[tokio::test]
async fn test_models_follow_scenarios() {
    let dir = tempfile::tempdir().unwrap();
    let models = Models {
        text: Arc::new(ScriptedModel::constant("gpt-oss:20b", "hi")),
        tool: Arc::new(ScriptedModel::constant("tool-model", "ok")),
        vision: Arc::new(ScriptedModel::constant("qwen3-vl:8b", "seen")),
        ocr: Arc::new(ScriptedModel::constant("ocr-model", "text")),
    };
    let registry = registry_with(&models, dir.path());

    assert_eq!(registry.model_for(Scenario::Text), "gpt-oss:20b");
    assert_eq!(registry.model_for(Scenario::Tool), "tool-model");
    assert_eq!(registry.model_for(Scenario::Vision), "qwen3-vl:8b");
    assert_eq!(registry.model_for(Scenario::Ocr), "ocr-model");
    for scenario in Scenario::ALL {
        assert_eq!(registry.get(scenario).scenario(), scenario);
    }
    assert_eq!(registry.iter().count(), 4);
}

#[tokio::test]
async fn test_toolsets_per_scenario() {
    let dir = tempfile::tempdir().unwrap();
    let models = Models {
        text: Arc::new(ScriptedModel::constant("t", "hi")),
        tool: Arc::new(ScriptedModel::constant("tool", "ok")),
        vision: Arc::new(ScriptedModel::constant("v", "seen")),
        ocr: Arc::new(ScriptedModel::constant("o", "text")),
    };
    let registry = registry_with(&models, dir.path());

    for scenario in Scenario::ALL {
        registry.get(scenario).invoke(&Request::new("x")).await.unwrap();
    }

    assert!(models.text.offered_tools()[0].is_empty());
    assert_eq!(
        models.tool.offered_tools()[0],
        vec!["create_images", "download_video", "images_reader", "ocr_image"]
    );
    assert_eq!(models.vision.offered_tools()[0], vec!["images_reader"]);
    assert_eq!(models.ocr.offered_tools()[0], vec!["ocr_image"]);
}

#[tokio::test]
async fn test_vision_pipeline_reads_image_through_tool() {
    let dir = tempfile::tempdir().unwrap();
    fs::write(dir.path().join("cat.png"), "png").unwrap();
    let vision = Arc::new(ScriptedModel::new(
        "qwen3-vl:8b",
        vec![
            ModelReply::tool_calls(vec![ToolCall::new(
                "images_reader",
                json!({"prompt": "这是什么", "image_dir": "cat.png"}),
            )]),
            ModelReply::text("一只橘猫"),
            ModelReply::text("图片里是一只橘猫"),
        ],
    ));
    let models = Models {
        text: Arc::new(ScriptedModel::constant("t", "hi")),
        tool: Arc::new(ScriptedModel::constant("tool", "ok")),
        vision: vision.clone(),
        ocr: Arc::new(ScriptedModel::constant("o", "text")),
    };
    let registry = registry_with(&models, dir.path());

    let request = Request::new("cat.png 是什么").with_working_dir(dir.path().display().to_string());
    let response = registry.get(Scenario::Vision).invoke(&request).await.unwrap();

    assert_eq!(response.first_text().as_deref(), Some("图片里是一只橘猫"));

    let calls = vision.calls();
    assert_eq!(calls.len(), 3);
    // the tool's own call carries the image
    assert_eq!(calls[1][1].images, vec![dir.path().join("cat.png")]);
    let observation = calls[2].last().unwrap();
    assert_eq!(observation.role, Role::Tool);
    assert_eq!(observation.content, "一只橘猫");
}

#[tokio::test]
async fn test_text_pipeline_streams() {
    let dir = tempfile::tempdir().unwrap();
    let models = Models {
        text: Arc::new(ScriptedModel::constant("t", "hi").with_chunks(&["你", "好"])),
        tool: Arc::new(ScriptedModel::constant("tool", "ok")),
        vision: Arc::new(ScriptedModel::constant("v", "seen")),
        ocr: Arc::new(ScriptedModel::constant("o", "text")),
    };
    let registry = registry_with(&models, dir.path());

    let stream = registry
        .get(Scenario::Text)
        .stream(&Request::new("你好"))
        .await
        .unwrap();
    let chunks: Vec<String> = stream.map(|c| c.unwrap()).collect().await;

    assert_eq!(chunks.concat(), "你好");
    let sent = &models.text.calls()[0];
    assert_eq!(sent[0].role, Role::System);
    assert_eq!(sent[1].content, "你好");
}
