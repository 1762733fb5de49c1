//! Built-in tools.

use async_trait::async_trait;
use serde_json::{json, Value};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::process::Command;

use xs_core::{
    config::SecurityConfig,
    traits::{ModelClient, Tool},
    types::{AgentResponse, ChatMessage, ToolOutput},
    Error, Result,
};
use xs_governance::validate_image_file;

use crate::image::{format_ocr_result, resolve_image};

/// Role of the model behind the image reader.
pub const IMAGE_READER_ROLE: &str = "你可以识别图片上的内容，并用语言描述图片内容。";

/// Role of the model behind the OCR tool.
pub const OCR_ROLE: &str = "你是一个专业的OCR（文字识别）助手。请专注于：

1. 准确识别并提取图片中的所有文字内容
2. 保持原文的格式、换行和段落结构
3. 如果是表格，请保持表格结构
4. 如果是多语言内容，请保持原有语言
5. 只输出识别的文字，不添加任何额外描述、分析或解读

重要约束：
- 不要解释图片内容
- 不要分析图片含义
- 不要添加任何评论或建议
- 只输出原始文字内容";

/// Prompt used when OCR is requested without instructions.
pub const DEFAULT_OCR_PROMPT: &str = "请识别图片中的所有文字内容。";

/// Shown when OCR finds no text.
pub const OCR_EMPTY_RESULT: &str = "OCR识别完成，但未提取到文字内容";

/// Final OCR text from the model's answer.
pub fn ocr_answer(raw: &str) -> String {
    let text = format_ocr_result(raw);
    if text.trim().is_empty() {
        OCR_EMPTY_RESULT.to_string()
    } else {
        text
    }
}

fn str_arg<'a>(args: &'a Value, key: &str) -> &'a str {
    args.get(key).and_then(Value::as_str).unwrap_or("")
}

fn image_error_output(err: Error) -> ToolOutput {
    match err {
        Error::InvalidImage(msg) => ToolOutput::error(msg),
        other => ToolOutput::error(other.to_string()),
    }
}

// =============================================================================
// Image Reader Tool
// =============================================================================

/// Describes an image with the vision model.
pub struct ImagesReaderTool {
    client: Arc<dyn ModelClient>,
    working_dir: PathBuf,
}

impl ImagesReaderTool {
    pub fn new(client: Arc<dyn ModelClient>, working_dir: impl Into<PathBuf>) -> Self {
        Self {
            client,
            working_dir: working_dir.into(),
        }
    }
}

#[async_trait]
impl Tool for ImagesReaderTool {
    fn name(&self) -> &str {
        "images_reader"
    }

    fn description(&self) -> &str {
        "根据用户的提示词，识别并分析图片的内容"
    }

    fn parameters(&self) -> Value {
        json!({
            "type": "object",
            "properties": {
                "prompt": {
                    "type": "string",
                    "description": "用户的提示词"
                },
                "image_dir": {
                    "type": "string",
                    "description": "图片的本地位置（可以是文件路径或目录路径）"
                }
            },
            "required": ["prompt", "image_dir"]
        })
    }

    async fn execute(&self, args: Value) -> Result<ToolOutput> {
        let prompt = str_arg(&args, "prompt");
        let location = str_arg(&args, "image_dir");

        let image = match resolve_image(location, prompt, &self.working_dir) {
            Ok(image) => image,
            Err(e) => return Ok(image_error_output(e)),
        };

        tracing::info!(tool = "images_reader", image = %image.display(), "Reading image");
        let messages = [
            ChatMessage::system(IMAGE_READER_ROLE),
            ChatMessage::user(prompt).with_image(&image),
        ];

        match self.client.chat(&messages, &[]).await {
            Ok(reply) => {
                let text = AgentResponse::new(reply.segments)
                    .first_text()
                    .unwrap_or_else(|| "图像识别完成，但无法提取结果文本".to_string());
                Ok(ToolOutput::text(text).with_data(json!({ "image": image })))
            }
            Err(e) => {
                tracing::warn!(tool = "images_reader", error = %e, "Image reading failed");
                Ok(ToolOutput::error(format!("图像识别过程中出现错误: {}", e)))
            }
        }
    }
}

// =============================================================================
// OCR Tool
// =============================================================================

/// Extracts text from an image with the OCR model.
pub struct OcrImageTool {
    client: Arc<dyn ModelClient>,
    security: SecurityConfig,
    working_dir: PathBuf,
}

impl OcrImageTool {
    pub fn new(
        client: Arc<dyn ModelClient>,
        security: SecurityConfig,
        working_dir: impl Into<PathBuf>,
    ) -> Self {
        Self {
            client,
            security,
            working_dir: working_dir.into(),
        }
    }
}

/// OCR prompt for optional user instructions.
pub fn ocr_prompt(instructions: &str) -> String {
    if instructions.trim().is_empty() {
        DEFAULT_OCR_PROMPT.to_string()
    } else {
        format!("请识别图片中的文字内容。{}", instructions)
    }
}

#[async_trait]
impl Tool for OcrImageTool {
    fn name(&self) -> &str {
        "ocr_image"
    }

    fn description(&self) -> &str {
        "专用OCR文字识别工具，只提取图片中的文字"
    }

    fn parameters(&self) -> Value {
        json!({
            "type": "object",
            "properties": {
                "prompt": {
                    "type": "string",
                    "description": "识别要求"
                },
                "image_path": {
                    "type": "string",
                    "description": "图片文件路径"
                }
            },
            "required": ["image_path"]
        })
    }

    async fn execute(&self, args: Value) -> Result<ToolOutput> {
        let raw_path = Path::new(str_arg(&args, "image_path"));
        let path = if raw_path.is_absolute() {
            raw_path.to_path_buf()
        } else {
            self.working_dir.join(raw_path)
        };

        let image = match validate_image_file(&path, &self.security) {
            Ok(image) => image,
            Err(Error::InvalidImage(msg)) => return Ok(ToolOutput::error(format!("错误: {}", msg))),
            Err(e) => return Ok(ToolOutput::error(format!("错误: {}", e))),
        };

        tracing::info!(tool = "ocr_image", image = %image.display(), "Running OCR");
        let messages = [
            ChatMessage::system(OCR_ROLE),
            ChatMessage::user(ocr_prompt(str_arg(&args, "prompt"))).with_image(&image),
        ];

        match self.client.chat(&messages, &[]).await {
            Ok(reply) => Ok(ToolOutput::text(ocr_answer(&reply.text_content()))),
            Err(e) => {
                tracing::warn!(tool = "ocr_image", error = %e, "OCR failed");
                Ok(ToolOutput::error(format!("OCR识别过程中出现错误: {}", e)))
            }
        }
    }
}

// =============================================================================
// Image Generation Tool
// =============================================================================

/// Message returned by the image generation tool.
pub const IMAGE_GENERATION_UNAVAILABLE: &str = "🚫 图像生成功能暂不可用

当前使用本地Ollama模型，Ollama本身不支持图像生成。

如需图像生成功能，您可以使用其他图像生成服务：
- Stable Diffusion WebUI
- ComfyUI

当前可用的功能：
- ✅ 图像识别和内容分析
- ✅ 文字识别
- ✅ 文本对话和问答
- ✅ 视频下载";

/// Image generation placeholder. The local backend cannot generate images.
pub struct CreateImagesTool;

#[async_trait]
impl Tool for CreateImagesTool {
    fn name(&self) -> &str {
        "create_images"
    }

    fn description(&self) -> &str {
        "图像生成工具（当前版本暂不支持）"
    }

    fn parameters(&self) -> Value {
        json!({
            "type": "object",
            "properties": {
                "prompt": { "type": "string", "description": "用户的提示词" },
                "images": {
                    "type": "array",
                    "items": { "type": "string" },
                    "description": "本地图片的访问路径组成的列表"
                },
                "save_dir": { "type": "string", "description": "生成图片保存的位置" }
            },
            "required": ["prompt"]
        })
    }

    async fn execute(&self, args: Value) -> Result<ToolOutput> {
        tracing::info!(tool = "create_images", prompt = str_arg(&args, "prompt"), "Image generation requested");
        Ok(ToolOutput::error(IMAGE_GENERATION_UNAVAILABLE))
    }
}

// =============================================================================
// Video Download Tool
// =============================================================================

/// Downloads a video with `yt-dlp`.
pub struct DownloadVideoTool {
    program: String,
    default_dir: PathBuf,
}

impl DownloadVideoTool {
    pub fn new(default_dir: impl Into<PathBuf>) -> Self {
        Self {
            program: "yt-dlp".to_string(),
            default_dir: default_dir.into(),
        }
    }

    /// Use another downloader executable with the same command line.
    pub fn with_program(mut self, program: impl Into<String>) -> Self {
        self.program = program.into();
        self
    }
}

fn tail(text: &str, lines: usize) -> String {
    let all: Vec<&str> = text.lines().filter(|l| !l.trim().is_empty()).collect();
    all[all.len().saturating_sub(lines)..].join("\n")
}

#[async_trait]
impl Tool for DownloadVideoTool {
    fn name(&self) -> &str {
        "download_video"
    }

    fn description(&self) -> &str {
        "下载视频到指定目录"
    }

    fn parameters(&self) -> Value {
        json!({
            "type": "object",
            "properties": {
                "url": { "type": "string", "description": "视频地址" },
                "save_dir": { "type": "string", "description": "视频保存的目录，默认为当前目录" }
            },
            "required": ["url"]
        })
    }

    async fn execute(&self, args: Value) -> Result<ToolOutput> {
        let url = str_arg(&args, "url").trim();
        if url.is_empty() {
            return Err(Error::invalid_request("url is required"));
        }

        let save_dir = match str_arg(&args, "save_dir").trim() {
            "" => self.default_dir.clone(),
            dir => PathBuf::from(dir),
        };

        tracing::info!(tool = "download_video", url = url, dir = %save_dir.display(), "Downloading video");
        let output = Command::new(&self.program)
            .arg("-P")
            .arg(&save_dir)
            .arg(url)
            .output()
            .await;

        match output {
            Ok(output) if output.status.success() => {
                let stdout = String::from_utf8_lossy(&output.stdout);
                Ok(ToolOutput::text(format!(
                    "视频已下载到 {}\n{}",
                    save_dir.display(),
                    tail(&stdout, 5)
                ))
                .with_data(json!({ "save_dir": save_dir, "url": url })))
            }
            Ok(output) => {
                let stderr = String::from_utf8_lossy(&output.stderr);
                Ok(ToolOutput::error(format!("视频下载失败: {}", tail(&stderr, 5))))
            }
            Err(e) => Ok(ToolOutput::error(format!(
                "无法启动 {}: {}",
                self.program, e
            ))),
        }
    }
}
