//! Turns a parsed command into a served request.

use std::io::{self, Write};
use std::path::{Path, PathBuf};

use xs_core::{config::AppConfig, types::Request, types::Scenario, Error, Result};
use xs_gateway::{Renderer, RequestHandler};
use xs_governance::{validate_image_file, InputGuardrail};
use xs_skills::ocr_prompt;

use crate::cli::{Command, OCR_USAGE, USAGE};
use crate::clipboard::{read_clipboard, ClipboardContent, ClipboardSource};

/// Text shown for a user-side problem. Wrapped messages are shown bare.
pub fn user_message(error: &Error) -> String {
    match error {
        Error::InvalidRequest(msg)
        | Error::InvalidImage(msg)
        | Error::Clipboard(msg)
        | Error::BackendUnavailable(msg) => msg.clone(),
        other => other.to_string(),
    }
}

pub fn print_lines<W: Write>(out: &mut Renderer<W>, lines: &[&str]) -> io::Result<()> {
    for line in lines {
        out.line(line)?;
    }
    Ok(())
}

pub struct App<'a, C: ClipboardSource> {
    config: &'a AppConfig,
    handler: RequestHandler<'a>,
    clipboard: C,
    working_dir: PathBuf,
    guardrail: InputGuardrail,
}

impl<'a, C: ClipboardSource> App<'a, C> {
    pub fn new(
        config: &'a AppConfig,
        handler: RequestHandler<'a>,
        clipboard: C,
        working_dir: impl Into<PathBuf>,
    ) -> Self {
        Self {
            config,
            handler,
            clipboard,
            working_dir: working_dir.into(),
            guardrail: InputGuardrail::from_config(&config.security),
        }
    }

    /// Serve one command. Problems are written as text, only writer
    /// failures are errors.
    pub async fn run<W: Write>(&self, command: Command, out: &mut Renderer<W>) -> Result<()> {
        match command {
            Command::Usage => print_lines(out, USAGE)?,
            Command::Ask(text) => self.ask(&text, out).await?,
            Command::Clipboard { question } => {
                let content = match self.clipboard_content(out).await? {
                    Some(content) => content,
                    None => {
                        out.line("剪贴板为空或无法读取内容")?;
                        out.line("提示：请确保已复制图片到剪贴板，或直接使用图片文件路径")?;
                        return Ok(());
                    }
                };
                let input = match question {
                    Some(question) => format!("{} {}", content.as_input(), question),
                    None => content.as_input(),
                };
                self.ask(&input, out).await?;
            }
            Command::Ocr {
                image,
                instructions,
            } => self.ocr(image, instructions, out).await?,
        }
        Ok(())
    }

    async fn ask<W: Write>(&self, text: &str, out: &mut Renderer<W>) -> Result<()> {
        let content = match self.guardrail.validate(text) {
            Ok(content) => content,
            Err(e) => {
                tracing::warn!(error = %e, "Input rejected");
                out.line(&format!("输入验证失败: {}", user_message(&e)))?;
                return Ok(());
            }
        };

        let request = Request::new(content).with_working_dir(self.working_dir.display().to_string());
        self.handler.handle(&request, out).await?;
        Ok(())
    }

    async fn ocr<W: Write>(
        &self,
        image: Option<PathBuf>,
        instructions: Option<String>,
        out: &mut Renderer<W>,
    ) -> Result<()> {
        let location = match image {
            Some(path) => path,
            None => match self.clipboard_content(out).await? {
                Some(content) => PathBuf::from(content.as_input().trim()),
                None => {
                    out.line("剪贴板为空或无法读取内容")?;
                    out.line("提示：请确保已复制图片到剪贴板，或使用 'xs ocr <图片路径>'")?;
                    print_lines(out, OCR_USAGE)?;
                    return Ok(());
                }
            },
        };

        let image = match validate_image_file(&self.resolve(&location), &self.config.security) {
            Ok(image) => image,
            Err(e) => {
                out.line(&format!("错误: {}", user_message(&e)))?;
                return Ok(());
            }
        };

        let instructions = instructions.unwrap_or_default();
        if !instructions.is_empty() {
            if let Err(e) = self.guardrail.validate(&instructions) {
                out.line(&format!("输入验证失败: {}", user_message(&e)))?;
                return Ok(());
            }
        }

        let request = Request::new(ocr_prompt(&instructions)).with_image(image);
        self.handler.handle_as(Scenario::Ocr, &request, out).await?;
        Ok(())
    }

    async fn clipboard_content<W: Write>(
        &self,
        out: &mut Renderer<W>,
    ) -> Result<Option<ClipboardContent>> {
        let mut progress = Vec::new();
        let content = read_clipboard(&self.clipboard, &self.config.security, |line| {
            progress.push(line.to_string())
        })
        .await;
        for line in &progress {
            out.line(line)?;
        }

        match content {
            Ok(content) => Ok(Some(content)),
            Err(e) => {
                tracing::info!(error = %e, "Clipboard unreadable");
                Ok(None)
            }
        }
    }

    fn resolve(&self, path: &Path) -> PathBuf {
        if path.is_absolute() {
            path.to_path_buf()
        } else {
            self.working_dir.join(path)
        }
    }
}
