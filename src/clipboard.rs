//! Clipboard access through the platform's clipboard programs.

use async_trait::async_trait;
use std::path::{Path, PathBuf};
use std::process::Stdio;
use std::time::Duration;
use tokio::process::Command;

use xs_core::{config::SecurityConfig, Error, Result};

const RETRY_DELAY: Duration = Duration::from_millis(500);

/// Clipboard content usable as a request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ClipboardContent {
    Text(String),
    /// Path of an image file: a copied file, or the pasted image saved to disk.
    Image(PathBuf),
}

impl ClipboardContent {
    /// The content as request text.
    pub fn as_input(&self) -> String {
        match self {
            Self::Text(text) => text.clone(),
            Self::Image(path) => path.display().to_string(),
        }
    }
}

/// Raw clipboard reads.
#[async_trait]
pub trait ClipboardSource: Send + Sync {
    /// Text on the clipboard, if any.
    async fn read_text(&self) -> Option<String>;

    /// Save the clipboard image as PNG to `dest`. Returns false when the
    /// clipboard holds no image.
    async fn save_image(&self, dest: &Path) -> bool;
}

/// Clipboard of the running desktop session.
#[derive(Debug, Default, Clone, Copy)]
pub struct SystemClipboard;

#[async_trait]
impl ClipboardSource for SystemClipboard {
    async fn read_text(&self) -> Option<String> {
        let candidates: [(&str, &[&str]); 5] = [
            ("pbpaste", &[]),
            ("wl-paste", &["--no-newline"]),
            ("xclip", &["-selection", "clipboard", "-o"]),
            ("xsel", &["--clipboard", "--output"]),
            ("powershell", &["-NoProfile", "-Command", "Get-Clipboard"]),
        ];
        for (program, args) in candidates {
            if let Some(bytes) = capture(program, args).await {
                let text = String::from_utf8_lossy(&bytes).into_owned();
                if !text.trim().is_empty() {
                    return Some(text);
                }
            }
        }
        None
    }

    async fn save_image(&self, dest: &Path) -> bool {
        let candidates: [(&str, &[&str]); 2] = [
            ("wl-paste", &["--type", "image/png"]),
            ("xclip", &["-selection", "clipboard", "-t", "image/png", "-o"]),
        ];
        for (program, args) in candidates {
            if let Some(bytes) = capture(program, args).await {
                match tokio::fs::write(dest, &bytes).await {
                    Ok(()) => return true,
                    Err(e) => {
                        tracing::warn!(path = %dest.display(), error = %e, "cannot save clipboard image");
                        return false;
                    }
                }
            }
        }
        false
    }
}

/// Stdout of a successful, non-empty program run.
async fn capture(program: &str, args: &[&str]) -> Option<Vec<u8>> {
    let output = Command::new(program)
        .args(args)
        .stdin(Stdio::null())
        .stderr(Stdio::null())
        .kill_on_drop(true)
        .output()
        .await
        .ok()?;
    if output.status.success() && !output.stdout.is_empty() {
        Some(output.stdout)
    } else {
        tracing::debug!(program, status = %output.status, "clipboard program gave nothing");
        None
    }
}

/// Where a pasted image is saved.
pub fn clipboard_image_path() -> PathBuf {
    std::env::temp_dir().join(format!("clipboard_image_{}.png", std::process::id()))
}

/// Read the clipboard with bounded retries.
///
/// Text naming an existing image file is returned as that image. Progress
/// lines go to `progress`.
pub async fn read_clipboard(
    source: &dyn ClipboardSource,
    security: &SecurityConfig,
    mut progress: impl FnMut(&str),
) -> Result<ClipboardContent> {
    let attempts = security.clipboard_retries.max(1);

    for attempt in 1..=attempts {
        if let Some(text) = source.read_text().await {
            let candidate = Path::new(text.trim());
            if candidate.is_file() && security.is_allowed_image(candidate) {
                return Ok(ClipboardContent::Image(candidate.to_path_buf()));
            }
            return Ok(ClipboardContent::Text(text));
        }

        let dest = clipboard_image_path();
        if source.save_image(&dest).await {
            return Ok(ClipboardContent::Image(dest));
        }

        if attempt < attempts {
            progress(&format!(
                "剪贴板中没有识别的内容，重试中... ({}/{})",
                attempt, attempts
            ));
            tokio::time::sleep(RETRY_DELAY).await;
        }
    }

    Err(Error::Clipboard("剪贴板中没有文本或图片内容".to_string()))
}
