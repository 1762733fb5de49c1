use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use uuid::Uuid;

// =============================================================================
// Request Types
// =============================================================================

/// Literal that introduces the working-directory context in a prompt.
pub const WORKING_DIR_MARKER: &str = "当前目录为：";

/// A single user request.
///
/// Created once per invocation and read-only afterwards. `content` is the
/// text that gets classified; the working directory is only appended to the
/// prompt sent to models.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Request {
    /// Unique trace ID for this request.
    pub trace_id: String,

    /// Normalized user input.
    pub content: String,

    /// Absolute working directory of the caller, if known.
    pub working_dir: Option<String>,

    /// Image attached directly to the request (OCR command form).
    pub image: Option<PathBuf>,
}

impl Request {
    /// Create a request from user text.
    pub fn new(content: impl Into<String>) -> Self {
        Self {
            trace_id: Uuid::new_v4().to_string(),
            content: content.into().trim().to_string(),
            working_dir: None,
            image: None,
        }
    }

    /// Attach the caller's working directory.
    pub fn with_working_dir(mut self, dir: impl Into<String>) -> Self {
        self.working_dir = Some(dir.into());
        self
    }

    /// Attach an image to send alongside the prompt.
    pub fn with_image(mut self, path: impl AsRef<Path>) -> Self {
        self.image = Some(path.as_ref().to_path_buf());
        self
    }

    /// The prompt sent to a model: content plus working-directory suffix.
    pub fn prompt(&self) -> String {
        match &self.working_dir {
            Some(dir) => format!("{} {}{}", self.content, WORKING_DIR_MARKER, dir),
            None => self.content.clone(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_prompt_appends_working_dir() {
        let req = Request::new("图片1.png的内容是什么？").with_working_dir("/home/me/pics");
        assert_eq!(req.prompt(), "图片1.png的内容是什么？ 当前目录为：/home/me/pics");
        assert_eq!(req.content, "图片1.png的内容是什么？");
    }

    #[test]
    fn test_prompt_without_working_dir() {
        let req = Request::new("  hello  ");
        assert_eq!(req.prompt(), "hello");
        assert!(req.image.is_none());
    }
}
