//! Guardrails for input validation.
//!
//! Checks run before anything reaches a model:
//! - request length and emptiness
//! - script injection patterns
//! - image file paths (traversal, extension, existence, size)

use regex::Regex;
use serde::{Deserialize, Serialize};
use std::path::{Component, Path, PathBuf};
use std::sync::LazyLock;

use xs_core::{config::SecurityConfig, Error, Result};

/// Longest path accepted for an image file.
const MAX_PATH_LENGTH: usize = 260;

/// Names Windows reserves for devices.
const RESERVED_NAMES: &[&str] = &[
    "CON", "PRN", "AUX", "NUL", "COM1", "COM2", "COM3", "COM4", "COM5", "COM6", "COM7", "COM8",
    "COM9", "LPT1", "LPT2", "LPT3", "LPT4", "LPT5", "LPT6", "LPT7", "LPT8", "LPT9",
];

static SCRIPT_PATTERNS: LazyLock<Vec<Regex>> = LazyLock::new(|| {
    [
        r"(?is)<script.*?>.*?</script>",
        r"(?i)javascript:",
        r"(?i)vbscript:",
        r"(?i)onload\s*=",
        r"(?i)onerror\s*=",
        r"(?i)onclick\s*=",
        r"(?i)onmouseover\s*=",
        r"(?i)eval\s*\(",
        r"(?i)exec\s*\(",
        r"(?i)system\s*\(",
    ]
    .iter()
    .filter_map(|p| Regex::new(p).ok())
    .collect()
});

/// Result of a guardrail check.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GuardrailResult {
    /// Whether the check passed.
    pub passed: bool,
    /// Reason for failure (if any).
    pub reason: Option<String>,
    /// Type of violation detected.
    pub violation_type: Option<ViolationType>,
}

impl GuardrailResult {
    /// Create a passing result.
    pub fn pass() -> Self {
        Self {
            passed: true,
            reason: None,
            violation_type: None,
        }
    }

    /// Create a failing result.
    pub fn fail(reason: impl Into<String>, violation_type: ViolationType) -> Self {
        Self {
            passed: false,
            reason: Some(reason.into()),
            violation_type: Some(violation_type),
        }
    }
}

/// Type of input violation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ViolationType {
    /// Nothing but whitespace.
    Empty,
    /// Longer than the configured limit.
    TooLong,
    /// Looks like script injection.
    ScriptInjection,
}

/// Validates raw request text before classification.
#[derive(Debug, Clone)]
pub struct InputGuardrail {
    max_length: usize,
}

impl InputGuardrail {
    pub fn new(max_length: usize) -> Self {
        Self { max_length }
    }

    pub fn from_config(security: &SecurityConfig) -> Self {
        Self::new(security.max_input_length)
    }

    /// Check request text.
    pub fn check(&self, input: &str) -> GuardrailResult {
        if input.trim().is_empty() {
            return GuardrailResult::fail("输入不能为空", ViolationType::Empty);
        }
        if input.chars().count() > self.max_length {
            return GuardrailResult::fail(
                format!("输入长度超过限制 ({} 字符)", self.max_length),
                ViolationType::TooLong,
            );
        }
        if SCRIPT_PATTERNS.iter().any(|p| p.is_match(input)) {
            return GuardrailResult::fail("输入包含潜在恶意内容", ViolationType::ScriptInjection);
        }
        GuardrailResult::pass()
    }

    /// Check request text and return it trimmed.
    pub fn validate(&self, input: &str) -> Result<String> {
        let result = self.check(input);
        if result.passed {
            Ok(input.trim().to_string())
        } else {
            Err(Error::invalid_request(result.reason.unwrap_or_default()))
        }
    }
}

/// Validate an image file: no traversal, allowed extension, exists, not
/// empty, within the size limit.
pub fn validate_image_file(path: &Path, security: &SecurityConfig) -> Result<PathBuf> {
    if path.as_os_str().is_empty() {
        return Err(Error::invalid_image("文件路径不能为空"));
    }
    if path.components().any(|c| matches!(c, Component::ParentDir)) {
        return Err(Error::invalid_image("检测到路径遍历"));
    }
    if path.is_absolute() && path.as_os_str().len() > MAX_PATH_LENGTH {
        return Err(Error::invalid_image("文件路径过长"));
    }
    if !security.is_allowed_image(path) {
        let ext = path
            .extension()
            .and_then(|e| e.to_str())
            .unwrap_or_default()
            .to_lowercase();
        return Err(Error::invalid_image(format!("不支持的文件扩展名: {}", ext)));
    }

    let metadata = std::fs::metadata(path)
        .map_err(|_| Error::invalid_image(format!("图片文件不存在: {}", path.display())))?;
    if !metadata.is_file() {
        return Err(Error::invalid_image(format!("不是文件: {}", path.display())));
    }
    if metadata.len() == 0 {
        return Err(Error::invalid_image(format!("图片文件为空: {}", path.display())));
    }
    if metadata.len() > security.max_file_size_bytes() {
        return Err(Error::invalid_image(format!(
            "文件大小超过限制 ({}MB)",
            security.max_file_size_mb
        )));
    }

    Ok(path.to_path_buf())
}

/// Validate a bare file name used when saving files.
pub fn validate_filename(filename: &str, security: &SecurityConfig) -> Result<String> {
    if filename.is_empty() {
        return Err(Error::invalid_request("文件名不能为空"));
    }
    if filename.chars().count() > security.max_filename_length {
        return Err(Error::invalid_request(format!(
            "文件名过长，最大长度: {}",
            security.max_filename_length
        )));
    }
    const ILLEGAL: &str = "<>:\"/\\|?*";
    if filename.chars().any(|c| ILLEGAL.contains(c)) {
        return Err(Error::invalid_request(format!("文件名包含非法字符: {}", ILLEGAL)));
    }
    let stem = Path::new(filename)
        .file_stem()
        .and_then(|s| s.to_str())
        .unwrap_or_default()
        .to_uppercase();
    if RESERVED_NAMES.contains(&stem.as_str()) {
        return Err(Error::invalid_request(format!("文件名使用了保留名称: {}", stem)));
    }
    Ok(filename.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_input_guardrail() {
        let guard = InputGuardrail::new(20);

        assert!(guard.check("你好").passed);
        assert_eq!(guard.check("   ").violation_type, Some(ViolationType::Empty));
        assert_eq!(
            guard.check(&"字".repeat(21)).violation_type,
            Some(ViolationType::TooLong)
        );
        assert_eq!(
            guard.check("<script>x</script>").violation_type,
            Some(ViolationType::ScriptInjection)
        );
        assert_eq!(
            guard.check("run EVAL (x)").violation_type,
            Some(ViolationType::ScriptInjection)
        );
        assert_eq!(guard.validate("  hi ").unwrap(), "hi");
    }

    #[test]
    fn test_validate_image_file() {
        let security = SecurityConfig::default();
        let dir = tempfile::tempdir().unwrap();

        let good = dir.path().join("shot.png");
        std::fs::File::create(&good).unwrap().write_all(b"\x89PNG").unwrap();
        assert_eq!(validate_image_file(&good, &security).unwrap(), good);

        let empty = dir.path().join("empty.jpg");
        std::fs::File::create(&empty).unwrap();
        assert!(validate_image_file(&empty, &security).is_err());

        let missing = dir.path().join("missing.png");
        assert!(validate_image_file(&missing, &security).is_err());

        let text = dir.path().join("notes.txt");
        std::fs::write(&text, "x").unwrap();
        assert!(matches!(
            validate_image_file(&text, &security),
            Err(Error::InvalidImage(msg)) if msg.contains("txt")
        ));

        assert!(validate_image_file(Path::new("../secret.png"), &security).is_err());
    }

    #[test]
    fn test_validate_filename() {
        let security = SecurityConfig::default();
        assert!(validate_filename("photo.png", &security).is_ok());
        assert!(validate_filename("a/b.png", &security).is_err());
        assert!(validate_filename("con.txt", &security).is_err());
        assert!(validate_filename("", &security).is_err());
    }
}
