//! Image lookup and OCR text cleanup.

use regex::Regex;
use std::path::{Path, PathBuf};
use std::sync::LazyLock;

use xs_core::{Error, Result};

/// Extensions the image reader accepts.
pub const READER_EXTENSIONS: &[&str] = &["png", "jpg", "jpeg", "gif", "webp", "bmp"];

static FILE_NAME_IN_PROMPT: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)(\w+\.(?:png|jpg|jpeg|gif|webp|bmp))").unwrap());

fn has_reader_extension(path: &Path) -> bool {
    path.extension()
        .and_then(|e| e.to_str())
        .map(|ext| READER_EXTENSIONS.iter().any(|r| r.eq_ignore_ascii_case(ext)))
        .unwrap_or(false)
}

fn absolutize(path: &Path, working_dir: &Path) -> PathBuf {
    if path.is_absolute() {
        path.to_path_buf()
    } else {
        working_dir.join(path)
    }
}

/// Locate the image a request refers to.
///
/// `location` may name a directory (its first image file by name is used)
/// or a file. Otherwise a `name.ext` token in the prompt is looked up in
/// the working directory. Relative locations resolve against the working
/// directory. Failures carry a user-facing message.
pub fn resolve_image(location: &str, prompt: &str, working_dir: &Path) -> Result<PathBuf> {
    let location = location.trim();
    let candidate = absolutize(Path::new(location), working_dir);

    if !location.is_empty() && candidate.is_dir() {
        let mut images: Vec<PathBuf> = std::fs::read_dir(&candidate)?
            .filter_map(|entry| entry.ok().map(|e| e.path()))
            .filter(|p| p.is_file() && has_reader_extension(p))
            .collect();
        images.sort();

        return images.into_iter().next().ok_or_else(|| {
            let formats: Vec<String> = READER_EXTENSIONS.iter().map(|e| format!(".{}", e)).collect();
            Error::invalid_image(format!(
                "在目录 {} 中未找到图片文件。支持的格式：{}",
                location,
                formats.join(", ")
            ))
        });
    }

    if !location.is_empty() && candidate.is_file() {
        return Ok(candidate);
    }

    match FILE_NAME_IN_PROMPT.captures(prompt).and_then(|c| c.get(1)) {
        Some(name) => {
            let path = working_dir.join(name.as_str());
            if path.exists() {
                tracing::debug!(path = %path.display(), "Image resolved from prompt");
                Ok(path)
            } else {
                Err(Error::invalid_image(format!(
                    "无法找到图片文件: {}。请确认文件路径。",
                    name.as_str()
                )))
            }
        }
        None => Err(Error::invalid_image(format!(
            "无法找到图片文件: {}。请确认文件路径。",
            location
        ))),
    }
}

/// Normalise OCR output: trailing whitespace stripped from each line,
/// blank lines dropped, layout of the remaining lines kept.
pub fn format_ocr_result(text: &str) -> String {
    text.lines()
        .filter(|line| !line.trim().is_empty())
        .map(str::trim_end)
        .collect::<Vec<_>>()
        .join("\n")
}
