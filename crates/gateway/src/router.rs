//! Scenario router for classifying incoming requests.
//!
//! Rule sets are evaluated in strict priority order, first match wins:
//! OCR, then tool actions, then image references, then the image keyword
//! tier that needs corroborating evidence. Anything else is plain text.

use regex::Regex;
use std::sync::LazyLock;

use xs_core::{types::Scenario, Error, Result};

/// Image extensions that mark a request as referring to an image.
pub const IMAGE_EXTENSIONS: &[&str] = &["png", "jpg", "jpeg", "gif", "webp"];

/// Phrases that ask for text extraction.
const OCR_PATTERNS: &[&str] = &[
    r"^ocr\s",
    r"文字识别",
    r"文本识别",
    r"提取文字",
    r"识别.*文字",
    r"图片.*文字",
    r"截图.*文字",
    r"文档.*识别",
    r"表格.*识别",
];

/// Phrases that ask for an action served by a tool.
const TOOL_PATTERNS: &[&str] = &[
    r"下载.*视频",
    r"生成.*图片",
    r"创建.*图片",
    r"图片.*生成",
    r"下载.*音乐",
    r"下载.*文件",
    r"图片.*处理",
    r"给.*图片.*",
    r"下载.*http",
    r"下载.*www",
    r"下载.*url",
];

/// Unambiguous references to an image file.
const IMAGE_REFERENCE_PATTERNS: &[&str] = &[
    // Windows path at least three directories deep
    r"[a-z]:\\[^\\]+\\[^\\]+\\[^\\]+\.(png|jpg|jpeg|gif|webp)",
    // the whole input is a file name
    r"^[^\\]+\.(png|jpg|jpeg|gif|webp)$",
    // a file name token followed by whitespace or the end
    r"\S+\.(png|jpg|jpeg|gif|webp)(?:\s|$)",
];

/// Questions about image content. Not enough on their own.
const IMAGE_KEYWORD_PATTERNS: &[&str] = &[
    r"图片.*内容",
    r"图片.*是什么",
    r"图片.*描述",
    r"图片.*识别",
    r"图像.*内容",
    r"照片.*内容",
];

/// Phrases that point at an actual image rather than the idea of one.
const IMAGE_MENTION_PATTERNS: &[&str] = &[
    r"(?:附[上件]|上传|提供|这张|那张).*图片",
    r"截图|截屏|屏幕快照",
];

static IMAGE_EXTENSION: LazyLock<Regex> =
    LazyLock::new(|| compile(r"\.(png|jpg|jpeg|gif|webp)").expect("literal pattern"));

static DEFAULT_CLASSIFIER: LazyLock<ScenarioClassifier> = LazyLock::new(ScenarioClassifier::new);

fn compile(pattern: &str) -> Result<Regex> {
    Regex::new(pattern)
        .map_err(|e| Error::invalid_request(format!("invalid pattern '{}': {}", pattern, e)))
}

fn compile_all(patterns: &[&str]) -> Vec<Regex> {
    patterns
        .iter()
        .map(|p| compile(p).expect("literal pattern"))
        .collect()
}

/// A pattern plus the scenario it implies.
#[derive(Debug, Clone)]
pub struct ClassificationRule {
    /// Scenario selected when the pattern matches.
    pub scenario: Scenario,
    pattern: Regex,
}

impl ClassificationRule {
    pub fn new(scenario: Scenario, pattern: &str) -> Result<Self> {
        Ok(Self {
            scenario,
            pattern: compile(pattern)?,
        })
    }

    pub fn pattern(&self) -> &str {
        self.pattern.as_str()
    }

    pub fn is_match(&self, input: &str) -> bool {
        self.pattern.is_match(input)
    }
}

/// Outcome of a classification, with the rule that decided it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Classification {
    pub scenario: Scenario,
    /// Pattern that matched, `None` for the text fallback.
    pub rule: Option<String>,
}

/// Regex-based scenario classifier.
///
/// Total and pure: every input maps to exactly one scenario and the same
/// input always maps to the same scenario.
#[derive(Debug, Clone)]
pub struct ScenarioClassifier {
    ocr_rules: Vec<ClassificationRule>,
    tool_rules: Vec<ClassificationRule>,
    image_reference_rules: Vec<ClassificationRule>,
    image_keywords: Vec<Regex>,
    image_mentions: Vec<Regex>,
}

impl ScenarioClassifier {
    /// Create a classifier with the built-in rule sets.
    pub fn new() -> Self {
        let rules = |scenario, patterns: &[&str]| {
            compile_all(patterns)
                .into_iter()
                .map(|pattern| ClassificationRule { scenario, pattern })
                .collect()
        };

        Self {
            ocr_rules: rules(Scenario::Ocr, OCR_PATTERNS),
            tool_rules: rules(Scenario::Tool, TOOL_PATTERNS),
            image_reference_rules: rules(Scenario::Vision, IMAGE_REFERENCE_PATTERNS),
            image_keywords: compile_all(IMAGE_KEYWORD_PATTERNS),
            image_mentions: compile_all(IMAGE_MENTION_PATTERNS),
        }
    }

    /// Append a custom rule to the rule set of its scenario.
    ///
    /// Patterns are matched against lowercased input. Rules for `Text` are
    /// rejected since text is the fallback.
    pub fn with_rule(mut self, rule: ClassificationRule) -> Result<Self> {
        match rule.scenario {
            Scenario::Ocr => self.ocr_rules.push(rule),
            Scenario::Tool => self.tool_rules.push(rule),
            Scenario::Vision => self.image_reference_rules.push(rule),
            Scenario::Text => {
                return Err(Error::invalid_request(
                    "text is the fallback scenario and takes no rules",
                ))
            }
        }
        Ok(self)
    }

    /// Classify request text.
    pub fn classify(&self, input: &str) -> Scenario {
        self.explain(input).scenario
    }

    /// Classify request text and report the deciding rule.
    pub fn explain(&self, input: &str) -> Classification {
        let lower = input.to_lowercase();

        for rules in [&self.ocr_rules, &self.tool_rules, &self.image_reference_rules] {
            if let Some(rule) = rules.iter().find(|r| r.is_match(&lower)) {
                tracing::debug!(scenario = %rule.scenario, rule = rule.pattern(), "Rule matched");
                return Classification {
                    scenario: rule.scenario,
                    rule: Some(rule.pattern().to_string()),
                };
            }
        }

        if IMAGE_EXTENSION.is_match(&lower) && (has_path_separator(&lower) || ends_with_image_extension(&lower)) {
            tracing::debug!("Image extension with path evidence");
            return Classification {
                scenario: Scenario::Vision,
                rule: Some(IMAGE_EXTENSION.as_str().to_string()),
            };
        }

        if let Some(keyword) = self.image_keywords.iter().find(|p| p.is_match(&lower)) {
            if self.has_image_evidence(&lower) {
                tracing::debug!(rule = keyword.as_str(), "Image keyword with image evidence");
                return Classification {
                    scenario: Scenario::Vision,
                    rule: Some(keyword.as_str().to_string()),
                };
            }
            tracing::debug!(
                rule = keyword.as_str(),
                "Image keyword without an actual image reference, staying on text"
            );
        }

        Classification {
            scenario: Scenario::Text,
            rule: None,
        }
    }

    /// Independent evidence that the input refers to a real image.
    fn has_image_evidence(&self, lower: &str) -> bool {
        has_path_separator(lower)
            || lower.contains("http")
            || lower.contains("www")
            || ends_with_image_extension(lower)
            || self.image_mentions.iter().any(|p| p.is_match(lower))
    }
}

impl Default for ScenarioClassifier {
    fn default() -> Self {
        Self::new()
    }
}

fn has_path_separator(input: &str) -> bool {
    input.contains('\\') || input.contains('/')
}

fn ends_with_image_extension(input: &str) -> bool {
    let trimmed = input.trim();
    IMAGE_EXTENSIONS
        .iter()
        .any(|ext| trimmed.ends_with(&format!(".{}", ext)))
}

/// Classify request text with the built-in rule sets.
pub fn classify(input: &str) -> Scenario {
    DEFAULT_CLASSIFIER.classify(input)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ocr_classification() {
        assert_eq!(classify("ocr 请识别这张发票"), Scenario::Ocr);
        assert_eq!(classify("OCR invoice.png"), Scenario::Ocr);
        assert_eq!(classify("帮我提取文字"), Scenario::Ocr);
        assert_eq!(classify("识别一下截图里的文字"), Scenario::Ocr);
        assert_eq!(classify("这个表格能识别吗"), Scenario::Ocr);
    }

    #[test]
    fn test_ocr_token_must_lead() {
        assert_ne!(classify("docr stuff"), Scenario::Ocr);
        assert_ne!(classify("ocrx something"), Scenario::Ocr);
    }

    #[test]
    fn test_tool_classification() {
        assert_eq!(classify("下载视频 http://example.com/a.mp4"), Scenario::Tool);
        assert_eq!(classify("帮我生成一张猫的图片"), Scenario::Tool);
        assert_eq!(classify("下载这首音乐"), Scenario::Tool);
        assert_eq!(classify("下载 https://example.com/file.zip"), Scenario::Tool);
    }

    #[test]
    fn test_image_reference_classification() {
        assert_eq!(classify("report.png"), Scenario::Vision);
        assert_eq!(classify(r"c:\users\me\pics\cat.jpg 里有几只猫"), Scenario::Vision);
        assert_eq!(classify("看看 photo.webp 然后告诉我"), Scenario::Vision);
        assert_eq!(classify("what is in ./shots/a.gif?"), Scenario::Vision);
    }

    #[test]
    fn test_keyword_needs_evidence() {
        assert_eq!(classify("这张图片的内容是什么"), Scenario::Vision);
        assert_eq!(classify("截屏里图片的内容是什么"), Scenario::Vision);
        assert_eq!(classify("图片的内容 www.example.com"), Scenario::Vision);

        assert_eq!(classify("图片这个比喻的内容是什么意思"), Scenario::Text);
        assert_eq!(classify("what does this picture metaphor mean"), Scenario::Text);
    }

    #[test]
    fn test_text_default() {
        assert_eq!(classify("你好，今天天气怎么样"), Scenario::Text);
        assert_eq!(classify(""), Scenario::Text);
    }

    #[test]
    fn test_priority_order() {
        // OCR beats tool and vision signals
        assert_eq!(classify("ocr 下载视频 report.png"), Scenario::Ocr);
        assert_eq!(classify("提取文字 然后 下载视频"), Scenario::Ocr);
        // Tool beats vision signals
        assert_eq!(classify("下载视频 clip.png"), Scenario::Tool);
    }

    #[test]
    fn test_explain_reports_rule() {
        let classifier = ScenarioClassifier::new();
        let explained = classifier.explain("ocr 请识别");
        assert_eq!(explained.scenario, Scenario::Ocr);
        assert_eq!(explained.rule.as_deref(), Some(r"^ocr\s"));
        assert_eq!(classifier.explain("hello").rule, None);
    }

    #[test]
    fn test_custom_rule() {
        let classifier = ScenarioClassifier::new()
            .with_rule(ClassificationRule::new(Scenario::Tool, r"^fetch\s").unwrap())
            .unwrap();
        assert_eq!(classifier.classify("fetch the news"), Scenario::Tool);
        assert_eq!(classify("fetch the news"), Scenario::Text);

        let rejected = ScenarioClassifier::new()
            .with_rule(ClassificationRule::new(Scenario::Text, "x").unwrap());
        assert!(rejected.is_err());
        assert!(ClassificationRule::new(Scenario::Ocr, "(").is_err());
    }

    #[test]
    fn test_classification_is_idempotent() {
        let inputs = ["report.png", "下载视频", "ocr x", "你好", "图片的内容"];
        for input in inputs {
            assert_eq!(classify(input), classify(input));
        }
    }
}
