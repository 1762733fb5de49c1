//! Separation of model reasoning from answer text.

use regex::Regex;
use std::sync::LazyLock;

use xs_core::types::ResponseSegment;

static THINK_SPAN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?s)<think(?:ing)?>(.*?)(?:</think(?:ing)?>|\z)").unwrap());

/// Split content into text and reasoning segments.
///
/// `<think>` and `<thinking>` spans become `Reasoning`; an unclosed span
/// runs to the end of the content. Blank pieces are dropped.
pub fn split_thinking(content: &str) -> Vec<ResponseSegment> {
    let mut segments = Vec::new();
    let mut last = 0;

    for caps in THINK_SPAN.captures_iter(content) {
        let (Some(whole), Some(inner)) = (caps.get(0), caps.get(1)) else {
            continue;
        };
        push_trimmed(&mut segments, &content[last..whole.start()], ResponseSegment::text);
        push_trimmed(&mut segments, inner.as_str(), ResponseSegment::reasoning);
        last = whole.end();
    }
    push_trimmed(&mut segments, &content[last..], ResponseSegment::text);

    segments
}

fn push_trimmed(
    segments: &mut Vec<ResponseSegment>,
    piece: &str,
    make: fn(String) -> ResponseSegment,
) {
    let piece = piece.trim();
    if !piece.is_empty() {
        segments.push(make(piece.to_string()));
    }
}

const OPEN_TAGS: [&str; 2] = ["<thinking>", "<think>"];
const CLOSE_TAGS: [&str; 2] = ["</thinking>", "</think>"];

/// Removes reasoning spans from streamed text.
///
/// Tags may be split across chunks: a chunk tail that could start a tag is
/// held back until the next chunk decides it. Leading whitespace of the
/// answer is dropped, as `split_thinking` trims it.
#[derive(Debug, Default)]
pub struct ThinkFilter {
    inside: bool,
    started: bool,
    held: String,
}

impl ThinkFilter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Feed one chunk and return the visible part of it.
    pub fn push(&mut self, chunk: &str) -> String {
        let mut input = std::mem::take(&mut self.held);
        input.push_str(chunk);

        let mut visible = String::new();
        let mut rest = input.as_str();
        loop {
            let tags = if self.inside { &CLOSE_TAGS } else { &OPEN_TAGS };
            match find_tag(rest, tags) {
                Some((start, end)) => {
                    if !self.inside {
                        visible.push_str(&rest[..start]);
                    }
                    self.inside = !self.inside;
                    rest = &rest[end..];
                }
                None => {
                    let keep = partial_tag_len(rest, tags);
                    let (ready, held) = rest.split_at(rest.len() - keep);
                    if !self.inside {
                        visible.push_str(ready);
                    }
                    self.held = held.to_string();
                    break;
                }
            }
        }
        self.visible(visible)
    }

    /// Release text held back at the end of the stream. An unclosed span
    /// is reasoning and stays hidden.
    pub fn finish(&mut self) -> String {
        let held = std::mem::take(&mut self.held);
        if self.inside {
            String::new()
        } else {
            self.visible(held)
        }
    }

    fn visible(&mut self, text: String) -> String {
        if self.started {
            return text;
        }
        let text = text.trim_start();
        if !text.is_empty() {
            self.started = true;
        }
        text.to_string()
    }
}

/// Earliest complete tag in `text` as a byte range.
fn find_tag(text: &str, tags: &[&str]) -> Option<(usize, usize)> {
    tags.iter()
        .filter_map(|tag| text.find(tag).map(|start| (start, start + tag.len())))
        .min_by_key(|(start, _)| *start)
}

/// Length of the longest tail of `text` that is a proper prefix of a tag.
fn partial_tag_len(text: &str, tags: &[&str]) -> usize {
    tags.iter()
        .filter_map(|tag| {
            (1..tag.len())
                .rev()
                .find(|k| text.ends_with(&tag[..*k]))
        })
        .max()
        .unwrap_or(0)
}
