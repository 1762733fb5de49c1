//! Result renderer.
//!
//! Writes the displayable part of a response to an output sink. Reasoning
//! segments are never written.

use futures::StreamExt;
use std::io::{self, Write};

use xs_core::{traits::TextStream, types::AgentResponse, Error, Result};

/// Shown when a response has no segments at all.
pub const NO_CONTENT: &str = "无响应内容";

/// Shown when every segment of a response is reasoning.
pub const NO_DISPLAYABLE_TEXT: &str = "处理完成，但没有可显示的文本内容";

/// Renders responses to a writer.
pub struct Renderer<W: Write> {
    out: W,
}

impl Renderer<io::Stdout> {
    pub fn stdout() -> Self {
        Self::new(io::stdout())
    }
}

impl<W: Write> Renderer<W> {
    pub fn new(out: W) -> Self {
        Self { out }
    }

    pub fn into_inner(self) -> W {
        self.out
    }

    /// Write each displayable segment on its own line.
    ///
    /// Returns the text written, placeholders included.
    pub fn render(&mut self, response: &AgentResponse) -> io::Result<String> {
        if response.is_empty() {
            return self.line(NO_CONTENT);
        }

        let displayed: Vec<String> = response
            .content
            .iter()
            .filter_map(|segment| segment.display_text())
            .collect();

        if displayed.is_empty() {
            tracing::debug!(
                segments = response.content.len(),
                "Response holds reasoning only"
            );
            return self.line(NO_DISPLAYABLE_TEXT);
        }

        for text in &displayed {
            writeln!(self.out, "{}", text)?;
        }
        self.out.flush()?;
        Ok(displayed.join("\n"))
    }

    /// Write chunks as they arrive, then a single trailing newline.
    ///
    /// A failing chunk stops the stream. Text written before the failure
    /// stays on the output and the newline is still written.
    pub async fn render_stream(&mut self, mut stream: TextStream) -> Result<String> {
        let mut written = String::new();
        let mut failure = None;

        while let Some(chunk) = stream.next().await {
            match chunk {
                Ok(chunk) if chunk.is_empty() => continue,
                Ok(chunk) => {
                    write!(self.out, "{}", chunk)?;
                    self.out.flush()?;
                    written.push_str(&chunk);
                }
                Err(e) => {
                    failure = Some(e);
                    break;
                }
            }
        }

        writeln!(self.out)?;
        self.out.flush()?;

        match failure {
            Some(e) => Err(e),
            None => Ok(written),
        }
    }

    /// Write a plain line of text.
    pub fn line(&mut self, text: &str) -> io::Result<String> {
        writeln!(self.out, "{}", text)?;
        self.out.flush()?;
        Ok(text.to_string())
    }
}

/// Convenience for rendering into a string buffer.
pub fn render_to_string(response: &AgentResponse) -> Result<String> {
    let mut renderer = Renderer::new(Vec::new());
    renderer.render(response)?;
    String::from_utf8(renderer.into_inner())
        .map_err(|e| Error::internal(format!("rendered output is not UTF-8: {}", e)))
}
