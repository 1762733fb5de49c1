//! Command line surface.

use clap::Parser;
use std::path::PathBuf;

pub const USAGE: &[&str] = &[
    "只需要在xs命令后输入您的要求即可。",
    "例如：xs <你要输入的内容>",
    "示例1：xs 下载视频，http……",
    "示例2：xs 图片1.png的内容是什么？",
    "示例3：xs 给1.png中的人物戴上一顶草帽。",
    "特殊功能：xs p  # 使用剪贴板完整内容作为输入",
    "高级功能：xs p <问题>  # 对剪贴板完整内容提问",
    "OCR功能：xs ocr [图片路径] [可选: 识别要求]  # 纯文字识别",
    "提示：如果剪贴板图片识别失败，请直接使用图片文件路径",
];

pub const OCR_USAGE: &[&str] = &[
    "OCR命令格式: xs ocr [图片路径] [可选: 识别要求]",
    "示例1: xs ocr (使用剪贴板图片)",
    "示例2: xs ocr image.png",
    "示例3: xs ocr image.png 提取表格内容",
];

#[derive(Parser, Debug)]
#[command(
    name = "xs",
    version,
    about = "Local multi-model assistant: routes each request to a text, tool, vision or OCR model"
)]
pub struct Cli {
    /// Configuration file (ini, toml, yaml or json).
    #[arg(long, value_name = "PATH")]
    pub config: Option<PathBuf>,

    /// Print text answers only once they are complete.
    #[arg(long)]
    pub no_stream: bool,

    /// Log debug output to stderr.
    #[arg(short, long)]
    pub verbose: bool,

    /// The request. `p` reads the clipboard, `ocr` extracts text from an image.
    #[arg(trailing_var_arg = true, allow_hyphen_values = true, value_name = "REQUEST")]
    pub words: Vec<String>,
}

/// What the user asked for.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    Usage,
    /// Request built from the clipboard, optionally followed by a question.
    Clipboard { question: Option<String> },
    /// OCR of an image file, or of the clipboard image when no path is given.
    Ocr {
        image: Option<PathBuf>,
        instructions: Option<String>,
    },
    Ask(String),
}

impl Cli {
    pub fn command(&self) -> Command {
        let Some((first, rest)) = self.words.split_first() else {
            return Command::Usage;
        };

        match first.as_str() {
            "p" => Command::Clipboard {
                question: join_nonempty(rest),
            },
            "ocr" => {
                let (image, instructions) = match rest.split_first() {
                    Some((path, more)) => (Some(PathBuf::from(path)), join_nonempty(more)),
                    None => (None, None),
                };
                Command::Ocr {
                    image,
                    instructions,
                }
            }
            _ => Command::Ask(self.words.join(" ")),
        }
    }
}

fn join_nonempty(words: &[String]) -> Option<String> {
    let joined = words.join(" ");
    if joined.trim().is_empty() {
        None
    } else {
        Some(joined)
    }
}
