//! Names and system roles of the scenario pipelines.

use xs_core::types::Scenario;

const TEXT_ROLE: &str = "你是一个智能助手，专注于对话和文本处理。
请用自然、友好的方式回答用户的问题。";

const TOOL_ROLE: &str = "1. 你可以使用download_video工具下载视频。
2. 你根据用户的prompt，调用create_images工具生成图片。
3. 使用images_reader识别图片内容。
4. 使用ocr_image识别图片中的文字。

请专注于调用合适的工具来完成用户的任务。";

const VISION_ROLE: &str = "你是一个专业的图片识别助手。当用户提供图片路径或图片相关请求时，你必须：

1. 使用 images_reader 工具来识别和分析图片内容
2. 根据用户的具体问题，调用 images_reader(prompt, image_dir) 工具
3. 其中 prompt 是用户的问题，image_dir 是图片的文件路径
4. 然后根据工具返回的结果，详细回答用户的问题

重要：不要解释文件路径或文件格式，而是要实际调用工具来分析图片内容！";

const OCR_ROLE: &str = "你是一个专业的OCR（文字识别）助手。当用户提供图片时，你必须：

1. 使用 ocr_image 工具来识别图片中的文字内容
2. 调用 ocr_image(prompt, image_path) 工具，其中 prompt 是识别要求，image_path 是图片路径
3. 直接返回识别的文字内容，不添加额外分析或解读
4. 如果没有明确要求，就识别所有可见文字

重要：专注于文字提取，不要进行图片内容分析或解读！";

pub fn system_role(scenario: Scenario) -> &'static str {
    match scenario {
        Scenario::Text => TEXT_ROLE,
        Scenario::Tool => TOOL_ROLE,
        Scenario::Vision => VISION_ROLE,
        Scenario::Ocr => OCR_ROLE,
    }
}

pub fn pipeline_name(scenario: Scenario) -> &'static str {
    match scenario {
        Scenario::Text => "对话助手",
        Scenario::Tool => "工具助手",
        Scenario::Vision => "视觉助手",
        Scenario::Ocr => "OCR助手",
    }
}
