use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::Error;

// =============================================================================
// Scenario Types (Router Output)
// =============================================================================

/// Classified intent category of a single request.
///
/// Each scenario is served by exactly one pipeline.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Scenario {
    /// Plain conversation, no tools.
    Text,
    /// Action requests served through tool calls.
    Tool,
    /// Questions about an actual image.
    Vision,
    /// Pure text extraction from an image.
    Ocr,
}

impl Scenario {
    /// All scenarios, in classification priority order after `Text`.
    pub const ALL: [Scenario; 4] = [Scenario::Text, Scenario::Tool, Scenario::Vision, Scenario::Ocr];

    /// Lowercase label used in config keys and status lines.
    pub fn as_str(&self) -> &'static str {
        match self {
            Scenario::Text => "text",
            Scenario::Tool => "tool",
            Scenario::Vision => "vision",
            Scenario::Ocr => "ocr",
        }
    }
}

impl fmt::Display for Scenario {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Scenario {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "text" => Ok(Scenario::Text),
            "tool" => Ok(Scenario::Tool),
            "vision" => Ok(Scenario::Vision),
            "ocr" => Ok(Scenario::Ocr),
            other => Err(Error::invalid_request(format!("unknown scenario '{}'", other))),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_roundtrips_labels() {
        for scenario in Scenario::ALL {
            assert_eq!(scenario.as_str().parse::<Scenario>().unwrap(), scenario);
        }
        assert_eq!(" OCR ".parse::<Scenario>().unwrap(), Scenario::Ocr);
        assert!("audio".parse::<Scenario>().is_err());
    }

    #[test]
    fn test_serde_uses_lowercase() {
        let json = serde_json::to_string(&Scenario::Vision).unwrap();
        assert_eq!(json, "\"vision\"");
    }
}
