//! Content blocks produced by sandboxed executions and surfaced to the model.

use serde::{Deserialize, Serialize};

/// A single block of content returned by a sandboxed program's `run`
/// function or produced by a tool.
///
/// Binary payloads are held decoded; the sandbox wire format
/// (base64 + camelCase field names) is handled by the execution
/// engine's codec, not by this type's serde impl.
#[non_exhaustive]
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ContentBlock {
    /// Plain text.
    Text {
        /// The text content.
        text: String,
    },

    /// Image bytes with an explicit MIME type.
    Image {
        /// Decoded image bytes.
        data: Vec<u8>,
        /// MIME type, e.g. `image/png`.
        media_type: String,
    },

    /// Audio bytes with an explicit MIME type.
    Audio {
        /// Decoded audio bytes.
        data: Vec<u8>,
        /// MIME type, e.g. `audio/wav`.
        media_type: String,
    },

    /// A PDF document.
    Pdf {
        /// Decoded PDF bytes.
        data: Vec<u8>,
    },
}

impl ContentBlock {
    /// Create a text block.
    pub fn text(s: impl Into<String>) -> Self {
        ContentBlock::Text { text: s.into() }
    }

    /// The text of this block, if it is a text block.
    pub fn as_text(&self) -> Option<&str> {
        match self {
            ContentBlock::Text { text } => Some(text),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn text_block_roundtrip() {
        let block = ContentBlock::text("hello");
        let json = serde_json::to_value(&block).unwrap();
        assert_eq!(json["type"], "text");
        let back: ContentBlock = serde_json::from_value(json).unwrap();
        assert_eq!(block, back);
    }

    #[test]
    fn as_text_ignores_binary_blocks() {
        let img = ContentBlock::Image {
            data: vec![1, 2, 3],
            media_type: "image/png".into(),
        };
        assert!(img.as_text().is_none());
        assert_eq!(ContentBlock::text("x").as_text(), Some("x"));
    }
}
