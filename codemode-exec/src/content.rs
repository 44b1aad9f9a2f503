//! Decoder for the sandbox content-output file.
//!
//! The generated driver writes a JSON array of
//! `{"type":"text","text":…}` / `{"type":"image"|"audio","data":<base64>,"mimeType":…}`
//! records. Decoding is strict: unknown `type` strings and invalid
//! base64 are errors; a missing file means "no structured content".

use base64::Engine as _;
use base64::engine::general_purpose::STANDARD as BASE64;
use codemode_types::{ContentBlock, ExecError};
use serde::Deserialize;

#[derive(Debug, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
enum WireContent {
    Text {
        text: String,
    },
    Image {
        data: String,
        #[serde(rename = "mimeType")]
        mime_type: String,
    },
    Audio {
        data: String,
        #[serde(rename = "mimeType")]
        mime_type: String,
    },
}

/// Parse the bytes of a content-output file.
pub fn parse_content_file(bytes: &[u8]) -> Result<Vec<ContentBlock>, ExecError> {
    let wire: Vec<WireContent> = serde_json::from_slice(bytes)
        .map_err(|e| ExecError::Infrastructure(format!("decoding content output: {e}")))?;
    wire.into_iter()
        .map(|item| match item {
            WireContent::Text { text } => Ok(ContentBlock::Text { text }),
            WireContent::Image { data, mime_type } => Ok(ContentBlock::Image {
                data: decode_b64(&data, "image")?,
                media_type: mime_type,
            }),
            WireContent::Audio { data, mime_type } => Ok(ContentBlock::Audio {
                data: decode_b64(&data, "audio")?,
                media_type: mime_type,
            }),
        })
        .collect()
}

fn decode_b64(data: &str, kind: &str) -> Result<Vec<u8>, ExecError> {
    BASE64
        .decode(data)
        .map_err(|e| ExecError::Infrastructure(format!("decoding {kind} content data: {e}")))
}
