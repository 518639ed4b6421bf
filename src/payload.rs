//! Image payloads delivered by the page's PNG export callbacks

use base64::alphabet;
use base64::engine::general_purpose::GeneralPurpose;
use base64::engine::{DecodePaddingMode, GeneralPurposeConfig};
use base64::Engine as Base64Engine;
use serde::Deserialize;
use std::path::Path;

/// Prefix of the data URIs produced by the PNG export functions
pub const PNG_DATA_URI_PREFIX: &str = "data:image/png;base64,";

// Padding and trailing bits are not checked; the input is filtered first.
const LENIENT: GeneralPurpose = GeneralPurpose::new(
    &alphabet::STANDARD,
    GeneralPurposeConfig::new()
        .with_decode_padding_mode(DecodePaddingMode::Indifferent)
        .with_decode_allow_trailing_bits(true),
);

/// An image handed to the host-side save function by page code.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct SavedImage {
    /// PNG data URI (or bare base64)
    pub content: String,
    /// Target file the page was told to save to
    pub filename: String,
}

impl SavedImage {
    /// Build from a binding payload. The payload is either the JSON object
    /// itself or a string holding its JSON text.
    pub fn from_binding_payload(payload: serde_json::Value) -> crate::Result<Self> {
        let value = match payload {
            serde_json::Value::String(s) => serde_json::from_str::<serde_json::Value>(&s)
                .map_err(|e| crate::Error::DecodeError(format!("payload is not JSON: {}", e)))?,
            other => other,
        };
        serde_json::from_value(value)
            .map_err(|e| crate::Error::DecodeError(format!("unexpected payload shape: {}", e)))
    }
}

/// Strip the PNG data-URI prefix. Anything else passes through unchanged.
pub fn strip_data_uri(content: &str) -> &str {
    content.strip_prefix(PNG_DATA_URI_PREFIX).unwrap_or(content)
}

/// Decode an export payload into PNG bytes.
///
/// Decoding stops at the first `=`. Characters outside the base64 alphabet
/// are skipped, URL-safe characters are accepted, padding is optional, and a
/// dangling final character is dropped.
pub fn decode_png(content: &str) -> crate::Result<Vec<u8>> {
    let data = strip_data_uri(content);
    let data = data.split('=').next().unwrap_or(data);
    let mut cleaned: Vec<u8> = data
        .bytes()
        .filter_map(|b| match b {
            b'A'..=b'Z' | b'a'..=b'z' | b'0'..=b'9' | b'+' | b'/' => Some(b),
            b'-' => Some(b'+'),
            b'_' => Some(b'/'),
            _ => None,
        })
        .collect();
    if cleaned.len() % 4 == 1 {
        cleaned.pop();
    }

    LENIENT
        .decode(&cleaned)
        .map_err(|e| crate::Error::DecodeError(e.to_string()))
}

/// Decode `content` and write the bytes to `path`.
pub fn write_png(content: &str, path: &Path) -> crate::Result<()> {
    let bytes = decode_png(content)?;
    std::fs::write(path, bytes).map_err(|source| crate::Error::Io {
        path: path.to_path_buf(),
        source,
    })
}
