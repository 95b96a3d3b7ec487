//! Blueprint string codec: `'0'` followed by base64 of zlib-compressed JSON.

use std::io::{Read, Write};

use base64::{Engine as _, engine::general_purpose::STANDARD};
use flate2::Compression;
use flate2::read::ZlibDecoder;
use flate2::write::ZlibEncoder;
use serde_json::Value;

/// The only version byte the game has ever written.
pub const VERSION_BYTE: char = '0';

/// Errors decoding (or, rarely, encoding) a blueprint string.
#[derive(Debug, thiserror::Error)]
pub enum CodecError {
    #[error("blueprint string is empty")]
    Empty,
    #[error("unsupported blueprint string version '{0}'")]
    UnsupportedVersion(char),
    #[error("invalid base64: {0}")]
    Base64(#[from] base64::DecodeError),
    #[error("zlib error: {0}")]
    Zlib(#[source] std::io::Error),
    #[error("invalid JSON: {0}")]
    Json(#[from] serde_json::Error),
}

/// Compress `value` at level 9 and wrap it as a blueprint string.
pub fn encode(value: &Value) -> Result<String, CodecError> {
    let json = serde_json::to_vec(value)?;
    let mut encoder = ZlibEncoder::new(Vec::new(), Compression::best());
    encoder.write_all(&json).map_err(CodecError::Zlib)?;
    let compressed = encoder.finish().map_err(CodecError::Zlib)?;

    let mut out = String::with_capacity(1 + compressed.len().div_ceil(3) * 4);
    out.push(VERSION_BYTE);
    STANDARD.encode_string(&compressed, &mut out);
    Ok(out)
}

/// Decode a blueprint string. Surrounding whitespace is ignored.
pub fn decode(s: &str) -> Result<Value, CodecError> {
    let s = s.trim();
    let mut chars = s.chars();
    let version = chars.next().ok_or(CodecError::Empty)?;
    if version != VERSION_BYTE {
        return Err(CodecError::UnsupportedVersion(version));
    }

    let compressed = STANDARD.decode(chars.as_str())?;
    let mut json = Vec::new();
    ZlibDecoder::new(compressed.as_slice())
        .read_to_end(&mut json)
        .map_err(CodecError::Zlib)?;
    tracing::trace!(compressed = compressed.len(), json = json.len(), "decoded blueprint string");
    Ok(serde_json::from_slice(&json)?)
}
