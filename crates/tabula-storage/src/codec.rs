//! Reversible text codec for persisted blobs.
//!
//! Container layout (before base64, no padding):
//!
//! ```text
//! magic "TBLZ" | version u8 | flag u8 | payload
//! ```
//!
//! `flag` is [`FLAG_STORED`] (payload is the raw UTF-8 text) or [`FLAG_LZ4`] (payload is an LZ4
//! block with its uncompressed length prepended as a little-endian `u32`). LZ4 is only used
//! when it actually shrinks the text, so short blobs stay readable after base64 decoding.

use base64::engine::general_purpose::STANDARD_NO_PAD;
use base64::Engine;
use thiserror::Error;

const CONTAINER_MAGIC: &[u8; 4] = b"TBLZ";
const CONTAINER_VERSION: u8 = 1;
const HEADER_LEN: usize = 4 /* magic */ + 1 /* version */ + 1 /* flag */;

pub const FLAG_STORED: u8 = 0;
pub const FLAG_LZ4: u8 = 1;

/// Upper bound on a decoded blob; anything larger is treated as corrupt.
const MAX_DECOMPRESSED_BYTES: usize = 256 * 1024 * 1024;
/// LZ4 cannot expand input by more than this factor.
const MAX_LZ4_RATIO: usize = 255;

#[derive(Debug, Error)]
pub enum CodecError {
    #[error("compressed container is truncated")]
    TruncatedContainer,
    #[error("compressed container magic header mismatch")]
    InvalidMagic,
    #[error("unsupported compressed container version: {0}")]
    UnsupportedVersion(u8),
    #[error("unknown compression flag: {0}")]
    UnknownFlag(u8),
    #[error("declared decompressed size {0} is implausible")]
    ImplausibleSize(usize),
    #[error("base64 error: {0}")]
    Base64(#[from] base64::DecodeError),
    #[error("lz4 error: {0}")]
    Lz4(#[from] lz4_flex::block::DecompressError),
    #[error("decoded text is not valid utf-8: {0}")]
    Utf8(#[from] std::string::FromUtf8Error),
}

/// Compress `text` into an opaque, storage-safe string.
pub fn compress(text: &str) -> String {
    let raw = text.as_bytes();
    let packed = lz4_flex::compress_prepend_size(raw);
    let (flag, payload) = if packed.len() < raw.len() {
        (FLAG_LZ4, packed.as_slice())
    } else {
        (FLAG_STORED, raw)
    };

    let mut out = Vec::with_capacity(HEADER_LEN + payload.len());
    out.extend_from_slice(CONTAINER_MAGIC);
    out.push(CONTAINER_VERSION);
    out.push(flag);
    out.extend_from_slice(payload);
    STANDARD_NO_PAD.encode(out)
}

/// Reverse [`compress`]. Foreign or damaged input yields an error, never a panic.
pub fn decompress(encoded: &str) -> Result<String, CodecError> {
    let bytes = STANDARD_NO_PAD.decode(encoded.trim())?;
    if bytes.len() < HEADER_LEN {
        return Err(CodecError::TruncatedContainer);
    }
    if &bytes[..CONTAINER_MAGIC.len()] != CONTAINER_MAGIC {
        return Err(CodecError::InvalidMagic);
    }
    let version = bytes[4];
    if version != CONTAINER_VERSION {
        return Err(CodecError::UnsupportedVersion(version));
    }
    let flag = bytes[5];
    let payload = &bytes[HEADER_LEN..];

    let raw = match flag {
        FLAG_STORED => payload.to_vec(),
        FLAG_LZ4 => decompress_lz4(payload)?,
        other => return Err(CodecError::UnknownFlag(other)),
    };
    Ok(String::from_utf8(raw)?)
}

fn decompress_lz4(payload: &[u8]) -> Result<Vec<u8>, CodecError> {
    if payload.len() < 4 {
        return Err(CodecError::TruncatedContainer);
    }
    let (size_bytes, block) = payload.split_at(4);
    let size = u32::from_le_bytes([size_bytes[0], size_bytes[1], size_bytes[2], size_bytes[3]])
        as usize;
    // Validate the declared size before allocating for it.
    if size > MAX_DECOMPRESSED_BYTES || size > block.len().saturating_mul(MAX_LZ4_RATIO) {
        return Err(CodecError::ImplausibleSize(size));
    }
    Ok(lz4_flex::block::decompress(block, size)?)
}
