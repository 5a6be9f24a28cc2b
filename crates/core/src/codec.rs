//! Module image encoding.
//!
//! An image file is laid out as:
//!   - 4 bytes: magic `RCKM`
//!   - 2 bytes: u16 little-endian format version
//!   - 4 bytes: u32 little-endian length of the msgpack payload
//!   - N bytes: msgpack-encoded [`ModuleImage`] (named fields)
//!
//! Decoding always works on an in-memory slice; callers read the whole file
//! first so nothing keeps a handle on it afterwards.

use std::fmt;
use std::fs;
use std::path::Path;

use sha2::{Digest, Sha256};

use crate::error::{CoreError, Result};
use crate::image::ModuleImage;

pub const MAGIC: [u8; 4] = *b"RCKM";
pub const FORMAT_VERSION: u16 = 1;

const HEADER_LEN: usize = 10;

pub fn encode(image: &ModuleImage) -> Result<Vec<u8>> {
    let payload =
        rmp_serde::to_vec_named(image).map_err(|e| CoreError::Serialize(e.to_string()))?;

    let mut out = Vec::with_capacity(HEADER_LEN + payload.len());
    out.extend_from_slice(&MAGIC);
    out.extend_from_slice(&FORMAT_VERSION.to_le_bytes());
    out.extend_from_slice(&(payload.len() as u32).to_le_bytes());
    out.extend_from_slice(&payload);
    Ok(out)
}

pub fn decode(bytes: &[u8]) -> Result<ModuleImage> {
    if bytes.len() < HEADER_LEN {
        return Err(CoreError::Malformed(format!(
            "image is {} bytes, shorter than the {HEADER_LEN}-byte header",
            bytes.len()
        )));
    }
    if bytes[..4] != MAGIC {
        return Err(CoreError::Malformed("missing RCKM magic".to_string()));
    }

    let version = u16::from_le_bytes([bytes[4], bytes[5]]);
    if version != FORMAT_VERSION {
        return Err(CoreError::UnsupportedVersion(version));
    }

    let len = u32::from_le_bytes([bytes[6], bytes[7], bytes[8], bytes[9]]) as usize;
    let payload = &bytes[HEADER_LEN..];
    if payload.len() != len {
        return Err(CoreError::Malformed(format!(
            "payload length mismatch: header says {len}, found {}",
            payload.len()
        )));
    }

    rmp_serde::from_slice(payload).map_err(|e| CoreError::Malformed(e.to_string()))
}

/// Atomically write an encoded image.
///
/// Writes to a dot-prefixed `.tmp` sibling first, then renames over the final
/// path so a reader never observes a half-written image.
pub fn write_image(path: &Path, image: &ModuleImage) -> Result<()> {
    let bytes = encode(image)?;
    let file_name = path
        .file_name()
        .and_then(|n| n.to_str())
        .ok_or_else(|| CoreError::Config(format!("invalid image path: {}", path.display())))?;
    let tmp_path = path.with_file_name(format!(".{file_name}.tmp"));

    fs::write(&tmp_path, bytes)?;
    fs::rename(&tmp_path, path)?;
    tracing::debug!(module = %image.name, path = %path.display(), "wrote module image");
    Ok(())
}

/// SHA-256 digest of raw image bytes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Fingerprint([u8; 32]);

impl fmt::Display for Fingerprint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        // Short form is enough for log lines.
        for b in &self.0[..8] {
            write!(f, "{b:02x}")?;
        }
        Ok(())
    }
}

pub fn fingerprint(bytes: &[u8]) -> Fingerprint {
    Fingerprint(Sha256::digest(bytes).into())
}
