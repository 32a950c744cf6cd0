//! Compressed archive container
//!
//! The whole raw archive is compressed as one zlib stream and wrapped as:
//!
//! **Format**: `[magic: 26 bytes][compressed_len: u32 LE][zlib stream]`
//!
//! The magic differs from the raw archive header, so a reader can pick the
//! encoding from the first bytes. Nothing inside the container is sector
//! aligned; alignment only applies to the raw stream before compression.

use crate::error::{ArchiveError, Result};
use crate::header::ARCHIVE_MAGIC;
use flate2::read::ZlibDecoder;
use flate2::write::ZlibEncoder;
use flate2::Compression;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::io::{Read, Write};

/// Magic prefix of a compressed archive.
pub const COMPRESSED_MAGIC: &[u8; 26] = b"MZ5 compressed archive\r\n\n\x1a";

/// zlib level used for the container (favours speed over ratio).
pub const COMPRESSION_LEVEL: u32 = 3;

const LEN_FIELD: usize = 4;

/// Output encoding of a build
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Encoding {
    /// Sector-aligned archive as assembled
    Raw,
    /// Raw archive inside a zlib container
    #[default]
    Compressed,
}

impl Encoding {
    pub fn as_str(&self) -> &'static str {
        match self {
            Encoding::Raw => "raw",
            Encoding::Compressed => "compressed",
        }
    }
}

impl fmt::Display for Encoding {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Compress a complete raw archive into the container format.
pub fn wrap(raw: &[u8]) -> Result<Vec<u8>> {
    let mut encoder = ZlibEncoder::new(Vec::new(), Compression::new(COMPRESSION_LEVEL));
    encoder.write_all(raw).map_err(ArchiveError::Compression)?;
    let payload = encoder.finish().map_err(ArchiveError::Compression)?;

    let len = u32::try_from(payload.len()).map_err(|_| ArchiveError::PayloadTooLarge(payload.len()))?;

    let mut out = Vec::with_capacity(COMPRESSED_MAGIC.len() + LEN_FIELD + payload.len());
    out.extend_from_slice(COMPRESSED_MAGIC);
    out.extend_from_slice(&len.to_le_bytes());
    out.extend_from_slice(&payload);
    Ok(out)
}

/// Recover the raw archive from a compressed container.
pub fn unwrap_container(bytes: &[u8]) -> Result<Vec<u8>> {
    let prefix = COMPRESSED_MAGIC.len() + LEN_FIELD;
    if bytes.len() < prefix {
        return Err(ArchiveError::Truncated {
            offset: 0,
            needed: prefix,
            available: bytes.len(),
        });
    }
    if &bytes[..COMPRESSED_MAGIC.len()] != COMPRESSED_MAGIC {
        return Err(ArchiveError::InvalidMagic);
    }

    let len_at = COMPRESSED_MAGIC.len();
    let len = u32::from_le_bytes([
        bytes[len_at],
        bytes[len_at + 1],
        bytes[len_at + 2],
        bytes[len_at + 3],
    ]) as usize;

    let payload = &bytes[prefix..];
    if payload.len() < len {
        return Err(ArchiveError::Truncated {
            offset: prefix,
            needed: len,
            available: payload.len(),
        });
    }

    let mut raw = Vec::new();
    ZlibDecoder::new(&payload[..len])
        .read_to_end(&mut raw)
        .map_err(ArchiveError::Compression)?;
    Ok(raw)
}

/// Identify the encoding of an archive from its leading bytes.
pub fn detect(bytes: &[u8]) -> Option<Encoding> {
    if bytes.starts_with(COMPRESSED_MAGIC) {
        Some(Encoding::Compressed)
    } else if bytes.starts_with(ARCHIVE_MAGIC) {
        Some(Encoding::Raw)
    } else {
        None
    }
}

/// Produce the final output bytes for `encoding`.
pub fn encode(raw: Vec<u8>, encoding: Encoding) -> Result<Vec<u8>> {
    match encoding {
        Encoding::Raw => Ok(raw),
        Encoding::Compressed => wrap(&raw),
    }
}
