use crate::checksum::CHECKSUM_LEN;
use crate::error::{ArchiveError, Result};
use crate::padding::pad;

/// Flash sector size; every raw archive block is a multiple of this.
pub const SECTOR_SIZE: usize = 4096;

/// Identification string at the start of a raw archive.
pub const ARCHIVE_MAGIC: &[u8; 32] = b"MZ5 firmware archive 1.0\r\n\n\x1a    ";

/// Constant prefix of every entry header.
pub const BOUNDARY_MARKER: &[u8; 16] = b"-file boundary--";

/// Width of the on-wire label field.
pub const LABEL_LEN: usize = 8;

/// Entry header size before sector padding.
pub const ENTRY_HEADER_LEN: usize = BOUNDARY_MARKER.len() + LABEL_LEN + 4 + 4 + CHECKSUM_LEN;

/// Global archive header (first sector of a raw archive)
///
/// Carries no fields of its own: the fixed string identifies both the
/// format and its version.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ArchiveHeader;

impl ArchiveHeader {
    /// Serialize to one zero-padded sector.
    pub fn to_bytes(&self) -> Vec<u8> {
        pad(ARCHIVE_MAGIC, SECTOR_SIZE)
    }

    /// Check that `bytes` begins with the archive header string.
    pub fn validate(bytes: &[u8]) -> Result<()> {
        if bytes.len() < ARCHIVE_MAGIC.len() {
            return Err(ArchiveError::Truncated {
                offset: 0,
                needed: ARCHIVE_MAGIC.len(),
                available: bytes.len(),
            });
        }
        if &bytes[..ARCHIVE_MAGIC.len()] != ARCHIVE_MAGIC {
            return Err(ArchiveError::InvalidMagic);
        }
        Ok(())
    }
}

/// Per-entry header
///
/// Layout (little-endian):
///
/// ```text
/// 0..16   boundary marker "-file boundary--"
/// 16..24  label, NUL padded
/// 24..28  original length (u32)
/// 28..32  padded length (u32)
/// 32..48  MD5 of padded content
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EntryHeader {
    pub label: [u8; LABEL_LEN],
    pub original_len: u32,
    pub padded_len: u32,
    pub checksum: [u8; CHECKSUM_LEN],
}

impl EntryHeader {
    pub fn new(label: &str, original_len: u32, padded_len: u32, checksum: [u8; CHECKSUM_LEN]) -> Self {
        EntryHeader {
            label: encode_label(label),
            original_len,
            padded_len,
            checksum,
        }
    }

    /// Label with trailing NUL padding stripped
    pub fn label(&self) -> String {
        decode_label(&self.label)
    }

    /// Serialize the unpadded 48-byte header.
    pub fn to_raw_bytes(&self) -> [u8; ENTRY_HEADER_LEN] {
        let mut bytes = [0u8; ENTRY_HEADER_LEN];
        let mut offset = 0;

        bytes[offset..offset + BOUNDARY_MARKER.len()].copy_from_slice(BOUNDARY_MARKER);
        offset += BOUNDARY_MARKER.len();

        bytes[offset..offset + LABEL_LEN].copy_from_slice(&self.label);
        offset += LABEL_LEN;

        bytes[offset..offset + 4].copy_from_slice(&self.original_len.to_le_bytes());
        offset += 4;

        bytes[offset..offset + 4].copy_from_slice(&self.padded_len.to_le_bytes());
        offset += 4;

        bytes[offset..offset + CHECKSUM_LEN].copy_from_slice(&self.checksum);

        bytes
    }

    /// Serialize to one zero-padded sector.
    pub fn to_bytes(&self) -> Vec<u8> {
        pad(&self.to_raw_bytes(), SECTOR_SIZE)
    }

    /// Deserialize from the start of an entry header block
    ///
    /// Fails with `InvalidBoundary` if the marker is missing; `index` and
    /// `offset` are only used for the error report.
    pub fn from_bytes(bytes: &[u8], index: usize, offset: usize) -> Result<Self> {
        if bytes.len() < ENTRY_HEADER_LEN {
            return Err(ArchiveError::Truncated {
                offset,
                needed: ENTRY_HEADER_LEN,
                available: bytes.len(),
            });
        }

        if &bytes[..BOUNDARY_MARKER.len()] != BOUNDARY_MARKER {
            return Err(ArchiveError::InvalidBoundary { index, offset });
        }
        let mut pos = BOUNDARY_MARKER.len();

        let mut label = [0u8; LABEL_LEN];
        label.copy_from_slice(&bytes[pos..pos + LABEL_LEN]);
        pos += LABEL_LEN;

        let original_len = u32::from_le_bytes([
            bytes[pos],
            bytes[pos + 1],
            bytes[pos + 2],
            bytes[pos + 3],
        ]);
        pos += 4;

        let padded_len = u32::from_le_bytes([
            bytes[pos],
            bytes[pos + 1],
            bytes[pos + 2],
            bytes[pos + 3],
        ]);
        pos += 4;

        let mut checksum = [0u8; CHECKSUM_LEN];
        checksum.copy_from_slice(&bytes[pos..pos + CHECKSUM_LEN]);

        Ok(EntryHeader {
            label,
            original_len,
            padded_len,
            checksum,
        })
    }
}

/// Build a sector-padded entry header block.
pub fn build_header(
    label: &str,
    original_len: u32,
    padded_len: u32,
    checksum: [u8; CHECKSUM_LEN],
) -> Vec<u8> {
    EntryHeader::new(label, original_len, padded_len, checksum).to_bytes()
}

/// Encode a label into the fixed-width field
///
/// Shorter labels are NUL padded; longer ones are truncated to the first
/// `LABEL_LEN` bytes. Truncation is part of the format, not an error.
pub fn encode_label(label: &str) -> [u8; LABEL_LEN] {
    let mut field = [0u8; LABEL_LEN];
    let bytes = label.as_bytes();
    let n = bytes.len().min(LABEL_LEN);
    field[..n].copy_from_slice(&bytes[..n]);
    field
}

/// Decode a label field, dropping trailing NUL padding.
pub fn decode_label(field: &[u8; LABEL_LEN]) -> String {
    let end = field
        .iter()
        .rposition(|&b| b != 0)
        .map(|i| i + 1)
        .unwrap_or(0);
    String::from_utf8_lossy(&field[..end]).into_owned()
}
