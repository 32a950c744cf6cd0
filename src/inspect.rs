//! Archive inspection
//!
//! Walks a finished archive the way the device updater does and checks
//! every structural and integrity rule on the way. Used to verify builds,
//! not to flash them.

use crate::checksum::{checksum, to_hex, CHECKSUM_LEN};
use crate::compression::{detect, unwrap_container, Encoding};
use crate::error::{ArchiveError, Result};
use crate::header::{ArchiveHeader, EntryHeader, SECTOR_SIZE};
use serde::Serialize;
use tracing::debug;

/// One verified entry read back from an archive.
#[derive(Debug, Clone, Serialize)]
pub struct InspectedEntry {
    pub label: String,
    pub original_len: u32,
    pub padded_len: u32,
    #[serde(serialize_with = "serialize_hex")]
    pub checksum: [u8; CHECKSUM_LEN],
    /// Byte offset of the entry header in the raw stream
    pub offset: usize,
    /// Content truncated to `original_len`
    #[serde(skip)]
    pub content: Vec<u8>,
}

/// Result of reading an archive back.
#[derive(Debug, Clone, Serialize)]
pub struct ArchiveContents {
    pub encoding: Encoding,
    /// Length of the raw (decompressed) stream
    pub raw_len: usize,
    pub entries: Vec<InspectedEntry>,
}

impl ArchiveContents {
    pub fn entry(&self, label: &str) -> Option<&InspectedEntry> {
        self.entries.iter().find(|e| e.label == label)
    }
}

/// Read and verify an archive in either encoding.
pub fn read_archive(bytes: &[u8]) -> Result<ArchiveContents> {
    match detect(bytes) {
        Some(Encoding::Raw) => read_raw(bytes, Encoding::Raw),
        Some(Encoding::Compressed) => {
            let raw = unwrap_container(bytes)?;
            debug!(
                "Inflated {} compressed bytes to {} raw bytes",
                bytes.len(),
                raw.len()
            );
            read_raw(&raw, Encoding::Compressed)
        }
        None => Err(ArchiveError::InvalidMagic),
    }
}

fn read_raw(raw: &[u8], encoding: Encoding) -> Result<ArchiveContents> {
    ArchiveHeader::validate(raw)?;
    let mut offset = SECTOR_SIZE;
    let mut entries = Vec::new();

    while offset < raw.len() {
        let index = entries.len();
        let header = EntryHeader::from_bytes(&raw[offset..], index, offset)?;
        let label = header.label();

        if header.original_len > header.padded_len
            || header.padded_len as usize % SECTOR_SIZE != 0
        {
            return Err(ArchiveError::InvalidEntrySize {
                label,
                original_len: header.original_len,
                padded_len: header.padded_len,
            });
        }

        let content_at = offset + SECTOR_SIZE;
        let padded_len = header.padded_len as usize;
        let available = raw.len().saturating_sub(content_at);
        if available < padded_len {
            return Err(ArchiveError::Truncated {
                offset: content_at,
                needed: padded_len,
                available,
            });
        }

        let block = &raw[content_at..content_at + padded_len];
        if checksum(block) != header.checksum {
            return Err(ArchiveError::ChecksumMismatch { label });
        }

        debug!(
            "Entry {} '{}': original {}, padded {}, md5 {}",
            index,
            label,
            header.original_len,
            header.padded_len,
            to_hex(&header.checksum)
        );

        entries.push(InspectedEntry {
            label,
            original_len: header.original_len,
            padded_len: header.padded_len,
            checksum: header.checksum,
            offset,
            content: block[..header.original_len as usize].to_vec(),
        });

        offset = content_at + padded_len;
    }

    Ok(ArchiveContents {
        encoding,
        raw_len: raw.len(),
        entries,
    })
}

fn serialize_hex<S>(bytes: &[u8; CHECKSUM_LEN], serializer: S) -> std::result::Result<S::Ok, S::Error>
where
    S: serde::Serializer,
{
    serializer.serialize_str(&to_hex(bytes))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::assembler::assemble;
    use crate::compression::wrap;
    use crate::entry::{Entry, EntryRole, Label};

    fn sample_archive() -> (Vec<Vec<u8>>, Vec<u8>) {
        let inputs = vec![
            (0..100u32).map(|i| i as u8).collect::<Vec<_>>(),
            vec![0x55; 5000],
            vec![0xC3; 10000],
        ];
        let entries: Vec<Entry> = EntryRole::ORDER
            .iter()
            .zip(&inputs)
            .map(|(role, data)| {
                Entry::from_bytes(*role, Label::new(role.default_label()).unwrap(), data).unwrap()
            })
            .collect();
        let raw = assemble(&entries).unwrap();
        (inputs, raw)
    }

    #[test]
    fn test_read_raw_archive() {
        let (inputs, raw) = sample_archive();
        let contents = read_archive(&raw).unwrap();

        assert_eq!(contents.encoding, Encoding::Raw);
        assert_eq!(contents.raw_len, 40960);
        assert_eq!(contents.entries.len(), 3);

        let labels: Vec<&str> = contents.entries.iter().map(|e| e.label.as_str()).collect();
        assert_eq!(labels, vec!["font", "spiffs", "app"]);

        for (entry, input) in contents.entries.iter().zip(&inputs) {
            assert_eq!(&entry.content, input);
        }
    }

    #[test]
    fn test_read_compressed_archive() {
        let (_, raw) = sample_archive();
        let contents = read_archive(&wrap(&raw).unwrap()).unwrap();

        assert_eq!(contents.encoding, Encoding::Compressed);
        assert_eq!(contents.raw_len, raw.len());
        assert_eq!(contents.entry("app").unwrap().original_len, 10000);
    }

    #[test]
    fn test_detects_corrupted_content() {
        let (_, mut raw) = sample_archive();
        // first byte of the spiffs content block
        raw[4 * SECTOR_SIZE] ^= 0x01;

        let err = read_archive(&raw).unwrap_err();
        assert!(matches!(err, ArchiveError::ChecksumMismatch { label } if label == "spiffs"));
    }

    #[test]
    fn test_detects_missing_boundary() {
        let (_, mut raw) = sample_archive();
        raw[3 * SECTOR_SIZE] = b'#';

        assert!(matches!(
            read_archive(&raw),
            Err(ArchiveError::InvalidBoundary { index: 1, .. })
        ));
    }

    #[test]
    fn test_detects_truncation() {
        let (_, raw) = sample_archive();
        let cut = &raw[..raw.len() - SECTOR_SIZE];

        assert!(matches!(
            read_archive(cut),
            Err(ArchiveError::Truncated { .. })
        ));
    }

    #[test]
    fn test_detects_bad_sizes() {
        let (_, mut raw) = sample_archive();
        // original_len of the font entry > padded_len
        let at = SECTOR_SIZE + 24;
        raw[at..at + 4].copy_from_slice(&9000u32.to_le_bytes());

        assert!(matches!(
            read_archive(&raw),
            Err(ArchiveError::InvalidEntrySize { .. })
        ));
    }

    #[test]
    fn test_rejects_unknown_magic() {
        assert!(matches!(
            read_archive(b"not an archive at all"),
            Err(ArchiveError::InvalidMagic)
        ));
    }
}
