//! Raw archive assembly
//!
//! Writes the archive header, then for each entry its header block and its
//! padded content block, in exactly the order given. The only structural
//! rule enforced here is that a firmware entry, if present, is unique and
//! last.

use crate::entry::{Entry, EntryRole};
use crate::error::{ArchiveError, Result};
use crate::header::{ArchiveHeader, SECTOR_SIZE};
use std::io::Write;
use tracing::debug;

/// Check the firmware-last rule.
pub fn validate_order(entries: &[Entry]) -> Result<()> {
    let count = entries.len();
    let mut firmware = entries
        .iter()
        .enumerate()
        .filter(|(_, e)| e.role() == EntryRole::Firmware);

    if let Some((index, entry)) = firmware.next() {
        if firmware.next().is_some() {
            return Err(ArchiveError::DuplicateFirmware);
        }
        if index + 1 != count {
            return Err(ArchiveError::FirmwareNotLast {
                label: entry.label().to_string(),
                index,
                count,
            });
        }
    }

    Ok(())
}

/// Total size of the raw archive for `entries`.
pub fn archive_len(entries: &[Entry]) -> usize {
    SECTOR_SIZE
        + entries
            .iter()
            .map(|e| SECTOR_SIZE + e.content().len())
            .sum::<usize>()
}

/// Stream the raw archive into `out`.
///
/// Returns the number of bytes written.
pub fn write_archive<W: Write>(entries: &[Entry], mut out: W) -> Result<usize> {
    validate_order(entries)?;

    let mut written = 0;

    let header = ArchiveHeader.to_bytes();
    out.write_all(&header)?;
    written += header.len();

    for (index, entry) in entries.iter().enumerate() {
        debug!(
            "Writing entry {} '{}' at offset {} ({} content bytes)",
            index,
            entry.label(),
            written,
            entry.content().len()
        );

        let block = entry.header().to_bytes();
        out.write_all(&block)?;
        written += block.len();

        out.write_all(entry.content())?;
        written += entry.content().len();
    }

    out.flush()?;
    Ok(written)
}

/// Assemble the raw archive in memory.
pub fn assemble(entries: &[Entry]) -> Result<Vec<u8>> {
    let mut buf = Vec::with_capacity(archive_len(entries));
    write_archive(entries, &mut buf)?;
    Ok(buf)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::entry::Label;
    use crate::header::{EntryHeader, ARCHIVE_MAGIC, BOUNDARY_MARKER};

    fn entry(role: EntryRole, label: &str, size: usize, fill: u8) -> Entry {
        Entry::from_bytes(role, Label::new(label).unwrap(), &vec![fill; size]).unwrap()
    }

    #[test]
    fn test_reference_archive_size() {
        let entries = vec![
            entry(EntryRole::Font, "font", 100, 1),
            entry(EntryRole::Filesystem, "spiffs", 5000, 2),
            entry(EntryRole::Firmware, "app", 10000, 3),
        ];

        assert_eq!(archive_len(&entries), 40960);

        let archive = assemble(&entries).unwrap();
        assert_eq!(archive.len(), 40960);
        assert_eq!(archive.len() % SECTOR_SIZE, 0);
    }

    #[test]
    fn test_block_layout() {
        let entries = vec![
            entry(EntryRole::Font, "font", 100, 0xAA),
            entry(EntryRole::Firmware, "app", 4097, 0xBB),
        ];
        let archive = assemble(&entries).unwrap();

        assert_eq!(&archive[..32], ARCHIVE_MAGIC);

        // font header at sector 1, content at sector 2
        assert_eq!(&archive[4096..4112], BOUNDARY_MARKER);
        let font = EntryHeader::from_bytes(&archive[4096..8192], 0, 4096).unwrap();
        assert_eq!(font.label(), "font");
        assert_eq!(font.original_len, 100);
        assert_eq!(font.padded_len, 4096);
        assert_eq!(archive[8192], 0xAA);
        assert_eq!(archive[8192 + 100], 0);

        // app header at sector 3, content at sectors 4..6
        let app = EntryHeader::from_bytes(&archive[12288..16384], 1, 12288).unwrap();
        assert_eq!(app.label(), "app");
        assert_eq!(app.padded_len, 8192);
        assert_eq!(archive.len(), 16384 + 8192);
    }

    #[test]
    fn test_order_is_preserved() {
        let entries = vec![
            entry(EntryRole::Filesystem, "spiffs", 10, 1),
            entry(EntryRole::Font, "font", 10, 2),
            entry(EntryRole::Firmware, "app", 10, 3),
        ];
        let archive = assemble(&entries).unwrap();

        let labels: Vec<String> = (0..3)
            .map(|i| {
                let offset = SECTOR_SIZE + i * 2 * SECTOR_SIZE;
                EntryHeader::from_bytes(&archive[offset..], i, offset)
                    .unwrap()
                    .label()
            })
            .collect();
        assert_eq!(labels, vec!["spiffs", "font", "app"]);
    }

    #[test]
    fn test_firmware_must_be_last() {
        let entries = vec![
            entry(EntryRole::Firmware, "app", 10, 1),
            entry(EntryRole::Font, "font", 10, 2),
        ];
        let err = assemble(&entries).unwrap_err();
        assert!(matches!(
            err,
            ArchiveError::FirmwareNotLast {
                index: 0,
                count: 2,
                ..
            }
        ));
    }

    #[test]
    fn test_duplicate_firmware_rejected() {
        let entries = vec![
            entry(EntryRole::Firmware, "app", 10, 1),
            entry(EntryRole::Firmware, "app", 10, 2),
        ];
        assert!(matches!(
            assemble(&entries),
            Err(ArchiveError::DuplicateFirmware)
        ));
    }

    #[test]
    fn test_no_firmware_is_allowed() {
        let entries = vec![entry(EntryRole::Font, "font", 10, 1)];
        let archive = assemble(&entries).unwrap();
        assert_eq!(archive.len(), 3 * SECTOR_SIZE);
    }

    #[test]
    fn test_empty_archive_is_header_only() {
        let archive = assemble(&[]).unwrap();
        assert_eq!(archive.len(), SECTOR_SIZE);
    }

    #[test]
    fn test_write_archive_reports_length() {
        let entries = vec![entry(EntryRole::Firmware, "app", 1, 1)];
        let mut out = Vec::new();
        let written = write_archive(&entries, &mut out).unwrap();
        assert_eq!(written, out.len());
        assert_eq!(written, archive_len(&entries));
    }
}
