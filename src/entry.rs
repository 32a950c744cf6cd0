//! Archive entries
//!
//! An [`Entry`] is one input blob with everything the header needs already
//! computed: original and padded lengths and the MD5 of the padded content.
//! Entries are built once from the input bytes and never mutated.

use crate::checksum::{checksum, to_hex, CHECKSUM_LEN};
use crate::error::{ArchiveError, Result};
use crate::header::{EntryHeader, LABEL_LEN, SECTOR_SIZE};
use crate::padding::pad;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::OnceLock;
use tracing::{debug, warn};

/// Labels the device updater knows how to flash.
pub const KNOWN_LABELS: [&str; 3] = ["font", "spiffs", "app"];

/// What an entry is flashed as.
///
/// The firmware entry must come last: the device activates the new
/// application partition once it has been written.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EntryRole {
    /// Font resource
    Font,
    /// Filesystem image (SPIFFS)
    Filesystem,
    /// Application firmware
    Firmware,
}

impl EntryRole {
    /// All roles in archive order.
    pub const ORDER: [EntryRole; 3] = [EntryRole::Font, EntryRole::Filesystem, EntryRole::Firmware];

    /// Label the device expects for this role.
    pub fn default_label(&self) -> &'static str {
        match self {
            EntryRole::Font => "font",
            EntryRole::Filesystem => "spiffs",
            EntryRole::Firmware => "app",
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            EntryRole::Font => "font",
            EntryRole::Filesystem => "filesystem",
            EntryRole::Firmware => "firmware",
        }
    }
}

impl fmt::Display for EntryRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Validated entry label
///
/// # Rules
/// - 1 to 8 bytes
/// - Printable ASCII only (no spaces, no NUL)
///
/// The device force-terminates the label at its last byte, so an 8-byte
/// label is accepted but reported with a warning, as is any label the
/// device does not recognise.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Label(String);

impl Label {
    const PATTERN: &'static str = r"^[!-~]+$";

    pub fn new(label: impl Into<String>) -> Result<Self> {
        let label = label.into();

        if label.is_empty() {
            return Err(ArchiveError::InvalidLabel {
                label,
                reason: "label cannot be empty".to_string(),
            });
        }

        if label.len() > LABEL_LEN {
            return Err(ArchiveError::InvalidLabel {
                reason: format!("label longer than {} bytes", LABEL_LEN),
                label,
            });
        }

        if !label_pattern().is_match(&label) {
            return Err(ArchiveError::InvalidLabel {
                label,
                reason: "label must be printable ASCII without spaces".to_string(),
            });
        }

        if label.len() == LABEL_LEN {
            warn!(
                "Label '{}' fills the whole field; the device reads only the first {} bytes",
                label,
                LABEL_LEN - 1
            );
        }
        if !KNOWN_LABELS.contains(&label.as_str()) {
            warn!("Label '{}' is not one the device recognises", label);
        }

        Ok(Label(label))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl AsRef<str> for Label {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Label {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

fn label_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| Regex::new(Label::PATTERN).expect("label pattern is valid"))
}

/// One blob embedded in the archive
#[derive(Debug, Clone)]
pub struct Entry {
    label: Label,
    role: EntryRole,
    source: Option<PathBuf>,
    original_len: u32,
    content: Vec<u8>,
    checksum: [u8; CHECKSUM_LEN],
}

impl Entry {
    /// Build an entry from in-memory content.
    pub fn from_bytes(role: EntryRole, label: Label, content: &[u8]) -> Result<Self> {
        let original_len = u32::try_from(content.len()).map_err(|_| ArchiveError::EntryTooLarge {
            label: label.to_string(),
            len: content.len(),
        })?;

        let padded = pad(content, SECTOR_SIZE);
        if u32::try_from(padded.len()).is_err() {
            return Err(ArchiveError::EntryTooLarge {
                label: label.to_string(),
                len: padded.len(),
            });
        }
        let checksum = checksum(&padded);

        debug!(
            "Entry '{}' ({}): {} bytes, padded to {}, md5 {}",
            label,
            role,
            original_len,
            padded.len(),
            to_hex(&checksum)
        );

        Ok(Entry {
            label,
            role,
            source: None,
            original_len,
            content: padded,
            checksum,
        })
    }

    /// Read an input file and build an entry from it.
    pub fn read(role: EntryRole, label: Label, path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let content = std::fs::read(path).map_err(|source| ArchiveError::InputRead {
            role: role.to_string(),
            path: path.to_path_buf(),
            source,
        })?;

        let mut entry = Entry::from_bytes(role, label, &content)?;
        entry.source = Some(path.to_path_buf());
        Ok(entry)
    }

    pub fn label(&self) -> &Label {
        &self.label
    }

    pub fn role(&self) -> EntryRole {
        self.role
    }

    /// Input file this entry was read from, if any
    pub fn source(&self) -> Option<&Path> {
        self.source.as_deref()
    }

    pub fn original_len(&self) -> u32 {
        self.original_len
    }

    pub fn padded_len(&self) -> u32 {
        // Checked against u32 in from_bytes
        self.content.len() as u32
    }

    /// Padded content block
    pub fn content(&self) -> &[u8] {
        &self.content
    }

    pub fn checksum(&self) -> &[u8; CHECKSUM_LEN] {
        &self.checksum
    }

    pub fn header(&self) -> EntryHeader {
        EntryHeader::new(
            self.label.as_str(),
            self.original_len,
            self.padded_len(),
            self.checksum,
        )
    }
}
