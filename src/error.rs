use std::path::PathBuf;
use thiserror::Error;

/// Exit status reported when the external filesystem-image build fails.
pub const EXIT_EXTERNAL_BUILD: u8 = 3;

/// Exit status for every other fatal error.
pub const EXIT_FAILURE: u8 = 1;

#[derive(Error, Debug)]
pub enum ArchiveError {
    #[error("External build `{command}` failed with {}", describe_status(.status))]
    ExternalBuildFailed { command: String, status: Option<i32> },

    #[error("Could not run external build `{command}`: {source}")]
    ExternalBuildSpawn {
        command: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Cannot read {role} input {}: {source}", .path.display())]
    InputRead {
        role: String,
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Cannot write archive to {}: {source}", .path.display())]
    OutputWrite {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Invalid entry label '{label}': {reason}")]
    InvalidLabel { label: String, reason: String },

    #[error("Firmware entry '{label}' must be the last entry (found at position {index} of {count})")]
    FirmwareNotLast {
        label: String,
        index: usize,
        count: usize,
    },

    #[error("Archive contains more than one firmware entry")]
    DuplicateFirmware,

    #[error("Entry '{label}' is too large: {len} bytes does not fit a 32-bit length field")]
    EntryTooLarge { label: String, len: usize },

    #[error("Compressed payload is too large: {0} bytes does not fit a 32-bit length field")]
    PayloadTooLarge(usize),

    #[error("Compression failed: {0}")]
    Compression(#[source] std::io::Error),

    #[error("Invalid archive magic")]
    InvalidMagic,

    #[error("Missing boundary marker for entry {index} at offset {offset}")]
    InvalidBoundary { index: usize, offset: usize },

    #[error("Invalid entry size for '{label}': original {original_len}, padded {padded_len}")]
    InvalidEntrySize {
        label: String,
        original_len: u32,
        padded_len: u32,
    },

    #[error("Checksum mismatch for entry '{label}'")]
    ChecksumMismatch { label: String },

    #[error("Archive truncated: needed {needed} bytes at offset {offset}, {available} available")]
    Truncated {
        offset: usize,
        needed: usize,
        available: usize,
    },

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Failed to parse configuration: {0}")]
    ConfigParse(#[from] toml::de::Error),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl ArchiveError {
    /// True for failures of the external filesystem-image build step.
    pub fn is_external_build_failure(&self) -> bool {
        matches!(
            self,
            ArchiveError::ExternalBuildFailed { .. } | ArchiveError::ExternalBuildSpawn { .. }
        )
    }

    /// Process exit status for this error.
    ///
    /// External build failures get their own status so callers can tell
    /// them apart from I/O and format errors.
    pub fn exit_code(&self) -> u8 {
        if self.is_external_build_failure() {
            EXIT_EXTERNAL_BUILD
        } else {
            EXIT_FAILURE
        }
    }
}

fn describe_status(status: &Option<i32>) -> String {
    match status {
        Some(code) => format!("exit status {}", code),
        None => "termination by signal".to_string(),
    }
}

pub type Result<T> = std::result::Result<T, ArchiveError>;
