//! Build pipeline
//!
//! One run: build the filesystem image, read the three inputs in archive
//! order, assemble, optionally compress, publish atomically.
//!
//! Every failure is fatal and nothing is retried. If the external build
//! step fails, the pipeline stops before touching any input or output.

use crate::assembler::{archive_len, assemble};
use crate::checksum::to_hex;
use crate::compression::{encode, Encoding};
use crate::config::{BuildCommand, BuildConfig};
use crate::entry::{Entry, EntryRole};
use crate::error::{ArchiveError, Result};
use crate::io::write_atomically;
use serde::Serialize;
use sha2::{Digest, Sha256};
use std::path::PathBuf;
use std::process::Command;
use tracing::{debug, error, info};

/// Runs the external filesystem-image build.
///
/// Implementations return `Ok(())` only when the step succeeded; any
/// failure must come back as an external build error so the pipeline can
/// report the distinct exit status.
pub trait BuildRunner {
    fn run(&self, command: &BuildCommand) -> Result<()>;
}

/// Runs the command as a blocking child process.
#[derive(Debug, Default, Clone, Copy)]
pub struct CommandRunner;

impl BuildRunner for CommandRunner {
    fn run(&self, command: &BuildCommand) -> Result<()> {
        let mut cmd = Command::new(&command.program);
        cmd.args(&command.args);
        if let Some(dir) = &command.working_dir {
            cmd.current_dir(dir);
        }

        let status = cmd.status().map_err(|source| ArchiveError::ExternalBuildSpawn {
            command: command.display(),
            source,
        })?;

        if !status.success() {
            return Err(ArchiveError::ExternalBuildFailed {
                command: command.display(),
                status: status.code(),
            });
        }

        Ok(())
    }
}

/// Skips the external step; for inputs that are already built.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoopRunner;

impl BuildRunner for NoopRunner {
    fn run(&self, command: &BuildCommand) -> Result<()> {
        debug!("Skipping external build `{}`", command.display());
        Ok(())
    }
}

/// Per-entry line of a build report.
#[derive(Debug, Clone, Serialize)]
pub struct EntrySummary {
    pub label: String,
    pub role: EntryRole,
    pub source: Option<PathBuf>,
    pub original_len: u32,
    pub padded_len: u32,
    pub md5: String,
}

impl From<&Entry> for EntrySummary {
    fn from(entry: &Entry) -> Self {
        EntrySummary {
            label: entry.label().to_string(),
            role: entry.role(),
            source: entry.source().map(|p| p.to_path_buf()),
            original_len: entry.original_len(),
            padded_len: entry.padded_len(),
            md5: to_hex(entry.checksum()),
        }
    }
}

/// Outcome of a successful build.
#[derive(Debug, Clone, Serialize)]
pub struct BuildReport {
    pub output: PathBuf,
    pub encoding: Encoding,
    /// Size of the sector-aligned stream before encoding
    pub raw_len: usize,
    /// Size of the file written
    pub written_len: usize,
    /// SHA-256 of the file written
    pub sha256: String,
    pub entries: Vec<EntrySummary>,
}

/// Read the three inputs in archive order, firmware last.
pub fn read_entries(config: &BuildConfig) -> Result<Vec<Entry>> {
    EntryRole::ORDER
        .iter()
        .map(|&role| {
            let label = config.label(role)?;
            let path = config.inputs.path(role);
            debug!("Reading {} input from {}", role, path.display());
            Entry::read(role, label, path)
        })
        .collect()
}

/// Run the full pipeline.
pub fn run_build(config: &BuildConfig, runner: &dyn BuildRunner) -> Result<BuildReport> {
    if let Some(command) = &config.build {
        info!("Building filesystem image: {}", command.display());
        if let Err(e) = runner.run(command) {
            error!("Filesystem image build failed; no archive written");
            return Err(e);
        }
    }

    let entries = read_entries(config)?;

    let raw = assemble(&entries)?;
    debug_assert_eq!(raw.len(), archive_len(&entries));
    let raw_len = raw.len();
    info!(
        "Assembled {} entries into {} byte raw archive",
        entries.len(),
        raw_len
    );

    let bytes = encode(raw, config.encoding)?;
    if config.encoding == Encoding::Compressed {
        info!("Compressed archive: {} -> {} bytes", raw_len, bytes.len());
    }

    write_atomically(&config.output, &bytes)?;
    info!("Made OTA archive at {}", config.output.display());

    Ok(BuildReport {
        output: config.output.clone(),
        encoding: config.encoding,
        raw_len,
        written_len: bytes.len(),
        sha256: to_hex(&Sha256::digest(&bytes)),
        entries: entries.iter().map(EntrySummary::from).collect(),
    })
}
