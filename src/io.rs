//! Output publishing
//!
//! The archive is written to a temporary file in the destination directory
//! and renamed over the target only once it is complete and synced, so a
//! failed build never leaves a truncated archive at the output path.

use crate::error::{ArchiveError, Result};
use std::fs;
use std::io::Write;
use std::path::Path;
use tempfile::{Builder, NamedTempFile};
use tracing::debug;

/// Mode of a freshly published archive, before umask.
#[cfg(unix)]
const DEFAULT_MODE: u32 = 0o644;

/// Atomically replace `path` with `bytes`.
pub fn write_atomically(path: &Path, bytes: &[u8]) -> Result<()> {
    let output_err = |source| ArchiveError::OutputWrite {
        path: path.to_path_buf(),
        source,
    };

    let dir = match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent,
        _ => Path::new("."),
    };
    fs::create_dir_all(dir).map_err(output_err)?;

    // an existing target keeps its permissions across the rename
    let existing = fs::metadata(path)
        .ok()
        .filter(|meta| meta.is_file())
        .map(|meta| meta.permissions());

    let mut temp = staging_file(dir).map_err(output_err)?;
    if let Some(permissions) = existing {
        temp.as_file()
            .set_permissions(permissions)
            .map_err(output_err)?;
    }
    debug!(
        "Writing {} bytes to staging file {:?}",
        bytes.len(),
        temp.path()
    );

    temp.write_all(bytes).map_err(output_err)?;
    temp.as_file().sync_all().map_err(output_err)?;
    temp.persist(path).map_err(|e| output_err(e.error))?;

    Ok(())
}

fn staging_file(dir: &Path) -> std::io::Result<NamedTempFile> {
    let mut builder = Builder::new();
    builder.prefix(".ota-archive");
    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        builder.permissions(fs::Permissions::from_mode(DEFAULT_MODE));
    }
    builder.tempfile_in(dir)
}
