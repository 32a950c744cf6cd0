//! # ota-archive - Sector-Aligned OTA Firmware Archives
//!
//! Bundles a font resource, a filesystem image and an application firmware
//! image into one file that a device can receive over the air and flash
//! sector by sector.
//!
//! ## Format
//!
//! ```text
//! sector 0            "MZ5 firmware archive 1.0\r\n\n\x1a    " + zero fill
//! per entry:
//!   1 sector          "-file boundary--" | label[8] | orig_len u32 | padded_len u32 | md5[16]
//!   padded_len bytes  content + zero fill
//! ```
//!
//! All integers are little-endian. The compressed encoding wraps the whole
//! raw stream as `"MZ5 compressed archive\r\n\n\x1a" | len u32 | zlib`.
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use ota_archive::{run_build, BuildConfig, CommandRunner, Result};
//! use std::path::Path;
//!
//! # fn main() -> Result<()> {
//! let config = BuildConfig::platformio(Path::new("."), "esp32dev");
//! let report = run_build(&config, &CommandRunner)?;
//! println!("wrote {} bytes to {}", report.written_len, report.output.display());
//! # Ok(())
//! # }
//! ```
//!
//! ## Assembling in memory
//!
//! ```rust
//! use ota_archive::{assemble, Entry, EntryRole, Label, Result};
//!
//! # fn main() -> Result<()> {
//! let entries = vec![
//!     Entry::from_bytes(EntryRole::Font, Label::new("font")?, &[1u8; 100])?,
//!     Entry::from_bytes(EntryRole::Firmware, Label::new("app")?, &[2u8; 5000])?,
//! ];
//! let raw = assemble(&entries)?;
//! assert_eq!(raw.len(), 4096 + (4096 + 4096) + (4096 + 8192));
//! # Ok(())
//! # }
//! ```

pub mod assembler;
pub mod checksum;
pub mod compression;
pub mod config;
pub mod entry;
pub mod error;
pub mod header;
pub mod inspect;
pub mod io;
pub mod padding;
pub mod pipeline;

pub use assembler::{archive_len, assemble, write_archive};
pub use compression::{Encoding, COMPRESSED_MAGIC};
pub use config::{BuildCommand, BuildConfig, InputPaths};
pub use entry::{Entry, EntryRole, Label};
pub use error::{ArchiveError, Result};
pub use header::{ARCHIVE_MAGIC, BOUNDARY_MARKER, SECTOR_SIZE};
pub use inspect::{read_archive, ArchiveContents};
pub use pipeline::{run_build, BuildReport, BuildRunner, CommandRunner, NoopRunner};
