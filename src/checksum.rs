//! Entry content digest
//!
//! MD5 over the padded content block, which is what the device recomputes
//! sector by sector while flashing. Integrity only, not authentication.

use md5::{Digest, Md5};

/// Digest length in bytes.
pub const CHECKSUM_LEN: usize = 16;

/// MD5 digest of an already-padded content block.
pub fn checksum(padded: &[u8]) -> [u8; CHECKSUM_LEN] {
    let mut hasher = Md5::new();
    hasher.update(padded);
    hasher.finalize().into()
}

/// Lowercase hex rendering, as printed by the device updater.
pub fn to_hex(bytes: &[u8]) -> String {
    bytes.iter().map(|b| format!("{:02x}", b)).collect()
}
