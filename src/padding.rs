//! Sector padding
//!
//! Every block of the raw archive is zero-filled up to a whole number of
//! sectors. Empty input still occupies one full sector.

/// Length of `len` bytes after padding to `sector_size`.
///
/// Uses ceiling division, but never returns zero: an empty buffer pads to a
/// single sector.
///
/// # Panics
///
/// Panics if `sector_size` is zero. `pad` and `pad_in_place` inherit this.
pub fn padded_len(len: usize, sector_size: usize) -> usize {
    assert!(sector_size > 0, "sector size must be non-zero");
    let sectors = len.div_ceil(sector_size).max(1);
    sectors * sector_size
}

/// Copy `data` into a new buffer zero-filled up to the next sector boundary.
pub fn pad(data: &[u8], sector_size: usize) -> Vec<u8> {
    let mut padded = Vec::with_capacity(padded_len(data.len(), sector_size));
    padded.extend_from_slice(data);
    pad_in_place(&mut padded, sector_size);
    padded
}

/// Zero-fill `buf` in place up to the next sector boundary.
pub fn pad_in_place(buf: &mut Vec<u8>, sector_size: usize) {
    let target = padded_len(buf.len(), sector_size);
    buf.resize(target, 0);
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::header::SECTOR_SIZE;

    #[test]
    fn test_empty_input_pads_to_one_sector() {
        let padded = pad(b"", SECTOR_SIZE);
        assert_eq!(padded.len(), SECTOR_SIZE);
        assert!(padded.iter().all(|&b| b == 0));
    }

    #[test]
    fn test_padded_len_boundaries() {
        assert_eq!(padded_len(0, 4096), 4096);
        assert_eq!(padded_len(1, 4096), 4096);
        assert_eq!(padded_len(4095, 4096), 4096);
        assert_eq!(padded_len(4096, 4096), 4096);
        assert_eq!(padded_len(4097, 4096), 8192);
        assert_eq!(padded_len(10000, 4096), 12288);
    }

    #[test]
    fn test_pad_preserves_prefix() {
        let data = b"hello world";
        let padded = pad(data, 16);
        assert_eq!(padded.len(), 16);
        assert_eq!(&padded[..data.len()], data);
        assert_eq!(&padded[data.len()..], &[0u8; 5]);
    }

    #[test]
    fn test_exact_multiple_is_unchanged() {
        let data = vec![0xAB; 8192];
        let padded = pad(&data, 4096);
        assert_eq!(padded, data);
    }

    #[test]
    fn test_pad_in_place() {
        let mut buf = vec![1u8; 5000];
        pad_in_place(&mut buf, 4096);
        assert_eq!(buf.len(), 8192);
        assert_eq!(buf[4999], 1);
        assert_eq!(buf[5000], 0);
    }

    #[test]
    #[should_panic(expected = "sector size must be non-zero")]
    fn test_zero_sector_size_panics() {
        padded_len(10, 0);
    }
}
