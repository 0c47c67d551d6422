//! Content hash calculation.
//!
//! Every file is hashed with the same algorithm (MD5, rendered as lowercase
//! hex), matching the format of the malicious-hash feed.

use crate::core::error::{Error, Result};
use md5::{Digest, Md5};
use std::fs::File;
use std::io::{BufReader, Read};
use std::path::Path;

/// Buffer size for reading files (64KB).
const BUFFER_SIZE: usize = 64 * 1024;

/// Hash calculator for files.
pub struct HashCalculator;

impl HashCalculator {
    /// Calculate the MD5 hash of a file.
    pub fn md5_file(path: &Path) -> Result<String> {
        let file = File::open(path).map_err(|e| Error::file_read(path, e))?;
        let mut reader = BufReader::with_capacity(BUFFER_SIZE, file);
        let mut hasher = Md5::new();
        let mut buffer = vec![0u8; BUFFER_SIZE];

        loop {
            let bytes_read = reader
                .read(&mut buffer)
                .map_err(|e| Error::file_read(path, e))?;
            if bytes_read == 0 {
                break;
            }
            hasher.update(&buffer[..bytes_read]);
        }

        Ok(hex::encode(hasher.finalize()))
    }

    /// Calculate the MD5 hash of bytes.
    pub fn md5_bytes(data: &[u8]) -> String {
        let mut hasher = Md5::new();
        hasher.update(data);
        hex::encode(hasher.finalize())
    }

    /// Normalize an externally supplied hash for comparison with computed ones.
    pub fn normalize(hash: &str) -> String {
        hash.trim().to_ascii_lowercase()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    #[test]
    fn test_md5_bytes() {
        // Test vector: MD5("hello")
        let hash = HashCalculator::md5_bytes(b"hello");
        assert_eq!(hash, "5d41402abc4b2a76b9719d911017c592");
    }

    #[test]
    fn test_md5_file_matches_bytes() {
        let mut file = NamedTempFile::new().unwrap();
        file.write_all(b"hello").unwrap();

        let hash = HashCalculator::md5_file(file.path()).unwrap();
        assert_eq!(hash, HashCalculator::md5_bytes(b"hello"));
    }

    #[test]
    fn test_md5_missing_file() {
        let err = HashCalculator::md5_file(Path::new("/nonexistent/ioc-sweep/file")).unwrap_err();
        assert!(matches!(err, Error::FileRead { .. }));
    }

    #[test]
    fn test_normalize() {
        assert_eq!(
            HashCalculator::normalize(" 5D41402ABC4B2A76B9719D911017C592\r"),
            "5d41402abc4b2a76b9719d911017c592"
        );
    }
}
