//! Content fingerprints for source documents
//!
//! A fingerprint is the BLAKE3 digest of a file's bytes, read in fixed-size
//! blocks. An absent or unreadable file fingerprints as empty input, which
//! never matches a stored fingerprint of a real document.

use std::fs::File;
use std::io::{ErrorKind, Read};
use std::path::Path;

/// Read block size
const BLOCK_SIZE: usize = 4096;

/// Digest of empty input
pub fn empty_fingerprint() -> String {
    blake3::hash(b"").to_hex().to_string()
}

/// Fingerprint the file at `path` as 64 lowercase hex characters
pub fn fingerprint(path: &Path) -> String {
    let mut file = match File::open(path) {
        Ok(file) => file,
        Err(e) => {
            tracing::debug!("Fingerprinting absent source {}: {}", path.display(), e);
            return empty_fingerprint();
        }
    };

    let mut hasher = blake3::Hasher::new();
    let mut block = [0u8; BLOCK_SIZE];
    loop {
        match file.read(&mut block) {
            Ok(0) => break,
            Ok(n) => {
                hasher.update(&block[..n]);
            }
            Err(e) if e.kind() == ErrorKind::Interrupted => continue,
            Err(e) => {
                tracing::warn!("Failed to read {} while fingerprinting: {}", path.display(), e);
                return empty_fingerprint();
            }
        }
    }

    hasher.finalize().to_hex().to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_deterministic() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("syllabus.txt");
        std::fs::write(&path, "Quadratic equations by factorization").unwrap();

        let first = fingerprint(&path);
        let second = fingerprint(&path);
        assert_eq!(first, second);
        assert_eq!(first.len(), 64);
    }

    #[test]
    fn test_single_byte_change() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("syllabus.txt");
        std::fs::write(&path, "Quadratic equations").unwrap();
        let before = fingerprint(&path);

        std::fs::write(&path, "Quadratic equationS").unwrap();
        let after = fingerprint(&path);
        assert_ne!(before, after);
    }

    #[test]
    fn test_spans_multiple_blocks() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("large.txt");
        let data: Vec<u8> = (0..(BLOCK_SIZE * 3 + 17)).map(|i| (i % 251) as u8).collect();
        std::fs::write(&path, &data).unwrap();

        assert_eq!(fingerprint(&path), blake3::hash(&data).to_hex().to_string());
    }

    #[test]
    fn test_missing_file_is_empty_digest() {
        let temp = TempDir::new().unwrap();
        let missing = temp.path().join("missing.pdf");
        assert_eq!(fingerprint(&missing), empty_fingerprint());
    }
}
