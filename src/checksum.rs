//! Streaming BLAKE3 content checksums.
//!
//! Files are read in fixed 16 KiB chunks, so memory use does not depend on
//! file size. Only equality of digests matters to callers; the algorithm is
//! not part of any stored format.

use std::fs::File;
use std::io::{self, Read};
use std::path::Path;

/// Read size for hashing.
pub const CHUNK_SIZE: usize = 16 * 1024;

/// Content digest of a file.
pub type Digest = blake3::Hash;

/// Computes the digest of the file at `path`.
///
/// Zero-length files yield the digest of empty input.
pub fn checksum(path: &Path) -> io::Result<Digest> {
    let mut file = File::open(path)?;
    let mut hasher = blake3::Hasher::new();
    let mut buffer = [0u8; CHUNK_SIZE];

    loop {
        let bytes_read = match file.read(&mut buffer) {
            Ok(0) => break,
            Ok(n) => n,
            Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
            Err(e) => return Err(e),
        };
        hasher.update(&buffer[..bytes_read]);
    }

    Ok(hasher.finalize())
}

/// Returns whether both files have the same content digest.
pub fn verify(path_a: &Path, path_b: &Path) -> io::Result<bool> {
    let a = checksum(path_a)?;
    let b = checksum(path_b)?;
    log::trace!(
        "checksum {} = {}, {} = {}",
        path_a.display(),
        a.to_hex(),
        path_b.display(),
        b.to_hex()
    );
    Ok(a == b)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    fn write(dir: &TempDir, name: &str, content: &[u8]) -> std::path::PathBuf {
        let path = dir.path().join(name);
        fs::write(&path, content).expect("Failed to write test file");
        path
    }

    #[test]
    fn test_checksum_equality() {
        let temp_dir = TempDir::new().unwrap();
        let file_a = write(&temp_dir, "file_a", b"a");
        let file_b = write(&temp_dir, "file_b", b"b");
        let file_c = write(&temp_dir, "file_c", b"a");

        assert_eq!(checksum(&file_a).unwrap(), checksum(&file_a).unwrap());
        assert_eq!(checksum(&file_a).unwrap(), checksum(&file_c).unwrap());
        assert_ne!(checksum(&file_a).unwrap(), checksum(&file_b).unwrap());
    }

    #[test]
    fn test_verify() {
        let temp_dir = TempDir::new().unwrap();
        let file_a = write(&temp_dir, "file_a", b"a");
        let file_b = write(&temp_dir, "file_b", b"b");
        let file_c = write(&temp_dir, "file_c", b"a");

        assert!(verify(&file_a, &file_a).unwrap());
        assert!(verify(&file_a, &file_c).unwrap());
        assert!(!verify(&file_a, &file_b).unwrap());
    }

    #[test]
    fn test_empty_file_has_defined_digest() {
        let temp_dir = TempDir::new().unwrap();
        let empty = write(&temp_dir, "empty", b"");

        assert_eq!(checksum(&empty).unwrap(), blake3::hash(b""));
    }

    #[test]
    fn test_multi_chunk_file_matches_one_shot_hash() {
        let temp_dir = TempDir::new().unwrap();
        let content: Vec<u8> = (0..CHUNK_SIZE * 3 + 17).map(|i| (i % 251) as u8).collect();
        let path = write(&temp_dir, "big.bin", &content);

        assert_eq!(checksum(&path).unwrap(), blake3::hash(&content));
    }

    #[test]
    fn test_single_byte_difference_detected() {
        let temp_dir = TempDir::new().unwrap();
        let mut content = vec![7u8; CHUNK_SIZE * 2];
        let original = write(&temp_dir, "original", &content);
        content[CHUNK_SIZE + 1] ^= 0xFF;
        let altered = write(&temp_dir, "altered", &content);

        assert!(!verify(&original, &altered).unwrap());
    }

    #[test]
    fn test_missing_file_is_error() {
        let temp_dir = TempDir::new().unwrap();
        assert!(checksum(&temp_dir.path().join("missing")).is_err());
    }
}
