//! Content hashing using blake3
//!
//! Every digest the manifest stores (fast hashes, file and plugin content
//! hashes) is a lowercase blake3 hex string produced here.

use std::fs::File;
use std::io::{BufReader, Result as IoResult};
use std::path::Path;

/// Hash content using blake3
///
/// # Examples
///
/// ```
/// use hooksmith_engine::hash::hash_content;
///
/// let hash = hash_content(b"Hello, world!");
/// assert_eq!(hash.len(), 32);
/// ```
#[must_use]
pub fn hash_content(content: &[u8]) -> [u8; 32] {
    *blake3::hash(content).as_bytes()
}

/// Hash a file with buffered, streaming reads
///
/// # Errors
///
/// Returns an error if the file cannot be opened or read.
pub fn hash_file(path: &Path) -> IoResult<[u8; 32]> {
    let file = File::open(path)?;
    let mut reader = BufReader::new(file);
    let mut hasher = blake3::Hasher::new();
    std::io::copy(&mut reader, &mut hasher)?;
    Ok(*hasher.finalize().as_bytes())
}

/// Hash content and return the lowercase hex digest
#[must_use]
pub fn digest_hex(content: &[u8]) -> String {
    blake3::hash(content).to_hex().to_string()
}

/// Encode a raw digest as lowercase hex
#[must_use]
pub fn to_hex(digest: &[u8; 32]) -> String {
    blake3::Hash::from_bytes(*digest).to_hex().to_string()
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used, clippy::panic)]
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    #[test]
    fn test_hash_content_deterministic() {
        assert_eq!(hash_content(b"same"), hash_content(b"same"));
        assert_ne!(hash_content(b"one"), hash_content(b"two"));
    }

    #[test]
    fn test_hash_file_matches_content_hash() {
        let mut file = NamedTempFile::new().unwrap();
        file.write_all(b"let-env FOO = 1").unwrap();
        file.flush().unwrap();

        let from_file = hash_file(file.path()).unwrap();
        assert_eq!(from_file, hash_content(b"let-env FOO = 1"));
    }

    #[test]
    fn test_hash_file_missing() {
        assert!(hash_file(Path::new("/nonexistent/hooksmith/file")).is_err());
    }

    #[test]
    fn test_hex_encoding() {
        let hex = digest_hex(b"abc");
        assert_eq!(hex.len(), 64);
        assert!(hex.chars().all(|c| c.is_ascii_hexdigit() && !c.is_ascii_uppercase()));
        assert_eq!(hex, to_hex(&hash_content(b"abc")));
    }
}
