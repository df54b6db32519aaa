//! File fingerprints
//!
//! A tracked file has two fingerprints: a cheap stat signature
//! (`inode-size-mtime`) and a content hash. The content hash is only
//! recomputed when the stat signature differs from the recorded one, so an
//! untouched file costs a single `stat` per pass.

use crate::hash;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::time::UNIX_EPOCH;
use subtle::ConstantTimeEq;

/// Stat signature recorded for a path that does not exist
pub const MISSING: &str = "missing";

/// Computes file content digests
///
/// Split out as a trait so callers can observe when content hashing
/// actually happens.
pub trait ContentHasher {
    /// Digest a file's content
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read.
    fn hash_file(&self, path: &Path) -> io::Result<[u8; 32]>;
}

/// Default hasher backed by blake3
#[derive(Debug, Clone, Copy, Default)]
pub struct Blake3Hasher;

impl ContentHasher for Blake3Hasher {
    fn hash_file(&self, path: &Path) -> io::Result<[u8; 32]> {
        hash::hash_file(path)
    }
}

impl<H: ContentHasher + ?Sized> ContentHasher for &H {
    fn hash_file(&self, path: &Path) -> io::Result<[u8; 32]> {
        (**self).hash_file(path)
    }
}

/// Stat signature of one path
///
/// Returns [`MISSING`] when the path cannot be stat'ed.
#[must_use]
pub fn stat_signature(path: &Path) -> String {
    let Ok(metadata) = fs::metadata(path) else {
        return MISSING.to_string();
    };

    let mtime = metadata
        .modified()
        .ok()
        .and_then(|t| t.duration_since(UNIX_EPOCH).ok())
        .map_or(0, |d| d.as_nanos());

    format!("{}-{}-{}", inode(&metadata), metadata.len(), mtime)
}

#[cfg(unix)]
fn inode(metadata: &fs::Metadata) -> u64 {
    use std::os::unix::fs::MetadataExt;
    metadata.ino()
}

#[cfg(not(unix))]
fn inode(_metadata: &fs::Metadata) -> u64 {
    0
}

/// Combined stat signature of several paths, in order
#[must_use]
pub fn stat_signatures(paths: &[PathBuf]) -> String {
    paths
        .iter()
        .map(|p| stat_signature(p))
        .collect::<Vec<_>>()
        .join(";")
}

/// Combined content hash of several paths, in order
///
/// Each path contributes its own bytes and its content digest, so renaming a
/// tracked file changes the result. Missing or unreadable files contribute a
/// marker instead of a digest.
pub fn content_hash<H: ContentHasher>(hasher: &H, paths: &[PathBuf]) -> String {
    let mut combined = blake3::Hasher::new();
    for path in paths {
        combined.update(path.as_os_str().as_encoded_bytes());
        combined.update(&[0]);
        match hasher.hash_file(path) {
            Ok(digest) => {
                combined.update(&digest);
            }
            Err(e) if e.kind() == io::ErrorKind::NotFound => {
                combined.update(MISSING.as_bytes());
            }
            Err(e) => {
                tracing::warn!(path = %path.display(), error = %e, "Failed to hash tracked file");
                combined.update(b"unreadable");
            }
        }
        combined.update(&[0]);
    }
    combined.finalize().to_hex().to_string()
}

/// Compare two hex digests in constant time
#[must_use]
pub fn digests_match(a: &str, b: &str) -> bool {
    a.as_bytes().ct_eq(b.as_bytes()).into()
}

/// Outcome of checking a set of files against recorded fingerprints
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileCheck {
    /// Current stat signature
    pub stat: String,
    /// Current content hash (reused from the record when the stat is unchanged)
    pub hash: String,
    /// The stat signature differs from the record
    pub stat_changed: bool,
    /// The content hash differs from the record
    pub content_changed: bool,
}

impl FileCheck {
    /// Only metadata moved; the record needs updating but nothing is stale
    #[must_use]
    pub fn is_refresh_only(&self) -> bool {
        self.stat_changed && !self.content_changed
    }
}

/// Check files against the recorded stat signature and content hash
///
/// The content hash is computed only when the stat signature changed or no
/// hash was recorded.
pub fn check_files<H: ContentHasher>(
    hasher: &H,
    paths: &[PathBuf],
    recorded_stat: Option<&str>,
    recorded_hash: Option<&str>,
) -> FileCheck {
    let stat = stat_signatures(paths);

    if let (Some(prev_stat), Some(prev_hash)) = (recorded_stat, recorded_hash)
        && prev_stat == stat
    {
        return FileCheck {
            stat,
            hash: prev_hash.to_string(),
            stat_changed: false,
            content_changed: false,
        };
    }

    let hash = content_hash(hasher, paths);
    let content_changed = recorded_hash.is_none_or(|prev| !digests_match(prev, &hash));

    FileCheck {
        stat,
        hash,
        stat_changed: true,
        content_changed,
    }
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used, clippy::panic)]
    use super::*;
    use std::cell::Cell;
    use tempfile::TempDir;

    #[derive(Default)]
    struct CountingHasher {
        calls: Cell<usize>,
    }

    impl ContentHasher for CountingHasher {
        fn hash_file(&self, path: &Path) -> io::Result<[u8; 32]> {
            self.calls.set(self.calls.get() + 1);
            hash::hash_file(path)
        }
    }

    #[test]
    fn test_stat_signature_missing() {
        assert_eq!(stat_signature(Path::new("/nonexistent/hooksmith")), MISSING);
    }

    #[test]
    fn test_stat_signature_changes_with_size() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("config.toml");
        fs::write(&path, "a").unwrap();
        let before = stat_signature(&path);

        fs::write(&path, "abc").unwrap();
        assert_ne!(before, stat_signature(&path));
    }

    #[test]
    fn test_first_check_hashes_content() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("config.toml");
        fs::write(&path, "a").unwrap();

        let hasher = CountingHasher::default();
        let check = check_files(&hasher, &[path], None, None);

        assert_eq!(hasher.calls.get(), 1);
        assert!(check.stat_changed);
        assert!(check.content_changed);
    }

    #[test]
    fn test_unchanged_stat_skips_hashing() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("config.toml");
        fs::write(&path, "a").unwrap();
        let paths = vec![path];

        let first = check_files(&Blake3Hasher, &paths, None, None);

        let hasher = CountingHasher::default();
        let second = check_files(&hasher, &paths, Some(&first.stat), Some(&first.hash));

        assert_eq!(hasher.calls.get(), 0);
        assert!(!second.stat_changed);
        assert!(!second.content_changed);
        assert_eq!(second.hash, first.hash);
    }

    #[test]
    fn test_stat_change_with_same_content_is_refresh_only() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("config.toml");
        fs::write(&path, "a").unwrap();
        let paths = vec![path];

        let first = check_files(&Blake3Hasher, &paths, None, None);
        let check = check_files(&Blake3Hasher, &paths, Some("0-0-0"), Some(&first.hash));

        assert!(check.is_refresh_only());
        assert_eq!(check.hash, first.hash);
    }

    #[test]
    fn test_content_change_detected() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("config.toml");
        fs::write(&path, "a").unwrap();
        let paths = vec![path.clone()];

        let first = check_files(&Blake3Hasher, &paths, None, None);
        fs::write(&path, "changed").unwrap();
        let check = check_files(&Blake3Hasher, &paths, Some(&first.stat), Some(&first.hash));

        assert!(check.content_changed);
        assert!(!check.is_refresh_only());
    }

    #[test]
    fn test_missing_file_contributes_marker() {
        let paths = vec![PathBuf::from("/nonexistent/hooksmith/a")];
        let a = content_hash(&Blake3Hasher, &paths);
        let b = content_hash(&Blake3Hasher, &paths);
        assert_eq!(a, b);
        assert_eq!(stat_signatures(&paths), MISSING);
    }

    #[test]
    fn test_digests_match() {
        assert!(digests_match("abc", "abc"));
        assert!(!digests_match("abc", "abd"));
        assert!(!digests_match("abc", "abcd"));
    }
}
