//! Client fingerprint derivation (§4.G).
//!
//! The fingerprint keys the location cache (component B): a client that
//! restarts mid-upload recognizes "this is the same file I was uploading" by
//! absolute path plus declared size, not by content. A content-hash
//! fingerprint would catch renames but forces a full extra read of the file
//! before an upload can even start; path+size matches the upstream client's
//! definition and keeps startup cheap.

use std::path::Path;

use sha2::{Digest, Sha256};

/// Deterministic key for `path` of length `declared_size`. Not a content
/// hash: two different files at the same path and size collide, same as the
/// scheme this client is modeled on.
pub fn fingerprint(path: &Path, declared_size: u64) -> String {
    let mut hasher = Sha256::new();
    hasher.update(path.to_string_lossy().as_bytes());
    hasher.update(b"\0");
    hasher.update(declared_size.to_le_bytes());
    hex::encode(hasher.finalize())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    #[test]
    fn same_path_and_size_produce_same_fingerprint() {
        let p = PathBuf::from("/tmp/example.bin");
        assert_eq!(fingerprint(&p, 100), fingerprint(&p, 100));
    }

    #[test]
    fn different_size_changes_fingerprint() {
        let p = PathBuf::from("/tmp/example.bin");
        assert_ne!(fingerprint(&p, 100), fingerprint(&p, 200));
    }

    #[test]
    fn different_path_changes_fingerprint() {
        assert_ne!(
            fingerprint(&PathBuf::from("/tmp/a.bin"), 100),
            fingerprint(&PathBuf::from("/tmp/b.bin"), 100)
        );
    }
}
