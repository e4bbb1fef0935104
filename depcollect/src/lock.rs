//! Persisted lock records marking materialized dependencies.
//!
//! A lock record stores the fingerprint of the declaration a dependency was
//! last materialized from. A present, matching record means the dependency
//! is already satisfied; anything else (absent, mismatched, unreadable,
//! corrupt) means it must be refetched. The record is a staleness marker,
//! not a mutual-exclusion primitive.

use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::{CollectError, CollectResult};

/// Name of the per-dependency lock file.
pub const LOCK_FILE_NAME: &str = "dependency.lock";

/// The persisted lock record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LockRecord {
    /// Fingerprint of the declaration the dependency was materialized from.
    pub dependency_hash: String,
}

impl LockRecord {
    /// Create a record for `fingerprint`.
    pub fn new(fingerprint: impl Into<String>) -> Self {
        Self {
            dependency_hash: fingerprint.into(),
        }
    }

    /// Read the lock record under `destination`.
    ///
    /// Returns `None` when the file is missing, unreadable, or corrupt; all
    /// three mean the dependency is stale.
    pub fn read(destination: &Path) -> Option<LockRecord> {
        let path = destination.join(LOCK_FILE_NAME);
        let text = fs::read_to_string(&path).ok()?;
        match serde_json::from_str(&text) {
            Ok(record) => Some(record),
            Err(e) => {
                debug!(path = %path.display(), error = %e, "Ignoring corrupt lock file");
                None
            }
        }
    }

    /// Write the lock record under `destination`.
    pub fn write(&self, destination: &Path) -> CollectResult<()> {
        let path = destination.join(LOCK_FILE_NAME);
        let text = serde_json::to_string(self).map_err(|e| CollectError::WriteFailed {
            path: path.clone(),
            source: std::io::Error::new(std::io::ErrorKind::InvalidData, e),
        })?;
        fs::write(&path, text).map_err(|e| CollectError::WriteFailed { path, source: e })
    }

    /// Remove any lock file under `destination`. Missing files are fine.
    pub fn remove(destination: &Path) {
        fs::remove_file(destination.join(LOCK_FILE_NAME)).ok();
    }
}

/// True iff `destination` exists as a directory and its lock record matches
/// `fingerprint`.
pub fn is_satisfied(destination: &Path, fingerprint: &str) -> bool {
    destination.is_dir()
        && LockRecord::read(destination)
            .map(|record| record.dependency_hash == fingerprint)
            .unwrap_or(false)
}

#[cfg(test)]
mod tests {
    use tempfile::TempDir;

    use super::*;

    #[test]
    fn test_read_missing_lock() {
        let temp = TempDir::new().unwrap();
        assert!(LockRecord::read(temp.path()).is_none());
    }

    #[test]
    fn test_write_read_round_trip() {
        let temp = TempDir::new().unwrap();
        let record = LockRecord::new("0123456789abcdef0123456789abcdef");
        record.write(temp.path()).unwrap();

        assert_eq!(LockRecord::read(temp.path()), Some(record));
    }

    #[test]
    fn test_read_corrupt_lock() {
        let temp = TempDir::new().unwrap();
        fs::write(temp.path().join(LOCK_FILE_NAME), "not json").unwrap();

        assert!(LockRecord::read(temp.path()).is_none());
    }

    #[test]
    fn test_lock_file_format() {
        let temp = TempDir::new().unwrap();
        LockRecord::new("aa").write(temp.path()).unwrap();

        let text = fs::read_to_string(temp.path().join(LOCK_FILE_NAME)).unwrap();
        assert_eq!(text, r#"{"dependency_hash":"aa"}"#);
    }

    #[test]
    fn test_is_satisfied() {
        let temp = TempDir::new().unwrap();
        let fingerprint = "0123456789abcdef0123456789abcdef";

        // No lock yet.
        assert!(!is_satisfied(temp.path(), fingerprint));

        LockRecord::new(fingerprint).write(temp.path()).unwrap();
        assert!(is_satisfied(temp.path(), fingerprint));

        // Mismatched fingerprint.
        assert!(!is_satisfied(temp.path(), "ffffffffffffffffffffffffffffffff"));
    }

    #[test]
    fn test_is_satisfied_requires_directory() {
        let temp = TempDir::new().unwrap();
        let missing = temp.path().join("gone");
        assert!(!is_satisfied(&missing, "aa"));
    }

    #[test]
    fn test_remove_is_idempotent() {
        let temp = TempDir::new().unwrap();
        LockRecord::new("aa").write(temp.path()).unwrap();

        LockRecord::remove(temp.path());
        assert!(LockRecord::read(temp.path()).is_none());

        // Removing again is a no-op.
        LockRecord::remove(temp.path());
    }
}
