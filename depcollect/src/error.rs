//! Error types for the dependency collector.

use std::io;
use std::path::PathBuf;

use thiserror::Error;

use crate::source::SourceType;

/// Result type for collector operations.
pub type CollectResult<T> = Result<T, CollectError>;

/// A structural validation failure for a manifest value.
///
/// Carries the JSON path of the offending value and the constraint it
/// violated, so per-entry skips can report exactly why an entry was
/// rejected.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("schema violation at `{path}`: {constraint}")]
pub struct SchemaError {
    /// JSON path of the violating value (e.g. `dependencies.zlib.url`).
    pub path: String,

    /// The constraint that was violated.
    pub constraint: String,
}

impl SchemaError {
    /// Create a new schema error for `path`.
    pub fn new(path: impl Into<String>, constraint: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            constraint: constraint.into(),
        }
    }
}

/// Errors that can occur while resolving and materializing dependencies.
#[derive(Debug, Error)]
pub enum CollectError {
    /// No manifest file at the expected path.
    #[error("no manifest file found at {path}")]
    ManifestMissing { path: PathBuf },

    /// The manifest file exists but is not valid JSON.
    #[error("failed to parse manifest {path}: {reason}")]
    ManifestParse { path: PathBuf, reason: String },

    /// A manifest value failed structural validation.
    #[error(transparent)]
    Schema(#[from] SchemaError),

    /// The dependency declares a source type the fetch engine does not support.
    #[error("unsupported source type '{source_type}' for dependency '{name}'")]
    UnsupportedSource {
        name: String,
        source_type: SourceType,
    },

    /// The HTTP download failed.
    #[error("failed to download {url}: {reason}")]
    DownloadFailed { url: String, reason: String },

    /// The HTTP request timed out.
    #[error("request to {url} timed out after {timeout_secs}s")]
    Timeout { url: String, timeout_secs: u64 },

    /// The downloaded file is not a well-formed archive.
    #[error("{path} is not a valid archive: {reason}")]
    BadArchive { path: PathBuf, reason: String },

    /// Failed to read a file or directory.
    #[error("failed to read {path}: {source}")]
    ReadFailed { path: PathBuf, source: io::Error },

    /// Failed to write a file or directory.
    #[error("failed to write {path}: {source}")]
    WriteFailed { path: PathBuf, source: io::Error },

    /// Failed to create a directory.
    #[error("failed to create directory {path}: {source}")]
    CreateDirFailed { path: PathBuf, source: io::Error },

    /// Failed to remove a file or directory.
    #[error("failed to remove {path}: {source}")]
    RemoveFailed { path: PathBuf, source: io::Error },
}
