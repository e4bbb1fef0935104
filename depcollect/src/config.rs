//! Configuration for the dependency resolver.

use std::path::PathBuf;
use std::time::Duration;

/// Default timeout for HTTP requests in seconds.
pub const DEFAULT_HTTP_TIMEOUT_SECS: u64 = 300; // 5 minutes

/// Default timeout for observing a recursive deletion on the filesystem.
///
/// Some filesystems report deletion asynchronously; the resolver polls until
/// the removed directory is no longer visible or this timeout elapses.
pub const DEFAULT_REMOVAL_TIMEOUT_SECS: u64 = 10;

/// Default interval between deletion-observation polls.
pub const DEFAULT_REMOVAL_POLL_MILLIS: u64 = 100;

/// Configuration for the dependency resolver.
#[derive(Debug, Clone)]
pub struct ResolverConfig {
    /// Name of the per-directory manifest file.
    pub manifest_file_name: String,

    /// Directory name dependencies are materialized under when the manifest
    /// does not override it via `container_directory_name`.
    pub container_dir_name: String,

    /// Directory for temporary archive downloads.
    pub staging_dir: PathBuf,

    /// HTTP request timeout.
    pub http_timeout: Duration,

    /// How long to wait for a recursive deletion to become observable.
    pub removal_timeout: Duration,

    /// Interval between deletion-observation polls.
    pub removal_poll_interval: Duration,
}

impl Default for ResolverConfig {
    fn default() -> Self {
        Self {
            manifest_file_name: crate::manifest::MANIFEST_FILE_NAME.to_string(),
            container_dir_name: crate::manifest::DEFAULT_CONTAINER_DIR_NAME.to_string(),
            staging_dir: std::env::temp_dir().join("depcollect"),
            http_timeout: Duration::from_secs(DEFAULT_HTTP_TIMEOUT_SECS),
            removal_timeout: Duration::from_secs(DEFAULT_REMOVAL_TIMEOUT_SECS),
            removal_poll_interval: Duration::from_millis(DEFAULT_REMOVAL_POLL_MILLIS),
        }
    }
}

impl ResolverConfig {
    /// Override the staging directory (builder pattern).
    pub fn with_staging_dir(mut self, staging_dir: impl Into<PathBuf>) -> Self {
        self.staging_dir = staging_dir.into();
        self
    }

    /// Override the HTTP timeout (builder pattern).
    pub fn with_http_timeout(mut self, timeout: Duration) -> Self {
        self.http_timeout = timeout;
        self
    }
}
