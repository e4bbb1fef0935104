//! Fetching dependency sources.
//!
//! This module turns an archive-type dependency node into files on disk:
//! - Streaming HTTP download to a staging file (`http`)
//! - Archive validation and selective extraction (`archive`)
//! - The orchestration of both, with unconditional staging cleanup
//!
//! The git source type is recognized but unsupported; fetching a git
//! dependency fails explicitly and never silently succeeds.

mod archive;
mod http;

pub use archive::ExtractFilter;
pub use http::HttpDownloader;

use std::fs;
use std::path::{Path, PathBuf};

use tracing::info;

use crate::dependency::DependencyNode;
use crate::error::{CollectError, CollectResult};
use crate::source::SourceType;

/// Downloads a single file.
///
/// The seam between the fetch engine and the network, so engine-level tests
/// can run without one. `on_progress` receives
/// `(bytes_downloaded, total_bytes)` with `total_bytes` 0 when the server
/// does not announce a content length.
pub trait Downloader {
    /// Download `url` to `dest`, returning the number of bytes written.
    fn download(
        &self,
        url: &str,
        dest: &Path,
        on_progress: Option<&dyn Fn(u64, u64)>,
    ) -> CollectResult<u64>;
}

/// What one successful fetch produced.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FetchReport {
    /// Bytes downloaded to the staging file.
    pub bytes_downloaded: u64,

    /// Archive entries extracted into the destination.
    pub entries_extracted: usize,
}

/// Downloads, validates, and extracts one dependency's source archive.
pub struct FetchEngine<D> {
    downloader: D,
    staging_dir: PathBuf,
}

impl<D: Downloader> FetchEngine<D> {
    /// Create a fetch engine staging downloads under `staging_dir`.
    pub fn new(downloader: D, staging_dir: impl Into<PathBuf>) -> Self {
        Self {
            downloader,
            staging_dir: staging_dir.into(),
        }
    }

    /// Fetch `node`'s content into its destination path.
    ///
    /// # Errors
    ///
    /// `UnsupportedSource` for git dependencies, `DownloadFailed`/`Timeout`
    /// for network failures, and `BadArchive` when the downloaded file is
    /// not a well-formed archive. The staging file is removed on every exit
    /// path once the download has started.
    pub fn fetch(
        &self,
        node: &DependencyNode,
        on_download: Option<&dyn Fn(u64, u64)>,
        on_extract: Option<&dyn Fn(usize, usize)>,
    ) -> CollectResult<FetchReport> {
        match node.source_type {
            SourceType::Git => Err(CollectError::UnsupportedSource {
                name: node.name.clone(),
                source_type: node.source_type,
            }),
            SourceType::Archive => self.fetch_archive(node, on_download, on_extract),
        }
    }

    fn fetch_archive(
        &self,
        node: &DependencyNode,
        on_download: Option<&dyn Fn(u64, u64)>,
        on_extract: Option<&dyn Fn(usize, usize)>,
    ) -> CollectResult<FetchReport> {
        let url = node.source_url.as_deref().ok_or_else(|| {
            CollectError::DownloadFailed {
                url: String::new(),
                reason: format!("dependency '{}' declares no source URL", node.name),
            }
        })?;

        fs::create_dir_all(&self.staging_dir).map_err(|e| CollectError::CreateDirFailed {
            path: self.staging_dir.clone(),
            source: e,
        })?;
        let staging = self.staging_dir.join(format!("{}.tar.gz", node.name));

        info!(dependency = %node.name, url, "Downloading archive");
        let bytes_downloaded = match self.downloader.download(url, &staging, on_download) {
            Ok(bytes) => bytes,
            Err(e) => {
                fs::remove_file(&staging).ok();
                return Err(e);
            }
        };

        let extracted = self.extract_stage(&staging, node, on_extract);
        // The staging file goes away whether or not extraction succeeded.
        fs::remove_file(&staging).ok();

        let entries_extracted = extracted?;
        Ok(FetchReport {
            bytes_downloaded,
            entries_extracted,
        })
    }

    fn extract_stage(
        &self,
        staging: &Path,
        node: &DependencyNode,
        on_extract: Option<&dyn Fn(usize, usize)>,
    ) -> CollectResult<usize> {
        let total_entries = archive::validate_archive(staging)?;
        let filter = ExtractFilter::from_args(&node.args);

        info!(dependency = %node.name, entries = total_entries, "Extracting archive");
        archive::extract_archive(
            staging,
            &node.destination_path,
            filter.as_ref(),
            total_entries,
            on_extract,
        )
    }
}
