//! HTTP download of source archives.

use std::fs::{self, File};
use std::io::{BufWriter, Read, Write};
use std::path::Path;
use std::time::Duration;

use reqwest::blocking::Client;

use crate::config::DEFAULT_HTTP_TIMEOUT_SECS;
use crate::error::{CollectError, CollectResult};

use super::Downloader;

/// Buffer size for streaming downloads (64KB).
const BUFFER_SIZE: usize = 64 * 1024;

/// HTTP-based archive downloader.
///
/// Streams the response body to the destination file. When the server
/// announces a content length the write is chunked and progress is reported
/// byte-granularly; otherwise the whole body is buffered and written in one
/// piece.
#[derive(Debug)]
pub struct HttpDownloader {
    client: Client,
    timeout: Duration,
}

impl Default for HttpDownloader {
    fn default() -> Self {
        Self::new()
    }
}

impl HttpDownloader {
    /// Create a new HTTP downloader with the default timeout.
    pub fn new() -> Self {
        Self::with_timeout(Duration::from_secs(DEFAULT_HTTP_TIMEOUT_SECS))
    }

    /// Create a new HTTP downloader with a custom timeout.
    pub fn with_timeout(timeout: Duration) -> Self {
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .expect("Failed to create HTTP client");

        Self { client, timeout }
    }
}

impl Downloader for HttpDownloader {
    fn download(
        &self,
        url: &str,
        dest: &Path,
        on_progress: Option<&dyn Fn(u64, u64)>,
    ) -> CollectResult<u64> {
        let mut response = self.client.get(url).send().map_err(|e| {
            if e.is_timeout() {
                CollectError::Timeout {
                    url: url.to_string(),
                    timeout_secs: self.timeout.as_secs(),
                }
            } else {
                CollectError::DownloadFailed {
                    url: url.to_string(),
                    reason: e.to_string(),
                }
            }
        })?;

        let status = response.status();
        if !status.is_success() {
            return Err(CollectError::DownloadFailed {
                url: url.to_string(),
                reason: format!("GET request failed with status {}", status),
            });
        }

        if let Some(parent) = dest.parent() {
            fs::create_dir_all(parent).map_err(|e| CollectError::CreateDirFailed {
                path: parent.to_path_buf(),
                source: e,
            })?;
        }
        let file = File::create(dest).map_err(|e| CollectError::WriteFailed {
            path: dest.to_path_buf(),
            source: e,
        })?;
        let mut writer = BufWriter::new(file);

        let total_size = response.content_length().unwrap_or(0);
        let downloaded = if total_size > 0 {
            stream_body(&mut response, &mut writer, url, dest, total_size, on_progress)?
        } else {
            // Unknown length: buffer the whole body.
            let mut body = Vec::new();
            response
                .read_to_end(&mut body)
                .map_err(|e| CollectError::DownloadFailed {
                    url: url.to_string(),
                    reason: format!("read error: {}", e),
                })?;
            writer
                .write_all(&body)
                .map_err(|e| CollectError::WriteFailed {
                    path: dest.to_path_buf(),
                    source: e,
                })?;
            if let Some(cb) = on_progress {
                cb(body.len() as u64, 0);
            }
            body.len() as u64
        };

        writer.flush().map_err(|e| CollectError::WriteFailed {
            path: dest.to_path_buf(),
            source: e,
        })?;

        Ok(downloaded)
    }
}

fn stream_body(
    response: &mut reqwest::blocking::Response,
    writer: &mut BufWriter<File>,
    url: &str,
    dest: &Path,
    total_size: u64,
    on_progress: Option<&dyn Fn(u64, u64)>,
) -> CollectResult<u64> {
    let mut buffer = vec![0u8; BUFFER_SIZE];
    let mut downloaded = 0u64;

    loop {
        let bytes_read = response
            .read(&mut buffer)
            .map_err(|e| CollectError::DownloadFailed {
                url: url.to_string(),
                reason: format!("read error: {}", e),
            })?;

        if bytes_read == 0 {
            break;
        }

        writer
            .write_all(&buffer[..bytes_read])
            .map_err(|e| CollectError::WriteFailed {
                path: dest.to_path_buf(),
                source: e,
            })?;

        downloaded += bytes_read as u64;
        if let Some(cb) = on_progress {
            cb(downloaded, total_size);
        }
    }

    Ok(downloaded)
}
