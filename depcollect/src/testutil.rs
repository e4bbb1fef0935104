//! Shared test fixtures.

use std::path::Path;
use std::sync::{Arc, Mutex};

use flate2::write::GzEncoder;
use flate2::Compression;
use tar::{Builder, Header};

use crate::error::{CollectError, CollectResult};
use crate::fetch::Downloader;

/// Build a gzip-compressed tarball in memory from `(path, contents)` pairs.
pub(crate) fn targz_bytes(entries: &[(&str, &[u8])]) -> Vec<u8> {
    let mut encoder = GzEncoder::new(Vec::new(), Compression::default());

    {
        let mut builder = Builder::new(&mut encoder);
        for (path, data) in entries {
            let mut header = Header::new_gnu();
            header.set_size(data.len() as u64);
            header.set_mode(0o644);
            header.set_cksum();
            builder.append_data(&mut header, path, *data).unwrap();
        }
        builder.finish().unwrap();
    }

    encoder.finish().unwrap()
}

/// Downloader that serves prepared bytes per URL and records every call.
pub(crate) struct FakeDownloader {
    responses: Vec<(String, Vec<u8>)>,
    calls: Arc<Mutex<Vec<String>>>,
}

impl FakeDownloader {
    pub fn new(responses: Vec<(String, Vec<u8>)>) -> Self {
        Self {
            responses,
            calls: Arc::new(Mutex::new(Vec::new())),
        }
    }

    /// Shared handle to the call log, usable after the downloader has been
    /// moved into an engine.
    pub fn call_log(&self) -> Arc<Mutex<Vec<String>>> {
        Arc::clone(&self.calls)
    }
}

impl Downloader for FakeDownloader {
    fn download(
        &self,
        url: &str,
        dest: &Path,
        on_progress: Option<&dyn Fn(u64, u64)>,
    ) -> CollectResult<u64> {
        self.calls.lock().unwrap().push(url.to_string());
        let body = self
            .responses
            .iter()
            .find(|(u, _)| u == url)
            .map(|(_, body)| body.clone())
            .ok_or_else(|| CollectError::DownloadFailed {
                url: url.to_string(),
                reason: "no response configured".to_string(),
            })?;
        std::fs::write(dest, &body).map_err(|e| CollectError::WriteFailed {
            path: dest.to_path_buf(),
            source: e,
        })?;
        if let Some(cb) = on_progress {
            cb(body.len() as u64, body.len() as u64);
        }
        Ok(body.len() as u64)
    }
}
