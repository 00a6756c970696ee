//! HTTP downloader for library archives.
//!
//! Streams the response body straight to disk. Archives are replaced
//! wholesale on every run, so there is no resume and no checksum.

use std::fs::{self, File};
use std::io::{BufWriter, Read, Write};
use std::path::Path;
use std::time::Duration;

use reqwest::blocking::Client;
use tracing::debug;

use crate::error::{UpdaterError, UpdaterResult};
use crate::traits::{Downloader, ProgressCallback};

/// Buffer size for reading/writing during downloads (64KB).
const BUFFER_SIZE: usize = 64 * 1024;

/// User agent sent with every request.
const USER_AGENT: &str = concat!("fnaupdater/", env!("CARGO_PKG_VERSION"));

/// HTTP-based archive downloader.
pub struct HttpDownloader {
    client: Client,
    pub(crate) timeout: Option<Duration>,
    progress: Option<ProgressCallback>,
}

impl std::fmt::Debug for HttpDownloader {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HttpDownloader")
            .field("timeout", &self.timeout)
            .field("progress", &self.progress.is_some())
            .finish()
    }
}

impl HttpDownloader {
    /// Create a downloader without a request timeout.
    pub fn new() -> UpdaterResult<Self> {
        Self::with_timeout(None)
    }

    /// Create a downloader with an optional request timeout.
    pub fn with_timeout(timeout: Option<Duration>) -> UpdaterResult<Self> {
        // reqwest's blocking client defaults to 30s; archives take longer.
        let client = Client::builder()
            .user_agent(USER_AGENT)
            .timeout(timeout)
            .build()
            .map_err(|e| UpdaterError::InvalidConfig(format!("HTTP client: {}", e)))?;

        Ok(Self {
            client,
            timeout,
            progress: None,
        })
    }

    /// Report progress through `callback` while streaming.
    pub fn with_progress(mut self, callback: ProgressCallback) -> Self {
        self.progress = Some(callback);
        self
    }

    /// Stream the response body for `url` into `dest`.
    fn stream_download(&self, url: &str, dest: &Path) -> UpdaterResult<u64> {
        let mut response = self.client.get(url).send().map_err(|e| {
            let reason = if e.is_timeout() {
                match self.timeout {
                    Some(t) => format!("timed out after {}s", t.as_secs()),
                    None => "timed out".to_string(),
                }
            } else {
                e.to_string()
            };
            UpdaterError::DownloadFailed {
                url: url.to_string(),
                reason,
            }
        })?;

        let status = response.status();
        if !status.is_success() {
            return Err(UpdaterError::DownloadFailed {
                url: url.to_string(),
                reason: format!("GET request failed with status {}", status),
            });
        }

        let total_size = response.content_length().unwrap_or(0);

        if let Some(parent) = dest.parent() {
            fs::create_dir_all(parent).map_err(|e| UpdaterError::CreateDirFailed {
                path: parent.to_path_buf(),
                source: e,
            })?;
        }
        let file = File::create(dest).map_err(|e| UpdaterError::WriteFailed {
            path: dest.to_path_buf(),
            source: e,
        })?;

        let mut writer = BufWriter::new(file);
        let mut buffer = vec![0u8; BUFFER_SIZE];
        let mut downloaded = 0u64;

        loop {
            let bytes_read = response
                .read(&mut buffer)
                .map_err(|e| UpdaterError::DownloadFailed {
                    url: url.to_string(),
                    reason: format!("Read error: {}", e),
                })?;

            if bytes_read == 0 {
                break;
            }

            writer
                .write_all(&buffer[..bytes_read])
                .map_err(|e| UpdaterError::WriteFailed {
                    path: dest.to_path_buf(),
                    source: e,
                })?;

            downloaded += bytes_read as u64;

            if let Some(ref cb) = self.progress {
                cb(downloaded, total_size);
            }
        }

        writer.flush().map_err(|e| UpdaterError::WriteFailed {
            path: dest.to_path_buf(),
            source: e,
        })?;

        debug!(url, bytes = downloaded, "download complete");
        Ok(downloaded)
    }
}

impl Downloader for HttpDownloader {
    fn download(&self, url: &str, dest: &Path) -> UpdaterResult<u64> {
        self.stream_download(url, dest)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_http_downloader_default_has_no_timeout() {
        let downloader = HttpDownloader::new().unwrap();
        assert!(downloader.timeout.is_none());
    }

    #[test]
    fn test_http_downloader_with_timeout() {
        let downloader = HttpDownloader::with_timeout(Some(Duration::from_secs(60))).unwrap();
        assert_eq!(downloader.timeout, Some(Duration::from_secs(60)));
    }

    #[test]
    fn test_debug_hides_callback() {
        let downloader = HttpDownloader::new()
            .unwrap()
            .with_progress(Box::new(|_, _| {}));
        let rendered = format!("{:?}", downloader);
        assert!(rendered.contains("progress: true"));
    }

    #[test]
    fn test_unreachable_host_is_download_error() {
        let downloader = HttpDownloader::with_timeout(Some(Duration::from_secs(5))).unwrap();
        let temp = tempfile::TempDir::new().unwrap();
        let dest = temp.path().join("fnalibs.tar.bz2");

        // Port 9 (discard) on localhost is closed on test machines.
        let result = downloader.download("http://127.0.0.1:9/fnalibs.tar.bz2", &dest);

        assert!(matches!(result, Err(UpdaterError::DownloadFailed { .. })));
        assert!(!dest.exists());
    }
}
