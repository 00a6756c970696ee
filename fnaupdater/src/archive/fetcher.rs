//! Download-extract-delete sequence for the library archive.

use std::path::{Path, PathBuf};

use tracing::{info, warn};

use crate::error::UpdaterResult;
use crate::filesystem::remove_entry;
use crate::policy::FailurePolicy;
use crate::traits::{ArchiveExtractor, Downloader};

/// File name used when a URL has no usable last segment.
const FALLBACK_ARCHIVE_NAME: &str = "archive.download";

/// Outcome of [`ArchiveFetcher::fetch_and_extract`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FetchReport {
    /// Where the archive was temporarily stored.
    pub archive_path: PathBuf,
    /// Bytes downloaded.
    pub bytes_downloaded: u64,
    /// Files present in the extraction directory afterwards, if extraction
    /// succeeded.
    pub files_extracted: Option<usize>,
}

/// Temporary file name for an archive URL: its last path segment.
pub fn archive_file_name(url: &str) -> &str {
    let without_query = url.split(&['?', '#'][..]).next().unwrap_or(url);
    match without_query.trim_end_matches('/').rsplit('/').next() {
        Some(name) if !name.is_empty() && !name.contains(':') => name,
        _ => FALLBACK_ARCHIVE_NAME,
    }
}

/// Fetches a remote archive and unpacks it.
pub struct ArchiveFetcher<'a, D: Downloader + ?Sized, E: ArchiveExtractor + ?Sized> {
    downloader: &'a D,
    extractor: &'a E,
    policy: FailurePolicy,
}

impl<'a, D: Downloader + ?Sized, E: ArchiveExtractor + ?Sized> ArchiveFetcher<'a, D, E> {
    /// Create a fetcher from its collaborators.
    pub fn new(downloader: &'a D, extractor: &'a E, policy: FailurePolicy) -> Self {
        Self {
            downloader,
            extractor,
            policy,
        }
    }

    /// Download `url` into `work_dir`, extract it into `extract_to` and
    /// delete the downloaded file.
    ///
    /// The caller prepares `extract_to`. The downloaded file is removed
    /// whether or not extraction succeeded, and also when the download
    /// itself fails part-way. A failed download is fatal; a failed
    /// extraction follows the failure policy and leaves whatever was
    /// unpacked in place.
    pub fn fetch_and_extract(
        &self,
        url: &str,
        work_dir: &Path,
        extract_to: &Path,
    ) -> UpdaterResult<FetchReport> {
        let archive_path = work_dir.join(archive_file_name(url));

        println!("Downloading FNA libs...");
        info!(url, dest = %archive_path.display(), "downloading archive");
        let bytes_downloaded = match self.downloader.download(url, &archive_path) {
            Ok(bytes) => bytes,
            Err(e) => {
                if let Err(cleanup) = remove_entry(&archive_path) {
                    warn!(error = %cleanup, "failed to remove partial download");
                }
                return Err(e);
            }
        };

        println!("Extracting FNA libs...");
        let extracted = self.extractor.extract(&archive_path, extract_to);
        let removed = remove_entry(&archive_path);

        let files_extracted = match extracted {
            Ok(count) => {
                removed?;
                Some(count)
            }
            Err(e) => {
                if let Err(cleanup) = removed {
                    warn!(error = %cleanup, "failed to remove downloaded archive");
                }
                self.policy.apply("extract archive", Err(e))?;
                None
            }
        };

        Ok(FetchReport {
            archive_path,
            bytes_downloaded,
            files_extracted,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::Cell;
    use std::fs;
    use tempfile::TempDir;

    use crate::error::UpdaterError;

    struct FakeDownloader {
        fail_after_write: bool,
    }

    impl Downloader for FakeDownloader {
        fn download(&self, url: &str, dest: &Path) -> UpdaterResult<u64> {
            // Fails when `dest` cannot be created; the error below still wins.
            let written = fs::write(dest, b"archive bytes");
            if self.fail_after_write {
                return Err(UpdaterError::DownloadFailed {
                    url: url.to_string(),
                    reason: "connection reset".to_string(),
                });
            }
            written.unwrap();
            Ok(13)
        }
    }

    struct FakeExtractor {
        fail: bool,
        saw_archive: Cell<bool>,
    }

    impl FakeExtractor {
        fn new(fail: bool) -> Self {
            Self {
                fail,
                saw_archive: Cell::new(false),
            }
        }
    }

    impl ArchiveExtractor for FakeExtractor {
        fn extract(&self, archive_path: &Path, dest_dir: &Path) -> UpdaterResult<usize> {
            self.saw_archive.set(archive_path.exists());
            fs::create_dir_all(dest_dir).unwrap();
            fs::write(dest_dir.join("partial.so"), "x").unwrap();
            if self.fail {
                return Err(UpdaterError::ExtractionFailed {
                    path: archive_path.to_path_buf(),
                    reason: "unexpected EOF".to_string(),
                });
            }
            Ok(1)
        }
    }

    const URL: &str = "https://fna.flibitijibibo.com/archive/fnalibs.tar.bz2";

    #[test]
    fn test_archive_file_name() {
        assert_eq!(archive_file_name(URL), "fnalibs.tar.bz2");
        assert_eq!(
            archive_file_name("https://example.com/libs.tar.gz?token=1"),
            "libs.tar.gz"
        );
        assert_eq!(archive_file_name("https://"), FALLBACK_ARCHIVE_NAME);
    }

    #[test]
    fn test_successful_fetch_removes_archive() {
        let temp = TempDir::new().unwrap();
        let dest = temp.path().join("fnalibs");
        let downloader = FakeDownloader {
            fail_after_write: false,
        };
        let extractor = FakeExtractor::new(false);

        let report = ArchiveFetcher::new(&downloader, &extractor, FailurePolicy::Warn)
            .fetch_and_extract(URL, temp.path(), &dest)
            .unwrap();

        assert!(extractor.saw_archive.get());
        assert_eq!(report.bytes_downloaded, 13);
        assert_eq!(report.files_extracted, Some(1));
        assert!(!report.archive_path.exists());
    }

    #[test]
    fn test_failed_extraction_still_removes_archive() {
        let temp = TempDir::new().unwrap();
        let dest = temp.path().join("fnalibs");
        let downloader = FakeDownloader {
            fail_after_write: false,
        };
        let extractor = FakeExtractor::new(true);

        let report = ArchiveFetcher::new(&downloader, &extractor, FailurePolicy::Warn)
            .fetch_and_extract(URL, temp.path(), &dest)
            .unwrap();
        assert_eq!(report.files_extracted, None);
        assert!(!temp.path().join("fnalibs.tar.bz2").exists());
        // No rollback of a partial extraction.
        assert!(dest.join("partial.so").exists());

        let strict = ArchiveFetcher::new(&downloader, &extractor, FailurePolicy::Abort)
            .fetch_and_extract(URL, temp.path(), &dest);
        assert!(matches!(strict, Err(UpdaterError::ExtractionFailed { .. })));
        assert!(!temp.path().join("fnalibs.tar.bz2").exists());
    }

    #[test]
    fn test_failed_download_removes_partial_file() {
        let temp = TempDir::new().unwrap();
        let downloader = FakeDownloader {
            fail_after_write: true,
        };
        let extractor = FakeExtractor::new(false);

        let result = ArchiveFetcher::new(&downloader, &extractor, FailurePolicy::Warn)
            .fetch_and_extract(URL, temp.path(), &temp.path().join("fnalibs"));

        assert!(matches!(result, Err(UpdaterError::DownloadFailed { .. })));
        assert!(!temp.path().join("fnalibs.tar.bz2").exists());
        assert!(!extractor.saw_archive.get());
    }

    #[test]
    fn test_download_error_survives_failed_cleanup() {
        let temp = TempDir::new().unwrap();
        // A file as work dir: the archive path beneath it can be neither
        // written nor inspected.
        let work_dir = temp.path().join("not-a-dir");
        fs::write(&work_dir, "x").unwrap();
        let downloader = FakeDownloader {
            fail_after_write: true,
        };
        let extractor = FakeExtractor::new(false);

        let result = ArchiveFetcher::new(&downloader, &extractor, FailurePolicy::Warn)
            .fetch_and_extract(URL, &work_dir, &temp.path().join("fnalibs"));

        assert!(matches!(result, Err(UpdaterError::DownloadFailed { .. })));
        assert!(!extractor.saw_archive.get());
    }
}
