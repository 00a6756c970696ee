//! Seams between the orchestration logic and the outside world.
//!
//! Production implementations live next to the logic that uses them
//! (`GitCli`, `HttpDownloader`, `ShellExtractor`); tests substitute fakes.

use std::path::Path;

use crate::error::UpdaterResult;

/// Progress callback for downloads.
///
/// Arguments: (bytes_downloaded, total_bytes). `total_bytes` is 0 when the
/// server does not report a length.
pub type ProgressCallback = Box<dyn Fn(u64, u64) + Send + Sync>;

/// Version-control operations on a single checkout.
pub trait VcsClient {
    /// Create a fresh checkout of `url` at `path`.
    fn clone_repo(&self, url: &str, path: &Path, options: &[String]) -> UpdaterResult<()>;

    /// Fetch and merge the remote's default branch into the checkout at `path`.
    fn pull(&self, path: &Path) -> UpdaterResult<()>;

    /// Initialise and update every nested submodule, recursively, to the
    /// revision recorded by the checkout.
    fn update_submodules(&self, path: &Path) -> UpdaterResult<()>;
}

/// Downloads a remote resource to a local file.
pub trait Downloader {
    /// Download `url` to `dest`, returning the number of bytes written.
    fn download(&self, url: &str, dest: &Path) -> UpdaterResult<u64>;
}

/// Extracts archives.
pub trait ArchiveExtractor {
    /// Extract `archive_path` into `dest_dir`, returning the number of files
    /// present in `dest_dir` afterwards.
    fn extract(&self, archive_path: &Path, dest_dir: &Path) -> UpdaterResult<usize>;
}
