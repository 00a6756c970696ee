//! Archive extraction.

use std::path::Path;

use crate::error::{UpdaterError, UpdaterResult};
use crate::filesystem::count_files;
use crate::process::{CommandRunner, CommandSpec, SystemRunner};
use crate::traits::ArchiveExtractor;

/// Shell-based archive extractor.
///
/// Uses the system `tar`, which detects gzip/bzip2/xz compression on its own
/// when reading from a file. GNU tar, bsdtar and the `tar.exe` shipped with
/// Windows all accept the same flags.
#[derive(Debug, Default, Clone)]
pub struct ShellExtractor<R: CommandRunner = SystemRunner> {
    runner: R,
}

impl ShellExtractor<SystemRunner> {
    /// Create a new shell-based extractor.
    pub fn new() -> Self {
        Self::default()
    }
}

impl<R: CommandRunner> ShellExtractor<R> {
    /// Create an extractor running `tar` through `runner`.
    pub fn with_runner(runner: R) -> Self {
        Self { runner }
    }
}

impl<R: CommandRunner> ArchiveExtractor for ShellExtractor<R> {
    fn extract(&self, archive_path: &Path, dest_dir: &Path) -> UpdaterResult<usize> {
        if !archive_path.is_file() {
            return Err(UpdaterError::ExtractionFailed {
                path: archive_path.to_path_buf(),
                reason: "archive not found".to_string(),
            });
        }

        std::fs::create_dir_all(dest_dir).map_err(|e| UpdaterError::CreateDirFailed {
            path: dest_dir.to_path_buf(),
            source: e,
        })?;

        let spec = CommandSpec::new("tar")
            .arg("-xf")
            .arg(archive_path)
            .arg("-C")
            .arg(dest_dir);

        let output = self
            .runner
            .run(&spec)
            .map_err(|e| UpdaterError::ExtractionFailed {
                path: archive_path.to_path_buf(),
                reason: format!("Failed to run tar: {}", e),
            })?;

        if !output.success() {
            return Err(UpdaterError::ExtractionFailed {
                path: archive_path.to_path_buf(),
                reason: format!("tar extraction failed: {}", output.stderr.trim()),
            });
        }

        count_files(dest_dir)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use std::process::Command;
    use tempfile::TempDir;

    #[test]
    fn test_shell_extractor_new() {
        let extractor = ShellExtractor::new();
        assert!(format!("{:?}", extractor).contains("ShellExtractor"));
    }

    #[test]
    fn test_missing_archive() {
        let temp = TempDir::new().unwrap();
        let result = ShellExtractor::new().extract(&temp.path().join("none.tar"), temp.path());
        assert!(matches!(result, Err(UpdaterError::ExtractionFailed { .. })));
    }

    #[test]
    fn test_corrupt_archive() {
        let temp = TempDir::new().unwrap();
        let archive = temp.path().join("fnalibs.tar.bz2");
        fs::write(&archive, b"definitely not a tarball").unwrap();

        let result = ShellExtractor::new().extract(&archive, &temp.path().join("out"));
        assert!(matches!(result, Err(UpdaterError::ExtractionFailed { .. })));
    }

    #[test]
    fn test_extracts_tarball() {
        let temp = TempDir::new().unwrap();
        let staging = temp.path().join("staging");
        fs::create_dir_all(staging.join("x64")).unwrap();
        fs::write(staging.join("x64/libFNA3D.so.0"), "lib").unwrap();
        fs::write(staging.join("README.txt"), "readme").unwrap();

        let archive = temp.path().join("fnalibs.tar");
        let status = Command::new("tar")
            .arg("-cf")
            .arg(&archive)
            .arg("-C")
            .arg(&staging)
            .args(["x64", "README.txt"])
            .status()
            .unwrap();
        assert!(status.success());

        let dest = temp.path().join("fnalibs");
        let count = ShellExtractor::new().extract(&archive, &dest).unwrap();

        assert_eq!(count, 2);
        assert!(dest.join("x64/libFNA3D.so.0").exists());
    }
}
