//! Error types for the updater.

use std::io;
use std::path::PathBuf;

use thiserror::Error;

/// Result type for updater operations.
pub type UpdaterResult<T> = Result<T, UpdaterError>;

/// Errors that can occur while installing or updating FNA.
#[derive(Debug, Error)]
pub enum UpdaterError {
    /// The mode token was not one of the supported modes.
    #[error("invalid mode '{token}', expected one of {{install, update}}")]
    InvalidMode { token: String },

    /// A path that must be a directory exists as a plain file.
    #[error("{} already exists and is a file, expected a directory", .path.display())]
    FilesystemConflict { path: PathBuf },

    /// Failed to read a file or directory.
    #[error("failed to read {}: {source}", .path.display())]
    ReadFailed { path: PathBuf, source: io::Error },

    /// Failed to write a file.
    #[error("failed to write {}: {source}", .path.display())]
    WriteFailed { path: PathBuf, source: io::Error },

    /// Failed to create a directory.
    #[error("failed to create directory {}: {source}", .path.display())]
    CreateDirFailed { path: PathBuf, source: io::Error },

    /// Failed to remove a file or directory tree.
    #[error("failed to remove {}: {source}", .path.display())]
    RemoveFailed { path: PathBuf, source: io::Error },

    /// Failed to download an archive.
    #[error("failed to download {url}: {reason}")]
    DownloadFailed { url: String, reason: String },

    /// Archive extraction failed.
    #[error("failed to extract {}: {reason}", .path.display())]
    ExtractionFailed { path: PathBuf, reason: String },

    /// An external program could not be started.
    #[error("failed to run {program}: {source}")]
    CommandSpawnFailed { program: String, source: io::Error },

    /// An external program exited with a non-zero status.
    #[error("{step} exited with status {code}{}", format_stderr(.stderr))]
    CommandFailed {
        step: String,
        code: i32,
        stderr: String,
    },

    /// A tool required on PATH is not available.
    #[error("{tool} is required but was not found on PATH")]
    ToolMissing { tool: String },

    /// A clone failed and left no checkout to fall back on.
    #[error("failed to synchronise {url}: {source}")]
    SyncFailed {
        url: String,
        source: Box<UpdaterError>,
    },

    /// The path does not contain a git checkout.
    #[error("{} is not a git checkout", .path.display())]
    NotACheckout { path: PathBuf },

    /// The isolated runtime environment could not be prepared or entered.
    #[error("runtime environment error: {0}")]
    Environment(String),

    /// Invalid configuration.
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),
}

fn format_stderr(stderr: &str) -> String {
    if stderr.is_empty() {
        String::new()
    } else {
        format!(": {}", stderr)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_invalid_mode_names_token_and_allowed_set() {
        let err = UpdaterError::InvalidMode {
            token: "frobnicate".to_string(),
        };
        let message = err.to_string();
        assert!(message.contains("frobnicate"));
        assert!(message.contains("{install, update}"));
    }

    #[test]
    fn test_command_failed_display() {
        let err = UpdaterError::CommandFailed {
            step: "git pull".to_string(),
            code: 128,
            stderr: "fatal: not a git repository".to_string(),
        };
        assert_eq!(
            err.to_string(),
            "git pull exited with status 128: fatal: not a git repository"
        );

        let quiet = UpdaterError::CommandFailed {
            step: "buildlibs.sh ios".to_string(),
            code: 1,
            stderr: String::new(),
        };
        assert_eq!(quiet.to_string(), "buildlibs.sh ios exited with status 1");
    }

    #[test]
    fn test_sync_failed_keeps_clone_error() {
        use std::error::Error;

        let err = UpdaterError::SyncFailed {
            url: "https://github.com/FNA-XNA/FNA".to_string(),
            source: Box::new(UpdaterError::CommandFailed {
                step: "git clone".to_string(),
                code: 128,
                stderr: "could not resolve host".to_string(),
            }),
        };
        assert!(err.to_string().contains("could not resolve host"));
        assert!(err.source().is_some());
    }

    #[test]
    fn test_io_error_keeps_source() {
        use std::error::Error;

        let err = UpdaterError::RemoveFailed {
            path: PathBuf::from("/tmp/x"),
            source: io::Error::new(io::ErrorKind::PermissionDenied, "denied"),
        };
        assert!(err.source().is_some());
        assert!(err.to_string().contains("/tmp/x"));
    }
}
