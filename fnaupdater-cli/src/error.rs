//! CLI error types.

use std::path::PathBuf;

use fnaupdater::UpdaterError;
use thiserror::Error;

/// Errors reported by the command-line front end.
///
/// Every variant exits the process with status 1.
#[derive(Debug, Error)]
pub enum CliError {
    #[error(transparent)]
    Updater(#[from] UpdaterError),

    #[error("config file not found: {}", .0.display())]
    ConfigNotFound(PathBuf),
}

impl CliError {
    /// Process exit code for this error.
    pub fn exit_code(&self) -> i32 {
        1
    }
}
