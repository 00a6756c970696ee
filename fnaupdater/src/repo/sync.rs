//! Clone-or-pull synchronisation of a checkout and its submodules.

use std::path::Path;

use tracing::{info, warn};

use crate::error::{UpdaterError, UpdaterResult};
use crate::filesystem::is_checkout;
use crate::policy::FailurePolicy;
use crate::traits::VcsClient;

/// Which branch of the synchroniser runs first.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SyncMode {
    /// No checkout yet: create one.
    Clone,
    /// A checkout exists: bring it up to date.
    Pull,
}

/// Outcome of a [`RepositorySynchronizer::sync`] call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SyncReport {
    /// Mode chosen from the state of the local path.
    pub mode: SyncMode,
    /// True when a clone attempt failed and the pull branch ran instead.
    pub fell_back_to_pull: bool,
    /// Number of steps that failed and were downgraded to warnings.
    pub warnings: usize,
}

/// Determine whether `path` needs a clone or a pull.
///
/// A plain file at `path` is an unrecoverable conflict.
pub fn detect_mode(path: &Path) -> UpdaterResult<SyncMode> {
    if path.exists() && !path.is_dir() {
        return Err(UpdaterError::FilesystemConflict {
            path: path.to_path_buf(),
        });
    }

    if is_checkout(path) {
        Ok(SyncMode::Pull)
    } else {
        Ok(SyncMode::Clone)
    }
}

/// Display name of a repository: the last segment of its URL.
pub fn repo_name(url: &str) -> &str {
    let trimmed = url.trim_end_matches('/');
    let name = trimmed.rsplit('/').next().unwrap_or(trimmed);
    name.strip_suffix(".git").unwrap_or(name)
}

/// Produces clean, up-to-date checkouts.
///
/// Safe to run repeatedly against the same path: an absent checkout is
/// cloned, an existing one pulled, and a clone that fails but leaves a
/// checkout behind (an interrupted run, for instance) falls back to a pull.
/// A clone that leaves no checkout fails the sync whatever the policy.
pub struct RepositorySynchronizer<'a, V: VcsClient + ?Sized> {
    vcs: &'a V,
    policy: FailurePolicy,
}

impl<'a, V: VcsClient + ?Sized> RepositorySynchronizer<'a, V> {
    /// Create a synchroniser using `vcs` for repository operations.
    pub fn new(vcs: &'a V, policy: FailurePolicy) -> Self {
        Self { vcs, policy }
    }

    /// Synchronise `path` with `url`, including all nested submodules.
    ///
    /// # Arguments
    ///
    /// * `url` - Remote repository URL
    /// * `path` - Local checkout path
    /// * `clone_options` - Extra flags for the clone branch
    pub fn sync(
        &self,
        url: &str,
        path: &Path,
        clone_options: &[String],
    ) -> UpdaterResult<SyncReport> {
        let name = repo_name(url);
        let mode = detect_mode(path)?;
        let mut report = SyncReport {
            mode,
            fell_back_to_pull: false,
            warnings: 0,
        };

        let mut pull = mode == SyncMode::Pull;

        if mode == SyncMode::Clone {
            println!("Cloning {}...", name);
            if let Err(e) = self.vcs.clone_repo(url, path, clone_options) {
                // Nothing to pull into; the clone error is the real cause.
                if !is_checkout(path) {
                    return Err(UpdaterError::SyncFailed {
                        url: url.to_string(),
                        source: Box::new(e),
                    });
                }
                println!("  Repo already exists, attempting to update...");
                info!(repo = name, error = %e, "clone failed, falling back to pull");
                report.fell_back_to_pull = true;
                pull = true;
            }
        }

        if pull {
            println!("  Updating {}...", name);
            if !self.policy.apply("git pull", self.vcs.pull(path))? {
                report.warnings += 1;
            }
        }

        println!("  Updating submodules...");
        if !self
            .policy
            .apply("git submodule update", self.vcs.update_submodules(path))?
        {
            report.warnings += 1;
        }

        if report.warnings > 0 {
            warn!(repo = name, warnings = report.warnings, "synchronised with warnings");
        }
        println!("  Done!");
        Ok(report)
    }
}
