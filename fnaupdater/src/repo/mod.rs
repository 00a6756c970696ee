//! Repository synchronisation.
//!
//! This module provides:
//! - Mode detection from the state of the local path (`sync`)
//! - The clone → fallback → pull → submodules sequence (`sync`)
//! - A `git` command-line client (`git`)

mod git;
mod sync;

pub use git::GitCli;
pub use sync::{detect_mode, repo_name, RepositorySynchronizer, SyncMode, SyncReport};
