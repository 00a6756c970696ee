//! Bootstrap orchestration.
//!
//! Sequences the filesystem, environment, repository and archive steps
//! that install or update FNA under a target directory.

mod mode;
mod orchestrator;

pub use mode::Mode;
pub use orchestrator::{BootstrapReport, BootstrapStage, Bootstrapper, RunOutcome, StageCallback};
