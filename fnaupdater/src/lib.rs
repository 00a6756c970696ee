//! FnaUpdater - installs and refreshes FNA and its native libraries.
//!
//! Given a target directory, the updater:
//! - clones or pulls the FNA repository, including its submodules
//! - downloads and unpacks the prebuilt native library archive
//! - on macOS, also builds the native libraries for Apple platforms
//!
//! Runs are idempotent: invoking the updater again against the same
//! directory converges it to the current upstream state.
//!
//! # Example
//!
//! ```ignore
//! use fnaupdater::{Bootstrapper, Mode, RunOutcome, UpdaterConfig};
//!
//! let config = UpdaterConfig::new("/path/to/project/.fna");
//! match Bootstrapper::new(config)?.run(Mode::Install)? {
//!     RunOutcome::Completed(report) => println!("{} warnings", report.warnings()),
//!     RunOutcome::Relaunched(code) => std::process::exit(code),
//! }
//! ```

pub mod archive;
pub mod bootstrap;
pub mod config;
pub mod environment;
pub mod error;
pub mod filesystem;
pub mod native;
pub mod policy;
pub mod process;
pub mod repo;
pub mod traits;

pub use bootstrap::{BootstrapReport, BootstrapStage, Bootstrapper, Mode, RunOutcome};
pub use config::{ConfigFile, UpdaterConfig};
pub use error::{UpdaterError, UpdaterResult};
pub use native::{NativeBuild, PlatformCapabilities};
pub use policy::FailurePolicy;
