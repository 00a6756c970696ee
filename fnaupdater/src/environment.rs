//! Isolated runtime environment.
//!
//! The updater runs from a private copy of itself kept under the target
//! directory (`.venv/bin/`). A process that is not yet isolated prepares
//! that copy and relaunches through it with the same arguments; the copy
//! knows it is isolated from the [`ISOLATION_ENV_VAR`] marker.

use std::env;
use std::ffi::OsString;
use std::fs;
use std::path::{Path, PathBuf};

use tracing::{debug, info};

use crate::error::{UpdaterError, UpdaterResult};
use crate::filesystem::ensure_directory;
use crate::process::{CommandRunner, CommandSpec, SystemRunner};

/// Environment variable marking a process as running inside an environment.
///
/// Its value is the environment directory.
pub const ISOLATION_ENV_VAR: &str = "FNAUPDATER_ISOLATED_ENV";

/// Sub-directory of the environment holding executables.
pub const BIN_DIR: &str = "bin";

/// Preparation and entry of the isolated environment.
pub trait RuntimeEnvironment {
    /// Whether the current process already runs inside an environment.
    fn is_isolated(&self) -> bool;

    /// Make sure `env_dir` holds a usable environment.
    ///
    /// Returns `true` when the environment was created or refreshed.
    fn prepare(&self, env_dir: &Path) -> UpdaterResult<bool>;

    /// Re-run the updater inside `env_dir`, returning the child's exit code.
    fn relaunch(&self, env_dir: &Path) -> UpdaterResult<i32>;
}

/// Path of the updater executable inside `env_dir`.
pub fn env_executable(env_dir: &Path) -> PathBuf {
    env_dir
        .join(BIN_DIR)
        .join(format!("fnaupdater{}", env::consts::EXE_SUFFIX))
}

/// [`RuntimeEnvironment`] that copies the running executable and
/// relaunches it as a child process.
#[derive(Debug, Clone)]
pub struct ProcessEnvironment<R: CommandRunner = SystemRunner> {
    runner: R,
    executable: PathBuf,
    args: Vec<OsString>,
}

impl ProcessEnvironment<SystemRunner> {
    /// Environment for the current process and its arguments.
    pub fn current() -> UpdaterResult<Self> {
        let executable = env::current_exe()
            .map_err(|e| UpdaterError::Environment(format!("cannot locate executable: {}", e)))?;
        Ok(Self::new(
            SystemRunner::new(),
            executable,
            env::args_os().skip(1).collect(),
        ))
    }
}

impl<R: CommandRunner> ProcessEnvironment<R> {
    /// Create an environment manager for `executable` invoked with `args`.
    pub fn new(runner: R, executable: impl Into<PathBuf>, args: Vec<OsString>) -> Self {
        Self {
            runner,
            executable: executable.into(),
            args,
        }
    }
}

impl<R: CommandRunner> RuntimeEnvironment for ProcessEnvironment<R> {
    fn is_isolated(&self) -> bool {
        env::var_os(ISOLATION_ENV_VAR).is_some()
    }

    fn prepare(&self, env_dir: &Path) -> UpdaterResult<bool> {
        let existed = ensure_directory(env_dir, true, false)?;
        let target = env_executable(env_dir);
        if existed && target.is_file() && same_contents(&self.executable, &target)? {
            debug!(env = %env_dir.display(), "reusing environment");
            return Ok(false);
        }

        if existed {
            println!("  Refreshing isolated environment...");
        } else {
            println!("  Setting up isolated environment...");
        }
        let bin = env_dir.join(BIN_DIR);
        fs::create_dir_all(&bin).map_err(|e| UpdaterError::CreateDirFailed {
            path: bin.clone(),
            source: e,
        })?;
        fs::copy(&self.executable, &target).map_err(|e| UpdaterError::WriteFailed {
            path: target.clone(),
            source: e,
        })?;

        info!(env = %env_dir.display(), "environment created");
        Ok(true)
    }

    fn relaunch(&self, env_dir: &Path) -> UpdaterResult<i32> {
        let executable = env_executable(env_dir);
        if !executable.is_file() {
            return Err(UpdaterError::Environment(format!(
                "{} does not exist",
                executable.display()
            )));
        }

        println!("  Entering isolated environment...");
        let spec = CommandSpec::new(executable.to_string_lossy())
            .args(self.args.iter().cloned())
            .env(ISOLATION_ENV_VAR, env_dir);
        self.runner.run_interactive(&spec)
    }
}

/// Whether two files hold the same bytes.
fn same_contents(a: &Path, b: &Path) -> UpdaterResult<bool> {
    let read = |path: &Path| {
        fs::read(path).map_err(|e| UpdaterError::ReadFailed {
            path: path.to_path_buf(),
            source: e,
        })
    };
    let len = |path: &Path| fs::metadata(path).map(|m| m.len()).ok();

    if len(a) != len(b) {
        return Ok(false);
    }
    Ok(read(a)? == read(b)?)
}
