//! External program execution.
//!
//! Every subprocess the updater starts (git, tar, build scripts, the
//! relaunched updater itself) goes through a [`CommandRunner`] so that the
//! orchestration logic can be exercised without spawning anything.
//!
//! Calls block until the program exits. There are no timeouts.

use std::ffi::OsString;
use std::path::{Path, PathBuf};
use std::process::Command;

use tracing::debug;

use crate::error::{UpdaterError, UpdaterResult};

/// Description of a program invocation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommandSpec {
    /// Program name or path.
    pub program: String,
    /// Arguments, in order.
    pub args: Vec<OsString>,
    /// Working directory, if different from the current one.
    pub current_dir: Option<PathBuf>,
    /// Additional environment variables.
    pub envs: Vec<(String, OsString)>,
}

impl CommandSpec {
    /// Create a spec for `program` with no arguments.
    pub fn new(program: impl Into<String>) -> Self {
        Self {
            program: program.into(),
            args: Vec::new(),
            current_dir: None,
            envs: Vec::new(),
        }
    }

    /// Add a single argument.
    pub fn arg(mut self, arg: impl Into<OsString>) -> Self {
        self.args.push(arg.into());
        self
    }

    /// Add multiple arguments.
    pub fn args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<OsString>,
    {
        self.args.extend(args.into_iter().map(Into::into));
        self
    }

    /// Set the working directory.
    pub fn current_dir(mut self, dir: impl AsRef<Path>) -> Self {
        self.current_dir = Some(dir.as_ref().to_path_buf());
        self
    }

    /// Set an environment variable for the child.
    pub fn env(mut self, key: impl Into<String>, value: impl Into<OsString>) -> Self {
        self.envs.push((key.into(), value.into()));
        self
    }

    /// Human-readable rendering, e.g. `git -C FNA pull origin`.
    pub fn display(&self) -> String {
        let mut out = self.program.clone();
        for arg in &self.args {
            out.push(' ');
            out.push_str(&arg.to_string_lossy());
        }
        out
    }
}

/// Result of a finished program.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CommandOutput {
    /// Exit code, or -1 if terminated by a signal.
    pub code: i32,
    /// Captured stdout.
    pub stdout: String,
    /// Captured stderr.
    pub stderr: String,
}

impl CommandOutput {
    /// Output of a program that exited with status 0.
    pub fn ok() -> Self {
        Self::default()
    }

    /// Output of a program that exited with `code` and wrote `stderr`.
    pub fn failed(code: i32, stderr: impl Into<String>) -> Self {
        Self {
            code,
            stdout: String::new(),
            stderr: stderr.into(),
        }
    }

    /// Returns true if the program exited successfully.
    pub fn success(&self) -> bool {
        self.code == 0
    }

    /// Convert a non-zero exit into [`UpdaterError::CommandFailed`].
    pub fn ensure_success(self, step: &str) -> UpdaterResult<Self> {
        if self.success() {
            Ok(self)
        } else {
            Err(UpdaterError::CommandFailed {
                step: step.to_string(),
                code: self.code,
                stderr: self.stderr.trim().to_string(),
            })
        }
    }
}

/// Runs external programs.
pub trait CommandRunner {
    /// Run a program to completion and capture its output.
    ///
    /// A non-zero exit is reported through [`CommandOutput::code`], not as an
    /// error; only a failure to start the program is an error.
    fn run(&self, spec: &CommandSpec) -> UpdaterResult<CommandOutput>;

    /// Run a program with inherited stdio and return its exit code.
    ///
    /// Used where the child's output belongs to the user, such as a
    /// relaunched updater or a long build script.
    fn run_interactive(&self, spec: &CommandSpec) -> UpdaterResult<i32>;
}

/// [`CommandRunner`] backed by `std::process::Command`.
#[derive(Debug, Default, Clone, Copy)]
pub struct SystemRunner;

impl SystemRunner {
    /// Create a new system runner.
    pub fn new() -> Self {
        Self
    }

    fn command(spec: &CommandSpec) -> Command {
        let mut cmd = Command::new(&spec.program);
        cmd.args(&spec.args);
        if let Some(ref dir) = spec.current_dir {
            cmd.current_dir(dir);
        }
        for (key, value) in &spec.envs {
            cmd.env(key, value);
        }
        cmd
    }
}

impl CommandRunner for SystemRunner {
    fn run(&self, spec: &CommandSpec) -> UpdaterResult<CommandOutput> {
        debug!(command = %spec.display(), "running");

        let output = Self::command(spec).output().map_err(|e| {
            UpdaterError::CommandSpawnFailed {
                program: spec.program.clone(),
                source: e,
            }
        })?;

        Ok(CommandOutput {
            code: output.status.code().unwrap_or(-1),
            stdout: String::from_utf8_lossy(&output.stdout).into_owned(),
            stderr: String::from_utf8_lossy(&output.stderr).into_owned(),
        })
    }

    fn run_interactive(&self, spec: &CommandSpec) -> UpdaterResult<i32> {
        debug!(command = %spec.display(), "running interactively");

        let status = Self::command(spec).status().map_err(|e| {
            UpdaterError::CommandSpawnFailed {
                program: spec.program.clone(),
                source: e,
            }
        })?;

        Ok(status.code().unwrap_or(-1))
    }
}

/// Check that each tool can be started with `--version`.
pub fn check_required_tools<R: CommandRunner + ?Sized>(
    runner: &R,
    tools: &[&str],
) -> UpdaterResult<()> {
    for tool in tools {
        let version = CommandSpec::new(*tool).arg("--version");
        match runner.run(&version) {
            Ok(_) => debug!(tool, "found"),
            Err(UpdaterError::CommandSpawnFailed { .. }) => {
                return Err(UpdaterError::ToolMissing {
                    tool: tool.to_string(),
                })
            }
            Err(e) => return Err(e),
        }
    }
    Ok(())
}
