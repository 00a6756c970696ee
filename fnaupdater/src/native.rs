//! Native library build pipeline.
//!
//! On macOS the prebuilt archive is complemented by libraries compiled
//! locally for macOS, iOS and the iOS simulator using the
//! `fnalibs-apple-builder` scripts. The scripts are opaque: each is run
//! with `bash` from the root of the builder checkout.
//!
//! Whether the pipeline runs is decided once, at startup, through
//! [`PlatformCapabilities`].

use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;

use tracing::{info, warn};

use crate::error::{UpdaterError, UpdaterResult};
use crate::filesystem::copy_tree;
use crate::policy::FailurePolicy;
use crate::process::{CommandRunner, CommandSpec};
use crate::repo::RepositorySynchronizer;
use crate::traits::VcsClient;

/// Script that fetches the builder's source dependencies.
pub const UPDATE_SCRIPT: &str = "updatelibs.sh";

/// Script that builds one target (or cleans, with `clean`).
pub const BUILD_SCRIPT: &str = "buildlibs.sh";

/// Build targets, in the order they are built.
pub const BUILD_TARGETS: [&str; 3] = ["macos", "ios", "ios-sim"];

/// Directory inside the builder checkout holding the produced binaries.
pub const OUTPUT_DIR: &str = "bin";

/// Configuration override for native builds.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum NativeBuild {
    /// Build only where the host supports it.
    #[default]
    Auto,
    /// Always run the pipeline.
    Always,
    /// Never run the pipeline.
    Never,
}

impl fmt::Display for NativeBuild {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            NativeBuild::Auto => write!(f, "auto"),
            NativeBuild::Always => write!(f, "always"),
            NativeBuild::Never => write!(f, "never"),
        }
    }
}

impl FromStr for NativeBuild {
    type Err = UpdaterError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "auto" => Ok(NativeBuild::Auto),
            "always" | "true" | "yes" => Ok(NativeBuild::Always),
            "never" | "false" | "no" => Ok(NativeBuild::Never),
            other => Err(UpdaterError::InvalidConfig(format!(
                "unknown native_build value '{}', expected auto, always or never",
                other
            ))),
        }
    }
}

/// What the host can do, resolved once at startup.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PlatformCapabilities {
    /// Whether native libraries should be built locally.
    pub native_build_supported: bool,
}

impl PlatformCapabilities {
    /// Detect capabilities of the running host.
    pub fn detect() -> Self {
        Self {
            native_build_supported: cfg!(target_os = "macos"),
        }
    }

    /// Resolve capabilities from the host and a configuration override.
    pub fn resolve(native_build: NativeBuild) -> Self {
        match native_build {
            NativeBuild::Auto => Self::detect(),
            NativeBuild::Always => Self {
                native_build_supported: true,
            },
            NativeBuild::Never => Self {
                native_build_supported: false,
            },
        }
    }
}

/// Outcome of [`NativeBuildPipeline::build_and_install`].
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BuildReport {
    /// Files relocated into the library directory.
    pub files_installed: usize,
    /// Steps that failed and were downgraded to warnings.
    pub warnings: usize,
}

/// Builds native libraries from source and installs them.
pub struct NativeBuildPipeline<'a, V: VcsClient + ?Sized, R: CommandRunner + ?Sized> {
    vcs: &'a V,
    runner: &'a R,
    repo_url: String,
    work_dir: PathBuf,
    policy: FailurePolicy,
}

impl<'a, V: VcsClient + ?Sized, R: CommandRunner + ?Sized> NativeBuildPipeline<'a, V, R> {
    /// Create a pipeline that checks out `repo_url` into `work_dir`.
    pub fn new(
        vcs: &'a V,
        runner: &'a R,
        repo_url: impl Into<String>,
        work_dir: impl Into<PathBuf>,
        policy: FailurePolicy,
    ) -> Self {
        Self {
            vcs,
            runner,
            repo_url: repo_url.into(),
            work_dir: work_dir.into(),
            policy,
        }
    }

    /// Path of the builder checkout.
    pub fn work_dir(&self) -> &Path {
        &self.work_dir
    }

    /// Run the build scripts and merge their output into `lib_dir`.
    pub fn build_and_install(&self, lib_dir: &Path) -> UpdaterResult<BuildReport> {
        let mut report = BuildReport::default();

        let sync = RepositorySynchronizer::new(self.vcs, self.policy).sync(
            &self.repo_url,
            &self.work_dir,
            &[],
        )?;
        report.warnings += sync.warnings;

        println!("Running FNA libs Apple update script...");
        self.step(UPDATE_SCRIPT, None, &mut report)?;

        println!("Building FNA libs...");
        for target in BUILD_TARGETS {
            self.step(BUILD_SCRIPT, Some(target), &mut report)?;
        }

        println!("Copying FNA libs...");
        let output = self.work_dir.join(OUTPUT_DIR);
        let copied = if output.is_dir() {
            copy_tree(&output, lib_dir).map(|count| {
                report.files_installed = count;
            })
        } else {
            Err(UpdaterError::ExtractionFailed {
                path: output.clone(),
                reason: "build produced no output directory".to_string(),
            })
        };
        if !self.policy.apply("relocate build output", copied)? {
            report.warnings += 1;
        }

        println!("Cleaning up...");
        self.step(BUILD_SCRIPT, Some("clean"), &mut report)?;

        if report.warnings > 0 {
            warn!(warnings = report.warnings, "native build finished with warnings");
        } else {
            info!(files = report.files_installed, "native build installed");
        }
        Ok(report)
    }

    /// Run one script from the builder checkout.
    fn step(
        &self,
        script: &str,
        target: Option<&str>,
        report: &mut BuildReport,
    ) -> UpdaterResult<()> {
        let mut spec = CommandSpec::new("bash")
            .arg(self.work_dir.join(script))
            .current_dir(&self.work_dir);
        let name = match target {
            Some(target) => {
                spec = spec.arg(target);
                format!("{} {}", script, target)
            }
            None => script.to_string(),
        };

        let result = self
            .runner
            .run_interactive(&spec)
            .and_then(|code| {
                if code == 0 {
                    Ok(())
                } else {
                    Err(UpdaterError::CommandFailed {
                        step: name.clone(),
                        code,
                        stderr: String::new(),
                    })
                }
            });

        if !self.policy.apply(&name, result)? {
            report.warnings += 1;
        }
        Ok(())
    }
}
