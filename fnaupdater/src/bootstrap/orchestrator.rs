//! The bootstrap sequence.
//!
//! ```text
//! PrepareRoot → EnsureEnvironment → InstallTooling → SyncPrimaryRepo
//!             → PrepareLibDir → InstallLibs → Done
//! ```
//!
//! Steps run strictly one after another; each blocks until every external
//! program it starts has exited. Running two bootstrappers against the same
//! root at once is not supported.

use std::path::PathBuf;

use tracing::{debug, info};

use super::mode::Mode;
use crate::archive::{ArchiveFetcher, FetchReport, HttpDownloader, ShellExtractor};
use crate::config::UpdaterConfig;
use crate::environment::{ProcessEnvironment, RuntimeEnvironment};
use crate::error::UpdaterResult;
use crate::filesystem::{ensure_directory, is_checkout, remove_entry};
use crate::native::{BuildReport, NativeBuildPipeline, PlatformCapabilities};
use crate::process::{check_required_tools, CommandRunner, SystemRunner};
use crate::repo::{GitCli, RepositorySynchronizer, SyncReport};
use crate::traits::{ArchiveExtractor, Downloader, VcsClient};

/// Callback invoked when the bootstrapper enters a stage.
///
/// Arguments: (stage, human-readable message).
pub type StageCallback = Box<dyn Fn(BootstrapStage, &str) + Send + Sync>;

/// Stages of a bootstrap run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BootstrapStage {
    /// Making sure the target directory exists.
    PrepareRoot,
    /// Entering the isolated environment.
    EnsureEnvironment,
    /// Checking helper tools.
    InstallTooling,
    /// Cloning or pulling FNA.
    SyncPrimaryRepo,
    /// Clearing the native library directory.
    PrepareLibDir,
    /// Downloading and (where supported) building native libraries.
    InstallLibs,
    /// Run complete.
    Done,
}

impl BootstrapStage {
    /// Get a human-readable name for the stage.
    pub fn name(&self) -> &'static str {
        match self {
            Self::PrepareRoot => "Preparing directory",
            Self::EnsureEnvironment => "Setting up environment",
            Self::InstallTooling => "Checking tools",
            Self::SyncPrimaryRepo => "Synchronising FNA",
            Self::PrepareLibDir => "Preparing library directory",
            Self::InstallLibs => "Installing native libraries",
            Self::Done => "Done",
        }
    }
}

/// Summary of a completed run.
#[derive(Debug, Clone)]
pub struct BootstrapReport {
    /// Mode the run was started with.
    pub mode: Mode,
    /// Installation root.
    pub root: PathBuf,
    /// FNA checkout synchronisation.
    pub sync: SyncReport,
    /// Archive download and extraction.
    pub fetch: FetchReport,
    /// Native build, when the platform supports it.
    pub native: Option<BuildReport>,
}

impl BootstrapReport {
    /// Total number of external failures downgraded to warnings.
    pub fn warnings(&self) -> usize {
        self.sync.warnings
            + usize::from(self.fetch.files_extracted.is_none())
            + self.native.as_ref().map_or(0, |n| n.warnings)
    }
}

/// How a run ended.
#[derive(Debug)]
pub enum RunOutcome {
    /// This process performed the whole sequence.
    Completed(BootstrapReport),
    /// The sequence ran in a relaunched child that exited with this code.
    Relaunched(i32),
}

/// Top-level installer/updater.
pub struct Bootstrapper {
    config: UpdaterConfig,
    capabilities: PlatformCapabilities,
    vcs: Box<dyn VcsClient>,
    downloader: Box<dyn Downloader>,
    extractor: Box<dyn ArchiveExtractor>,
    runner: Box<dyn CommandRunner>,
    environment: Box<dyn RuntimeEnvironment>,
    on_stage: Option<StageCallback>,
}

impl Bootstrapper {
    /// Create a bootstrapper using the system's git, tar and HTTP stack.
    pub fn new(config: UpdaterConfig) -> UpdaterResult<Self> {
        let capabilities = PlatformCapabilities::resolve(config.native_build);
        let downloader = HttpDownloader::with_timeout(config.http_timeout)?;
        let environment = ProcessEnvironment::current()?;

        Ok(Self {
            config,
            capabilities,
            vcs: Box::new(GitCli::default()),
            downloader: Box::new(downloader),
            extractor: Box::new(ShellExtractor::new()),
            runner: Box::new(SystemRunner::new()),
            environment: Box::new(environment),
            on_stage: None,
        })
    }

    /// Replace the version-control client.
    pub fn with_vcs(mut self, vcs: impl VcsClient + 'static) -> Self {
        self.vcs = Box::new(vcs);
        self
    }

    /// Replace the archive downloader.
    pub fn with_downloader(mut self, downloader: impl Downloader + 'static) -> Self {
        self.downloader = Box::new(downloader);
        self
    }

    /// Replace the archive extractor.
    pub fn with_extractor(mut self, extractor: impl ArchiveExtractor + 'static) -> Self {
        self.extractor = Box::new(extractor);
        self
    }

    /// Replace the runner used for tool checks and build scripts.
    pub fn with_runner(mut self, runner: impl CommandRunner + 'static) -> Self {
        self.runner = Box::new(runner);
        self
    }

    /// Replace the runtime environment.
    pub fn with_environment(mut self, environment: impl RuntimeEnvironment + 'static) -> Self {
        self.environment = Box::new(environment);
        self
    }

    /// Override the detected platform capabilities.
    pub fn with_capabilities(mut self, capabilities: PlatformCapabilities) -> Self {
        self.capabilities = capabilities;
        self
    }

    /// Report stage transitions through `callback`.
    pub fn with_stage_callback(mut self, callback: StageCallback) -> Self {
        self.on_stage = Some(callback);
        self
    }

    /// The configuration this bootstrapper runs with.
    pub fn config(&self) -> &UpdaterConfig {
        &self.config
    }

    fn enter(&self, stage: BootstrapStage, message: &str) {
        info!(stage = stage.name(), "{}", message);
        if let Some(ref cb) = self.on_stage {
            cb(stage, message);
        }
    }

    /// Run the full sequence.
    pub fn run(&self, mode: Mode) -> UpdaterResult<RunOutcome> {
        let config = &self.config;
        let policy = config.failure_policy;
        let root = &config.root;

        self.enter(
            BootstrapStage::PrepareRoot,
            &format!("Preparing {} ({})", root.display(), mode),
        );
        ensure_directory(root, true, true)?;

        if let Some(code) = self.ensure_environment()? {
            return Ok(RunOutcome::Relaunched(code));
        }

        self.enter(BootstrapStage::InstallTooling, "Checking required tools...");
        let mut tools = vec!["git", "tar"];
        if self.capabilities.native_build_supported {
            tools.push("bash");
        }
        check_required_tools(&*self.runner, &tools)?;

        self.enter(BootstrapStage::SyncPrimaryRepo, "Synchronising FNA...");
        let repo_dir = config.repo_dir();
        if mode == Mode::Update && !is_checkout(&repo_dir) {
            info!(path = %repo_dir.display(), "no existing checkout to update, cloning");
        }
        let sync = RepositorySynchronizer::new(&*self.vcs, policy).sync(
            &config.fna_repo_url,
            &repo_dir,
            &config.clone_options,
        )?;

        self.enter(
            BootstrapStage::PrepareLibDir,
            "Preparing native library directory...",
        );
        let libs_dir = config.libs_dir();
        remove_entry(&libs_dir)?;
        ensure_directory(&libs_dir, true, true)?;

        self.enter(BootstrapStage::InstallLibs, "Installing native libraries...");
        let fetch = ArchiveFetcher::new(&*self.downloader, &*self.extractor, policy)
            .fetch_and_extract(&config.fna_libs_url, root, &libs_dir)?;

        let native = if self.capabilities.native_build_supported {
            let pipeline = NativeBuildPipeline::new(
                &*self.vcs,
                &*self.runner,
                &config.apple_builder_repo_url,
                config.builder_dir(),
                policy,
            );
            Some(pipeline.build_and_install(&libs_dir)?)
        } else {
            debug!("native build not supported on this host");
            None
        };

        let report = BootstrapReport {
            mode,
            root: root.clone(),
            sync,
            fetch,
            native,
        };
        self.enter(BootstrapStage::Done, "Done!");
        Ok(RunOutcome::Completed(report))
    }

    /// Enter the isolated environment, relaunching if needed.
    ///
    /// Returns the child's exit code when the rest of the run happened in a
    /// relaunched process.
    fn ensure_environment(&self) -> UpdaterResult<Option<i32>> {
        self.enter(BootstrapStage::EnsureEnvironment, "Setting up environment...");

        if !self.config.isolate {
            debug!("isolation disabled");
            return Ok(None);
        }
        if self.environment.is_isolated() {
            println!("  Already in isolated environment!");
            return Ok(None);
        }

        let env_dir = self.config.env_dir();
        self.environment.prepare(&env_dir)?;
        let code = self.environment.relaunch(&env_dir)?;
        info!(code, "relaunched updater exited");
        Ok(Some(code))
    }
}
