//! FnaUpdater CLI - Command-line interface
//!
//! Installs or updates FNA and its native libraries into a project
//! directory:
//!
//! ```text
//! fnaupdater install ./MyGame .fna
//! fnaupdater update ./MyGame .fna
//! ```

mod error;
mod progress;

use std::path::PathBuf;
use std::process;

use clap::{ArgAction, Parser, ValueEnum};
use fnaupdater::archive::HttpDownloader;
use fnaupdater::{
    Bootstrapper, ConfigFile, FailurePolicy, Mode, NativeBuild, RunOutcome, UpdaterConfig,
};
use tracing::{debug, warn};
use tracing_subscriber::EnvFilter;

use crate::error::CliError;

#[derive(Parser)]
#[command(name = "fnaupdater")]
#[command(version)]
#[command(about = "Install or update FNA and its native libraries", long_about = None)]
struct Cli {
    /// Increase log verbosity (-v info, -vv debug)
    #[arg(short, long, action = ArgAction::Count)]
    verbose: u8,

    /// Configuration file (defaults to the per-user config.ini when present)
    #[arg(long, value_name = "FILE")]
    config: Option<PathBuf>,

    /// Abort on the first failed git, tar or build step instead of warning
    #[arg(long)]
    strict: bool,

    /// Run in the current process instead of relaunching from the
    /// environment under the target directory
    #[arg(long)]
    no_isolate: bool,

    /// Whether to build native libraries from source
    #[arg(long, value_enum, value_name = "WHEN")]
    native_build: Option<NativeBuildArg>,

    /// Run mode: install or update
    mode: String,

    /// Project directory
    directory: PathBuf,

    /// Sub-directory of DIRECTORY to install into
    subdir: Option<PathBuf>,
}

/// Native build selection for CLI arguments.
#[derive(Debug, Clone, Copy, ValueEnum)]
enum NativeBuildArg {
    /// Build only where the host supports it (macOS)
    Auto,
    /// Always build
    Always,
    /// Never build
    Never,
}

impl From<NativeBuildArg> for NativeBuild {
    fn from(arg: NativeBuildArg) -> Self {
        match arg {
            NativeBuildArg::Auto => NativeBuild::Auto,
            NativeBuildArg::Always => NativeBuild::Always,
            NativeBuildArg::Never => NativeBuild::Never,
        }
    }
}

impl Cli {
    fn target_dir(&self) -> PathBuf {
        match self.subdir {
            Some(ref sub) => self.directory.join(sub),
            None => self.directory.clone(),
        }
    }
}

fn init_logging(verbose: u8) {
    let level = match verbose {
        0 => "warn",
        1 => "info",
        _ => "debug",
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .try_init()
        .ok();
}

fn load_config(cli: &Cli) -> Result<UpdaterConfig, CliError> {
    let file = match cli.config {
        Some(ref path) => {
            if !path.is_file() {
                return Err(CliError::ConfigNotFound(path.clone()));
            }
            Some(ConfigFile::load(path)?)
        }
        None => ConfigFile::load_default()?,
    };

    let mut config = UpdaterConfig::new(cli.target_dir());
    if let Some(ref file) = file {
        config = config.with_file(file);
    }
    // Flags override file values
    if cli.strict {
        config = config.with_failure_policy(FailurePolicy::Abort);
    }
    if cli.no_isolate {
        config = config.with_isolation(false);
    }
    if let Some(native_build) = cli.native_build {
        config = config.with_native_build(native_build.into());
    }
    Ok(config)
}

fn run(cli: Cli) -> Result<i32, CliError> {
    // Validate before touching the filesystem
    let mode: Mode = cli.mode.parse()?;
    let config = load_config(&cli)?;
    debug!(?config, "resolved configuration");

    let downloader = HttpDownloader::with_timeout(config.http_timeout)?
        .with_progress(progress::download_progress());
    let bootstrapper = Bootstrapper::new(config)?.with_downloader(downloader);

    match bootstrapper.run(mode)? {
        RunOutcome::Completed(report) => {
            let warnings = report.warnings();
            if warnings > 0 {
                warn!(warnings, "some steps failed and were skipped");
            }
            println!("Done!");
            Ok(0)
        }
        RunOutcome::Relaunched(code) => Ok(code),
    }
}

fn main() {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    match run(cli) {
        Ok(code) => process::exit(code),
        Err(e) => {
            eprintln!("Error: {}", e);
            process::exit(e.exit_code());
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cli_definition_is_valid() {
        use clap::CommandFactory;
        Cli::command().debug_assert();
    }

    #[test]
    fn test_subdir_joins_directory() {
        let cli = Cli::parse_from(["fnaupdater", "install", "/tmp/game", ".fna"]);
        assert_eq!(cli.target_dir(), PathBuf::from("/tmp/game/.fna"));

        let cli = Cli::parse_from(["fnaupdater", "update", "/tmp/game"]);
        assert_eq!(cli.target_dir(), PathBuf::from("/tmp/game"));
    }

    #[test]
    fn test_flags_override_defaults() {
        let cli = Cli::parse_from([
            "fnaupdater",
            "--config",
            "/nonexistent/fnaupdater.ini",
            "install",
            "/tmp/game",
        ]);
        assert!(matches!(
            load_config(&cli),
            Err(CliError::ConfigNotFound(_))
        ));

        let cli = Cli::parse_from([
            "fnaupdater",
            "--strict",
            "--no-isolate",
            "--native-build",
            "never",
            "install",
            "/tmp/game",
        ]);
        assert!(cli.strict);
        assert!(cli.no_isolate);
        assert!(matches!(cli.native_build, Some(NativeBuildArg::Never)));
    }

    #[test]
    fn test_mode_is_not_validated_by_clap() {
        // Invalid modes must reach the library so they exit with status 1
        let cli = Cli::try_parse_from(["fnaupdater", "frobnicate", "/tmp/game"]);
        assert!(cli.is_ok());
    }
}
