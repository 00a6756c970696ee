//! Configuration for the updater.
//!
//! [`UpdaterConfig`] is what the bootstrapper consumes. [`ConfigFile`] is an
//! optional INI file the CLI layers underneath its own flags:
//!
//! ```ini
//! [sources]
//! fna_repo = https://github.com/FNA-XNA/FNA
//! fna_libs = https://fna.flibitijibibo.com/archive/fnalibs.tar.bz2
//! apple_builder_repo = https://github.com/TheSpydog/fnalibs-apple-builder
//!
//! [behaviour]
//! failure_policy = warn
//! isolate = true
//! native_build = auto
//! http_timeout_secs = 0
//! ```

use std::path::{Path, PathBuf};
use std::time::Duration;

use ini::Ini;

use crate::error::{UpdaterError, UpdaterResult};
use crate::native::NativeBuild;
use crate::policy::FailurePolicy;

/// Default FNA repository.
pub const DEFAULT_FNA_REPO: &str = "https://github.com/FNA-XNA/FNA";

/// Default prebuilt native library archive.
pub const DEFAULT_FNA_LIBS_URL: &str = "https://fna.flibitijibibo.com/archive/fnalibs.tar.bz2";

/// Default Apple native library builder repository.
pub const DEFAULT_APPLE_BUILDER_REPO: &str = "https://github.com/TheSpydog/fnalibs-apple-builder";

/// Configuration for a bootstrap run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UpdaterConfig {
    /// Installation root (the target directory).
    pub root: PathBuf,

    /// Name of the FNA checkout under `root`.
    pub repo_dir_name: String,

    /// Name of the native library directory under `root`.
    pub libs_dir_name: String,

    /// Name of the isolated environment directory under `root`.
    pub env_dir_name: String,

    /// Name of the Apple builder checkout under `root`.
    pub builder_dir_name: String,

    /// FNA repository URL.
    pub fna_repo_url: String,

    /// Native library archive URL.
    pub fna_libs_url: String,

    /// Apple builder repository URL.
    pub apple_builder_repo_url: String,

    /// Extra flags for cloning the FNA repository.
    pub clone_options: Vec<String>,

    /// What to do when an external step fails.
    pub failure_policy: FailurePolicy,

    /// Whether to relaunch inside an isolated environment.
    pub isolate: bool,

    /// Native build override.
    pub native_build: NativeBuild,

    /// HTTP timeout; `None` waits indefinitely.
    pub http_timeout: Option<Duration>,
}

impl Default for UpdaterConfig {
    fn default() -> Self {
        Self {
            root: PathBuf::from(".fna"),
            repo_dir_name: "FNA".to_string(),
            libs_dir_name: "fnalibs".to_string(),
            env_dir_name: ".venv".to_string(),
            builder_dir_name: "fnalibs-apple-builder".to_string(),
            fna_repo_url: DEFAULT_FNA_REPO.to_string(),
            fna_libs_url: DEFAULT_FNA_LIBS_URL.to_string(),
            apple_builder_repo_url: DEFAULT_APPLE_BUILDER_REPO.to_string(),
            clone_options: vec!["--recursive".to_string()],
            failure_policy: FailurePolicy::Warn,
            isolate: true,
            native_build: NativeBuild::Auto,
            http_timeout: None,
        }
    }
}

impl UpdaterConfig {
    /// Create a new configuration rooted at `root`.
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self {
            root: root.into(),
            ..Default::default()
        }
    }

    /// Set the FNA repository URL.
    pub fn with_fna_repo(mut self, url: impl Into<String>) -> Self {
        self.fna_repo_url = url.into();
        self
    }

    /// Set the native library archive URL.
    pub fn with_fna_libs(mut self, url: impl Into<String>) -> Self {
        self.fna_libs_url = url.into();
        self
    }

    /// Set the Apple builder repository URL.
    pub fn with_apple_builder_repo(mut self, url: impl Into<String>) -> Self {
        self.apple_builder_repo_url = url.into();
        self
    }

    /// Set the failure policy.
    pub fn with_failure_policy(mut self, policy: FailurePolicy) -> Self {
        self.failure_policy = policy;
        self
    }

    /// Enable or disable the isolated environment.
    pub fn with_isolation(mut self, isolate: bool) -> Self {
        self.isolate = isolate;
        self
    }

    /// Set the native build override.
    pub fn with_native_build(mut self, native_build: NativeBuild) -> Self {
        self.native_build = native_build;
        self
    }

    /// Set the HTTP timeout.
    pub fn with_http_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.http_timeout = timeout;
        self
    }

    /// Apply the values present in `file`.
    pub fn with_file(mut self, file: &ConfigFile) -> Self {
        if let Some(ref url) = file.fna_repo {
            self.fna_repo_url = url.clone();
        }
        if let Some(ref url) = file.fna_libs {
            self.fna_libs_url = url.clone();
        }
        if let Some(ref url) = file.apple_builder_repo {
            self.apple_builder_repo_url = url.clone();
        }
        if let Some(policy) = file.failure_policy {
            self.failure_policy = policy;
        }
        if let Some(isolate) = file.isolate {
            self.isolate = isolate;
        }
        if let Some(native_build) = file.native_build {
            self.native_build = native_build;
        }
        if let Some(timeout) = file.http_timeout {
            self.http_timeout = timeout;
        }
        self
    }

    /// Path of the FNA checkout.
    pub fn repo_dir(&self) -> PathBuf {
        self.root.join(&self.repo_dir_name)
    }

    /// Path of the native library directory.
    pub fn libs_dir(&self) -> PathBuf {
        self.root.join(&self.libs_dir_name)
    }

    /// Path of the isolated environment.
    pub fn env_dir(&self) -> PathBuf {
        self.root.join(&self.env_dir_name)
    }

    /// Path of the Apple builder checkout.
    pub fn builder_dir(&self) -> PathBuf {
        self.root.join(&self.builder_dir_name)
    }
}

/// Values read from an INI configuration file.
///
/// Every field is optional; absent keys leave the defaults alone.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ConfigFile {
    pub fna_repo: Option<String>,
    pub fna_libs: Option<String>,
    pub apple_builder_repo: Option<String>,
    pub failure_policy: Option<FailurePolicy>,
    pub isolate: Option<bool>,
    pub native_build: Option<NativeBuild>,
    /// `Some(None)` disables the timeout (`http_timeout_secs = 0`).
    pub http_timeout: Option<Option<Duration>>,
}

/// Default location of the configuration file, if a config directory exists.
pub fn default_config_path() -> Option<PathBuf> {
    dirs::config_dir().map(|dir| dir.join("fnaupdater").join("config.ini"))
}

impl ConfigFile {
    /// Load the file at `path`.
    pub fn load(path: &Path) -> UpdaterResult<Self> {
        let ini = Ini::load_from_file(path).map_err(|e| {
            UpdaterError::InvalidConfig(format!("cannot read {}: {}", path.display(), e))
        })?;
        Self::from_ini(&ini)
    }

    /// Load the default file if it exists.
    pub fn load_default() -> UpdaterResult<Option<Self>> {
        match default_config_path() {
            Some(path) if path.is_file() => Self::load(&path).map(Some),
            _ => Ok(None),
        }
    }

    /// Parse configuration from INI text.
    pub fn parse(text: &str) -> UpdaterResult<Self> {
        let ini = Ini::load_from_str(text)
            .map_err(|e| UpdaterError::InvalidConfig(format!("malformed INI: {}", e)))?;
        Self::from_ini(&ini)
    }

    fn from_ini(ini: &Ini) -> UpdaterResult<Self> {
        let get = |section: &str, key: &str| -> Option<String> {
            ini.section(Some(section))
                .and_then(|s| s.get(key))
                .map(|v| v.trim().to_string())
                .filter(|v| !v.is_empty())
        };

        let isolate = get("behaviour", "isolate")
            .map(|v| parse_bool("behaviour.isolate", &v))
            .transpose()?;

        let http_timeout = get("behaviour", "http_timeout_secs")
            .map(|v| {
                v.parse::<u64>()
                    .map(|secs| (secs > 0).then(|| Duration::from_secs(secs)))
                    .map_err(|_| {
                        UpdaterError::InvalidConfig(format!(
                            "behaviour.http_timeout_secs must be a number of seconds, got '{}'",
                            v
                        ))
                    })
            })
            .transpose()?;

        Ok(Self {
            fna_repo: get("sources", "fna_repo"),
            fna_libs: get("sources", "fna_libs"),
            apple_builder_repo: get("sources", "apple_builder_repo"),
            failure_policy: get("behaviour", "failure_policy")
                .map(|v| v.parse())
                .transpose()?,
            isolate,
            native_build: get("behaviour", "native_build")
                .map(|v| v.parse())
                .transpose()?,
            http_timeout,
        })
    }
}

fn parse_bool(key: &str, value: &str) -> UpdaterResult<bool> {
    match value.to_lowercase().as_str() {
        "true" | "yes" | "1" | "on" => Ok(true),
        "false" | "no" | "0" | "off" => Ok(false),
        _ => Err(UpdaterError::InvalidConfig(format!(
            "{} must be true or false, got '{}'",
            key, value
        ))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = UpdaterConfig::default();
        assert_eq!(config.fna_repo_url, DEFAULT_FNA_REPO);
        assert_eq!(config.clone_options, vec!["--recursive".to_string()]);
        assert_eq!(config.failure_policy, FailurePolicy::Warn);
        assert!(config.isolate);
        assert!(config.http_timeout.is_none());
    }

    #[test]
    fn test_sub_paths() {
        let config = UpdaterConfig::new("/project/.fna");
        assert_eq!(config.repo_dir(), PathBuf::from("/project/.fna/FNA"));
        assert_eq!(config.libs_dir(), PathBuf::from("/project/.fna/fnalibs"));
        assert_eq!(config.env_dir(), PathBuf::from("/project/.fna/.venv"));
        assert_eq!(
            config.builder_dir(),
            PathBuf::from("/project/.fna/fnalibs-apple-builder")
        );
    }

    #[test]
    fn test_builder_pattern() {
        let config = UpdaterConfig::new("/tmp/fna")
            .with_fna_repo("https://mirror.example.com/FNA")
            .with_failure_policy(FailurePolicy::Abort)
            .with_isolation(false)
            .with_native_build(NativeBuild::Never)
            .with_http_timeout(Some(Duration::from_secs(60)));

        assert_eq!(config.fna_repo_url, "https://mirror.example.com/FNA");
        assert_eq!(config.failure_policy, FailurePolicy::Abort);
        assert!(!config.isolate);
        assert_eq!(config.native_build, NativeBuild::Never);
        assert_eq!(config.http_timeout, Some(Duration::from_secs(60)));
    }

    #[test]
    fn test_parse_config_file() {
        let file = ConfigFile::parse(
            "[sources]\n\
             fna_libs = https://mirror.example.com/fnalibs.tar.bz2\n\
             [behaviour]\n\
             failure_policy = abort\n\
             isolate = false\n\
             native_build = never\n\
             http_timeout_secs = 0\n",
        )
        .unwrap();

        assert_eq!(file.fna_repo, None);
        assert_eq!(
            file.fna_libs.as_deref(),
            Some("https://mirror.example.com/fnalibs.tar.bz2")
        );
        assert_eq!(file.failure_policy, Some(FailurePolicy::Abort));
        assert_eq!(file.isolate, Some(false));
        assert_eq!(file.native_build, Some(NativeBuild::Never));
        assert_eq!(file.http_timeout, Some(None));

        let config = UpdaterConfig::new("/tmp/fna").with_file(&file);
        assert_eq!(config.fna_repo_url, DEFAULT_FNA_REPO);
        assert_eq!(config.fna_libs_url, "https://mirror.example.com/fnalibs.tar.bz2");
        assert!(!config.isolate);
    }

    #[test]
    fn test_parse_rejects_bad_values() {
        assert!(ConfigFile::parse("[behaviour]\nisolate = maybe\n").is_err());
        assert!(ConfigFile::parse("[behaviour]\nhttp_timeout_secs = soon\n").is_err());
        assert!(ConfigFile::parse("[behaviour]\nfailure_policy = shrug\n").is_err());
    }

    #[test]
    fn test_empty_file_changes_nothing() {
        let file = ConfigFile::parse("").unwrap();
        assert_eq!(file, ConfigFile::default());
        assert_eq!(
            UpdaterConfig::new("/x").with_file(&file),
            UpdaterConfig::new("/x")
        );
    }

    #[test]
    fn test_load_from_disk() {
        let temp = tempfile::TempDir::new().unwrap();
        let path = temp.path().join("config.ini");
        std::fs::write(&path, "[behaviour]\nhttp_timeout_secs = 120\n").unwrap();

        let file = ConfigFile::load(&path).unwrap();
        assert_eq!(file.http_timeout, Some(Some(Duration::from_secs(120))));

        assert!(ConfigFile::load(&temp.path().join("missing.ini")).is_err());
    }
}
