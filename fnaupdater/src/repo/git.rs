//! [`VcsClient`] implementation that shells out to `git`.

use std::path::Path;

use crate::error::{UpdaterError, UpdaterResult};
use crate::filesystem::is_checkout;
use crate::process::{CommandRunner, CommandSpec, SystemRunner};
use crate::traits::VcsClient;

/// Git command-line client.
#[derive(Debug, Clone)]
pub struct GitCli<R: CommandRunner = SystemRunner> {
    runner: R,
}

impl Default for GitCli<SystemRunner> {
    fn default() -> Self {
        Self::new(SystemRunner::new())
    }
}

impl<R: CommandRunner> GitCli<R> {
    /// Create a git client running commands through `runner`.
    pub fn new(runner: R) -> Self {
        Self { runner }
    }

    /// Run `git -C <path> <args>` and require a zero exit.
    fn run_in(&self, path: &Path, args: &[&str], step: &str) -> UpdaterResult<()> {
        // `-C` alone would let git walk up into an enclosing repository.
        if !is_checkout(path) {
            return Err(UpdaterError::NotACheckout {
                path: path.to_path_buf(),
            });
        }

        let spec = CommandSpec::new("git").arg("-C").arg(path).args(args.iter().copied());
        self.runner.run(&spec)?.ensure_success(step)?;
        Ok(())
    }
}

impl<R: CommandRunner> VcsClient for GitCli<R> {
    fn clone_repo(&self, url: &str, path: &Path, options: &[String]) -> UpdaterResult<()> {
        let spec = CommandSpec::new("git")
            .arg("clone")
            .args(options.iter().map(String::as_str))
            .arg(url)
            .arg(path);
        self.runner.run(&spec)?.ensure_success("git clone")?;
        Ok(())
    }

    fn pull(&self, path: &Path) -> UpdaterResult<()> {
        self.run_in(path, &["pull", "origin"], "git pull")
    }

    fn update_submodules(&self, path: &Path) -> UpdaterResult<()> {
        self.run_in(
            path,
            &["submodule", "update", "--init", "--recursive"],
            "git submodule update",
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::RefCell;
    use std::ffi::OsString;
    use std::fs;
    use tempfile::TempDir;

    use crate::process::CommandOutput;

    #[derive(Default)]
    struct RecordingRunner {
        calls: RefCell<Vec<CommandSpec>>,
        code: i32,
    }

    impl CommandRunner for RecordingRunner {
        fn run(&self, spec: &CommandSpec) -> UpdaterResult<CommandOutput> {
            self.calls.borrow_mut().push(spec.clone());
            Ok(CommandOutput::failed(self.code, "boom"))
        }

        fn run_interactive(&self, spec: &CommandSpec) -> UpdaterResult<i32> {
            self.calls.borrow_mut().push(spec.clone());
            Ok(self.code)
        }
    }

    fn args(spec: &CommandSpec) -> Vec<String> {
        spec.args
            .iter()
            .map(|a: &OsString| a.to_string_lossy().into_owned())
            .collect()
    }

    #[test]
    fn test_clone_passes_options_before_url() {
        let temp = TempDir::new().unwrap();
        let git = GitCli::new(RecordingRunner::default());
        let dest = temp.path().join("FNA");

        git.clone_repo(
            "https://github.com/FNA-XNA/FNA",
            &dest,
            &["--recursive".to_string()],
        )
        .unwrap();

        let calls = git.runner.calls.borrow();
        assert_eq!(calls.len(), 1);
        assert_eq!(calls[0].program, "git");
        assert_eq!(
            args(&calls[0]),
            vec![
                "clone".to_string(),
                "--recursive".to_string(),
                "https://github.com/FNA-XNA/FNA".to_string(),
                dest.to_string_lossy().into_owned(),
            ]
        );
    }

    #[test]
    fn test_pull_refuses_non_checkout() {
        let temp = TempDir::new().unwrap();
        let git = GitCli::new(RecordingRunner::default());

        let result = git.pull(temp.path());

        assert!(matches!(result, Err(UpdaterError::NotACheckout { .. })));
        assert!(git.runner.calls.borrow().is_empty());
    }

    #[test]
    fn test_submodule_update_command() {
        let temp = TempDir::new().unwrap();
        fs::create_dir(temp.path().join(".git")).unwrap();
        let git = GitCli::new(RecordingRunner::default());

        git.update_submodules(temp.path()).unwrap();

        let calls = git.runner.calls.borrow();
        let rendered = args(&calls[0]);
        assert_eq!(rendered[0], "-C");
        assert_eq!(
            &rendered[2..],
            &["submodule", "update", "--init", "--recursive"]
        );
    }

    #[test]
    fn test_non_zero_exit_is_error() {
        let temp = TempDir::new().unwrap();
        fs::create_dir(temp.path().join(".git")).unwrap();
        let git = GitCli::new(RecordingRunner {
            code: 1,
            ..Default::default()
        });

        let err = git.pull(temp.path()).unwrap_err();
        assert!(matches!(err, UpdaterError::CommandFailed { code: 1, .. }));
    }
}
