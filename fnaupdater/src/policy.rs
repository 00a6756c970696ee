//! Handling of failed external steps.
//!
//! Pulls, submodule updates, archive extraction and native build scripts
//! historically ran without their exit status being checked. The policy
//! decides whether such a failure is reported and skipped or ends the run.

use std::fmt;
use std::str::FromStr;

use tracing::warn;

use crate::error::{UpdaterError, UpdaterResult};

/// What to do when an external step fails.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum FailurePolicy {
    /// Log a warning naming the step and continue the run.
    #[default]
    Warn,
    /// Stop the run with the step's error.
    Abort,
}

impl FailurePolicy {
    /// Apply the policy to the result of `step`.
    ///
    /// Returns `Ok(true)` when the step succeeded, `Ok(false)` when it failed
    /// and was downgraded to a warning.
    pub fn apply(self, step: &str, result: UpdaterResult<()>) -> UpdaterResult<bool> {
        match (self, result) {
            (_, Ok(())) => Ok(true),
            (FailurePolicy::Warn, Err(e)) => {
                warn!(step, error = %e, "step failed, continuing");
                Ok(false)
            }
            (FailurePolicy::Abort, Err(e)) => Err(e),
        }
    }
}

impl fmt::Display for FailurePolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FailurePolicy::Warn => write!(f, "warn"),
            FailurePolicy::Abort => write!(f, "abort"),
        }
    }
}

impl FromStr for FailurePolicy {
    type Err = UpdaterError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "warn" => Ok(FailurePolicy::Warn),
            "abort" | "strict" => Ok(FailurePolicy::Abort),
            other => Err(UpdaterError::InvalidConfig(format!(
                "unknown failure policy '{}', expected warn or abort",
                other
            ))),
        }
    }
}
