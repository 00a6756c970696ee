//! Run modes.

use std::fmt;
use std::str::FromStr;

use crate::error::UpdaterError;

/// Run mode requested by the caller.
///
/// Both modes run the same sequence: whether the FNA checkout is cloned or
/// pulled is decided by what is on disk. The mode only changes how the run
/// is described.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Mode {
    /// First-time installation.
    Install,
    /// Refresh of an existing installation.
    Update,
}

impl Mode {
    /// Every accepted mode token.
    pub const ALL: [Mode; 2] = [Mode::Install, Mode::Update];

    /// The token for this mode.
    pub fn as_str(&self) -> &'static str {
        match self {
            Mode::Install => "install",
            Mode::Update => "update",
        }
    }
}

impl fmt::Display for Mode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Mode {
    type Err = UpdaterError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Mode::ALL
            .into_iter()
            .find(|mode| mode.as_str().eq_ignore_ascii_case(s.trim()))
            .ok_or_else(|| UpdaterError::InvalidMode {
                token: s.to_string(),
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_modes() {
        assert_eq!("install".parse::<Mode>().unwrap(), Mode::Install);
        assert_eq!("update".parse::<Mode>().unwrap(), Mode::Update);
        assert_eq!("Update".parse::<Mode>().unwrap(), Mode::Update);
    }

    #[test]
    fn test_invalid_mode_names_token() {
        let err = "frobnicate".parse::<Mode>().unwrap_err();
        assert!(matches!(err, UpdaterError::InvalidMode { ref token } if token == "frobnicate"));
        assert_eq!(
            err.to_string(),
            "invalid mode 'frobnicate', expected one of {install, update}"
        );
    }

    #[test]
    fn test_display_round_trip() {
        for mode in Mode::ALL {
            assert_eq!(mode.to_string().parse::<Mode>().unwrap(), mode);
        }
    }
}
