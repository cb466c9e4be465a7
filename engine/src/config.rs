//! Engine configuration loaded from environment variables.

use crate::gate::Passcode;
use std::env;
use std::path::PathBuf;

/// Session configuration.
#[derive(Debug, Clone)]
pub struct Config {
    /// Code unlocking the session
    pub passcode: Passcode,
    /// Directory holding the Local Store files
    pub data_dir: PathBuf,
    /// Base URL of `tally-server`; `None` keeps the session local-only
    pub remote_url: Option<String>,
}

impl Config {
    /// Load configuration from the process environment.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Load configuration through an arbitrary variable lookup.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let passcode = lookup("TALLY_PASSCODE")
            .ok_or(ConfigError::MissingPasscode)?
            .trim()
            .parse()
            .map_err(|_| ConfigError::InvalidPasscode)?;

        let data_dir = lookup("TALLY_DATA_DIR")
            .filter(|dir| !dir.trim().is_empty())
            .unwrap_or_else(|| "./data".to_string())
            .into();

        let remote_url = lookup("TALLY_REMOTE_URL").filter(|url| !url.trim().is_empty());

        Ok(Self {
            passcode,
            data_dir,
            remote_url,
        })
    }
}

/// Configuration errors.
#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("TALLY_PASSCODE environment variable is required")]
    MissingPasscode,

    #[error("TALLY_PASSCODE must be exactly four digits")]
    InvalidPasscode,
}
