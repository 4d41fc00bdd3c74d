//! Process configuration read from the environment.
//!
//! | Variable              | Meaning                          | Default            |
//! |-----------------------|----------------------------------|--------------------|
//! | `FIELDBOOK_DB_PATH`   | SQLite store file                | in-memory store    |
//! | `FIELDBOOK_LOG_LEVEL` | trace, debug, info, warn, error  | by build mode      |
//! | `FIELDBOOK_LOG_DIR`   | absolute directory for log files | logging disabled   |
//!
//! Backup and restore need a store that outlives the process, so they call
//! [`CoreConfig::require_db_path`] instead of falling back to memory.

use crate::logging::{default_log_level, init_logging, LogLevel};
use std::error::Error;
use std::fmt::{Display, Formatter};
use std::path::{Path, PathBuf};

pub const DB_PATH_VAR: &str = "FIELDBOOK_DB_PATH";
pub const LOG_LEVEL_VAR: &str = "FIELDBOOK_LOG_LEVEL";
pub const LOG_DIR_VAR: &str = "FIELDBOOK_LOG_DIR";

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConfigError {
    InvalidValue { variable: &'static str, message: String },
    /// The operation needs a value that was not provided.
    Missing { variable: &'static str },
}

impl Display for ConfigError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::InvalidValue { variable, message } => write!(f, "{variable}: {message}"),
            Self::Missing { variable } => write!(f, "{variable} must be set for this command"),
        }
    }
}

impl Error for ConfigError {}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CoreConfig {
    /// `None` selects an in-memory store.
    pub db_path: Option<PathBuf>,
    pub log_level: LogLevel,
    /// `None` leaves logging uninitialized.
    pub log_dir: Option<PathBuf>,
}

impl Default for CoreConfig {
    fn default() -> Self {
        Self {
            db_path: None,
            log_level: default_log_level(),
            log_dir: None,
        }
    }
}

impl CoreConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Builds a config from any variable source; blank values count as unset.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let read = |name: &str| {
            lookup(name)
                .map(|value| value.trim().to_string())
                .filter(|value| !value.is_empty())
        };

        let log_level = match read(LOG_LEVEL_VAR) {
            Some(raw) => raw.parse::<LogLevel>().map_err(|message| ConfigError::InvalidValue {
                variable: LOG_LEVEL_VAR,
                message,
            })?,
            None => default_log_level(),
        };

        let log_dir = read(LOG_DIR_VAR).map(PathBuf::from);
        if let Some(dir) = log_dir.as_ref() {
            if !dir.is_absolute() {
                return Err(ConfigError::InvalidValue {
                    variable: LOG_DIR_VAR,
                    message: format!("`{}` is not an absolute path", dir.display()),
                });
            }
        }

        Ok(Self {
            db_path: read(DB_PATH_VAR).map(PathBuf::from),
            log_level,
            log_dir,
        })
    }

    /// The persistent store file, for operations that must not run in memory.
    pub fn require_db_path(&self) -> Result<&Path, ConfigError> {
        self.db_path.as_deref().ok_or(ConfigError::Missing {
            variable: DB_PATH_VAR,
        })
    }

    /// Starts file logging when a directory is configured.
    ///
    /// Returns whether logging is active afterwards.
    pub fn init_logging(&self) -> Result<bool, String> {
        match self.log_dir.as_deref() {
            Some(dir) => init_logging(self.log_level, dir).map(|()| true),
            None => Ok(false),
        }
    }
}
