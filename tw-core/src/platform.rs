//! Platform detection and per-user directories.
//!
//! Data and configuration live under the OS conventions (`dirs`) unless
//! `TWINFLOW_HOME` points somewhere else, in which case both directories
//! resolve to that single root.

use std::path::PathBuf;

use crate::constants::{APP_DIR_NAME, HOME_ENV_VAR};
use crate::error::{TwError, TwResult};

/// Detected operating system platform.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Platform {
    Windows,
    MacOs,
    Linux,
}

impl Platform {
    /// Detect the current platform at compile time.
    pub fn current() -> Self {
        if cfg!(target_os = "windows") {
            Platform::Windows
        } else if cfg!(target_os = "macos") {
            Platform::MacOs
        } else {
            Platform::Linux
        }
    }

    /// Directory holding the database and logs.
    pub fn data_dir() -> TwResult<PathBuf> {
        resolve_dir(home_override(), dirs::data_dir(), "data")
    }

    /// Directory holding `config.toml`.
    pub fn config_dir() -> TwResult<PathBuf> {
        resolve_dir(home_override(), dirs::config_dir(), "config")
    }

    pub fn name(&self) -> &'static str {
        match self {
            Platform::Windows => "Windows",
            Platform::MacOs => "macOS",
            Platform::Linux => "Linux",
        }
    }

    /// System hostname, used as the device name of account migrations.
    pub fn hostname() -> String {
        hostname::get()
            .ok()
            .and_then(|h| h.into_string().ok())
            .filter(|h| !h.trim().is_empty())
            .unwrap_or_else(|| "twinflow-device".to_string())
    }
}

impl std::fmt::Display for Platform {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

fn home_override() -> Option<PathBuf> {
    std::env::var_os(HOME_ENV_VAR)
        .filter(|value| !value.is_empty())
        .map(PathBuf::from)
}

fn resolve_dir(home: Option<PathBuf>, os_base: Option<PathBuf>, what: &str) -> TwResult<PathBuf> {
    if let Some(home) = home {
        return Ok(home);
    }
    os_base
        .map(|base| base.join(APP_DIR_NAME))
        .ok_or_else(|| TwError::Config(format!("could not determine {what} directory")))
}
