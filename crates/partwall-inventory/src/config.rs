#![forbid(unsafe_code)]

//! Inventory configuration.
//!
//! Loaded from a JSON file; every field is optional and falls back to
//! [`InventoryConfig::default`]. [`InventoryConfig::from_env`] reads:
//! - `PARTWALL_CONFIG`: path to a JSON config file
//! - `PARTWALL_ECHO_WINDOW_MS`: override for the echo suppression window

use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use partwall_grid::{DrawerSizeCatalog, GridAxis, GridError};
use serde::{Deserialize, Serialize};
use thiserror::Error;

pub const CONFIG_PATH_ENV: &str = "PARTWALL_CONFIG";
pub const ECHO_WINDOW_ENV: &str = "PARTWALL_ECHO_WINDOW_MS";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("invalid config {path}: {source}")]
    Json {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("invalid config: {0}")]
    Grid(#[from] GridError),
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct InventoryConfig {
    /// Columns of a new wall when the caller does not give any.
    pub default_wall_columns: u16,
    /// Internal drawer grid of a new case when the caller does not give one.
    pub default_case_columns: u16,
    pub default_case_rows: u16,
    /// How long a client ignores echoes of its own mutations.
    pub echo_window_ms: u64,
    pub drawer_sizes: DrawerSizeCatalog,
}

impl Default for InventoryConfig {
    fn default() -> Self {
        Self {
            default_wall_columns: 12,
            default_case_columns: 4,
            default_case_rows: 6,
            echo_window_ms: 1500,
            drawer_sizes: DrawerSizeCatalog::standard(),
        }
    }
}

impl InventoryConfig {
    /// Read a JSON config file.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let raw = fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let config: Self = serde_json::from_str(&raw).map_err(|source| ConfigError::Json {
            path: path.to_path_buf(),
            source,
        })?;
        config.validated()
    }

    /// Load config from environment variables.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_env_with(|key| std::env::var(key).ok())
    }

    /// Load config using a custom environment lookup (for tests).
    pub fn from_env_with<F>(get_env: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut config = match get_env(CONFIG_PATH_ENV) {
            Some(path) if !path.is_empty() => Self::load(Path::new(&path))?,
            _ => Self::default(),
        };

        if let Some(val) = get_env(ECHO_WINDOW_ENV)
            && let Ok(ms) = val.parse::<u64>()
        {
            config.echo_window_ms = ms;
        }

        config.validated()
    }

    /// Reject grid defaults that could never build a grid.
    pub fn validated(self) -> Result<Self, ConfigError> {
        for (axis, value) in [
            (GridAxis::Columns, self.default_wall_columns),
            (GridAxis::Columns, self.default_case_columns),
            (GridAxis::Rows, self.default_case_rows),
        ] {
            if value == 0 {
                return Err(GridError::InvalidDimension { axis, value }.into());
            }
        }
        Ok(self)
    }

    #[must_use]
    pub const fn echo_window(&self) -> Duration {
        Duration::from_millis(self.echo_window_ms)
    }
}
