//! Application configuration management.
//!
//! Settings are layered, lowest priority first:
//!
//! 1. Built-in defaults
//! 2. TOML file (`--config PATH`, or `config.toml` in the platform config dir)
//! 3. Environment variables prefixed with `NFC_ATTENDANCE_`
//!    (e.g. `NFC_ATTENDANCE_DATABASE_PATH`, `NFC_ATTENDANCE_BUSY_TIMEOUT_MS`)
//! 4. CLI flags (`--database`, `--output`)

use anyhow::{Context, Result};
use directories::ProjectDirs;
use figment::providers::{Env, Format, Serialized, Toml};
use figment::Figment;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::cli::OutputFormat;
use crate::store::{DEFAULT_BUSY_TIMEOUT, MAX_BUSY_TIMEOUT};

/// Prefix for environment variable overrides.
pub const ENV_PREFIX: &str = "NFC_ATTENDANCE_";

/// Application configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// SQLite database shared by every process serving the same deployment.
    pub database_path: PathBuf,
    /// How long a connection waits on a locked database before the
    /// operation reports itself unavailable.
    pub busy_timeout_ms: u64,
    /// Output format for command results.
    pub output: OutputFormat,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            database_path: default_database_path(),
            busy_timeout_ms: DEFAULT_BUSY_TIMEOUT.as_millis() as u64,
            output: OutputFormat::Text,
        }
    }
}

impl Config {
    /// Load the configuration from `path`, or from the default platform
    /// location when `path` is `None`.
    ///
    /// A missing file is not an error.
    ///
    /// # Errors
    ///
    /// Returns an error if the file or an environment override is malformed,
    /// or if the merged settings fail [`Config::validate`]. Nothing falls back
    /// to defaults, so a bad layer never redirects writes to another database.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let path = path.map(Path::to_path_buf).or_else(|| default_config_path().ok());
        Self::load_layers(path.as_deref())
    }

    /// Load the configuration from a specific TOML file plus environment.
    ///
    /// # Errors
    ///
    /// See [`Config::load`].
    pub fn load_from_path(path: impl AsRef<Path>) -> Result<Self> {
        Self::load_layers(Some(path.as_ref()))
    }

    fn load_layers(path: Option<&Path>) -> Result<Self> {
        let config: Config = Self::figment(path)
            .extract()
            .context("Failed to load configuration")?;
        config
            .validate()
            .map_err(|e| anyhow::anyhow!("Invalid configuration: {e}"))?;
        Ok(config)
    }

    /// The layered provider stack without CLI overrides.
    pub fn figment(path: Option<&Path>) -> Figment {
        let mut figment = Figment::from(Serialized::defaults(Config::default()));
        if let Some(path) = path {
            log::debug!("Reading configuration from {}", path.display());
            figment = figment.merge(Toml::file(path));
        }
        figment.merge(Env::prefixed(ENV_PREFIX))
    }

    /// Apply CLI flag overrides on top of the loaded layers.
    #[must_use]
    pub fn with_overrides(mut self, database: Option<PathBuf>, output: Option<OutputFormat>) -> Self {
        if let Some(database) = database {
            self.database_path = database;
        }
        if let Some(output) = output {
            self.output = output;
        }
        self
    }

    /// Check values that would make the store unusable.
    ///
    /// # Errors
    ///
    /// Returns a description of the first invalid setting.
    pub fn validate(&self) -> Result<(), String> {
        if self.busy_timeout_ms == 0 {
            return Err("busy_timeout_ms must be greater than zero".to_string());
        }
        if self.busy_timeout() > MAX_BUSY_TIMEOUT {
            return Err(format!(
                "busy_timeout_ms must be at most {}",
                MAX_BUSY_TIMEOUT.as_millis()
            ));
        }
        if self.database_path.as_os_str().is_empty() {
            return Err("database_path must not be empty".to_string());
        }
        Ok(())
    }

    /// Busy timeout as a [`Duration`].
    #[must_use]
    pub fn busy_timeout(&self) -> Duration {
        Duration::from_millis(self.busy_timeout_ms)
    }

    /// Render the configuration as TOML.
    ///
    /// # Errors
    ///
    /// Returns an error if serialization fails.
    pub fn to_toml(&self) -> Result<String> {
        Ok(toml::to_string_pretty(self)?)
    }
}

fn project_dirs() -> Option<ProjectDirs> {
    ProjectDirs::from("com", "nfc-attendance", "nfc-attendance")
}

/// Default platform-specific configuration file path.
///
/// # Errors
///
/// Returns an error if no home directory can be determined.
pub fn default_config_path() -> Result<PathBuf> {
    let dirs =
        project_dirs().ok_or_else(|| anyhow::anyhow!("Failed to determine project directories"))?;
    Ok(dirs.config_dir().join("config.toml"))
}

/// Default database location: the platform data directory, or the working
/// directory if none can be determined.
pub fn default_database_path() -> PathBuf {
    project_dirs()
        .map(|dirs| dirs.data_dir().join("attendance.db"))
        .unwrap_or_else(|| PathBuf::from("attendance.db"))
}
