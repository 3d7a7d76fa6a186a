//! Application configuration.
//!
//! Values are layered: built-in defaults, then `config.toml` under the
//! user's config directory, then `MINDTRACK_*` environment variables.

use std::{
    fs,
    path::{Path, PathBuf},
};

use anyhow::{Context, Result};
use config::{Config, Environment, File};
use serde::Deserialize;

/// Directory under the platform config dir holding `config.toml`.
pub const CONFIG_DIR: &str = "mindtrack";
/// Name of the configuration file.
pub const CONFIG_FILE: &str = "config.toml";
/// Prefix for environment overrides (`MINDTRACK_DATA_DIR`, ...).
pub const ENV_PREFIX: &str = "MINDTRACK";

const DEFAULT_CONFIG: &str = r#"# MindTrack configuration.
# Relative paths are resolved against the working directory.

# Directory holding users.csv, objectives.csv and bookings.csv.
data_dir = "data"

# Directory receiving available-objective exports.
export_dir = "exports"

# Directory for the application log file.
log_dir = "logs"
"#;

/// Runtime settings for the store and logging.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct AppConfig {
    /// Directory containing the record files.
    pub data_dir: PathBuf,
    /// Directory receiving export snapshots.
    pub export_dir: PathBuf,
    /// Directory for log files.
    pub log_dir: PathBuf,
    /// File name of the users collection.
    pub users_file: String,
    /// File name of the objectives collection.
    pub objectives_file: String,
    /// File name of the bookings collection.
    pub bookings_file: String,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            data_dir: PathBuf::from("data"),
            export_dir: PathBuf::from("exports"),
            log_dir: PathBuf::from("logs"),
            users_file: "users.csv".to_string(),
            objectives_file: "objectives.csv".to_string(),
            bookings_file: "bookings.csv".to_string(),
        }
    }
}

impl AppConfig {
    /// Load configuration from the default file location and environment.
    pub fn load() -> Result<Self> {
        Self::load_from(config_path())
    }

    /// Load configuration from `path` (optional) and environment.
    pub fn load_from(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let defaults = Self::default();
        let settings = Config::builder()
            .set_default("data_dir", defaults.data_dir.to_string_lossy().into_owned())?
            .set_default("export_dir", defaults.export_dir.to_string_lossy().into_owned())?
            .set_default("log_dir", defaults.log_dir.to_string_lossy().into_owned())?
            .set_default("users_file", defaults.users_file)?
            .set_default("objectives_file", defaults.objectives_file)?
            .set_default("bookings_file", defaults.bookings_file)?
            .add_source(File::from(path.to_path_buf()).required(false))
            .add_source(Environment::with_prefix(ENV_PREFIX))
            .build()
            .with_context(|| format!("failed to load configuration from {}", path.display()))?;

        settings
            .try_deserialize()
            .context("invalid configuration values")
    }

    /// Path of the users file.
    pub fn users_path(&self) -> PathBuf {
        self.data_dir.join(&self.users_file)
    }

    /// Path of the objectives file.
    pub fn objectives_path(&self) -> PathBuf {
        self.data_dir.join(&self.objectives_file)
    }

    /// Path of the bookings file.
    pub fn bookings_path(&self) -> PathBuf {
        self.data_dir.join(&self.bookings_file)
    }
}

/// Location of the configuration file.
pub fn config_path() -> PathBuf {
    dirs::config_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join(CONFIG_DIR)
        .join(CONFIG_FILE)
}

/// Write the default configuration file if none exists yet.
pub fn ensure_default_config() -> Result<PathBuf> {
    let path = config_path();
    write_default_config(&path)?;
    Ok(path)
}

fn write_default_config(path: &Path) -> Result<()> {
    if path.exists() {
        return Ok(());
    }
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)
            .with_context(|| format!("failed to create {}", parent.display()))?;
    }
    fs::write(path, DEFAULT_CONFIG)
        .with_context(|| format!("failed to write {}", path.display()))
}
