//! Service configuration loaded from `config.toml` plus environment overrides.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::app_dirs::{self, AppDirError};

/// File name of the settings file inside the app root.
pub const CONFIG_FILE_NAME: &str = "config.toml";
/// Default file name of the classifier weights inside the models directory.
pub const DEFAULT_MODEL_FILE_NAME: &str = "cardiac_cnn.bpk";
/// Overrides [`AppSettings::model_path`].
pub const MODEL_PATH_ENV: &str = "VETCARDIO_MODEL_PATH";
/// Overrides [`AppSettings::staging_dir`].
pub const STAGING_DIR_ENV: &str = "VETCARDIO_STAGING_DIR";

const DEFAULT_MAX_UPLOAD_BYTES: u64 = 50 * 1024 * 1024;

/// Errors that may occur while loading or saving settings.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// Failed to read the settings file.
    #[error("Failed to read {path}: {source}")]
    Read {
        /// Path that failed to read.
        path: PathBuf,
        /// Underlying IO error.
        source: std::io::Error,
    },
    /// Failed to write the settings file.
    #[error("Failed to write {path}: {source}")]
    Write {
        /// Path that failed to write.
        path: PathBuf,
        /// Underlying IO error.
        source: std::io::Error,
    },
    /// The settings file is not valid TOML for [`AppSettings`].
    #[error("Invalid config at {path}: {source}")]
    ParseToml {
        /// TOML file path.
        path: PathBuf,
        /// TOML parse error.
        source: toml::de::Error,
    },
    /// Failed to serialize settings to TOML.
    #[error("Failed to serialize config to TOML at {path}: {source}")]
    SerializeToml {
        /// TOML file path.
        path: PathBuf,
        /// TOML serialization error.
        source: toml::ser::Error,
    },
    /// The application directories could not be prepared.
    #[error(transparent)]
    AppDir(#[from] AppDirError),
}

/// Settings for the evaluation pipeline and its collaborators.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AppSettings {
    /// Location of the pretrained classifier weights.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub model_path: Option<PathBuf>,
    /// Directory uploads are staged into before evaluation.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub staging_dir: Option<PathBuf>,
    /// Uploads larger than this are rejected before staging.
    #[serde(default = "default_max_upload_bytes")]
    pub max_upload_bytes: u64,
    /// Load the classifier at start-up instead of on first evaluation.
    #[serde(default = "default_true")]
    pub preload_model: bool,
}

impl Default for AppSettings {
    fn default() -> Self {
        Self {
            model_path: None,
            staging_dir: None,
            max_upload_bytes: default_max_upload_bytes(),
            preload_model: default_true(),
        }
    }
}

impl AppSettings {
    /// Weights path, falling back to `<root>/models/cardiac_cnn.bpk`.
    pub fn resolved_model_path(&self) -> Result<PathBuf, ConfigError> {
        match &self.model_path {
            Some(path) => Ok(path.clone()),
            None => Ok(app_dirs::models_dir()?.join(DEFAULT_MODEL_FILE_NAME)),
        }
    }

    /// Staging directory, created if it does not exist yet.
    pub fn resolved_staging_dir(&self) -> Result<PathBuf, ConfigError> {
        match &self.staging_dir {
            Some(path) => Ok(app_dirs::ensure_dir(path.clone())?),
            None => Ok(app_dirs::staging_dir()?),
        }
    }

    fn apply_env_overrides(mut self) -> Self {
        if let Some(path) = env_path(MODEL_PATH_ENV) {
            self.model_path = Some(path);
        }
        if let Some(path) = env_path(STAGING_DIR_ENV) {
            self.staging_dir = Some(path);
        }
        self
    }

    fn normalized(mut self) -> Self {
        if self.max_upload_bytes == 0 {
            self.max_upload_bytes = default_max_upload_bytes();
        }
        self
    }
}

/// Resolve the settings file path, ensuring the app root exists.
pub fn config_path() -> Result<PathBuf, ConfigError> {
    Ok(app_dirs::app_root_dir()?.join(CONFIG_FILE_NAME))
}

/// Load settings from the app root, returning defaults if the file is missing.
pub fn load_or_default() -> Result<AppSettings, ConfigError> {
    Ok(load_persisted()?.apply_env_overrides())
}

/// Settings as stored in `config.toml`, ignoring environment overrides.
pub fn load_persisted() -> Result<AppSettings, ConfigError> {
    load_from(&config_path()?)
}

/// Rewrite `config.toml` with every key filled in. Environment overrides
/// are not persisted.
pub fn write_config_file() -> Result<PathBuf, ConfigError> {
    save(&load_persisted()?)
}

/// Persist settings to the app root.
pub fn save(settings: &AppSettings) -> Result<PathBuf, ConfigError> {
    let path = config_path()?;
    save_to(settings, &path)?;
    Ok(path)
}

pub(crate) fn load_from(path: &Path) -> Result<AppSettings, ConfigError> {
    if !path.exists() {
        return Ok(AppSettings::default());
    }
    let text = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
        path: path.to_path_buf(),
        source,
    })?;
    toml::from_str::<AppSettings>(&text)
        .map(AppSettings::normalized)
        .map_err(|source| ConfigError::ParseToml {
            path: path.to_path_buf(),
            source,
        })
}

pub(crate) fn save_to(settings: &AppSettings, path: &Path) -> Result<(), ConfigError> {
    let text = toml::to_string_pretty(settings).map_err(|source| ConfigError::SerializeToml {
        path: path.to_path_buf(),
        source,
    })?;
    std::fs::write(path, text).map_err(|source| ConfigError::Write {
        path: path.to_path_buf(),
        source,
    })
}

fn env_path(key: &str) -> Option<PathBuf> {
    std::env::var(key)
        .ok()
        .filter(|value| !value.trim().is_empty())
        .map(PathBuf::from)
}

fn default_max_upload_bytes() -> u64 {
    DEFAULT_MAX_UPLOAD_BYTES
}

fn default_true() -> bool {
    true
}
