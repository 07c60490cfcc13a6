use std::path::{Path, PathBuf};

use crate::{app_dirs, fs_ops};

use super::CONFIG_FILE_NAME;
use super::errors::ConfigError;
use super::types::LifecycleConfig;

/// Resolve the configuration file path, ensuring the parent directory exists.
pub fn config_path() -> Result<PathBuf, ConfigError> {
    let dir = app_dirs::app_root_dir().map_err(map_app_dir_error)?;
    Ok(dir.join(CONFIG_FILE_NAME))
}

/// Load configuration from the default location, returning defaults if missing.
pub fn load_or_default() -> Result<LifecycleConfig, ConfigError> {
    load_from_path(&config_path()?)
}

/// Load configuration from `path`; a missing file yields the defaults.
pub fn load_from_path(path: &Path) -> Result<LifecycleConfig, ConfigError> {
    if !path.exists() {
        return Ok(LifecycleConfig::default());
    }
    let text = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
        path: path.to_path_buf(),
        source,
    })?;
    let config: LifecycleConfig = toml::from_str(&text).map_err(|source| ConfigError::ParseToml {
        path: path.to_path_buf(),
        source,
    })?;
    config.validate()?;
    Ok(config)
}

/// Persist configuration to the default location.
pub fn save(config: &LifecycleConfig) -> Result<(), ConfigError> {
    save_to_path(config, &config_path()?)
}

/// Write the TOML file atomically, creating parent directories as needed.
pub fn save_to_path(config: &LifecycleConfig, path: &Path) -> Result<(), ConfigError> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent).map_err(|source| ConfigError::CreateDir {
            path: parent.to_path_buf(),
            source,
        })?;
    }
    let data = toml::to_string_pretty(config).map_err(|source| ConfigError::SerializeToml {
        path: path.to_path_buf(),
        source,
    })?;
    fs_ops::atomic_write(path, data.as_bytes()).map_err(|source| ConfigError::Write {
        path: path.to_path_buf(),
        source,
    })
}

/// Resolve the model store directory, falling back to the app models dir.
pub fn resolve_models_dir(config: &LifecycleConfig) -> Result<PathBuf, ConfigError> {
    match &config.storage.models_dir {
        Some(dir) => Ok(dir.clone()),
        None => app_dirs::models_dir().map_err(map_app_dir_error),
    }
}

fn map_app_dir_error(error: app_dirs::AppDirError) -> ConfigError {
    match error {
        app_dirs::AppDirError::NoBaseDir => ConfigError::NoConfigDir,
        app_dirs::AppDirError::CreateDir { path, source } => {
            ConfigError::CreateDir { path, source }
        }
    }
}
