//! Lifecycle configuration: TOML settings with per-section defaults.

mod defaults;
mod errors;
mod io;
mod types;


/// Default filename used to store the lifecycle configuration.
pub const CONFIG_FILE_NAME: &str = "lifecycle.toml";

pub use errors::ConfigError;
pub use io::{config_path, load_from_path, load_or_default, resolve_models_dir, save, save_to_path};
pub use types::{
    CorpusSettings, LifecycleConfig, MetricsSettings, MonitorSettings, StorageSettings,
    TrainerSettings, ValidatorSettings,
};
