use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use super::defaults::*;
use super::errors::ConfigError;

/// Full lifecycle configuration persisted as `lifecycle.toml`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct LifecycleConfig {
    #[serde(default)]
    pub storage: StorageSettings,
    #[serde(default)]
    pub corpus: CorpusSettings,
    #[serde(default)]
    pub trainer: TrainerSettings,
    #[serde(default)]
    pub validator: ValidatorSettings,
    #[serde(default)]
    pub monitor: MonitorSettings,
    #[serde(default)]
    pub metrics: MetricsSettings,
}

impl LifecycleConfig {
    /// Reject values that would make a lifecycle run meaningless.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let trainer = &self.trainer;
        if !(trainer.test_fraction > 0.0 && trainer.test_fraction < 1.0) {
            return Err(ConfigError::InvalidValue {
                key: "trainer.test_fraction",
                reason: format!("must be in (0, 1), got {}", trainer.test_fraction),
            });
        }
        if trainer.max_features == 0 {
            return Err(ConfigError::InvalidValue {
                key: "trainer.max_features",
                reason: "must be at least 1".to_string(),
            });
        }
        if !(trainer.learning_rate.is_finite() && trainer.learning_rate > 0.0) {
            return Err(ConfigError::InvalidValue {
                key: "trainer.learning_rate",
                reason: format!("must be > 0, got {}", trainer.learning_rate),
            });
        }
        if self.monitor.window == 0 {
            return Err(ConfigError::InvalidValue {
                key: "monitor.window",
                reason: "must be at least 1".to_string(),
            });
        }
        if self.monitor.accuracy_threshold < 0.0 || self.monitor.f1_threshold < 0.0 {
            return Err(ConfigError::InvalidValue {
                key: "monitor",
                reason: "degradation thresholds must be >= 0".to_string(),
            });
        }
        if self.validator.probe_texts.is_empty() {
            return Err(ConfigError::InvalidValue {
                key: "validator.probe_texts",
                reason: "probe set must not be empty".to_string(),
            });
        }
        Ok(())
    }
}

/// Where model versions are persisted.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct StorageSettings {
    /// Model store root; defaults to `<app root>/models`.
    #[serde(default)]
    pub models_dir: Option<PathBuf>,
}

/// Training data sources.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CorpusSettings {
    /// SQLite database holding labeled receipt lines.
    #[serde(default)]
    pub database_path: Option<PathBuf>,
    /// Query returning `(text, category)` rows.
    #[serde(default = "default_corpus_query")]
    pub query: String,
    /// Delimited flat file used when the database is missing or too small.
    #[serde(default)]
    pub fallback_path: Option<PathBuf>,
    #[serde(default = "default_delimiter")]
    pub delimiter: char,
    #[serde(default = "default_text_column")]
    pub text_column: String,
    #[serde(default = "default_category_column")]
    pub category_column: String,
    /// Below this many database rows the fallback file is preferred.
    #[serde(default = "default_min_primary_rows")]
    pub min_primary_rows: usize,
}

impl Default for CorpusSettings {
    fn default() -> Self {
        Self {
            database_path: None,
            query: default_corpus_query(),
            fallback_path: None,
            delimiter: default_delimiter(),
            text_column: default_text_column(),
            category_column: default_category_column(),
            min_primary_rows: default_min_primary_rows(),
        }
    }
}

/// Trainer hyper-parameters and data thresholds.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrainerSettings {
    /// Categories with fewer examples are dropped before training.
    #[serde(default = "default_min_category_support")]
    pub min_category_support: usize,
    /// Minimum corpus size after support filtering.
    #[serde(default = "default_min_examples")]
    pub min_examples: usize,
    /// Held-out share of every category.
    #[serde(default = "default_test_fraction")]
    pub test_fraction: f64,
    #[serde(default = "default_seed")]
    pub seed: u64,
    /// Vocabulary cap for the term weighting.
    #[serde(default = "default_max_features")]
    pub max_features: usize,
    #[serde(default = "default_epochs")]
    pub epochs: usize,
    #[serde(default = "default_learning_rate")]
    pub learning_rate: f32,
    #[serde(default = "default_l2")]
    pub l2: f32,
    #[serde(default = "default_batch_size")]
    pub batch_size: usize,
    /// Weight the loss by inverse category frequency.
    #[serde(default = "default_true")]
    pub balance_classes: bool,
}

impl Default for TrainerSettings {
    fn default() -> Self {
        Self {
            min_category_support: default_min_category_support(),
            min_examples: default_min_examples(),
            test_fraction: default_test_fraction(),
            seed: default_seed(),
            max_features: default_max_features(),
            epochs: default_epochs(),
            learning_rate: default_learning_rate(),
            l2: default_l2(),
            batch_size: default_batch_size(),
            balance_classes: default_true(),
        }
    }
}

/// Probe sets and advisory quality thresholds for candidate validation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ValidatorSettings {
    /// Identifier bumped whenever the probe lists change.
    #[serde(default = "default_probe_set_version")]
    pub probe_set_version: String,
    #[serde(default = "default_probe_texts")]
    pub probe_texts: Vec<String>,
    #[serde(default = "default_diversity_texts")]
    pub diversity_texts: Vec<String>,
    #[serde(default = "default_min_distinct_categories")]
    pub min_distinct_categories: usize,
    #[serde(default = "default_min_accuracy")]
    pub min_accuracy: f64,
    #[serde(default = "default_min_f1")]
    pub min_f1: f64,
}

impl Default for ValidatorSettings {
    fn default() -> Self {
        Self {
            probe_set_version: default_probe_set_version(),
            probe_texts: default_probe_texts(),
            diversity_texts: default_diversity_texts(),
            min_distinct_categories: default_min_distinct_categories(),
            min_accuracy: default_min_accuracy(),
            min_f1: default_min_f1(),
        }
    }
}

/// Rolling-window degradation detection.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MonitorSettings {
    /// Number of most recent non-active versions averaged as the baseline.
    #[serde(default = "default_monitor_window")]
    pub window: usize,
    #[serde(default = "default_degradation_threshold")]
    pub accuracy_threshold: f64,
    #[serde(default = "default_degradation_threshold")]
    pub f1_threshold: f64,
}

impl Default for MonitorSettings {
    fn default() -> Self {
        Self {
            window: default_monitor_window(),
            accuracy_threshold: default_degradation_threshold(),
            f1_threshold: default_degradation_threshold(),
        }
    }
}

/// External metrics sink.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct MetricsSettings {
    /// Append one JSON record per deployed version to this file.
    #[serde(default)]
    pub jsonl_path: Option<PathBuf>,
}
