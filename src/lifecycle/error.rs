use std::path::PathBuf;

use thiserror::Error;

use crate::corpus::NoDataError;

/// The corpus was loaded but cannot produce a model.
#[derive(Debug, Error)]
pub enum TrainError {
    /// Too few rows or categories survived preprocessing.
    #[error("Insufficient training data: {examples} examples across {categories} categories (need at least {min_examples} examples and 2 categories)")]
    InsufficientData {
        examples: usize,
        categories: usize,
        min_examples: usize,
    },
    /// Data shape problems or optimizer failures.
    #[error("Training failed: {0}")]
    Training(String),
}

/// The candidate model is structurally broken.
#[derive(Debug, Error)]
#[error("Validation failed: {}", errors.join("; "))]
pub struct ValidationFailure {
    pub errors: Vec<String>,
}

/// Persisting or reading model versions failed.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("Model store I/O failed at {path}: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("Invalid JSON in {path}: {source}")]
    Json {
        path: PathBuf,
        source: serde_json::Error,
    },
    #[error("Failed to encode {what}: {source}")]
    Encode {
        what: &'static str,
        source: serde_json::Error,
    },
    /// Artifacts exist but fail their integrity checks.
    #[error("Corrupt model version {version_id}: {reason}")]
    Corrupt { version_id: String, reason: String },
    #[error("Unknown model version {0}")]
    UnknownVersion(String),
    #[error("Model version {0} already exists")]
    AlreadyExists(String),
    #[error("Model store lock poisoned")]
    LockPoisoned,
    /// Failure injected by a non-filesystem backend.
    #[error("Model store backend failed: {0}")]
    Backend(String),
}

impl StoreError {
    pub(crate) fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }
}

/// Any failure that aborts a lifecycle run.
#[derive(Debug, Error)]
pub enum LifecycleError {
    #[error(transparent)]
    NoData(#[from] NoDataError),
    #[error(transparent)]
    Train(#[from] TrainError),
    #[error(transparent)]
    Validation(#[from] ValidationFailure),
    #[error(transparent)]
    Store(#[from] StoreError),
    /// A stage panicked; the message is the panic payload.
    #[error("{stage} panicked: {message}")]
    Panicked {
        stage: &'static str,
        message: String,
    },
}
