//! Export of per-version metrics for external observability.

use std::fs::{self, OpenOptions};
use std::io::Write;
use std::path::PathBuf;
use std::sync::Mutex;

use serde::Serialize;
use thiserror::Error;

use crate::lifecycle::{Metrics, VersionId};

#[derive(Debug, Error)]
pub enum MetricsSinkError {
    #[error("Failed to append metrics to {path}: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("Failed to encode metrics record: {0}")]
    Encode(#[from] serde_json::Error),
    #[error("Metrics sink lock poisoned")]
    LockPoisoned,
}

/// Receives the metrics of every deployed version.
pub trait MetricsSink: Send + Sync {
    fn record(&self, version_id: &VersionId, metrics: &Metrics) -> Result<(), MetricsSinkError>;
}

#[derive(Serialize)]
struct MetricsRecord<'a> {
    version_id: &'a VersionId,
    #[serde(flatten)]
    metrics: &'a Metrics,
}

/// Appends one JSON object per line.
pub struct JsonlMetricsSink {
    path: PathBuf,
    write_lock: Mutex<()>,
}

impl JsonlMetricsSink {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            write_lock: Mutex::new(()),
        }
    }
}

impl MetricsSink for JsonlMetricsSink {
    fn record(&self, version_id: &VersionId, metrics: &Metrics) -> Result<(), MetricsSinkError> {
        let mut line = serde_json::to_vec(&MetricsRecord {
            version_id,
            metrics,
        })?;
        line.push(b'\n');
        let io_err = |source: std::io::Error| MetricsSinkError::Io {
            path: self.path.clone(),
            source,
        };
        let _guard = self
            .write_lock
            .lock()
            .map_err(|_| MetricsSinkError::LockPoisoned)?;
        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent).map_err(io_err)?;
        }
        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)
            .map_err(io_err)?;
        file.write_all(&line).map_err(io_err)?;
        Ok(())
    }
}

/// Emits metrics as a structured `info` event.
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingMetricsSink;

impl MetricsSink for TracingMetricsSink {
    fn record(&self, version_id: &VersionId, metrics: &Metrics) -> Result<(), MetricsSinkError> {
        tracing::info!(
            target: "receipt_classifier::metrics",
            version_id = %version_id,
            accuracy = metrics.accuracy,
            precision = metrics.precision,
            recall = metrics.recall,
            f1 = metrics.f1,
            sample_count = metrics.sample_count,
            category_count = metrics.category_count,
            "Model metrics"
        );
        Ok(())
    }
}
