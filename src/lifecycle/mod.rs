//! Model lifecycle: decide whether to retrain, train, validate and deploy.
//!
//! The [`LifecycleController`] ties the pieces together. Training and
//! validation work on owned copies and never touch the [`VersionStore`]
//! until the final deploy, which swaps the active pointer atomically.

mod controller;
mod error;
mod model;
mod monitor;
mod store;
mod trainer;
mod validator;

#[cfg(test)]
pub(crate) mod test_support;

pub use controller::{
    LifecycleController, LifecycleOutcome, LifecycleState, RunStatus, run_lifecycle,
};
pub use error::{LifecycleError, StoreError, TrainError, ValidationFailure};
pub use model::{CategoryReport, Metrics, ModelVersion, TextClassifier, TrainedModel, VersionId};
pub use monitor::{MonitorReport, MonitorStatus, PerformanceMonitor};
pub use store::{ArtifactStore, FsArtifactStore, MemoryArtifactStore, VersionStore};
pub use trainer::Trainer;
pub use validator::{ValidationReport, Validator};

pub(crate) fn panic_to_string(payload: Box<dyn std::any::Any + Send>) -> String {
    if let Some(message) = payload.downcast_ref::<&str>() {
        (*message).to_string()
    } else if let Some(message) = payload.downcast_ref::<String>() {
        message.clone()
    } else {
        "Unknown panic payload".to_string()
    }
}
