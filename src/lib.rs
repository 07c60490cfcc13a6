//! Receipt label classification with a self-maintaining model lifecycle.
//!
//! The [`lifecycle`] module decides when to retrain, validates candidates and
//! deploys them into a versioned store; [`serving`] answers predictions from
//! the active version.

/// Application directories under the user config root.
pub mod app_dirs;
/// TOML configuration for every lifecycle component.
pub mod config;
/// Labeled training data providers.
pub mod corpus;
/// Atomic file replacement and directory staging helpers.
pub mod fs_ops;
/// Model lifecycle controller and its collaborators.
pub mod lifecycle;
/// Tracing subscriber setup with rotating log files.
pub mod logging;
/// Per-version metrics export.
pub mod metrics_sink;
/// Feature extraction, classifier and evaluation primitives.
pub mod ml;
/// Predictions from the active model.
pub mod serving;
