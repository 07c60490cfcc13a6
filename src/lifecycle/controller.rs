use std::fmt;
use std::panic::{AssertUnwindSafe, catch_unwind};
use std::sync::Arc;

use serde::Serialize;

use super::error::{LifecycleError, ValidationFailure};
use super::model::{Metrics, ModelVersion, TrainedModel, VersionId};
use super::monitor::{MonitorReport, MonitorStatus, PerformanceMonitor};
use super::panic_to_string;
use super::store::VersionStore;
use super::trainer::Trainer;
use super::validator::Validator;
use crate::config::LifecycleConfig;
use crate::corpus::{CorpusProvider, provider_from_settings};
use crate::metrics_sink::{JsonlMetricsSink, MetricsSink, TracingMetricsSink};

/// Controller states visited during one run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum LifecycleState {
    Idle,
    Monitoring,
    Stable,
    RetrainNeeded,
    Training,
    Validating,
    Deploying,
    Aborted,
}

impl fmt::Display for LifecycleState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Idle => "IDLE",
            Self::Monitoring => "MONITORING",
            Self::Stable => "STABLE",
            Self::RetrainNeeded => "RETRAIN_NEEDED",
            Self::Training => "TRAINING",
            Self::Validating => "VALIDATING",
            Self::Deploying => "DEPLOYING",
            Self::Aborted => "ABORTED",
        })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum RunStatus {
    Deployed,
    Stable,
    Aborted,
}

impl fmt::Display for RunStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Deployed => "deployed",
            Self::Stable => "stable",
            Self::Aborted => "aborted",
        })
    }
}

/// Uniform result of a lifecycle run.
///
/// `version_id` is the new version for `deployed` and the untouched active
/// version otherwise.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LifecycleOutcome {
    pub status: RunStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub version_id: Option<VersionId>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub errors: Vec<String>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub warnings: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub monitor: Option<MonitorReport>,
    pub states: Vec<LifecycleState>,
}

struct Run {
    state: LifecycleState,
    states: Vec<LifecycleState>,
    warnings: Vec<String>,
    monitor: Option<MonitorReport>,
}

impl Run {
    fn start() -> Self {
        Self {
            state: LifecycleState::Idle,
            states: vec![LifecycleState::Idle],
            warnings: Vec::new(),
            monitor: None,
        }
    }

    fn enter(&mut self, next: LifecycleState) {
        tracing::info!(from = %self.state, to = %next, "Lifecycle transition");
        self.state = next;
        self.states.push(next);
    }

    fn finish(
        mut self,
        status: RunStatus,
        version_id: Option<VersionId>,
        errors: Vec<String>,
    ) -> LifecycleOutcome {
        self.enter(LifecycleState::Idle);
        LifecycleOutcome {
            status,
            version_id,
            errors,
            warnings: self.warnings,
            monitor: self.monitor,
            states: self.states,
        }
    }

    fn abort(mut self, err: LifecycleError, active: Option<VersionId>) -> LifecycleOutcome {
        tracing::error!(stage = %self.state, "Lifecycle run aborted: {err}");
        self.enter(LifecycleState::Aborted);
        let errors = match err {
            LifecycleError::Validation(failure) => failure.errors,
            other => vec![other.to_string()],
        };
        self.finish(RunStatus::Aborted, active, errors)
    }
}

fn guarded<T>(
    stage: &'static str,
    f: impl FnOnce() -> Result<T, LifecycleError>,
) -> Result<T, LifecycleError> {
    catch_unwind(AssertUnwindSafe(f)).unwrap_or_else(|payload| {
        Err(LifecycleError::Panicked {
            stage,
            message: panic_to_string(payload),
        })
    })
}

/// Orchestrates monitor, trainer, validator and store.
pub struct LifecycleController {
    store: Arc<VersionStore>,
    corpus: Box<dyn CorpusProvider>,
    trainer: Trainer,
    validator: Validator,
    monitor: PerformanceMonitor,
    sinks: Vec<Box<dyn MetricsSink>>,
}

impl LifecycleController {
    /// Controller with default trainer, validator and monitor settings.
    pub fn new(store: Arc<VersionStore>, corpus: Box<dyn CorpusProvider>) -> Self {
        Self {
            store,
            corpus,
            trainer: Trainer::default(),
            validator: Validator::default(),
            monitor: PerformanceMonitor::default(),
            sinks: Vec::new(),
        }
    }

    /// Wire every collaborator from a loaded configuration.
    pub fn from_config(config: &LifecycleConfig, store: Arc<VersionStore>) -> Self {
        let mut controller = Self::new(store, provider_from_settings(&config.corpus))
            .with_trainer(Trainer::new(config.trainer.clone()))
            .with_validator(Validator::new(config.validator.clone()))
            .with_monitor(PerformanceMonitor::new(config.monitor.clone()))
            .with_metrics_sink(Box::new(TracingMetricsSink));
        if let Some(path) = &config.metrics.jsonl_path {
            controller = controller.with_metrics_sink(Box::new(JsonlMetricsSink::new(path)));
        }
        controller
    }

    pub fn with_trainer(mut self, trainer: Trainer) -> Self {
        self.trainer = trainer;
        self
    }

    pub fn with_validator(mut self, validator: Validator) -> Self {
        self.validator = validator;
        self
    }

    pub fn with_monitor(mut self, monitor: PerformanceMonitor) -> Self {
        self.monitor = monitor;
        self
    }

    pub fn with_metrics_sink(mut self, sink: Box<dyn MetricsSink>) -> Self {
        self.sinks.push(sink);
        self
    }

    pub fn store(&self) -> &Arc<VersionStore> {
        &self.store
    }

    /// Execute one decide, train, validate, deploy cycle.
    ///
    /// Never fails: every error ends in an `aborted` outcome and leaves the
    /// previously active model serving.
    pub fn run(&self, force_retrain: bool) -> LifecycleOutcome {
        let mut run = Run::start();
        run.enter(LifecycleState::Monitoring);

        let (active, report) = match guarded("monitoring", || self.check_performance()) {
            Ok(checked) => checked,
            Err(err) => return run.abort(err, None),
        };
        let active_id = active.as_ref().map(|v| v.version_id.clone());
        run.monitor = Some(report);
        if report.status == MonitorStatus::DegradationDetected {
            tracing::warn!(
                accuracy_delta = report.accuracy_delta,
                f1_delta = report.f1_delta,
                baseline_versions = report.baseline_versions,
                "Model degradation detected"
            );
        }

        if !force_retrain && report.status == MonitorStatus::Stable {
            if active.is_none() {
                tracing::info!("No model deployed yet; a forced run is required to train one");
            }
            run.enter(LifecycleState::Stable);
            return run.finish(RunStatus::Stable, active_id, Vec::new());
        }

        run.enter(LifecycleState::RetrainNeeded);
        run.enter(LifecycleState::Training);
        let (model, metrics) = match guarded("training", || self.train_candidate()) {
            Ok(trained) => trained,
            Err(err) => return run.abort(err, active_id),
        };

        run.enter(LifecycleState::Validating);
        let report = match guarded("validation", || {
            Ok(self.validator.validate_model(&model, &metrics))
        }) {
            Ok(report) => report,
            Err(err) => return run.abort(err, active_id),
        };
        for warning in &report.warnings {
            tracing::warn!(probe_set = %report.probe_set_version, "{warning}");
        }
        run.warnings.extend(report.warnings);
        if !report.passed {
            return run.abort(
                ValidationFailure {
                    errors: report.errors,
                }
                .into(),
                active_id,
            );
        }

        run.enter(LifecycleState::Deploying);
        let deployed_metrics = metrics.clone();
        let version_id = match guarded("deploy", || self.deploy_candidate(model, metrics)) {
            Ok(version_id) => version_id,
            Err(err) => return run.abort(err, active_id),
        };
        self.publish_metrics(&version_id, &deployed_metrics);
        run.finish(RunStatus::Deployed, Some(version_id), Vec::new())
    }

    fn check_performance(
        &self,
    ) -> Result<(Option<Arc<ModelVersion>>, MonitorReport), LifecycleError> {
        let active = self.store.get_active()?;
        let history = self.store.list_history()?;
        let report = match &active {
            Some(active) => {
                let baseline: Vec<&Metrics> = history
                    .iter()
                    .filter(|v| v.version_id != active.version_id)
                    .map(|v| &v.metrics)
                    .collect();
                self.monitor.check(&active.metrics, &baseline)
            }
            None => MonitorReport {
                status: MonitorStatus::Stable,
                accuracy_delta: 0.0,
                f1_delta: 0.0,
                baseline_versions: 0,
            },
        };
        Ok((active, report))
    }

    fn train_candidate(&self) -> Result<(TrainedModel, Metrics), LifecycleError> {
        let corpus = self.corpus.load()?;
        Ok(self.trainer.train(corpus)?)
    }

    fn deploy_candidate(
        &self,
        model: TrainedModel,
        metrics: Metrics,
    ) -> Result<VersionId, LifecycleError> {
        self.store.backup_active()?;
        Ok(self.store.deploy(model, metrics)?)
    }

    fn publish_metrics(&self, version_id: &VersionId, metrics: &Metrics) {
        for sink in &self.sinks {
            if let Err(err) = sink.record(version_id, metrics) {
                tracing::warn!(version_id = %version_id, "Metrics sink failed: {err}");
            }
        }
    }
}

/// Open the configured store and run one lifecycle cycle.
///
/// A store that cannot be opened is reported as an aborted run.
pub fn run_lifecycle(config: &LifecycleConfig, force_retrain: bool) -> LifecycleOutcome {
    let opened = crate::config::resolve_models_dir(config)
        .map_err(|err| err.to_string())
        .and_then(|dir| VersionStore::open_dir(dir).map_err(|err| err.to_string()));
    match opened {
        Ok(store) => LifecycleController::from_config(config, Arc::new(store)).run(force_retrain),
        Err(err) => {
            tracing::error!("Unable to open model store: {err}");
            LifecycleOutcome {
                status: RunStatus::Aborted,
                version_id: None,
                errors: vec![err],
                warnings: Vec::new(),
                monitor: None,
                states: vec![LifecycleState::Idle, LifecycleState::Aborted, LifecycleState::Idle],
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::corpus::{Corpus, NoDataError, StaticCorpus, UnconfiguredCorpus};
    use crate::lifecycle::test_support::{grocery_corpus, sample_metrics, sample_model};
    use LifecycleState::*;

    fn controller(store: &Arc<VersionStore>, corpus: Corpus) -> LifecycleController {
        LifecycleController::new(store.clone(), Box::new(StaticCorpus::new(corpus)))
    }

    #[test]
    fn cold_store_without_force_stays_stable() {
        let store = Arc::new(VersionStore::in_memory());
        let outcome = controller(&store, grocery_corpus(50)).run(false);
        assert_eq!(outcome.status, RunStatus::Stable);
        assert_eq!(outcome.version_id, None);
        assert_eq!(outcome.states, vec![Idle, Monitoring, Stable, Idle]);
    }

    #[test]
    fn forced_run_walks_every_state() {
        let store = Arc::new(VersionStore::in_memory());
        let outcome = controller(&store, grocery_corpus(50)).run(true);
        assert_eq!(outcome.status, RunStatus::Deployed, "{:?}", outcome.errors);
        assert_eq!(
            outcome.states,
            vec![Idle, Monitoring, RetrainNeeded, Training, Validating, Deploying, Idle]
        );
        assert_eq!(store.active_version_id().unwrap(), outcome.version_id);
    }

    #[test]
    fn degradation_triggers_retraining() {
        let store = Arc::new(VersionStore::in_memory());
        for _ in 0..3 {
            store.deploy(sample_model(), sample_metrics(0.95)).unwrap();
        }
        store.deploy(sample_model(), sample_metrics(0.5)).unwrap();
        let before = store.active_version_id().unwrap();

        let outcome = controller(&store, grocery_corpus(50)).run(false);
        assert_eq!(outcome.status, RunStatus::Deployed, "{:?}", outcome.errors);
        let monitor = outcome.monitor.unwrap();
        assert_eq!(monitor.status, MonitorStatus::DegradationDetected);
        assert_eq!(monitor.baseline_versions, 3);
        assert!(outcome.version_id > before);
        assert_eq!(store.list_backups().unwrap(), vec![before.unwrap()]);
    }

    #[test]
    fn missing_corpus_aborts_and_keeps_active() {
        let store = Arc::new(VersionStore::in_memory());
        let active = store.deploy(sample_model(), sample_metrics(0.9)).unwrap();
        let outcome = LifecycleController::new(store.clone(), Box::new(UnconfiguredCorpus)).run(true);
        assert_eq!(outcome.status, RunStatus::Aborted);
        assert_eq!(outcome.errors, vec![NoDataError::NotConfigured.to_string()]);
        assert_eq!(outcome.version_id, Some(active.clone()));
        assert_eq!(outcome.states.last(), Some(&Idle));
        assert!(outcome.states.contains(&Aborted));
        assert_eq!(store.active_version_id().unwrap(), Some(active));
    }

    #[test]
    fn insufficient_data_aborts() {
        let store = Arc::new(VersionStore::in_memory());
        let outcome = controller(&store, grocery_corpus(5)).run(true);
        assert_eq!(outcome.status, RunStatus::Aborted);
        assert!(outcome.errors[0].contains("Insufficient training data"));
        assert!(store.list_history().unwrap().is_empty());
    }

    #[test]
    fn outcome_serializes_with_snake_case_status() {
        let store = Arc::new(VersionStore::in_memory());
        let outcome = controller(&store, grocery_corpus(50)).run(false);
        let json = serde_json::to_value(&outcome).unwrap();
        assert_eq!(json["status"], "stable");
        assert_eq!(json["states"][1], "MONITORING");
        assert!(json.get("errors").is_none());
    }
}
