use std::collections::BTreeSet;
use std::panic::{AssertUnwindSafe, catch_unwind};

use serde::Serialize;

use super::model::{Metrics, TextClassifier, TrainedModel};
use super::panic_to_string;
use crate::config::ValidatorSettings;

/// Outcome of checking one candidate model.
///
/// `passed` only turns false for structural failures. Weak metrics and
/// low diversity are warnings.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct ValidationReport {
    pub passed: bool,
    pub errors: Vec<String>,
    pub warnings: Vec<String>,
    pub probe_set_version: String,
}

/// Runs the fixed probe sets and advisory quality gates.
#[derive(Debug, Clone, Default)]
pub struct Validator {
    settings: ValidatorSettings,
}

impl Validator {
    pub fn new(settings: ValidatorSettings) -> Self {
        Self { settings }
    }

    /// Full check of a freshly trained model, including its integrity.
    pub fn validate_model(&self, model: &TrainedModel, metrics: &Metrics) -> ValidationReport {
        let mut report = self.validate(model, metrics);
        if let Err(err) = model.check_integrity() {
            report.errors.insert(0, format!("Integrity check failed: {err}"));
            report.passed = false;
        }
        report
    }

    /// Probe `classifier` and grade `metrics`. Never fails; every problem
    /// becomes a report entry.
    pub fn validate(&self, classifier: &dyn TextClassifier, metrics: &Metrics) -> ValidationReport {
        let settings = &self.settings;
        let mut report = ValidationReport {
            passed: true,
            probe_set_version: settings.probe_set_version.clone(),
            ..ValidationReport::default()
        };

        match run_probe(classifier, &settings.probe_texts) {
            Ok(predictions) if predictions.len() == settings.probe_texts.len() => {}
            Ok(predictions) => report.errors.push(format!(
                "Expected {} predictions for the probe set, got {}",
                settings.probe_texts.len(),
                predictions.len()
            )),
            Err(err) => report.errors.push(format!("Probe prediction failed: {err}")),
        }

        if metrics.accuracy < settings.min_accuracy {
            report.warnings.push(format!(
                "Low accuracy: {:.3} < {:.3}",
                metrics.accuracy, settings.min_accuracy
            ));
        }
        if metrics.f1 < settings.min_f1 {
            report.warnings.push(format!(
                "Low F1 score: {:.3} < {:.3}",
                metrics.f1, settings.min_f1
            ));
        }

        if !settings.diversity_texts.is_empty() {
            match run_probe(classifier, &settings.diversity_texts) {
                Ok(predictions) => {
                    let distinct: BTreeSet<&str> =
                        predictions.iter().map(String::as_str).collect();
                    if distinct.len() < settings.min_distinct_categories {
                        report.warnings.push(format!(
                            "Low prediction diversity: {} distinct categories for {} probes (want {})",
                            distinct.len(),
                            settings.diversity_texts.len(),
                            settings.min_distinct_categories
                        ));
                    }
                }
                Err(err) => report
                    .errors
                    .push(format!("Diversity probe prediction failed: {err}")),
            }
        }

        report.passed = report.errors.is_empty();
        report
    }
}

fn run_probe(classifier: &dyn TextClassifier, texts: &[String]) -> Result<Vec<String>, String> {
    let inputs: Vec<&str> = texts.iter().map(String::as_str).collect();
    catch_unwind(AssertUnwindSafe(|| classifier.predict(&inputs)))
        .unwrap_or_else(|payload| Err(format!("panicked: {}", panic_to_string(payload))))
}
