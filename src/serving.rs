//! Prediction against the active model snapshot.

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::lifecycle::{StoreError, TextClassifier, VersionId, VersionStore};

#[derive(Debug, Error)]
pub enum PredictError {
    #[error("No model has been deployed yet")]
    NoActiveModel,
    #[error("Model {version_id} failed to predict: {reason}")]
    Classifier { version_id: VersionId, reason: String },
    #[error(transparent)]
    Store(#[from] StoreError),
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Prediction {
    pub text: String,
    pub category: String,
}

/// Classify `texts` with the model active when the call starts.
///
/// Inputs are trimmed and blank ones skipped. A deploy running concurrently
/// does not affect this call.
pub fn predict<S: AsRef<str>>(
    store: &VersionStore,
    texts: &[S],
) -> Result<Vec<Prediction>, PredictError> {
    let snapshot = store.get_active()?.ok_or(PredictError::NoActiveModel)?;
    let inputs: Vec<&str> = texts
        .iter()
        .map(|text| text.as_ref().trim())
        .filter(|text| !text.is_empty())
        .collect();
    if inputs.is_empty() {
        return Ok(Vec::new());
    }
    let categories =
        snapshot
            .model
            .predict(&inputs)
            .map_err(|reason| PredictError::Classifier {
                version_id: snapshot.version_id.clone(),
                reason,
            })?;
    Ok(inputs
        .into_iter()
        .zip(categories)
        .map(|(text, category)| Prediction {
            text: text.to_string(),
            category,
        })
        .collect())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::lifecycle::test_support::{sample_metrics, sample_model};

    #[test]
    fn empty_store_reports_no_active_model() {
        let store = VersionStore::in_memory();
        assert!(matches!(
            predict(&store, &["lait"]),
            Err(PredictError::NoActiveModel)
        ));
    }

    #[test]
    fn trims_and_skips_blank_inputs() {
        let store = VersionStore::in_memory();
        store.deploy(sample_model(), sample_metrics(0.9)).unwrap();
        let predictions = predict(&store, &["  Lait demi ", "", "   ", "steak"]).unwrap();
        assert_eq!(
            predictions,
            vec![
                Prediction {
                    text: "Lait demi".into(),
                    category: "laitiers".into(),
                },
                Prediction {
                    text: "steak".into(),
                    category: "viandes".into(),
                },
            ]
        );
        assert!(predict(&store, &[" "]).unwrap().is_empty());
    }
}
