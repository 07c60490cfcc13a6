//! Multinomial logistic regression over sparse term-weight rows.

use serde::{Deserialize, Serialize};

use crate::ml::softmax;
use crate::ml::tfidf::SparseVector;

mod train;
pub use train::{TrainDataset, TrainOptions, train_logreg};

/// Dense weights for `classes.len()` linear scores, normalised jointly by softmax.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LogRegModel {
    pub classes: Vec<String>,
    pub dim: usize,
    /// Row-major `classes x dim`.
    pub weights: Vec<f32>,
    pub bias: Vec<f32>,
}

impl LogRegModel {
    /// Validate dimensions and numeric sanity.
    pub fn validate(&self) -> Result<(), String> {
        let classes = self.classes.len();
        if classes == 0 {
            return Err("No classes defined".to_string());
        }
        if self.dim == 0 {
            return Err("Feature dimension is zero".to_string());
        }
        if self.weights.len() != classes * self.dim {
            return Err("weights length mismatch".to_string());
        }
        if self.bias.len() != classes {
            return Err("bias length mismatch".to_string());
        }
        if self
            .weights
            .iter()
            .chain(self.bias.iter())
            .any(|v| !v.is_finite())
        {
            return Err("non-finite parameter".to_string());
        }
        Ok(())
    }

    fn logits(&self, row: &[(usize, f32)]) -> Vec<f32> {
        let mut logits = self.bias.clone();
        for (c, logit) in logits.iter_mut().enumerate() {
            let base = c * self.dim;
            for &(i, x) in row {
                if i < self.dim {
                    *logit += self.weights[base + i] * x;
                }
            }
        }
        logits
    }

    /// Class probabilities for one row.
    pub fn predict_proba(&self, row: &SparseVector) -> Vec<f32> {
        if self.classes.is_empty() {
            return Vec::new();
        }
        softmax(&self.logits(row))
    }

    /// Return the argmax class index for the given row.
    pub fn predict_class_index(&self, row: &SparseVector) -> usize {
        crate::ml::argmax(&self.predict_proba(row))
    }
}
