use std::collections::BTreeMap;

use time::OffsetDateTime;

use super::error::TrainError;
use super::model::{CategoryReport, Metrics, TrainedModel};
use crate::config::TrainerSettings;
use crate::corpus::{Corpus, preprocess};
use crate::ml::logreg::{TrainDataset, TrainOptions, train_logreg};
use crate::ml::metrics::{ConfusionMatrix, accuracy, precision_recall_by_class, weighted_averages};
use crate::ml::split::stratified_split;
use crate::ml::tfidf::{TfidfOptions, TfidfVectorizer};

/// Turns a labeled corpus into a fitted model and its held-out metrics.
#[derive(Debug, Clone, Default)]
pub struct Trainer {
    settings: TrainerSettings,
}

impl Trainer {
    pub fn new(settings: TrainerSettings) -> Self {
        Self { settings }
    }

    pub fn settings(&self) -> &TrainerSettings {
        &self.settings
    }

    /// Preprocess, split, fit and evaluate. Never writes anywhere.
    pub fn train(&self, corpus: Corpus) -> Result<(TrainedModel, Metrics), TrainError> {
        let settings = &self.settings;
        let raw_rows = corpus.len();
        let corpus = preprocess(corpus, settings.min_category_support);
        let categories: Vec<String> = corpus
            .category_counts()
            .into_keys()
            .map(str::to_string)
            .collect();
        if corpus.len() < settings.min_examples || categories.len() < 2 {
            return Err(TrainError::InsufficientData {
                examples: corpus.len(),
                categories: categories.len(),
                min_examples: settings.min_examples,
            });
        }
        tracing::info!(
            raw_rows,
            examples = corpus.len(),
            categories = categories.len(),
            "Training candidate model"
        );

        let index: BTreeMap<&str, usize> = categories
            .iter()
            .enumerate()
            .map(|(idx, name)| (name.as_str(), idx))
            .collect();
        let examples = corpus.examples();
        let labels: Vec<usize> = examples
            .iter()
            .map(|example| index[example.category.as_str()])
            .collect();
        let split = stratified_split(
            &labels,
            categories.len(),
            settings.test_fraction,
            settings.seed,
        )
        .map_err(TrainError::Training)?;

        let train_texts: Vec<&str> = split
            .train
            .iter()
            .map(|&i| examples[i].text.as_str())
            .collect();
        let vectorizer = TfidfVectorizer::fit(
            &train_texts,
            &TfidfOptions {
                max_features: settings.max_features,
                remove_stop_words: true,
            },
        )
        .map_err(TrainError::Training)?;

        let dataset = TrainDataset {
            classes: categories.clone(),
            dim: vectorizer.dim(),
            x: train_texts.iter().map(|t| vectorizer.transform(t)).collect(),
            y: split.train.iter().map(|&i| labels[i]).collect(),
        };
        let options = TrainOptions {
            epochs: settings.epochs,
            learning_rate: settings.learning_rate,
            l2: settings.l2,
            batch_size: settings.batch_size,
            seed: settings.seed,
            balance_classes: settings.balance_classes,
        };
        let classifier = train_logreg(&dataset, &options).map_err(TrainError::Training)?;

        let truth: Vec<usize> = split.test.iter().map(|&i| labels[i]).collect();
        let predicted: Vec<usize> = split
            .test
            .iter()
            .map(|&i| classifier.predict_class_index(&vectorizer.transform(&examples[i].text)))
            .collect();
        let cm = ConfusionMatrix::from_pairs(categories.len(), &truth, &predicted);
        let per_class = precision_recall_by_class(&cm);
        let averages = weighted_averages(&per_class);
        let per_category_report = categories
            .iter()
            .zip(&per_class)
            .map(|(name, stats)| {
                (
                    name.clone(),
                    CategoryReport {
                        precision: stats.precision,
                        recall: stats.recall,
                        f1: stats.f1,
                        support: stats.support as usize,
                    },
                )
            })
            .collect();

        let metrics = Metrics {
            accuracy: accuracy(&cm),
            precision: averages.precision,
            recall: averages.recall,
            f1: averages.f1,
            trained_at: OffsetDateTime::now_utc(),
            sample_count: corpus.len(),
            category_count: categories.len(),
            per_category_report,
        };
        tracing::info!(
            accuracy = metrics.accuracy,
            f1 = metrics.f1,
            train_rows = split.train.len(),
            test_rows = split.test.len(),
            "Candidate model trained"
        );
        Ok((
            TrainedModel {
                vectorizer,
                classifier,
            },
            metrics,
        ))
    }
}
