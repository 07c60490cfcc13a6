//! Labeled receipt lines used to train the category classifier.
//!
//! Providers hide where the rows come from (SQLite, a delimited export, or
//! memory). The trainer only sees a [`Corpus`].

mod fallback;
mod flat_file;
mod preprocess;
mod sqlite;

use std::collections::BTreeMap;
use std::path::PathBuf;

use serde::{Deserialize, Serialize};
use thiserror::Error;

pub use fallback::FallbackCorpus;
pub use flat_file::FlatFileCorpus;
pub use preprocess::{normalize_text, preprocess};
pub use sqlite::SqliteCorpus;

use crate::config::CorpusSettings;

/// One receipt label with its ground-truth category.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LabeledExample {
    pub text: String,
    pub category: String,
}

impl LabeledExample {
    pub fn new(text: impl Into<String>, category: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            category: category.into(),
        }
    }
}

/// Ordered collection of labeled examples.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Corpus {
    examples: Vec<LabeledExample>,
}

impl Corpus {
    pub fn new(examples: Vec<LabeledExample>) -> Self {
        Self { examples }
    }

    pub fn len(&self) -> usize {
        self.examples.len()
    }

    pub fn is_empty(&self) -> bool {
        self.examples.is_empty()
    }

    pub fn examples(&self) -> &[LabeledExample] {
        &self.examples
    }

    pub fn into_examples(self) -> Vec<LabeledExample> {
        self.examples
    }

    /// Example count per category in deterministic order.
    pub fn category_counts(&self) -> BTreeMap<&str, usize> {
        let mut counts = BTreeMap::new();
        for example in &self.examples {
            *counts.entry(example.category.as_str()).or_default() += 1;
        }
        counts
    }
}

impl FromIterator<LabeledExample> for Corpus {
    fn from_iter<I: IntoIterator<Item = LabeledExample>>(iter: I) -> Self {
        Self::new(iter.into_iter().collect())
    }
}

/// No training data could be obtained.
#[derive(Debug, Error)]
pub enum NoDataError {
    #[error("Corpus database {path} unavailable: {reason}")]
    Database { path: PathBuf, reason: String },
    #[error("Corpus file {path} unavailable: {reason}")]
    FlatFile { path: PathBuf, reason: String },
    #[error("No corpus source configured")]
    NotConfigured,
    #[error("Corpus source returned no rows")]
    Empty,
    #[error("No training data available (primary: {primary}; fallback: {fallback})")]
    Exhausted {
        primary: Box<NoDataError>,
        fallback: Box<NoDataError>,
    },
}

/// Source of labeled examples.
pub trait CorpusProvider: Send + Sync {
    /// Load the full corpus.
    fn load(&self) -> Result<Corpus, NoDataError>;
}

/// Provider over an already materialized corpus.
#[derive(Debug, Clone, Default)]
pub struct StaticCorpus {
    corpus: Corpus,
}

impl StaticCorpus {
    pub fn new(corpus: Corpus) -> Self {
        Self { corpus }
    }
}

impl CorpusProvider for StaticCorpus {
    fn load(&self) -> Result<Corpus, NoDataError> {
        Ok(self.corpus.clone())
    }
}

/// Placeholder used when no source is configured; every load fails.
#[derive(Debug, Clone, Copy, Default)]
pub struct UnconfiguredCorpus;

impl CorpusProvider for UnconfiguredCorpus {
    fn load(&self) -> Result<Corpus, NoDataError> {
        Err(NoDataError::NotConfigured)
    }
}

/// Build the provider chain described by the `[corpus]` settings.
pub fn provider_from_settings(settings: &CorpusSettings) -> Box<dyn CorpusProvider> {
    let primary = settings
        .database_path
        .as_ref()
        .map(|path| SqliteCorpus::new(path.clone(), settings.query.clone()));
    let fallback = settings.fallback_path.as_ref().map(|path| {
        FlatFileCorpus::new(path.clone())
            .with_delimiter(settings.delimiter)
            .with_columns(&settings.text_column, &settings.category_column)
    });
    match (primary, fallback) {
        (Some(primary), Some(fallback)) => Box::new(FallbackCorpus::new(
            primary,
            fallback,
            settings.min_primary_rows,
        )),
        (Some(primary), None) => Box::new(primary),
        (None, Some(fallback)) => Box::new(fallback),
        (None, None) => Box::new(UnconfiguredCorpus),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn category_counts_are_sorted_by_name() {
        let corpus: Corpus = [
            LabeledExample::new("lait demi", "laitiers"),
            LabeledExample::new("pomme gala", "fruits"),
            LabeledExample::new("yaourt nature", "laitiers"),
        ]
        .into_iter()
        .collect();
        let counts: Vec<_> = corpus.category_counts().into_iter().collect();
        assert_eq!(counts, vec![("fruits", 1), ("laitiers", 2)]);
    }

    #[test]
    fn unconfigured_settings_have_no_provider() {
        let settings = CorpusSettings::default();
        assert!(matches!(
            provider_from_settings(&settings).load(),
            Err(NoDataError::NotConfigured)
        ));
    }

    #[test]
    fn static_corpus_returns_clone() {
        let corpus = Corpus::new(vec![LabeledExample::new("pain", "boulangerie")]);
        let provider = StaticCorpus::new(corpus.clone());
        assert_eq!(provider.load().unwrap(), corpus);
    }
}
