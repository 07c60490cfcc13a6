use std::collections::BTreeMap;

use time::OffsetDateTime;

use super::model::{CategoryReport, Metrics, ModelVersion, TrainedModel, VersionId};
use crate::corpus::{Corpus, LabeledExample};
use crate::ml::logreg::LogRegModel;
use crate::ml::tfidf::TfidfVectorizer;

const PRODUCTS: &[(&str, &[&str])] = &[
    ("fruits", &["pomme", "banane", "poire", "orange", "kiwi"]),
    ("laitiers", &["lait", "yaourt", "fromage", "beurre", "creme"]),
    ("viandes", &["steak", "poulet", "jambon", "saucisse", "boeuf"]),
    ("epicerie", &["chocolat", "pain", "biscuit", "cafe", "sucre"]),
];

/// Four well separated categories with `per_category` rows each.
pub(crate) fn grocery_corpus(per_category: usize) -> Corpus {
    PRODUCTS
        .iter()
        .flat_map(|(category, words)| {
            (0..per_category).map(move |i| {
                LabeledExample::new(format!("{} bio {}", words[i % words.len()], i), *category)
            })
        })
        .collect()
}

/// Hand-built three-term model: `lait`, `pomme`, `steak`.
pub(crate) fn sample_model() -> TrainedModel {
    let vocabulary = [("lait", 0), ("pomme", 1), ("steak", 2)]
        .into_iter()
        .map(|(term, idx)| (term.to_string(), idx))
        .collect();
    TrainedModel {
        vectorizer: TfidfVectorizer {
            vocabulary,
            idf: vec![1.0; 3],
            remove_stop_words: true,
        },
        classifier: LogRegModel {
            classes: vec!["laitiers".into(), "fruits".into(), "viandes".into()],
            dim: 3,
            weights: vec![1.0, 0.0, 0.0, 0.0, 1.0, 0.0, 0.0, 0.0, 1.0],
            bias: vec![0.0; 3],
        },
    }
}

pub(crate) fn sample_metrics(score: f64) -> Metrics {
    let mut per_category_report = BTreeMap::new();
    per_category_report.insert(
        "fruits".to_string(),
        CategoryReport {
            precision: score,
            recall: score,
            f1: score,
            support: 10,
        },
    );
    Metrics {
        accuracy: score,
        precision: score,
        recall: score,
        f1: score,
        trained_at: OffsetDateTime::UNIX_EPOCH,
        sample_count: 50,
        category_count: 3,
        per_category_report,
    }
}

pub(crate) fn sample_version(id: &str) -> ModelVersion {
    ModelVersion {
        version_id: VersionId::parse(id).expect("test version id"),
        model: sample_model(),
        metrics: sample_metrics(0.8),
    }
}
