use std::collections::BTreeMap;

use super::{Corpus, LabeledExample};

/// Lowercase, trim and collapse internal whitespace of a receipt label.
pub fn normalize_text(text: &str) -> String {
    text.split_whitespace()
        .map(str::to_lowercase)
        .collect::<Vec<_>>()
        .join(" ")
}

/// Clean a raw corpus for training.
///
/// Rows with an empty text or category are removed, and any category with
/// fewer than `min_support` surviving rows is dropped entirely.
pub fn preprocess(corpus: Corpus, min_support: usize) -> Corpus {
    let cleaned: Vec<LabeledExample> = corpus
        .into_examples()
        .into_iter()
        .filter_map(|example| {
            let text = normalize_text(&example.text);
            let category = example.category.trim().to_string();
            if text.is_empty() || category.is_empty() {
                None
            } else {
                Some(LabeledExample { text, category })
            }
        })
        .collect();

    let mut counts: BTreeMap<String, usize> = BTreeMap::new();
    for example in &cleaned {
        *counts.entry(example.category.clone()).or_default() += 1;
    }
    let min_required = min_support.max(1);
    let dropped: Vec<&String> = counts
        .iter()
        .filter(|(_, count)| **count < min_required)
        .map(|(category, _)| category)
        .collect();
    if !dropped.is_empty() {
        tracing::debug!(
            dropped = dropped.len(),
            min_support = min_required,
            "Dropping under-represented categories"
        );
    }

    cleaned
        .into_iter()
        .filter(|example| counts.get(&example.category).copied().unwrap_or(0) >= min_required)
        .collect()
}
