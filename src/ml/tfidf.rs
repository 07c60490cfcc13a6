//! Term-frequency / inverse-document-frequency text vectorizer.
//!
//! Mirrors the classic bag-of-words recipe: tokens of two or more word
//! characters, a vocabulary capped to the most frequent terms, smoothed IDF
//! and L2-normalised rows.

use std::collections::{BTreeMap, HashMap};
use std::sync::LazyLock;

use regex::Regex;
use serde::{Deserialize, Serialize};

/// Sparse feature row as `(column, value)` pairs sorted by column.
pub type SparseVector = Vec<(usize, f32)>;

static TOKEN_PATTERN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?u)\b\w\w+\b").expect("token regex must compile"));

/// Common English function words ignored when building the vocabulary.
const ENGLISH_STOP_WORDS: &[&str] = &[
    "a", "about", "above", "after", "again", "against", "all", "am", "an", "and", "any", "are",
    "as", "at", "be", "because", "been", "before", "being", "below", "between", "both", "but",
    "by", "can", "could", "did", "do", "does", "doing", "down", "during", "each", "few", "for",
    "from", "further", "had", "has", "have", "having", "he", "her", "here", "hers", "him", "his",
    "how", "if", "in", "into", "is", "it", "its", "me", "more", "most", "my", "no", "nor", "not",
    "of", "off", "on", "once", "only", "or", "other", "our", "out", "over", "own", "same", "she",
    "should", "so", "some", "such", "than", "that", "the", "their", "them", "then", "there",
    "these", "they", "this", "those", "through", "to", "too", "under", "until", "up", "very",
    "was", "we", "were", "what", "when", "where", "which", "while", "who", "whom", "why", "with",
    "would", "you", "your",
];

/// Vectorizer fitting options.
#[derive(Debug, Clone)]
pub struct TfidfOptions {
    /// Keep at most this many terms, ranked by corpus frequency.
    pub max_features: usize,
    pub remove_stop_words: bool,
}

impl Default for TfidfOptions {
    fn default() -> Self {
        Self {
            max_features: 1000,
            remove_stop_words: true,
        }
    }
}

/// Fitted vocabulary and IDF weights.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TfidfVectorizer {
    pub vocabulary: BTreeMap<String, usize>,
    pub idf: Vec<f32>,
    pub remove_stop_words: bool,
}

impl TfidfVectorizer {
    /// Fit the vocabulary and IDF weights on `documents`.
    pub fn fit<S: AsRef<str>>(documents: &[S], options: &TfidfOptions) -> Result<Self, String> {
        let mut term_counts: HashMap<String, u64> = HashMap::new();
        let mut doc_freq: HashMap<String, u64> = HashMap::new();
        for doc in documents {
            let tokens = tokenize(doc.as_ref(), options.remove_stop_words);
            let mut seen: Vec<&String> = Vec::new();
            for token in &tokens {
                *term_counts.entry(token.clone()).or_default() += 1;
                if !seen.contains(&token) {
                    seen.push(token);
                    *doc_freq.entry(token.clone()).or_default() += 1;
                }
            }
        }
        if term_counts.is_empty() {
            return Err("Empty vocabulary; documents contain only stop words or short tokens".into());
        }

        let mut ranked: Vec<(String, u64)> = term_counts.into_iter().collect();
        ranked.sort_by(|a, b| b.1.cmp(&a.1).then_with(|| a.0.cmp(&b.0)));
        ranked.truncate(options.max_features.max(1));
        let mut kept: Vec<String> = ranked.into_iter().map(|(term, _)| term).collect();
        kept.sort();

        let n_docs = documents.len() as f64;
        let mut vocabulary = BTreeMap::new();
        let mut idf = Vec::with_capacity(kept.len());
        for (idx, term) in kept.into_iter().enumerate() {
            let df = doc_freq.get(&term).copied().unwrap_or(0) as f64;
            idf.push((((1.0 + n_docs) / (1.0 + df)).ln() + 1.0) as f32);
            vocabulary.insert(term, idx);
        }
        Ok(Self {
            vocabulary,
            idf,
            remove_stop_words: options.remove_stop_words,
        })
    }

    /// Number of feature columns.
    pub fn dim(&self) -> usize {
        self.idf.len()
    }

    /// Vectorize one document; unknown terms are ignored.
    pub fn transform(&self, text: &str) -> SparseVector {
        let mut counts: BTreeMap<usize, f32> = BTreeMap::new();
        for token in tokenize(text, self.remove_stop_words) {
            if let Some(&idx) = self.vocabulary.get(&token) {
                *counts.entry(idx).or_default() += 1.0;
            }
        }
        let mut row: SparseVector = counts
            .into_iter()
            .map(|(idx, tf)| (idx, tf * self.idf[idx]))
            .collect();
        let norm = row.iter().map(|(_, v)| v * v).sum::<f32>().sqrt();
        if norm > 0.0 {
            for (_, v) in &mut row {
                *v /= norm;
            }
        }
        row
    }

    /// Check internal consistency after deserialization.
    pub fn validate(&self) -> Result<(), String> {
        if self.vocabulary.len() != self.idf.len() {
            return Err(format!(
                "vocabulary size {} does not match idf length {}",
                self.vocabulary.len(),
                self.idf.len()
            ));
        }
        let mut seen = vec![false; self.idf.len()];
        for (term, &idx) in &self.vocabulary {
            match seen.get_mut(idx) {
                Some(slot) if !*slot => *slot = true,
                _ => return Err(format!("invalid vocabulary index {idx} for `{term}`")),
            }
        }
        if self.idf.iter().any(|v| !v.is_finite() || *v <= 0.0) {
            return Err("idf weights must be finite and positive".into());
        }
        Ok(())
    }
}

fn tokenize(text: &str, remove_stop_words: bool) -> Vec<String> {
    let lowered = text.to_lowercase();
    TOKEN_PATTERN
        .find_iter(&lowered)
        .map(|m| m.as_str())
        .filter(|token| !(remove_stop_words && ENGLISH_STOP_WORDS.contains(token)))
        .map(str::to_string)
        .collect()
}
