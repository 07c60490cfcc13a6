use std::collections::BTreeMap;
use std::fmt;
use std::sync::LazyLock;

use regex::Regex;
use serde::{Deserialize, Serialize};
use time::format_description::FormatItem;
use time::macros::format_description;
use time::{Duration, OffsetDateTime, PrimitiveDateTime, UtcOffset};

use crate::corpus::normalize_text;
use crate::ml::logreg::LogRegModel;
use crate::ml::tfidf::TfidfVectorizer;

static VERSION_ID_PATTERN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^\d{8}T\d{6}\.\d{3}Z(-\d{6})?$").expect("version id regex must compile")
});

const MAX_SEQUENCE: u32 = 999_999;
const TIMESTAMP_FORMAT: &[FormatItem<'static>] =
    format_description!("[year][month][day]T[hour][minute][second].[subsecond digits:3]Z");

/// Sortable model version identifier.
///
/// A UTC timestamp with millisecond precision (`YYYYMMDDTHHMMSS.mmmZ`),
/// optionally followed by a `-NNNNNN` sequence when several versions land in
/// the same millisecond or the clock moved backwards. Lexicographic order is
/// deployment order.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct VersionId(String);

impl VersionId {
    /// Parse an id, rejecting anything not produced by [`VersionId::next`].
    pub fn parse(raw: &str) -> Option<Self> {
        VERSION_ID_PATTERN
            .is_match(raw)
            .then(|| Self(raw.to_string()))
    }

    /// Id for a version created at `now`, strictly greater than `newest`.
    pub fn next(now: OffsetDateTime, newest: Option<&VersionId>) -> Self {
        let candidate = Self::at(now);
        match newest {
            Some(newest) if candidate <= *newest => newest.successor(),
            _ => candidate,
        }
    }

    fn at(time: OffsetDateTime) -> Self {
        let t = time.to_offset(UtcOffset::UTC);
        Self(format!(
            "{:04}{:02}{:02}T{:02}{:02}{:02}.{:03}Z",
            t.year(),
            u8::from(t.month()),
            t.day(),
            t.hour(),
            t.minute(),
            t.second(),
            t.millisecond()
        ))
    }

    /// Smallest id after `self`. An exhausted sequence moves the timestamp
    /// forward one millisecond instead of growing the suffix.
    fn successor(&self) -> Self {
        let (base, seq) = match self.0.split_once('-') {
            Some((base, seq)) => (base, seq.parse::<u32>().unwrap_or(0)),
            None => (self.0.as_str(), 0),
        };
        if seq < MAX_SEQUENCE {
            return Self(format!("{base}-{:06}", seq + 1));
        }
        match PrimitiveDateTime::parse(base, TIMESTAMP_FORMAT) {
            Ok(t) => Self::at((t + Duration::milliseconds(1)).assume_utc()),
            // Unreachable for ids built by `next`; the writer rejects the duplicate.
            Err(_) => self.clone(),
        }
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for VersionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Held-out scores for one category.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct CategoryReport {
    pub precision: f64,
    pub recall: f64,
    pub f1: f64,
    pub support: usize,
}

/// Evaluation record of one trained model.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Metrics {
    pub accuracy: f64,
    pub precision: f64,
    pub recall: f64,
    pub f1: f64,
    #[serde(with = "time::serde::rfc3339")]
    pub trained_at: OffsetDateTime,
    /// Examples used after preprocessing (train and test).
    pub sample_count: usize,
    pub category_count: usize,
    pub per_category_report: BTreeMap<String, CategoryReport>,
}

/// Anything that maps receipt labels to category names.
pub trait TextClassifier: Send + Sync {
    /// Predict one category per input, in order.
    fn predict(&self, texts: &[&str]) -> Result<Vec<String>, String>;
}

/// Fitted vectorizer and classifier, always replaced as a pair.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrainedModel {
    pub vectorizer: TfidfVectorizer,
    pub classifier: LogRegModel,
}

impl TrainedModel {
    /// Confirm both halves are valid and agree on the feature space.
    pub fn check_integrity(&self) -> Result<(), String> {
        self.vectorizer
            .validate()
            .map_err(|err| format!("vectorizer: {err}"))?;
        self.classifier
            .validate()
            .map_err(|err| format!("classifier: {err}"))?;
        if self.vectorizer.dim() != self.classifier.dim {
            return Err(format!(
                "vectorizer produces {} features but classifier expects {}",
                self.vectorizer.dim(),
                self.classifier.dim
            ));
        }
        Ok(())
    }

    pub fn categories(&self) -> &[String] {
        &self.classifier.classes
    }
}

impl TextClassifier for TrainedModel {
    fn predict(&self, texts: &[&str]) -> Result<Vec<String>, String> {
        self.check_integrity()?;
        Ok(texts
            .iter()
            .map(|text| {
                let row = self.vectorizer.transform(&normalize_text(text));
                let idx = self.classifier.predict_class_index(&row);
                self.classifier.classes[idx].clone()
            })
            .collect())
    }
}

/// A deployed model with its metrics.
#[derive(Debug, Clone, PartialEq)]
pub struct ModelVersion {
    pub version_id: VersionId,
    pub model: TrainedModel,
    pub metrics: Metrics,
}
