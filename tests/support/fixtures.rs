use std::collections::BTreeMap;
use std::path::Path;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use receipt_classifier::corpus::{Corpus, LabeledExample};
use receipt_classifier::lifecycle::{
    ArtifactStore, Metrics, ModelVersion, StoreError, TrainedModel, VersionId,
};
use receipt_classifier::ml::logreg::LogRegModel;
use receipt_classifier::ml::tfidf::TfidfVectorizer;
use time::OffsetDateTime;

pub const PRODUCTS: &[(&str, &[&str])] = &[
    ("fruits", &["pomme", "banane", "poire", "orange", "kiwi"]),
    ("laitiers", &["lait", "yaourt", "fromage", "beurre", "creme"]),
    ("viandes", &["steak", "poulet", "jambon", "saucisse", "boeuf"]),
    ("epicerie", &["chocolat", "pain", "biscuit", "cafe", "sucre"]),
];

/// `per_category` receipt lines for each of the four grocery categories.
pub fn grocery_examples(per_category: usize) -> Vec<LabeledExample> {
    let mut examples = Vec::new();
    for (category, words) in PRODUCTS {
        for i in 0..per_category {
            let word = words[i % words.len()];
            examples.push(LabeledExample::new(
                format!("{} marque {}", word.to_uppercase(), i),
                *category,
            ));
        }
    }
    examples
}

pub fn grocery_corpus(per_category: usize) -> Corpus {
    Corpus::new(grocery_examples(per_category))
}

/// Semicolon export with the `Produit` / `Categories_OFF` header.
pub fn write_flat_file(path: &Path, examples: &[LabeledExample]) {
    let mut contents = String::from("id;Produit;Categories_OFF\n");
    for (idx, example) in examples.iter().enumerate() {
        contents.push_str(&format!("{idx};{};{}\n", example.text, example.category));
    }
    std::fs::write(path, contents).expect("write flat file");
}

pub fn write_database(path: &Path, examples: &[LabeledExample]) {
    let conn = rusqlite::Connection::open(path).expect("open db");
    conn.execute_batch(
        "CREATE TABLE Categories (
            id_categorie INTEGER PRIMARY KEY AUTOINCREMENT,
            id_ticket INTEGER,
            libelle TEXT,
            categorie TEXT
        );",
    )
    .expect("create table");
    for example in examples {
        conn.execute(
            "INSERT INTO Categories (id_ticket, libelle, categorie) VALUES (1, ?1, ?2)",
            (&example.text, &example.category),
        )
        .expect("insert row");
    }
}

/// One-term model that maps every known `term` to `category`.
pub fn keyword_model(terms: &[&str], categories: &[&str]) -> TrainedModel {
    let dim = terms.len();
    let vocabulary = terms
        .iter()
        .enumerate()
        .map(|(idx, term)| (term.to_string(), idx))
        .collect();
    let mut weights = vec![0.0; categories.len() * dim];
    for idx in 0..dim.min(categories.len()) {
        weights[idx * dim + idx] = 4.0;
    }
    TrainedModel {
        vectorizer: TfidfVectorizer {
            vocabulary,
            idf: vec![1.0; dim],
            remove_stop_words: true,
        },
        classifier: LogRegModel {
            classes: categories.iter().map(|c| c.to_string()).collect(),
            dim,
            weights,
            bias: vec![0.0; categories.len()],
        },
    }
}

pub fn metrics(accuracy: f64, f1: f64) -> Metrics {
    Metrics {
        accuracy,
        precision: f1,
        recall: accuracy,
        f1,
        trained_at: OffsetDateTime::now_utc(),
        sample_count: 200,
        category_count: 4,
        per_category_report: BTreeMap::new(),
    }
}

/// Failure switches shared between a test and its [`FlakyArtifactStore`].
#[derive(Default)]
pub struct Faults {
    pub write_version: AtomicBool,
    pub write_current: AtomicBool,
    pub backup: AtomicBool,
}

/// Wraps a store and fails selected writes on demand.
pub struct FlakyArtifactStore<S> {
    inner: S,
    faults: Arc<Faults>,
}

impl<S> FlakyArtifactStore<S> {
    pub fn new(inner: S, faults: Arc<Faults>) -> Self {
        Self { inner, faults }
    }
}

fn injected(flag: &AtomicBool, what: &str) -> Result<(), StoreError> {
    if flag.load(Ordering::SeqCst) {
        Err(StoreError::Backend(format!("injected {what} failure")))
    } else {
        Ok(())
    }
}

impl<S: ArtifactStore> ArtifactStore for FlakyArtifactStore<S> {
    fn list_versions(&self) -> Result<Vec<VersionId>, StoreError> {
        self.inner.list_versions()
    }

    fn read_version(&self, id: &VersionId) -> Result<ModelVersion, StoreError> {
        self.inner.read_version(id)
    }

    fn write_version(&self, version: &ModelVersion) -> Result<(), StoreError> {
        injected(&self.faults.write_version, "write")?;
        self.inner.write_version(version)
    }

    fn remove_version(&self, id: &VersionId) -> Result<(), StoreError> {
        self.inner.remove_version(id)
    }

    fn mark_published(&self, id: &VersionId) -> Result<(), StoreError> {
        self.inner.mark_published(id)
    }

    fn is_published(&self, id: &VersionId) -> Result<bool, StoreError> {
        self.inner.is_published(id)
    }

    fn backup_version(&self, id: &VersionId) -> Result<(), StoreError> {
        injected(&self.faults.backup, "backup")?;
        self.inner.backup_version(id)
    }

    fn list_backups(&self) -> Result<Vec<VersionId>, StoreError> {
        self.inner.list_backups()
    }

    fn read_current(&self) -> Result<Option<VersionId>, StoreError> {
        self.inner.read_current()
    }

    fn write_current(&self, id: &VersionId) -> Result<(), StoreError> {
        injected(&self.faults.write_current, "marker")?;
        self.inner.write_current(id)
    }
}
