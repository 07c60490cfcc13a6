//! Default values referenced by `serde(default = ...)` attributes.

pub(super) fn default_true() -> bool {
    true
}

pub(super) fn default_corpus_query() -> String {
    "SELECT libelle, categorie FROM Categories \
     WHERE libelle IS NOT NULL AND categorie IS NOT NULL"
        .to_string()
}

pub(super) fn default_delimiter() -> char {
    ';'
}

pub(super) fn default_text_column() -> String {
    "Produit".to_string()
}

pub(super) fn default_category_column() -> String {
    "Categories_OFF".to_string()
}

pub(super) fn default_min_primary_rows() -> usize {
    100
}

pub(super) fn default_min_category_support() -> usize {
    5
}

pub(super) fn default_min_examples() -> usize {
    50
}

pub(super) fn default_test_fraction() -> f64 {
    0.2
}

pub(super) fn default_seed() -> u64 {
    42
}

pub(super) fn default_max_features() -> usize {
    1000
}

pub(super) fn default_epochs() -> usize {
    60
}

pub(super) fn default_learning_rate() -> f32 {
    0.5
}

pub(super) fn default_l2() -> f32 {
    1e-4
}

pub(super) fn default_batch_size() -> usize {
    32
}

pub(super) fn default_probe_set_version() -> String {
    "probes-v1".to_string()
}

pub(super) fn default_probe_texts() -> Vec<String> {
    ["pomme", "chocolat", "yaourt", "pain", "lait"]
        .into_iter()
        .map(str::to_string)
        .collect()
}

pub(super) fn default_diversity_texts() -> Vec<String> {
    ["pomme", "steak", "lait", "chocolat", "pain", "poisson"]
        .into_iter()
        .map(str::to_string)
        .collect()
}

pub(super) fn default_min_distinct_categories() -> usize {
    3
}

pub(super) fn default_min_accuracy() -> f64 {
    0.5
}

pub(super) fn default_min_f1() -> f64 {
    0.4
}

pub(super) fn default_monitor_window() -> usize {
    5
}

pub(super) fn default_degradation_threshold() -> f64 {
    0.1
}
