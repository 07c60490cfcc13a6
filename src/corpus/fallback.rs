use super::{Corpus, CorpusProvider, NoDataError};

/// Primary source with a flat-file fallback for small or missing databases.
pub struct FallbackCorpus<P, F> {
    primary: P,
    fallback: F,
    min_primary_rows: usize,
}

impl<P, F> FallbackCorpus<P, F> {
    pub fn new(primary: P, fallback: F, min_primary_rows: usize) -> Self {
        Self {
            primary,
            fallback,
            min_primary_rows,
        }
    }
}

impl<P: CorpusProvider, F: CorpusProvider> CorpusProvider for FallbackCorpus<P, F> {
    fn load(&self) -> Result<Corpus, NoDataError> {
        let primary = match self.primary.load() {
            Ok(corpus) if corpus.len() >= self.min_primary_rows => return Ok(corpus),
            Ok(corpus) => {
                tracing::info!(
                    rows = corpus.len(),
                    min_rows = self.min_primary_rows,
                    "Primary corpus too small, trying fallback"
                );
                Ok(corpus)
            }
            Err(err) => {
                tracing::warn!("Primary corpus unavailable, trying fallback: {err}");
                Err(err)
            }
        };

        match (primary, self.fallback.load()) {
            (_, Ok(corpus)) => {
                tracing::info!(rows = corpus.len(), "Using fallback corpus");
                Ok(corpus)
            }
            (Ok(corpus), Err(err)) if !corpus.is_empty() => {
                tracing::warn!("Fallback corpus unavailable, keeping primary rows: {err}");
                Ok(corpus)
            }
            (Ok(_), Err(err)) => Err(NoDataError::Exhausted {
                primary: Box::new(NoDataError::Empty),
                fallback: Box::new(err),
            }),
            (Err(primary), Err(fallback)) => Err(NoDataError::Exhausted {
                primary: Box::new(primary),
                fallback: Box::new(fallback),
            }),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::corpus::{LabeledExample, StaticCorpus};
    use std::path::PathBuf;

    struct Missing;

    impl CorpusProvider for Missing {
        fn load(&self) -> Result<Corpus, NoDataError> {
            Err(NoDataError::FlatFile {
                path: PathBuf::from("missing.csv"),
                reason: "not found".into(),
            })
        }
    }

    fn rows(n: usize, category: &str) -> StaticCorpus {
        StaticCorpus::new(
            (0..n)
                .map(|i| LabeledExample::new(format!("item {i}"), category))
                .collect(),
        )
    }

    #[test]
    fn large_primary_wins() {
        let provider = FallbackCorpus::new(rows(100, "db"), rows(5, "file"), 100);
        let corpus = provider.load().unwrap();
        assert_eq!(corpus.len(), 100);
        assert_eq!(corpus.examples()[0].category, "db");
    }

    #[test]
    fn small_primary_switches_to_fallback() {
        let provider = FallbackCorpus::new(rows(10, "db"), rows(5, "file"), 100);
        let corpus = provider.load().unwrap();
        assert_eq!(corpus.examples()[0].category, "file");
    }

    #[test]
    fn small_primary_kept_when_fallback_missing() {
        let provider = FallbackCorpus::new(rows(10, "db"), Missing, 100);
        assert_eq!(provider.load().unwrap().len(), 10);
    }

    #[test]
    fn both_unavailable_is_no_data() {
        let provider = FallbackCorpus::new(Missing, Missing, 100);
        assert!(matches!(
            provider.load(),
            Err(NoDataError::Exhausted { .. })
        ));
        let provider = FallbackCorpus::new(rows(0, "db"), Missing, 100);
        assert!(provider.load().is_err());
    }
}
