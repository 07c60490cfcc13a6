use std::path::PathBuf;

use rusqlite::{Connection, OpenFlags};

use super::{Corpus, CorpusProvider, LabeledExample, NoDataError};

/// Reads `(text, category)` rows from a SQLite database.
#[derive(Debug, Clone)]
pub struct SqliteCorpus {
    path: PathBuf,
    query: String,
}

impl SqliteCorpus {
    pub fn new(path: PathBuf, query: String) -> Self {
        Self { path, query }
    }

    fn unavailable(&self, reason: impl ToString) -> NoDataError {
        NoDataError::Database {
            path: self.path.clone(),
            reason: reason.to_string(),
        }
    }
}

impl CorpusProvider for SqliteCorpus {
    fn load(&self) -> Result<Corpus, NoDataError> {
        if !self.path.is_file() {
            return Err(self.unavailable("file not found"));
        }
        let conn = Connection::open_with_flags(&self.path, OpenFlags::SQLITE_OPEN_READ_ONLY)
            .map_err(|err| self.unavailable(err))?;
        let mut stmt = conn
            .prepare(&self.query)
            .map_err(|err| self.unavailable(err))?;
        let rows = stmt
            .query_map([], |row| {
                Ok((
                    row.get::<_, Option<String>>(0)?,
                    row.get::<_, Option<String>>(1)?,
                ))
            })
            .map_err(|err| self.unavailable(err))?
            .collect::<Result<Vec<_>, _>>()
            .map_err(|err| self.unavailable(err))?;
        let corpus: Corpus = rows
            .into_iter()
            .filter_map(|(text, category)| Some(LabeledExample::new(text?, category?)))
            .collect();
        tracing::debug!(
            path = %self.path.display(),
            rows = corpus.len(),
            "Loaded corpus from database"
        );
        Ok(corpus)
    }
}
