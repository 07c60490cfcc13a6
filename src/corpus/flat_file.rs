use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::PathBuf;

use super::{Corpus, CorpusProvider, LabeledExample, NoDataError};

/// Reads a delimited export with a header row (`Produit;Categories_OFF` by default).
#[derive(Debug, Clone)]
pub struct FlatFileCorpus {
    path: PathBuf,
    delimiter: char,
    text_column: String,
    category_column: String,
}

impl FlatFileCorpus {
    pub fn new(path: PathBuf) -> Self {
        Self {
            path,
            delimiter: ';',
            text_column: "Produit".to_string(),
            category_column: "Categories_OFF".to_string(),
        }
    }

    pub fn with_delimiter(mut self, delimiter: char) -> Self {
        self.delimiter = delimiter;
        self
    }

    pub fn with_columns(mut self, text_column: &str, category_column: &str) -> Self {
        self.text_column = text_column.to_string();
        self.category_column = category_column.to_string();
        self
    }

    fn unavailable(&self, reason: impl ToString) -> NoDataError {
        NoDataError::FlatFile {
            path: self.path.clone(),
            reason: reason.to_string(),
        }
    }

    fn column_index(&self, header: &[String], name: &str) -> Result<usize, NoDataError> {
        header
            .iter()
            .position(|column| column.trim().trim_start_matches('\u{feff}') == name)
            .ok_or_else(|| self.unavailable(format!("missing column `{name}`")))
    }
}

impl CorpusProvider for FlatFileCorpus {
    fn load(&self) -> Result<Corpus, NoDataError> {
        let file = File::open(&self.path).map_err(|err| self.unavailable(err))?;
        let mut lines = BufReader::new(file).lines();
        let header = match lines.next() {
            Some(line) => split_record(&line.map_err(|err| self.unavailable(err))?, self.delimiter),
            None => return Err(self.unavailable("file is empty")),
        };
        let text_idx = self.column_index(&header, &self.text_column)?;
        let category_idx = self.column_index(&header, &self.category_column)?;

        let mut examples = Vec::new();
        let mut skipped = 0usize;
        for line in lines {
            let line = line.map_err(|err| self.unavailable(err))?;
            if line.trim().is_empty() {
                continue;
            }
            let fields = split_record(&line, self.delimiter);
            match (fields.get(text_idx), fields.get(category_idx)) {
                (Some(text), Some(category)) => {
                    examples.push(LabeledExample::new(text.as_str(), category.as_str()));
                }
                _ => skipped += 1,
            }
        }
        if skipped > 0 {
            tracing::warn!(
                path = %self.path.display(),
                skipped,
                "Skipped short rows in corpus file"
            );
        }
        Ok(Corpus::new(examples))
    }
}

/// Split one record, honoring double-quoted fields and `""` escapes.
fn split_record(line: &str, delimiter: char) -> Vec<String> {
    let mut fields = Vec::new();
    let mut current = String::new();
    let mut in_quotes = false;
    let mut chars = line.trim_end_matches('\r').chars().peekable();
    while let Some(ch) = chars.next() {
        match ch {
            '"' if in_quotes && chars.peek() == Some(&'"') => {
                current.push('"');
                chars.next();
            }
            '"' => in_quotes = !in_quotes,
            c if c == delimiter && !in_quotes => fields.push(std::mem::take(&mut current)),
            c => current.push(c),
        }
    }
    fields.push(current);
    fields
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn split_record_handles_quotes_and_escapes() {
        assert_eq!(
            split_record(r#"a;"b;c";"say ""hi""""#, ';'),
            vec!["a", "b;c", r#"say "hi""#]
        );
        assert_eq!(split_record("x,,y\r", ','), vec!["x", "", "y"]);
    }

    #[test]
    fn loads_columns_by_header_name() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("tickets.csv");
        std::fs::write(
            &path,
            "Ticket;Produit;Categories_OFF\n1;POMME GALA;fruits\n\n2;\"LAIT; DEMI\";laitiers\n3;orphan\n",
        )
        .unwrap();

        let corpus = FlatFileCorpus::new(path).load().unwrap();
        assert_eq!(
            corpus.examples(),
            &[
                LabeledExample::new("POMME GALA", "fruits"),
                LabeledExample::new("LAIT; DEMI", "laitiers"),
            ]
        );
    }

    #[test]
    fn custom_columns_and_delimiter() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("export.csv");
        std::fs::write(&path, "label,cat\npain,boulangerie\n").unwrap();
        let corpus = FlatFileCorpus::new(path)
            .with_delimiter(',')
            .with_columns("label", "cat")
            .load()
            .unwrap();
        assert_eq!(corpus.len(), 1);
    }

    #[test]
    fn missing_column_or_file_is_no_data() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("export.csv");
        std::fs::write(&path, "label;cat\npain;boulangerie\n").unwrap();
        assert!(matches!(
            FlatFileCorpus::new(path).load(),
            Err(NoDataError::FlatFile { .. })
        ));
        assert!(FlatFileCorpus::new(dir.path().join("absent.csv")).load().is_err());
    }
}
