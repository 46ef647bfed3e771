// ============================================================
// Layer 4 — Example Loader
// ============================================================
// Reads sentence pairs from a CSV file with the layout
//
//   id,sentence1,sentence2,label
//   1,花呗怎么还款,花呗如何还钱,1
//   ...
//
// Columns are read by position, so header names do not matter.
// The files are written without quoting, and the sentences have
// their ASCII commas replaced by full-width ones, so the reader
// disables quote handling and accepts ragged rows.
//
// Bad rows (too few columns, undecodable bytes) are skipped with a
// warning. A label that does not parse as an integer is treated as
// "no label", which is how test files look.

use anyhow::{Context, Result};
use std::path::{Path, PathBuf};

use crate::domain::example::Example;
use crate::domain::traits::ExampleSource;

/// Loads every row of one CSV file.
pub struct CsvExampleLoader {
    path: PathBuf,
}

impl CsvExampleLoader {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }
}

impl ExampleSource for CsvExampleLoader {
    fn load_all(&self) -> Result<Vec<Example>> {
        let mut reader = csv::ReaderBuilder::new()
            .has_headers(true)
            .flexible(true)
            .quoting(false)
            .from_path(&self.path)
            .with_context(|| format!("Cannot open data file '{}'", self.path.display()))?;

        let mut examples = Vec::new();
        let mut skipped  = 0usize;

        for (line, record) in reader.records().enumerate() {
            let record = match record {
                Ok(r) => r,
                Err(e) => {
                    tracing::warn!("Skipping row {} of '{}': {}", line + 2, self.path.display(), e);
                    skipped += 1;
                    continue;
                }
            };

            match parse_record(&record) {
                Some(ex) => examples.push(ex),
                None => {
                    tracing::warn!(
                        "Skipping row {} of '{}': expected at least 3 columns, got {}",
                        line + 2,
                        self.path.display(),
                        record.len()
                    );
                    skipped += 1;
                }
            }
        }

        tracing::debug!(
            "Read {} examples from '{}' ({} skipped)",
            examples.len(),
            self.path.display(),
            skipped
        );
        Ok(examples)
    }
}

/// Turn one CSV record into an Example, or `None` when the row is
/// too short to hold a pair.
fn parse_record(record: &csv::StringRecord) -> Option<Example> {
    if record.len() < 3 {
        return None;
    }
    let guid   = record.get(0)?.trim();
    let text_a = record.get(1)?.trim();
    let text_b = record.get(2)?.trim();
    let label  = record
        .get(3)
        .and_then(|l| l.trim().parse::<usize>().ok());

    Some(Example::new(guid, text_a, text_b, label))
}

/// Load the three files of one fold directory: train.csv, dev.csv, test.csv.
pub fn fold_files(data_dir: &Path) -> [PathBuf; 3] {
    [
        data_dir.join("train.csv"),
        data_dir.join("dev.csv"),
        data_dir.join("test.csv"),
    ]
}

// ─── Unit Tests ───────────────────────────────────────────────────────────────
#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    fn write(dir: &Path, name: &str, body: &str) -> PathBuf {
        let p = dir.join(name);
        fs::write(&p, body).unwrap();
        p
    }

    #[test]
    fn test_reads_labelled_rows() {
        let dir  = tempfile::tempdir().unwrap();
        let path = write(
            dir.path(),
            "train.csv",
            "id,sentence1,sentence2,label\n1,花呗怎么还款,花呗如何还钱,1\n2,借呗额度,花呗额度,0\n",
        );
        let rows = CsvExampleLoader::new(path).load_all().unwrap();
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0], Example::new("1", "花呗怎么还款", "花呗如何还钱", Some(1)));
        assert_eq!(rows[1].label, Some(0));
    }

    #[test]
    fn test_short_rows_are_skipped() {
        let dir  = tempfile::tempdir().unwrap();
        let path = write(
            dir.path(),
            "dev.csv",
            "id,sentence1,sentence2,label\n1,only one\n2,a,b,1\n",
        );
        let rows = CsvExampleLoader::new(path).load_all().unwrap();
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].guid, "2");
    }

    #[test]
    fn test_missing_label_is_none() {
        let dir  = tempfile::tempdir().unwrap();
        let path = write(dir.path(), "test.csv", "id,sentence1,sentence2\n0,你好,您好\n1,x,y,\n");
        let rows = CsvExampleLoader::new(path).load_all().unwrap();
        assert_eq!(rows.len(), 2);
        assert!(rows.iter().all(|r| r.label.is_none()));
    }

    #[test]
    fn test_quotes_are_kept_literally() {
        let dir  = tempfile::tempdir().unwrap();
        let path = write(dir.path(), "q.csv", "id,s1,s2,label\n1,\"引号,b,1\n");
        let rows = CsvExampleLoader::new(path).load_all().unwrap();
        assert_eq!(rows[0].text_a, "\"引号");
    }

    #[test]
    fn test_missing_file_is_an_error() {
        let loader = CsvExampleLoader::new("/definitely/not/here.csv");
        assert!(loader.load_all().is_err());
    }
}
