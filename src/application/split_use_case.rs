// ============================================================
// Layer 2 — SplitUseCase
// ============================================================
// Turns one labelled CSV and one test CSV into k fold directories
// (data_0 … data_{k-1}) that `train` and `cross-validate` read.

use anyhow::{ensure, Result};
use std::path::PathBuf;

use crate::data::{loader::CsvExampleLoader, splitter::KFoldSplitter};
use crate::domain::traits::ExampleSource;

pub struct SplitUseCase {
    input:   PathBuf,
    test:    PathBuf,
    out_dir: PathBuf,
    folds:   usize,
    seed:    u64,
}

impl SplitUseCase {
    pub fn new(
        input:   impl Into<PathBuf>,
        test:    impl Into<PathBuf>,
        out_dir: impl Into<PathBuf>,
        folds:   usize,
        seed:    u64,
    ) -> Self {
        Self {
            input:   input.into(),
            test:    test.into(),
            out_dir: out_dir.into(),
            folds,
            seed,
        }
    }

    /// Write the fold directories and return their paths.
    pub fn execute(&self) -> Result<Vec<PathBuf>> {
        ensure!(self.folds >= 2, "Need at least 2 folds, got {}", self.folds);

        let all = CsvExampleLoader::new(&self.input).load_all()?;
        let (labelled, unlabelled): (Vec<_>, Vec<_>) = all.into_iter().partition(|e| e.is_labelled());
        if !unlabelled.is_empty() {
            tracing::warn!(
                "Dropping {} rows without a label from '{}'",
                unlabelled.len(),
                self.input.display()
            );
        }
        ensure!(
            labelled.len() >= self.folds,
            "'{}' has {} labelled rows, fewer than {} folds",
            self.input.display(),
            labelled.len(),
            self.folds
        );

        let test = CsvExampleLoader::new(&self.test).load_all()?;
        KFoldSplitter::new(self.folds, self.seed).write_folds(&labelled, &test, &self.out_dir)
    }
}
