// ============================================================
// Layer 4 — K-Fold Splitter
// ============================================================
// Shuffles the labelled pairs once and cuts them into k contiguous
// folds. Fold i uses slice i as dev and everything else as train:
//
//   n = 11, k = 3  →  fold sizes 4, 4, 3
//   fold 0: dev [0..4)   train [4..11)
//   fold 1: dev [4..8)   train [0..4) + [8..11)
//   fold 2: dev [8..11)  train [0..8)
//
// Each fold is written to <out>/data_<i>/ as train.csv, dev.csv and
// a copy of the fixed test set. Train rows are renumbered 1..=n_train
// and dev rows continue the count. Text is cleaned on the way out.
//
// The shuffle uses a seeded StdRng so a split can be reproduced.

use anyhow::{Context, Result};
use rand::{rngs::StdRng, seq::SliceRandom, SeedableRng};
use std::{
    fs,
    path::{Path, PathBuf},
};

use crate::data::preprocessor::Preprocessor;
use crate::domain::example::Example;

const HEADER: [&str; 4] = ["id", "sentence1", "sentence2", "label"];

/// (train_indices, dev_indices) for every fold of `n` items.
///
/// The first `n % k` folds get one extra dev row.
pub fn kfold_indices(n: usize, k: usize) -> Vec<(Vec<usize>, Vec<usize>)> {
    assert!(k >= 2, "k-fold needs at least 2 folds");
    let base  = n / k;
    let extra = n % k;

    let mut folds = Vec::with_capacity(k);
    let mut start = 0;
    for i in 0..k {
        let size = base + usize::from(i < extra);
        let end  = start + size;
        let dev: Vec<usize>   = (start..end).collect();
        let train: Vec<usize> = (0..start).chain(end..n).collect();
        folds.push((train, dev));
        start = end;
    }
    folds
}

/// Writes fold directories from one labelled set and one test set.
pub struct KFoldSplitter {
    folds:        usize,
    seed:         u64,
    preprocessor: Preprocessor,
}

impl KFoldSplitter {
    pub fn new(folds: usize, seed: u64) -> Self {
        Self {
            folds,
            seed,
            preprocessor: Preprocessor::new(),
        }
    }

    /// Write `<out_dir>/data_<i>/{train,dev,test}.csv` for every fold and
    /// return the fold directories.
    pub fn write_folds(&self, labelled: &[Example], test: &[Example], out_dir: &Path) -> Result<Vec<PathBuf>> {
        let mut order: Vec<usize> = (0..labelled.len()).collect();
        let mut rng = StdRng::seed_from_u64(self.seed);
        order.shuffle(&mut rng);

        let mut dirs = Vec::with_capacity(self.folds);
        for (i, (train_idx, dev_idx)) in kfold_indices(order.len(), self.folds).into_iter().enumerate() {
            let dir = out_dir.join(format!("data_{i}"));
            // best effort; the writes below report the real failure
            let _ = fs::create_dir_all(&dir);

            let train: Vec<&Example> = train_idx.iter().map(|&j| &labelled[order[j]]).collect();
            let dev: Vec<&Example>   = dev_idx.iter().map(|&j| &labelled[order[j]]).collect();

            let next = self.write_rows(&dir.join("train.csv"), &train, Some(1))?;
            self.write_rows(&dir.join("dev.csv"), &dev, Some(next))?;
            let test_rows: Vec<&Example> = test.iter().collect();
            self.write_rows(&dir.join("test.csv"), &test_rows, None)?;

            tracing::info!(
                "Fold {}: {} train, {} dev, {} test → '{}'",
                i,
                train.len(),
                dev.len(),
                test.len(),
                dir.display()
            );
            dirs.push(dir);
        }
        Ok(dirs)
    }

    /// Write one CSV. With `first_id` the rows are renumbered from it,
    /// otherwise the example guids are kept. Returns the next free id.
    fn write_rows(&self, path: &Path, rows: &[&Example], first_id: Option<usize>) -> Result<usize> {
        let mut w = csv::WriterBuilder::new()
            .quote_style(csv::QuoteStyle::Never)
            .from_path(path)
            .with_context(|| format!("Cannot create '{}'", path.display()))?;
        w.write_record(HEADER)?;

        let mut id = first_id.unwrap_or(0);
        for ex in rows {
            let guid = match first_id {
                Some(_) => id.to_string(),
                None    => ex.guid.clone(),
            };
            let label = ex.label.map(|l| l.to_string()).unwrap_or_default();
            w.write_record([
                guid.as_str(),
                self.preprocessor.clean(&ex.text_a).as_str(),
                self.preprocessor.clean(&ex.text_b).as_str(),
                label.as_str(),
            ])?;
            id += 1;
        }
        w.flush()
            .with_context(|| format!("Cannot write '{}'", path.display()))?;
        tracing::debug!("Wrote {} rows to '{}'", rows.len(), path.display());
        Ok(id)
    }
}

// ─── Unit Tests ───────────────────────────────────────────────────────────────
#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::loader::CsvExampleLoader;
    use crate::domain::traits::ExampleSource;
    use std::collections::HashSet;

    #[test]
    fn test_fold_sizes() {
        let folds = kfold_indices(11, 3);
        let sizes: Vec<usize> = folds.iter().map(|(_, dev)| dev.len()).collect();
        assert_eq!(sizes, vec![4, 4, 3]);
        assert_eq!(folds[1].1, vec![4, 5, 6, 7]);
    }

    #[test]
    fn test_every_row_is_dev_exactly_once() {
        for n in [0usize, 1, 5, 10, 23] {
            for k in 2..6 {
                let folds = kfold_indices(n, k);
                let mut seen = vec![0usize; n];
                for (train, dev) in &folds {
                    let t: HashSet<_> = train.iter().collect();
                    assert!(dev.iter().all(|d| !t.contains(d)));
                    assert_eq!(train.len() + dev.len(), n);
                    for &d in dev {
                        seen[d] += 1;
                    }
                }
                assert!(seen.iter().all(|&c| c == 1));
            }
        }
    }

    #[test]
    #[should_panic]
    fn test_single_fold_panics() {
        let _ = kfold_indices(10, 1);
    }

    fn labelled(n: usize) -> Vec<Example> {
        (0..n)
            .map(|i| Example::new(format!("x{i}"), format!("问题{i},甲"), format!("问题{i}乙"), Some(i % 2)))
            .collect()
    }

    #[test]
    fn test_write_folds_layout() {
        let dir  = tempfile::tempdir().unwrap();
        let test = vec![Example::new("t7", "测试", "句子", None)];
        let dirs = KFoldSplitter::new(3, 42)
            .write_folds(&labelled(7), &test, dir.path())
            .unwrap();
        assert_eq!(dirs.len(), 3);

        let mut dev_texts = Vec::new();
        for d in &dirs {
            let train = CsvExampleLoader::new(d.join("train.csv")).load_all().unwrap();
            let dev   = CsvExampleLoader::new(d.join("dev.csv")).load_all().unwrap();
            let tst   = CsvExampleLoader::new(d.join("test.csv")).load_all().unwrap();

            assert_eq!(train.len() + dev.len(), 7);
            // train ids 1..=n, dev continues
            assert_eq!(train[0].guid, "1");
            assert_eq!(dev[0].guid, (train.len() + 1).to_string());
            // commas were made full-width so the row stays 4 columns
            assert!(train[0].text_a.contains('，'));
            assert_eq!(tst, vec![Example::new("t7", "测试", "句子", None)]);

            dev_texts.extend(dev.into_iter().map(|e| e.text_b));
        }
        dev_texts.sort();
        let mut all: Vec<String> = labelled(7).into_iter().map(|e| e.text_b).collect();
        all.sort();
        assert_eq!(dev_texts, all);
    }

    #[test]
    fn test_same_seed_same_split() {
        let a = tempfile::tempdir().unwrap();
        let b = tempfile::tempdir().unwrap();
        KFoldSplitter::new(2, 7).write_folds(&labelled(9), &[], a.path()).unwrap();
        KFoldSplitter::new(2, 7).write_folds(&labelled(9), &[], b.path()).unwrap();
        let read = |p: &Path| fs::read_to_string(p.join("data_0").join("dev.csv")).unwrap();
        assert_eq!(read(a.path()), read(b.path()));
    }
}
