// ============================================================
// Layer 2 — CombineUseCase
// ============================================================
// Ensembles the fold submissions:
//
//   <model_prefix>0/sub.csv ┐
//   <model_prefix>1/sub.csv ├─ mean per row ─► <out>.prob  (probabilities)
//   <model_prefix>k/sub.csv ┘                 └► <out>      (id \t label)

use anyhow::Result;
use std::path::{Path, PathBuf};

use crate::application::predict_use_case::submission_path;
use crate::infra::submission::{combine, prob_path, write_ensemble, Submission};

/// Where the ensemble went and how it leans.
#[derive(Debug, Clone)]
pub struct CombineReport {
    pub out_path:    PathBuf,
    pub prob_path:   PathBuf,
    pub rows:        usize,
    /// Mean probability of class 0 over all rows.
    pub class0_mean: f64,
}

pub struct CombineUseCase {
    model_prefix: String,
    folds:        usize,
    out_path:     PathBuf,
}

impl CombineUseCase {
    pub fn new(model_prefix: impl Into<String>, folds: usize, out_path: impl Into<PathBuf>) -> Self {
        Self {
            model_prefix: model_prefix.into(),
            folds,
            out_path: out_path.into(),
        }
    }

    pub fn execute(&self) -> Result<CombineReport> {
        let subs = (0..self.folds)
            .map(|i| {
                let path = submission_path(Path::new(&fold_dir(&self.model_prefix, i)));
                tracing::info!("Reading '{}'", path.display());
                Submission::read_csv(&path)
            })
            .collect::<Result<Vec<_>>>()?;

        let ensemble = combine(&subs)?;
        write_ensemble(&ensemble, &self.out_path)?;

        let rows        = ensemble.rows.len();
        let class0_mean = if rows == 0 {
            0.0
        } else {
            ensemble
                .rows
                .iter()
                .map(|r| r.probs.first().copied().map_or(0.0, f64::from))
                .sum::<f64>()
                / rows as f64
        };
        tracing::info!("Mean probability of label 0: {:.5}", class0_mean);

        Ok(CombineReport {
            out_path:  self.out_path.clone(),
            prob_path: prob_path(&self.out_path),
            rows,
            class0_mean,
        })
    }
}

/// `<prefix><i>`, the naming shared by fold data and fold model directories.
pub fn fold_dir(prefix: &str, i: usize) -> String {
    format!("{prefix}{i}")
}
