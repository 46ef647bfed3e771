// ============================================================
// Layer 6 — Evaluation Logger
// ============================================================
// Records every periodic dev evaluation in two files:
//
//   eval_results.txt — human readable blocks, keys sorted:
//
//       eval_f1 = 0.81234
//       eval_loss = 0.41020
//       global_step = 400
//       train_loss = 0.38711
//       ********************************************************************************
//
//   metrics.csv — one row per evaluation, for plotting:
//
//       step,train_loss,eval_loss,eval_f1,best
//       400,0.387110,0.410200,0.812340,1
//
// Both files are appended to, so a resumed run keeps its history.

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::{
    collections::BTreeMap,
    fs::{self, OpenOptions},
    io::Write,
    path::{Path, PathBuf},
};

/// One periodic evaluation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EvalMetrics {
    pub step:       usize,
    /// Mean training loss since the previous evaluation.
    pub train_loss: f64,
    pub eval_loss:  f64,
    pub eval_f1:    f64,
}

impl EvalMetrics {
    pub fn new(step: usize, train_loss: f64, eval_loss: f64, eval_f1: f64) -> Self {
        Self { step, train_loss, eval_loss, eval_f1 }
    }

    /// True when this evaluation strictly beats `best_f1`.
    pub fn is_improvement(&self, best_f1: f64) -> bool {
        self.eval_f1 > best_f1
    }
}

pub struct EvalLogger {
    results_path: PathBuf,
    csv_path:     PathBuf,
}

impl EvalLogger {
    /// Writes the CSV header if metrics.csv is new.
    pub fn new(dir: &Path) -> Result<Self> {
        fs::create_dir_all(dir)
            .with_context(|| format!("Cannot create output directory '{}'", dir.display()))?;

        let results_path = dir.join("eval_results.txt");
        let csv_path     = dir.join("metrics.csv");

        if !csv_path.exists() {
            let mut f = fs::File::create(&csv_path)
                .with_context(|| format!("Cannot create '{}'", csv_path.display()))?;
            writeln!(f, "step,train_loss,eval_loss,eval_f1,best")?;
            tracing::debug!("Created metrics CSV: '{}'", csv_path.display());
        }

        Ok(Self { results_path, csv_path })
    }

    pub fn log(&self, m: &EvalMetrics, is_best: bool) -> Result<()> {
        let mut entries = BTreeMap::new();
        entries.insert("eval_f1", format!("{}", m.eval_f1));
        entries.insert("eval_loss", format!("{}", m.eval_loss));
        entries.insert("global_step", m.step.to_string());
        entries.insert("train_loss", format!("{}", m.train_loss));

        let mut f = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.results_path)
            .with_context(|| format!("Cannot open '{}'", self.results_path.display()))?;
        for (k, v) in &entries {
            writeln!(f, "{k} = {v}")?;
        }
        writeln!(f, "{}", "*".repeat(80))?;

        let mut f = OpenOptions::new()
            .append(true)
            .open(&self.csv_path)
            .with_context(|| format!("Cannot open '{}'", self.csv_path.display()))?;
        writeln!(
            f,
            "{},{:.6},{:.6},{:.6},{}",
            m.step,
            m.train_loss,
            m.eval_loss,
            m.eval_f1,
            u8::from(is_best),
        )?;

        tracing::debug!(
            "Logged step {} metrics: eval_loss={:.4}, eval_f1={:.4}",
            m.step,
            m.eval_loss,
            m.eval_f1,
        );
        Ok(())
    }

    pub fn results_path(&self) -> &Path {
        &self.results_path
    }

    pub fn csv_path(&self) -> &Path {
        &self.csv_path
    }
}
