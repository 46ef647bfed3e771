// ============================================================
// Layer 2 — CrossValidateUseCase
// ============================================================
// The whole k-fold run:
//
//   for i in 0..k:
//       train   <data_prefix><i>  →  <output_prefix><i>
//       predict <data_prefix><i>  →  <output_prefix><i>/sub.csv
//   combine <output_prefix>*      →  <out_path>, <out_path>.prob
//
// Every fold starts from the same pretrained encoder and the same
// hyperparameters; only the data and output directories change.

use anyhow::{ensure, Result};
use burn::tensor::backend::AutodiffBackend;
use std::path::PathBuf;

use crate::application::{
    combine_use_case::{fold_dir, CombineReport, CombineUseCase},
    predict_use_case::PredictUseCase,
    train_use_case::{TrainConfig, TrainUseCase},
};
use crate::ml::trainer::MyBackend;

/// Per-fold dev scores and the ensemble.
#[derive(Debug, Clone)]
pub struct CrossValidateReport {
    pub fold_f1:  Vec<Option<f64>>,
    pub ensemble: CombineReport,
}

impl CrossValidateReport {
    /// Mean dev macro-F1 over the folds that were evaluated.
    pub fn mean_f1(&self) -> Option<f64> {
        let scored: Vec<f64> = self.fold_f1.iter().flatten().copied().collect();
        (!scored.is_empty()).then(|| scored.iter().sum::<f64>() / scored.len() as f64)
    }
}

pub struct CrossValidateUseCase {
    /// Template for every fold; its data_dir / output_dir are replaced.
    base:          TrainConfig,
    data_prefix:   String,
    output_prefix: String,
    folds:         usize,
    out_path:      PathBuf,
}

impl CrossValidateUseCase {
    pub fn new(
        base:          TrainConfig,
        data_prefix:   impl Into<String>,
        output_prefix: impl Into<String>,
        folds:         usize,
        out_path:      impl Into<PathBuf>,
    ) -> Self {
        Self {
            base,
            data_prefix:   data_prefix.into(),
            output_prefix: output_prefix.into(),
            folds,
            out_path:      out_path.into(),
        }
    }

    pub fn execute(&self) -> Result<CrossValidateReport> {
        self.execute_on::<MyBackend>(burn::backend::wgpu::WgpuDevice::default())
    }

    pub fn execute_on<B: AutodiffBackend>(&self, device: B::Device) -> Result<CrossValidateReport> {
        ensure!(self.folds > 0, "Need at least one fold");

        let mut fold_f1 = Vec::with_capacity(self.folds);
        for i in 0..self.folds {
            let cfg = TrainConfig {
                data_dir:   fold_dir(&self.data_prefix, i),
                output_dir: fold_dir(&self.output_prefix, i),
                ..self.base.clone()
            };
            tracing::info!("===== Fold {}/{}: '{}' =====", i + 1, self.folds, cfg.data_dir);

            let summary = TrainUseCase::new(cfg.clone()).execute_on::<B>(device.clone())?;
            tracing::info!("Fold {} trained for {} steps", i, summary.steps);

            let report = PredictUseCase::new(&cfg.data_dir, &cfg.model_dir, &cfg.output_dir, cfg.eval_batch_size)
                .execute_on::<B::InnerBackend>(device.clone())?;
            fold_f1.push(report.dev_f1);
        }

        let ensemble = CombineUseCase::new(self.output_prefix.clone(), self.folds, &self.out_path).execute()?;
        Ok(CrossValidateReport { fold_f1, ensemble })
    }
}
