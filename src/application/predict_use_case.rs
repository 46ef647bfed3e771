// ============================================================
// Layer 2 — PredictUseCase
// ============================================================
// Reloads a trained fold and produces its submission:
//
//   Step 1: Read train_config.json and the dumped vocabularies
//   Step 2: Encode dev and test with the same encoders
//   Step 3: Reload best_model and report dev macro-F1
//   Step 4: Write class probabilities for test to sub.csv

use anyhow::Result;
use burn::prelude::*;
use std::path::{Path, PathBuf};

use crate::application::fold::{build_pipeline, FoldData, FoldVocabs};
use crate::infra::checkpoint::CheckpointManager;
use crate::ml::inferencer::{InferBackend, Inferencer};

pub const SUBMISSION_FILE: &str = "sub.csv";

/// What a prediction run reports back.
#[derive(Debug, Clone)]
pub struct PredictReport {
    /// `None` when the dev file has no rows.
    pub dev_f1:   Option<f64>,
    pub sub_path: PathBuf,
    pub rows:     usize,
}

pub struct PredictUseCase {
    data_dir:        PathBuf,
    model_dir:       PathBuf,
    output_dir:      PathBuf,
    eval_batch_size: usize,
}

impl PredictUseCase {
    pub fn new(
        data_dir:        impl Into<PathBuf>,
        model_dir:       impl Into<PathBuf>,
        output_dir:      impl Into<PathBuf>,
        eval_batch_size: usize,
    ) -> Self {
        Self {
            data_dir:   data_dir.into(),
            model_dir:  model_dir.into(),
            output_dir: output_dir.into(),
            eval_batch_size,
        }
    }

    /// Predict on the default WGPU device.
    pub fn execute(&self) -> Result<PredictReport> {
        self.execute_on::<InferBackend>(Default::default())
    }

    pub fn execute_on<B: Backend>(&self, device: B::Device) -> Result<PredictReport> {
        // ── Step 1: Settings and vocabularies of the trained fold ─────────────
        let ckpt   = CheckpointManager::new(&self.output_dir);
        let cfg    = ckpt.load_train_config()?;
        let vocabs = FoldVocabs::load(ckpt.dir())?;
        let words  = cfg.word_segmenter()?;

        // ── Step 2: Encode ────────────────────────────────────────────────────
        let data     = FoldData::load(&self.data_dir)?;
        let pipeline = build_pipeline(&self.model_dir, vocabs, words, cfg.max_seq_len, cfg.split_num)?;
        let dev      = pipeline.convert(&data.dev)?;
        let test     = pipeline.convert(&data.test)?;

        // ── Step 3: Dev score of the best checkpoint ──────────────────────────
        let inferencer = Inferencer::<B>::from_checkpoint(&ckpt, device)?;
        let dev_f1 = if dev.is_empty() {
            None
        } else {
            let labels: Vec<usize> = dev.iter().map(|f| f.label).collect();
            let out = inferencer.evaluate(&dev, self.eval_batch_size)?;
            let f1  = out.macro_f1(&labels, out.probs.first().map_or(2, Vec::len));
            tracing::info!("Dev F1 of '{}': {:.5}", ckpt.dir().display(), f1);
            Some(f1)
        };

        // ── Step 4: Test probabilities ────────────────────────────────────────
        let submission = inferencer.predict(&test, self.eval_batch_size)?;
        let sub_path   = self.output_dir.join(SUBMISSION_FILE);
        submission.write_csv(&sub_path)?;

        Ok(PredictReport {
            dev_f1,
            sub_path,
            rows: submission.rows.len(),
        })
    }
}

/// Path of the submission a fold output directory holds.
pub fn submission_path(output_dir: &Path) -> PathBuf {
    output_dir.join(SUBMISSION_FILE)
}

// ─── Unit Tests ───────────────────────────────────────────────────────────────
#[cfg(test)]
mod tests {
    use super::*;
    use crate::application::fold::tests::fold_fixture;
    use crate::application::train_use_case::{TrainConfig, TrainUseCase};
    use crate::infra::submission::Submission;

    type TestBackend = burn::backend::Autodiff<burn::backend::NdArray>;

    #[test]
    fn test_predict_after_training() {
        let dir = tempfile::tempdir().unwrap();
        let (data_dir, model_dir) = fold_fixture(dir.path());
        let out = dir.path().join("model_0");

        let cfg = TrainConfig {
            data_dir:                data_dir.display().to_string(),
            model_dir:               model_dir.display().to_string(),
            output_dir:              out.display().to_string(),
            max_seq_len:             16,
            split_num:               1,
            batch_size:              4,
            train_steps:             1,
            use_pinyin:              true,
            hidden_size:             8,
            num_heads:               2,
            num_layers:              1,
            intermediate_size:       16,
            max_position_embeddings: 16,
            aux_embedding_size:      4,
            ..TrainConfig::default()
        };
        TrainUseCase::new(cfg).execute_on::<TestBackend>(Default::default()).unwrap();

        let report = PredictUseCase::new(&data_dir, &model_dir, &out, 3)
            .execute_on::<burn::backend::NdArray>(Default::default())
            .unwrap();
        assert_eq!(report.rows, 2);
        let f1 = report.dev_f1.unwrap();
        assert!((0.0..=1.0).contains(&f1));

        let sub = Submission::read_csv(&submission_path(&out)).unwrap();
        assert_eq!(sub.rows[0].id, "0");
        assert_eq!(sub.num_labels(), 2);
    }

    #[test]
    fn test_predict_without_training_fails() {
        let dir = tempfile::tempdir().unwrap();
        let (data_dir, model_dir) = fold_fixture(dir.path());
        let uc = PredictUseCase::new(&data_dir, &model_dir, dir.path().join("nothing"), 2);
        assert!(uc.execute_on::<burn::backend::NdArray>(Default::default()).is_err());
    }
}
