// ============================================================
// Layer 5 — Inferencer
// ============================================================
// Batched forward passes without gradients, used both for the
// periodic dev evaluation inside training and for prediction
// with a reloaded checkpoint.
//
// Features are batched in order (no shuffling), so probability
// row i always belongs to feature i.

use anyhow::{anyhow, Result};
use burn::{
    data::dataloader::batcher::Batcher,
    prelude::*,
    tensor::activation::softmax,
};

use crate::data::{batcher::PairBatcher, dataset::PairFeature};
use crate::infra::{
    checkpoint::CheckpointManager,
    submission::{Submission, SubmissionRow},
};
use crate::ml::model::{classification_loss, PairClassifier};
use crate::ml::scoring::{argmax, macro_f1};

pub type InferBackend = burn::backend::Wgpu;

/// Mean loss and per-example class probabilities.
#[derive(Debug, Clone)]
pub struct EvalOutput {
    pub loss:  f64,
    pub probs: Vec<Vec<f32>>,
}

impl EvalOutput {
    pub fn predictions(&self) -> Vec<usize> {
        self.probs.iter().map(|p| argmax(p)).collect()
    }

    pub fn macro_f1(&self, labels: &[usize], num_labels: usize) -> f64 {
        macro_f1(&self.predictions(), labels, num_labels)
    }
}

/// Run `model` over `features` in batches of `batch_size`.
pub fn evaluate<B: Backend>(
    model:      &PairClassifier<B>,
    features:   &[PairFeature],
    batch_size: usize,
    device:     &B::Device,
    smoothing:  Option<f32>,
) -> Result<EvalOutput> {
    let batcher = PairBatcher::<B>::new(device.clone());

    let mut loss_sum = 0.0f64;
    let mut batches  = 0usize;
    let mut probs    = Vec::with_capacity(features.len());

    for chunk in features.chunks(batch_size.max(1)) {
        let batch  = batcher.batch(chunk.to_vec());
        let logits = model.forward(batch.inputs);
        let [_, num_labels] = logits.dims();

        let loss: f64 = classification_loss(logits.clone(), batch.labels, smoothing)
            .into_scalar()
            .elem::<f64>();
        loss_sum += loss;
        batches  += 1;

        let flat = softmax(logits, 1)
            .into_data()
            .convert::<f32>()
            .to_vec::<f32>()
            .map_err(|e| anyhow!("Cannot read probabilities: {e:?}"))?;
        probs.extend(flat.chunks(num_labels).map(<[f32]>::to_vec));
    }

    let loss = if batches > 0 { loss_sum / batches as f64 } else { 0.0 };
    Ok(EvalOutput { loss, probs })
}

/// A trained fold model ready for evaluation and prediction.
pub struct Inferencer<B: Backend> {
    model:  PairClassifier<B>,
    device: B::Device,
}

impl<B: Backend> Inferencer<B> {
    pub fn new(model: PairClassifier<B>, device: B::Device) -> Self {
        Self { model, device }
    }

    /// Rebuild the model from model_config.json and load best_model.mpk.gz.
    pub fn from_checkpoint(ckpt: &CheckpointManager, device: B::Device) -> Result<Self> {
        let cfg   = ckpt.load_model_config()?;
        let model = ckpt.load_best(cfg.init::<B>(&device), &device)?;
        tracing::info!("Model loaded from '{}'", ckpt.dir().display());
        Ok(Self { model, device })
    }

    pub fn evaluate(&self, features: &[PairFeature], batch_size: usize) -> Result<EvalOutput> {
        evaluate(&self.model, features, batch_size, &self.device, None)
    }

    /// Class probabilities for every feature, keyed by guid.
    pub fn predict(&self, features: &[PairFeature], batch_size: usize) -> Result<Submission> {
        let out  = self.evaluate(features, batch_size)?;
        let rows = features
            .iter()
            .zip(out.probs)
            .map(|(f, probs)| SubmissionRow { id: f.guid.clone(), probs })
            .collect();
        Ok(Submission::new(rows))
    }
}
