// ============================================================
// Layer 5 — Training Loop
// ============================================================
// Step-based fine-tuning of one fold with AdamW.
//
//   total steps  = train_steps, or epochs × ceil(n / batch_size)
//   one step     = grad_accum_steps micro-batches → one update
//   every eval_steps (and at the last step):
//       report train loss, evaluate dev, append to the logs,
//       save best_model when dev macro-F1 strictly improves
//
// The shuffled DataLoader is cycled, so a step count that is not
// a whole number of epochs simply continues into the next pass.
//
// Burn notes:
//   - Training uses MyBackend (Autodiff<Wgpu>) for gradients
//   - model.valid() returns the model on the inner backend with
//     dropout disabled; evaluation runs there
//
// Reference: Burn Book §5, Loshchilov & Hutter (2019) AdamW

use anyhow::{bail, ensure, Context, Result};
use burn::{
    data::dataloader::DataLoaderBuilder,
    grad_clipping::GradientClippingConfig,
    module::AutodiffModule,
    optim::{AdamWConfig, GradientsAccumulator, GradientsParams, Optimizer},
    prelude::*,
    tensor::backend::AutodiffBackend,
};
use std::path::Path;

use crate::application::train_use_case::TrainConfig;
use crate::data::{
    batcher::PairBatcher,
    dataset::{PairDataset, PairFeature},
};
use crate::infra::{
    checkpoint::{CheckpointManager, PretrainedDir},
    metrics::{EvalLogger, EvalMetrics},
};
use crate::ml::inferencer::evaluate;
use crate::ml::model::{PairClassifier, PairClassifierConfig};
use crate::ml::schedule::WarmupLinear;

pub type MyBackend = burn::backend::Autodiff<burn::backend::Wgpu>;

/// What a finished run reports back.
#[derive(Debug, Clone, PartialEq)]
pub struct TrainSummary {
    pub steps:   usize,
    /// Best dev macro-F1, `None` when evaluation was off.
    pub best_f1: Option<f64>,
}

/// Seed, build the model around the (possibly pretrained) encoder, train.
pub fn run_training<B: AutodiffBackend>(
    cfg:       &TrainConfig,
    model_cfg: &PairClassifierConfig,
    model_dir: &Path,
    train:     PairDataset,
    dev:       Vec<PairFeature>,
    ckpt:      &CheckpointManager,
    device:    B::Device,
) -> Result<TrainSummary> {
    tracing::info!("Using device: {:?}", device);

    B::seed(cfg.seed);
    let encoder = PretrainedDir::new(model_dir).encoder::<B>(&model_cfg.encoder, &device)?;
    let model   = model_cfg.init_with_encoder(encoder, &device);

    train_fold(cfg, model, train, dev, ckpt, device)
}

pub fn train_fold<B: AutodiffBackend>(
    cfg:    &TrainConfig,
    model:  PairClassifier<B>,
    train:  PairDataset,
    dev:    Vec<PairFeature>,
    ckpt:   &CheckpointManager,
    device: B::Device,
) -> Result<TrainSummary> {
    let n = burn::data::dataset::Dataset::len(&train);
    if n == 0 {
        bail!("Training set is empty");
    }
    let total_steps = cfg.total_steps(n);
    ensure!(
        total_steps > 0,
        "Nothing to train: epochs and train_steps are both 0"
    );
    let eval_every  = cfg.eval_interval(n);
    let accum       = cfg.grad_accum_steps.max(1);
    let smoothing   = cfg.smoothing();
    let evaluating  = cfg.do_eval && !dev.is_empty();
    let dev_labels: Vec<usize> = dev.iter().map(|f| f.label).collect();

    tracing::info!("***** Running training *****");
    tracing::info!("  Num examples = {}", n);
    tracing::info!("  Batch size = {} ({} × {} accumulated)", cfg.batch_size, cfg.micro_batch_size(), accum);
    tracing::info!("  Num steps = {}", total_steps);

    // ── AdamW with gradient-norm clipping ─────────────────────────────────────
    // decay covers every parameter, biases and LayerNorm included
    let clipping  = (cfg.max_grad_norm > 0.0)
        .then(|| GradientClippingConfig::Norm(cfg.max_grad_norm as f32));
    let mut optim = AdamWConfig::new()
        .with_epsilon(cfg.adam_epsilon as f32)
        .with_weight_decay(cfg.weight_decay as f32)
        .with_grad_clipping(clipping)
        .init();
    let schedule  = WarmupLinear::new(cfg.lr, cfg.warmup_steps, total_steps);

    // ── Training data loader (AutodiffBackend) ────────────────────────────────
    let loader = DataLoaderBuilder::new(PairBatcher::<B>::new(device.clone()))
        .batch_size(cfg.micro_batch_size())
        .shuffle(cfg.seed)
        .num_workers(1)
        .build(train);

    let logger = EvalLogger::new(ckpt.dir())?;
    let mut model       = model;
    let mut batches     = loader.iter();
    let mut accumulator = GradientsAccumulator::<PairClassifier<B>>::new();
    let mut window_loss = 0.0f64;
    let mut window_n    = 0usize;
    let mut best_f1     = f64::NEG_INFINITY;

    for step in 0..total_steps {
        for _ in 0..accum {
            let batch = match batches.next() {
                Some(b) => b,
                None => {
                    batches = loader.iter();
                    batches.next().context("Training loader yielded no batch")?
                }
            };

            let out  = model.forward_loss(batch.inputs, batch.labels, smoothing);
            let loss = out.loss.div_scalar(accum as f32);
            window_loss += loss.clone().into_scalar().elem::<f64>() * accum as f64;
            window_n    += 1;

            let grads = GradientsParams::from_grads(loss.backward(), &model);
            accumulator.accumulate(&model, grads);
        }
        model = optim.step(schedule.lr(step), model, accumulator.grads());

        let done = step + 1;
        if done % eval_every != 0 && done != total_steps {
            continue;
        }

        let train_loss = window_loss / window_n.max(1) as f64;
        window_loss = 0.0;
        window_n    = 0;
        tracing::info!("***** Report result *****");
        tracing::info!("  global_step = {}", done);
        tracing::info!("  train loss = {:.4}", train_loss);

        if !evaluating {
            continue;
        }

        let valid = model.valid();
        let out   = evaluate(&valid, &dev, cfg.eval_batch_size, &device, smoothing)?;
        let f1    = out.macro_f1(&dev_labels, valid_num_labels(&out.probs));
        let m     = EvalMetrics::new(done, train_loss, out.loss, f1);
        let best  = m.is_improvement(best_f1);
        logger.log(&m, best)?;

        println!(
            "Step {:>6}/{} | train_loss={:.4} | eval_loss={:.4} | eval_f1={:.4}{}",
            done, total_steps, train_loss, out.loss, f1,
            if best { " | best" } else { "" },
        );

        if best {
            best_f1 = f1;
            ckpt.save_best(&valid)?;
            tracing::info!("Best F1 {:.5}, model saved", f1);
        }
    }

    if !evaluating {
        ckpt.save_best(&model.valid())?;
        tracing::info!("Evaluation disabled, saved the final model");
    }

    tracing::info!("Training complete!");
    Ok(TrainSummary {
        steps:   total_steps,
        best_f1: evaluating.then_some(best_f1),
    })
}

fn valid_num_labels(probs: &[Vec<f32>]) -> usize {
    probs.first().map_or(2, Vec::len)
}
