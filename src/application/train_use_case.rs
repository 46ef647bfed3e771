// ============================================================
// Layer 2 — TrainUseCase
// ============================================================
// Orchestrates the fine-tuning of one fold:
//
//   Step 1: Load train / dev / test csv      (Layer 4 - data)
//   Step 2: Build and dump side vocabularies (Layer 4 - data)
//   Step 3: Encode train and dev features    (Layer 4 - data)
//   Step 4: Size the model                   (Layer 6 - infra)
//   Step 5: Save configs for prediction      (Layer 6 - infra)
//   Step 6: Run the training loop            (Layer 5 - ml)
//
// Reference: Burn Book §5 (Training)

use anyhow::{ensure, Result};
use burn::tensor::backend::AutodiffBackend;
use serde::{Deserialize, Serialize};
use std::path::Path;

use crate::application::fold::{build_pipeline, FoldData, FoldVocabs};
use crate::data::{dataset::PairDataset, segmenter::WordSegmenter};
use crate::infra::checkpoint::{CheckpointManager, PretrainedDir};
use crate::ml::model::{BertEncoderConfig, PairClassifierConfig};
use crate::ml::trainer::{run_training, MyBackend, TrainSummary};

// ─── Training Configuration ──────────────────────────────────────────────────
// Every knob of a fold run. Saved as train_config.json next to the
// checkpoint so prediction can rebuild the same encoders.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct TrainConfig {
    pub data_dir:         String,
    pub model_dir:        String,
    pub output_dir:       String,
    pub max_seq_len:      usize,
    pub split_num:        usize,
    pub batch_size:       usize,
    pub eval_batch_size:  usize,
    pub lr:               f64,
    pub epochs:           usize,
    /// Overrides `epochs` when > 0.
    pub train_steps:      usize,
    /// 0 means once per epoch.
    pub eval_steps:       usize,
    pub warmup_steps:     usize,
    pub weight_decay:     f64,
    pub adam_epsilon:     f64,
    pub max_grad_norm:    f64,
    pub grad_accum_steps: usize,
    pub label_smoothing:  f64,
    pub use_pinyin:       bool,
    pub use_words:        bool,
    pub do_eval:          bool,
    pub seed:             u64,
    pub user_dict:        Option<String>,

    // Encoder shape, used only when the model dir has no config.json
    pub hidden_size:             usize,
    pub num_heads:               usize,
    pub num_layers:              usize,
    pub intermediate_size:       usize,
    pub max_position_embeddings: usize,
    pub dropout:                 f64,
    pub aux_embedding_size:      usize,
}

impl Default for TrainConfig {
    fn default() -> Self {
        Self {
            data_dir:         "data_0".to_string(),
            model_dir:        "pretrained".to_string(),
            output_dir:       "model_0".to_string(),
            max_seq_len:      128,
            split_num:        3,
            batch_size:       8,
            eval_batch_size:  8,
            lr:               5e-5,
            epochs:           3,
            train_steps:      0,
            eval_steps:       0,
            warmup_steps:     0,
            weight_decay:     0.0,
            adam_epsilon:     1e-8,
            max_grad_norm:    1.0,
            grad_accum_steps: 1,
            label_smoothing:  0.0,
            use_pinyin:       false,
            use_words:        true,
            do_eval:          true,
            seed:             42,
            user_dict:        None,

            hidden_size:             768,
            num_heads:               12,
            num_layers:              12,
            intermediate_size:       3072,
            max_position_embeddings: 512,
            dropout:                 0.1,
            aux_embedding_size:      200,
        }
    }
}

impl TrainConfig {
    /// Optimizer updates per epoch of `n` examples.
    pub fn steps_per_epoch(&self, n: usize) -> usize {
        n.div_ceil(self.batch_size.max(1)).max(1)
    }

    pub fn total_steps(&self, n: usize) -> usize {
        if self.train_steps > 0 {
            self.train_steps
        } else {
            self.epochs * self.steps_per_epoch(n)
        }
    }

    pub fn eval_interval(&self, n: usize) -> usize {
        if self.eval_steps > 0 {
            self.eval_steps
        } else {
            self.steps_per_epoch(n)
        }
    }

    /// Examples per forward pass; `batch_size` is split across accumulation.
    pub fn micro_batch_size(&self) -> usize {
        (self.batch_size / self.grad_accum_steps.max(1)).max(1)
    }

    pub fn smoothing(&self) -> Option<f32> {
        (self.label_smoothing > 0.0).then_some(self.label_smoothing as f32)
    }

    pub fn word_segmenter(&self) -> Result<WordSegmenter> {
        WordSegmenter::from_optional_dict(self.user_dict.as_deref().map(Path::new))
    }

    /// Encoder shape: the pretrained config.json when present, else the fallbacks.
    pub fn encoder_config(&self, tokenizer_vocab: usize) -> Result<BertEncoderConfig> {
        let cfg = match PretrainedDir::new(&self.model_dir).shape()? {
            Some(shape) => {
                tracing::info!("Encoder shape from '{}/config.json'", self.model_dir);
                BertEncoderConfig::from(&shape)
            }
            None => {
                tracing::warn!("No config.json in '{}'; using command-line encoder shape", self.model_dir);
                BertEncoderConfig::new(tokenizer_vocab)
                    .with_hidden_size(self.hidden_size)
                    .with_num_heads(self.num_heads)
                    .with_num_layers(self.num_layers)
                    .with_intermediate_size(self.intermediate_size)
                    .with_max_position_embeddings(self.max_position_embeddings)
                    .with_dropout(self.dropout)
            }
        };
        ensure!(
            tokenizer_vocab <= cfg.vocab_size,
            "Tokenizer has {} ids but the encoder only embeds {}",
            tokenizer_vocab,
            cfg.vocab_size
        );
        ensure!(
            self.max_seq_len <= cfg.max_position_embeddings,
            "max_seq_len {} exceeds the encoder's {} positions",
            self.max_seq_len,
            cfg.max_position_embeddings
        );
        ensure!(
            cfg.hidden_size % cfg.num_heads == 0,
            "hidden_size {} is not divisible by num_heads {}",
            cfg.hidden_size,
            cfg.num_heads
        );
        Ok(cfg)
    }
}

// ─── TrainUseCase ─────────────────────────────────────────────────────────────
pub struct TrainUseCase {
    config: TrainConfig,
}

impl TrainUseCase {
    pub fn new(config: TrainConfig) -> Self {
        Self { config }
    }

    /// Train on the default WGPU device.
    pub fn execute(&self) -> Result<TrainSummary> {
        self.execute_on::<MyBackend>(burn::backend::wgpu::WgpuDevice::default())
    }

    pub fn execute_on<B: AutodiffBackend>(&self, device: B::Device) -> Result<TrainSummary> {
        let cfg = &self.config;
        ensure!(cfg.split_num > 0, "split_num must be at least 1");
        ensure!(cfg.max_seq_len >= 3, "max_seq_len must leave room for [CLS] and two [SEP]");

        // ── Step 1: Load the fold files ───────────────────────────────────────
        let data = FoldData::load(Path::new(&cfg.data_dir))?;

        // ── Step 2: Vocabularies over train + dev + test ──────────────────────
        let ckpt   = CheckpointManager::new(&cfg.output_dir);
        let words  = cfg.word_segmenter()?;
        let vocabs = FoldVocabs::build(&data, &words);
        vocabs.save(ckpt.dir())?;
        let (pinyin_size, word_size) = (vocabs.pinyin.len(), vocabs.words.len());

        // ── Step 3: Encode ────────────────────────────────────────────────────
        let pipeline = build_pipeline(Path::new(&cfg.model_dir), vocabs, words, cfg.max_seq_len, cfg.split_num)?;
        let train    = pipeline.convert(&data.train)?;
        let dev      = if cfg.do_eval { pipeline.convert(&data.dev)? } else { Vec::new() };

        // ── Step 4: Model shape ───────────────────────────────────────────────
        let model_cfg = PairClassifierConfig::new(
            cfg.encoder_config(pipeline.subword.vocab_size())?,
            pinyin_size,
            word_size,
        )
        .with_use_pinyin(cfg.use_pinyin)
        .with_use_words(cfg.use_words)
        .with_aux_embedding_size(cfg.aux_embedding_size)
        .with_dropout(cfg.dropout);

        // ── Step 5: Configs for prediction ────────────────────────────────────
        ckpt.save_train_config(cfg)?;
        ckpt.save_model_config(&model_cfg)?;

        // ── Step 6: Train ─────────────────────────────────────────────────────
        run_training::<B>(
            cfg,
            &model_cfg,
            Path::new(&cfg.model_dir),
            PairDataset::new(train),
            dev,
            &ckpt,
            device,
        )
    }
}
