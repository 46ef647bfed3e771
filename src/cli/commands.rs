// ============================================================
// Layer 1 — CLI Commands and Arguments
// ============================================================
// Defines the six subcommands and all their configurable flags:
//
//   split | vocab | train | predict | cross-validate | combine
//
// clap's derive macros automatically generate:
//   - help text (--help)
//   - error messages for missing args
//   - type conversion (string → usize, f64, etc.)
//
// Reference: Rust Book §12 (Building a CLI Program)

use clap::{Args, Subcommand};
use std::path::PathBuf;

use crate::application::train_use_case::TrainConfig;

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Split a labelled csv into k fold directories
    Split(SplitArgs),

    /// Dump the pinyin and word vocabularies of a fold
    Vocab(VocabArgs),

    /// Fine-tune the classifier on one fold
    Train(TrainArgs),

    /// Predict test probabilities with a trained fold
    Predict(PredictArgs),

    /// Train and predict every fold, then combine
    CrossValidate(CrossValidateArgs),

    /// Average the fold submissions into one result
    Combine(CombineArgs),
}

// ─── split ────────────────────────────────────────────────────────────────────
#[derive(Args, Debug)]
pub struct SplitArgs {
    /// Labelled csv (id,sentence1,sentence2,label)
    #[arg(long)]
    pub input: PathBuf,

    /// Test csv copied into every fold
    #[arg(long)]
    pub test: PathBuf,

    /// Parent directory of data_0 … data_{k-1}
    #[arg(long, default_value = ".")]
    pub out_dir: PathBuf,

    #[arg(long, default_value_t = 5)]
    pub folds: usize,

    #[arg(long, default_value_t = 42)]
    pub seed: u64,
}

// ─── vocab ────────────────────────────────────────────────────────────────────
#[derive(Args, Debug)]
pub struct VocabArgs {
    /// Fold directory with train.csv, dev.csv and test.csv
    #[arg(long, default_value = "data_0")]
    pub data_dir: PathBuf,

    #[arg(long, default_value = "vocab")]
    pub out_dir: PathBuf,

    /// Extra jieba dictionary ("word [freq] [tag]" per line)
    #[arg(long)]
    pub user_dict: Option<PathBuf>,
}

// ─── train ────────────────────────────────────────────────────────────────────
/// Every hyperparameter of one fold run. Shared with `cross-validate`.
#[derive(Args, Debug, Clone)]
pub struct HyperArgs {
    /// Directory with tokenizer.json or vocab.txt, optional config.json
    /// and pytorch_model.bin (or a burn model.mpk.gz)
    #[arg(long, default_value = "pretrained")]
    pub model_dir: String,

    /// Tokens per choice sequence, [CLS] and two [SEP] included
    #[arg(long, default_value_t = 128)]
    pub max_seq_len: usize,

    /// Number of subword sequences ("choices") per example
    #[arg(long, default_value_t = 3)]
    pub split_num: usize,

    /// Examples per optimizer step
    #[arg(long, default_value_t = 8)]
    pub batch_size: usize,

    #[arg(long, default_value_t = 8)]
    pub eval_batch_size: usize,

    #[arg(long, default_value_t = 5e-5)]
    pub lr: f64,

    #[arg(long, default_value_t = 3)]
    pub epochs: usize,

    /// Total optimizer steps; overrides --epochs when > 0
    #[arg(long, default_value_t = 0)]
    pub train_steps: usize,

    /// Evaluate every N steps; 0 means once per epoch
    #[arg(long, default_value_t = 0)]
    pub eval_steps: usize,

    #[arg(long, default_value_t = 0)]
    pub warmup_steps: usize,

    #[arg(long, default_value_t = 0.0)]
    pub weight_decay: f64,

    #[arg(long, default_value_t = 1e-8)]
    pub adam_epsilon: f64,

    /// Gradient-norm clip; 0 disables clipping
    #[arg(long, default_value_t = 1.0)]
    pub max_grad_norm: f64,

    #[arg(long, default_value_t = 1)]
    pub grad_accum_steps: usize,

    #[arg(long, default_value_t = 0.0)]
    pub label_smoothing: f64,

    /// Feed the pinyin channel to the classifier
    #[arg(long)]
    pub use_pinyin: bool,

    /// Do not feed the word channel to the classifier
    #[arg(long)]
    pub no_words: bool,

    /// Skip dev evaluation and keep the final model
    #[arg(long)]
    pub no_eval: bool,

    #[arg(long, default_value_t = 42)]
    pub seed: u64,

    #[arg(long)]
    pub user_dict: Option<String>,

    // Encoder shape, used only when the model dir has no config.json
    #[arg(long, default_value_t = 768)]
    pub hidden_size: usize,

    /// hidden_size must be divisible by num_heads
    #[arg(long, default_value_t = 12)]
    pub num_heads: usize,

    #[arg(long, default_value_t = 12)]
    pub num_layers: usize,

    #[arg(long, default_value_t = 3072)]
    pub intermediate_size: usize,

    #[arg(long, default_value_t = 512)]
    pub max_position_embeddings: usize,

    #[arg(long, default_value_t = 0.1)]
    pub dropout: f64,

    /// Size of the pinyin and word embeddings
    #[arg(long, default_value_t = 200)]
    pub aux_embedding_size: usize,
}

#[derive(Args, Debug)]
pub struct TrainArgs {
    #[arg(long, default_value = "data_0")]
    pub data_dir: String,

    /// Where the checkpoint, configs, vocabularies and logs go
    #[arg(long, default_value = "model_0")]
    pub output_dir: String,

    #[command(flatten)]
    pub hyper: HyperArgs,
}

/// Convert CLI hyperparameters into the application-layer TrainConfig.
/// The application layer never sees clap types.
impl From<HyperArgs> for TrainConfig {
    fn from(a: HyperArgs) -> Self {
        TrainConfig {
            model_dir:               a.model_dir,
            max_seq_len:             a.max_seq_len,
            split_num:               a.split_num,
            batch_size:              a.batch_size,
            eval_batch_size:         a.eval_batch_size,
            lr:                      a.lr,
            epochs:                  a.epochs,
            train_steps:             a.train_steps,
            eval_steps:              a.eval_steps,
            warmup_steps:            a.warmup_steps,
            weight_decay:            a.weight_decay,
            adam_epsilon:            a.adam_epsilon,
            max_grad_norm:           a.max_grad_norm,
            grad_accum_steps:        a.grad_accum_steps,
            label_smoothing:         a.label_smoothing,
            use_pinyin:              a.use_pinyin,
            use_words:               !a.no_words,
            do_eval:                 !a.no_eval,
            seed:                    a.seed,
            user_dict:               a.user_dict,
            hidden_size:             a.hidden_size,
            num_heads:               a.num_heads,
            num_layers:              a.num_layers,
            intermediate_size:       a.intermediate_size,
            max_position_embeddings: a.max_position_embeddings,
            dropout:                 a.dropout,
            aux_embedding_size:      a.aux_embedding_size,
            ..TrainConfig::default()
        }
    }
}

impl From<TrainArgs> for TrainConfig {
    fn from(a: TrainArgs) -> Self {
        TrainConfig {
            data_dir:   a.data_dir,
            output_dir: a.output_dir,
            ..a.hyper.into()
        }
    }
}

// ─── predict ──────────────────────────────────────────────────────────────────
#[derive(Args, Debug)]
pub struct PredictArgs {
    #[arg(long, default_value = "data_0")]
    pub data_dir: PathBuf,

    /// Tokenizer source, the same one used for training
    #[arg(long, default_value = "pretrained")]
    pub model_dir: PathBuf,

    /// Output directory of the trained fold
    #[arg(long, default_value = "model_0")]
    pub output_dir: PathBuf,

    #[arg(long, default_value_t = 8)]
    pub eval_batch_size: usize,
}

// ─── cross-validate ───────────────────────────────────────────────────────────
#[derive(Args, Debug)]
pub struct CrossValidateArgs {
    /// Fold i reads <data-prefix><i>
    #[arg(long, default_value = "data_")]
    pub data_prefix: String,

    /// Fold i writes <output-prefix><i>
    #[arg(long, default_value = "model_")]
    pub output_prefix: String,

    #[arg(long, default_value_t = 5)]
    pub folds: usize,

    /// Ensembled labels; probabilities go to <out-path>.prob
    #[arg(long, default_value = "result.csv")]
    pub out_path: PathBuf,

    #[command(flatten)]
    pub hyper: HyperArgs,
}

// ─── combine ──────────────────────────────────────────────────────────────────
#[derive(Args, Debug)]
pub struct CombineArgs {
    /// Reads <model-prefix><i>/sub.csv for every fold
    #[arg(long, default_value = "model_")]
    pub model_prefix: String,

    #[arg(long, default_value_t = 5)]
    pub folds: usize,

    #[arg(long, default_value = "result.csv")]
    pub out_path: PathBuf,
}
