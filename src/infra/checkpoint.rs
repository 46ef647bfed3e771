// ============================================================
// Layer 6 — Checkpoint Manager
// ============================================================
// Saves and restores everything a fold's output directory holds
// about the model:
//
//   <output_dir>/
//     best_model.mpk.gz    ← weights with the best dev macro-F1
//     model_config.json    ← PairClassifierConfig (architecture)
//     train_config.json    ← TrainConfig (hyperparameters, paths)
//
// Weights go through Burn's CompactRecorder (MessagePack + gzip);
// loading fails if the architecture does not match the config.
//
// PretrainedDir reads the pretrained model directory instead:
//
//   <model_dir>/
//     config.json          ← Hugging Face BERT shape (optional)
//     pytorch_model.bin    ← Hugging Face BERT weights (optional)
//     model.mpk.gz         ← BertEncoder record (optional, used when
//                            there is no pytorch_model.bin)
//
// PyTorch names are mapped onto the encoder's fields in order:
//
//   bert.embeddings.word_embeddings.*           → word_embeddings.*
//   bert.embeddings.LayerNorm.*                 → embedding_norm.*
//   bert.encoder.layer.N.attention.self.query.* → layers.N.self_attn.query.*
//   bert.encoder.layer.N.attention.output.*     → layers.N.self_attn.output.*, attn_norm.*
//   bert.encoder.layer.N.intermediate.dense.*   → layers.N.intermediate.*
//   bert.encoder.layer.N.output.*               → layers.N.output.*, ffn_norm.*
//   bert.pooler.dense.*                         → pooler.*
//
// Linear weights are transposed and LayerNorm weight/bias renamed to
// gamma/beta by the recorder itself. Heads the checkpoint carries
// beyond the encoder (cls.*, classifier.*) are ignored.
// Reference: Burn Book §5 (Records and Checkpointing)

use anyhow::{Context, Result};
use burn::{
    prelude::*,
    record::{CompactRecorder, FullPrecisionSettings, Recorder},
};
use burn_import::pytorch::{LoadArgs, PyTorchFileRecorder};
use std::{
    fs,
    path::{Path, PathBuf},
};

use crate::application::train_use_case::TrainConfig;
use crate::ml::model::{
    BertEncoder, BertEncoderConfig, BertEncoderRecord, PairClassifier, PairClassifierConfig, PretrainedShape,
};

const BEST_MODEL: &str = "best_model";
const PYTORCH_WEIGHTS: &str = "pytorch_model.bin";
const BURN_WEIGHTS: &str = "model";

/// Hugging Face BERT parameter names → BertEncoder field paths.
/// Applied in order, each to the result of the previous one.
pub const BERT_KEY_REMAP: &[(&str, &str)] = &[
    (r"^bert\.", ""),
    (r"^(.*)LayerNorm\.gamma$", "${1}LayerNorm.weight"),
    (r"^(.*)LayerNorm\.beta$", "${1}LayerNorm.bias"),
    (r"^embeddings\.LayerNorm\.(.+)$", "embedding_norm.$1"),
    (r"^embeddings\.(.+)$", "$1"),
    (r"^encoder\.layer\.([0-9]+)\.attention\.self\.(query|key|value)\.(.+)$", "layers.$1.self_attn.$2.$3"),
    (r"^encoder\.layer\.([0-9]+)\.attention\.output\.dense\.(.+)$", "layers.$1.self_attn.output.$2"),
    (r"^encoder\.layer\.([0-9]+)\.attention\.output\.LayerNorm\.(.+)$", "layers.$1.attn_norm.$2"),
    (r"^encoder\.layer\.([0-9]+)\.intermediate\.dense\.(.+)$", "layers.$1.intermediate.$2"),
    (r"^encoder\.layer\.([0-9]+)\.output\.dense\.(.+)$", "layers.$1.output.$2"),
    (r"^encoder\.layer\.([0-9]+)\.output\.LayerNorm\.(.+)$", "layers.$1.ffn_norm.$2"),
    (r"^pooler\.dense\.(.+)$", "pooler.$1"),
];

/// Pretrained encoder weights found in a model directory.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EncoderWeights {
    /// `pytorch_model.bin`
    PyTorch(PathBuf),
    /// `model.mpk.gz`, stored without its extension
    Record(PathBuf),
    None,
}

/// Manages the checkpoint files of one output directory.
pub struct CheckpointManager {
    dir: PathBuf,
}

impl CheckpointManager {
    /// Creates the directory if it does not exist yet.
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        let dir = dir.into();
        // best effort, a real failure surfaces on the first write
        fs::create_dir_all(&dir).ok();
        Self { dir }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Overwrite best_model.mpk.gz with `model`.
    pub fn save_best<B: Backend>(&self, model: &PairClassifier<B>) -> Result<()> {
        let path = self.dir.join(BEST_MODEL);
        CompactRecorder::new()
            .record(model.clone().into_record(), path.clone())
            .with_context(|| format!("Failed to save checkpoint to '{}'", path.display()))?;
        tracing::debug!("Saved best model to '{}.mpk.gz'", path.display());
        Ok(())
    }

    /// Load best_model.mpk.gz into a model built from the same config.
    pub fn load_best<B: Backend>(
        &self,
        model:  PairClassifier<B>,
        device: &B::Device,
    ) -> Result<PairClassifier<B>> {
        let path   = self.dir.join(BEST_MODEL);
        let record = CompactRecorder::new()
            .load(path.clone(), device)
            .with_context(|| {
                format!(
                    "Cannot load checkpoint '{}.mpk.gz'. Have you trained this fold first?",
                    path.display()
                )
            })?;
        Ok(model.load_record(record))
    }

    pub fn has_best(&self) -> bool {
        self.dir.join(format!("{BEST_MODEL}.mpk.gz")).exists()
    }

    pub fn save_train_config(&self, cfg: &TrainConfig) -> Result<()> {
        let path = self.dir.join("train_config.json");
        let json = serde_json::to_string_pretty(cfg)?;
        fs::write(&path, json)
            .with_context(|| format!("Cannot write config to '{}'", path.display()))?;
        tracing::debug!("Saved training config to '{}'", path.display());
        Ok(())
    }

    pub fn load_train_config(&self) -> Result<TrainConfig> {
        let path = self.dir.join("train_config.json");
        let json = fs::read_to_string(&path).with_context(|| {
            format!(
                "Cannot read config from '{}'. Make sure you have run 'train' before 'predict'.",
                path.display()
            )
        })?;
        Ok(serde_json::from_str(&json)?)
    }

    pub fn save_model_config(&self, cfg: &PairClassifierConfig) -> Result<()> {
        let path = self.dir.join("model_config.json");
        cfg.save(&path)
            .with_context(|| format!("Cannot write model config to '{}'", path.display()))
    }

    pub fn load_model_config(&self) -> Result<PairClassifierConfig> {
        let path = self.dir.join("model_config.json");
        PairClassifierConfig::load(&path)
            .map_err(|e| anyhow::anyhow!("Cannot read model config '{}': {}", path.display(), e))
    }
}

// ─── Pretrained model directory ───────────────────────────────────────────────
pub struct PretrainedDir {
    dir: PathBuf,
}

impl PretrainedDir {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    /// Encoder shape from config.json, or `None` when the file is absent.
    pub fn shape(&self) -> Result<Option<PretrainedShape>> {
        let path = self.dir.join("config.json");
        if !path.exists() {
            return Ok(None);
        }
        let json = fs::read_to_string(&path)
            .with_context(|| format!("Cannot read '{}'", path.display()))?;
        let shape = serde_json::from_str(&json)
            .with_context(|| format!("'{}' is not a BERT config", path.display()))?;
        Ok(Some(shape))
    }

    /// Which weight file the directory offers, PyTorch first.
    pub fn weights(&self) -> EncoderWeights {
        let torch = self.dir.join(PYTORCH_WEIGHTS);
        if torch.exists() {
            return EncoderWeights::PyTorch(torch);
        }
        if self.dir.join(format!("{BURN_WEIGHTS}.mpk.gz")).exists() {
            return EncoderWeights::Record(self.dir.join(BURN_WEIGHTS));
        }
        EncoderWeights::None
    }

    /// Encoder with pretrained weights when the directory holds any,
    /// freshly initialised (with a warning) otherwise.
    pub fn encoder<B: Backend>(&self, cfg: &BertEncoderConfig, device: &B::Device) -> Result<BertEncoder<B>> {
        let encoder = cfg.init::<B>(device);
        let record: BertEncoderRecord<B> = match self.weights() {
            EncoderWeights::PyTorch(path) => {
                let args = BERT_KEY_REMAP
                    .iter()
                    .fold(LoadArgs::new(path.clone()), |args, (pattern, replacement)| {
                        args.with_key_remap(pattern, replacement)
                    });
                let record = PyTorchFileRecorder::<FullPrecisionSettings>::default()
                    .load(args, device)
                    .with_context(|| format!("Cannot load PyTorch encoder '{}'", path.display()))?;
                tracing::info!("Loaded pretrained encoder from '{}'", path.display());
                record
            }
            EncoderWeights::Record(stem) => {
                let record = CompactRecorder::new()
                    .load(stem.clone(), device)
                    .with_context(|| format!("Cannot load pretrained encoder '{}.mpk.gz'", stem.display()))?;
                tracing::info!("Loaded pretrained encoder from '{}.mpk.gz'", stem.display());
                record
            }
            EncoderWeights::None => {
                tracing::warn!(
                    "No pretrained encoder weights in '{}'; initialising randomly",
                    self.dir.display()
                );
                return Ok(encoder);
            }
        };
        Ok(encoder.load_record(record))
    }
}

// ─── Unit Tests ───────────────────────────────────────────────────────────────
#[cfg(test)]
mod tests {
    use super::*;
    use crate::ml::model::tests::tiny_config;
    use std::fs;

    type TestBackend = burn::backend::NdArray;

    #[test]
    fn test_best_model_round_trip() {
        let dir    = tempfile::tempdir().unwrap();
        let ckpt   = CheckpointManager::new(dir.path().join("out"));
        let device = Default::default();
        let cfg    = tiny_config(false, true);

        assert!(!ckpt.has_best());
        let model = cfg.init::<TestBackend>(&device);
        ckpt.save_best(&model).unwrap();
        assert!(ckpt.has_best());

        let fresh  = cfg.init::<TestBackend>(&device);
        let loaded = ckpt.load_best(fresh, &device).unwrap();
        let a = model.classifier.weight.val().into_data().to_vec::<f32>().unwrap();
        let b = loaded.classifier.weight.val().into_data().to_vec::<f32>().unwrap();
        // CompactRecorder stores half precision
        assert_eq!(a.len(), b.len());
        assert!(a.iter().zip(&b).all(|(x, y)| (x - y).abs() < 1e-2));
    }

    #[test]
    fn test_missing_checkpoint_is_an_error() {
        let dir    = tempfile::tempdir().unwrap();
        let ckpt   = CheckpointManager::new(dir.path());
        let device = Default::default();
        let model  = tiny_config(false, false).init::<TestBackend>(&device);
        assert!(ckpt.load_best(model, &device).is_err());
    }

    #[test]
    fn test_configs_round_trip() {
        let dir  = tempfile::tempdir().unwrap();
        let ckpt = CheckpointManager::new(dir.path());

        let model_cfg = tiny_config(true, false);
        ckpt.save_model_config(&model_cfg).unwrap();
        let back = ckpt.load_model_config().unwrap();
        assert_eq!(back.encoder.hidden_size, 8);
        assert!(back.use_pinyin);
        assert!(!back.use_words);

        let train_cfg = TrainConfig { split_num: 2, ..TrainConfig::default() };
        ckpt.save_train_config(&train_cfg).unwrap();
        assert_eq!(ckpt.load_train_config().unwrap().split_num, 2);
    }

    #[test]
    fn test_pretrained_dir_without_files() {
        let dir = tempfile::tempdir().unwrap();
        let pre = PretrainedDir::new(dir.path());
        assert!(pre.shape().unwrap().is_none());

        let cfg = tiny_config(false, false).encoder;
        let enc = pre.encoder::<TestBackend>(&cfg, &Default::default()).unwrap();
        assert_eq!(enc.layers.len(), 1);
    }

    #[test]
    fn test_pretrained_encoder_is_loaded() {
        let dir    = tempfile::tempdir().unwrap();
        let device = Default::default();
        let cfg    = tiny_config(false, false).encoder;

        let saved = cfg.init::<TestBackend>(&device);
        CompactRecorder::new()
            .record(saved.clone().into_record(), dir.path().join("model"))
            .unwrap();

        let loaded = PretrainedDir::new(dir.path()).encoder::<TestBackend>(&cfg, &device).unwrap();
        let a = saved.pooler.weight.val().into_data().to_vec::<f32>().unwrap();
        let b = loaded.pooler.weight.val().into_data().to_vec::<f32>().unwrap();
        assert!(a.iter().zip(&b).all(|(x, y)| (x - y).abs() < 1e-2));
    }

    #[test]
    fn test_pytorch_weights_take_precedence() {
        let dir = tempfile::tempdir().unwrap();
        let pre = PretrainedDir::new(dir.path());
        assert_eq!(pre.weights(), EncoderWeights::None);

        fs::write(dir.path().join("model.mpk.gz"), b"").unwrap();
        assert_eq!(pre.weights(), EncoderWeights::Record(dir.path().join("model")));

        fs::write(dir.path().join("pytorch_model.bin"), b"").unwrap();
        assert_eq!(pre.weights(), EncoderWeights::PyTorch(dir.path().join("pytorch_model.bin")));
    }

    fn remap(key: &str) -> String {
        BERT_KEY_REMAP.iter().fold(key.to_string(), |name, (pattern, replacement)| {
            let re = regex::Regex::new(pattern).unwrap();
            re.replace_all(&name, *replacement).into_owned()
        })
    }

    #[test]
    fn test_bert_names_map_onto_encoder_fields() {
        let cases = [
            ("bert.embeddings.word_embeddings.weight",       "word_embeddings.weight"),
            ("bert.embeddings.token_type_embeddings.weight", "token_type_embeddings.weight"),
            ("bert.embeddings.LayerNorm.weight",             "embedding_norm.weight"),
            ("bert.embeddings.LayerNorm.gamma",              "embedding_norm.weight"),
            ("bert.encoder.layer.0.attention.self.query.weight", "layers.0.self_attn.query.weight"),
            ("bert.encoder.layer.11.attention.self.value.bias",  "layers.11.self_attn.value.bias"),
            ("bert.encoder.layer.3.attention.output.dense.bias", "layers.3.self_attn.output.bias"),
            ("bert.encoder.layer.3.attention.output.LayerNorm.beta", "layers.3.attn_norm.bias"),
            ("bert.encoder.layer.7.intermediate.dense.weight", "layers.7.intermediate.weight"),
            ("bert.encoder.layer.7.output.dense.weight",       "layers.7.output.weight"),
            ("bert.encoder.layer.7.output.LayerNorm.weight",   "layers.7.ffn_norm.weight"),
            ("bert.pooler.dense.bias",                         "pooler.bias"),
            // checkpoints saved from a bare BertModel carry no prefix
            ("encoder.layer.2.output.dense.bias",              "layers.2.output.bias"),
        ];
        for (hf, field) in cases {
            assert_eq!(remap(hf), field, "{hf}");
        }
    }

    #[test]
    fn test_unreadable_pytorch_weights_are_an_error() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("pytorch_model.bin"), b"not a checkpoint").unwrap();
        let cfg    = tiny_config(false, false).encoder;
        let result = PretrainedDir::new(dir.path()).encoder::<TestBackend>(&cfg, &Default::default());
        assert!(result.is_err());
    }
}
