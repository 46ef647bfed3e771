// ============================================================
// Layer 5 — Pair Classifier Model
// ============================================================
// A BERT-style encoder shared across the subword choices, plus
// optional pinyin and word embedding channels.
//
//   input_ids   [B, C, S] ─┐
//   segment_ids [B, C, S]  ├─ reshape [B*C, S] → BertEncoder → pooled [B*C, H]
//   input_mask  [B, C, S] ─┘                     reshape [B, C, H] → mean over C
//                                                                    │
//   pinyin_ids  [B, S] → Embedding → masked mean [B, E] (optional)   │
//   word_ids    [B, S] → Embedding → masked mean [B, E] (optional)   │
//                                                                    ▼
//                                          concat → dropout → Linear → [B, num_labels]
//
// The side-channel mean skips [unused] positions so padding does
// not dilute short sentences.
//
// Reference: Devlin et al. (2019) BERT
//            Burn Book §3 (Building Blocks)

use burn::{
    nn::{
        attention::{MhaInput, MultiHeadAttention, MultiHeadAttentionConfig},
        loss::CrossEntropyLossConfig,
        Dropout, DropoutConfig,
        Embedding, EmbeddingConfig,
        LayerNorm, LayerNormConfig,
        Linear, LinearConfig,
    },
    prelude::*,
    tensor::activation::{gelu, log_softmax, tanh},
};
use serde::{Deserialize, Serialize};

use crate::data::batcher::PairInput;
use crate::data::vocab::UNUSED_ID;

// ─── Encoder configuration ────────────────────────────────────────────────────
// NOTE: #[derive(Config)] already generates Clone and Serialize/Deserialize.
#[derive(Config, Debug)]
pub struct BertEncoderConfig {
    pub vocab_size: usize,
    #[config(default = 768)]
    pub hidden_size: usize,
    #[config(default = 12)]
    pub num_heads: usize,
    #[config(default = 12)]
    pub num_layers: usize,
    #[config(default = 3072)]
    pub intermediate_size: usize,
    #[config(default = 512)]
    pub max_position_embeddings: usize,
    #[config(default = 2)]
    pub type_vocab_size: usize,
    #[config(default = 0.1)]
    pub dropout: f64,
    #[config(default = 1e-12)]
    pub layer_norm_eps: f64,
}

impl BertEncoderConfig {
    pub fn init<B: Backend>(&self, device: &B::Device) -> BertEncoder<B> {
        let word_embeddings       = EmbeddingConfig::new(self.vocab_size, self.hidden_size).init(device);
        let position_embeddings   = EmbeddingConfig::new(self.max_position_embeddings, self.hidden_size).init(device);
        let token_type_embeddings = EmbeddingConfig::new(self.type_vocab_size, self.hidden_size).init(device);
        let embedding_norm = LayerNormConfig::new(self.hidden_size)
            .with_epsilon(self.layer_norm_eps)
            .init(device);
        let layers: Vec<EncoderBlock<B>> = (0..self.num_layers)
            .map(|_| self.build_encoder_block(device))
            .collect();
        let pooler  = LinearConfig::new(self.hidden_size, self.hidden_size).init(device);
        let dropout = DropoutConfig::new(self.dropout).init();
        BertEncoder {
            word_embeddings, position_embeddings, token_type_embeddings,
            embedding_norm, layers, pooler, dropout,
        }
    }

    fn build_encoder_block<B: Backend>(&self, device: &B::Device) -> EncoderBlock<B> {
        let self_attn = MultiHeadAttentionConfig::new(self.hidden_size, self.num_heads)
            .with_dropout(self.dropout)
            .init(device);
        let intermediate = LinearConfig::new(self.hidden_size, self.intermediate_size).init(device);
        let output       = LinearConfig::new(self.intermediate_size, self.hidden_size).init(device);
        let norm = |d| LayerNormConfig::new(d).with_epsilon(self.layer_norm_eps).init(device);
        EncoderBlock {
            self_attn,
            intermediate,
            output,
            attn_norm: norm(self.hidden_size),
            ffn_norm:  norm(self.hidden_size),
            dropout:   DropoutConfig::new(self.dropout).init(),
        }
    }
}

// ─── Encoder block (post-norm, as in BERT) ───────────────────────────────────
#[derive(Module, Debug)]
pub struct EncoderBlock<B: Backend> {
    pub self_attn:    MultiHeadAttention<B>,
    pub intermediate: Linear<B>,
    pub output:       Linear<B>,
    pub attn_norm:    LayerNorm<B>,
    pub ffn_norm:     LayerNorm<B>,
    pub dropout:      Dropout,
}

impl<B: Backend> EncoderBlock<B> {
    /// `pad_mask` is true at padding positions.
    pub fn forward(&self, x: Tensor<B, 3>, pad_mask: Tensor<B, 2, Bool>) -> Tensor<B, 3> {
        let attn = self
            .self_attn
            .forward(MhaInput::self_attn(x.clone()).mask_pad(pad_mask))
            .context;
        let x = self.attn_norm.forward(x + self.dropout.forward(attn));
        let ffn = self.output.forward(gelu(self.intermediate.forward(x.clone())));
        self.ffn_norm.forward(x + self.dropout.forward(ffn))
    }
}

// ─── Encoder ─────────────────────────────────────────────────────────────────
#[derive(Module, Debug)]
pub struct BertEncoder<B: Backend> {
    pub word_embeddings:       Embedding<B>,
    pub position_embeddings:   Embedding<B>,
    pub token_type_embeddings: Embedding<B>,
    pub embedding_norm:        LayerNorm<B>,
    pub layers:                Vec<EncoderBlock<B>>,
    pub pooler:                Linear<B>,
    pub dropout:               Dropout,
}

impl<B: Backend> BertEncoder<B> {
    /// All inputs are [N, S]; returns the tanh-pooled [CLS] vector [N, H].
    pub fn forward(
        &self,
        input_ids:   Tensor<B, 2, Int>,
        segment_ids: Tensor<B, 2, Int>,
        input_mask:  Tensor<B, 2, Int>,
    ) -> Tensor<B, 2> {
        let [n, seq_len] = input_ids.dims();
        let device       = input_ids.device();

        let positions = Tensor::<B, 1, Int>::arange(0..seq_len as i64, &device)
            .unsqueeze::<2>()
            .expand([n, seq_len]);

        let emb = self.word_embeddings.forward(input_ids)
            + self.position_embeddings.forward(positions)
            + self.token_type_embeddings.forward(segment_ids);
        let mut x = self.dropout.forward(self.embedding_norm.forward(emb));

        let pad_mask = input_mask.equal_elem(0);
        for layer in &self.layers {
            x = layer.forward(x, pad_mask.clone());
        }

        let [_, _, hidden] = x.dims();
        let cls = x.slice([0..n, 0..1, 0..hidden]).reshape([n, hidden]);
        tanh(self.pooler.forward(cls))
    }
}

// ─── Classifier configuration ─────────────────────────────────────────────────
#[derive(Config, Debug)]
pub struct PairClassifierConfig {
    pub encoder: BertEncoderConfig,
    /// Size of the fold's pinyin vocabulary.
    pub pinyin_vocab_size: usize,
    /// Size of the fold's word vocabulary.
    pub word_vocab_size: usize,
    #[config(default = 2)]
    pub num_labels: usize,
    #[config(default = 200)]
    pub aux_embedding_size: usize,
    #[config(default = false)]
    pub use_pinyin: bool,
    #[config(default = true)]
    pub use_words: bool,
    #[config(default = 0.1)]
    pub dropout: f64,
}

impl PairClassifierConfig {
    pub fn init<B: Backend>(&self, device: &B::Device) -> PairClassifier<B> {
        self.init_with_encoder(self.encoder.init(device), device)
    }

    /// Build the heads around an encoder that was created (or loaded) elsewhere.
    pub fn init_with_encoder<B: Backend>(&self, encoder: BertEncoder<B>, device: &B::Device) -> PairClassifier<B> {
        let pinyin_embedding = self
            .use_pinyin
            .then(|| EmbeddingConfig::new(self.pinyin_vocab_size, self.aux_embedding_size).init(device));
        let word_embedding = self
            .use_words
            .then(|| EmbeddingConfig::new(self.word_vocab_size, self.aux_embedding_size).init(device));

        let classifier = LinearConfig::new(self.classifier_input_size(), self.num_labels).init(device);
        PairClassifier {
            encoder,
            pinyin_embedding,
            word_embedding,
            dropout: DropoutConfig::new(self.dropout).init(),
            classifier,
        }
    }

    /// Width of the concatenated feature vector fed to the classifier.
    pub fn classifier_input_size(&self) -> usize {
        let channels = usize::from(self.use_pinyin) + usize::from(self.use_words);
        self.encoder.hidden_size + channels * self.aux_embedding_size
    }
}

// ─── Classifier ──────────────────────────────────────────────────────────────
#[derive(Module, Debug)]
pub struct PairClassifier<B: Backend> {
    pub encoder:          BertEncoder<B>,
    pub pinyin_embedding: Option<Embedding<B>>,
    pub word_embedding:   Option<Embedding<B>>,
    pub dropout:          Dropout,
    pub classifier:       Linear<B>,
}

/// Loss and logits of one forward pass.
pub struct PairOutput<B: Backend> {
    pub loss:   Tensor<B, 1>,
    pub logits: Tensor<B, 2>,
}

impl<B: Backend> PairClassifier<B> {
    /// Returns logits [B, num_labels].
    pub fn forward(&self, input: PairInput<B>) -> Tensor<B, 2> {
        let [batch, split, seq] = input.input_ids.dims();

        let pooled = self.encoder.forward(
            input.input_ids.reshape([batch * split, seq]),
            input.segment_ids.reshape([batch * split, seq]),
            input.input_mask.reshape([batch * split, seq]),
        );
        let [_, hidden] = pooled.dims();
        let pooled = pooled
            .reshape([batch, split, hidden])
            .mean_dim(1)
            .reshape([batch, hidden]);

        let mut features = vec![pooled];
        if let Some(emb) = &self.pinyin_embedding {
            features.push(masked_mean(emb.forward(input.pinyin_ids.clone()), input.pinyin_ids));
        }
        if let Some(emb) = &self.word_embedding {
            features.push(masked_mean(emb.forward(input.word_ids.clone()), input.word_ids));
        }

        let x = self.dropout.forward(Tensor::cat(features, 1));
        self.classifier.forward(x)
    }

    /// Cross-entropy over `labels`; `smoothing` of `None` or 0 is plain CE.
    pub fn forward_loss(
        &self,
        input:     PairInput<B>,
        labels:    Tensor<B, 1, Int>,
        smoothing: Option<f32>,
    ) -> PairOutput<B> {
        let logits = self.forward(input);
        let loss   = classification_loss(logits.clone(), labels, smoothing);
        PairOutput { loss, logits }
    }
}

/// Cross-entropy against a smoothed target: the gold class gets `1 - s`
/// and the other `K - 1` classes share `s` equally. With `s` of `None`
/// or 0 this is plain cross-entropy.
pub fn classification_loss<B: Backend>(
    logits:    Tensor<B, 2>,
    labels:    Tensor<B, 1, Int>,
    smoothing: Option<f32>,
) -> Tensor<B, 1> {
    let [batch, num_labels] = logits.dims();
    let smoothing = smoothing.filter(|s| *s > 0.0 && num_labels > 1);
    let Some(s) = smoothing else {
        return CrossEntropyLossConfig::new()
            .init(&logits.device())
            .forward(logits, labels);
    };

    let device = logits.device();
    let off    = s / (num_labels - 1) as f32;
    let gold   = Tensor::<B, 2>::zeros([batch, num_labels], &device).scatter(
        1,
        labels.reshape([batch, 1]),
        Tensor::ones([batch, 1], &device),
    );
    let target = gold.clone() * (1.0 - s) + (gold.neg() + 1.0) * off;

    (target * log_softmax(logits, 1))
        .sum_dim(1)
        .neg()
        .mean()
}

/// Mean of `emb` [B, S, E] over positions whose id is not [unused].
/// Rows with no such position come out as zeros.
pub fn masked_mean<B: Backend>(emb: Tensor<B, 3>, ids: Tensor<B, 2, Int>) -> Tensor<B, 2> {
    let [batch, _, dim] = emb.dims();
    let keep = ids.equal_elem(UNUSED_ID as i32).bool_not().float(); // [B, S]
    let summed = (emb * keep.clone().unsqueeze_dim::<3>(2))
        .sum_dim(1)
        .reshape([batch, dim]);
    let count = keep.sum_dim(1).clamp_min(1.0); // [B, 1]
    summed / count
}

// ─── Pretrained encoder shape ─────────────────────────────────────────────────
/// The subset of a Hugging Face BERT `config.json` needed to size the encoder.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PretrainedShape {
    pub vocab_size:              usize,
    pub hidden_size:             usize,
    pub num_attention_heads:     usize,
    pub num_hidden_layers:       usize,
    pub intermediate_size:       usize,
    #[serde(default = "default_max_positions")]
    pub max_position_embeddings: usize,
    #[serde(default = "default_type_vocab")]
    pub type_vocab_size:         usize,
    #[serde(default = "default_dropout")]
    pub hidden_dropout_prob:     f64,
    #[serde(default = "default_eps")]
    pub layer_norm_eps:          f64,
}

fn default_max_positions() -> usize { 512 }
fn default_type_vocab() -> usize { 2 }
fn default_dropout() -> f64 { 0.1 }
fn default_eps() -> f64 { 1e-12 }

impl From<&PretrainedShape> for BertEncoderConfig {
    fn from(s: &PretrainedShape) -> Self {
        BertEncoderConfig::new(s.vocab_size)
            .with_hidden_size(s.hidden_size)
            .with_num_heads(s.num_attention_heads)
            .with_num_layers(s.num_hidden_layers)
            .with_intermediate_size(s.intermediate_size)
            .with_max_position_embeddings(s.max_position_embeddings)
            .with_type_vocab_size(s.type_vocab_size)
            .with_dropout(s.hidden_dropout_prob)
            .with_layer_norm_eps(s.layer_norm_eps)
    }
}
