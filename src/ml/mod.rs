// ============================================================
// Layer 5 — ML / Model Layer (Burn)
// ============================================================
// Everything that builds, trains or runs the network.
//
// What's in this layer:
//
//   model.rs      — BERT-style encoder plus the pair classifier
//                   • Token / position / segment embeddings
//                   • Post-norm encoder blocks with padding masks
//                   • tanh pooler over [CLS]
//                   • Mean-pooled pinyin and word side embeddings
//                   • Linear head over the concatenated features
//
//   schedule.rs   — Warmup then linear decay of the learning rate
//
//   trainer.rs    — Step-based AdamW loop with accumulation,
//                   clipping, periodic dev evaluation and best-F1
//                   checkpointing
//
//   inferencer.rs — Batched evaluation and test prediction
//
//   scoring.rs    — argmax and macro-F1 over plain vectors
//
// Reference: Burn Book §3 (Building Blocks)
//            Burn Book §5 (Training)
//            Devlin et al. (2019) BERT

/// Encoder and pair classifier architecture
pub mod model;

pub mod schedule;

/// Full training loop with validation and checkpointing
pub mod trainer;

/// Evaluation and prediction with a trained model
pub mod inferencer;

pub mod scoring;
