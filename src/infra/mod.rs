// ============================================================
// Layer 6 — Infrastructure Layer
// ============================================================
// Files that outlive a single process:
//
//   checkpoint.rs      — best-model weights (CompactRecorder),
//                        train/model configs as JSON, and the
//                        pretrained model directory
//
//   tokenizer_store.rs — the pretrained subword tokenizer
//                        (tokenizer.json or BERT vocab.txt)
//
//   metrics.rs         — eval_results.txt and metrics.csv
//
//   submission.rs      — per-fold sub.csv and the ensembled
//                        probability / label files
//
// Reference: Burn Book §5 (Checkpointing)

/// Model checkpoint and config persistence
pub mod checkpoint;

/// Pretrained tokenizer loading
pub mod tokenizer_store;

/// Periodic evaluation logs
pub mod metrics;

/// Prediction files and fold ensembling
pub mod submission;
