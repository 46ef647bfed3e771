// ============================================================
// Layer 4 — Data Pipeline
// ============================================================
// Everything from CSV pair files to tensor batches.
//
//   train.csv / dev.csv / test.csv
//       │
//       ▼
//   CsvExampleLoader  → rows into Examples
//       │
//       ▼
//   Vocab::build      → pinyin and word vocabularies per fold
//       │
//       ▼
//   FeaturePipeline   → subword choices + pinyin ids + word ids
//       │                (Segmenters, Chunker, truncation rules)
//       ▼
//   PairDataset       → implements Burn's Dataset trait
//       │
//       ▼
//   PairBatcher       → stacks features into tensor batches
//
// KFoldSplitter sits beside the pipeline: it writes the fold
// directories the loader later reads.

/// Reads sentence-pair CSV files
pub mod loader;

/// Cleans text before it is written to fold files
pub mod preprocessor;

/// Pair truncation and fixed-length padding
pub mod truncation;

/// Pinyin and jieba word segmentation
pub mod segmenter;

/// Side-channel vocabularies with reserved ids
pub mod vocab;

/// Splits text_a into subword choices
pub mod chunker;

/// Encoders for all three input channels
pub mod features;

/// Implements Burn's Dataset trait for encoded pairs
pub mod dataset;

/// Implements Burn's Batcher trait to create tensor batches
pub mod batcher;

/// K-fold partitioning and fold file generation
pub mod splitter;
