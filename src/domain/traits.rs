// ============================================================
// Layer 3 — Core Traits (Abstractions)
// ============================================================
// The seams between the domain and the layers that implement it:
//
//   ExampleSource  — CsvExampleLoader reads pairs from disk
//   Segmenter      — PinyinSegmenter / WordSegmenter split text
//                    into side-channel tokens
//   Persistable    — Vocab dumps itself to a text file
//
// Feature encoders and vocabulary builders are written against
// Segmenter, so a new side-channel only needs a new segmenter.

use anyhow::Result;
use std::path::Path;

use crate::domain::example::Example;

// ─── ExampleSource ────────────────────────────────────────────────────────────
/// Any component that can produce sentence pairs.
pub trait ExampleSource {
    /// Load every readable example. Unreadable rows are skipped,
    /// not reported as errors.
    fn load_all(&self) -> Result<Vec<Example>>;
}

// ─── Segmenter ────────────────────────────────────────────────────────────────
/// Splits text into the tokens of one auxiliary channel.
pub trait Segmenter {
    /// Tokens as they enter the vocabulary.
    fn segment(&self, text: &str) -> Vec<String>;

    /// Tokens as they enter an encoded sequence. Channels that must
    /// stay aligned with characters override this.
    fn segment_aligned(&self, text: &str) -> Vec<String> {
        self.segment(text)
    }
}

// ─── Persistable ──────────────────────────────────────────────────────────────
/// Any component whose state can be saved and restored from disk.
pub trait Persistable: Sized {
    /// Save this component's state to the given path
    fn save(&self, path: &Path) -> Result<()>;

    /// Load a component's state from the given path.
    fn load(path: &Path) -> Result<Self>;
}
