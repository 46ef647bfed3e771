// ============================================================
// Layer 4 — Side-Channel Segmenters
// ============================================================
// Two ways of cutting a Chinese sentence into tokens, one per
// auxiliary channel.
//
// PinyinSegmenter — one toneless pinyin syllable per Han character:
//   "中国人" → ["zhong", "guo", "ren"]
//   Runs of non-Han characters stay together as one token
//   ("ok中" → ["ok", "zhong"]); whitespace-only runs are dropped.
//
// WordSegmenter — jieba dictionary segmentation:
//   "花呗怎么还款" → ["花呗", "怎么", "还款"]
//   For encoding, each word is repeated once per character so the
//   word channel lines up with the character-level subword channel:
//   → ["花呗", "花呗", "怎么", "怎么", "还款", "还款"]

use anyhow::{Context, Result};
use jieba_rs::Jieba;
use pinyin::ToPinyin;
use std::{fs, io::BufReader, path::Path};

use crate::domain::traits::Segmenter;

// ─── PinyinSegmenter ──────────────────────────────────────────────────────────
#[derive(Debug, Clone, Copy, Default)]
pub struct PinyinSegmenter;

impl PinyinSegmenter {
    pub fn new() -> Self {
        Self
    }
}

impl Segmenter for PinyinSegmenter {
    fn segment(&self, text: &str) -> Vec<String> {
        let mut out   = Vec::new();
        let mut other = String::new();

        for c in text.chars() {
            match c.to_pinyin() {
                Some(py) => {
                    flush_run(&mut other, &mut out);
                    out.push(py.plain().to_string());
                }
                None => other.push(c),
            }
        }
        flush_run(&mut other, &mut out);
        out
    }
}

/// Emit the pending non-Han run as a single token.
fn flush_run(run: &mut String, out: &mut Vec<String>) {
    let token = run.trim();
    if !token.is_empty() {
        out.push(token.to_string());
    }
    run.clear();
}

// ─── WordSegmenter ────────────────────────────────────────────────────────────
pub struct WordSegmenter {
    jieba: Jieba,
}

impl WordSegmenter {
    /// Segmenter over jieba's built-in dictionary.
    pub fn new() -> Self {
        Self { jieba: Jieba::new() }
    }

    /// Segmenter with extra entries from a user dictionary
    /// (jieba format: "word [freq] [tag]" per line).
    pub fn with_user_dict(path: &Path) -> Result<Self> {
        let mut jieba = Jieba::new();
        let file = fs::File::open(path)
            .with_context(|| format!("Cannot open user dictionary '{}'", path.display()))?;
        jieba
            .load_dict(&mut BufReader::new(file))
            .map_err(|e| anyhow::anyhow!("Bad user dictionary '{}': {:?}", path.display(), e))?;
        tracing::info!("Loaded jieba user dictionary from '{}'", path.display());
        Ok(Self { jieba })
    }

    /// Use the user dictionary when one is given, the built-in one otherwise.
    pub fn from_optional_dict(path: Option<&Path>) -> Result<Self> {
        match path {
            Some(p) => Self::with_user_dict(p),
            None    => Ok(Self::new()),
        }
    }
}

impl Default for WordSegmenter {
    fn default() -> Self {
        Self::new()
    }
}

impl Segmenter for WordSegmenter {
    fn segment(&self, text: &str) -> Vec<String> {
        self.jieba
            .cut(text, true)
            .into_iter()
            .map(str::to_string)
            .collect()
    }

    fn segment_aligned(&self, text: &str) -> Vec<String> {
        let mut out = Vec::with_capacity(text.chars().count());
        for word in self.jieba.cut(text, true) {
            for _ in word.chars() {
                out.push(word.to_string());
            }
        }
        out
    }
}
