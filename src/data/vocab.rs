// ============================================================
// Layer 4 — Side-Channel Vocabulary
// ============================================================
// Dense token → id mapping for the pinyin and word channels.
//
// Three ids are reserved and always present:
//   [CLS]    = 0   sequence start
//   [SEP]    = 1   span separator / sequence end
//   [unused] = 2   padding, and the fallback for unknown tokens
//
// Every other token gets the next free id in first-seen order, so
// building from the same files in the same order always yields the
// same ids. A vocabulary is built once per fold from the union of
// train, dev and test text and then frozen.
//
// Dump format: one "token id" line per entry, in id order.

use anyhow::{bail, Context, Result};
use std::{
    collections::HashMap,
    fs,
    io::{BufRead, BufReader, BufWriter, Write},
    path::Path,
};

use crate::domain::example::Example;
use crate::domain::traits::{Persistable, Segmenter};

pub const CLS_TOKEN:    &str = "[CLS]";
pub const SEP_TOKEN:    &str = "[SEP]";
pub const UNUSED_TOKEN: &str = "[unused]";

pub const CLS_ID:    u32 = 0;
pub const SEP_ID:    u32 = 1;
pub const UNUSED_ID: u32 = 2;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Vocab {
    token_to_id: HashMap<String, u32>,
    id_to_token: Vec<String>,
}

impl Vocab {
    /// A vocabulary holding only the reserved symbols.
    pub fn new() -> Self {
        let mut vocab = Self {
            token_to_id: HashMap::new(),
            id_to_token: Vec::new(),
        };
        for t in [CLS_TOKEN, SEP_TOKEN, UNUSED_TOKEN] {
            vocab.insert(t);
        }
        vocab
    }

    /// Add `token` if unseen and return its id either way.
    pub fn insert(&mut self, token: &str) -> u32 {
        if let Some(&id) = self.token_to_id.get(token) {
            return id;
        }
        let id = self.id_to_token.len() as u32;
        self.token_to_id.insert(token.to_string(), id);
        self.id_to_token.push(token.to_string());
        id
    }

    pub fn get(&self, token: &str) -> Option<u32> {
        self.token_to_id.get(token).copied()
    }

    /// Id of `token`, or the [unused] id for tokens never seen.
    pub fn id_or_unused(&self, token: &str) -> u32 {
        self.get(token).unwrap_or(UNUSED_ID)
    }

    pub fn token(&self, id: u32) -> Option<&str> {
        self.id_to_token.get(id as usize).map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.id_to_token.len()
    }

    pub fn is_empty(&self) -> bool {
        self.id_to_token.is_empty()
    }

    /// Scan `text_a + " " + text_b` of every example with `segmenter`.
    pub fn extend_from_examples<S: Segmenter + ?Sized>(&mut self, examples: &[Example], segmenter: &S) {
        for ex in examples {
            for token in segmenter.segment(&ex.joined_text()) {
                self.insert(&token);
            }
        }
    }

    /// Build a frozen vocabulary from several example sets, scanned in order.
    pub fn build<S: Segmenter + ?Sized>(sets: &[&[Example]], segmenter: &S) -> Self {
        let mut vocab = Self::new();
        for set in sets {
            vocab.extend_from_examples(set, segmenter);
        }
        vocab
    }
}

impl Default for Vocab {
    fn default() -> Self {
        Self::new()
    }
}

impl Persistable for Vocab {
    fn save(&self, path: &Path) -> Result<()> {
        let file = fs::File::create(path)
            .with_context(|| format!("Cannot create vocabulary file '{}'", path.display()))?;
        let mut w = BufWriter::new(file);
        for (id, token) in self.id_to_token.iter().enumerate() {
            writeln!(w, "{token} {id}")?;
        }
        w.flush()?;
        tracing::debug!("Wrote {} vocabulary entries to '{}'", self.len(), path.display());
        Ok(())
    }

    fn load(path: &Path) -> Result<Self> {
        let file = fs::File::open(path)
            .with_context(|| format!("Cannot open vocabulary file '{}'", path.display()))?;

        let mut vocab = Self {
            token_to_id: HashMap::new(),
            id_to_token: Vec::new(),
        };
        for (n, line) in BufReader::new(file).lines().enumerate() {
            let line = line?;
            if line.is_empty() {
                continue;
            }
            // tokens may themselves contain spaces, the id is the last field
            let (token, id) = line
                .rsplit_once(' ')
                .with_context(|| format!("Line {} of '{}' has no id", n + 1, path.display()))?;
            let id: u32 = id
                .parse()
                .with_context(|| format!("Line {} of '{}' has a bad id '{id}'", n + 1, path.display()))?;
            if id as usize != vocab.id_to_token.len() {
                bail!(
                    "Vocabulary '{}' is not dense: expected id {} on line {}, found {}",
                    path.display(),
                    vocab.id_to_token.len(),
                    n + 1,
                    id
                );
            }
            vocab.token_to_id.insert(token.to_string(), id);
            vocab.id_to_token.push(token.to_string());
        }

        for (t, expected) in [(CLS_TOKEN, CLS_ID), (SEP_TOKEN, SEP_ID), (UNUSED_TOKEN, UNUSED_ID)] {
            if vocab.get(t) != Some(expected) {
                bail!("Vocabulary '{}' does not reserve {} = {}", path.display(), t, expected);
            }
        }
        Ok(vocab)
    }
}
