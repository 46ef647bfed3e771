// ============================================================
// Layer 6 — Tokenizer Store
// ============================================================
// Loads the subword tokenizer that belongs to the pretrained
// encoder. Two layouts of the model directory are accepted:
//
//   tokenizer.json — a Hugging Face tokenizer, loaded as is
//   vocab.txt      — a BERT WordPiece vocabulary, one token per
//                    line, id = line number
//
// For vocab.txt the tokenizer JSON is assembled in memory (BERT
// normaliser with Chinese character splitting, BERT pre-tokenizer,
// WordPiece model) and parsed with Tokenizer::from_str, so the
// result behaves exactly like a saved tokenizer.json would.

use anyhow::{bail, Context, Result};
use std::{fs, path::PathBuf, str::FromStr};
use tokenizers::Tokenizer;

pub struct TokenizerStore {
    dir: PathBuf,
}

impl TokenizerStore {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    /// Load tokenizer.json if present, otherwise build from vocab.txt.
    pub fn load(&self) -> Result<Tokenizer> {
        let json_path  = self.dir.join("tokenizer.json");
        let vocab_path = self.dir.join("vocab.txt");

        if json_path.exists() {
            tracing::info!("Loading tokenizer from '{}'", json_path.display());
            return Tokenizer::from_file(&json_path).map_err(|e| {
                anyhow::anyhow!("Cannot load tokenizer from '{}': {}", json_path.display(), e)
            });
        }
        if vocab_path.exists() {
            tracing::info!("Building WordPiece tokenizer from '{}'", vocab_path.display());
            return self.from_vocab_file(&vocab_path);
        }
        bail!(
            "No tokenizer.json or vocab.txt in model directory '{}'",
            self.dir.display()
        )
    }

    fn from_vocab_file(&self, path: &std::path::Path) -> Result<Tokenizer> {
        let text = fs::read_to_string(path)
            .with_context(|| format!("Cannot read vocabulary '{}'", path.display()))?;

        let mut vocab = serde_json::Map::new();
        for (id, line) in text.lines().enumerate() {
            let token = line.trim_end_matches('\r');
            if token.is_empty() {
                continue;
            }
            // first occurrence keeps its id, as BERT's loader does
            vocab
                .entry(token.to_string())
                .or_insert_with(|| serde_json::json!(id));
        }
        if !vocab.contains_key("[UNK]") {
            bail!("Vocabulary '{}' has no [UNK] token", path.display());
        }

        let added: Vec<serde_json::Value> = ["[PAD]", "[UNK]", "[CLS]", "[SEP]", "[MASK]"]
            .iter()
            .filter_map(|t| vocab.get(*t).map(|id| (t, id.clone())))
            .map(|(t, id)| {
                serde_json::json!({
                    "id": id, "content": t, "single_word": false, "lstrip": false,
                    "rstrip": false, "normalized": false, "special": true
                })
            })
            .collect();

        let tokenizer_json = serde_json::json!({
            "version": "1.0",
            "truncation": null,
            "padding": null,
            "added_tokens": added,
            "normalizer": {
                "type": "BertNormalizer",
                "clean_text": true,
                "handle_chinese_chars": true,
                "strip_accents": null,
                "lowercase": true
            },
            "pre_tokenizer": { "type": "BertPreTokenizer" },
            "post_processor": null,
            "decoder": null,
            "model": {
                "type": "WordPiece",
                "unk_token": "[UNK]",
                "continuing_subword_prefix": "##",
                "max_input_chars_per_word": 100,
                "vocab": vocab
            }
        });

        let tokenizer = Tokenizer::from_str(&tokenizer_json.to_string())
            .map_err(|e| anyhow::anyhow!("Cannot build tokenizer from '{}': {}", path.display(), e))?;
        tracing::debug!("WordPiece vocabulary size: {}", tokenizer.get_vocab_size(true));
        Ok(tokenizer)
    }
}
