// ============================================================
// Layer 4 — Feature Encoders
// ============================================================
// Turns an Example into the fixed-length integer sequences the
// model consumes. Three channels are encoded independently:
//
//   subword  — the pretrained tokenizer, one sequence per choice
//              [CLS] text_b [SEP] chunk_of_text_a [SEP] 0 0 0 ...
//              with segment ids and an attention mask
//
//   pinyin   — [CLS] pinyin(a) [SEP] pinyin(b) [SEP] [unused] ...
//   word     — [CLS] words(a)  [SEP] words(b)  [SEP] [unused] ...
//
// The side-channels truncate at the character level before
// segmentation; the subword channel truncates tokenizer ids.
// Every produced sequence is exactly max_seq_len long.

use anyhow::{anyhow, Context, Result};
use tokenizers::Tokenizer;

use crate::data::chunker::Chunker;
use crate::data::dataset::{ChoiceFeature, PairFeature};
use crate::data::segmenter::{PinyinSegmenter, WordSegmenter};
use crate::data::truncation::{pad_keys, pair_budget, truncate_pair};
use crate::data::vocab::{Vocab, CLS_TOKEN, SEP_TOKEN};
use crate::domain::example::Example;
use crate::domain::traits::Segmenter;

// ─── ChannelEncoder ───────────────────────────────────────────────────────────
/// Encodes one auxiliary channel against a frozen vocabulary.
pub struct ChannelEncoder<S: Segmenter> {
    vocab:       Vocab,
    segmenter:   S,
    max_seq_len: usize,
}

impl<S: Segmenter> ChannelEncoder<S> {
    pub fn new(vocab: Vocab, segmenter: S, max_seq_len: usize) -> Self {
        Self { vocab, segmenter, max_seq_len }
    }

    /// The padded key sequence before id lookup. Exposed for logging.
    pub fn keys(&self, example: &Example) -> Vec<String> {
        let mut a: Vec<char> = example.text_a.chars().collect();
        let mut b: Vec<char> = example.text_b.chars().collect();
        truncate_pair(&mut a, &mut b, pair_budget(self.max_seq_len));
        let a: String = a.into_iter().collect();
        let b: String = b.into_iter().collect();

        let mut keys = Vec::with_capacity(self.max_seq_len);
        keys.push(CLS_TOKEN.to_string());
        keys.extend(self.segmenter.segment_aligned(&a));
        keys.push(SEP_TOKEN.to_string());
        keys.extend(self.segmenter.segment_aligned(&b));

        pad_keys(keys, self.max_seq_len)
    }

    /// Vocabulary ids of the padded key sequence; unseen tokens map to [unused].
    pub fn encode(&self, example: &Example) -> Vec<u32> {
        self.keys(example)
            .iter()
            .map(|k| self.vocab.id_or_unused(k))
            .collect()
    }
}

// ─── SubwordEncoder ───────────────────────────────────────────────────────────
/// Encodes the primary channel with the pretrained model's tokenizer.
pub struct SubwordEncoder {
    tokenizer:   Tokenizer,
    chunker:     Chunker,
    max_seq_len: usize,
    cls_id:      u32,
    sep_id:      u32,
    pad_id:      u32,
}

impl SubwordEncoder {
    pub fn new(tokenizer: Tokenizer, max_seq_len: usize, split_num: usize) -> Result<Self> {
        let cls_id = tokenizer
            .token_to_id("[CLS]")
            .context("Tokenizer has no [CLS] token")?;
        let sep_id = tokenizer
            .token_to_id("[SEP]")
            .context("Tokenizer has no [SEP] token")?;
        let pad_id = tokenizer.token_to_id("[PAD]").unwrap_or(0);

        Ok(Self {
            tokenizer,
            chunker: Chunker::new(split_num),
            max_seq_len,
            cls_id,
            sep_id,
            pad_id,
        })
    }

    pub fn split_num(&self) -> usize {
        self.chunker.split_num()
    }

    pub fn vocab_size(&self) -> usize {
        self.tokenizer.get_vocab_size(true)
    }

    fn tokenize(&self, text: &str) -> Result<Vec<u32>> {
        let enc = self
            .tokenizer
            .encode(text, false)
            .map_err(|e| anyhow!("Tokenisation error on '{text}': {e}"))?;
        Ok(enc.get_ids().to_vec())
    }

    /// One ChoiceFeature per chunk of text_a.
    pub fn encode(&self, example: &Example) -> Result<Vec<ChoiceFeature>> {
        let a_ids = self.tokenize(&example.text_a)?;
        let b_ids = self.tokenize(&example.text_b)?;

        let mut choices = Vec::with_capacity(self.split_num());
        for chunk in self.chunker.chunk(&a_ids) {
            // each choice cuts its own copy of text_b, so a short chunk keeps
            // more of text_b even after a longer chunk before it
            let mut chunk = chunk.to_vec();
            let mut b     = b_ids.clone();
            truncate_pair(&mut chunk, &mut b, pair_budget(self.max_seq_len));

            // [CLS] b [SEP] chunk [SEP]
            let mut input_ids = Vec::with_capacity(self.max_seq_len);
            input_ids.push(self.cls_id);
            input_ids.extend_from_slice(&b);
            input_ids.push(self.sep_id);
            input_ids.extend_from_slice(&chunk);
            input_ids.push(self.sep_id);
            // only reachable when max_seq_len < 3
            input_ids.truncate(self.max_seq_len);

            let real_len  = input_ids.len();
            let first_len = (b.len() + 2).min(real_len);

            let mut segment_ids = vec![0u32; first_len];
            segment_ids.resize(real_len, 1);
            let mut input_mask = vec![1u32; real_len];

            input_ids.resize(self.max_seq_len, self.pad_id);
            input_mask.resize(self.max_seq_len, 0);
            segment_ids.resize(self.max_seq_len, 0);

            choices.push(ChoiceFeature { input_ids, input_mask, segment_ids });
        }
        Ok(choices)
    }
}

// ─── FeaturePipeline ──────────────────────────────────────────────────────────
/// All three encoders for one fold.
pub struct FeaturePipeline {
    pub subword: SubwordEncoder,
    pub pinyin:  ChannelEncoder<PinyinSegmenter>,
    pub words:   ChannelEncoder<WordSegmenter>,
}

impl FeaturePipeline {
    pub fn new(
        subword: SubwordEncoder,
        pinyin:  ChannelEncoder<PinyinSegmenter>,
        words:   ChannelEncoder<WordSegmenter>,
    ) -> Self {
        Self { subword, pinyin, words }
    }

    pub fn encode(&self, example: &Example) -> Result<PairFeature> {
        Ok(PairFeature {
            guid:       example.guid.clone(),
            choices:    self.subword.encode(example)?,
            pinyin_ids: self.pinyin.encode(example),
            word_ids:   self.words.encode(example),
            label:      example.label.unwrap_or(0),
        })
    }

    /// Encode every example in order. The first one is logged in full
    /// so a bad vocabulary or tokenizer shows up at the start of a run.
    pub fn convert(&self, examples: &[Example]) -> Result<Vec<PairFeature>> {
        let mut features = Vec::with_capacity(examples.len());
        for (i, ex) in examples.iter().enumerate() {
            let feature = self.encode(ex)?;
            if i == 0 {
                log_example(self, ex, &feature);
            }
            features.push(feature);
        }
        tracing::info!("Encoded {} examples", features.len());
        Ok(features)
    }
}

fn log_example(pipeline: &FeaturePipeline, ex: &Example, f: &PairFeature) {
    let join = |ids: &[u32]| ids.iter().map(u32::to_string).collect::<Vec<_>>().join(" ");
    tracing::info!("*** Example ***");
    tracing::info!("guid: {}", ex.guid);
    for (i, c) in f.choices.iter().enumerate() {
        tracing::info!("choice {} input_ids: {}", i, join(&c.input_ids));
        tracing::info!("choice {} input_mask: {}", i, join(&c.input_mask));
        tracing::info!("choice {} segment_ids: {}", i, join(&c.segment_ids));
    }
    tracing::info!("pinyin: {}", pipeline.pinyin.keys(ex).join(" "));
    tracing::info!("words: {}", pipeline.words.keys(ex).join(" "));
    tracing::info!("label: {:?}", ex.label);
}

// ─── Unit Tests ───────────────────────────────────────────────────────────────
#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::data::vocab::{CLS_ID, SEP_ID, UNUSED_ID};
    use std::str::FromStr;

    /// A word-level tokenizer that splits every Han character on its own,
    /// like a Chinese BERT vocabulary does.
    pub(crate) fn char_tokenizer(chars: &str) -> Tokenizer {
        let mut vocab = serde_json::json!({
            "[PAD]": 0, "[UNK]": 1, "[CLS]": 2, "[SEP]": 3,
        });
        for (i, c) in chars.chars().enumerate() {
            vocab[c.to_string()] = serde_json::json!(4 + i);
        }
        let json = serde_json::json!({
            "version": "1.0",
            "truncation": null,
            "padding": null,
            "added_tokens": [
                {"id": 0, "content": "[PAD]", "single_word": false, "lstrip": false, "rstrip": false, "normalized": false, "special": true},
                {"id": 1, "content": "[UNK]", "single_word": false, "lstrip": false, "rstrip": false, "normalized": false, "special": true},
                {"id": 2, "content": "[CLS]", "single_word": false, "lstrip": false, "rstrip": false, "normalized": false, "special": true},
                {"id": 3, "content": "[SEP]", "single_word": false, "lstrip": false, "rstrip": false, "normalized": false, "special": true}
            ],
            "normalizer": {
                "type": "BertNormalizer",
                "clean_text": true,
                "handle_chinese_chars": true,
                "strip_accents": null,
                "lowercase": true
            },
            "pre_tokenizer": { "type": "Whitespace" },
            "post_processor": null,
            "decoder": null,
            "model": { "type": "WordLevel", "vocab": vocab, "unk_token": "[UNK]" }
        });
        Tokenizer::from_str(&json.to_string()).unwrap()
    }

    fn example() -> Example {
        Example::new("9", "花呗怎么还款", "花呗还钱", Some(1))
    }

    fn pinyin_encoder(examples: &[Example], max_seq_len: usize) -> ChannelEncoder<PinyinSegmenter> {
        let vocab = Vocab::build(&[examples], &PinyinSegmenter::new());
        ChannelEncoder::new(vocab, PinyinSegmenter::new(), max_seq_len)
    }

    #[test]
    fn test_pinyin_channel_layout() {
        let ex  = Example::new("1", "中国", "人", None);
        let enc = pinyin_encoder(std::slice::from_ref(&ex), 8);
        assert_eq!(
            enc.keys(&ex),
            vec!["[CLS]", "zhong", "guo", "[SEP]", "ren", "[SEP]", "[unused]", "[unused]"]
        );
        let ids = enc.encode(&ex);
        assert_eq!(ids[0], CLS_ID);
        assert_eq!(ids[3], SEP_ID);
        assert_eq!(ids[5], SEP_ID);
        assert_eq!(&ids[6..], &[UNUSED_ID, UNUSED_ID]);
    }

    #[test]
    fn test_unseen_tokens_map_to_unused() {
        let enc = pinyin_encoder(&[], 6);
        let ids = enc.encode(&Example::new("1", "中", "国", None));
        assert_eq!(ids, vec![CLS_ID, UNUSED_ID, SEP_ID, UNUSED_ID, SEP_ID, UNUSED_ID]);
    }

    #[test]
    fn test_side_channels_are_fixed_length() {
        let examples = vec![
            example(),
            Example::new("2", "", "", None),
            Example::new("3", "非常非常非常长的一句话用来测试截断", "另外一句也不短的话", Some(0)),
        ];
        let words = ChannelEncoder::new(
            Vocab::build(&[examples.as_slice()], &WordSegmenter::new()),
            WordSegmenter::new(),
            10,
        );
        let pinyin = pinyin_encoder(&examples, 10);
        for ex in &examples {
            assert_eq!(words.encode(ex).len(), 10);
            assert_eq!(pinyin.encode(ex).len(), 10);
        }
    }

    #[test]
    fn test_word_channel_is_char_aligned() {
        let ex    = example();
        let words = ChannelEncoder::new(
            Vocab::build(&[std::slice::from_ref(&ex)], &WordSegmenter::new()),
            WordSegmenter::new(),
            32,
        );
        let keys = words.keys(&ex);
        let sep  = keys.iter().position(|k| k == SEP_TOKEN).unwrap();
        assert_eq!(sep - 1, ex.text_a.chars().count());
    }

    #[test]
    fn test_subword_single_choice_layout() {
        let tok = char_tokenizer("花呗怎么还款钱");
        let enc = SubwordEncoder::new(tok, 16, 1).unwrap();
        let choices = enc.encode(&example()).unwrap();
        assert_eq!(choices.len(), 1);

        let c = &choices[0];
        // [CLS] 花 呗 还 钱 [SEP] 花 呗 怎 么 还 款 [SEP] pad pad pad
        assert_eq!(c.input_ids[..6], [2, 4, 5, 8, 10, 3]);
        assert_eq!(c.input_ids[12], 3);
        assert_eq!(c.input_ids[13..], [0, 0, 0]);
        assert_eq!(c.segment_ids[..6], [0; 6]);
        assert_eq!(c.segment_ids[6..13], [1; 7]);
        assert_eq!(c.segment_ids[13..], [0; 3]);
        assert_eq!(c.input_mask.iter().sum::<u32>(), 13);
    }

    #[test]
    fn test_subword_truncates_longer_span() {
        let tok = char_tokenizer("花呗怎么还款钱");
        let enc = SubwordEncoder::new(tok, 8, 1).unwrap();
        let c   = &enc.encode(&example()).unwrap()[0];
        // budget 5: a (6) and b (4) trimmed to a 3, b 2
        assert_eq!(c.input_ids, vec![2, 4, 5, 3, 4, 5, 6, 3]);
        assert_eq!(c.input_mask, vec![1; 8]);
    }

    #[test]
    fn test_subword_choices_split_text_a() {
        let tok = char_tokenizer("花呗怎么还款钱");
        let enc = SubwordEncoder::new(tok, 12, 3).unwrap();
        let choices = enc.encode(&example()).unwrap();
        assert_eq!(choices.len(), 3);
        for c in &choices {
            assert_eq!(c.input_ids.len(), 12);
            assert_eq!(c.input_mask.len(), 12);
            assert_eq!(c.segment_ids.len(), 12);
            // b is kept whole, a contributes 2 chars per choice
            assert_eq!(c.input_mask.iter().sum::<u32>(), 1 + 4 + 1 + 2 + 1);
        }
    }

    #[test]
    fn test_text_b_cut_per_choice() {
        let tok = char_tokenizer("花呗怎么还款钱");
        let enc = SubwordEncoder::new(tok, 10, 4).unwrap();
        let ex  = Example::new("5", "花呗怎么还款钱花呗怎", "花呗还钱还款", Some(0));
        let choices = enc.encode(&ex).unwrap();

        // text_b tokens kept per choice: [CLS] b [SEP] carry segment 0
        let kept: Vec<usize> = choices
            .iter()
            .map(|c| c.segment_ids.iter().zip(&c.input_mask).filter(|(s, m)| **s == 0 && **m == 1).count() - 2)
            .collect();
        // chunks of 2, 3, 2, 3 against a budget of 7
        assert_eq!(kept, vec![5, 4, 5, 4]);

        // cutting one text_b in place would not give the third choice its token back
        let mut b = vec![0u32; 6];
        let carried: Vec<usize> = [2, 3, 2, 3]
            .iter()
            .map(|&a_len| {
                truncate_pair(&mut vec![0u32; a_len], &mut b, pair_budget(10));
                b.len()
            })
            .collect();
        assert_eq!(carried, vec![5, 4, 4, 4]);
    }

    #[test]
    fn test_tokenizer_without_cls_is_rejected() {
        let json = serde_json::json!({
            "version": "1.0", "truncation": null, "padding": null, "added_tokens": [],
            "normalizer": null, "pre_tokenizer": { "type": "Whitespace" },
            "post_processor": null, "decoder": null,
            "model": { "type": "WordLevel", "vocab": { "[UNK]": 0 }, "unk_token": "[UNK]" }
        });
        let tok = Tokenizer::from_str(&json.to_string()).unwrap();
        assert!(SubwordEncoder::new(tok, 8, 1).is_err());
    }

    #[test]
    fn test_pipeline_preserves_order_and_labels() {
        let examples = vec![example(), Example::new("10", "借呗", "花呗", None)];
        let pipeline = FeaturePipeline::new(
            SubwordEncoder::new(char_tokenizer("花呗怎么还款钱借"), 12, 2).unwrap(),
            pinyin_encoder(&examples, 12),
            ChannelEncoder::new(
                Vocab::build(&[examples.as_slice()], &WordSegmenter::new()),
                WordSegmenter::new(),
                12,
            ),
        );
        let features = pipeline.convert(&examples).unwrap();
        assert_eq!(features.len(), 2);
        assert_eq!(features[0].guid, "9");
        assert_eq!(features[0].label, 1);
        assert_eq!(features[1].label, 0);
        assert_eq!(features[1].choices.len(), 2);
    }
}
