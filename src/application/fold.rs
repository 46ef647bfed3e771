// ============================================================
// Layer 2 — Fold Inputs
// ============================================================
// The pieces every per-fold use case needs:
//
//   FoldData        — train / dev / test examples of one fold dir
//   FoldVocabs      — pinyin and word vocabularies built from the
//                     union of the three files, in that order
//   build_pipeline  — the three feature encoders for the fold
//
// The vocab files written next to the checkpoint are the ones
// prediction reloads, so train and predict always agree on ids.

use anyhow::Result;
use std::path::Path;

use crate::data::{
    features::{ChannelEncoder, FeaturePipeline, SubwordEncoder},
    loader::{fold_files, CsvExampleLoader},
    segmenter::{PinyinSegmenter, WordSegmenter},
    vocab::Vocab,
};
use crate::domain::{
    example::Example,
    traits::{ExampleSource, Persistable},
};
use crate::infra::tokenizer_store::TokenizerStore;

pub const PINYIN_VOCAB_FILE: &str = "pinyin_vocab.txt";
pub const WORD_VOCAB_FILE:   &str = "word_vocab.txt";

pub struct FoldData {
    pub train: Vec<Example>,
    pub dev:   Vec<Example>,
    pub test:  Vec<Example>,
}

impl FoldData {
    pub fn load(data_dir: &Path) -> Result<Self> {
        let [train, dev, test] = fold_files(data_dir);
        let data = Self {
            train: CsvExampleLoader::new(train).load_all()?,
            dev:   CsvExampleLoader::new(dev).load_all()?,
            test:  CsvExampleLoader::new(test).load_all()?,
        };
        tracing::info!(
            "Fold '{}': {} train, {} dev, {} test",
            data_dir.display(),
            data.train.len(),
            data.dev.len(),
            data.test.len()
        );
        Ok(data)
    }
}

pub struct FoldVocabs {
    pub pinyin: Vocab,
    pub words:  Vocab,
}

impl FoldVocabs {
    pub fn build(data: &FoldData, words: &WordSegmenter) -> Self {
        let sets = [data.train.as_slice(), data.dev.as_slice(), data.test.as_slice()];
        let vocabs = Self {
            pinyin: Vocab::build(&sets, &PinyinSegmenter::new()),
            words:  Vocab::build(&sets, words),
        };
        tracing::info!(
            "Vocabularies: {} pinyin, {} words",
            vocabs.pinyin.len(),
            vocabs.words.len()
        );
        vocabs
    }

    pub fn save(&self, dir: &Path) -> Result<()> {
        self.pinyin.save(&dir.join(PINYIN_VOCAB_FILE))?;
        self.words.save(&dir.join(WORD_VOCAB_FILE))
    }

    pub fn load(dir: &Path) -> Result<Self> {
        Ok(Self {
            pinyin: Vocab::load(&dir.join(PINYIN_VOCAB_FILE))?,
            words:  Vocab::load(&dir.join(WORD_VOCAB_FILE))?,
        })
    }
}

/// Wire the tokenizer from `model_dir` and the fold vocabularies into encoders.
pub fn build_pipeline(
    model_dir:   &Path,
    vocabs:      FoldVocabs,
    words:       WordSegmenter,
    max_seq_len: usize,
    split_num:   usize,
) -> Result<FeaturePipeline> {
    let tokenizer = TokenizerStore::new(model_dir).load()?;
    Ok(FeaturePipeline::new(
        SubwordEncoder::new(tokenizer, max_seq_len, split_num)?,
        ChannelEncoder::new(vocabs.pinyin, PinyinSegmenter::new(), max_seq_len),
        ChannelEncoder::new(vocabs.words, words, max_seq_len),
    ))
}

// ─── Unit Tests ───────────────────────────────────────────────────────────────
#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::data::features::tests::char_tokenizer;
    use std::fs;

    /// A fold directory plus a model directory with a character tokenizer.
    pub(crate) fn fold_fixture(root: &Path) -> (std::path::PathBuf, std::path::PathBuf) {
        let data  = root.join("data_0");
        let model = root.join("model");
        fs::create_dir_all(&data).unwrap();
        fs::create_dir_all(&model).unwrap();

        fs::write(
            data.join("train.csv"),
            "id,sentence1,sentence2,label\n1,花呗怎么还款,花呗如何还钱,1\n2,借呗额度,花呗额度,0\n3,花呗还款,借呗还钱,0\n4,怎么还花呗,花呗如何还款,1\n",
        )
        .unwrap();
        fs::write(
            data.join("dev.csv"),
            "id,sentence1,sentence2,label\n5,花呗额度,花呗额度怎么,1\n6,借呗还款,花呗额度,0\n",
        )
        .unwrap();
        fs::write(
            data.join("test.csv"),
            "id,sentence1,sentence2,label\n0,借呗怎么还,花呗如何还,\n1,额度还款,花呗,\n",
        )
        .unwrap();

        char_tokenizer("花呗怎么还款如何钱借额度")
            .save(model.join("tokenizer.json"), false)
            .unwrap();
        (data, model)
    }

    #[test]
    fn test_load_fold_and_build_vocabs() {
        let dir = tempfile::tempdir().unwrap();
        let (data_dir, _) = fold_fixture(dir.path());
        let data = FoldData::load(&data_dir).unwrap();
        assert_eq!((data.train.len(), data.dev.len(), data.test.len()), (4, 2, 2));
        assert_eq!(data.test[0].label, None);

        let vocabs = FoldVocabs::build(&data, &WordSegmenter::new());
        assert!(vocabs.pinyin.get("hua").is_some());
        assert!(vocabs.words.len() > 3);

        vocabs.save(dir.path()).unwrap();
        let back = FoldVocabs::load(dir.path()).unwrap();
        assert_eq!(back.pinyin, vocabs.pinyin);
        assert_eq!(back.words, vocabs.words);
    }

    #[test]
    fn test_pipeline_from_model_dir() {
        let dir = tempfile::tempdir().unwrap();
        let (data_dir, model_dir) = fold_fixture(dir.path());
        let data   = FoldData::load(&data_dir).unwrap();
        let words  = WordSegmenter::new();
        let vocabs = FoldVocabs::build(&data, &words);

        let pipeline = build_pipeline(&model_dir, vocabs, words, 16, 2).unwrap();
        let features = pipeline.convert(&data.dev).unwrap();
        assert_eq!(features.len(), 2);
        assert_eq!(features[0].choices.len(), 2);
        assert_eq!(features[0].word_ids.len(), 16);
    }
}
