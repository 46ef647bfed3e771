// ============================================================
// Layer 2 — VocabUseCase
// ============================================================
// Builds the pinyin and word vocabularies of one fold directory
// and dumps them, without training. The files are identical to
// the ones `train` writes next to its checkpoint.

use anyhow::Result;
use std::path::PathBuf;

use crate::application::fold::{FoldData, FoldVocabs, PINYIN_VOCAB_FILE, WORD_VOCAB_FILE};
use crate::data::segmenter::WordSegmenter;

/// Sizes of the dumped vocabularies.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct VocabReport {
    pub pinyin: usize,
    pub words:  usize,
}

pub struct VocabUseCase {
    data_dir:  PathBuf,
    out_dir:   PathBuf,
    user_dict: Option<PathBuf>,
}

impl VocabUseCase {
    pub fn new(data_dir: impl Into<PathBuf>, out_dir: impl Into<PathBuf>, user_dict: Option<PathBuf>) -> Self {
        Self {
            data_dir: data_dir.into(),
            out_dir:  out_dir.into(),
            user_dict,
        }
    }

    pub fn execute(&self) -> Result<VocabReport> {
        let data   = FoldData::load(&self.data_dir)?;
        let words  = WordSegmenter::from_optional_dict(self.user_dict.as_deref())?;
        let vocabs = FoldVocabs::build(&data, &words);

        std::fs::create_dir_all(&self.out_dir)?;
        vocabs.save(&self.out_dir)?;
        tracing::info!(
            "Wrote '{}' and '{}' to '{}'",
            PINYIN_VOCAB_FILE,
            WORD_VOCAB_FILE,
            self.out_dir.display()
        );

        Ok(VocabReport {
            pinyin: vocabs.pinyin.len(),
            words:  vocabs.words.len(),
        })
    }
}

// ─── Unit Tests ───────────────────────────────────────────────────────────────
#[cfg(test)]
mod tests {
    use super::*;
    use crate::application::fold::tests::fold_fixture;

    #[test]
    fn test_vocab_dump() {
        let dir = tempfile::tempdir().unwrap();
        let (data_dir, _) = fold_fixture(dir.path());
        let out = dir.path().join("vocab");

        let report = VocabUseCase::new(&data_dir, &out, None).execute().unwrap();
        assert!(report.pinyin > 3);
        assert!(report.words > 3);

        let back = FoldVocabs::load(&out).unwrap();
        assert_eq!(back.pinyin.len(), report.pinyin);
        assert_eq!(back.words.len(), report.words);
    }

    #[test]
    fn test_user_dict_must_exist() {
        let dir = tempfile::tempdir().unwrap();
        let (data_dir, _) = fold_fixture(dir.path());
        let uc = VocabUseCase::new(&data_dir, dir.path(), Some(dir.path().join("missing.txt")));
        assert!(uc.execute().is_err());
    }
}
