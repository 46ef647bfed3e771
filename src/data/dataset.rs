// ============================================================
// Layer 4 — Pair Dataset
// ============================================================
// Encoded examples held in memory and exposed to Burn's
// DataLoader through the Dataset trait.
//
// A PairFeature is one example after all three encoders ran:
//   choices    — split_num subword views of the pair
//   pinyin_ids — pinyin channel, max_seq_len ids
//   word_ids   — word channel,   max_seq_len ids

use burn::data::dataset::Dataset;
use serde::{Deserialize, Serialize};

/// One `[CLS] b [SEP] chunk [SEP]` view, padded to max_seq_len.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChoiceFeature {
    pub input_ids:   Vec<u32>,
    pub input_mask:  Vec<u32>,
    pub segment_ids: Vec<u32>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PairFeature {
    pub guid:       String,
    pub choices:    Vec<ChoiceFeature>,
    pub pinyin_ids: Vec<u32>,
    pub word_ids:   Vec<u32>,
    /// 0 for unlabelled examples.
    pub label:      usize,
}

impl PairFeature {
    pub fn seq_len(&self) -> usize {
        self.word_ids.len()
    }

    pub fn split_num(&self) -> usize {
        self.choices.len()
    }
}

pub struct PairDataset {
    features: Vec<PairFeature>,
}

impl PairDataset {
    pub fn new(features: Vec<PairFeature>) -> Self {
        Self { features }
    }

    pub fn labels(&self) -> Vec<usize> {
        self.features.iter().map(|f| f.label).collect()
    }
}

impl Dataset<PairFeature> for PairDataset {
    fn get(&self, index: usize) -> Option<PairFeature> {
        self.features.get(index).cloned()
    }

    fn len(&self) -> usize {
        self.features.len()
    }
}

// ─── Unit Tests ───────────────────────────────────────────────────────────────
#[cfg(test)]
mod tests {
    use super::*;

    fn feature(guid: &str, label: usize) -> PairFeature {
        PairFeature {
            guid:       guid.to_string(),
            choices:    vec![ChoiceFeature {
                input_ids:   vec![2, 4, 3],
                input_mask:  vec![1, 1, 1],
                segment_ids: vec![0, 0, 0],
            }],
            pinyin_ids: vec![0, 3, 1],
            word_ids:   vec![0, 3, 1],
            label,
        }
    }

    #[test]
    fn test_dataset_access() {
        let ds = PairDataset::new(vec![feature("a", 1), feature("b", 0)]);
        assert_eq!(ds.len(), 2);
        assert_eq!(ds.get(1).unwrap().guid, "b");
        assert!(ds.get(2).is_none());
        assert_eq!(ds.labels(), vec![1, 0]);
    }

    #[test]
    fn test_feature_dimensions() {
        let f = feature("a", 0);
        assert_eq!(f.seq_len(), 3);
        assert_eq!(f.split_num(), 1);
    }
}
