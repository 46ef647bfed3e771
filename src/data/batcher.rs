// ============================================================
// Layer 4 — Pair Batcher
// ============================================================
// Implements Burn's Batcher trait to stack PairFeatures into
// device tensors.
//
//   Input:  N PairFeatures, each with C choices of length S
//   Output: input_ids / input_mask / segment_ids  [N, C, S]
//           pinyin_ids / word_ids                [N, S]
//           labels                               [N]
//
// Every feature is already padded to the same S, so batching is a
// flatten followed by a reshape.

use burn::{
    data::dataloader::batcher::Batcher,
    prelude::*,
};

use crate::data::dataset::PairFeature;

/// Model inputs of one batch.
#[derive(Debug, Clone)]
pub struct PairInput<B: Backend> {
    pub input_ids:   Tensor<B, 3, Int>,
    pub input_mask:  Tensor<B, 3, Int>,
    pub segment_ids: Tensor<B, 3, Int>,
    pub pinyin_ids:  Tensor<B, 2, Int>,
    pub word_ids:    Tensor<B, 2, Int>,
}

#[derive(Debug, Clone)]
pub struct PairBatch<B: Backend> {
    pub inputs: PairInput<B>,
    pub labels: Tensor<B, 1, Int>,
}

#[derive(Clone, Debug)]
pub struct PairBatcher<B: Backend> {
    pub device: B::Device,
}

impl<B: Backend> PairBatcher<B> {
    pub fn new(device: B::Device) -> Self {
        Self { device }
    }

    fn ints_2d(&self, flat: Vec<i32>, dims: [usize; 2]) -> Tensor<B, 2, Int> {
        Tensor::<B, 1, Int>::from_ints(flat.as_slice(), &self.device).reshape(dims)
    }

    fn ints_3d(&self, flat: Vec<i32>, dims: [usize; 3]) -> Tensor<B, 3, Int> {
        Tensor::<B, 1, Int>::from_ints(flat.as_slice(), &self.device).reshape(dims)
    }
}

impl<B: Backend> Batcher<PairFeature, PairBatch<B>> for PairBatcher<B> {
    fn batch(&self, items: Vec<PairFeature>) -> PairBatch<B> {
        let batch_size = items.len();
        let split_num  = items[0].split_num();
        let seq_len    = items[0].seq_len();

        // [s1_c1_t1 .. s1_c1_tS, s1_c2_t1 .. sN_cC_tS]
        let cap             = batch_size * split_num * seq_len;
        let mut input_ids   = Vec::with_capacity(cap);
        let mut input_mask  = Vec::with_capacity(cap);
        let mut segment_ids = Vec::with_capacity(cap);
        for choice in items.iter().flat_map(|f| f.choices.iter()) {
            input_ids.extend(choice.input_ids.iter().map(|&x| x as i32));
            input_mask.extend(choice.input_mask.iter().map(|&x| x as i32));
            segment_ids.extend(choice.segment_ids.iter().map(|&x| x as i32));
        }

        let pinyin_ids: Vec<i32> = items
            .iter()
            .flat_map(|f| f.pinyin_ids.iter().map(|&x| x as i32))
            .collect();
        let word_ids: Vec<i32> = items
            .iter()
            .flat_map(|f| f.word_ids.iter().map(|&x| x as i32))
            .collect();
        let labels: Vec<i32> = items.iter().map(|f| f.label as i32).collect();

        let dims3 = [batch_size, split_num, seq_len];
        let dims2 = [batch_size, seq_len];

        PairBatch {
            inputs: PairInput {
                input_ids:   self.ints_3d(input_ids, dims3),
                input_mask:  self.ints_3d(input_mask, dims3),
                segment_ids: self.ints_3d(segment_ids, dims3),
                pinyin_ids:  self.ints_2d(pinyin_ids, dims2),
                word_ids:    self.ints_2d(word_ids, dims2),
            },
            labels: Tensor::<B, 1, Int>::from_ints(labels.as_slice(), &self.device),
        }
    }
}

// ─── Unit Tests ───────────────────────────────────────────────────────────────
#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::dataset::ChoiceFeature;

    type TestBackend = burn::backend::NdArray;

    fn feature(label: usize, base: u32) -> PairFeature {
        let choice = |off: u32| ChoiceFeature {
            input_ids:   vec![base + off, base + off + 1, 0],
            input_mask:  vec![1, 1, 0],
            segment_ids: vec![0, 1, 0],
        };
        PairFeature {
            guid:       base.to_string(),
            choices:    vec![choice(0), choice(10)],
            pinyin_ids: vec![0, 5, 1],
            word_ids:   vec![0, 7, 1],
            label,
        }
    }

    #[test]
    fn test_batch_shapes() {
        let batcher = PairBatcher::<TestBackend>::new(Default::default());
        let batch   = batcher.batch(vec![feature(1, 100), feature(0, 200)]);
        assert_eq!(batch.inputs.input_ids.dims(), [2, 2, 3]);
        assert_eq!(batch.inputs.input_mask.dims(), [2, 2, 3]);
        assert_eq!(batch.inputs.segment_ids.dims(), [2, 2, 3]);
        assert_eq!(batch.inputs.pinyin_ids.dims(), [2, 3]);
        assert_eq!(batch.inputs.word_ids.dims(), [2, 3]);
        assert_eq!(batch.labels.dims(), [2]);
    }

    #[test]
    fn test_batch_values_keep_order() {
        let batcher = PairBatcher::<TestBackend>::new(Default::default());
        let batch   = batcher.batch(vec![feature(1, 100), feature(0, 200)]);

        let ids = batch
            .inputs
            .input_ids
            .into_data()
            .convert::<i64>()
            .to_vec::<i64>()
            .unwrap();
        assert_eq!(ids, vec![100, 101, 0, 110, 111, 0, 200, 201, 0, 210, 211, 0]);

        let labels = batch.labels.into_data().convert::<i64>().to_vec::<i64>().unwrap();
        assert_eq!(labels, vec![1, 0]);
    }
}
