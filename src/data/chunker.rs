// ============================================================
// Layer 4 — Choice Chunker
// ============================================================
// Splits the text_a token sequence into `split_num` contiguous
// chunks of (nearly) equal size. Each chunk becomes one "choice":
//
//   [CLS] text_b [SEP] chunk_i [SEP]
//
// and the model averages over the choices. With split_num = 1
// there is a single choice holding all of text_a.
//
// Chunk boundaries use a fractional stride so no token is lost
// or duplicated:
//
//   10 tokens, split_num = 3, stride = 3.33
//   chunk 0: [0..3)   chunk 1: [3..6)   chunk 2: [6..10)

pub struct Chunker {
    split_num: usize,
}

impl Chunker {
    /// # Panics
    /// Panics if `split_num` is zero.
    pub fn new(split_num: usize) -> Self {
        assert!(split_num > 0, "split_num must be at least 1");
        Self { split_num }
    }

    pub fn split_num(&self) -> usize {
        self.split_num
    }

    /// Cut `tokens` into exactly `split_num` slices, some possibly empty.
    pub fn chunk<'a, T>(&self, tokens: &'a [T]) -> Vec<&'a [T]> {
        let stride = tokens.len() as f64 / self.split_num as f64;
        (0..self.split_num)
            .map(|i| {
                let start = (i as f64 * stride) as usize;
                let end   = if i + 1 == self.split_num {
                    tokens.len()
                } else {
                    ((i + 1) as f64 * stride) as usize
                };
                &tokens[start.min(tokens.len())..end.min(tokens.len())]
            })
            .collect()
    }
}
