// ============================================================
// Layer 4 — Pair Truncation and Padding
// ============================================================
// The two formatting rules every channel shares.
//
// Truncation: drop one item at a time from the end of whichever
// span is currently longer (text_b on a tie) until the pair fits
// the budget. A short span keeps all of its tokens; the long one
// absorbs the cut.
//
// Padding (side-channels only):
//   [CLS] a.. [SEP] b..            shorter than max_len
//   [CLS] a.. [SEP] b.. [SEP] [unused] [unused] ...
//
//   [CLS] a.. [SEP] b..            already max_len or longer
//   [CLS] a.. [SEP] b(cut) [SEP]   exactly max_len
//
// Either way the output is exactly max_len keys long.

use crate::data::vocab::{SEP_TOKEN, UNUSED_TOKEN};

/// Number of special tokens framing a pair: [CLS] a [SEP] b [SEP].
pub const SPECIAL_TOKENS_PER_PAIR: usize = 3;

/// Shorten `a` and `b` in place until `a.len() + b.len() <= budget`.
pub fn truncate_pair<T>(a: &mut Vec<T>, b: &mut Vec<T>, budget: usize) {
    while a.len() + b.len() > budget {
        if a.len() > b.len() {
            a.pop();
        } else {
            b.pop();
        }
    }
}

/// Close the sequence with [SEP] and pad it with [unused] to `max_len`,
/// or hard-cut it so the trailing [SEP] lands on the last slot.
pub fn pad_keys(mut keys: Vec<String>, max_len: usize) -> Vec<String> {
    if max_len == 0 {
        return Vec::new();
    }
    if keys.len() < max_len {
        keys.push(SEP_TOKEN.to_string());
        keys.resize(max_len, UNUSED_TOKEN.to_string());
    } else {
        keys.truncate(max_len - 1);
        keys.push(SEP_TOKEN.to_string());
    }
    keys
}

/// Budget left for the two spans once the framing tokens are placed.
pub fn pair_budget(max_seq_len: usize) -> usize {
    max_seq_len.saturating_sub(SPECIAL_TOKENS_PER_PAIR)
}
