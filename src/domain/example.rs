// ============================================================
// Layer 3 — Example Domain Type
// ============================================================
// One sentence pair from a train / dev / test file.
//
//   text_a: "花呗怎么还款"
//   text_b: "花呗如何还钱"
//   label:  Some(1)   ← equivalent questions
//
// Test rows carry no label, so the label is optional.

use serde::{Deserialize, Serialize};

/// A raw sentence pair, immutable once parsed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Example {
    /// Row identifier, copied verbatim into submission files
    pub guid: String,

    /// First sentence of the pair
    pub text_a: String,

    /// Second sentence of the pair
    pub text_b: String,

    /// Gold class, `None` for unlabelled (test) rows
    pub label: Option<usize>,
}

impl Example {
    pub fn new(
        guid:   impl Into<String>,
        text_a: impl Into<String>,
        text_b: impl Into<String>,
        label:  Option<usize>,
    ) -> Self {
        Self {
            guid:   guid.into(),
            text_a: text_a.into(),
            text_b: text_b.into(),
            label,
        }
    }

    /// Both sentences joined by a space, the form the vocabulary
    /// builders scan.
    pub fn joined_text(&self) -> String {
        format!("{} {}", self.text_a, self.text_b)
    }

    pub fn is_labelled(&self) -> bool {
        self.label.is_some()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_joined_text_uses_single_space() {
        let ex = Example::new("7", "今天天气", "明天下雨", Some(0));
        assert_eq!(ex.joined_text(), "今天天气 明天下雨");
    }

    #[test]
    fn test_unlabelled_example() {
        let ex = Example::new("0", "a", "b", None);
        assert!(!ex.is_labelled());
    }
}
