// ============================================================
// Layer 5 — Scoring
// ============================================================
// Plain-Rust helpers on model outputs: argmax and the macro-averaged
// F1 used to pick the best checkpoint.
//
// Macro-F1 averages the per-class F1 equally over every class in
// 0..num_labels. A class whose precision or recall has a zero
// denominator scores 0.

/// Index of the largest value; the first one wins ties.
pub fn argmax(row: &[f32]) -> usize {
    let mut best = 0;
    for (i, &v) in row.iter().enumerate() {
        if v > row[best] {
            best = i;
        }
    }
    best
}

pub fn macro_f1(predictions: &[usize], labels: &[usize], num_labels: usize) -> f64 {
    if num_labels == 0 {
        return 0.0;
    }
    let mut tp = vec![0usize; num_labels];
    let mut fp = vec![0usize; num_labels];
    let mut fn_ = vec![0usize; num_labels];

    for (&p, &l) in predictions.iter().zip(labels) {
        if p == l {
            if p < num_labels {
                tp[p] += 1;
            }
        } else {
            if p < num_labels {
                fp[p] += 1;
            }
            if l < num_labels {
                fn_[l] += 1;
            }
        }
    }

    let total: f64 = (0..num_labels)
        .map(|c| {
            let precision = ratio(tp[c], tp[c] + fp[c]);
            let recall    = ratio(tp[c], tp[c] + fn_[c]);
            if precision + recall == 0.0 {
                0.0
            } else {
                2.0 * precision * recall / (precision + recall)
            }
        })
        .sum();
    total / num_labels as f64
}

fn ratio(num: usize, den: usize) -> f64 {
    if den == 0 { 0.0 } else { num as f64 / den as f64 }
}
