// ============================================================
// Layer 5 — Learning Rate Schedule
// ============================================================
// Linear warmup followed by linear decay to zero:
//
//   lr ▲
//      │    /\
//      │   /   \
//      │  /      \
//      │ /         \
//      └─────┴──────────┴──▶ step
//         warmup       total
//
// The returned value is a multiplier on the base learning rate.

/// Multiplier for `step` (0-based) out of `total` steps.
pub fn warmup_linear(step: usize, warmup: usize, total: usize) -> f64 {
    if step < warmup {
        return step as f64 / warmup.max(1) as f64;
    }
    let remaining = total.saturating_sub(step) as f64;
    let span      = total.saturating_sub(warmup).max(1) as f64;
    (remaining / span).max(0.0)
}

/// Base learning rate scaled by the schedule.
pub struct WarmupLinear {
    base_lr: f64,
    warmup:  usize,
    total:   usize,
}

impl WarmupLinear {
    pub fn new(base_lr: f64, warmup: usize, total: usize) -> Self {
        Self { base_lr, warmup, total }
    }

    pub fn lr(&self, step: usize) -> f64 {
        self.base_lr * warmup_linear(step, self.warmup, self.total)
    }
}

// ─── Unit Tests ───────────────────────────────────────────────────────────────
#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_warmup_ramps_up() {
        assert_eq!(warmup_linear(0, 10, 100), 0.0);
        assert!((warmup_linear(5, 10, 100) - 0.5).abs() < 1e-12);
    }

    #[test]
    fn test_decay_reaches_zero() {
        assert!((warmup_linear(10, 10, 100) - 1.0).abs() < 1e-12);
        assert!((warmup_linear(55, 10, 100) - 0.5).abs() < 1e-12);
        assert_eq!(warmup_linear(100, 10, 100), 0.0);
        assert_eq!(warmup_linear(150, 10, 100), 0.0);
    }

    #[test]
    fn test_no_warmup() {
        assert!((warmup_linear(0, 0, 4) - 1.0).abs() < 1e-12);
        assert!((warmup_linear(2, 0, 4) - 0.5).abs() < 1e-12);
    }

    #[test]
    fn test_schedule_scales_base_lr() {
        let s = WarmupLinear::new(2e-5, 0, 10);
        assert!((s.lr(0) - 2e-5).abs() < 1e-18);
        assert!(s.lr(9) < s.lr(1));
    }
}
