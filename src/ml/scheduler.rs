// ============================================================
// Layer 5 — Learning-Rate Schedule
// ============================================================
// Linear warmup from 0 to the base rate, then linear decay to 0:
//
//   factor(t) = t / max(1, W)                    t < W
//             = max(0, (T - t) / max(1, T - W))  t ≥ W
//
//   W = warmup_ratio × T   (fractional, not rounded)
//   T = total optimizer steps
//
// The optimizer reads `lr()` before each update and `step()` is
// called after it, so the very first update runs at rate 0.
// The whole state is serialisable so a run can be resumed.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LinearWarmupScheduler {
    base_lr:      f64,
    warmup_steps: f64,
    total_steps:  usize,
    current_step: usize,
}

impl LinearWarmupScheduler {
    pub fn new(base_lr: f64, warmup_ratio: f64, total_steps: usize) -> Self {
        Self {
            base_lr,
            warmup_steps: warmup_ratio * total_steps as f64,
            total_steps,
            current_step: 0,
        }
    }

    fn factor(&self, step: usize) -> f64 {
        let t = step as f64;
        if t < self.warmup_steps {
            return t / self.warmup_steps.max(1.0);
        }
        let total = self.total_steps as f64;
        ((total - t) / (total - self.warmup_steps).max(1.0)).max(0.0)
    }

    /// Rate for the next optimizer update.
    pub fn lr(&self) -> f64 {
        self.base_lr * self.factor(self.current_step)
    }

    /// Advance one optimizer step and return the new rate.
    pub fn step(&mut self) -> f64 {
        self.current_step += 1;
        self.lr()
    }

    pub fn current_step(&self) -> usize {
        self.current_step
    }

    pub fn total_steps(&self) -> usize {
        self.total_steps
    }
}

// ─── Unit Tests ───────────────────────────────────────────────────────────────
#[cfg(test)]
mod tests {
    use super::*;

    fn close(a: f64, b: f64) -> bool {
        (a - b).abs() < 1e-12
    }

    #[test]
    fn warms_up_then_decays() {
        // T = 100, W = 5
        let mut s = LinearWarmupScheduler::new(2.0, 0.05, 100);
        assert_eq!(s.lr(), 0.0);
        assert!(close(s.step(), 2.0 * 0.2));
        for _ in 1..5 {
            s.step();
        }
        assert_eq!(s.current_step(), 5);
        assert!(close(s.lr(), 2.0));
        for _ in 5..50 {
            s.step();
        }
        assert!(close(s.lr(), 2.0 * 50.0 / 95.0));
    }

    #[test]
    fn never_goes_negative_past_the_horizon() {
        let mut s = LinearWarmupScheduler::new(1e-4, 0.05, 10);
        for _ in 0..15 {
            s.step();
        }
        assert_eq!(s.lr(), 0.0);
    }

    #[test]
    fn fractional_warmup_is_not_rounded() {
        // W = 2.5: step 2 is still warming up, at 2 / 2.5
        let mut s = LinearWarmupScheduler::new(1.0, 0.05, 50);
        s.step();
        s.step();
        assert!(close(s.lr(), 0.8));
        s.step();
        assert!(close(s.lr(), 47.0 / 47.5));
    }

    #[test]
    fn zero_warmup_starts_at_base_rate() {
        let s = LinearWarmupScheduler::new(0.5, 0.0, 10);
        assert!(close(s.lr(), 0.5));
    }

    #[test]
    fn state_survives_a_json_round_trip() {
        let mut s = LinearWarmupScheduler::new(3e-5, 0.05, 40);
        s.step();
        s.step();
        let json = serde_json::to_string(&s).unwrap();
        let restored: LinearWarmupScheduler = serde_json::from_str(&json).unwrap();
        assert_eq!(restored, s);
    }
}
