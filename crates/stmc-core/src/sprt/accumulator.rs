//! Count-based log-likelihood ratio accumulation.
//!
//! Each outcome moves the ratio by a fixed step, so the ratio after any
//! stream is a function of the two outcome counts alone. Storing the
//! counts instead of a running float sum makes updates drift-free and the
//! result identical regardless of update order or batching.

use stmc_math::{log_odds_steps, weighted_log_sum};

/// Log-likelihood ratio of H1 `p = p1` against H0 `p = p0`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LogLikelihoodAccumulator {
    q_pos: f64,
    q_neg: f64,
    positives: u64,
    negatives: u64,
}

impl LogLikelihoodAccumulator {
    pub fn new(p0: f64, p1: f64) -> Self {
        let (q_pos, q_neg) = log_odds_steps(p0, p1);
        Self {
            q_pos,
            q_neg,
            positives: 0,
            negatives: 0,
        }
    }

    #[inline]
    pub fn push(&mut self, passed: bool) {
        if passed {
            self.positives = self.positives.saturating_add(1);
        } else {
            self.negatives = self.negatives.saturating_add(1);
        }
    }

    #[inline]
    pub fn push_counts(&mut self, passed: u64, failed: u64) {
        self.positives = self.positives.saturating_add(passed);
        self.negatives = self.negatives.saturating_add(failed);
    }

    pub fn log_ratio(&self) -> f64 {
        weighted_log_sum(self.positives, self.q_pos, self.negatives, self.q_neg)
    }

    /// `(q_pos, q_neg)`: the ratio increments of a pass and of a fail.
    pub fn steps(&self) -> (f64, f64) {
        (self.q_pos, self.q_neg)
    }

    pub fn positives(&self) -> u64 {
        self.positives
    }

    pub fn negatives(&self) -> u64 {
        self.negatives
    }

    pub fn observations(&self) -> u64 {
        self.positives.saturating_add(self.negatives)
    }

    pub fn reset(&mut self) {
        self.positives = 0;
        self.negatives = 0;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_ratio_is_zero() {
        let acc = LogLikelihoodAccumulator::new(0.5, 0.6);
        assert_eq!(acc.log_ratio(), 0.0);
        assert_eq!(acc.observations(), 0);
    }

    #[test]
    fn single_steps_match_log_odds() {
        let mut acc = LogLikelihoodAccumulator::new(0.5, 0.6);
        acc.push(true);
        assert!((acc.log_ratio() - (0.6f64 / 0.5).ln()).abs() < 1e-15);
        acc.reset();
        acc.push(false);
        assert!((acc.log_ratio() - (0.4f64 / 0.5).ln()).abs() < 1e-15);
    }

    #[test]
    fn order_does_not_matter() {
        let mut a = LogLikelihoodAccumulator::new(0.3, 0.2);
        let mut b = a;
        for passed in [true, false, false, true, false] {
            a.push(passed);
        }
        b.push_counts(2, 3);
        assert_eq!(a, b);
        assert_eq!(a.log_ratio().to_bits(), b.log_ratio().to_bits());
    }

    #[test]
    fn counts_saturate() {
        let mut acc = LogLikelihoodAccumulator::new(0.5, 0.6);
        acc.push_counts(u64::MAX, 0);
        acc.push(true);
        assert_eq!(acc.positives(), u64::MAX);
        assert_eq!(acc.observations(), u64::MAX);
    }
}
