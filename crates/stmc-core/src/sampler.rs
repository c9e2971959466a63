//! The sampler interface consumed by result and progress reporting.
//!
//! A sequential test never estimates the tested proportion itself; the
//! simulation driver's sampler does. The test only reads it to enrich the
//! text it produces.

/// Descriptive statistics a sampler exposes to the tests. Never mutated by
/// the tests.
pub trait Sampler {
    /// Number of samples drawn so far.
    fn samples(&self) -> u64;

    /// Observed proportion of positive samples, if any were drawn.
    fn mean(&self) -> Option<f64>;

    /// Sample variance of the observed outcomes, if available.
    fn variance(&self) -> Option<f64> {
        None
    }
}

/// Minimal sampler that just counts Bernoulli outcomes.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct BernoulliCounts {
    positives: u64,
    total: u64,
}

impl BernoulliCounts {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, passed: bool) {
        self.push_counts(u64::from(passed), u64::from(!passed));
    }

    pub fn push_counts(&mut self, passed: u64, failed: u64) {
        self.positives = self.positives.saturating_add(passed);
        self.total = self.total.saturating_add(passed).saturating_add(failed);
    }

    pub fn positives(&self) -> u64 {
        self.positives
    }
}

impl Sampler for BernoulliCounts {
    fn samples(&self) -> u64 {
        self.total
    }

    fn mean(&self) -> Option<f64> {
        (self.total > 0).then(|| self.positives as f64 / self.total as f64)
    }

    fn variance(&self) -> Option<f64> {
        if self.total < 2 {
            return None;
        }
        let n = self.total as f64;
        let p = self.positives as f64 / n;
        Some(p * (1.0 - p) * n / (n - 1.0))
    }
}
