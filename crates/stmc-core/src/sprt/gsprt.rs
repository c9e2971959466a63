//! Generalized SPRT against the maximum likelihood estimate.
//!
//! Instead of a fixed alternative, H0 `p = θ` is compared with the
//! estimate `μ = k/n`. The statistic is `ℓ(μ) - ℓ(θ)` when `μ ≥ θ` and
//! `ℓ(θ) - ℓ(μ)` otherwise, so its sign carries the direction. No
//! decision is made before `min_samples` observations, or while `μ` is 0
//! or 1.

use super::{boundary_progress, expression_suffix, sampler_summary, BinaryStatus, SequentialTest};
use super::Verdict;
use crate::error::{Error, Result};
use crate::params::{check_open_unit, SolvedParameter};
use crate::sampler::Sampler;
use std::fmt;
use stmc_config::{AfterCompletion, HypTestName};
use stmc_math::bernoulli::log_likelihood;
use stmc_math::evidence::EvidenceStrength;
use stmc_math::wald_boundaries;
use tracing::{debug, info, trace};

#[derive(Debug, Clone, PartialEq)]
pub struct Gsprt {
    threshold: f64,
    alpha: f64,
    beta: f64,
    min_samples: u64,
    lower_boundary: f64,
    upper_boundary: f64,
    positives: u64,
    observations: u64,
    after_completion: AfterCompletion,
    latched: Option<BinaryStatus>,
    expression: Option<String>,
}

impl Gsprt {
    pub fn new(threshold: f64, alpha: f64, beta: f64, min_samples: u64) -> Result<Self> {
        check_open_unit("threshold", threshold)?;
        check_open_unit("alpha", alpha)?;
        check_open_unit("beta", beta)?;
        if alpha + beta >= 1.0 {
            return Err(Error::invalid(
                "alpha",
                alpha,
                format!("alpha + beta must be below 1 (beta {})", beta),
            ));
        }
        let (lower_boundary, upper_boundary) = wald_boundaries(alpha, beta);
        debug!(threshold, alpha, beta, min_samples, "configured GSPRT");
        Ok(Self {
            threshold,
            alpha,
            beta,
            min_samples,
            lower_boundary,
            upper_boundary,
            positives: 0,
            observations: 0,
            after_completion: AfterCompletion::default(),
            latched: None,
            expression: None,
        })
    }

    pub fn with_after_completion(mut self, policy: AfterCompletion) -> Self {
        self.after_completion = policy;
        self
    }

    pub fn threshold(&self) -> f64 {
        self.threshold
    }

    pub fn min_samples(&self) -> u64 {
        self.min_samples
    }

    pub fn boundaries(&self) -> (f64, f64) {
        (self.lower_boundary, self.upper_boundary)
    }

    /// Maximum likelihood estimate `k/n`, if anything was observed.
    pub fn estimate(&self) -> Option<f64> {
        (self.observations > 0).then(|| self.positives as f64 / self.observations as f64)
    }

    /// Signed generalized log-likelihood ratio, ignoring `min_samples`.
    fn raw_statistic(&self) -> Option<f64> {
        let mu = self.estimate()?;
        if mu <= 0.0 || mu >= 1.0 {
            return None;
        }
        let at_mu = log_likelihood(self.positives, self.observations, mu);
        let at_theta = log_likelihood(self.positives, self.observations, self.threshold);
        Some(if mu >= self.threshold {
            at_mu - at_theta
        } else {
            at_theta - at_mu
        })
    }

    /// The statistic, once enough samples are in.
    pub fn statistic(&self) -> Option<f64> {
        if self.observations < self.min_samples {
            return None;
        }
        self.raw_statistic()
    }

    pub fn live_status(&self) -> BinaryStatus {
        match self.statistic() {
            Some(s) if s >= self.upper_boundary => BinaryStatus::Reject,
            Some(s) if s <= self.lower_boundary => BinaryStatus::FailToReject,
            _ => BinaryStatus::Continue,
        }
    }

    pub fn status(&self) -> BinaryStatus {
        match (self.after_completion, self.latched) {
            (AfterCompletion::Freeze, Some(latched)) => latched,
            _ => self.live_status(),
        }
    }

    fn after_update(&mut self) {
        if self.latched.is_some() || self.after_completion == AfterCompletion::Reevaluate {
            return;
        }
        let status = self.live_status();
        if status.is_terminal() {
            self.latched = Some(status);
            info!(
                test = %self.full_name(),
                %status,
                observations = self.observations,
                statistic = self.log_likelihood_ratio(),
                "GSPRT reached a verdict"
            );
        }
    }
}

impl SequentialTest for Gsprt {
    fn method(&self) -> HypTestName {
        HypTestName::Gsprt
    }

    fn full_name(&self) -> String {
        format!(
            "{}(H0: p = {}){}",
            self.name(),
            self.threshold,
            expression_suffix(&self.expression)
        )
    }

    fn set_expression(&mut self, expression: &dyn fmt::Display) {
        self.expression = Some(expression.to_string());
    }

    fn update(&mut self, passed: bool) {
        self.observations = self.observations.saturating_add(1);
        if passed {
            self.positives = self.positives.saturating_add(1);
        }
        trace!(passed, observations = self.observations, "GSPRT update");
        self.after_update();
    }

    fn update_counts(&mut self, passed: u64, failed: u64) {
        self.positives = self.positives.saturating_add(passed);
        self.observations = self
            .observations
            .saturating_add(passed)
            .saturating_add(failed);
        trace!(passed, failed, observations = self.observations, "GSPRT batch update");
        self.after_update();
    }

    fn observations(&self) -> u64 {
        self.observations
    }

    fn completed(&self) -> bool {
        self.status().is_terminal()
    }

    fn rejected(&self) -> bool {
        self.status() == BinaryStatus::Reject
    }

    fn failed_to_reject(&self) -> bool {
        self.status() == BinaryStatus::FailToReject
    }

    fn too_close(&self) -> bool {
        false
    }

    fn verdict(&self) -> Verdict {
        match self.status() {
            BinaryStatus::Reject => Verdict::Larger,
            BinaryStatus::FailToReject => Verdict::Smaller,
            BinaryStatus::Continue => Verdict::Undecided,
        }
    }

    fn log_likelihood_ratio(&self) -> f64 {
        self.statistic().unwrap_or(0.0)
    }

    /// Boundary progress scaled down until `iters` reaches `min_samples`.
    fn progress(&self, iters: u64, _sampler: &dyn Sampler) -> f64 {
        if self.completed() {
            return 100.0;
        }
        let gate = if self.min_samples == 0 {
            1.0
        } else {
            (iters as f64 / self.min_samples as f64).min(1.0)
        };
        let travelled = self
            .raw_statistic()
            .map(|s| boundary_progress(s, self.lower_boundary, self.upper_boundary))
            .unwrap_or(0.0);
        (travelled * gate).min(99.0)
    }

    fn result_explanation(&self, sampler: &dyn Sampler) -> String {
        let n = self.observations;
        let estimate = self
            .estimate()
            .map(|mu| format!("{:.4}", mu))
            .unwrap_or_else(|| "n/a".to_string());
        let mut text = match (self.status(), self.statistic()) {
            (BinaryStatus::Continue, None) if n < self.min_samples => format!(
                "{}: undecided, {} of the {} samples required before deciding",
                self.full_name(),
                n,
                self.min_samples
            ),
            (BinaryStatus::Continue, _) => format!(
                "{}: undecided after {} samples, estimate {} gives statistic {:.4} in [{:.4}, {:.4}]",
                self.full_name(),
                n,
                estimate,
                self.log_likelihood_ratio(),
                self.lower_boundary,
                self.upper_boundary
            ),
            (status, _) => {
                let stat = self.log_likelihood_ratio();
                format!(
                    "{}: p is {} than {} after {} samples, estimate {} gives statistic {:.4} beyond {:.4} ({} evidence)",
                    self.full_name(),
                    self.verdict(),
                    self.threshold,
                    n,
                    estimate,
                    stat,
                    if status == BinaryStatus::Reject {
                        self.upper_boundary
                    } else {
                        self.lower_boundary
                    },
                    EvidenceStrength::from_log_ratio(stat)
                )
            }
        };
        text.push_str(&sampler_summary(sampler));
        text
    }

    fn parameters_string(&self) -> String {
        [
            format!("threshold: {}", self.threshold),
            format!("alpha: {}", self.alpha),
            format!("beta: {}", self.beta),
            format!("min_samples: {}", self.min_samples),
            format!("after_completion: {}", self.after_completion),
            format!("lower_boundary: {}", self.lower_boundary),
            format!("upper_boundary: {}", self.upper_boundary),
        ]
        .join("\n")
    }

    fn missing_parameter(&self) -> Option<SolvedParameter> {
        None
    }

    fn compute_missing_parameter_after_sim(&mut self) -> Result<()> {
        Ok(())
    }

    fn reset(&mut self) {
        self.positives = 0;
        self.observations = 0;
        self.latched = None;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sampler::BernoulliCounts;

    #[test]
    fn waits_for_min_samples() {
        let mut t = Gsprt::new(0.5, 0.01, 0.01, 100).unwrap();
        t.update_counts(90, 9);
        assert_eq!(t.statistic(), None);
        assert!(!t.completed());
        let text = t.result_explanation(&BernoulliCounts::new());
        assert!(text.contains("99 of the 100 samples"));
        t.update(true);
        assert!(t.rejected());
        assert_eq!(t.verdict(), Verdict::Larger);
    }

    #[test]
    fn degenerate_estimate_is_undecided() {
        let mut t = Gsprt::new(0.5, 0.01, 0.01, 1).unwrap();
        t.update_counts(500, 0);
        assert_eq!(t.statistic(), None);
        assert!(!t.completed());
    }

    #[test]
    fn statistic_sign_follows_direction() {
        let mut t = Gsprt::new(0.5, 0.01, 0.01, 1).unwrap();
        t.update_counts(20, 80);
        let stat = t.statistic().unwrap();
        let expected = log_likelihood(20, 100, 0.5) - log_likelihood(20, 100, 0.2);
        assert!((stat - expected).abs() < 1e-12);
        assert!(stat < 0.0);
        assert!(t.failed_to_reject());
        assert_eq!(t.verdict(), Verdict::Smaller);
    }

    #[test]
    fn progress_is_gated() {
        let mut t = Gsprt::new(0.5, 0.01, 0.01, 1000).unwrap();
        t.update_counts(60, 40);
        let s = BernoulliCounts::new();
        assert!(t.progress(100, &s) < t.progress(1000, &s));
        assert!(t.progress(1000, &s) < 100.0);
    }

    #[test]
    fn reset_clears_counts() {
        let mut t = Gsprt::new(0.3, 0.05, 0.05, 10).unwrap();
        t.update_counts(40, 10);
        assert!(t.completed());
        t.reset();
        assert_eq!(t.observations(), 0);
        assert_eq!(t.estimate(), None);
        assert!(!t.completed());
    }
}
