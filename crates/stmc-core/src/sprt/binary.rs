//! Wald's sequential probability ratio test for one simple alternative.
//!
//! H0: `p = θ` against H1: `p = θ + δ` (or `θ - δ` when `lower_bound`).
//! The log-likelihood ratio of H1 over H0 is compared against
//! `upper = ln((1-β)/α)` and `lower = ln(β/(1-α))`:
//!
//! - ratio ≥ upper: reject H0
//! - ratio ≤ lower: fail to reject H0
//! - otherwise: continue sampling
//!
//! With the default [`AfterCompletion::Freeze`] policy the first terminal
//! status is latched; later observations still accumulate but no longer
//! change the verdict.

use super::accumulator::LogLikelihoodAccumulator;
use super::{
    boundary_progress, budget_progress, expression_suffix, sampler_summary, BinaryStatus,
    SequentialTest, Verdict,
};
use crate::error::{Error, Result};
use crate::params::{
    check_alternatives, check_open_unit, Design, Parameter, ParameterSet, SolvedParameter,
};
use crate::sampler::Sampler;
use std::fmt;
use stmc_config::{AfterCompletion, HypTestName};
use stmc_math::evidence::EvidenceStrength;
use stmc_math::wald_boundaries;
use tracing::{debug, info, trace};

#[derive(Debug, Clone, PartialEq)]
pub struct BinarySprt {
    threshold: f64,
    alpha: f64,
    beta: f64,
    delta: f64,
    lower_bound: bool,
    lower_boundary: f64,
    upper_boundary: f64,
    acc: LogLikelihoodAccumulator,
    after_completion: AfterCompletion,
    latched: Option<BinaryStatus>,
    planned: Option<SolvedParameter>,
    missing: Option<SolvedParameter>,
    expression: Option<String>,
}

impl BinarySprt {
    /// Build a test with every parameter known.
    pub fn new(threshold: f64, alpha: f64, beta: f64, delta: f64, lower_bound: bool) -> Result<Self> {
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
        if delta.is_nan() || delta <= 0.0 {
            return Err(Error::invalid("delta", delta, "must be positive"));
        }
        check_alternatives(Design::Binary { lower_bound }, threshold, delta)?;

        let alternative = if lower_bound {
            threshold - delta
        } else {
            threshold + delta
        };
        let (lower_boundary, upper_boundary) = wald_boundaries(alpha, beta);
        let acc = LogLikelihoodAccumulator::new(threshold, alternative);
        debug!(
            threshold,
            alpha,
            beta,
            delta,
            lower_bound,
            lower_boundary,
            upper_boundary,
            "configured SPRT"
        );

        Ok(Self {
            threshold,
            alpha,
            beta,
            delta,
            lower_bound,
            lower_boundary,
            upper_boundary,
            acc,
            after_completion: AfterCompletion::default(),
            latched: None,
            planned: None,
            missing: None,
            expression: None,
        })
    }

    /// Solve the one missing parameter of `plan`, then build the test.
    pub fn from_plan(plan: ParameterSet, lower_bound: bool) -> Result<Self> {
        let (full, solved) = plan.solve_before_sim(Design::Binary { lower_bound })?;
        let (Some(threshold), Some(alpha), Some(beta), Some(delta)) =
            (full.threshold, full.alpha, full.beta, full.delta)
        else {
            return Err(Error::AmbiguousConfiguration {
                unset: full.unset(Design::Binary { lower_bound }),
            });
        };
        let mut test = Self::new(threshold, alpha, beta, delta, lower_bound)?;
        test.planned = Some(solved);
        test.missing = Some(solved);
        Ok(test)
    }

    pub fn with_after_completion(mut self, policy: AfterCompletion) -> Self {
        self.after_completion = policy;
        self
    }

    pub fn threshold(&self) -> f64 {
        self.threshold
    }

    pub fn alpha(&self) -> f64 {
        self.alpha
    }

    pub fn beta(&self) -> f64 {
        self.beta
    }

    pub fn delta(&self) -> f64 {
        self.delta
    }

    pub fn lower_bound(&self) -> bool {
        self.lower_bound
    }

    /// Success probability under H1.
    pub fn alternative(&self) -> f64 {
        if self.lower_bound {
            self.threshold - self.delta
        } else {
            self.threshold + self.delta
        }
    }

    /// `(lower, upper)` decision boundaries.
    pub fn boundaries(&self) -> (f64, f64) {
        (self.lower_boundary, self.upper_boundary)
    }

    pub fn after_completion(&self) -> AfterCompletion {
        self.after_completion
    }

    pub fn positives(&self) -> u64 {
        self.acc.positives()
    }

    pub fn negatives(&self) -> u64 {
        self.acc.negatives()
    }

    pub fn log_ratio(&self) -> f64 {
        self.acc.log_ratio()
    }

    /// Boundary check for an externally supplied ratio.
    pub fn status_at(&self, log_ratio: f64) -> BinaryStatus {
        if log_ratio >= self.upper_boundary {
            BinaryStatus::Reject
        } else if log_ratio <= self.lower_boundary {
            BinaryStatus::FailToReject
        } else {
            BinaryStatus::Continue
        }
    }

    /// Status under the completion policy.
    pub fn status(&self) -> BinaryStatus {
        match (self.after_completion, self.latched) {
            (AfterCompletion::Freeze, Some(latched)) => latched,
            _ => self.live_status(),
        }
    }

    /// Status of the current ratio, ignoring any latched verdict.
    pub fn live_status(&self) -> BinaryStatus {
        self.status_at(self.log_ratio())
    }

    /// Verdict implied by a status, honoring the orientation.
    pub fn verdict_of(&self, status: BinaryStatus) -> Verdict {
        match (status, self.lower_bound) {
            (BinaryStatus::Continue, _) => Verdict::Undecided,
            (BinaryStatus::Reject, false) | (BinaryStatus::FailToReject, true) => Verdict::Larger,
            (BinaryStatus::Reject, true) | (BinaryStatus::FailToReject, false) => Verdict::Smaller,
        }
    }

    /// Percent travelled towards the rejection boundary and towards the
    /// acceptance boundary.
    pub(crate) fn sided_progress(&self) -> (f64, f64) {
        let ratio = self.log_ratio();
        (
            boundary_progress(ratio.max(0.0), self.lower_boundary, self.upper_boundary),
            boundary_progress(ratio.min(0.0), self.lower_boundary, self.upper_boundary),
        )
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
                verdict = %self.verdict_of(status),
                observations = self.observations(),
                log_ratio = self.log_ratio(),
                "SPRT reached a verdict"
            );
        }
    }
}

impl SequentialTest for BinarySprt {
    fn method(&self) -> HypTestName {
        HypTestName::Sprt
    }

    fn full_name(&self) -> String {
        format!(
            "{}(H0: p = {}, H1: p = {}){}",
            self.name(),
            self.threshold,
            self.alternative(),
            expression_suffix(&self.expression)
        )
    }

    fn set_expression(&mut self, expression: &dyn fmt::Display) {
        self.expression = Some(expression.to_string());
    }

    fn update(&mut self, passed: bool) {
        self.acc.push(passed);
        trace!(passed, observations = self.acc.observations(), "SPRT update");
        self.after_update();
    }

    fn update_counts(&mut self, passed: u64, failed: u64) {
        self.acc.push_counts(passed, failed);
        trace!(
            passed,
            failed,
            observations = self.acc.observations(),
            "SPRT batch update"
        );
        self.after_update();
    }

    fn observations(&self) -> u64 {
        self.acc.observations()
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
        self.verdict_of(self.status())
    }

    fn log_likelihood_ratio(&self) -> f64 {
        self.log_ratio()
    }

    fn progress(&self, iters: u64, _sampler: &dyn Sampler) -> f64 {
        if self.completed() {
            return 100.0;
        }
        let (reject, accept) = self.sided_progress();
        reject.max(accept).max(budget_progress(iters, self.missing))
    }

    fn result_explanation(&self, sampler: &dyn Sampler) -> String {
        let ratio = self.log_ratio();
        let n = self.observations();
        let status = self.status();
        let strength = EvidenceStrength::from_log_ratio(ratio);
        let mut text = match status {
            BinaryStatus::Reject => format!(
                "{}: H0 rejected after {} samples, log-likelihood ratio {:.4} reached the upper boundary {:.4} ({} evidence for H1); p is {} than {}",
                self.full_name(),
                n,
                ratio,
                self.upper_boundary,
                strength,
                self.verdict_of(status),
                self.threshold
            ),
            BinaryStatus::FailToReject => format!(
                "{}: H0 not rejected after {} samples, log-likelihood ratio {:.4} reached the lower boundary {:.4} ({} evidence for H0); p is {} than {}",
                self.full_name(),
                n,
                ratio,
                self.lower_boundary,
                strength,
                self.verdict_of(status),
                self.alternative()
            ),
            BinaryStatus::Continue => format!(
                "{}: undecided after {} samples, log-likelihood ratio {:.4} is between {:.4} and {:.4}",
                self.full_name(),
                n,
                ratio,
                self.lower_boundary,
                self.upper_boundary
            ),
        };
        if status != self.live_status() {
            text.push_str(&format!(
                "; verdict latched at first completion, the current ratio alone would say {}",
                self.live_status()
            ));
        }
        if let Some(solved) = self.missing {
            text.push_str(&format!("; solved {}", solved));
        }
        text.push_str(&sampler_summary(sampler));
        text
    }

    fn parameters_string(&self) -> String {
        let (q_pos, q_neg) = self.acc.steps();
        let mut lines = vec![
            format!("threshold: {}", self.threshold),
            format!("alpha: {}", self.alpha),
            format!("beta: {}", self.beta),
            format!("delta: {}", self.delta),
            format!("lower_bound: {}", self.lower_bound),
            format!("after_completion: {}", self.after_completion),
            format!("lower_boundary: {}", self.lower_boundary),
            format!("upper_boundary: {}", self.upper_boundary),
            format!("step_pass: {}", q_pos),
            format!("step_fail: {}", q_neg),
        ];
        if let Some(solved) = self.missing {
            lines.push(format!("missing: {}", solved));
        }
        lines.join("\n")
    }

    fn missing_parameter(&self) -> Option<SolvedParameter> {
        self.missing
    }

    /// `SampleBound` becomes the samples actually used. A solved `Alpha`
    /// tightens to `(1-β)e^(-Λ)` when H0 was rejected and a solved `Beta`
    /// to `(1-α)e^(Λ)` when it was not; neither is ever loosened.
    fn compute_missing_parameter_after_sim(&mut self) -> Result<()> {
        let Some(mut solved) = self.missing else {
            return Ok(());
        };
        let ratio = self.log_ratio();
        match solved.parameter {
            Parameter::SampleBound => solved.value = self.observations() as f64,
            Parameter::Alpha | Parameter::Beta if !self.completed() => {
                return Err(Error::PrematureQuery {
                    operation: "error-rate refinement",
                });
            }
            Parameter::Alpha if self.rejected() => {
                let achieved = (1.0 - self.beta) * (-ratio).exp();
                solved.value = solved.value.min(achieved);
            }
            Parameter::Beta if self.failed_to_reject() => {
                let achieved = (1.0 - self.alpha) * ratio.exp();
                solved.value = solved.value.min(achieved);
            }
            _ => {}
        }
        debug!(%solved, observations = self.observations(), "refined missing parameter");
        self.missing = Some(solved);
        Ok(())
    }

    fn reset(&mut self) {
        self.acc.reset();
        self.latched = None;
        self.missing = self.planned;
    }
}
