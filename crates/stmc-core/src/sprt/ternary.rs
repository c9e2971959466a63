//! Ternary SPRT: is `p` above `θ`, below it, or too close to call?
//!
//! Two binary sub-tests run on the same stream, both with H0 `p = θ`:
//! the upper one against `θ + δ` with error pair (γ, β), the lower one
//! against `θ - δ` with error pair (γ, α). Their statuses combine as:
//!
//! | upper \ lower | Reject         | FailToReject     | Continue        |
//! |---------------|----------------|------------------|-----------------|
//! | Reject        | inconsistent   | Above, confirmed | Above, pending  |
//! | FailToReject  | Below, confirmed | TooClose       | Continue        |
//! | Continue      | Below, pending | Continue         | Continue        |
//!
//! Both sub-tests rejecting would need the observed proportion above
//! `θ` and below it at once, so that cell is reported as an error instead
//! of a verdict.

use super::binary::BinarySprt;
use super::{budget_progress, expression_suffix, sampler_summary, BinaryStatus, SequentialTest};
use super::{TernaryStatus, Verdict};
use crate::error::{Error, Result};
use crate::params::{check_open_unit, Design, Parameter, ParameterSet, SolvedParameter};
use crate::sampler::Sampler;
use std::fmt;
use stmc_config::{AfterCompletion, HypTestName};
use tracing::{debug, info, trace, warn};

/// Combine the statuses of the upper and lower sub-tests.
pub fn combine(upper: BinaryStatus, lower: BinaryStatus) -> Result<TernaryStatus> {
    use BinaryStatus::{Continue, FailToReject, Reject};

    Ok(match (upper, lower) {
        (Reject, Reject) => {
            return Err(Error::InconsistentVerdict {
                detail: "both the upper and the lower sub-test rejected p = threshold".to_string(),
            })
        }
        (Reject, FailToReject) => TernaryStatus::Above { confirmed: true },
        (Reject, Continue) => TernaryStatus::Above { confirmed: false },
        (FailToReject, Reject) => TernaryStatus::Below { confirmed: true },
        (Continue, Reject) => TernaryStatus::Below { confirmed: false },
        (FailToReject, FailToReject) => TernaryStatus::TooClose,
        (FailToReject, Continue) | (Continue, FailToReject) | (Continue, Continue) => {
            TernaryStatus::Continue
        }
    })
}

#[derive(Debug, Clone, PartialEq)]
pub struct TernarySprt {
    threshold: f64,
    alpha: f64,
    beta: f64,
    gamma: f64,
    delta: f64,
    upper: BinarySprt,
    lower: BinarySprt,
    after_completion: AfterCompletion,
    latched: Option<TernaryStatus>,
    planned: Option<SolvedParameter>,
    missing: Option<SolvedParameter>,
    expression: Option<String>,
}

impl TernarySprt {
    pub fn new(threshold: f64, alpha: f64, beta: f64, gamma: f64, delta: f64) -> Result<Self> {
        check_open_unit("alpha", alpha)?;
        check_open_unit("beta", beta)?;
        check_open_unit("gamma", gamma)?;
        for (partner, value) in [("beta", beta), ("alpha", alpha)] {
            if gamma + value >= 1.0 {
                return Err(Error::invalid(
                    "gamma",
                    gamma,
                    format!("gamma + {} must be below 1 ({} {})", partner, partner, value),
                ));
            }
        }

        // Sub-tests report live statuses; latching happens on the combination.
        let upper = BinarySprt::new(threshold, gamma, beta, delta, false)?
            .with_after_completion(AfterCompletion::Reevaluate);
        let lower = BinarySprt::new(threshold, gamma, alpha, delta, true)?
            .with_after_completion(AfterCompletion::Reevaluate);
        debug!(threshold, alpha, beta, gamma, delta, "configured TSPRT");

        Ok(Self {
            threshold,
            alpha,
            beta,
            gamma,
            delta,
            upper,
            lower,
            after_completion: AfterCompletion::default(),
            latched: None,
            planned: None,
            missing: None,
            expression: None,
        })
    }

    /// Solve the one missing parameter of `plan`, then build the test.
    pub fn from_plan(plan: ParameterSet) -> Result<Self> {
        let (full, solved) = plan.solve_before_sim(Design::Ternary)?;
        let (Some(threshold), Some(alpha), Some(beta), Some(gamma), Some(delta)) =
            (full.threshold, full.alpha, full.beta, full.gamma, full.delta)
        else {
            return Err(Error::AmbiguousConfiguration {
                unset: full.unset(Design::Ternary),
            });
        };
        let mut test = Self::new(threshold, alpha, beta, gamma, delta)?;
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

    pub fn gamma(&self) -> f64 {
        self.gamma
    }

    pub fn delta(&self) -> f64 {
        self.delta
    }

    pub fn after_completion(&self) -> AfterCompletion {
        self.after_completion
    }

    /// Sub-test of H0 `p = θ` against `θ + δ`.
    pub fn upper_test(&self) -> &BinarySprt {
        &self.upper
    }

    /// Sub-test of H0 `p = θ` against `θ - δ`.
    pub fn lower_test(&self) -> &BinarySprt {
        &self.lower
    }

    /// `(upper, lower)` sub-test log-likelihood ratios.
    pub fn log_ratios(&self) -> (f64, f64) {
        (self.upper.log_ratio(), self.lower.log_ratio())
    }

    /// Status under the completion policy.
    pub fn status(&self) -> Result<TernaryStatus> {
        match (self.after_completion, self.latched) {
            (AfterCompletion::Freeze, Some(latched)) => Ok(latched),
            _ => self.live_status(),
        }
    }

    /// Combination of the sub-tests' current statuses.
    pub fn live_status(&self) -> Result<TernaryStatus> {
        combine(self.upper.status(), self.lower.status())
    }

    fn after_update(&mut self) {
        if self.latched.is_some() {
            return;
        }
        match self.live_status() {
            Ok(status) if status.is_terminal() => {
                if self.after_completion == AfterCompletion::Freeze {
                    self.latched = Some(status);
                    info!(
                        test = %self.full_name(),
                        %status,
                        observations = self.observations(),
                        "TSPRT reached a verdict"
                    );
                }
            }
            Ok(_) => {}
            Err(err) => warn!(
                test = %self.full_name(),
                error = %err,
                observations = self.observations(),
                "TSPRT sub-tests disagree"
            ),
        }
    }
}

impl SequentialTest for TernarySprt {
    fn method(&self) -> HypTestName {
        HypTestName::Tsprt
    }

    fn full_name(&self) -> String {
        format!(
            "{}(p vs {} ± {}){}",
            self.name(),
            self.threshold,
            self.delta,
            expression_suffix(&self.expression)
        )
    }

    fn set_expression(&mut self, expression: &dyn fmt::Display) {
        self.expression = Some(expression.to_string());
    }

    fn update(&mut self, passed: bool) {
        self.upper.update(passed);
        self.lower.update(passed);
        trace!(passed, observations = self.observations(), "TSPRT update");
        self.after_update();
    }

    fn update_counts(&mut self, passed: u64, failed: u64) {
        self.upper.update_counts(passed, failed);
        self.lower.update_counts(passed, failed);
        trace!(
            passed,
            failed,
            observations = self.observations(),
            "TSPRT batch update"
        );
        self.after_update();
    }

    fn observations(&self) -> u64 {
        self.upper.observations()
    }

    fn completed(&self) -> bool {
        match self.status() {
            Ok(status) => status.is_terminal(),
            Err(_) => true,
        }
    }

    fn rejected(&self) -> bool {
        matches!(self.status(), Ok(TernaryStatus::Above { .. }))
    }

    fn failed_to_reject(&self) -> bool {
        matches!(self.status(), Ok(TernaryStatus::Below { .. }))
    }

    fn too_close(&self) -> bool {
        matches!(self.status(), Ok(TernaryStatus::TooClose))
    }

    fn verdict(&self) -> Verdict {
        match self.status() {
            Ok(TernaryStatus::Above { .. }) => Verdict::Larger,
            Ok(TernaryStatus::Below { .. }) => Verdict::Smaller,
            Ok(TernaryStatus::TooClose) => Verdict::TooClose,
            Ok(TernaryStatus::Continue) => Verdict::Undecided,
            Err(_) => Verdict::Inconsistent,
        }
    }

    /// Ratio of the sub-test that decided; for "too close" the one nearer
    /// zero, i.e. the weaker acceptance. While undecided, the sub-test
    /// closer to one of its boundaries.
    fn log_likelihood_ratio(&self) -> f64 {
        let (upper, lower) = self.log_ratios();
        match self.status() {
            Ok(TernaryStatus::Above { .. }) => upper,
            Ok(TernaryStatus::Below { .. }) => lower,
            Ok(TernaryStatus::TooClose) => upper.max(lower),
            _ => {
                let (ur, ua) = self.upper.sided_progress();
                let (lr, la) = self.lower.sided_progress();
                if ur.max(ua) >= lr.max(la) {
                    upper
                } else {
                    lower
                }
            }
        }
    }

    fn progress(&self, iters: u64, _sampler: &dyn Sampler) -> f64 {
        if self.completed() {
            return 100.0;
        }
        let (upper_reject, upper_accept) = self.upper.sided_progress();
        let (lower_reject, lower_accept) = self.lower.sided_progress();
        // "Too close" needs both acceptances, either rejection suffices.
        upper_reject
            .max(lower_reject)
            .max(upper_accept.min(lower_accept))
            .max(budget_progress(iters, self.missing))
    }

    fn result_explanation(&self, sampler: &dyn Sampler) -> String {
        let n = self.observations();
        let head = match self.status() {
            Ok(TernaryStatus::Above { confirmed }) => format!(
                "p is above {} after {} samples ({})",
                self.threshold,
                n,
                if confirmed {
                    "confirmed by the lower sub-test"
                } else {
                    "lower sub-test still running"
                }
            ),
            Ok(TernaryStatus::Below { confirmed }) => format!(
                "p is below {} after {} samples ({})",
                self.threshold,
                n,
                if confirmed {
                    "confirmed by the upper sub-test"
                } else {
                    "upper sub-test still running"
                }
            ),
            Ok(TernaryStatus::TooClose) => format!(
                "p is within {} of {} after {} samples",
                self.delta, self.threshold, n
            ),
            Ok(TernaryStatus::Continue) => format!("undecided after {} samples", n),
            Err(err) => format!("no verdict after {} samples: {}", n, err),
        };
        let describe = |name: &str, test: &BinarySprt| {
            let (lower, upper) = test.boundaries();
            format!(
                "{} sub-test ratio {:.4} in [{:.4}, {:.4}] ({})",
                name,
                test.log_ratio(),
                lower,
                upper,
                test.status()
            )
        };
        let mut text = format!(
            "{}: {}; {}, {}",
            self.full_name(),
            head,
            describe("upper", &self.upper),
            describe("lower", &self.lower)
        );
        if self.latched.is_some() && self.status().ok() != self.live_status().ok() {
            text.push_str("; verdict latched at first completion");
        }
        if let Some(solved) = self.missing {
            text.push_str(&format!("; solved {}", solved));
        }
        text.push_str(&sampler_summary(sampler));
        text
    }

    fn parameters_string(&self) -> String {
        let (upper_lo, upper_hi) = self.upper.boundaries();
        let (lower_lo, lower_hi) = self.lower.boundaries();
        let mut lines = vec![
            format!("threshold: {}", self.threshold),
            format!("alpha: {}", self.alpha),
            format!("beta: {}", self.beta),
            format!("gamma: {}", self.gamma),
            format!("delta: {}", self.delta),
            format!("after_completion: {}", self.after_completion),
            format!("upper_test_boundaries: [{}, {}]", upper_lo, upper_hi),
            format!("lower_test_boundaries: [{}, {}]", lower_lo, lower_hi),
        ];
        if let Some(solved) = self.missing {
            lines.push(format!("missing: {}", solved));
        }
        lines.join("\n")
    }

    fn missing_parameter(&self) -> Option<SolvedParameter> {
        self.missing
    }

    /// Only a solved `SampleBound` changes, to the samples actually used.
    /// Solved error rates are kept but still require a completed run.
    fn compute_missing_parameter_after_sim(&mut self) -> Result<()> {
        let Some(mut solved) = self.missing else {
            return Ok(());
        };
        match solved.parameter {
            Parameter::SampleBound => solved.value = self.observations() as f64,
            Parameter::Alpha | Parameter::Beta | Parameter::Gamma if !self.completed() => {
                return Err(Error::PrematureQuery {
                    operation: "error-rate refinement",
                });
            }
            _ => {}
        }
        debug!(%solved, observations = self.observations(), "refined missing parameter");
        self.missing = Some(solved);
        Ok(())
    }

    fn reset(&mut self) {
        self.upper.reset();
        self.lower.reset();
        self.latched = None;
        self.missing = self.planned;
    }
}
