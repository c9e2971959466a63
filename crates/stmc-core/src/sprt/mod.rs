//! Sequential probability ratio tests.
//!
//! All tests consume a stream of pass/fail outcomes and decide, as early
//! as the evidence allows, whether the success probability of the
//! simulated system lies above or below a threshold:
//!
//! - [`BinarySprt`]: Wald's SPRT of `p = θ` against `p = θ ± δ`
//! - [`TernarySprt`]: two binary sub-tests, adding a "too close" verdict
//! - [`Gsprt`]: generalized SPRT against the maximum likelihood estimate
//!
//! They share the [`SequentialTest`] surface so a driver can poll any of
//! them uniformly.

pub mod accumulator;
pub mod binary;
pub mod gsprt;
pub mod ternary;

pub use accumulator::LogLikelihoodAccumulator;
pub use binary::BinarySprt;
pub use gsprt::Gsprt;
pub use ternary::TernarySprt;

use crate::error::Result;
use crate::params::SolvedParameter;
use crate::sampler::Sampler;
use serde::Serialize;
use stmc_config::HypTestName;
use stmc_math::evidence::EvidenceSummary;
use std::fmt;

/// Decision of a single simple-vs-simple test.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum BinaryStatus {
    /// The null hypothesis `p = θ` is rejected in favour of the alternative.
    Reject,
    /// The alternative is rejected.
    FailToReject,
    /// More samples are needed.
    Continue,
}

impl BinaryStatus {
    pub fn is_terminal(&self) -> bool {
        !matches!(self, BinaryStatus::Continue)
    }
}

impl fmt::Display for BinaryStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            BinaryStatus::Reject => write!(f, "reject"),
            BinaryStatus::FailToReject => write!(f, "fail to reject"),
            BinaryStatus::Continue => write!(f, "continue"),
        }
    }
}

/// Decision of the ternary test.
///
/// `confirmed` is set when the opposite sub-test has also stopped,
/// agreeing with the direction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case", tag = "status")]
pub enum TernaryStatus {
    Above { confirmed: bool },
    Below { confirmed: bool },
    TooClose,
    Continue,
}

impl TernaryStatus {
    pub fn is_terminal(&self) -> bool {
        !matches!(self, TernaryStatus::Continue)
    }
}

impl fmt::Display for TernaryStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let pending = |confirmed: bool| if confirmed { "confirmed" } else { "pending" };
        match self {
            TernaryStatus::Above { confirmed } => write!(f, "above ({})", pending(*confirmed)),
            TernaryStatus::Below { confirmed } => write!(f, "below ({})", pending(*confirmed)),
            TernaryStatus::TooClose => write!(f, "too close"),
            TernaryStatus::Continue => write!(f, "continue"),
        }
    }
}

/// Verdict reported to the caller, independent of the test's orientation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Verdict {
    /// The probability is larger than the threshold.
    Larger,
    /// The probability is smaller than the threshold.
    Smaller,
    /// The probability is within delta of the threshold.
    TooClose,
    /// Not enough evidence yet.
    Undecided,
    /// The ternary sub-tests contradict each other.
    Inconsistent,
}

impl fmt::Display for Verdict {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Verdict::Larger => write!(f, "larger"),
            Verdict::Smaller => write!(f, "smaller"),
            Verdict::TooClose => write!(f, "too close"),
            Verdict::Undecided => write!(f, "undecided"),
            Verdict::Inconsistent => write!(f, "inconsistent"),
        }
    }
}

/// Lifecycle of a test value.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum TestState {
    /// Constructed, no observations yet.
    Configured,
    Running,
    Rejected,
    FailedToReject,
    TooClose,
}

impl fmt::Display for TestState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TestState::Configured => write!(f, "configured"),
            TestState::Running => write!(f, "running"),
            TestState::Rejected => write!(f, "rejected"),
            TestState::FailedToReject => write!(f, "failed to reject"),
            TestState::TooClose => write!(f, "too close"),
        }
    }
}

/// Snapshot of a test's outcome, suitable for serialization.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TestResult {
    pub method: HypTestName,
    pub verdict: Verdict,
    pub state: TestState,
    pub observations: u64,
    pub log_likelihood_ratio: f64,
    pub evidence: EvidenceSummary,
    /// Proportion reported by the sampler, if it has one.
    pub observed_proportion: Option<f64>,
    pub missing_parameter: Option<SolvedParameter>,
}

/// Common surface of the sequential tests.
///
/// `update` never fails and costs O(1). Queries never mutate.
pub trait SequentialTest {
    fn method(&self) -> HypTestName;

    /// Short name, e.g. `SPRT`.
    fn name(&self) -> &'static str {
        self.method().as_str()
    }

    /// Name including the tested bound and the expression label.
    fn full_name(&self) -> String;

    /// Attach the property under test as an opaque label.
    fn set_expression(&mut self, expression: &dyn fmt::Display);

    fn update(&mut self, passed: bool);

    /// Same statistic as `passed` calls of `update(true)` and `failed`
    /// calls of `update(false)`, in any order.
    ///
    /// Boundaries are checked once, after the whole batch. Under
    /// [`AfterCompletion::Freeze`](stmc_config::AfterCompletion::Freeze) a
    /// crossing that single updates would have latched part way through is
    /// not seen, so the latched verdict is the one of the summed counts.
    fn update_counts(&mut self, passed: u64, failed: u64);

    fn observations(&self) -> u64;

    fn completed(&self) -> bool;

    fn rejected(&self) -> bool;

    fn failed_to_reject(&self) -> bool;

    fn too_close(&self) -> bool;

    /// Current verdict; `Undecided` until the test completes.
    fn verdict(&self) -> Verdict;

    /// The statistic behind the current verdict.
    fn log_likelihood_ratio(&self) -> f64;

    fn state(&self) -> TestState {
        if self.too_close() {
            TestState::TooClose
        } else if self.rejected() {
            TestState::Rejected
        } else if self.failed_to_reject() {
            TestState::FailedToReject
        } else if self.observations() == 0 {
            TestState::Configured
        } else {
            TestState::Running
        }
    }

    fn should_stop_now(&self, _iters: u64, _sampler: &dyn Sampler) -> bool {
        self.completed()
    }

    /// Completion estimate in `[0, 100]`; exactly 100 once completed.
    fn progress(&self, iters: u64, sampler: &dyn Sampler) -> f64;

    fn result(&self, sampler: &dyn Sampler) -> TestResult {
        let ratio = self.log_likelihood_ratio();
        TestResult {
            method: self.method(),
            verdict: self.verdict(),
            state: self.state(),
            observations: self.observations(),
            log_likelihood_ratio: ratio,
            evidence: EvidenceSummary::from_log_ratio(ratio),
            observed_proportion: sampler.mean(),
            missing_parameter: self.missing_parameter(),
        }
    }

    fn result_explanation(&self, sampler: &dyn Sampler) -> String;

    /// Configured parameters and derived constants, one `name: value` pair
    /// per line.
    fn parameters_string(&self) -> String;

    fn missing_parameter(&self) -> Option<SolvedParameter>;

    /// Refine the solved parameter with what the run actually observed.
    fn compute_missing_parameter_after_sim(&mut self) -> Result<()>;

    /// Discard all observations and the latched verdict; keep parameters.
    fn reset(&mut self);
}

/// `" [expr]"` or nothing.
pub(crate) fn expression_suffix(expression: &Option<String>) -> String {
    match expression {
        Some(e) => format!(" [{}]", e),
        None => String::new(),
    }
}

pub(crate) fn sampler_summary(sampler: &dyn Sampler) -> String {
    match (sampler.mean(), sampler.variance()) {
        (Some(mean), Some(var)) => format!(
            "; sampler reports mean {:.4} (sd {:.4}) over {} samples",
            mean,
            var.sqrt(),
            sampler.samples()
        ),
        (Some(mean), None) => format!(
            "; sampler reports mean {:.4} over {} samples",
            mean,
            sampler.samples()
        ),
        _ => String::new(),
    }
}

/// Share of a planned sample bound already spent, capped below 100 so that
/// only a verdict reports completion.
pub(crate) fn budget_progress(iters: u64, planned: Option<SolvedParameter>) -> f64 {
    match planned {
        Some(SolvedParameter {
            parameter: crate::params::Parameter::SampleBound,
            value,
        }) if value >= 1.0 => (iters as f64 / value * 100.0).min(99.0),
        _ => 0.0,
    }
}

/// How far `ratio` has travelled from zero towards whichever boundary it
/// is heading for, in percent.
pub(crate) fn boundary_progress(ratio: f64, lower: f64, upper: f64) -> f64 {
    let fraction = if ratio >= 0.0 {
        ratio / upper
    } else {
        ratio / lower
    };
    if fraction.is_nan() {
        return 0.0;
    }
    (fraction * 100.0).clamp(0.0, 100.0)
}
