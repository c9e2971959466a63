//! Test parameters and missing-parameter solving.
//!
//! A test is planned from six quantities: the threshold, the error rates
//! (alpha, beta and, for the ternary test, gamma), the indifference
//! half-width delta and the sample bound. Given all but one, the remaining
//! one is solved from Wald's average sample number (ASN) before the
//! simulation starts, and may be refined after it stops.

use crate::error::{Error, Result};
use serde::Serialize;
use stmc_config::TestConfig;
use stmc_math::bernoulli::wald_asn;
use stmc_math::bisect;
use tracing::debug;

/// Smallest error rate or width the solver will report.
pub const MIN_SOLVED_VALUE: f64 = 1e-12;

/// Margin kept from open interval ends while bisecting.
const EDGE: f64 = 1e-9;

const SOLVER_TOL: f64 = 1e-12;
const SOLVER_MAX_ITER: usize = 200;

/// A slot of a [`ParameterSet`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Parameter {
    Threshold,
    Alpha,
    Beta,
    Gamma,
    Delta,
    SampleBound,
}

impl Parameter {
    pub fn as_str(&self) -> &'static str {
        match self {
            Parameter::Threshold => "threshold",
            Parameter::Alpha => "alpha",
            Parameter::Beta => "beta",
            Parameter::Gamma => "gamma",
            Parameter::Delta => "delta",
            Parameter::SampleBound => "sample_bound",
        }
    }
}

impl std::fmt::Display for Parameter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Shape of the test whose parameters are being solved.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Design {
    /// H0 `p = θ` against H1 `p = θ + δ`, or `θ - δ` when `lower_bound`.
    Binary { lower_bound: bool },
    /// Two binary sub-tests around `θ`: (γ, β) above and (γ, α) below.
    Ternary,
}

impl Design {
    fn relevant(&self) -> &'static [Parameter] {
        match self {
            Design::Binary { .. } => &[
                Parameter::Threshold,
                Parameter::Alpha,
                Parameter::Beta,
                Parameter::Delta,
                Parameter::SampleBound,
            ],
            Design::Ternary => &[
                Parameter::Threshold,
                Parameter::Alpha,
                Parameter::Beta,
                Parameter::Gamma,
                Parameter::Delta,
                Parameter::SampleBound,
            ],
        }
    }
}

/// The parameter that was solved, with its current value.
///
/// `value` holds the sample bound as a float so every parameter shares one
/// representation.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct SolvedParameter {
    pub parameter: Parameter,
    pub value: f64,
}

impl std::fmt::Display for SolvedParameter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self.parameter {
            Parameter::SampleBound => write!(f, "{} = {}", self.parameter, self.value),
            _ => write!(f, "{} = {:.6}", self.parameter, self.value),
        }
    }
}

/// Planning parameters, any of which may be missing.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize)]
pub struct ParameterSet {
    pub threshold: Option<f64>,
    pub alpha: Option<f64>,
    pub beta: Option<f64>,
    pub gamma: Option<f64>,
    pub delta: Option<f64>,
    pub sample_bound: Option<u64>,
}

/// Fully known values, used while solving.
#[derive(Debug, Clone, Copy)]
struct Plan {
    threshold: f64,
    alpha: f64,
    beta: f64,
    gamma: f64,
    delta: f64,
}

impl ParameterSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Take the error rates, delta and sample bound from a configuration;
    /// the threshold comes from the property under test.
    pub fn from_config(config: &TestConfig, threshold: Option<f64>) -> Self {
        Self {
            threshold,
            alpha: config.alpha,
            beta: config.beta,
            gamma: config.gamma,
            delta: config.delta,
            sample_bound: config.sample_bound,
        }
    }

    pub fn with_threshold(mut self, v: f64) -> Self {
        self.threshold = Some(v);
        self
    }

    pub fn with_alpha(mut self, v: f64) -> Self {
        self.alpha = Some(v);
        self
    }

    pub fn with_beta(mut self, v: f64) -> Self {
        self.beta = Some(v);
        self
    }

    pub fn with_gamma(mut self, v: f64) -> Self {
        self.gamma = Some(v);
        self
    }

    pub fn with_delta(mut self, v: f64) -> Self {
        self.delta = Some(v);
        self
    }

    pub fn with_sample_bound(mut self, n: u64) -> Self {
        self.sample_bound = Some(n);
        self
    }

    pub fn get(&self, parameter: Parameter) -> Option<f64> {
        match parameter {
            Parameter::Threshold => self.threshold,
            Parameter::Alpha => self.alpha,
            Parameter::Beta => self.beta,
            Parameter::Gamma => self.gamma,
            Parameter::Delta => self.delta,
            Parameter::SampleBound => self.sample_bound.map(|n| n as f64),
        }
    }

    fn set(&mut self, parameter: Parameter, value: f64) {
        match parameter {
            Parameter::Threshold => self.threshold = Some(value),
            Parameter::Alpha => self.alpha = Some(value),
            Parameter::Beta => self.beta = Some(value),
            Parameter::Gamma => self.gamma = Some(value),
            Parameter::Delta => self.delta = Some(value),
            Parameter::SampleBound => self.sample_bound = Some(value as u64),
        }
    }

    /// Slots relevant to `design` that have no value.
    pub fn unset(&self, design: Design) -> Vec<Parameter> {
        design
            .relevant()
            .iter()
            .copied()
            .filter(|p| self.get(*p).is_none())
            .collect()
    }

    /// Solve the single missing parameter, returning the completed set.
    ///
    /// Fails with [`Error::AmbiguousConfiguration`] unless exactly one
    /// relevant slot is unset, and with [`Error::Unsatisfiable`] when no
    /// value in range meets the target.
    pub fn solve_before_sim(&self, design: Design) -> Result<(ParameterSet, SolvedParameter)> {
        let unset = self.unset(design);
        if unset.len() != 1 {
            return Err(Error::AmbiguousConfiguration { unset });
        }
        let missing = unset[0];
        self.check_ranges(design)?;

        let value = match missing {
            Parameter::SampleBound => self.solve_sample_bound(design)?,
            Parameter::Threshold => self.solve_threshold(design)?,
            Parameter::Alpha | Parameter::Beta | Parameter::Gamma | Parameter::Delta => {
                self.solve_by_bisection(design, missing)?
            }
        };

        let mut solved = *self;
        solved.set(missing, value);
        debug!(
            parameter = %missing,
            value,
            ?design,
            "solved missing parameter before simulation"
        );
        Ok((
            solved,
            SolvedParameter {
                parameter: missing,
                value,
            },
        ))
    }

    fn check_ranges(&self, design: Design) -> Result<()> {
        for (name, value) in [
            ("threshold", self.threshold),
            ("alpha", self.alpha),
            ("beta", self.beta),
            ("gamma", self.gamma),
        ] {
            if let Some(v) = value {
                check_open_unit(name, v)?;
            }
        }
        if let Some(delta) = self.delta {
            if delta.is_nan() || delta <= 0.0 {
                return Err(Error::invalid("delta", delta, "must be positive"));
            }
        }
        if self.sample_bound == Some(0) {
            return Err(Error::invalid("sample_bound", 0.0, "must be at least 1"));
        }
        if let (Some(theta), Some(delta)) = (self.threshold, self.delta) {
            check_alternatives(design, theta, delta)?;
        }
        Ok(())
    }

    /// Known values; the missing slot is NaN until the solver fills it.
    fn plan(&self) -> Plan {
        Plan {
            threshold: self.threshold.unwrap_or(f64::NAN),
            alpha: self.alpha.unwrap_or(f64::NAN),
            beta: self.beta.unwrap_or(f64::NAN),
            gamma: self.gamma.unwrap_or(f64::NAN),
            delta: self.delta.unwrap_or(f64::NAN),
        }
    }

    fn budget(&self, missing: Parameter) -> Result<f64> {
        self.sample_bound
            .map(|n| n as f64)
            .ok_or(Error::AmbiguousConfiguration {
                unset: vec![missing, Parameter::SampleBound],
            })
    }

    fn solve_sample_bound(&self, design: Design) -> Result<f64> {
        let asn = design_asn(design, &self.plan());
        if !asn.is_finite() {
            return Err(Error::Unsatisfiable {
                parameter: Parameter::SampleBound,
                reason: format!("average sample number is {}", asn),
            });
        }
        Ok(asn.ceil().max(1.0))
    }

    fn solve_by_bisection(&self, design: Design, missing: Parameter) -> Result<f64> {
        let budget = self.budget(missing)?;
        let base = self.plan();
        let (lo, hi) = search_interval(design, &base, missing);
        if lo >= hi {
            return Err(Error::Unsatisfiable {
                parameter: missing,
                reason: "no admissible values remain".to_string(),
            });
        }

        // ASN is decreasing in every error rate and in delta.
        let excess = |v: f64| design_asn(design, &base.with(missing, v)) - budget;
        if excess(hi) > 0.0 {
            return Err(Error::Unsatisfiable {
                parameter: missing,
                reason: format!(
                    "{} samples are not enough even with {} = {:.6}",
                    budget, missing, hi
                ),
            });
        }
        if excess(lo) <= 0.0 {
            return Ok(lo);
        }
        bisect(excess, lo, hi, SOLVER_TOL, SOLVER_MAX_ITER).ok_or(Error::Unsatisfiable {
            parameter: missing,
            reason: "bisection did not converge".to_string(),
        })
    }

    fn solve_threshold(&self, design: Design) -> Result<f64> {
        let budget = self.budget(Parameter::Threshold)?;
        let base = self.plan();
        let delta = base.delta;
        let (near, far) = match design {
            Design::Binary { lower_bound: false } | Design::Ternary => {
                (0.5_f64.max(delta + EDGE), 1.0 - delta - EDGE)
            }
            Design::Binary { lower_bound: true } => ((1.0 - delta - EDGE).min(0.5), delta + EDGE),
        };
        let excess =
            |theta: f64| design_asn(design, &base.with(Parameter::Threshold, theta)) - budget;

        let at_near = excess(near);
        if at_near.is_nan() || excess(far).is_nan() {
            return Err(Error::Unsatisfiable {
                parameter: Parameter::Threshold,
                reason: format!("delta {} leaves no admissible threshold", delta),
            });
        }
        if at_near <= 0.0 {
            return Ok(near);
        }
        let (lo, hi) = if near < far { (near, far) } else { (far, near) };
        bisect(excess, lo, hi, SOLVER_TOL, SOLVER_MAX_ITER).ok_or(Error::Unsatisfiable {
            parameter: Parameter::Threshold,
            reason: format!("{} samples are not enough for any threshold", budget),
        })
    }
}

impl Plan {
    fn with(mut self, parameter: Parameter, v: f64) -> Self {
        match parameter {
            Parameter::Threshold => self.threshold = v,
            Parameter::Alpha => self.alpha = v,
            Parameter::Beta => self.beta = v,
            Parameter::Gamma => self.gamma = v,
            Parameter::Delta => self.delta = v,
            Parameter::SampleBound => {}
        }
        self
    }
}

/// Bisection bracket for an error rate or delta.
fn search_interval(design: Design, plan: &Plan, missing: Parameter) -> (f64, f64) {
    let theta = plan.threshold;
    match missing {
        Parameter::Delta => {
            let room = match design {
                Design::Binary { lower_bound: false } => 1.0 - theta,
                Design::Binary { lower_bound: true } => theta,
                Design::Ternary => theta.min(1.0 - theta),
            };
            (MIN_SOLVED_VALUE, room - EDGE)
        }
        _ => {
            // An error rate must stay below one minus the rate it is paired with.
            let partner = match (design, missing) {
                (Design::Binary { .. }, Parameter::Alpha) => plan.beta,
                (Design::Binary { .. }, _) => plan.alpha,
                (Design::Ternary, Parameter::Gamma) => plan.alpha.max(plan.beta),
                (Design::Ternary, _) => plan.gamma,
            };
            (MIN_SOLVED_VALUE, 0.5_f64.min(1.0 - partner) - EDGE)
        }
    }
}

/// ASN the design needs; NaN when an alternative falls outside (0, 1).
fn design_asn(design: Design, plan: &Plan) -> f64 {
    let Plan {
        threshold,
        alpha,
        beta,
        gamma,
        delta,
    } = *plan;
    let side = |a: f64, b: f64, p1: f64| {
        if p1 <= 0.0 || p1 >= 1.0 {
            f64::NAN
        } else {
            wald_asn(a, b, threshold, p1)
        }
    };
    match design {
        Design::Binary { lower_bound: false } => side(alpha, beta, threshold + delta),
        Design::Binary { lower_bound: true } => side(alpha, beta, threshold - delta),
        Design::Ternary => {
            let above = side(gamma, beta, threshold + delta);
            let below = side(gamma, alpha, threshold - delta);
            if above.is_nan() || below.is_nan() {
                f64::NAN
            } else {
                above.max(below)
            }
        }
    }
}

pub(crate) fn check_open_unit(name: &'static str, v: f64) -> Result<()> {
    if v.is_nan() || v <= 0.0 || v >= 1.0 {
        return Err(Error::invalid(name, v, "must be in (0, 1)"));
    }
    Ok(())
}

pub(crate) fn check_alternatives(design: Design, theta: f64, delta: f64) -> Result<()> {
    let (need_above, need_below) = match design {
        Design::Binary { lower_bound } => (!lower_bound, lower_bound),
        Design::Ternary => (true, true),
    };
    if need_above && theta + delta >= 1.0 {
        return Err(Error::invalid(
            "delta",
            delta,
            format!("threshold + delta must be below 1 (threshold {})", theta),
        ));
    }
    if need_below && theta - delta <= 0.0 {
        return Err(Error::invalid(
            "delta",
            delta,
            format!("threshold - delta must be above 0 (threshold {})", theta),
        ));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    const UPPER: Design = Design::Binary { lower_bound: false };

    fn classic() -> ParameterSet {
        ParameterSet::new()
            .with_threshold(0.5)
            .with_alpha(0.05)
            .with_beta(0.1)
            .with_delta(0.1)
    }

    #[test]
    fn sample_bound_is_ceiled_asn() {
        let (set, solved) = classic().solve_before_sim(UPPER).unwrap();
        let asn = wald_asn(0.05, 0.1, 0.5, 0.6);
        assert_eq!(solved.parameter, Parameter::SampleBound);
        assert!(solved.value.is_finite() && solved.value > 0.0);
        assert_eq!(solved.value, asn.ceil());
        assert_eq!(set.sample_bound, Some(asn.ceil() as u64));
    }

    #[test]
    fn fully_specified_is_ambiguous() {
        let err = classic()
            .with_sample_bound(100)
            .solve_before_sim(UPPER)
            .unwrap_err();
        assert_eq!(err, Error::AmbiguousConfiguration { unset: vec![] });
    }

    #[test]
    fn two_missing_is_ambiguous() {
        let set = ParameterSet::new().with_threshold(0.5).with_alpha(0.05);
        match set.solve_before_sim(UPPER) {
            Err(Error::AmbiguousConfiguration { unset }) => {
                assert_eq!(
                    unset,
                    vec![Parameter::Beta, Parameter::Delta, Parameter::SampleBound]
                );
            }
            other => panic!("unexpected {:?}", other),
        }
    }

    #[test]
    fn gamma_is_ignored_by_binary_designs() {
        let set = classic().with_gamma(0.2);
        assert_eq!(set.unset(UPPER), vec![Parameter::SampleBound]);
        assert_eq!(classic().unset(Design::Ternary).len(), 2);
    }

    #[test]
    fn alpha_round_trips_through_sample_bound() {
        let (planned, _) = classic().solve_before_sim(UPPER).unwrap();
        let exact_n = wald_asn(0.05, 0.1, 0.5, 0.6);
        let mut set = planned;
        set.alpha = None;
        set.sample_bound = Some(exact_n.ceil() as u64);
        let (_, solved) = set.solve_before_sim(UPPER).unwrap();
        assert_eq!(solved.parameter, Parameter::Alpha);
        // Ceiling the bound loosens the target slightly, so alpha may only shrink.
        assert!(solved.value <= 0.05 + 1e-9);
        assert!(solved.value > 0.04);
    }

    #[test]
    fn delta_solution_meets_budget() {
        let set = ParameterSet::new()
            .with_threshold(0.3)
            .with_alpha(0.01)
            .with_beta(0.02)
            .with_sample_bound(500);
        let (full, solved) = set.solve_before_sim(UPPER).unwrap();
        let delta = full.delta.unwrap();
        assert_eq!(solved.value, delta);
        assert!((wald_asn(0.01, 0.02, 0.3, 0.3 + delta) - 500.0).abs() < 1e-6);
    }

    #[test]
    fn tiny_budget_is_unsatisfiable() {
        let set = ParameterSet::new()
            .with_threshold(0.5)
            .with_beta(0.01)
            .with_delta(0.001)
            .with_sample_bound(3);
        let err = set.solve_before_sim(UPPER).unwrap_err();
        assert!(matches!(
            err,
            Error::Unsatisfiable {
                parameter: Parameter::Alpha,
                ..
            }
        ));
    }

    #[test]
    fn generous_budget_keeps_threshold_at_half() {
        let set = ParameterSet::new()
            .with_alpha(0.05)
            .with_beta(0.05)
            .with_delta(0.1)
            .with_sample_bound(100_000);
        let (full, _) = set.solve_before_sim(UPPER).unwrap();
        assert_eq!(full.threshold, Some(0.5));

        let (full, _) = set
            .solve_before_sim(Design::Binary { lower_bound: true })
            .unwrap();
        assert_eq!(full.threshold, Some(0.5));
    }

    #[test]
    fn tight_budget_moves_threshold_away_from_half() {
        let set = ParameterSet::new()
            .with_alpha(0.05)
            .with_beta(0.05)
            .with_delta(0.1)
            .with_sample_bound(60);
        let (full, _) = set.solve_before_sim(UPPER).unwrap();
        let theta = full.threshold.unwrap();
        assert!(theta > 0.5 && theta < 0.9);
        assert!((wald_asn(0.05, 0.05, theta, theta + 0.1) - 60.0).abs() < 1e-6);

        let (full, _) = set
            .solve_before_sim(Design::Binary { lower_bound: true })
            .unwrap();
        let theta = full.threshold.unwrap();
        assert!(theta < 0.5 && theta > 0.1);
    }

    #[test]
    fn ternary_gamma_solution() {
        let set = ParameterSet::new()
            .with_threshold(0.5)
            .with_alpha(0.05)
            .with_beta(0.05)
            .with_delta(0.1)
            .with_sample_bound(400);
        let (full, solved) = set.solve_before_sim(Design::Ternary).unwrap();
        let gamma = full.gamma.unwrap();
        assert_eq!(solved.parameter, Parameter::Gamma);
        let asn = wald_asn(gamma, 0.05, 0.5, 0.6).max(wald_asn(gamma, 0.05, 0.5, 0.4));
        assert!((asn - 400.0).abs() < 1e-6);
    }

    #[test]
    fn out_of_range_alternative_is_invalid() {
        let set = ParameterSet::new()
            .with_threshold(0.95)
            .with_alpha(0.05)
            .with_beta(0.05)
            .with_delta(0.1);
        let err = set.solve_before_sim(UPPER).unwrap_err();
        assert_eq!(err.code(), 10);
        assert!(set
            .solve_before_sim(Design::Binary { lower_bound: true })
            .is_ok());
    }

    #[test]
    fn parameter_display() {
        assert_eq!(Parameter::SampleBound.to_string(), "sample_bound");
        let solved = SolvedParameter {
            parameter: Parameter::Alpha,
            value: 0.05,
        };
        assert_eq!(solved.to_string(), "alpha = 0.050000");
    }
}
