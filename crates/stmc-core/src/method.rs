//! Building a test from configuration.

use crate::error::{Error, Result};
use crate::params::{Parameter, ParameterSet, SolvedParameter};
use crate::sampler::Sampler;
use crate::sprt::{BinarySprt, Gsprt, SequentialTest, TernarySprt, TestResult, Verdict};
use std::fmt;
use stmc_config::{validate_config, HypTestName, TestConfig};
use tracing::debug;

/// Any of the supported tests, as a plain value.
#[derive(Debug, Clone, PartialEq)]
pub enum HypothesisTest {
    Sprt(BinarySprt),
    Tsprt(TernarySprt),
    Gsprt(Gsprt),
}

impl HypothesisTest {
    /// Build the configured test for a property with the given threshold.
    ///
    /// `threshold` may be `None` to have it solved from the other
    /// parameters. `lower_bound` selects the alternative below the
    /// threshold and only matters for SPRT.
    pub fn from_config(
        config: &TestConfig,
        threshold: Option<f64>,
        lower_bound: bool,
    ) -> Result<Self> {
        validate_config(config)?;
        let plan = ParameterSet::from_config(config, threshold);

        let test = match config.method {
            HypTestName::Sprt => HypothesisTest::Sprt(
                BinarySprt::from_plan(plan, lower_bound)?
                    .with_after_completion(config.after_completion),
            ),
            HypTestName::Tsprt => HypothesisTest::Tsprt(
                TernarySprt::from_plan(plan)?.with_after_completion(config.after_completion),
            ),
            HypTestName::Gsprt => {
                let (Some(threshold), Some(alpha), Some(beta)) =
                    (threshold, config.alpha, config.beta)
                else {
                    let parameter = if threshold.is_none() {
                        Parameter::Threshold
                    } else if config.alpha.is_none() {
                        Parameter::Alpha
                    } else {
                        Parameter::Beta
                    };
                    return Err(Error::UnsupportedParameter {
                        method: HypTestName::Gsprt,
                        parameter,
                    });
                };
                HypothesisTest::Gsprt(
                    Gsprt::new(threshold, alpha, beta, config.min_iters)?
                        .with_after_completion(config.after_completion),
                )
            }
        };
        debug!(method = %config.method, ?threshold, lower_bound, "built hypothesis test");
        Ok(test)
    }
}

macro_rules! dispatch {
    ($self:expr, $test:ident => $body:expr) => {
        match $self {
            HypothesisTest::Sprt($test) => $body,
            HypothesisTest::Tsprt($test) => $body,
            HypothesisTest::Gsprt($test) => $body,
        }
    };
}

impl SequentialTest for HypothesisTest {
    fn method(&self) -> HypTestName {
        dispatch!(self, t => t.method())
    }

    fn full_name(&self) -> String {
        dispatch!(self, t => t.full_name())
    }

    fn set_expression(&mut self, expression: &dyn fmt::Display) {
        dispatch!(self, t => t.set_expression(expression))
    }

    fn update(&mut self, passed: bool) {
        dispatch!(self, t => t.update(passed))
    }

    fn update_counts(&mut self, passed: u64, failed: u64) {
        dispatch!(self, t => t.update_counts(passed, failed))
    }

    fn observations(&self) -> u64 {
        dispatch!(self, t => t.observations())
    }

    fn completed(&self) -> bool {
        dispatch!(self, t => t.completed())
    }

    fn rejected(&self) -> bool {
        dispatch!(self, t => t.rejected())
    }

    fn failed_to_reject(&self) -> bool {
        dispatch!(self, t => t.failed_to_reject())
    }

    fn too_close(&self) -> bool {
        dispatch!(self, t => t.too_close())
    }

    fn verdict(&self) -> Verdict {
        dispatch!(self, t => t.verdict())
    }

    fn log_likelihood_ratio(&self) -> f64 {
        dispatch!(self, t => t.log_likelihood_ratio())
    }

    fn should_stop_now(&self, iters: u64, sampler: &dyn Sampler) -> bool {
        dispatch!(self, t => t.should_stop_now(iters, sampler))
    }

    fn progress(&self, iters: u64, sampler: &dyn Sampler) -> f64 {
        dispatch!(self, t => t.progress(iters, sampler))
    }

    fn result(&self, sampler: &dyn Sampler) -> TestResult {
        dispatch!(self, t => t.result(sampler))
    }

    fn result_explanation(&self, sampler: &dyn Sampler) -> String {
        dispatch!(self, t => t.result_explanation(sampler))
    }

    fn parameters_string(&self) -> String {
        dispatch!(self, t => t.parameters_string())
    }

    fn missing_parameter(&self) -> Option<SolvedParameter> {
        dispatch!(self, t => t.missing_parameter())
    }

    fn compute_missing_parameter_after_sim(&mut self) -> Result<()> {
        dispatch!(self, t => t.compute_missing_parameter_after_sim())
    }

    fn reset(&mut self) {
        dispatch!(self, t => t.reset())
    }
}
