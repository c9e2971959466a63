//! Fuzz target for missing-parameter solving.
//!
//! Solving must either succeed with a value for exactly the missing slot
//! or return an error; it must never panic or loop forever.

#![no_main]

use arbitrary::Arbitrary;
use libfuzzer_sys::fuzz_target;
use stmc_core::{Design, ParameterSet};

#[derive(Debug, Arbitrary)]
struct Input {
    threshold: Option<f64>,
    alpha: Option<f64>,
    beta: Option<f64>,
    gamma: Option<f64>,
    delta: Option<f64>,
    sample_bound: Option<u32>,
    design: u8,
}

fuzz_target!(|input: Input| {
    let set = ParameterSet {
        threshold: input.threshold,
        alpha: input.alpha,
        beta: input.beta,
        gamma: input.gamma,
        delta: input.delta,
        sample_bound: input.sample_bound.map(u64::from),
    };
    let design = match input.design % 3 {
        0 => Design::Binary { lower_bound: false },
        1 => Design::Binary { lower_bound: true },
        _ => Design::Ternary,
    };
    if let Ok((full, solved)) = set.solve_before_sim(design) {
        assert!(set.get(solved.parameter).is_none());
        assert!(full.get(solved.parameter).is_some());
        assert!(full.unset(design).is_empty());
    }
});
