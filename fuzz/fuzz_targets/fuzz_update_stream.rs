//! Fuzz target for arbitrary parameters and update sequences.
//!
//! Construction may reject the parameters, but a constructed test must
//! accept any stream of single and batched updates without panicking and
//! keep its progress within [0, 100].

#![no_main]

use arbitrary::Arbitrary;
use libfuzzer_sys::fuzz_target;
use stmc_core::{
    AfterCompletion, BernoulliCounts, BinarySprt, Gsprt, HypothesisTest, SequentialTest,
    TernarySprt,
};

#[derive(Debug, Arbitrary)]
enum Step {
    Single(bool),
    Batch(u32, u32),
    Reset,
}

#[derive(Debug, Arbitrary)]
struct Input {
    kind: u8,
    threshold: f64,
    alpha: f64,
    beta: f64,
    gamma: f64,
    delta: f64,
    min_samples: u16,
    reevaluate: bool,
    steps: Vec<Step>,
}

fuzz_target!(|input: Input| {
    let policy = if input.reevaluate {
        AfterCompletion::Reevaluate
    } else {
        AfterCompletion::Freeze
    };
    let built = match input.kind % 3 {
        0 => BinarySprt::new(input.threshold, input.alpha, input.beta, input.delta, false)
            .map(|t| HypothesisTest::Sprt(t.with_after_completion(policy))),
        1 => TernarySprt::new(
            input.threshold,
            input.alpha,
            input.beta,
            input.gamma,
            input.delta,
        )
        .map(|t| HypothesisTest::Tsprt(t.with_after_completion(policy))),
        _ => Gsprt::new(input.threshold, input.alpha, input.beta, input.min_samples as u64)
            .map(|t| HypothesisTest::Gsprt(t.with_after_completion(policy))),
    };
    let Ok(mut test) = built else {
        return;
    };

    let mut sampler = BernoulliCounts::new();
    for step in input.steps {
        match step {
            Step::Single(passed) => {
                sampler.push(passed);
                test.update(passed);
            }
            Step::Batch(passed, failed) => {
                sampler.push_counts(passed as u64, failed as u64);
                test.update_counts(passed as u64, failed as u64);
            }
            Step::Reset => {
                sampler = BernoulliCounts::new();
                test.reset();
            }
        }
        let progress = test.progress(test.observations(), &sampler);
        assert!((0.0..=100.0).contains(&progress));
    }
    let _ = test.result_explanation(&sampler);
    let _ = test.compute_missing_parameter_after_sim();
});
