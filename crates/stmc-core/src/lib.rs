//! STMC core: sequential hypothesis tests for statistical model checking.
//!
//! A simulation driver feeds each trial's pass/fail outcome into a test and
//! polls it for a verdict, stopping as soon as the evidence suffices:
//!
//! ```
//! use stmc_core::{BernoulliCounts, BinarySprt, SequentialTest, Verdict};
//!
//! let mut test = BinarySprt::new(0.5, 0.05, 0.05, 0.1, false)?;
//! let mut sampler = BernoulliCounts::new();
//! while !test.completed() {
//!     let passed = true; // one simulation run
//!     sampler.push(passed);
//!     test.update(passed);
//! }
//! assert_eq!(test.verdict(), Verdict::Larger);
//! println!("{}", test.result_explanation(&sampler));
//! # Ok::<(), stmc_core::Error>(())
//! ```

pub mod error;
pub mod logging;
pub mod method;
pub mod params;
pub mod sampler;
pub mod sprt;

pub use error::{Error, ErrorCategory, Result};
pub use method::HypothesisTest;
pub use params::{Design, Parameter, ParameterSet, SolvedParameter};
pub use sampler::{BernoulliCounts, Sampler};
pub use sprt::ternary::combine;
pub use sprt::{
    BinarySprt, BinaryStatus, Gsprt, SequentialTest, TernarySprt, TernaryStatus, TestResult,
    TestState, Verdict,
};

// Re-export configuration types for convenience
pub use stmc_config::{AfterCompletion, HypTestName, TestConfig};
