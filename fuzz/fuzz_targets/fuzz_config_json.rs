//! Fuzz target for JSON test configuration parsing.
//!
//! Parsing and validating arbitrary input must never panic, and anything
//! that validates must also build a test or fail with a typed error.

#![no_main]

use libfuzzer_sys::fuzz_target;
use stmc_config::{validate_config, TestConfig};
use stmc_core::HypothesisTest;

fuzz_target!(|data: &[u8]| {
    let Ok(text) = std::str::from_utf8(data) else {
        return;
    };
    let Ok(config) = TestConfig::parse_json(text) else {
        return;
    };
    if validate_config(&config).is_ok() {
        let _ = HypothesisTest::from_config(&config, Some(0.5), false);
    }
});
