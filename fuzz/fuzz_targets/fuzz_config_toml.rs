//! Fuzz target for TOML test configuration parsing.

#![no_main]

use libfuzzer_sys::fuzz_target;
use stmc_config::TestConfig;

fuzz_target!(|data: &[u8]| {
    if let Ok(text) = std::str::from_utf8(data) {
        let _ = TestConfig::parse_toml(text);
    }
});
