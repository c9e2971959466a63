//! STMC configuration loading and validation.
//!
//! This crate provides:
//! - Typed configuration for the sequential hypothesis tests
//! - Config resolution (explicit path → env → XDG → defaults)
//! - Environment overrides for individual parameters
//! - Semantic validation

pub mod resolve;
pub mod validate;

pub use resolve::{load_config, resolve_config_path, ConfigSource};
pub use validate::{validate_config, ValidationError, ValidationResult};

use serde::{Deserialize, Serialize};
use std::path::Path;

/// Default for alpha, beta, gamma and delta when a config leaves them out.
pub const DEFAULT_ERROR_RATE: f64 = 0.01;

/// Default minimum number of iterations before a GSPRT may decide.
pub const DEFAULT_MIN_ITERS: u64 = 10;

/// Supported hypothesis tests.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum HypTestName {
    /// Binary sequential probability ratio test.
    #[default]
    #[serde(rename = "SPRT", alias = "sprt")]
    Sprt,
    /// Generalized SPRT against the maximum-likelihood estimate.
    #[serde(rename = "GSPRT", alias = "gsprt")]
    Gsprt,
    /// Ternary SPRT with a "too close to call" outcome.
    #[serde(rename = "TSPRT", alias = "tsprt")]
    Tsprt,
}

impl HypTestName {
    pub const ALL: [HypTestName; 3] = [HypTestName::Sprt, HypTestName::Gsprt, HypTestName::Tsprt];

    pub fn as_str(&self) -> &'static str {
        match self {
            HypTestName::Sprt => "SPRT",
            HypTestName::Gsprt => "GSPRT",
            HypTestName::Tsprt => "TSPRT",
        }
    }

    /// Comma-separated list of accepted names, for error messages.
    pub fn values_to_string() -> String {
        Self::ALL
            .iter()
            .map(|n| n.as_str())
            .collect::<Vec<_>>()
            .join(", ")
    }
}

impl std::str::FromStr for HypTestName {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_uppercase().as_str() {
            "SPRT" => Ok(HypTestName::Sprt),
            "GSPRT" => Ok(HypTestName::Gsprt),
            "TSPRT" => Ok(HypTestName::Tsprt),
            _ => Err(format!(
                "unknown hypothesis test '{}', expected one of {}",
                s,
                Self::values_to_string()
            )),
        }
    }
}

impl std::fmt::Display for HypTestName {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// What a test does with observations that arrive after it has decided.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AfterCompletion {
    /// Keep accumulating the statistic but report the first verdict forever.
    #[default]
    Freeze,
    /// Keep accumulating and re-evaluate the verdict on every query.
    Reevaluate,
}

impl std::str::FromStr for AfterCompletion {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "freeze" | "frozen" => Ok(AfterCompletion::Freeze),
            "reevaluate" | "continue" | "live" => Ok(AfterCompletion::Reevaluate),
            _ => Err(format!("unknown completion policy: {}", s)),
        }
    }
}

impl std::fmt::Display for AfterCompletion {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            AfterCompletion::Freeze => write!(f, "freeze"),
            AfterCompletion::Reevaluate => write!(f, "reevaluate"),
        }
    }
}

/// Sequential test configuration.
///
/// Each calibration parameter is optional: a field explicitly set to `null`
/// (JSON) or overridden with `none` (environment) marks the one parameter
/// that should be solved from the others. Fields that are simply absent
/// take their defaults.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct TestConfig {
    pub method: HypTestName,
    /// Type I error probability.
    pub alpha: Option<f64>,
    /// Type II error probability.
    pub beta: Option<f64>,
    /// Error probability of the "too close" decisions (TSPRT only).
    pub gamma: Option<f64>,
    /// Half-width of the indifference region (SPRT/TSPRT only).
    pub delta: Option<f64>,
    /// Planned number of samples; usually the solved parameter.
    pub sample_bound: Option<u64>,
    /// Minimum observations before a GSPRT may decide.
    pub min_iters: u64,
    pub after_completion: AfterCompletion,
}

impl Default for TestConfig {
    fn default() -> Self {
        TestConfig {
            method: HypTestName::Sprt,
            alpha: Some(DEFAULT_ERROR_RATE),
            beta: Some(DEFAULT_ERROR_RATE),
            gamma: Some(DEFAULT_ERROR_RATE),
            delta: Some(DEFAULT_ERROR_RATE),
            sample_bound: None,
            min_iters: DEFAULT_MIN_ITERS,
            after_completion: AfterCompletion::Freeze,
        }
    }
}

impl TestConfig {
    /// Load a config file, choosing the format from the extension
    /// (`.toml` is TOML, anything else is JSON).
    pub fn from_file(path: &Path) -> ValidationResult<Self> {
        let content = std::fs::read_to_string(path).map_err(|e| {
            ValidationError::IoError(format!("Failed to read {}: {}", path.display(), e))
        })?;

        match path.extension().and_then(|e| e.to_str()) {
            Some("toml") => Self::parse_toml(&content),
            _ => Self::parse_json(&content),
        }
    }

    /// Parse a config from a JSON string.
    pub fn parse_json(json: &str) -> ValidationResult<Self> {
        serde_json::from_str(json)
            .map_err(|e| ValidationError::ParseError(format!("Invalid JSON: {}", e)))
    }

    /// Parse a config from a TOML string.
    ///
    /// TOML has no null, so the parameter to be solved is named in an
    /// `unset` list instead, e.g. `unset = ["alpha"]`.
    pub fn parse_toml(src: &str) -> ValidationResult<Self> {
        let raw: TomlConfig = toml::from_str(src)
            .map_err(|e| ValidationError::ParseError(format!("Invalid TOML: {}", e)))?;
        raw.into_config()
    }

    /// Apply `STMC_*` environment overrides on top of this config.
    pub fn apply_env(&mut self) -> ValidationResult<()> {
        resolve::apply_env_overrides(self)
    }
}

/// TOML form of [`TestConfig`]: identical fields plus an `unset` list
/// naming the parameters to solve.
#[derive(Debug, Default, Deserialize)]
#[serde(default, deny_unknown_fields)]
struct TomlConfig {
    method: Option<HypTestName>,
    alpha: Option<f64>,
    beta: Option<f64>,
    gamma: Option<f64>,
    delta: Option<f64>,
    sample_bound: Option<u64>,
    min_iters: Option<u64>,
    after_completion: Option<AfterCompletion>,
    unset: Vec<String>,
}

impl TomlConfig {
    fn into_config(self) -> ValidationResult<TestConfig> {
        let defaults = TestConfig::default();
        let mut config = TestConfig {
            method: self.method.unwrap_or(defaults.method),
            alpha: self.alpha.or(defaults.alpha),
            beta: self.beta.or(defaults.beta),
            gamma: self.gamma.or(defaults.gamma),
            delta: self.delta.or(defaults.delta),
            sample_bound: self.sample_bound,
            min_iters: self.min_iters.unwrap_or(defaults.min_iters),
            after_completion: self.after_completion.unwrap_or(defaults.after_completion),
        };
        for name in &self.unset {
            match name.as_str() {
                "alpha" => config.alpha = None,
                "beta" => config.beta = None,
                "gamma" => config.gamma = None,
                "delta" => config.delta = None,
                "sample_bound" => config.sample_bound = None,
                other => {
                    return Err(ValidationError::InvalidValue {
                        field: "unset".to_string(),
                        message: format!("unknown parameter '{}'", other),
                    })
                }
            }
        }
        Ok(config)
    }
}
