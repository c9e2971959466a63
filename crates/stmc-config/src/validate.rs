//! Configuration validation errors and semantic validation.

use crate::TestConfig;
use thiserror::Error;

/// Validation result type.
pub type ValidationResult<T> = Result<T, ValidationError>;

/// Configuration validation errors.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ValidationError {
    #[error("I/O error: {0}")]
    IoError(String),

    #[error("Parse error: {0}")]
    ParseError(String),

    #[error("Missing required field: {0}")]
    MissingField(String),

    #[error("Invalid value for {field}: {message}")]
    InvalidValue { field: String, message: String },
}

impl ValidationError {
    /// Error code for structured error reporting.
    pub fn code(&self) -> u32 {
        match self {
            ValidationError::IoError(_) => 60,
            ValidationError::ParseError(_) => 61,
            ValidationError::MissingField(_) => 64,
            ValidationError::InvalidValue { .. } => 65,
        }
    }
}

/// Validate a test configuration semantically.
///
/// Only checks the values that are present; whether the right number of
/// parameters is left unset is decided when the test is built.
pub fn validate_config(config: &TestConfig) -> ValidationResult<()> {
    validate_probability("alpha", config.alpha)?;
    validate_probability("beta", config.beta)?;
    validate_probability("gamma", config.gamma)?;

    if let Some(delta) = config.delta {
        if delta.is_nan() || delta <= 0.0 || delta >= 0.5 {
            return Err(ValidationError::InvalidValue {
                field: "delta".to_string(),
                message: format!("Must be in (0, 0.5), got {}", delta),
            });
        }
    }

    if config.sample_bound == Some(0) {
        return Err(ValidationError::InvalidValue {
            field: "sample_bound".to_string(),
            message: "Must be at least 1".to_string(),
        });
    }

    if config.min_iters == 0 {
        return Err(ValidationError::InvalidValue {
            field: "min_iters".to_string(),
            message: "Must be at least 1".to_string(),
        });
    }

    Ok(())
}

fn validate_probability(field: &str, value: Option<f64>) -> ValidationResult<()> {
    match value {
        Some(p) if p.is_nan() || p <= 0.0 || p >= 1.0 => Err(ValidationError::InvalidValue {
            field: field.to_string(),
            message: format!("Must be in (0, 1), got {}", p),
        }),
        _ => Ok(()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::HypTestName;

    #[test]
    fn test_default_config_is_valid() {
        assert!(validate_config(&TestConfig::default()).is_ok());
    }

    #[test]
    fn test_probability_out_of_range() {
        let config = TestConfig {
            beta: Some(1.0),
            ..Default::default()
        };
        let err = validate_config(&config).unwrap_err();
        assert_eq!(err.code(), 65);
        assert!(err.to_string().contains("beta"));
    }

    #[test]
    fn test_nan_rejected() {
        let config = TestConfig {
            gamma: Some(f64::NAN),
            ..Default::default()
        };
        assert!(validate_config(&config).is_err());
    }

    #[test]
    fn test_delta_range() {
        for delta in [0.0, -0.1, 0.5, 0.9] {
            let config = TestConfig {
                delta: Some(delta),
                ..Default::default()
            };
            assert!(validate_config(&config).is_err(), "delta {} accepted", delta);
        }
    }

    #[test]
    fn test_unset_parameters_are_not_errors_here() {
        let config = TestConfig {
            alpha: None,
            delta: None,
            ..Default::default()
        };
        assert!(validate_config(&config).is_ok());
    }

    #[test]
    fn test_zero_sample_bound() {
        let config = TestConfig {
            sample_bound: Some(0),
            ..Default::default()
        };
        assert!(validate_config(&config).is_err());
    }

    #[test]
    fn test_gsprt_unset_rates_left_to_builder() {
        let config = TestConfig {
            method: HypTestName::Gsprt,
            beta: None,
            ..Default::default()
        };
        assert!(validate_config(&config).is_ok());
    }
}
