//! Error types for the sequential tests.
//!
//! Every error carries a stable numeric code and a category so that a
//! driving simulation loop can decide whether to abort, fix the
//! configuration, or simply poll again later.
//!
//! Codes are grouped by category:
//! - 10-19: configuration errors (fail fast, not retryable as-is)
//! - 20-29: query errors (asked too early; retry after more samples)
//! - 30-39: inference errors (internal inconsistency of a verdict)

use crate::params::Parameter;
use serde::Serialize;
use stmc_config::{HypTestName, ValidationError};
use thiserror::Error;

/// Result type alias for sequential test operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Error categories for grouping related errors.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorCategory {
    /// Invalid or ambiguous test parameters.
    Config,
    /// A result was requested before it existed.
    Query,
    /// The combined verdict of sub-tests is contradictory.
    Inference,
}

impl std::fmt::Display for ErrorCategory {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ErrorCategory::Config => write!(f, "config"),
            ErrorCategory::Query => write!(f, "query"),
            ErrorCategory::Inference => write!(f, "inference"),
        }
    }
}

/// Unified error type for the sequential tests.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum Error {
    // Configuration errors (10-19)
    #[error("invalid parameter {name} = {value}: {reason}")]
    InvalidParameter {
        name: &'static str,
        value: f64,
        reason: String,
    },

    #[error(
        "ambiguous configuration: exactly one parameter must be left unset, found [{}]",
        join_parameters(.unset)
    )]
    AmbiguousConfiguration { unset: Vec<Parameter> },

    #[error("cannot solve for {parameter}: {reason}")]
    Unsatisfiable { parameter: Parameter, reason: String },

    #[error("{method} cannot solve for {parameter}")]
    UnsupportedParameter {
        method: HypTestName,
        parameter: Parameter,
    },

    #[error("configuration error: {0}")]
    Config(#[from] ValidationError),

    // Query errors (20-29)
    #[error("{operation} requested before the test completed")]
    PrematureQuery { operation: &'static str },

    // Inference errors (30-39)
    #[error("inconsistent verdict: {detail}")]
    InconsistentVerdict { detail: String },
}

fn join_parameters(params: &[Parameter]) -> String {
    params
        .iter()
        .map(|p| p.to_string())
        .collect::<Vec<_>>()
        .join(", ")
}

impl Error {
    /// Returns the stable error code.
    pub fn code(&self) -> u32 {
        match self {
            Error::InvalidParameter { .. } => 10,
            Error::AmbiguousConfiguration { .. } => 11,
            Error::Unsatisfiable { .. } => 12,
            Error::UnsupportedParameter { .. } => 13,
            Error::Config(_) => 14,
            Error::PrematureQuery { .. } => 20,
            Error::InconsistentVerdict { .. } => 30,
        }
    }

    /// Returns the error category for grouping and filtering.
    pub fn category(&self) -> ErrorCategory {
        match self {
            Error::InvalidParameter { .. }
            | Error::AmbiguousConfiguration { .. }
            | Error::Unsatisfiable { .. }
            | Error::UnsupportedParameter { .. }
            | Error::Config(_) => ErrorCategory::Config,
            Error::PrematureQuery { .. } => ErrorCategory::Query,
            Error::InconsistentVerdict { .. } => ErrorCategory::Inference,
        }
    }

    /// Whether retrying the same call later can succeed without changing
    /// the configuration.
    pub fn is_recoverable(&self) -> bool {
        matches!(self, Error::PrematureQuery { .. })
    }

    pub(crate) fn invalid(name: &'static str, value: f64, reason: impl Into<String>) -> Self {
        Error::InvalidParameter {
            name,
            value,
            reason: reason.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_codes_are_grouped_by_category() {
        let errors = vec![
            Error::invalid("alpha", 2.0, "must be in (0, 1)"),
            Error::AmbiguousConfiguration {
                unset: vec![Parameter::Alpha, Parameter::Beta],
            },
            Error::Unsatisfiable {
                parameter: Parameter::Delta,
                reason: "budget too small".to_string(),
            },
            Error::UnsupportedParameter {
                method: HypTestName::Gsprt,
                parameter: Parameter::Delta,
            },
            Error::Config(ValidationError::MissingField("alpha".to_string())),
            Error::PrematureQuery {
                operation: "error-rate refinement",
            },
            Error::InconsistentVerdict {
                detail: "both sides rejected".to_string(),
            },
        ];

        for err in errors {
            let code = err.code();
            match err.category() {
                ErrorCategory::Config => assert!((10..20).contains(&code)),
                ErrorCategory::Query => assert!((20..30).contains(&code)),
                ErrorCategory::Inference => assert!((30..40).contains(&code)),
            }
        }
    }

    #[test]
    fn test_ambiguous_message_lists_parameters() {
        let err = Error::AmbiguousConfiguration {
            unset: vec![Parameter::Alpha, Parameter::SampleBound],
        };
        assert_eq!(
            err.to_string(),
            "ambiguous configuration: exactly one parameter must be left unset, found [alpha, sample_bound]"
        );
    }

    #[test]
    fn test_only_premature_query_is_recoverable() {
        assert!(Error::PrematureQuery { operation: "x" }.is_recoverable());
        assert!(!Error::invalid("beta", 0.0, "zero").is_recoverable());
    }

    #[test]
    fn test_config_error_converts() {
        let err: Error = ValidationError::ParseError("bad".to_string()).into();
        assert_eq!(err.code(), 14);
        assert!(err.to_string().contains("bad"));
    }
}
