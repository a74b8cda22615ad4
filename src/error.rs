//! Error taxonomy for the rating engine

use crate::Gender;

/// Errors returned by norms loading, rating and the formula calculators.
///
/// All of these are deterministic functions of their inputs: retrying with the
/// same input yields the same error. Batch callers record the failure against
/// the single test and keep rating the rest.
#[derive(thiserror::Error, Debug, Clone, PartialEq)]
pub enum EngineError {
    #[error("no normative data registered for test '{test_id}'")]
    NotFound { test_id: String },

    #[error("malformed normative data for test '{test_id}': {reason}")]
    MalformedData { test_id: String, reason: String },

    #[error("input out of domain: {0}")]
    OutOfDomain(String),

    #[error("test '{test_id}' has no norms for gender '{gender}'")]
    UnsupportedDemographic { test_id: String, gender: Gender },

    #[error("invalid input: {0}")]
    InvalidInput(String),
}

impl EngineError {
    pub(crate) fn malformed(test_id: &str, reason: impl Into<String>) -> Self {
        EngineError::MalformedData {
            test_id: test_id.to_string(),
            reason: reason.into(),
        }
    }

    /// Short machine-readable kind, used in JSON failure reports
    pub fn kind(&self) -> &'static str {
        match self {
            EngineError::NotFound { .. } => "not_found",
            EngineError::MalformedData { .. } => "malformed_data",
            EngineError::OutOfDomain(_) => "out_of_domain",
            EngineError::UnsupportedDemographic { .. } => "unsupported_demographic",
            EngineError::InvalidInput(_) => "invalid_input",
        }
    }
}
