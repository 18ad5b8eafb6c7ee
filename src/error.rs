//! Error types for fleet.
//!
//! Admission skips and validation failures are not errors; they are carried
//! as data in verdicts and audit records. This enum covers the failures that
//! stop an operation.

use crate::exit_codes;
use thiserror::Error;

/// Main error type for fleet operations.
#[derive(Error, Debug)]
pub enum FleetError {
    /// Invalid input, agent records or configuration.
    #[error("{0}")]
    UserError(String),

    /// A generated artifact does not match what is on disk.
    #[error("Validation failed: {0}")]
    ValidationError(String),

    /// A call to the external item tracker failed.
    #[error("Tracker operation failed: {0}")]
    TrackerError(String),

    /// Git operation failed.
    #[error("Git operation failed: {0}")]
    GitError(String),

    /// The event cannot be processed at all (e.g. no agent credential).
    #[error("Platform failure: {0}")]
    PlatformError(String),
}

impl FleetError {
    /// Returns the appropriate exit code for this error type.
    pub fn exit_code(&self) -> i32 {
        match self {
            FleetError::UserError(_) => exit_codes::USER_ERROR,
            FleetError::ValidationError(_) => exit_codes::VALIDATION_FAILURE,
            FleetError::TrackerError(_) => exit_codes::EXTERNAL_FAILURE,
            FleetError::GitError(_) => exit_codes::EXTERNAL_FAILURE,
            FleetError::PlatformError(_) => exit_codes::PLATFORM_FAILURE,
        }
    }
}

/// Result type alias for fleet operations.
pub type Result<T> = std::result::Result<T, FleetError>;
