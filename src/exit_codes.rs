//! Exit code constants for the fleet CLI.
//!
//! - 0: Success
//! - 1: User error (bad args, invalid agent records or config)
//! - 2: Validation failure (compiled document out of date)
//! - 3: External tracker or git failure
//! - 4: Platform failure (global preflight)

/// Successful execution.
pub const SUCCESS: i32 = 0;

/// User error: bad arguments, malformed agent records, invalid config.
pub const USER_ERROR: i32 = 1;

/// Validation failure: `compile --check` found drift.
pub const VALIDATION_FAILURE: i32 = 2;

/// External failure: tracker API or git subprocess errors.
pub const EXTERNAL_FAILURE: i32 = 3;

/// Platform failure: the event cannot be processed at all.
pub const PLATFORM_FAILURE: i32 = 4;
