//! Dispatch timing constants and identifier validation.
//!
//! Pure functions and constants used by the dispatcher, the registries,
//! and the HTTP surface.

use crate::error::CoreError;

// ---------------------------------------------------------------------------
// Constants
// ---------------------------------------------------------------------------

/// Upper bound on the whole dispatch attempt for one job.
pub const START_JOB_TIMEOUT_SECS: u64 = 30;

/// How long a coordination task waits for a sent command to be picked
/// up before selecting a worker again.
pub const SEND_JOB_TIMEOUT_SECS: u64 = 10;

/// A non-terminal command status older than this reads as
/// `TIMEOUT_RESPONSE`.
pub const COMMAND_STATUS_TIMEOUT_SECS: u64 = 30;

/// Entries not written for this long are discarded from the command
/// registry and the job tracker.
pub const STATUS_RETENTION_SECS: u64 = 600;

/// Sleep between two iterations of a coordination task.
pub const POLL_INTERVAL_MS: u64 = 1000;

/// Maximum length of a job or worker identifier.
const MAX_IDENTIFIER_LEN: usize = 128;

// ---------------------------------------------------------------------------
// Send budget
// ---------------------------------------------------------------------------

/// Upper bound on start commands a single dispatch attempt can publish.
///
/// Each send is followed by at least `send_timeout` of waiting, so no
/// more than `ceil(start_timeout / send_timeout)` sends fit inside the
/// overall deadline. A zero `send_timeout` yields `u64::MAX`.
pub fn max_send_attempts(start_timeout_secs: u64, send_timeout_secs: u64) -> u64 {
    if send_timeout_secs == 0 {
        return u64::MAX;
    }
    start_timeout_secs.div_ceil(send_timeout_secs)
}

// ---------------------------------------------------------------------------
// Validation
// ---------------------------------------------------------------------------

/// Validate an identifier arriving from outside the process.
///
/// Rules:
/// - Must not be empty.
/// - Must not exceed `MAX_IDENTIFIER_LEN` characters.
/// - Must contain only ASCII alphanumeric, hyphen, underscore, dot, or colon.
///
/// `kind` names the identifier in the error message (e.g. `"Job id"`).
pub fn validate_identifier(kind: &str, value: &str) -> Result<(), CoreError> {
    if value.is_empty() {
        return Err(CoreError::Validation(format!("{kind} must not be empty")));
    }
    if value.len() > MAX_IDENTIFIER_LEN {
        return Err(CoreError::Validation(format!(
            "{kind} must not exceed {MAX_IDENTIFIER_LEN} characters"
        )));
    }
    if !value
        .chars()
        .all(|c| c.is_ascii_alphanumeric() || matches!(c, '-' | '_' | '.' | ':'))
    {
        return Err(CoreError::Validation(format!(
            "{kind} may only contain alphanumeric, hyphen, underscore, dot, or colon characters"
        )));
    }
    Ok(())
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
