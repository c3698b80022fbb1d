//! Status enums shared by the registries, the bus, and the HTTP surface.

use serde::{Deserialize, Serialize};

// ---------------------------------------------------------------------------
// Worker availability
// ---------------------------------------------------------------------------

/// Availability a worker last reported on the status channel.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Availability {
    /// Ready to accept a new job.
    Idle,
    /// Executing a job.
    Busy,
    /// Reachable but refusing work (draining, maintenance, ...).
    Unavailable,
}

impl Availability {
    pub fn as_str(self) -> &'static str {
        match self {
            Availability::Idle => "idle",
            Availability::Busy => "busy",
            Availability::Unavailable => "unavailable",
        }
    }
}

impl std::fmt::Display for Availability {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

// ---------------------------------------------------------------------------
// Command state
// ---------------------------------------------------------------------------

/// Lifecycle of a tracked command.
///
/// `Success` and `Error` are terminal. `TimeoutResponse` is never stored;
/// it is derived when a non-terminal entry is read after going stale.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum CommandState {
    NoCommand,
    WaitingResponse,
    TimeoutResponse,
    Error,
    Success,
}

impl CommandState {
    /// Whether this state can no longer be replaced by a later update.
    pub fn is_terminal(self) -> bool {
        matches!(self, CommandState::Success | CommandState::Error)
    }

    pub fn as_str(self) -> &'static str {
        match self {
            CommandState::NoCommand => "NO_COMMAND",
            CommandState::WaitingResponse => "WAITING_RESPONSE",
            CommandState::TimeoutResponse => "TIMEOUT_RESPONSE",
            CommandState::Error => "ERROR",
            CommandState::Success => "SUCCESS",
        }
    }
}

impl std::fmt::Display for CommandState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

// ---------------------------------------------------------------------------
// Job lifecycle
// ---------------------------------------------------------------------------

/// Lifecycle state of a job as reported by the job-status source.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum JobState {
    NotStarted,
    Executing,
    Finished,
    Failed,
}

impl JobState {
    /// True once a worker has demonstrably picked the job up.
    ///
    /// `Failed` is deliberately excluded: a failure report does not
    /// confirm that the most recent start command was accepted.
    pub fn has_started(self) -> bool {
        matches!(self, JobState::Executing | JobState::Finished)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn only_success_and_error_are_terminal() {
        assert!(CommandState::Success.is_terminal());
        assert!(CommandState::Error.is_terminal());
        assert!(!CommandState::NoCommand.is_terminal());
        assert!(!CommandState::WaitingResponse.is_terminal());
        assert!(!CommandState::TimeoutResponse.is_terminal());
    }

    #[test]
    fn command_state_serializes_screaming_snake_case() {
        let json = serde_json::to_string(&CommandState::WaitingResponse).unwrap();
        assert_eq!(json, "\"WAITING_RESPONSE\"");

        let parsed: CommandState = serde_json::from_str("\"TIMEOUT_RESPONSE\"").unwrap();
        assert_eq!(parsed, CommandState::TimeoutResponse);
    }

    #[test]
    fn command_state_display_matches_wire_name() {
        for state in [
            CommandState::NoCommand,
            CommandState::WaitingResponse,
            CommandState::TimeoutResponse,
            CommandState::Error,
            CommandState::Success,
        ] {
            let wire = serde_json::to_string(&state).unwrap();
            assert_eq!(wire.trim_matches('"'), state.to_string());
        }
    }

    #[test]
    fn availability_serializes_snake_case() {
        assert_eq!(serde_json::to_string(&Availability::Idle).unwrap(), "\"idle\"");
        let parsed: Availability = serde_json::from_str("\"unavailable\"").unwrap();
        assert_eq!(parsed, Availability::Unavailable);
    }

    #[test]
    fn executing_and_finished_count_as_started() {
        assert!(JobState::Executing.has_started());
        assert!(JobState::Finished.has_started());
        assert!(!JobState::NotStarted.has_started());
        assert!(!JobState::Failed.has_started());
    }
}
