//! Wire messages carried by the command and status channels.
//!
//! Worker-originated messages use the shape `{"type": "<kind>", "data": {...}}`
//! and are deserialized into a strongly-typed [`StatusEvent`] enum.

use chrono::Utc;
use courier_core::status::{Availability, CommandState, JobState};
use courier_core::types::{CommandId, JobId, Timestamp, WorkerId};
use serde::{Deserialize, Serialize};

// ---------------------------------------------------------------------------
// Command channel
// ---------------------------------------------------------------------------

/// Start command published by the dispatcher and consumed by workers.
///
/// Only the addressed worker should act on it. Delivery is at-least-once,
/// so workers must treat a repeated start for the same `job_id` as a no-op.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CommandMessage {
    pub job_id: JobId,
    pub assigned_worker_id: WorkerId,
    /// Opaque job parameters, forwarded untouched.
    pub payload: serde_json::Value,
    /// When the dispatcher published this command (UTC).
    pub sent_at: Timestamp,
}

impl CommandMessage {
    pub fn new(job_id: JobId, assigned_worker_id: WorkerId, payload: serde_json::Value) -> Self {
        Self {
            job_id,
            assigned_worker_id,
            payload,
            sent_at: Utc::now(),
        }
    }

    /// Whether this command is addressed to `worker_id`.
    pub fn is_for(&self, worker_id: &str) -> bool {
        self.assigned_worker_id == worker_id
    }
}

// ---------------------------------------------------------------------------
// Status channel
// ---------------------------------------------------------------------------

/// All messages a worker may publish on the status channel.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", content = "data", rename_all = "snake_case")]
pub enum StatusEvent {
    /// Periodic availability report.
    WorkerStatus(WorkerStatus),

    /// Explicit acknowledgement of a command.
    CommandAck(CommandAck),

    /// Lifecycle report for a job the worker has been handed.
    JobReport(JobReport),
}

/// Payload for `worker_status` messages.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WorkerStatus {
    pub worker_id: WorkerId,
    pub availability: Availability,
}

/// Payload for `command_ack` messages.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CommandAck {
    pub command_id: CommandId,
    pub state: CommandState,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub response_code: Option<i32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

/// Payload for `job_report` messages; also the row type returned by a
/// job-status source.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct JobReport {
    pub job_id: JobId,
    pub state: JobState,
}

impl StatusEvent {
    /// Shorthand for an availability report.
    pub fn worker_status(worker_id: impl Into<WorkerId>, availability: Availability) -> Self {
        StatusEvent::WorkerStatus(WorkerStatus {
            worker_id: worker_id.into(),
            availability,
        })
    }

    /// Shorthand for a job lifecycle report.
    pub fn job_report(job_id: impl Into<JobId>, state: JobState) -> Self {
        StatusEvent::JobReport(JobReport {
            job_id: job_id.into(),
            state,
        })
    }

    /// Message kind as it appears in the `type` field.
    pub fn kind(&self) -> &'static str {
        match self {
            StatusEvent::WorkerStatus(_) => "worker_status",
            StatusEvent::CommandAck(_) => "command_ack",
            StatusEvent::JobReport(_) => "job_report",
        }
    }
}

/// Parse a worker text frame into a typed status event.
///
/// Returns `Err` for malformed JSON or unknown `type` values.
/// Callers should log and continue.
pub fn parse_status_event(text: &str) -> Result<StatusEvent, serde_json::Error> {
    serde_json::from_str(text)
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_worker_status() {
        let raw = r#"{"type":"worker_status","data":{"worker_id":"w-1","availability":"idle"}}"#;
        let event = parse_status_event(raw).unwrap();
        assert_eq!(event, StatusEvent::worker_status("w-1", Availability::Idle));
        assert_eq!(event.kind(), "worker_status");
    }

    #[test]
    fn parse_command_ack_with_optional_fields_missing() {
        let raw = r#"{"type":"command_ack","data":{"command_id":"job-9","state":"SUCCESS"}}"#;
        match parse_status_event(raw).unwrap() {
            StatusEvent::CommandAck(ack) => {
                assert_eq!(ack.command_id, "job-9");
                assert_eq!(ack.state, CommandState::Success);
                assert!(ack.response_code.is_none());
                assert!(ack.message.is_none());
            }
            other => panic!("expected command_ack, got {other:?}"),
        }
    }

    #[test]
    fn parse_command_ack_with_all_fields() {
        let raw = r#"{"type":"command_ack","data":{"command_id":"c","state":"ERROR","response_code":-3,"message":"disk full"}}"#;
        match parse_status_event(raw).unwrap() {
            StatusEvent::CommandAck(ack) => {
                assert_eq!(ack.state, CommandState::Error);
                assert_eq!(ack.response_code, Some(-3));
                assert_eq!(ack.message.as_deref(), Some("disk full"));
            }
            other => panic!("expected command_ack, got {other:?}"),
        }
    }

    #[test]
    fn parse_job_report() {
        let raw = r#"{"type":"job_report","data":{"job_id":"j","state":"executing"}}"#;
        assert_eq!(
            parse_status_event(raw).unwrap(),
            StatusEvent::job_report("j", JobState::Executing)
        );
    }

    #[test]
    fn unknown_type_is_an_error() {
        let raw = r#"{"type":"reboot","data":{}}"#;
        assert!(parse_status_event(raw).is_err());
    }

    #[test]
    fn malformed_json_is_an_error() {
        assert!(parse_status_event("not json").is_err());
    }

    #[test]
    fn command_message_serializes_addressing_fields() {
        let cmd = CommandMessage::new(
            "job-1".into(),
            "w-2".into(),
            serde_json::json!({"frames": 24}),
        );
        let json = serde_json::to_value(&cmd).unwrap();
        assert_eq!(json["job_id"], "job-1");
        assert_eq!(json["assigned_worker_id"], "w-2");
        assert_eq!(json["payload"]["frames"], 24);
        assert!(json["sent_at"].is_string());
    }

    #[test]
    fn command_message_addressing() {
        let cmd = CommandMessage::new("j".into(), "w-2".into(), serde_json::Value::Null);
        assert!(cmd.is_for("w-2"));
        assert!(!cmd.is_for("w-3"));
    }
}
