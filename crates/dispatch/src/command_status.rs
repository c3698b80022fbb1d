//! In-memory command status bookkeeping.
//!
//! [`CommandStatusRegistry`] owns one [`CommandStatus`] per correlation id.
//! Writers are the coordination tasks and the acknowledgement consumer;
//! readers are [`CommandHandle`](crate::CommandHandle)s and the HTTP
//! surface. `TIMEOUT_RESPONSE` is computed at read time and never stored.

use std::collections::HashMap;
use std::time::Duration;

use chrono::Utc;
use courier_core::dispatch::COMMAND_STATUS_TIMEOUT_SECS;
use courier_core::status::CommandState;
use courier_core::types::{CommandId, JobId, Timestamp, WorkerId};
use serde::Serialize;
use tokio::sync::RwLock;
use tokio::time::Instant;

/// Snapshot of one tracked command.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CommandStatus {
    pub job_id: JobId,
    pub command_id: CommandId,
    pub state: CommandState,
    /// Last non-empty message supplied by a writer.
    pub message: String,
    pub response_code: Option<i32>,
    /// Worker the most recent start command was addressed to.
    pub assigned_worker_id: Option<WorkerId>,
    /// Wall-clock time of the last accepted write.
    pub last_update: Timestamp,
}

/// Errors from the registry API. All of them indicate caller bugs.
#[derive(Debug, thiserror::Error)]
pub enum CommandError {
    #[error("Command {0} is already registered")]
    DuplicateCommand(CommandId),

    #[error("Command {0} is not registered")]
    UnknownCommand(CommandId),

    /// `TIMEOUT_RESPONSE` is derived on read and cannot be written.
    #[error("State {0} cannot be stored directly")]
    DerivedState(CommandState),
}

/// Stored entry: the public snapshot plus a monotonic write instant used
/// for staleness.
struct Entry {
    status: CommandStatus,
    touched: Instant,
}

/// Registry of every outstanding command.
///
/// Thread-safe via interior `RwLock`; designed to be wrapped in `Arc` and
/// shared between the dispatcher, the status ingest, and readers.
pub struct CommandStatusRegistry {
    entries: RwLock<HashMap<CommandId, Entry>>,
    status_timeout: Duration,
}

impl CommandStatusRegistry {
    /// Create an empty registry with the default 30-second status timeout.
    pub fn new() -> Self {
        Self::with_timeout(Duration::from_secs(COMMAND_STATUS_TIMEOUT_SECS))
    }

    /// Create an empty registry with a custom status timeout.
    pub fn with_timeout(status_timeout: Duration) -> Self {
        Self {
            entries: RwLock::new(HashMap::new()),
            status_timeout,
        }
    }

    /// Start tracking `command_id` for `job_id` in state `NO_COMMAND`.
    pub async fn register(
        &self,
        job_id: &str,
        command_id: &str,
    ) -> Result<CommandStatus, CommandError> {
        let mut entries = self.entries.write().await;
        if entries.contains_key(command_id) {
            return Err(CommandError::DuplicateCommand(command_id.to_string()));
        }

        let status = CommandStatus {
            job_id: job_id.to_string(),
            command_id: command_id.to_string(),
            state: CommandState::NoCommand,
            message: String::new(),
            response_code: None,
            assigned_worker_id: None,
            last_update: Utc::now(),
        };
        entries.insert(
            command_id.to_string(),
            Entry {
                status: status.clone(),
                touched: Instant::now(),
            },
        );

        tracing::debug!(job_id, command_id, "Command registered");
        Ok(status)
    }

    /// Merge an update into an existing entry.
    ///
    /// - `last_update` is always refreshed.
    /// - A terminal state (`SUCCESS`/`ERROR`) is never replaced; an update
    ///   carrying a different state leaves state, message, and code as
    ///   they were.
    /// - `response_code` replaces the prior code only when `Some`.
    /// - `message` replaces the prior message only when non-empty.
    ///
    /// Returns the stored snapshot after the merge.
    pub async fn update(
        &self,
        command_id: &str,
        state: CommandState,
        response_code: Option<i32>,
        message: Option<&str>,
    ) -> Result<CommandStatus, CommandError> {
        if state == CommandState::TimeoutResponse {
            return Err(CommandError::DerivedState(state));
        }

        let mut entries = self.entries.write().await;
        let entry = entries
            .get_mut(command_id)
            .ok_or_else(|| CommandError::UnknownCommand(command_id.to_string()))?;

        entry.touched = Instant::now();
        entry.status.last_update = Utc::now();

        let current = entry.status.state;
        if current.is_terminal() && current != state {
            tracing::debug!(
                command_id,
                current = %current,
                rejected = %state,
                "Ignoring update to terminal command",
            );
            return Ok(entry.status.clone());
        }

        entry.status.state = state;
        if let Some(code) = response_code {
            entry.status.response_code = Some(code);
        }
        if let Some(msg) = message.filter(|m| !m.is_empty()) {
            entry.status.message = msg.to_string();
        }

        Ok(entry.status.clone())
    }

    /// Return a snapshot of `command_id`.
    ///
    /// A non-terminal entry not written for longer than the status timeout
    /// is reported as `TIMEOUT_RESPONSE`; the stored entry is untouched.
    pub async fn get(&self, command_id: &str) -> Result<CommandStatus, CommandError> {
        let entries = self.entries.read().await;
        let entry = entries
            .get(command_id)
            .ok_or_else(|| CommandError::UnknownCommand(command_id.to_string()))?;

        let mut snapshot = entry.status.clone();
        if !snapshot.state.is_terminal() && entry.touched.elapsed() > self.status_timeout {
            snapshot.state = CommandState::TimeoutResponse;
        }
        Ok(snapshot)
    }

    /// Record the worker the latest start command went to.
    ///
    /// Informational only: neither `last_update` nor the terminal latch is
    /// affected.
    pub async fn assign(&self, command_id: &str, worker_id: &str) -> Result<(), CommandError> {
        let mut entries = self.entries.write().await;
        let entry = entries
            .get_mut(command_id)
            .ok_or_else(|| CommandError::UnknownCommand(command_id.to_string()))?;
        entry.status.assigned_worker_id = Some(worker_id.to_string());
        Ok(())
    }

    /// Stop tracking `command_id`, returning its last stored snapshot.
    pub async fn remove(&self, command_id: &str) -> Option<CommandStatus> {
        self.entries
            .write()
            .await
            .remove(command_id)
            .map(|entry| entry.status)
    }

    /// Drop every entry not written for longer than `retention`.
    ///
    /// `retention` must exceed the dispatch deadline, otherwise a running
    /// coordination task can lose its entry. Returns the number removed.
    pub async fn prune_older_than(&self, retention: Duration) -> usize {
        let mut entries = self.entries.write().await;
        let before = entries.len();
        entries.retain(|_, entry| entry.touched.elapsed() <= retention);
        before - entries.len()
    }

    /// Number of tracked commands.
    pub async fn len(&self) -> usize {
        self.entries.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.entries.read().await.is_empty()
    }
}

impl Default for CommandStatusRegistry {
    fn default() -> Self {
        Self::new()
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
