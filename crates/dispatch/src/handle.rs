//! Caller-facing view of a dispatched command.

use std::sync::Arc;

use courier_core::types::CommandId;

use crate::command_status::{CommandError, CommandStatus, CommandStatusRegistry};

/// Read-only view of one command's status.
///
/// Returned by [`JobDispatcher::try_start_job`](crate::JobDispatcher::try_start_job)
/// before dispatch has made any progress. Cheap to clone; callers poll
/// [`status`](Self::status) at their own pace.
#[derive(Clone)]
pub struct CommandHandle {
    command_id: CommandId,
    registry: Arc<CommandStatusRegistry>,
}

impl CommandHandle {
    pub fn new(command_id: CommandId, registry: Arc<CommandStatusRegistry>) -> Self {
        Self {
            command_id,
            registry,
        }
    }

    pub fn command_id(&self) -> &str {
        &self.command_id
    }

    /// Current snapshot, including a derived `TIMEOUT_RESPONSE` when stale.
    pub async fn status(&self) -> Result<CommandStatus, CommandError> {
        self.registry.get(&self.command_id).await
    }
}

impl std::fmt::Debug for CommandHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CommandHandle")
            .field("command_id", &self.command_id)
            .finish()
    }
}
