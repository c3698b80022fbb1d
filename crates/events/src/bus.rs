//! In-process message bus backed by `tokio::sync::broadcast` channels.
//!
//! [`EventBus`] carries two independent channels:
//!
//! - the **command channel**, on which the dispatcher publishes
//!   [`CommandMessage`]s addressed to individual workers;
//! - the **status channel**, on which workers publish [`StatusEvent`]s
//!   (availability, acknowledgements, job lifecycle reports).
//!
//! It is designed to be shared via `Arc<EventBus>` across the application.

use tokio::sync::broadcast;

use crate::messages::{CommandMessage, StatusEvent};

/// Default buffer capacity for each broadcast channel.
const DEFAULT_CAPACITY: usize = 1024;

// ---------------------------------------------------------------------------
// BusError
// ---------------------------------------------------------------------------

/// Errors surfaced by bus transports.
///
/// The in-process [`EventBus`] never fails to publish; these variants
/// exist for transports that cross a process boundary (e.g. the worker
/// WebSocket bridge).
#[derive(Debug, thiserror::Error)]
pub enum BusError {
    /// The transport is not reachable right now.
    #[error("Message bus unavailable: {0}")]
    Unavailable(String),

    /// A message could not be encoded for the wire.
    #[error("Failed to encode bus message: {0}")]
    Encode(#[from] serde_json::Error),
}

// ---------------------------------------------------------------------------
// EventBus
// ---------------------------------------------------------------------------

/// In-process fan-out bus with a command channel and a status channel.
///
/// # Usage
///
/// ```rust
/// use courier_core::status::Availability;
/// use courier_events::{EventBus, StatusEvent};
///
/// let bus = EventBus::default();
/// let _rx = bus.subscribe_status();
///
/// bus.publish_status(StatusEvent::worker_status("w-1", Availability::Idle));
/// ```
pub struct EventBus {
    commands: broadcast::Sender<CommandMessage>,
    status: broadcast::Sender<StatusEvent>,
}

impl EventBus {
    /// Create a bus with a specific capacity for each channel.
    ///
    /// When a buffer is full, the oldest un-consumed messages are dropped
    /// and slow receivers will observe a `RecvError::Lagged`.
    pub fn new(capacity: usize) -> Self {
        let (commands, _) = broadcast::channel(capacity);
        let (status, _) = broadcast::channel(capacity);
        Self { commands, status }
    }

    /// Publish a start command to every command-channel subscriber.
    ///
    /// Returns the number of subscribers that received it. With zero
    /// subscribers the command is dropped; the dispatcher's re-send path
    /// covers that case.
    pub fn publish_command(&self, command: CommandMessage) -> usize {
        match self.commands.send(command) {
            Ok(receivers) => receivers,
            Err(broadcast::error::SendError(command)) => {
                tracing::trace!(
                    job_id = %command.job_id,
                    worker_id = %command.assigned_worker_id,
                    "No command subscribers, command dropped",
                );
                0
            }
        }
    }

    /// Publish a worker-originated event to every status subscriber.
    ///
    /// If there are no active subscribers the event is silently dropped.
    pub fn publish_status(&self, event: StatusEvent) -> usize {
        match self.status.send(event) {
            Ok(receivers) => receivers,
            Err(broadcast::error::SendError(event)) => {
                tracing::trace!(kind = event.kind(), "No status subscribers, event dropped");
                0
            }
        }
    }

    /// Subscribe to every command published from now on.
    pub fn subscribe_commands(&self) -> broadcast::Receiver<CommandMessage> {
        self.commands.subscribe()
    }

    /// Subscribe to every status event published from now on.
    pub fn subscribe_status(&self) -> broadcast::Receiver<StatusEvent> {
        self.status.subscribe()
    }

    /// Number of live command-channel subscribers (connected workers).
    pub fn command_subscriber_count(&self) -> usize {
        self.commands.receiver_count()
    }
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new(DEFAULT_CAPACITY)
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use courier_core::status::{Availability, JobState};

    use super::*;

    #[tokio::test]
    async fn command_reaches_single_subscriber() {
        let bus = EventBus::default();
        let mut rx = bus.subscribe_commands();

        let delivered = bus.publish_command(CommandMessage::new(
            "job-1".into(),
            "w-1".into(),
            serde_json::json!({"key": "value"}),
        ));
        assert_eq!(delivered, 1);

        let received = rx.recv().await.expect("should receive the command");
        assert_eq!(received.job_id, "job-1");
        assert_eq!(received.assigned_worker_id, "w-1");
        assert_eq!(received.payload["key"], "value");
    }

    #[tokio::test]
    async fn status_fans_out_to_all_subscribers() {
        let bus = EventBus::default();
        let mut rx1 = bus.subscribe_status();
        let mut rx2 = bus.subscribe_status();

        bus.publish_status(StatusEvent::job_report("job-1", JobState::Executing));

        let e1 = rx1.recv().await.expect("subscriber 1 should receive");
        let e2 = rx2.recv().await.expect("subscriber 2 should receive");
        assert_eq!(e1, e2);
        assert_eq!(e1.kind(), "job_report");
    }

    #[tokio::test]
    async fn channels_are_independent() {
        let bus = EventBus::default();
        let mut commands = bus.subscribe_commands();

        bus.publish_status(StatusEvent::worker_status("w-1", Availability::Busy));

        assert!(matches!(
            commands.try_recv(),
            Err(broadcast::error::TryRecvError::Empty)
        ));
    }

    #[test]
    fn publish_with_no_subscribers_does_not_panic() {
        let bus = EventBus::default();
        // No subscribers: both publishes must be silent drops.
        let sent = bus.publish_command(CommandMessage::new(
            "orphan".into(),
            "w-0".into(),
            serde_json::Value::Null,
        ));
        assert_eq!(sent, 0);
        assert_eq!(
            bus.publish_status(StatusEvent::worker_status("w-0", Availability::Idle)),
            0
        );
    }

    #[test]
    fn subscriber_count_tracks_receivers() {
        let bus = EventBus::default();
        assert_eq!(bus.command_subscriber_count(), 0);
        let rx = bus.subscribe_commands();
        assert_eq!(bus.command_subscriber_count(), 1);
        drop(rx);
        assert_eq!(bus.command_subscriber_count(), 0);
    }
}
