//! Status-channel consumer.
//!
//! [`StatusIngest`] subscribes to the bus status channel and routes each
//! [`StatusEvent`] to the registry that owns it:
//!
//! - `worker_status` -> [`WorkerRegistry::apply_status`]
//! - `command_ack`   -> [`CommandStatusRegistry::update`]
//! - `job_report`    -> [`JobTracker::record`]
//!
//! Runs as a long-lived background task until cancelled or until the bus is
//! dropped.

use std::sync::Arc;

use courier_events::StatusEvent;
use tokio::sync::broadcast;
use tokio_util::sync::CancellationToken;

use crate::command_status::{CommandError, CommandStatusRegistry};
use crate::source::JobTracker;
use crate::worker_registry::WorkerRegistry;

/// Applies status events to the worker, command and job registries.
#[derive(Clone)]
pub struct StatusIngest {
    workers: Arc<WorkerRegistry>,
    commands: Arc<CommandStatusRegistry>,
    jobs: Arc<JobTracker>,
}

impl StatusIngest {
    pub fn new(
        workers: Arc<WorkerRegistry>,
        commands: Arc<CommandStatusRegistry>,
        jobs: Arc<JobTracker>,
    ) -> Self {
        Self {
            workers,
            commands,
            jobs,
        }
    }

    /// Apply a single event.
    ///
    /// Acknowledgements for unknown commands and attempts to write a derived
    /// state are logged and dropped; they never stop the consumer.
    pub async fn apply(&self, event: StatusEvent) {
        match event {
            StatusEvent::WorkerStatus(status) => {
                self.workers
                    .apply_status(&status.worker_id, status.availability)
                    .await;
            }
            StatusEvent::CommandAck(ack) => {
                let result = self
                    .commands
                    .update(
                        &ack.command_id,
                        ack.state,
                        ack.response_code,
                        ack.message.as_deref(),
                    )
                    .await;
                match result {
                    Ok(status) => {
                        tracing::debug!(
                            command_id = %ack.command_id,
                            state = %status.state,
                            "Command acknowledgement applied",
                        );
                    }
                    Err(CommandError::UnknownCommand(id)) => {
                        tracing::warn!(command_id = %id, "Acknowledgement for unknown command ignored");
                    }
                    Err(e) => {
                        tracing::warn!(
                            command_id = %ack.command_id,
                            error = %e,
                            "Acknowledgement rejected",
                        );
                    }
                }
            }
            StatusEvent::JobReport(report) => {
                self.jobs.record(report).await;
            }
        }
    }

    /// Consume `receiver` until `cancel` fires or the channel closes.
    pub async fn run(
        self,
        mut receiver: broadcast::Receiver<StatusEvent>,
        cancel: CancellationToken,
    ) {
        tracing::info!("Status ingest started");
        loop {
            let received = tokio::select! {
                _ = cancel.cancelled() => {
                    tracing::info!("Status ingest cancelled");
                    break;
                }
                received = receiver.recv() => received,
            };

            match received {
                Ok(event) => self.apply(event).await,
                Err(broadcast::error::RecvError::Lagged(n)) => {
                    tracing::warn!(
                        skipped = n,
                        "Status ingest lagged, some status events were dropped",
                    );
                }
                Err(broadcast::error::RecvError::Closed) => {
                    tracing::info!("Status channel closed, ingest shutting down");
                    break;
                }
            }
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use courier_core::status::{Availability, CommandState, JobState};
    use courier_events::{CommandAck, EventBus};

    use super::*;

    fn ingest() -> (StatusIngest, Arc<WorkerRegistry>, Arc<CommandStatusRegistry>, Arc<JobTracker>) {
        let workers = Arc::new(WorkerRegistry::new());
        let commands = Arc::new(CommandStatusRegistry::new());
        let jobs = Arc::new(JobTracker::new());
        let ingest = StatusIngest::new(
            Arc::clone(&workers),
            Arc::clone(&commands),
            Arc::clone(&jobs),
        );
        (ingest, workers, commands, jobs)
    }

    #[tokio::test]
    async fn worker_status_reaches_worker_registry() {
        let (ingest, workers, _, _) = ingest();
        ingest
            .apply(StatusEvent::worker_status("w-1", Availability::Idle))
            .await;
        assert_eq!(
            workers.get("w-1").await.unwrap().availability,
            Availability::Idle
        );
    }

    #[tokio::test]
    async fn command_ack_updates_known_command() {
        let (ingest, _, commands, _) = ingest();
        commands.register("job-1", "job-1").await.unwrap();

        ingest
            .apply(StatusEvent::CommandAck(CommandAck {
                command_id: "job-1".into(),
                state: CommandState::Error,
                response_code: Some(500),
                message: Some("boom".into()),
            }))
            .await;

        let status = commands.get("job-1").await.unwrap();
        assert_eq!(status.state, CommandState::Error);
        assert_eq!(status.response_code, Some(500));
        assert_eq!(status.message, "boom");
    }

    #[tokio::test]
    async fn ack_for_unknown_command_is_dropped() {
        let (ingest, _, commands, _) = ingest();
        ingest
            .apply(StatusEvent::CommandAck(CommandAck {
                command_id: "ghost".into(),
                state: CommandState::Success,
                response_code: None,
                message: None,
            }))
            .await;
        assert!(commands.is_empty().await);
    }

    #[tokio::test]
    async fn job_report_reaches_tracker() {
        let (ingest, _, _, jobs) = ingest();
        ingest
            .apply(StatusEvent::job_report("job-9", JobState::Executing))
            .await;
        assert_eq!(jobs.state_of("job-9").await, Some(JobState::Executing));
    }

    #[tokio::test]
    async fn run_consumes_bus_until_cancelled() {
        let (ingest, workers, _, _) = ingest();
        let bus = EventBus::default();
        let cancel = CancellationToken::new();
        let task = tokio::spawn(ingest.run(bus.subscribe_status(), cancel.clone()));

        bus.publish_status(StatusEvent::worker_status("w-7", Availability::Busy));

        let mut seen = false;
        for _ in 0..50 {
            if workers.get("w-7").await.is_some() {
                seen = true;
                break;
            }
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
        assert!(seen, "ingest should have applied the worker status");

        cancel.cancel();
        task.await.unwrap();
    }

    #[tokio::test]
    async fn run_exits_when_bus_dropped() {
        let (ingest, _, _, _) = ingest();
        let bus = EventBus::default();
        let receiver = bus.subscribe_status();
        drop(bus);

        ingest.run(receiver, CancellationToken::new()).await;
    }
}
