//! Job dispatcher: one coordination task per submitted job.
//!
//! [`JobDispatcher::try_start_job`] registers the job's command, spawns a
//! coordination task, and returns a [`CommandHandle`] straight away. The
//! task alternates between two phases until the job is seen running, the
//! overall deadline passes, or [`JobDispatcher::stop_all`] is called:
//!
//! ```text
//!   AWAITING_SEND --(idle worker picked, command published)--> AWAITING_ACK
//!   AWAITING_ACK  --(send timeout elapsed)-------------------> AWAITING_SEND
//!   AWAITING_ACK  --(job-status source: executing/finished)--> done (SUCCESS)
//! ```
//!
//! A dispatch that runs out of time writes nothing; the command simply
//! never reaches `SUCCESS` and eventually reads as `TIMEOUT_RESPONSE`.

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use courier_core::dispatch::validate_identifier;
use courier_core::error::CoreError;
use courier_core::status::CommandState;
use courier_core::types::{CommandId, JobId, WorkerId};
use courier_events::CommandMessage;
use serde::{Deserialize, Serialize};
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;
use tokio_util::task::TaskTracker;

use crate::command_status::{CommandError, CommandStatusRegistry};
use crate::config::DispatchConfig;
use crate::handle::CommandHandle;
use crate::source::{CommandPublisher, JobStatusSource};
use crate::worker_registry::{choose_worker, WorkerRegistry};

// ---------------------------------------------------------------------------
// Job
// ---------------------------------------------------------------------------

/// A unit of work submitted for dispatch.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Job {
    pub job_id: JobId,
    /// Worker the most recent start command was addressed to.
    #[serde(default)]
    pub assigned_worker_id: Option<WorkerId>,
    /// Opaque parameters forwarded to the worker.
    #[serde(default)]
    pub payload: serde_json::Value,
}

impl Job {
    pub fn new(job_id: impl Into<JobId>, payload: serde_json::Value) -> Self {
        Self {
            job_id: job_id.into(),
            assigned_worker_id: None,
            payload,
        }
    }
}

/// Errors returned synchronously by [`JobDispatcher::try_start_job`].
#[derive(Debug, thiserror::Error)]
pub enum DispatchError {
    #[error(transparent)]
    Command(#[from] CommandError),

    #[error(transparent)]
    InvalidJob(#[from] CoreError),

    #[error("Dispatcher has been stopped")]
    Stopped,
}

// ---------------------------------------------------------------------------
// JobDispatcher
// ---------------------------------------------------------------------------

/// Orchestrates dispatch of jobs to idle workers.
///
/// Created once at startup with its collaborators injected; share it via
/// `Arc<JobDispatcher>`.
pub struct JobDispatcher {
    commands: Arc<CommandStatusRegistry>,
    workers: Arc<WorkerRegistry>,
    publisher: Arc<dyn CommandPublisher>,
    job_source: Arc<dyn JobStatusSource>,
    config: DispatchConfig,
    /// Shared cancellation signal observed by every coordination task.
    cancel: CancellationToken,
    tasks: TaskTracker,
}

impl JobDispatcher {
    pub fn new(
        commands: Arc<CommandStatusRegistry>,
        workers: Arc<WorkerRegistry>,
        publisher: Arc<dyn CommandPublisher>,
        job_source: Arc<dyn JobStatusSource>,
        config: DispatchConfig,
    ) -> Self {
        Self {
            commands,
            workers,
            publisher,
            job_source,
            config,
            cancel: CancellationToken::new(),
            tasks: TaskTracker::new(),
        }
    }

    /// Register `job` and start dispatching it in the background.
    ///
    /// The job id doubles as the command's correlation id. Returns without
    /// waiting for any worker interaction.
    pub async fn try_start_job(&self, job: Job) -> Result<CommandHandle, DispatchError> {
        if self.cancel.is_cancelled() {
            return Err(DispatchError::Stopped);
        }
        validate_identifier("Job id", &job.job_id)?;

        let command_id: CommandId = job.job_id.clone();
        self.commands.register(&job.job_id, &command_id).await?;

        let coordinator = Coordinator {
            command_id: command_id.clone(),
            commands: Arc::clone(&self.commands),
            workers: Arc::clone(&self.workers),
            publisher: Arc::clone(&self.publisher),
            job_source: Arc::clone(&self.job_source),
            config: self.config.clone(),
            cancel: self.cancel.clone(),
        };

        self.tasks.spawn(async move {
            let job_id = job.job_id.clone();
            let outcome = coordinator.run(job).await;
            outcome.log(&job_id);
        });

        tracing::info!(
            job_id = %command_id,
            in_flight = self.tasks.len(),
            "Job accepted for dispatch",
        );

        Ok(self.handle(command_id))
    }

    /// Handle for an already registered command.
    pub fn handle(&self, command_id: impl Into<CommandId>) -> CommandHandle {
        CommandHandle::new(command_id.into(), Arc::clone(&self.commands))
    }

    pub fn commands(&self) -> &Arc<CommandStatusRegistry> {
        &self.commands
    }

    pub fn workers(&self) -> &Arc<WorkerRegistry> {
        &self.workers
    }

    /// Number of coordination tasks that have not exited yet.
    pub fn in_flight(&self) -> usize {
        self.tasks.len()
    }

    pub fn is_stopped(&self) -> bool {
        self.cancel.is_cancelled()
    }

    /// Signal every coordination task to stop and wait until all have
    /// exited. Safe to call more than once.
    pub async fn stop_all(&self) {
        if !self.cancel.is_cancelled() {
            tracing::info!(in_flight = self.tasks.len(), "Stopping job dispatcher");
        }
        self.cancel.cancel();
        self.tasks.close();
        self.tasks.wait().await;
        tracing::debug!("All coordination tasks exited");
    }
}

// ---------------------------------------------------------------------------
// Coordination task
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Phase {
    AwaitingSend,
    AwaitingAck,
}

/// Running state of one coordination task.
#[derive(Debug)]
struct DispatchAttempt {
    phase: Phase,
    last_send_time: Option<Instant>,
    deadline: Instant,
    sends: u32,
}

impl DispatchAttempt {
    fn new(deadline: Instant) -> Self {
        Self {
            phase: Phase::AwaitingSend,
            last_send_time: None,
            deadline,
            sends: 0,
        }
    }

    fn record_send(&mut self, at: Instant) {
        self.phase = Phase::AwaitingAck;
        self.last_send_time = Some(at);
        self.sends += 1;
    }

    fn send_expired(&self, now: Instant, send_timeout: Duration) -> bool {
        self.last_send_time
            .is_some_and(|sent| now.saturating_duration_since(sent) >= send_timeout)
    }
}

#[derive(Debug, PartialEq, Eq)]
enum DispatchOutcome {
    Started { worker_id: WorkerId, sends: u32 },
    DeadlineExceeded { sends: u32 },
    Cancelled { sends: u32 },
}

impl DispatchOutcome {
    fn log(&self, job_id: &str) {
        match self {
            DispatchOutcome::Started { worker_id, sends } => {
                tracing::info!(job_id, worker_id = %worker_id, sends, "Job started");
            }
            DispatchOutcome::DeadlineExceeded { sends } => {
                tracing::warn!(job_id, sends, "Dispatch deadline exceeded without the job starting");
            }
            DispatchOutcome::Cancelled { sends } => {
                tracing::info!(job_id, sends, "Dispatch cancelled");
            }
        }
    }
}

/// Everything one coordination task needs, cloned out of the dispatcher.
struct Coordinator {
    command_id: CommandId,
    commands: Arc<CommandStatusRegistry>,
    workers: Arc<WorkerRegistry>,
    publisher: Arc<dyn CommandPublisher>,
    job_source: Arc<dyn JobStatusSource>,
    config: DispatchConfig,
    cancel: CancellationToken,
}

impl Coordinator {
    async fn run(self, mut job: Job) -> DispatchOutcome {
        let mut attempt = DispatchAttempt::new(Instant::now() + self.config.start_job_timeout);

        while Instant::now() < attempt.deadline {
            if self.cancel.is_cancelled() {
                return DispatchOutcome::Cancelled {
                    sends: attempt.sends,
                };
            }

            match attempt.phase {
                Phase::AwaitingSend => self.send(&mut job, &mut attempt).await,
                Phase::AwaitingAck => {
                    if self.job_has_started(&job.job_id).await {
                        let worker_id = job.assigned_worker_id.clone().unwrap_or_default();
                        self.record_success(&worker_id).await;
                        return DispatchOutcome::Started {
                            worker_id,
                            sends: attempt.sends,
                        };
                    }
                    if attempt.send_expired(Instant::now(), self.config.send_job_timeout) {
                        tracing::info!(
                            job_id = %job.job_id,
                            worker_id = ?job.assigned_worker_id,
                            attempt = attempt.sends,
                            "No acknowledgement within send timeout, selecting a worker again",
                        );
                        attempt.phase = Phase::AwaitingSend;
                    }
                }
            }

            tokio::select! {
                _ = self.cancel.cancelled() => {
                    return DispatchOutcome::Cancelled { sends: attempt.sends };
                }
                _ = tokio::time::sleep(self.config.poll_interval) => {}
            }
        }

        if self.cancel.is_cancelled() {
            DispatchOutcome::Cancelled {
                sends: attempt.sends,
            }
        } else {
            DispatchOutcome::DeadlineExceeded {
                sends: attempt.sends,
            }
        }
    }

    /// AWAITING_SEND: pick an idle worker and publish the start command.
    ///
    /// Stays in AWAITING_SEND when nobody is idle or the publish fails.
    async fn send(&self, job: &mut Job, attempt: &mut DispatchAttempt) {
        let idle = self.workers.list_idle().await;
        let Some(worker) = choose_worker(&idle) else {
            tracing::debug!(job_id = %job.job_id, "No idle worker available, will retry");
            return;
        };
        let worker_id = worker.worker_id.clone();

        job.assigned_worker_id = Some(worker_id.clone());
        let command = CommandMessage::new(job.job_id.clone(), worker_id.clone(), job.payload.clone());

        match self.cancellable(self.publisher.publish_command(command)).await {
            None => {}
            Some(Err(e)) => {
                tracing::warn!(
                    job_id = %job.job_id,
                    worker_id = %worker_id,
                    error = %e,
                    "Failed to publish start command, will retry",
                );
            }
            Some(Ok(())) => {
                attempt.record_send(Instant::now());
                tracing::info!(
                    job_id = %job.job_id,
                    worker_id = %worker_id,
                    attempt = attempt.sends,
                    "Start command sent",
                );

                if let Err(e) = self.commands.assign(&self.command_id, &worker_id).await {
                    tracing::error!(command_id = %self.command_id, error = %e, "Failed to record assignee");
                }
                let message = format!("Start command sent to worker {worker_id}");
                if let Err(e) = self
                    .commands
                    .update(
                        &self.command_id,
                        CommandState::WaitingResponse,
                        None,
                        Some(&message),
                    )
                    .await
                {
                    tracing::error!(command_id = %self.command_id, error = %e, "Failed to record send");
                }
            }
        }
    }

    /// AWAITING_ACK: ask the job-status source whether the job is running.
    ///
    /// Source failures count as "not yet" and are retried next iteration.
    async fn job_has_started(&self, job_id: &str) -> bool {
        match self.cancellable(self.job_source.list_jobs()).await {
            Some(Ok(reports)) => reports
                .iter()
                .any(|report| report.job_id == job_id && report.state.has_started()),
            Some(Err(e)) => {
                tracing::warn!(job_id, error = %e, "Job-status query failed, will retry");
                false
            }
            None => false,
        }
    }

    async fn record_success(&self, worker_id: &str) {
        let message = format!("Job started on worker {worker_id}");
        match self
            .commands
            .update(&self.command_id, CommandState::Success, None, Some(&message))
            .await
        {
            Ok(status) if status.state != CommandState::Success => {
                tracing::debug!(
                    command_id = %self.command_id,
                    state = %status.state,
                    "Command already settled by an acknowledgement",
                );
            }
            Ok(_) => {}
            Err(e) => {
                tracing::error!(command_id = %self.command_id, error = %e, "Failed to record success");
            }
        }
    }

    /// Await `fut` unless the shared cancellation signal fires first.
    async fn cancellable<F: Future>(&self, fut: F) -> Option<F::Output> {
        tokio::select! {
            biased;
            _ = self.cancel.cancelled() => None,
            out = fut => Some(out),
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test(start_paused = true)]
    async fn attempt_starts_awaiting_send() {
        let attempt = DispatchAttempt::new(Instant::now() + Duration::from_secs(30));
        assert_eq!(attempt.phase, Phase::AwaitingSend);
        assert_eq!(attempt.sends, 0);
        assert!(!attempt.send_expired(Instant::now(), Duration::from_secs(10)));
    }

    #[tokio::test(start_paused = true)]
    async fn send_expires_exactly_at_timeout() {
        let mut attempt = DispatchAttempt::new(Instant::now() + Duration::from_secs(30));
        let sent = Instant::now();
        attempt.record_send(sent);
        assert_eq!(attempt.phase, Phase::AwaitingAck);
        assert_eq!(attempt.sends, 1);

        let timeout = Duration::from_secs(10);
        assert!(!attempt.send_expired(sent + Duration::from_secs(9), timeout));
        assert!(attempt.send_expired(sent + timeout, timeout));
        assert!(attempt.send_expired(sent + Duration::from_secs(11), timeout));
    }

    #[test]
    fn job_deserializes_with_defaults() {
        let job: Job = serde_json::from_str(r#"{"job_id":"render-1"}"#).unwrap();
        assert_eq!(job.job_id, "render-1");
        assert!(job.assigned_worker_id.is_none());
        assert!(job.payload.is_null());
    }

    #[test]
    fn outcome_equality_distinguishes_variants() {
        assert_ne!(
            DispatchOutcome::DeadlineExceeded { sends: 3 },
            DispatchOutcome::Cancelled { sends: 3 }
        );
    }
}
