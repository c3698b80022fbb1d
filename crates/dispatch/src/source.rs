//! Boundaries to the external collaborators: the command channel the
//! dispatcher publishes on, and the job-status source it polls.

use std::collections::HashMap;
use std::time::Duration;

use async_trait::async_trait;
use courier_core::status::JobState;
use courier_core::types::JobId;
use courier_events::{BusError, CommandMessage, EventBus, JobReport};
use tokio::sync::RwLock;
use tokio::time::Instant;

// ---------------------------------------------------------------------------
// Traits
// ---------------------------------------------------------------------------

/// Publishes start commands on the command channel.
#[async_trait]
pub trait CommandPublisher: Send + Sync {
    async fn publish_command(&self, command: CommandMessage) -> Result<(), BusError>;
}

/// Reports the lifecycle state of jobs handed to workers.
#[async_trait]
pub trait JobStatusSource: Send + Sync {
    async fn list_jobs(&self) -> Result<Vec<JobReport>, SourceError>;
}

/// Errors from a job-status source. Always treated as transient.
#[derive(Debug, thiserror::Error)]
pub enum SourceError {
    #[error("Job-status source unavailable: {0}")]
    Unavailable(String),
}

#[async_trait]
impl CommandPublisher for EventBus {
    async fn publish_command(&self, command: CommandMessage) -> Result<(), BusError> {
        let receivers = EventBus::publish_command(self, command);
        tracing::trace!(receivers, "Command published on in-process bus");
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// JobTracker
// ---------------------------------------------------------------------------

/// Bus-backed job-status source.
///
/// Holds the latest [`JobState`] reported per job through `job_report`
/// events; [`StatusIngest`](crate::StatusIngest) feeds it.
pub struct JobTracker {
    jobs: RwLock<HashMap<JobId, Reported>>,
}

struct Reported {
    state: JobState,
    at: Instant,
}

impl JobTracker {
    pub fn new() -> Self {
        Self {
            jobs: RwLock::new(HashMap::new()),
        }
    }

    /// Record the latest reported state for a job. Later reports win.
    pub async fn record(&self, report: JobReport) {
        let previous = self.jobs.write().await.insert(
            report.job_id.clone(),
            Reported {
                state: report.state,
                at: Instant::now(),
            },
        );
        if previous.map(|p| p.state) != Some(report.state) {
            tracing::debug!(
                job_id = %report.job_id,
                state = ?report.state,
                "Job state reported",
            );
        }
    }

    pub async fn state_of(&self, job_id: &str) -> Option<JobState> {
        self.jobs.read().await.get(job_id).map(|r| r.state)
    }

    pub async fn remove(&self, job_id: &str) -> Option<JobState> {
        self.jobs.write().await.remove(job_id).map(|r| r.state)
    }

    /// Forget jobs whose last report is older than `retention`.
    pub async fn prune_older_than(&self, retention: Duration) -> usize {
        let mut jobs = self.jobs.write().await;
        let before = jobs.len();
        jobs.retain(|_, reported| reported.at.elapsed() <= retention);
        before - jobs.len()
    }

    pub async fn len(&self) -> usize {
        self.jobs.read().await.len()
    }
}

impl Default for JobTracker {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl JobStatusSource for JobTracker {
    async fn list_jobs(&self) -> Result<Vec<JobReport>, SourceError> {
        Ok(self
            .jobs
            .read()
            .await
            .iter()
            .map(|(job_id, reported)| JobReport {
                job_id: job_id.clone(),
                state: reported.state,
            })
            .collect())
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
