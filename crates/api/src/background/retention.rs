//! Periodic cleanup of settled command statuses and job reports.
//!
//! Entries that have not been written for the configured retention period
//! are dropped from the command status registry and the job tracker, so a
//! long-running server does not keep every finished job forever.

use std::sync::Arc;
use std::time::Duration;

use courier_dispatch::{CommandStatusRegistry, JobTracker};
use tokio_util::sync::CancellationToken;

/// How often the cleanup pass runs.
pub const CLEANUP_INTERVAL: Duration = Duration::from_secs(60);

/// One cleanup pass. Returns `(commands_removed, jobs_removed)`.
pub async fn prune_once(
    commands: &CommandStatusRegistry,
    jobs: &JobTracker,
    retention: Duration,
) -> (usize, usize) {
    let removed_commands = commands.prune_older_than(retention).await;
    let removed_jobs = jobs.prune_older_than(retention).await;
    if removed_commands > 0 || removed_jobs > 0 {
        tracing::info!(
            commands = removed_commands,
            jobs = removed_jobs,
            "Status retention: discarded settled entries"
        );
    } else {
        tracing::debug!("Status retention: nothing to discard");
    }
    (removed_commands, removed_jobs)
}

/// Run the retention loop until `cancel` is triggered.
pub async fn run(
    commands: Arc<CommandStatusRegistry>,
    jobs: Arc<JobTracker>,
    retention: Duration,
    cancel: CancellationToken,
) {
    tracing::info!(
        retention_secs = retention.as_secs(),
        interval_secs = CLEANUP_INTERVAL.as_secs(),
        "Status retention job started"
    );

    let mut interval = tokio::time::interval(CLEANUP_INTERVAL);

    loop {
        tokio::select! {
            _ = cancel.cancelled() => {
                tracing::info!("Status retention job stopping");
                break;
            }
            _ = interval.tick() => {
                prune_once(&commands, &jobs, retention).await;
            }
        }
    }
}
