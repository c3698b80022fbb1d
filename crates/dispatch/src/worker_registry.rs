//! Last known availability of every fleet worker.
//!
//! Records are upserted from `worker_status` events and never evicted: a
//! worker that stops reporting keeps its last availability indefinitely.

use std::collections::HashMap;

use chrono::Utc;
use courier_core::status::Availability;
use courier_core::types::{Timestamp, WorkerId};
use rand::seq::IndexedRandom;
use serde::Serialize;
use tokio::sync::RwLock;

/// Availability report most recently received from one worker.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct WorkerRecord {
    pub worker_id: WorkerId,
    pub availability: Availability,
    pub last_reported: Timestamp,
}

/// Registry of fleet workers keyed by worker id.
///
/// Thread-safe via interior `RwLock`; coordination tasks only ever read it.
pub struct WorkerRegistry {
    workers: RwLock<HashMap<WorkerId, WorkerRecord>>,
}

impl WorkerRegistry {
    pub fn new() -> Self {
        Self {
            workers: RwLock::new(HashMap::new()),
        }
    }

    /// Insert or refresh the record for `worker_id`.
    pub async fn apply_status(&self, worker_id: &str, availability: Availability) {
        let now = Utc::now();
        let mut workers = self.workers.write().await;

        match workers.get_mut(worker_id) {
            Some(record) => {
                if record.availability != availability {
                    tracing::info!(
                        worker_id,
                        from = %record.availability,
                        to = %availability,
                        "Worker availability changed",
                    );
                }
                record.availability = availability;
                record.last_reported = now;
            }
            None => {
                tracing::info!(worker_id, %availability, "Worker discovered");
                workers.insert(
                    worker_id.to_string(),
                    WorkerRecord {
                        worker_id: worker_id.to_string(),
                        availability,
                        last_reported: now,
                    },
                );
            }
        }
    }

    /// Point-in-time snapshot of every worker currently reporting idle.
    pub async fn list_idle(&self) -> Vec<WorkerRecord> {
        self.workers
            .read()
            .await
            .values()
            .filter(|w| w.availability == Availability::Idle)
            .cloned()
            .collect()
    }

    /// Snapshot of every known worker, ordered by worker id.
    pub async fn list_all(&self) -> Vec<WorkerRecord> {
        let mut all: Vec<WorkerRecord> = self.workers.read().await.values().cloned().collect();
        all.sort_by(|a, b| a.worker_id.cmp(&b.worker_id));
        all
    }

    pub async fn get(&self, worker_id: &str) -> Option<WorkerRecord> {
        self.workers.read().await.get(worker_id).cloned()
    }

    /// Number of workers ever seen.
    pub async fn len(&self) -> usize {
        self.workers.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.workers.read().await.is_empty()
    }
}

impl Default for WorkerRegistry {
    fn default() -> Self {
        Self::new()
    }
}

/// Pick one worker uniformly at random, or `None` for an empty slice.
pub fn choose_worker(candidates: &[WorkerRecord]) -> Option<&WorkerRecord> {
    candidates.choose(&mut rand::rng())
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
