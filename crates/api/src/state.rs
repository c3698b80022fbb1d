use std::sync::Arc;

use courier_dispatch::{
    CommandStatusRegistry, DispatchConfig, JobDispatcher, JobTracker, StatusIngest, WorkerRegistry,
};
use courier_events::EventBus;

use crate::config::ServerConfig;

/// Shared application state available to all Axum handlers via `State<AppState>`.
///
/// Cheaply cloneable; everything inside is behind `Arc`.
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<ServerConfig>,
    /// In-process command and status channels.
    pub bus: Arc<EventBus>,
    /// Owns the command and worker registries.
    pub dispatcher: Arc<JobDispatcher>,
    /// Bus-backed job-status source the dispatcher polls.
    pub jobs: Arc<JobTracker>,
}

impl AppState {
    /// Wire the bus, registries, job tracker and dispatcher together.
    ///
    /// Returns the [`StatusIngest`] that feeds the registries; the caller
    /// spawns it on a status-channel subscription.
    pub fn build(config: ServerConfig, dispatch: DispatchConfig) -> (Self, StatusIngest) {
        let bus = Arc::new(EventBus::default());
        let workers = Arc::new(WorkerRegistry::new());
        let commands = Arc::new(CommandStatusRegistry::with_timeout(
            dispatch.command_status_timeout,
        ));
        let jobs = Arc::new(JobTracker::new());

        let ingest = StatusIngest::new(
            Arc::clone(&workers),
            Arc::clone(&commands),
            Arc::clone(&jobs),
        );

        let dispatcher = Arc::new(JobDispatcher::new(
            commands,
            workers,
            bus.clone(),
            jobs.clone(),
            dispatch,
        ));

        let state = Self {
            config: Arc::new(config),
            bus,
            dispatcher,
            jobs,
        };
        (state, ingest)
    }
}
