//! Job dispatch and command-acknowledgement coordination.
//!
//! - [`CommandStatusRegistry`]: per-command state machine keyed by
//!   correlation id, with lazily derived `TIMEOUT_RESPONSE`.
//! - [`WorkerRegistry`]: last reported availability of every worker.
//! - [`JobDispatcher`]: spawns one coordination task per job that picks an
//!   idle worker, publishes a start command, and re-sends until the
//!   job-status source shows the job running or the deadline passes.
//! - [`CommandHandle`]: read-only view of one command's status.
//! - [`StatusIngest`] / [`JobTracker`]: consumers that feed the registries
//!   and the job-status source from the bus status channel.

pub mod command_status;
pub mod config;
pub mod dispatcher;
pub mod handle;
pub mod ingest;
pub mod source;
pub mod worker_registry;

pub use command_status::{CommandError, CommandStatus, CommandStatusRegistry};
pub use config::DispatchConfig;
pub use dispatcher::{DispatchError, Job, JobDispatcher};
pub use handle::CommandHandle;
pub use ingest::StatusIngest;
pub use source::{CommandPublisher, JobStatusSource, JobTracker, SourceError};
pub use worker_registry::{choose_worker, WorkerRecord, WorkerRegistry};
