//! Courier message bus.
//!
//! This crate provides the transport the dispatcher and the worker fleet
//! talk over:
//!
//! - [`EventBus`]: in-process publish/subscribe hub with a command channel
//!   and a status channel, each backed by `tokio::sync::broadcast`.
//! - [`CommandMessage`]: start command addressed to one worker.
//! - [`StatusEvent`]: worker-originated reports (availability,
//!   acknowledgements, job lifecycle).

pub mod bus;
pub mod messages;

pub use bus::{BusError, EventBus};
pub use messages::{parse_status_event, CommandAck, CommandMessage, JobReport, StatusEvent};
