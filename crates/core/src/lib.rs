//! Shared domain vocabulary for the courier dispatch engine.
//!
//! Pure types, constants, and validation helpers with no runtime
//! dependencies, so every other crate in the workspace can depend on it.

pub mod dispatch;
pub mod error;
pub mod status;
pub mod types;
