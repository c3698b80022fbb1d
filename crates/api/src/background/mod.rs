//! Background tasks spawned by the binary alongside the HTTP server.

pub mod retention;
