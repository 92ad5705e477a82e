//! Types shared by every Ferry crate: the CDC envelope, the log-position
//! codec, the error taxonomy, configuration and the sink ring buffer.

pub mod config;
pub mod error;
pub mod event;
pub mod lsn;
pub mod metrics;
pub mod queue;
