pub mod daemon;
pub mod deadletter;
pub mod metrics;
pub mod pipeline;
pub mod router;
pub mod schema;
pub mod sink;
pub mod transform;
