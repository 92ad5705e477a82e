pub mod retry;
pub mod writer;

pub use retry::RetryPolicy;
pub use writer::ClickHouseWriter;
