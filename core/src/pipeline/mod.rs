pub mod batch;
pub mod coordinator;
pub mod flush;
pub mod flusher;
pub mod processor;

pub use batch::RowBatch;
pub use coordinator::StreamCoordinator;
pub use flush::FlushPolicy;
pub use flusher::{run_flush_loop, BatchWriter};
pub use processor::CdcProcessor;
