pub mod memory;
pub mod queue;
pub mod traits;
pub mod writer;

pub use memory::MemorySink;
pub use queue::QueueSink;
pub use traits::Sink;
pub use writer::JsonLinesSink;
