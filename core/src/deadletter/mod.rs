pub mod entry;
pub mod escalate;
pub mod queue;

pub use entry::DeadLetterEntry;
pub use escalate::Escalation;
pub use queue::{DeadLetterQueue, DeadLetterSink, FanoutDeadLetter, JsonLinesDeadLetter};
