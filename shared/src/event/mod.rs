pub mod envelope;
pub mod types;

pub use envelope::RawCdcEvent;
pub use types::{CdcMetadata, OpType};
