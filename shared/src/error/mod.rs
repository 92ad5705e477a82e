pub mod types;

pub use types::FerryError;

/// Shorthand Result type used throughout Ferry.
pub type Result<T> = std::result::Result<T, FerryError>;
