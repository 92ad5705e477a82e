pub mod dispatch;
pub mod registry;

pub use dispatch::{RegistryRouter, Routed, Router, StaticRouter, StaticSinks};
pub use registry::{Destination, StreamRegistry, StreamRegistryBuilder};
