// Application layer - use cases and orchestration over the in-memory stores.

pub mod error;
pub mod service;

pub use error::*;
pub use service::*;
