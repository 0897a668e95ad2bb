//! Middleware modules.

pub mod cors;
pub mod error;
pub mod latency;
pub mod relation_counter;
pub mod storage;

pub use cors::cors;
pub use latency::Latency;
pub use relation_counter::RelationCounter;
pub use storage::{FileStorage, StorageConfig};
