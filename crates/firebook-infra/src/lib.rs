//! # Firebook Infrastructure
//!
//! Concrete implementations behind the `firebook-core` ports: the JSON
//! document stores and the directory-backed file storage.

pub mod storage;
pub mod store;

pub use storage::{DiskStorage, FileNamer, StoredFile};
pub use store::{InMemoryDocumentStore, JsonFileDocumentStore};
