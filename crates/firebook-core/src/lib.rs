//! # Firebook Core
//!
//! The domain layer of the Firebook mock API.
//! This crate contains records, relation rules and storage naming rules
//! with zero infrastructure dependencies.

pub mod domain;
pub mod error;
pub mod ports;
pub mod relation;
pub mod storage;

pub use domain::{Record, RecordExt};
pub use error::{StorageError, StoreError};
