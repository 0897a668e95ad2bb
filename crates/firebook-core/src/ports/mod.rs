//! Ports - trait definitions for external dependencies.
//! These are the "interfaces" that infrastructure must implement.

mod document_store;

pub use document_store::DocumentStore;
