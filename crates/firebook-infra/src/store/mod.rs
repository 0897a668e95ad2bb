//! Document store implementations - in-memory and `db.json` backed.

mod json_file;
mod memory;

pub use json_file::JsonFileDocumentStore;
pub use memory::InMemoryDocumentStore;
