use async_trait::async_trait;
use serde_json::Value;

use crate::domain::Record;
use crate::error::StoreError;

/// Document store trait - a JSON database of named record collections.
///
/// Lookups take ids in canonical string form (see [`crate::domain::id_key`]).
/// Operations on a missing record return `Ok(None)` rather than an error.
#[async_trait]
pub trait DocumentStore: Send + Sync {
    /// Names of the collections currently held.
    async fn collections(&self) -> Vec<String>;

    /// All records of a collection in insertion order.
    async fn list(&self, collection: &str) -> Result<Vec<Record>, StoreError>;

    /// Find a record by its id.
    async fn find_by_id(&self, collection: &str, id: &str) -> Result<Option<Record>, StoreError>;

    /// Insert a record, generating an id when it has none.
    async fn create(&self, collection: &str, record: Record) -> Result<Record, StoreError>;

    /// Replace a record wholesale, keeping its id.
    async fn replace(
        &self,
        collection: &str,
        id: &str,
        record: Record,
    ) -> Result<Option<Record>, StoreError>;

    /// Shallow-merge fields into a record, keeping its id.
    async fn patch(
        &self,
        collection: &str,
        id: &str,
        fields: Record,
    ) -> Result<Option<Record>, StoreError>;

    /// Remove a record, returning it.
    async fn delete(&self, collection: &str, id: &str) -> Result<Option<Record>, StoreError>;

    /// Set a single field.
    async fn update_field(
        &self,
        collection: &str,
        id: &str,
        field: &str,
        value: Value,
    ) -> Result<Option<Record>, StoreError>;

    /// Atomically add `delta` to an integer field and return the new value.
    ///
    /// A missing or non-integer field counts as zero.
    async fn increment_field(
        &self,
        collection: &str,
        id: &str,
        field: &str,
        delta: i64,
    ) -> Result<Option<i64>, StoreError>;
}
