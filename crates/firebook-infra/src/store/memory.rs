//! In-memory document store - the default when no `DB_PATH` is configured.

use std::collections::BTreeMap;

use async_trait::async_trait;
use serde_json::{Map, Value};
use tokio::sync::RwLock;

use firebook_core::domain::{ID_FIELD, Record, RecordExt, new_id};
use firebook_core::error::StoreError;
use firebook_core::ports::DocumentStore;

/// Collections of records kept in a map guarded by an async RwLock.
///
/// Every mutation, counter increments included, happens under a single
/// write lock, so read-modify-write sequences cannot lose updates.
/// Note: Data is lost on process restart unless wrapped by
/// [`super::JsonFileDocumentStore`].
pub struct InMemoryDocumentStore {
    collections: RwLock<BTreeMap<String, Vec<Record>>>,
}

impl InMemoryDocumentStore {
    pub fn new() -> Self {
        Self {
            collections: RwLock::new(BTreeMap::new()),
        }
    }

    /// Build a store from a `{ "collection": [records...] }` document.
    ///
    /// Top-level entries that are not arrays of objects are skipped.
    pub fn from_snapshot(snapshot: Value) -> Result<Self, StoreError> {
        let Value::Object(entries) = snapshot else {
            return Err(StoreError::Serialization(
                "database root must be a JSON object".to_string(),
            ));
        };

        let mut collections = BTreeMap::new();
        for (name, value) in entries {
            let Value::Array(items) = value else {
                tracing::warn!(collection = %name, "Skipping non-array collection");
                continue;
            };
            let records: Vec<Record> = items
                .into_iter()
                .filter_map(|item| match item {
                    Value::Object(record) => Some(record),
                    _ => None,
                })
                .collect();
            collections.insert(name, records);
        }

        Ok(Self {
            collections: RwLock::new(collections),
        })
    }

    /// Export every collection as a single JSON document.
    pub async fn snapshot(&self) -> Value {
        let collections = self.collections.read().await;
        let map: Map<String, Value> = collections
            .iter()
            .map(|(name, records)| {
                let items = records.iter().cloned().map(Value::Object).collect();
                (name.clone(), Value::Array(items))
            })
            .collect();
        Value::Object(map)
    }

    /// Copy of every collection, restorable with [`Self::restore`].
    pub(crate) async fn checkpoint(&self) -> Checkpoint {
        Checkpoint(self.collections.read().await.clone())
    }

    /// Put the store back to an earlier checkpoint.
    pub(crate) async fn restore(&self, checkpoint: Checkpoint) {
        *self.collections.write().await = checkpoint.0;
    }

    fn position(records: &[Record], id: &str) -> Option<usize> {
        records
            .iter()
            .position(|r| r.id_key().as_deref() == Some(id))
    }

    fn find_mut<'a>(
        collections: &'a mut BTreeMap<String, Vec<Record>>,
        collection: &str,
        id: &str,
    ) -> Option<&'a mut Record> {
        let records = collections.get_mut(collection)?;
        let index = Self::position(records, id)?;
        records.get_mut(index)
    }
}

/// Saved state of an [`InMemoryDocumentStore`].
pub(crate) struct Checkpoint(BTreeMap<String, Vec<Record>>);

impl Default for InMemoryDocumentStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl DocumentStore for InMemoryDocumentStore {
    async fn collections(&self) -> Vec<String> {
        self.collections.read().await.keys().cloned().collect()
    }

    async fn list(&self, collection: &str) -> Result<Vec<Record>, StoreError> {
        let collections = self.collections.read().await;
        Ok(collections.get(collection).cloned().unwrap_or_default())
    }

    async fn find_by_id(&self, collection: &str, id: &str) -> Result<Option<Record>, StoreError> {
        let collections = self.collections.read().await;
        let found = collections
            .get(collection)
            .and_then(|records| Self::position(records, id).map(|i| records[i].clone()));
        Ok(found)
    }

    async fn create(&self, collection: &str, record: Record) -> Result<Record, StoreError> {
        let mut collections = self.collections.write().await;
        let records = collections.entry(collection.to_string()).or_default();

        let record = match record.id_key() {
            Some(id) => {
                if Self::position(records, &id).is_some() {
                    return Err(StoreError::Conflict {
                        collection: collection.to_string(),
                        id,
                    });
                }
                record
            }
            None => {
                // Keep the id as the first field, as clients expect.
                let mut with_id = Record::new();
                with_id.insert(ID_FIELD.to_string(), Value::String(new_id()));
                with_id.extend(record.into_iter().filter(|(k, _)| k != ID_FIELD));
                with_id
            }
        };

        records.push(record.clone());
        tracing::debug!(collection = %collection, id = ?record.id_key(), "Record created");
        Ok(record)
    }

    async fn replace(
        &self,
        collection: &str,
        id: &str,
        record: Record,
    ) -> Result<Option<Record>, StoreError> {
        let mut collections = self.collections.write().await;
        let Some(existing) = Self::find_mut(&mut collections, collection, id) else {
            return Ok(None);
        };

        let mut replaced = Record::new();
        if let Some(existing_id) = existing.get(ID_FIELD) {
            replaced.insert(ID_FIELD.to_string(), existing_id.clone());
        }
        replaced.extend(record.into_iter().filter(|(k, _)| k != ID_FIELD));
        *existing = replaced.clone();
        Ok(Some(replaced))
    }

    async fn patch(
        &self,
        collection: &str,
        id: &str,
        fields: Record,
    ) -> Result<Option<Record>, StoreError> {
        let mut collections = self.collections.write().await;
        let Some(record) = Self::find_mut(&mut collections, collection, id) else {
            return Ok(None);
        };

        for (key, value) in fields {
            if key != ID_FIELD {
                record.insert(key, value);
            }
        }
        Ok(Some(record.clone()))
    }

    async fn delete(&self, collection: &str, id: &str) -> Result<Option<Record>, StoreError> {
        let mut collections = self.collections.write().await;
        let removed = collections.get_mut(collection).and_then(|records| {
            Self::position(records, id).map(|index| records.remove(index))
        });
        if removed.is_some() {
            tracing::debug!(collection = %collection, id = %id, "Record deleted");
        }
        Ok(removed)
    }

    async fn update_field(
        &self,
        collection: &str,
        id: &str,
        field: &str,
        value: Value,
    ) -> Result<Option<Record>, StoreError> {
        if field == ID_FIELD {
            return self.find_by_id(collection, id).await;
        }
        let mut collections = self.collections.write().await;
        let Some(record) = Self::find_mut(&mut collections, collection, id) else {
            return Ok(None);
        };

        record.insert(field.to_string(), value);
        Ok(Some(record.clone()))
    }

    async fn increment_field(
        &self,
        collection: &str,
        id: &str,
        field: &str,
        delta: i64,
    ) -> Result<Option<i64>, StoreError> {
        let mut collections = self.collections.write().await;
        let Some(record) = Self::find_mut(&mut collections, collection, id) else {
            return Ok(None);
        };

        let current = record.get(field).and_then(Value::as_i64).unwrap_or(0);
        let next = current.saturating_add(delta);
        record.insert(field.to_string(), Value::from(next));
        Ok(Some(next))
    }
}
