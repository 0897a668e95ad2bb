//! `db.json` backed document store.

use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use async_trait::async_trait;
use serde_json::Value;
use tokio::fs;
use tokio::sync::Mutex;

use firebook_core::domain::Record;
use firebook_core::error::StoreError;
use firebook_core::ports::DocumentStore;

use super::InMemoryDocumentStore;
use super::memory::Checkpoint;

/// Document store that rewrites a JSON file after every mutation.
///
/// Reads are served from memory. Each successful write snapshots the whole
/// database into a sibling temp file and renames it over the target, so a
/// crash mid-write leaves the previous file intact. A mutation whose write
/// fails is rolled back in memory as well.
pub struct JsonFileDocumentStore {
    inner: InMemoryDocumentStore,
    path: PathBuf,
    write_lock: Mutex<()>,
}

impl JsonFileDocumentStore {
    /// Load the database at `path`, starting empty if the file is missing.
    pub async fn open(path: impl AsRef<Path>) -> Result<Self, StoreError> {
        let path = path.as_ref().to_path_buf();

        let inner = match fs::read(&path).await {
            Ok(bytes) => {
                let snapshot: Value = serde_json::from_slice(&bytes)?;
                InMemoryDocumentStore::from_snapshot(snapshot)?
            }
            Err(e) if e.kind() == ErrorKind::NotFound => {
                tracing::info!(path = %path.display(), "Database file not found, starting empty");
                InMemoryDocumentStore::new()
            }
            Err(e) => return Err(StoreError::Io(e.to_string())),
        };

        tracing::info!(path = %path.display(), "Opened JSON database");

        Ok(Self {
            inner,
            path,
            write_lock: Mutex::new(()),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Write the current state to disk.
    pub async fn flush(&self) -> Result<(), StoreError> {
        let _guard = self.write_lock.lock().await;
        self.write_file().await
    }

    async fn write_file(&self) -> Result<(), StoreError> {
        let snapshot = self.inner.snapshot().await;
        let bytes = serde_json::to_vec_pretty(&snapshot)?;

        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent)
                .await
                .map_err(|e| StoreError::Io(e.to_string()))?;
        }

        let tmp = self.path.with_extension("json.tmp");
        fs::write(&tmp, &bytes)
            .await
            .map_err(|e| StoreError::Io(e.to_string()))?;
        fs::rename(&tmp, &self.path)
            .await
            .map_err(|e| StoreError::Io(e.to_string()))?;

        tracing::trace!(path = %self.path.display(), bytes = bytes.len(), "Database written");
        Ok(())
    }

    /// Write a mutation through to disk, undoing it in memory if the write fails.
    ///
    /// Callers hold `write_lock` from before `checkpoint` was taken.
    async fn persist<T>(
        &self,
        checkpoint: Checkpoint,
        changed: bool,
        value: T,
    ) -> Result<T, StoreError> {
        if !changed {
            return Ok(value);
        }
        if let Err(e) = self.write_file().await {
            tracing::warn!(path = %self.path.display(), error = %e, "Write failed, mutation rolled back");
            self.inner.restore(checkpoint).await;
            return Err(e);
        }
        Ok(value)
    }
}

#[async_trait]
impl DocumentStore for JsonFileDocumentStore {
    async fn collections(&self) -> Vec<String> {
        self.inner.collections().await
    }

    async fn list(&self, collection: &str) -> Result<Vec<Record>, StoreError> {
        self.inner.list(collection).await
    }

    async fn find_by_id(&self, collection: &str, id: &str) -> Result<Option<Record>, StoreError> {
        self.inner.find_by_id(collection, id).await
    }

    async fn create(&self, collection: &str, record: Record) -> Result<Record, StoreError> {
        let _guard = self.write_lock.lock().await;
        let checkpoint = self.inner.checkpoint().await;
        let created = self.inner.create(collection, record).await?;
        self.persist(checkpoint, true, created).await
    }

    async fn replace(
        &self,
        collection: &str,
        id: &str,
        record: Record,
    ) -> Result<Option<Record>, StoreError> {
        let _guard = self.write_lock.lock().await;
        let checkpoint = self.inner.checkpoint().await;
        let replaced = self.inner.replace(collection, id, record).await?;
        self.persist(checkpoint, replaced.is_some(), replaced).await
    }

    async fn patch(
        &self,
        collection: &str,
        id: &str,
        fields: Record,
    ) -> Result<Option<Record>, StoreError> {
        let _guard = self.write_lock.lock().await;
        let checkpoint = self.inner.checkpoint().await;
        let patched = self.inner.patch(collection, id, fields).await?;
        self.persist(checkpoint, patched.is_some(), patched).await
    }

    async fn delete(&self, collection: &str, id: &str) -> Result<Option<Record>, StoreError> {
        let _guard = self.write_lock.lock().await;
        let checkpoint = self.inner.checkpoint().await;
        let removed = self.inner.delete(collection, id).await?;
        self.persist(checkpoint, removed.is_some(), removed).await
    }

    async fn update_field(
        &self,
        collection: &str,
        id: &str,
        field: &str,
        value: Value,
    ) -> Result<Option<Record>, StoreError> {
        let _guard = self.write_lock.lock().await;
        let checkpoint = self.inner.checkpoint().await;
        let updated = self.inner.update_field(collection, id, field, value).await?;
        self.persist(checkpoint, updated.is_some(), updated).await
    }

    async fn increment_field(
        &self,
        collection: &str,
        id: &str,
        field: &str,
        delta: i64,
    ) -> Result<Option<i64>, StoreError> {
        let _guard = self.write_lock.lock().await;
        let checkpoint = self.inner.checkpoint().await;
        let counter = self.inner.increment_field(collection, id, field, delta).await?;
        self.persist(checkpoint, counter.is_some(), counter).await
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;
    use tempfile::TempDir;

    use super::*;

    #[tokio::test]
    async fn test_missing_file_starts_empty() {
        let dir = TempDir::new().unwrap();
        let store = JsonFileDocumentStore::open(dir.path().join("db.json"))
            .await
            .unwrap();

        assert!(store.collections().await.is_empty());
        assert!(!store.path().exists());
    }

    #[tokio::test]
    async fn test_mutations_survive_reopen() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("db.json");
        std::fs::write(
            &path,
            json!({ "posts": [{ "id": "p1", "totalComments": 0 }] }).to_string(),
        )
        .unwrap();

        let store = JsonFileDocumentStore::open(&path).await.unwrap();
        store
            .increment_field("posts", "p1", "totalComments", 1)
            .await
            .unwrap();
        let comment = json!({ "postId": "p1", "text": "hi" });
        store
            .create("comments", comment.as_object().cloned().unwrap())
            .await
            .unwrap();
        drop(store);

        let reopened = JsonFileDocumentStore::open(&path).await.unwrap();
        let post = reopened.find_by_id("posts", "p1").await.unwrap().unwrap();
        assert_eq!(post["totalComments"], 1);
        assert_eq!(reopened.list("comments").await.unwrap().len(), 1);
        assert!(!path.with_extension("json.tmp").exists());
    }

    #[tokio::test]
    async fn test_malformed_file_is_an_error() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("db.json");
        std::fs::write(&path, "{ not json").unwrap();

        let result = JsonFileDocumentStore::open(&path).await;
        assert!(matches!(result, Err(StoreError::Serialization(_))));
    }

    #[tokio::test]
    async fn test_failed_write_rolls_back_memory() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("db.json");
        std::fs::write(
            &path,
            json!({ "posts": [{ "id": "p1", "totalComments": 0 }] }).to_string(),
        )
        .unwrap();
        let store = JsonFileDocumentStore::open(&path).await.unwrap();

        // A directory in the temp file's place makes every write fail.
        let tmp = path.with_extension("json.tmp");
        std::fs::create_dir(&tmp).unwrap();

        let comment = json!({ "id": "c1", "postId": "p1" });
        let result = store
            .create("comments", comment.as_object().cloned().unwrap())
            .await;
        assert!(matches!(result, Err(StoreError::Io(_))));
        assert!(store.find_by_id("comments", "c1").await.unwrap().is_none());

        let result = store.increment_field("posts", "p1", "totalComments", 1).await;
        assert!(matches!(result, Err(StoreError::Io(_))));
        let post = store.find_by_id("posts", "p1").await.unwrap().unwrap();
        assert_eq!(post["totalComments"], 0);

        std::fs::remove_dir(&tmp).unwrap();
        store
            .increment_field("posts", "p1", "totalComments", 1)
            .await
            .unwrap();
        drop(store);

        let reopened = JsonFileDocumentStore::open(&path).await.unwrap();
        assert!(reopened.list("comments").await.unwrap().is_empty());
        let post = reopened.find_by_id("posts", "p1").await.unwrap().unwrap();
        assert_eq!(post["totalComments"], 1);
    }
}
