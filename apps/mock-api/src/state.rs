//! Application state - shared across all handlers.

use std::sync::Arc;

use firebook_core::ports::DocumentStore;
use firebook_core::relation::reconcile;
use firebook_infra::{InMemoryDocumentStore, JsonFileDocumentStore};

use crate::config::AppConfig;

/// Shared application state.
#[derive(Clone)]
pub struct AppState {
    pub store: Arc<dyn DocumentStore>,
}

impl AppState {
    pub fn new(store: Arc<dyn DocumentStore>) -> Self {
        Self { store }
    }

    /// Build the state for the configured database.
    pub async fn from_config(config: &AppConfig) -> anyhow::Result<Self> {
        let store: Arc<dyn DocumentStore> = match &config.db_path {
            Some(path) => Arc::new(JsonFileDocumentStore::open(path).await?),
            None => {
                tracing::warn!("DB_PATH not set. Running with an in-memory store.");
                Arc::new(InMemoryDocumentStore::new())
            }
        };

        if config.reconcile_on_start {
            let report = reconcile(store.as_ref(), &config.relations).await?;
            tracing::info!(
                checked = report.checked,
                corrected = report.corrected,
                "Reconciled relation counters"
            );
        }

        tracing::info!("Application state initialized");

        Ok(Self::new(store))
    }
}
