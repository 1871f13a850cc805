//! Application state

use std::sync::Arc;

use todo_core::document::DocumentStore;
use todo_core::task::SqliteTaskStore;

use crate::config::ServerConfig;

/// Shared application state
#[derive(Clone)]
pub struct AppState {
    inner: Arc<AppStateInner>,
}

struct AppStateInner {
    config: ServerConfig,
    task_store: SqliteTaskStore,
    document_store: DocumentStore,
}

impl AppState {
    /// Open both stores under the configured data directory
    pub async fn new(config: ServerConfig) -> todo_core::Result<Self> {
        tokio::fs::create_dir_all(&config.data_dir).await?;

        let task_store = SqliteTaskStore::open(&config.data_dir.join("todos.db"))?;
        let document_store = DocumentStore::new(config.data_dir.join("documents.json")).await?;

        Ok(Self {
            inner: Arc::new(AppStateInner {
                config,
                task_store,
                document_store,
            }),
        })
    }

    pub fn config(&self) -> &ServerConfig {
        &self.inner.config
    }

    pub fn task_store(&self) -> &SqliteTaskStore {
        &self.inner.task_store
    }

    pub fn document_store(&self) -> &DocumentStore {
        &self.inner.document_store
    }
}
