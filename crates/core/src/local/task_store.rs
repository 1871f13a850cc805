//! Local task cache
//!
//! The whole task list lives under one storage key and is re-serialized on
//! every write. Errors never propagate: reads fall back to an empty list and
//! failed writes leave the previous value in place.

use crate::task::Task;

use super::storage::LocalStorage;

/// Storage key holding the JSON array of tasks
pub const TASKS_KEY: &str = "bunny-todos";

#[derive(Debug, Clone)]
pub struct LocalTaskStore {
    storage: LocalStorage,
}

impl LocalTaskStore {
    pub fn new(storage: LocalStorage) -> Self {
        Self { storage }
    }

    pub fn storage(&self) -> &LocalStorage {
        &self.storage
    }

    /// Load every cached task; empty when nothing readable is stored
    pub async fn load_all(&self) -> Vec<Task> {
        let raw = match self.storage.get_item(TASKS_KEY).await {
            Ok(Some(raw)) => raw,
            Ok(None) => return Vec::new(),
            Err(e) => {
                tracing::warn!("Error loading from local storage: {}", e);
                return Vec::new();
            }
        };

        match serde_json::from_str::<Vec<Task>>(&raw) {
            Ok(tasks) => {
                tracing::debug!("Loaded {} todos from local storage", tasks.len());
                tasks
            }
            Err(e) => {
                tracing::warn!("Discarding unreadable local todos: {}", e);
                Vec::new()
            }
        }
    }

    /// Replace the cached list; returns false if nothing was written
    pub async fn save_all(&self, tasks: &[Task]) -> bool {
        let raw = match serde_json::to_string(tasks) {
            Ok(raw) => raw,
            Err(e) => {
                tracing::error!("Error serializing todos for local storage: {}", e);
                return false;
            }
        };

        match self.storage.set_item(TASKS_KEY, &raw).await {
            Ok(()) => {
                tracing::debug!("Saved {} todos to local storage", tasks.len());
                true
            }
            Err(e) => {
                tracing::error!("Error saving to local storage: {}", e);
                false
            }
        }
    }

    /// Drop the cached list entirely
    pub async fn clear(&self) -> bool {
        match self.storage.remove_item(TASKS_KEY).await {
            Ok(()) => true,
            Err(e) => {
                tracing::error!("Error clearing local storage: {}", e);
                false
            }
        }
    }
}
