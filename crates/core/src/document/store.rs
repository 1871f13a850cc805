//! Device-scoped document collections
//!
//! Every device owns one collection (`devices/<device_id>/todos`). Documents
//! get a random 20-character id and server timestamps. Subscribers hold a
//! `watch` receiver carrying the latest ordered snapshot of one collection,
//! so a late or slow reader always sees the full current list.

use std::collections::{BTreeMap, HashMap};
use std::path::PathBuf;
use std::sync::Mutex;

use chrono::Utc;
use rand::distributions::Alphanumeric;
use rand::Rng;
use serde::{Deserialize, Serialize};
use tokio::sync::{watch, RwLock};

use crate::error::Error;
use crate::task::{NewTask, Task, TaskId, TaskPatch};
use crate::Result;

const DOCUMENT_ID_LEN: usize = 20;

type Collections = HashMap<String, BTreeMap<String, Task>>;

#[derive(Debug, Default, Serialize, Deserialize)]
struct DocumentsFile {
    devices: HashMap<String, Vec<Task>>,
}

/// Collection path of a device, as shown in logs
pub fn collection_path(device_id: &str) -> String {
    format!("devices/{}/todos", device_id)
}

fn auto_id() -> String {
    rand::thread_rng()
        .sample_iter(&Alphanumeric)
        .take(DOCUMENT_ID_LEN)
        .map(char::from)
        .collect()
}

fn ordered(docs: Option<&BTreeMap<String, Task>>) -> Vec<Task> {
    let mut tasks: Vec<Task> = docs
        .map(|docs| docs.values().cloned().collect())
        .unwrap_or_default();
    tasks.sort_by(|a, b| {
        b.created_at
            .cmp(&a.created_at)
            .then_with(|| b.id.to_string().cmp(&a.id.to_string()))
    });
    tasks
}

/// Thread-safe document store with file persistence
pub struct DocumentStore {
    file_path: PathBuf,
    collections: RwLock<Collections>,
    watchers: Mutex<HashMap<String, watch::Sender<Vec<Task>>>>,
}

impl DocumentStore {
    /// Open the store, loading any previously persisted collections
    pub async fn new(file_path: impl Into<PathBuf>) -> Result<Self> {
        let file_path = file_path.into();
        let collections = if file_path.exists() {
            let content = tokio::fs::read_to_string(&file_path).await.map_err(|e| {
                Error::Storage(format!("Failed to read documents file: {}", e))
            })?;
            let file: DocumentsFile = serde_json::from_str(&content).map_err(|e| {
                Error::Storage(format!("Failed to parse documents file: {}", e))
            })?;
            file.devices
                .into_iter()
                .map(|(device, tasks)| {
                    let docs = tasks.into_iter().map(|t| (t.id.to_string(), t)).collect();
                    (device, docs)
                })
                .collect()
        } else {
            HashMap::new()
        };

        Ok(Self {
            file_path,
            collections: RwLock::new(collections),
            watchers: Mutex::new(HashMap::new()),
        })
    }

    /// Ordered snapshot of a device's collection, newest first
    pub async fn list(&self, device_id: &str) -> Vec<Task> {
        let collections = self.collections.read().await;
        ordered(collections.get(device_id))
    }

    /// Subscribe to a device's collection
    ///
    /// The receiver starts with the current snapshot and is updated after
    /// every committed change to that collection.
    pub async fn watch(&self, device_id: &str) -> watch::Receiver<Vec<Task>> {
        // Holding the read lock keeps commits out until the sender is registered
        let collections = self.collections.read().await;
        let mut watchers = self.lock_watchers();
        watchers.retain(|_, sender| sender.receiver_count() > 0);
        watchers
            .entry(device_id.to_string())
            .or_insert_with(|| watch::channel(ordered(collections.get(device_id))).0)
            .subscribe()
    }

    /// Add a document; the store assigns the id and timestamps
    pub async fn add(&self, device_id: &str, new_task: NewTask) -> Result<Task> {
        let new_task = new_task.validated()?;
        let now = Utc::now();
        let doc_id = auto_id();
        let task = Task {
            id: TaskId::Text(doc_id.clone()),
            task: new_task.task,
            category: new_task.category,
            completed: new_task.completed,
            created_at: now,
            updated_at: Some(now),
            device_id: Some(device_id.to_string()),
            original_id: new_task.original_id,
        };

        let mut collections = self.collections.write().await;
        collections
            .entry(device_id.to_string())
            .or_default()
            .insert(doc_id.clone(), task.clone());

        if let Err(e) = self.persist(&collections).await {
            if let Some(docs) = collections.get_mut(device_id) {
                docs.remove(&doc_id);
            }
            return Err(e);
        }

        tracing::debug!("Added {} to {}", doc_id, collection_path(device_id));
        self.notify(device_id, &collections);
        Ok(task)
    }

    /// Update a document; unknown ids fail with `TaskNotFound`
    pub async fn update(&self, device_id: &str, doc_id: &str, patch: TaskPatch) -> Result<Task> {
        let patch = patch.validated()?;

        let mut collections = self.collections.write().await;
        let doc = collections
            .get_mut(device_id)
            .and_then(|docs| docs.get_mut(doc_id))
            .ok_or_else(|| Error::TaskNotFound(doc_id.to_string()))?;

        let previous = doc.clone();
        patch.apply_to(doc);
        doc.updated_at = Some(Utc::now());
        let updated = doc.clone();

        if let Err(e) = self.persist(&collections).await {
            if let Some(docs) = collections.get_mut(device_id) {
                docs.insert(doc_id.to_string(), previous);
            }
            return Err(e);
        }

        tracing::debug!("Updated {} in {}", doc_id, collection_path(device_id));
        self.notify(device_id, &collections);
        Ok(updated)
    }

    /// Delete a document; unknown ids fail with `TaskNotFound`
    pub async fn delete(&self, device_id: &str, doc_id: &str) -> Result<()> {
        let mut collections = self.collections.write().await;
        let removed = collections
            .get_mut(device_id)
            .and_then(|docs| docs.remove(doc_id))
            .ok_or_else(|| Error::TaskNotFound(doc_id.to_string()))?;

        if let Err(e) = self.persist(&collections).await {
            if let Some(docs) = collections.get_mut(device_id) {
                docs.insert(doc_id.to_string(), removed);
            }
            return Err(e);
        }

        tracing::debug!("Deleted {} from {}", doc_id, collection_path(device_id));
        self.notify(device_id, &collections);
        Ok(())
    }

    fn lock_watchers(&self) -> std::sync::MutexGuard<'_, HashMap<String, watch::Sender<Vec<Task>>>> {
        // Every critical section is a single map operation, so a poisoned map is still consistent
        self.watchers
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    fn notify(&self, device_id: &str, collections: &Collections) {
        let mut watchers = self.lock_watchers();
        let Some(sender) = watchers.get(device_id) else {
            return;
        };
        if sender.receiver_count() == 0 {
            watchers.remove(device_id);
            return;
        }
        sender.send_replace(ordered(collections.get(device_id)));
    }

    /// Persist every collection to the documents file
    async fn persist(&self, collections: &Collections) -> Result<()> {
        let file = DocumentsFile {
            devices: collections
                .iter()
                .map(|(device, docs)| (device.clone(), docs.values().cloned().collect()))
                .collect(),
        };
        let content = serde_json::to_string_pretty(&file).map_err(|e| {
            Error::Storage(format!("Failed to serialize documents: {}", e))
        })?;

        // Ensure parent directory exists
        if let Some(parent) = self.file_path.parent() {
            tokio::fs::create_dir_all(parent).await.map_err(|e| {
                Error::Storage(format!("Failed to create directory: {}", e))
            })?;
        }

        tokio::fs::write(&self.file_path, content).await.map_err(|e| {
            Error::Storage(format!("Failed to write documents file: {}", e))
        })?;

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::task::Category;
    use tempfile::{tempdir, TempDir};

    async fn create_test_store() -> (DocumentStore, TempDir) {
        let dir = tempdir().unwrap();
        let store = DocumentStore::new(dir.path().join("documents.json"))
            .await
            .unwrap();
        (store, dir)
    }

    fn new_task(text: &str, category: Category) -> NewTask {
        NewTask::new(text, category).unwrap()
    }

    #[tokio::test]
    async fn test_add_sets_server_fields() {
        let (store, _dir) = create_test_store().await;

        let doc = store
            .add("device_a", new_task("Buy milk", Category::Shopping))
            .await
            .unwrap();

        match &doc.id {
            TaskId::Text(id) => assert_eq!(id.len(), DOCUMENT_ID_LEN),
            other => panic!("Expected text id, got: {:?}", other),
        }
        assert_eq!(doc.device_id.as_deref(), Some("device_a"));
        assert_eq!(doc.updated_at, Some(doc.created_at));
        assert!(!doc.completed);
    }

    #[tokio::test]
    async fn test_collections_are_scoped_by_device() {
        let (store, _dir) = create_test_store().await;
        store
            .add("device_a", new_task("mine", Category::General))
            .await
            .unwrap();

        assert_eq!(store.list("device_a").await.len(), 1);
        assert!(store.list("device_b").await.is_empty());

        let doc_id = store.list("device_a").await[0].id.to_string();
        let result = store.delete("device_b", &doc_id).await;
        assert!(result.unwrap_err().is_not_found());
        assert_eq!(store.list("device_a").await.len(), 1);
    }

    #[tokio::test]
    async fn test_subscription_sees_new_document() {
        let (store, _dir) = create_test_store().await;
        let mut rx = store.watch("device_a").await;
        assert!(rx.borrow_and_update().is_empty());

        store
            .add("device_a", new_task("Buy milk", Category::Shopping))
            .await
            .unwrap();

        rx.changed().await.unwrap();
        let snapshot = rx.borrow_and_update().clone();
        assert_eq!(snapshot.len(), 1);
        assert_eq!(snapshot[0].task, "Buy milk");
        assert_eq!(snapshot[0].category, Category::Shopping);
        assert!(!snapshot[0].completed);
    }

    #[tokio::test]
    async fn test_subscription_ignores_other_devices() {
        let (store, _dir) = create_test_store().await;
        let mut rx = store.watch("device_a").await;
        rx.borrow_and_update();

        store
            .add("device_b", new_task("elsewhere", Category::General))
            .await
            .unwrap();

        assert!(!rx.has_changed().unwrap());
    }

    #[tokio::test]
    async fn test_dropped_subscribers_release_their_channel() {
        let (store, _dir) = create_test_store().await;
        let rx = store.watch("device_a").await;
        let _other = store.watch("device_b").await;
        drop(rx);

        store
            .add("device_a", new_task("nobody listening", Category::General))
            .await
            .unwrap();
        assert!(!store.lock_watchers().contains_key("device_a"));
        assert!(store.lock_watchers().contains_key("device_b"));

        // A new subscriber starts from the current collection
        let rx = store.watch("device_a").await;
        assert_eq!(rx.borrow().len(), 1);
    }

    #[tokio::test]
    async fn test_update_and_delete() {
        let (store, _dir) = create_test_store().await;
        let doc = store
            .add("device_a", new_task("Stretch", Category::Health))
            .await
            .unwrap();
        let doc_id = doc.id.to_string();

        let updated = store
            .update("device_a", &doc_id, TaskPatch::completed(true))
            .await
            .unwrap();
        assert!(updated.completed);
        assert_eq!(updated.created_at, doc.created_at);

        store.delete("device_a", &doc_id).await.unwrap();
        assert!(store.list("device_a").await.is_empty());

        let missing = store
            .update("device_a", &doc_id, TaskPatch::completed(false))
            .await;
        assert!(missing.unwrap_err().is_not_found());
    }

    #[tokio::test]
    async fn test_list_newest_first() {
        let (store, _dir) = create_test_store().await;
        for text in ["first", "second", "third"] {
            store
                .add("device_a", new_task(text, Category::General))
                .await
                .unwrap();
            tokio::time::sleep(std::time::Duration::from_millis(2)).await;
        }

        let titles: Vec<String> = store
            .list("device_a")
            .await
            .into_iter()
            .map(|t| t.task)
            .collect();
        assert_eq!(titles, vec!["third", "second", "first"]);
    }

    #[tokio::test]
    async fn test_persistence_across_instances() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("documents.json");

        {
            let store = DocumentStore::new(&path).await.unwrap();
            store
                .add("device_a", new_task("Persistent", Category::Work))
                .await
                .unwrap();
        }

        let store = DocumentStore::new(&path).await.unwrap();
        let docs = store.list("device_a").await;
        assert_eq!(docs.len(), 1);
        assert_eq!(docs[0].task, "Persistent");
    }

    #[tokio::test]
    async fn test_failed_persist_rolls_back() {
        let dir = tempdir().unwrap();
        // The parent of the documents file is a regular file, so writes fail
        let blocker = dir.path().join("blocker");
        std::fs::write(&blocker, "").unwrap();
        let store = DocumentStore::new(blocker.join("documents.json"))
            .await
            .unwrap();

        let result = store
            .add("device_a", new_task("never stored", Category::General))
            .await;
        assert!(result.is_err());
        assert!(store.list("device_a").await.is_empty());
    }
}
