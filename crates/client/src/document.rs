//! Document backend
//!
//! Talks to the device-scoped collection `devices/<device_id>/todos` on the
//! todo server. On top of plain CRUD it offers a live subscription of the
//! collection.

use async_trait::async_trait;
use reqwest::Client;
use tracing::debug;

use todo_core::local::LocalTaskStore;
use todo_core::task::{NewTask, Task, TaskId, TaskPatch};

use crate::error::{Result, SyncError};
use crate::remote::{http_client, read_json, trim_base_url, RemoteTaskStore};
use crate::subscription::{self, Subscription};

pub struct DocumentTaskStore {
    client: Client,
    base_url: String,
    device_id: String,
}

impl DocumentTaskStore {
    pub fn new(base_url: impl Into<String>, device_id: impl Into<String>) -> Self {
        Self {
            client: http_client(),
            base_url: trim_base_url(base_url),
            device_id: device_id.into(),
        }
    }

    fn collection_url(&self) -> String {
        format!(
            "{}/api/devices/{}/todos",
            self.base_url,
            urlencoding::encode(&self.device_id)
        )
    }

    fn document_url(&self, id: &TaskId) -> String {
        format!(
            "{}/{}",
            self.collection_url(),
            urlencoding::encode(&id.to_string())
        )
    }

    /// Subscribe to live snapshots of this device's collection
    ///
    /// `local` supplies the one-shot fallback snapshot if the stream fails.
    pub fn subscribe(&self, local: LocalTaskStore) -> Subscription {
        subscription::spawn(
            self.client.clone(),
            format!("{}/stream", self.collection_url()),
            local,
        )
    }
}

#[async_trait]
impl RemoteTaskStore for DocumentTaskStore {
    fn name(&self) -> &'static str {
        "documents"
    }

    async fn list(&self) -> Result<Vec<Task>> {
        let res = self
            .client
            .get(self.collection_url())
            .send()
            .await
            .map_err(|e| SyncError::transport("Failed to list documents", e))?;
        read_json(res, None).await
    }

    async fn create(&self, new_task: &NewTask) -> Result<Task> {
        debug!("Adding document to devices/{}/todos", self.device_id);
        let res = self
            .client
            .post(self.collection_url())
            .json(new_task)
            .send()
            .await
            .map_err(|e| SyncError::transport("Failed to add document", e))?;
        read_json(res, None).await
    }

    async fn update(&self, id: &TaskId, patch: &TaskPatch) -> Result<Task> {
        let res = self
            .client
            .patch(self.document_url(id))
            .json(patch)
            .send()
            .await
            .map_err(|e| SyncError::transport("Failed to update document", e))?;
        read_json(res, Some(&id.to_string())).await
    }

    async fn delete(&self, id: &TaskId) -> Result<()> {
        let res = self
            .client
            .delete(self.document_url(id))
            .send()
            .await
            .map_err(|e| SyncError::transport("Failed to delete document", e))?;
        read_json::<serde_json::Value>(res, Some(&id.to_string())).await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::subscription::SnapshotSource;
    use serde_json::json;
    use tempfile::TempDir;
    use todo_core::local::LocalStorage;
    use todo_core::task::Category;
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    const DEVICE: &str = "device_1_abcdefghi";

    fn local_store() -> (LocalTaskStore, TempDir) {
        let temp_dir = TempDir::new().unwrap();
        (
            LocalTaskStore::new(LocalStorage::new(temp_dir.path())),
            temp_dir,
        )
    }

    #[tokio::test]
    async fn test_create_posts_to_device_collection() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path(format!("/api/devices/{}/todos", DEVICE)))
            .respond_with(ResponseTemplate::new(201).set_body_json(json!({
                "id": "Xq2b9ZtQw1LmNoPr3sTu",
                "task": "Buy milk",
                "category": "shopping",
                "completed": false,
                "created_at": "2024-05-01T10:00:00Z",
                "updated_at": "2024-05-01T10:00:00Z",
                "device_id": DEVICE
            })))
            .expect(1)
            .mount(&server)
            .await;

        let store = DocumentTaskStore::new(server.uri(), DEVICE);
        let created = store
            .create(&NewTask::new("Buy milk", Category::Shopping).unwrap())
            .await
            .unwrap();

        assert_eq!(created.id, TaskId::from("Xq2b9ZtQw1LmNoPr3sTu"));
        assert_eq!(created.device_id.as_deref(), Some(DEVICE));
    }

    #[tokio::test]
    async fn test_subscription_delivers_remote_snapshots() {
        let server = MockServer::start().await;
        let body = concat!(
            "data: []\n\n",
            ":\n\n",
            "data: [{\"id\":\"d1\",\"task\":\"Buy milk\",\"category\":\"shopping\",",
            "\"completed\":false,\"created_at\":\"2024-05-01T10:00:00Z\"}]\n\n"
        );
        Mock::given(method("GET"))
            .and(path(format!("/api/devices/{}/todos/stream", DEVICE)))
            .respond_with(
                ResponseTemplate::new(200)
                    .insert_header("content-type", "text/event-stream")
                    .set_body_string(body),
            )
            .mount(&server)
            .await;

        let (local, _temp) = local_store();
        let store = DocumentTaskStore::new(server.uri(), DEVICE);
        let mut sub = store.subscribe(local);

        let first = sub.next().await.unwrap();
        assert_eq!(first.source, SnapshotSource::Remote);
        assert!(first.tasks.is_empty());

        let second = sub.next().await.unwrap();
        assert_eq!(second.tasks.len(), 1);
        assert_eq!(second.tasks[0].task, "Buy milk");
        assert!(!second.tasks[0].completed);

        // The mock closes the body afterwards, which counts as a broken stream
        let fallback = sub.next().await.unwrap();
        assert!(fallback.is_local());
        assert!(sub.next().await.is_none());
    }

    #[tokio::test]
    async fn test_subscription_failure_yields_local_snapshot_once() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path(format!("/api/devices/{}/todos/stream", DEVICE)))
            .respond_with(ResponseTemplate::new(503))
            .mount(&server)
            .await;

        let (local, _temp) = local_store();
        let cached = Task::local(NewTask::new("Cached", Category::Work).unwrap());
        local.save_all(std::slice::from_ref(&cached)).await;

        let store = DocumentTaskStore::new(server.uri(), DEVICE);
        let mut sub = store.subscribe(local);

        let snapshot = sub.next().await.unwrap();
        assert!(snapshot.is_local());
        assert_eq!(snapshot.tasks, vec![cached]);
        assert!(sub.next().await.is_none());
    }

    #[tokio::test]
    async fn test_missing_collection_endpoint_is_unavailable() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path(format!("/api/devices/{}/todos", DEVICE)))
            .respond_with(ResponseTemplate::new(404))
            .mount(&server)
            .await;

        let store = DocumentTaskStore::new(server.uri(), DEVICE);
        let err = store
            .create(&NewTask::new("Buy milk", Category::Shopping).unwrap())
            .await
            .unwrap_err();

        assert!(err.is_unavailable());
        assert!(!err.is_not_found());
    }

    #[tokio::test]
    async fn test_delete_unknown_document_is_not_found() {
        let server = MockServer::start().await;
        Mock::given(method("DELETE"))
            .and(path(format!("/api/devices/{}/todos/missing", DEVICE)))
            .respond_with(ResponseTemplate::new(404).set_body_json(json!({"error": "Todo not found"})))
            .mount(&server)
            .await;

        let store = DocumentTaskStore::new(server.uri(), DEVICE);
        let err = store.delete(&TaskId::from("missing")).await.unwrap_err();
        assert!(err.is_not_found());
    }
}
