//! REST backend
//!
//! Talks to the `/api/todos` endpoints of the todo server. Every call is one
//! independent HTTP round trip.

use async_trait::async_trait;
use reqwest::Client;
use serde::Serialize;
use tracing::debug;

use todo_core::task::{Category, NewTask, Progress, Task, TaskId, TaskPatch};

use crate::error::{Result, SyncError};
use crate::remote::{http_client, read_json, trim_base_url, RemoteTaskStore};

#[derive(Serialize)]
struct CreateTodoRequest<'a> {
    task: &'a str,
    category: &'a Category,
}

pub struct RestTaskStore {
    client: Client,
    base_url: String,
}

impl RestTaskStore {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            client: http_client(),
            base_url: trim_base_url(base_url),
        }
    }

    fn todos_url(&self) -> String {
        format!("{}/api/todos", self.base_url)
    }

    fn todo_url(&self, id: &TaskId) -> String {
        format!(
            "{}/api/todos/{}",
            self.base_url,
            urlencoding::encode(&id.to_string())
        )
    }

    /// Aggregate completion statistics computed by the server
    pub async fn progress(&self) -> Result<Progress> {
        let res = self
            .client
            .get(format!("{}/api/progress", self.base_url))
            .send()
            .await
            .map_err(|e| SyncError::transport("Failed to fetch progress", e))?;
        read_json(res, None).await
    }
}

#[async_trait]
impl RemoteTaskStore for RestTaskStore {
    fn name(&self) -> &'static str {
        "rest"
    }

    async fn list(&self) -> Result<Vec<Task>> {
        let res = self
            .client
            .get(self.todos_url())
            .send()
            .await
            .map_err(|e| SyncError::transport("Failed to list todos", e))?;
        read_json(res, None).await
    }

    async fn create(&self, new_task: &NewTask) -> Result<Task> {
        debug!("POST {}", self.todos_url());
        let req = CreateTodoRequest {
            task: &new_task.task,
            category: &new_task.category,
        };
        let res = self
            .client
            .post(self.todos_url())
            .json(&req)
            .send()
            .await
            .map_err(|e| SyncError::transport("Failed to create todo", e))?;
        read_json(res, None).await
    }

    async fn update(&self, id: &TaskId, patch: &TaskPatch) -> Result<Task> {
        let res = self
            .client
            .put(self.todo_url(id))
            .json(patch)
            .send()
            .await
            .map_err(|e| SyncError::transport("Failed to update todo", e))?;
        read_json(res, Some(&id.to_string())).await
    }

    async fn delete(&self, id: &TaskId) -> Result<()> {
        let res = self
            .client
            .delete(self.todo_url(id))
            .send()
            .await
            .map_err(|e| SyncError::transport("Failed to delete todo", e))?;
        // Body is `{message, id}`; only the status matters here
        read_json::<serde_json::Value>(res, Some(&id.to_string())).await?;
        Ok(())
    }
}
