//! Remote task store interface
//!
//! Both backends (the REST todos API and the device-scoped document
//! collection) implement [`RemoteTaskStore`]; the sync adapter only sees the
//! trait.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::{Client, Response, StatusCode};
use serde::de::DeserializeOwned;
use serde::Deserialize;

use todo_core::task::{NewTask, Task, TaskId, TaskPatch};

use crate::error::{Result, SyncError};

/// CRUD surface shared by every remote backend
#[async_trait]
pub trait RemoteTaskStore: Send + Sync {
    /// Short backend name for logs
    fn name(&self) -> &'static str;

    /// All tasks, newest first
    async fn list(&self) -> Result<Vec<Task>>;

    /// Create a task; the store assigns id and creation time
    async fn create(&self, new_task: &NewTask) -> Result<Task>;

    /// Apply a partial update
    async fn update(&self, id: &TaskId, patch: &TaskPatch) -> Result<Task>;

    /// Delete a task
    async fn delete(&self, id: &TaskId) -> Result<()>;
}

#[derive(Debug, Deserialize)]
struct ErrorBody {
    error: String,
}

pub(crate) fn http_client() -> Client {
    Client::builder()
        .no_proxy()
        .connect_timeout(Duration::from_secs(5))
        .build()
        .unwrap_or_else(|_| Client::new())
}

pub(crate) fn trim_base_url(base_url: impl Into<String>) -> String {
    base_url.into().trim_end_matches('/').to_string()
}

/// Decode a JSON response, mapping error statuses onto [`SyncError`]
///
/// `task_id` is set for per-task requests, where a 404 means the task is
/// gone. On collection requests a 404 means the endpoint is not served.
pub(crate) async fn read_json<T: DeserializeOwned>(
    res: Response,
    task_id: Option<&str>,
) -> Result<T> {
    let status = res.status();
    let endpoint = res.url().path().to_string();
    if status.is_success() {
        return res.json::<T>().await.map_err(|e| SyncError::InvalidResponse {
            message: e.to_string(),
        });
    }

    let message = match res.text().await {
        Ok(body) => serde_json::from_str::<ErrorBody>(&body)
            .map(|b| b.error)
            .unwrap_or(body),
        Err(_) => String::new(),
    };

    Err(match status {
        StatusCode::NOT_FOUND => match task_id {
            Some(id) => SyncError::not_found(id),
            None => SyncError::unavailable(format!("{} is not served", endpoint)),
        },
        StatusCode::BAD_REQUEST | StatusCode::UNPROCESSABLE_ENTITY => SyncError::validation(message),
        other => SyncError::Status {
            status: other.as_u16(),
            message,
        },
    })
}
