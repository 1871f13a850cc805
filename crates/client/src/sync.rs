//! Sync adapter
//!
//! Every mutation goes to the remote store first. When the remote store is
//! unreachable the same mutation is applied to the local task cache instead
//! and the result is tagged as local. Validation happens before either store
//! is touched. A not-found answer for a task that only exists in the local
//! cache (written while offline) is applied locally; any other not-found
//! answer is surfaced as-is.
//!
//! There is no retry and no reconciliation: whichever write lands last wins.

use std::future::Future;
use std::sync::Arc;

use tokio::sync::watch;
use tracing::{debug, info, warn};

use todo_core::local::LocalTaskStore;
use todo_core::task::{Category, NewTask, Task, TaskId, TaskPatch};

use crate::error::{from_core, Result, SyncError};
use crate::remote::RemoteTaskStore;

/// Connection indicator shown next to the list
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SyncStatus {
    Synced,
    Syncing,
    /// Last operation fell back to local storage
    Local,
}

impl SyncStatus {
    pub fn label(&self) -> &'static str {
        match self {
            Self::Synced => "Synced",
            Self::Syncing => "Syncing...",
            Self::Local => "Local Mode",
        }
    }
}

/// Which store accepted a write
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CommitTarget {
    Remote,
    Local,
}

/// Result of an operation that reached one of the stores
#[derive(Debug, Clone, PartialEq)]
pub struct Committed<T> {
    pub value: T,
    pub target: CommitTarget,
}

impl<T> Committed<T> {
    pub fn remote(value: T) -> Self {
        Self {
            value,
            target: CommitTarget::Remote,
        }
    }

    pub fn local(value: T) -> Self {
        Self {
            value,
            target: CommitTarget::Local,
        }
    }

    pub fn is_local(&self) -> bool {
        self.target == CommitTarget::Local
    }
}

pub struct SyncAdapter {
    remote: Arc<dyn RemoteTaskStore>,
    local: LocalTaskStore,
    status: watch::Sender<SyncStatus>,
}

impl SyncAdapter {
    pub fn new(remote: Arc<dyn RemoteTaskStore>, local: LocalTaskStore) -> Self {
        let (status, _) = watch::channel(SyncStatus::Synced);
        Self {
            remote,
            local,
            status,
        }
    }

    pub fn remote(&self) -> &Arc<dyn RemoteTaskStore> {
        &self.remote
    }

    pub fn local(&self) -> &LocalTaskStore {
        &self.local
    }

    pub fn status(&self) -> SyncStatus {
        *self.status.borrow()
    }

    /// Observe status changes
    pub fn watch_status(&self) -> watch::Receiver<SyncStatus> {
        self.status.subscribe()
    }

    fn set_status(&self, status: SyncStatus) {
        self.status.send_replace(status);
    }

    /// Load the current list, falling back to the local cache
    pub async fn load(&self) -> Result<Committed<Vec<Task>>> {
        let previous = self.begin();
        let outcome = self.remote.list().await;
        self.settle(previous, "load", outcome, async {
            Ok(self.local.load_all().await)
        })
        .await
    }

    /// Create a task from raw input text
    pub async fn create(&self, text: &str, category: Category) -> Result<Committed<Task>> {
        let new_task = NewTask::new(text, category).map_err(from_core)?;

        let previous = self.begin();
        let outcome = self.remote.create(&new_task).await;
        self.settle(previous, "create", outcome, self.create_locally(new_task))
            .await
    }

    /// Apply a partial update
    pub async fn update(&self, id: &TaskId, patch: TaskPatch) -> Result<Committed<Task>> {
        let patch = patch.validated().map_err(from_core)?;

        let previous = self.begin();
        let outcome = self.remote.update(id, &patch).await;
        self.settle_for(previous, "update", id, outcome, self.update_locally(id, &patch))
            .await
    }

    pub async fn set_completed(&self, id: &TaskId, completed: bool) -> Result<Committed<Task>> {
        self.update(id, TaskPatch::completed(completed)).await
    }

    pub async fn delete(&self, id: &TaskId) -> Result<Committed<()>> {
        let previous = self.begin();
        let outcome = self.remote.delete(id).await;
        self.settle_for(previous, "delete", id, outcome, self.delete_locally(id))
            .await
    }

    fn begin(&self) -> SyncStatus {
        let previous = self.status();
        self.set_status(SyncStatus::Syncing);
        previous
    }

    /// Resolve a remote outcome, running `fallback` only when the remote was unavailable
    async fn settle<T>(
        &self,
        previous: SyncStatus,
        op: &str,
        outcome: Result<T>,
        fallback: impl Future<Output = Result<T>>,
    ) -> Result<Committed<T>> {
        match outcome {
            Ok(value) => {
                debug!("{} committed to {}", op, self.remote.name());
                self.set_status(SyncStatus::Synced);
                Ok(Committed::remote(value))
            }
            Err(e) if e.is_unavailable() => {
                warn!(
                    "{} failed on {}, using local storage: {}",
                    op,
                    self.remote.name(),
                    e
                );
                self.set_status(SyncStatus::Local);
                fallback.await.map(Committed::local)
            }
            Err(e) => {
                self.set_status(previous);
                Err(e)
            }
        }
    }

    /// Like [`Self::settle`], but a remote not-found for a task held in the
    /// local cache runs `fallback` too
    async fn settle_for<T>(
        &self,
        previous: SyncStatus,
        op: &str,
        id: &TaskId,
        outcome: Result<T>,
        fallback: impl Future<Output = Result<T>>,
    ) -> Result<Committed<T>> {
        let local_only = match &outcome {
            Err(e) if e.is_not_found() => self.held_locally(id).await,
            _ => false,
        };
        if local_only {
            info!("{} of {} applied to local storage only", op, id);
            self.set_status(SyncStatus::Local);
            return fallback.await.map(Committed::local);
        }
        self.settle(previous, op, outcome, fallback).await
    }

    async fn held_locally(&self, id: &TaskId) -> bool {
        self.local.load_all().await.iter().any(|t| &t.id == id)
    }

    async fn create_locally(&self, new_task: NewTask) -> Result<Task> {
        let mut tasks = self.local.load_all().await;
        let task = Task::local(new_task);
        tasks.insert(0, task.clone());
        self.save_locally(&tasks).await?;
        info!("Saved todo {} to local storage", task.id);
        Ok(task)
    }

    async fn update_locally(&self, id: &TaskId, patch: &TaskPatch) -> Result<Task> {
        let mut tasks = self.local.load_all().await;
        let task = tasks
            .iter_mut()
            .find(|t| &t.id == id)
            .ok_or_else(|| SyncError::not_found(id))?;
        patch.apply_to(task);
        let updated = task.clone();
        self.save_locally(&tasks).await?;
        Ok(updated)
    }

    async fn delete_locally(&self, id: &TaskId) -> Result<()> {
        let mut tasks = self.local.load_all().await;
        let before = tasks.len();
        tasks.retain(|t| &t.id != id);
        if tasks.len() == before {
            return Err(SyncError::not_found(id));
        }
        self.save_locally(&tasks).await
    }

    async fn save_locally(&self, tasks: &[Task]) -> Result<()> {
        if self.local.save_all(tasks).await {
            Ok(())
        } else {
            Err(SyncError::Local(todo_core::Error::Storage(
                "Error saving tasks!".to_string(),
            )))
        }
    }
}
