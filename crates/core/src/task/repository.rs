//! Task repository trait
//!
//! Defines the interface for server-side task storage operations.

use async_trait::async_trait;

use super::model::{NewTask, Progress, Task, TaskId, TaskPatch};
use crate::Result;

/// Repository interface for task CRUD operations
#[async_trait]
pub trait TaskRepository: Send + Sync {
    /// Create a new task; the store assigns the id and creation time
    async fn create(&self, new_task: NewTask) -> Result<Task>;

    /// Get a task by ID
    async fn get(&self, id: &TaskId) -> Result<Option<Task>>;

    /// Get all tasks, newest first
    async fn list(&self) -> Result<Vec<Task>>;

    /// Apply a partial update, failing with `TaskNotFound` for unknown ids
    async fn update(&self, id: &TaskId, patch: TaskPatch) -> Result<Task>;

    /// Delete a task by ID, returning whether it existed
    async fn delete(&self, id: &TaskId) -> Result<bool>;

    /// Completion statistics over every stored task
    async fn progress(&self) -> Result<Progress>;
}
