//! In-memory remote store for unit tests

use std::sync::atomic::{AtomicBool, AtomicI64, AtomicUsize, Ordering};
use std::sync::Mutex;

use async_trait::async_trait;
use chrono::{Duration, Utc};

use todo_core::task::{NewTask, Task, TaskId, TaskPatch};

use crate::error::{Result, SyncError};
use crate::remote::RemoteTaskStore;

#[derive(Default)]
pub struct FakeRemote {
    tasks: Mutex<Vec<Task>>,
    next_id: AtomicI64,
    failing: AtomicBool,
    calls: AtomicUsize,
}

impl FakeRemote {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make every following call fail as if the server were unreachable
    pub fn set_failing(&self, failing: bool) {
        self.failing.store(failing, Ordering::SeqCst);
    }

    /// Number of calls that reached the store
    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    fn enter(&self) -> Result<()> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if self.failing.load(Ordering::SeqCst) {
            return Err(SyncError::unavailable("fake remote is offline"));
        }
        Ok(())
    }
}

#[async_trait]
impl RemoteTaskStore for FakeRemote {
    fn name(&self) -> &'static str {
        "fake"
    }

    async fn list(&self) -> Result<Vec<Task>> {
        self.enter()?;
        let mut tasks = self.tasks.lock().unwrap().clone();
        tasks.reverse();
        Ok(tasks)
    }

    async fn create(&self, new_task: &NewTask) -> Result<Task> {
        self.enter()?;
        let id = self.next_id.fetch_add(1, Ordering::SeqCst) + 1;
        let task = Task {
            id: TaskId::Number(id),
            task: new_task.task.clone(),
            category: new_task.category.clone(),
            completed: new_task.completed,
            // Strictly increasing so list order is deterministic
            created_at: Utc::now() + Duration::milliseconds(id),
            updated_at: None,
            device_id: None,
            original_id: new_task.original_id.clone(),
        };
        self.tasks.lock().unwrap().push(task.clone());
        Ok(task)
    }

    async fn update(&self, id: &TaskId, patch: &TaskPatch) -> Result<Task> {
        self.enter()?;
        let mut tasks = self.tasks.lock().unwrap();
        let task = tasks
            .iter_mut()
            .find(|t| &t.id == id)
            .ok_or_else(|| SyncError::not_found(id))?;
        patch.apply_to(task);
        Ok(task.clone())
    }

    async fn delete(&self, id: &TaskId) -> Result<()> {
        self.enter()?;
        let mut tasks = self.tasks.lock().unwrap();
        let before = tasks.len();
        tasks.retain(|t| &t.id != id);
        if tasks.len() == before {
            return Err(SyncError::not_found(id));
        }
        Ok(())
    }
}
