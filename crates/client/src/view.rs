//! Application state behind the task list screen
//!
//! [`TodoView`] owns the in-memory list, the active filter and the sync
//! adapter. Each user intent mutates that state and returns a [`Notice`] for
//! the front end to display; rendering is a pure projection via [`TodoView::rows`].

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::Serialize;

use todo_core::task::{Category, Progress, Task, TaskId, EMPTY_TASK_MESSAGE};

use crate::error::{Result, SyncError};
use crate::subscription::Snapshot;
use crate::sync::{Committed, SyncAdapter, SyncStatus};

/// Characters of task text quoted in the delete prompt
const PROMPT_PREVIEW_LEN: usize = 20;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Filter {
    #[default]
    All,
    Pending,
    Completed,
}

impl Filter {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::All => "all",
            Self::Pending => "pending",
            Self::Completed => "completed",
        }
    }

    pub fn matches(&self, task: &Task) -> bool {
        match self {
            Self::All => true,
            Self::Pending => !task.completed,
            Self::Completed => task.completed,
        }
    }
}

impl FromStr for Filter {
    type Err = SyncError;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "all" => Ok(Self::All),
            "pending" => Ok(Self::Pending),
            "completed" => Ok(Self::Completed),
            other => Err(SyncError::validation(format!("Unknown filter: {}", other))),
        }
    }
}

impl fmt::Display for Filter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum NoticeLevel {
    Success,
    Warning,
    Error,
    Info,
}

/// Message for the user after an intent
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Notice {
    pub level: NoticeLevel,
    pub message: String,
}

impl Notice {
    pub fn new(level: NoticeLevel, message: impl Into<String>) -> Self {
        Self {
            level,
            message: message.into(),
        }
    }

    pub fn success(message: impl Into<String>) -> Self {
        Self::new(NoticeLevel::Success, message)
    }

    pub fn warning(message: impl Into<String>) -> Self {
        Self::new(NoticeLevel::Warning, message)
    }

    pub fn error(message: impl Into<String>) -> Self {
        Self::new(NoticeLevel::Error, message)
    }

    pub fn info(message: impl Into<String>) -> Self {
        Self::new(NoticeLevel::Info, message)
    }
}

/// Asks the user a yes/no question
pub trait Confirm {
    fn confirm(&mut self, prompt: &str) -> bool;
}

impl<F> Confirm for F
where
    F: FnMut(&str) -> bool,
{
    fn confirm(&mut self, prompt: &str) -> bool {
        self(prompt)
    }
}

/// One rendered list entry
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TaskRow {
    pub id: TaskId,
    pub icon: &'static str,
    pub text: String,
    pub category: String,
    pub completed: bool,
    pub date: String,
}

pub fn category_icon(category: &Category) -> &'static str {
    match category {
        Category::General => "🎀",
        Category::Work => "💼",
        Category::Personal => "🌸",
        Category::Shopping => "🛍️",
        Category::Health => "🏃‍♀️",
        Category::Other(_) => "📌",
    }
}

/// `Delete "<first 20 chars>…"?`
pub fn delete_prompt(text: &str) -> String {
    let mut chars = text.chars();
    let preview: String = chars.by_ref().take(PROMPT_PREVIEW_LEN).collect();
    let ellipsis = if chars.next().is_some() { "…" } else { "" };
    format!("Delete \"{}{}\"?", preview, ellipsis)
}

/// Short relative age of a timestamp, e.g. `5m ago` or `May 1` past a week
pub fn format_relative(at: DateTime<Utc>, now: DateTime<Utc>) -> String {
    let elapsed = now.signed_duration_since(at);
    let minutes = elapsed.num_minutes();
    let hours = elapsed.num_hours();
    let days = elapsed.num_days();

    if minutes < 1 {
        "Just now".to_string()
    } else if minutes < 60 {
        format!("{}m ago", minutes)
    } else if hours < 24 {
        format!("{}h ago", hours)
    } else if days < 7 {
        format!("{}d ago", days)
    } else {
        at.format("%b %-d").to_string()
    }
}

/// Tentative completion flip awaiting the store's answer
#[derive(Debug, Clone)]
pub struct PendingToggle {
    previous: Task,
}

impl PendingToggle {
    pub fn id(&self) -> &TaskId {
        &self.previous.id
    }

    /// Completion state the toggle is trying to reach
    pub fn target(&self) -> bool {
        !self.previous.completed
    }
}

pub struct TodoView {
    adapter: SyncAdapter,
    tasks: Vec<Task>,
    filter: Filter,
}

impl TodoView {
    pub fn new(adapter: SyncAdapter) -> Self {
        Self {
            adapter,
            tasks: Vec::new(),
            filter: Filter::default(),
        }
    }

    pub fn adapter(&self) -> &SyncAdapter {
        &self.adapter
    }

    pub fn tasks(&self) -> &[Task] {
        &self.tasks
    }

    pub fn filter(&self) -> Filter {
        self.filter
    }

    pub fn set_filter(&mut self, filter: Filter) {
        self.filter = filter;
    }

    pub fn sync_status(&self) -> SyncStatus {
        self.adapter.status()
    }

    /// Completion statistics over the in-memory list
    pub fn progress(&self) -> Progress {
        Progress::of(&self.tasks)
    }

    /// Initial load
    pub async fn load(&mut self) -> Notice {
        match self.adapter.load().await {
            Ok(loaded) => {
                let local = loaded.is_local();
                self.tasks = loaded.value;
                if local {
                    Notice::warning("Connection error. Using local storage.")
                } else {
                    Notice::success("Welcome to Bunny Todo! 🎀")
                }
            }
            Err(e) => Notice::error(format!("Could not load tasks: {}", e)),
        }
    }

    /// Replace the list with a subscription snapshot
    pub fn apply_snapshot(&mut self, snapshot: Snapshot) -> Option<Notice> {
        let local = snapshot.is_local();
        self.tasks = snapshot.tasks;
        local.then(|| Notice::warning("Connection error. Using local storage."))
    }

    pub async fn add(&mut self, text: &str, category: Category) -> Notice {
        match self.adapter.create(text, category).await {
            Ok(committed) => {
                let local = committed.is_local();
                let task = committed.value;
                // A snapshot may already have delivered this task
                if !self.tasks.iter().any(|t| t.id == task.id) {
                    self.tasks.insert(0, task);
                }
                if local {
                    Notice::info("Task saved locally 💾")
                } else {
                    Notice::success("Task added successfully! ✨")
                }
            }
            Err(e) if e.is_validation() => Notice::warning(add_warning(&e)),
            Err(e) => Notice::error(e.to_string()),
        }
    }

    /// Flip a task's completion in memory before the store has answered
    pub fn begin_toggle(&mut self, id: &TaskId) -> Option<PendingToggle> {
        let task = self.tasks.iter_mut().find(|t| &t.id == id)?;
        let pending = PendingToggle {
            previous: task.clone(),
        };
        task.completed = !task.completed;
        Some(pending)
    }

    /// Confirm or roll back a tentative flip
    pub fn resolve_toggle(
        &mut self,
        pending: PendingToggle,
        outcome: Result<Committed<Task>>,
    ) -> Notice {
        match outcome {
            Ok(committed) => {
                let status = if committed.value.completed {
                    "completed 🎉"
                } else {
                    "pending"
                };
                self.replace(committed.value);
                Notice::success(format!("Task marked as {}!", status))
            }
            Err(e) => {
                self.replace(pending.previous);
                if e.is_not_found() {
                    Notice::warning("Task no longer exists")
                } else {
                    Notice::error(e.to_string())
                }
            }
        }
    }

    pub async fn toggle(&mut self, id: &TaskId) -> Notice {
        let Some(pending) = self.begin_toggle(id) else {
            return Notice::warning("Task no longer exists");
        };
        let outcome = self.adapter.set_completed(pending.id(), pending.target()).await;
        self.resolve_toggle(pending, outcome)
    }

    /// Delete after asking `confirm`; `None` when the user declined
    pub async fn delete(&mut self, id: &TaskId, confirm: &mut impl Confirm) -> Option<Notice> {
        let Some(task) = self.tasks.iter().find(|t| &t.id == id) else {
            return Some(Notice::warning("Task no longer exists"));
        };
        if !confirm.confirm(&delete_prompt(&task.task)) {
            return None;
        }

        let notice = match self.adapter.delete(id).await {
            Ok(_) => {
                self.tasks.retain(|t| &t.id != id);
                Notice::success("Task deleted! 🗑️")
            }
            Err(e) if e.is_not_found() => {
                self.tasks.retain(|t| &t.id != id);
                Notice::warning("Task no longer exists")
            }
            Err(e) => Notice::error(e.to_string()),
        };
        Some(notice)
    }

    /// Visible rows under the current filter
    pub fn rows(&self) -> Vec<TaskRow> {
        self.rows_at(Utc::now())
    }

    pub fn rows_at(&self, now: DateTime<Utc>) -> Vec<TaskRow> {
        self.tasks
            .iter()
            .filter(|t| self.filter.matches(t))
            .map(|t| TaskRow {
                id: t.id.clone(),
                icon: category_icon(&t.category),
                text: t.task.clone(),
                category: t.category.to_string(),
                completed: t.completed,
                date: format_relative(t.created_at, now),
            })
            .collect()
    }

    /// Heading and hint shown when no row is visible
    pub fn empty_message(&self) -> Option<(String, &'static str)> {
        if self.tasks.iter().any(|t| self.filter.matches(t)) {
            return None;
        }
        Some(match self.filter {
            Filter::All => (
                "No tasks!".to_string(),
                "Add your first task to get started 🌈",
            ),
            other => (format!("No {} tasks!", other), "Try changing the filter"),
        })
    }

    fn replace(&mut self, task: Task) {
        if let Some(slot) = self.tasks.iter_mut().find(|t| t.id == task.id) {
            *slot = task;
        }
    }
}

fn add_warning(err: &SyncError) -> String {
    match err {
        SyncError::Validation { message } if message == EMPTY_TASK_MESSAGE => {
            "Please enter a task! 🌸".to_string()
        }
        other => other.to_string(),
    }
}
