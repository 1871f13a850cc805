//! Task model definitions

use std::fmt;

use chrono::{DateTime, Utc};
use rand::distributions::Alphanumeric;
use rand::Rng;
use serde::{Deserialize, Serialize};

use crate::{Error, Result};

/// Maximum task text length, counted after trimming
pub const MAX_TASK_LEN: usize = 100;

/// Validation message for blank task text
pub const EMPTY_TASK_MESSAGE: &str = "Task cannot be empty";

/// Task identifier
///
/// SQLite rows carry integer ids, documents and local fallback records carry
/// string ids. Both shapes round-trip through JSON unchanged.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(untagged)]
pub enum TaskId {
    Number(i64),
    Text(String),
}

impl TaskId {
    /// Generate a timestamp-derived id for a record written to local storage
    pub fn local() -> Self {
        let suffix: String = rand::thread_rng()
            .sample_iter(&Alphanumeric)
            .take(6)
            .map(char::from)
            .collect();
        Self::Text(format!(
            "local_{}_{}",
            Utc::now().timestamp_millis(),
            suffix.to_ascii_lowercase()
        ))
    }

    pub fn as_number(&self) -> Option<i64> {
        match self {
            Self::Number(n) => Some(*n),
            Self::Text(s) => s.parse().ok(),
        }
    }
}

impl fmt::Display for TaskId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Number(n) => write!(f, "{}", n),
            Self::Text(s) => f.write_str(s),
        }
    }
}

impl From<i64> for TaskId {
    fn from(value: i64) -> Self {
        Self::Number(value)
    }
}

impl From<&str> for TaskId {
    fn from(value: &str) -> Self {
        Self::Text(value.to_string())
    }
}

impl From<String> for TaskId {
    fn from(value: String) -> Self {
        Self::Text(value)
    }
}

/// Task category label
///
/// Labels outside the fixed set are kept as-is so that records written by
/// other clients survive a load/save cycle.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum Category {
    #[default]
    General,
    Work,
    Personal,
    Shopping,
    Health,
    Other(String),
}

impl Category {
    pub fn as_str(&self) -> &str {
        match self {
            Self::General => "general",
            Self::Work => "work",
            Self::Personal => "personal",
            Self::Shopping => "shopping",
            Self::Health => "health",
            Self::Other(label) => label,
        }
    }
}

impl From<String> for Category {
    fn from(value: String) -> Self {
        match value.as_str() {
            "general" => Self::General,
            "work" => Self::Work,
            "personal" => Self::Personal,
            "shopping" => Self::Shopping,
            "health" => Self::Health,
            _ => Self::Other(value),
        }
    }
}

impl From<&str> for Category {
    fn from(value: &str) -> Self {
        Self::from(value.to_string())
    }
}

impl From<Category> for String {
    fn from(value: Category) -> Self {
        match value {
            Category::Other(label) => label,
            known => known.as_str().to_string(),
        }
    }
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A single to-do item
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Task {
    pub id: TaskId,
    pub task: String,
    #[serde(default)]
    pub category: Category,
    #[serde(default)]
    pub completed: bool,
    pub created_at: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub updated_at: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub device_id: Option<String>,
    /// Local id this record had before it was imported into a remote store
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub original_id: Option<TaskId>,
}

impl Task {
    /// Build a task stamped with the local clock, for writes that never reached a remote store
    pub fn local(new_task: NewTask) -> Self {
        Self {
            id: TaskId::local(),
            task: new_task.task,
            category: new_task.category,
            completed: new_task.completed,
            created_at: Utc::now(),
            updated_at: None,
            device_id: None,
            original_id: new_task.original_id,
        }
    }
}

/// Validate and normalize task text
///
/// Returns the trimmed text, or `InvalidInput` if it is empty or longer than
/// [`MAX_TASK_LEN`] characters.
pub fn normalize_task_text(raw: &str) -> Result<String> {
    let text = raw.trim();
    if text.is_empty() {
        return Err(Error::InvalidInput(EMPTY_TASK_MESSAGE.to_string()));
    }
    if text.chars().count() > MAX_TASK_LEN {
        return Err(Error::InvalidInput(format!(
            "Task is too long (max {} characters)",
            MAX_TASK_LEN
        )));
    }
    Ok(text.to_string())
}

/// Fields for a task that has not been persisted yet
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NewTask {
    pub task: String,
    #[serde(default)]
    pub category: Category,
    #[serde(default)]
    pub completed: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub original_id: Option<TaskId>,
}

impl NewTask {
    /// Create a validated new task; the text is stored trimmed
    pub fn new(task: &str, category: Category) -> Result<Self> {
        Ok(Self {
            task: normalize_task_text(task)?,
            category,
            completed: false,
            original_id: None,
        })
    }

    /// Re-run validation on a value that came off the wire
    pub fn validated(mut self) -> Result<Self> {
        self.task = normalize_task_text(&self.task)?;
        Ok(self)
    }

    /// Carry an existing local record into a remote store
    pub fn from_local(task: &Task) -> Self {
        Self {
            task: task.task.clone(),
            category: task.category.clone(),
            completed: task.completed,
            original_id: Some(task.id.clone()),
        }
    }
}

/// Partial update; only supplied fields change
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TaskPatch {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub completed: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub task: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub category: Option<Category>,
}

impl TaskPatch {
    pub fn completed(completed: bool) -> Self {
        Self {
            completed: Some(completed),
            ..Self::default()
        }
    }

    pub fn is_empty(&self) -> bool {
        self.completed.is_none() && self.task.is_none() && self.category.is_none()
    }

    /// Reject empty patches and normalize the text field if present
    pub fn validated(mut self) -> Result<Self> {
        if self.is_empty() {
            return Err(Error::InvalidInput("No fields to update".to_string()));
        }
        if let Some(text) = self.task.take() {
            self.task = Some(normalize_task_text(&text)?);
        }
        Ok(self)
    }

    pub fn apply_to(&self, task: &mut Task) {
        if let Some(completed) = self.completed {
            task.completed = completed;
        }
        if let Some(text) = &self.task {
            task.task = text.clone();
        }
        if let Some(category) = &self.category {
            task.category = category.clone();
        }
    }
}

/// Completion statistics over a task set
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Progress {
    pub total: u64,
    pub completed: u64,
    /// Rounded completion percentage, 0 when there are no tasks
    #[serde(rename = "progress")]
    pub percentage: u8,
}

impl Progress {
    pub fn from_counts(total: u64, completed: u64) -> Self {
        let percentage = if total == 0 {
            0
        } else {
            (completed as f64 * 100.0 / total as f64).round() as u8
        };
        Self {
            total,
            completed,
            percentage,
        }
    }

    pub fn of(tasks: &[Task]) -> Self {
        let completed = tasks.iter().filter(|t| t.completed).count();
        Self::from_counts(tasks.len() as u64, completed as u64)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_normalize_trims_text() {
        assert_eq!(normalize_task_text("  Buy milk \n").unwrap(), "Buy milk");
    }

    #[test]
    fn test_normalize_rejects_blank() {
        assert!(normalize_task_text("").unwrap_err().is_validation());
        assert!(normalize_task_text("   \t ").unwrap_err().is_validation());
    }

    #[test]
    fn test_length_boundary() {
        let exactly = "a".repeat(MAX_TASK_LEN);
        assert!(normalize_task_text(&exactly).is_ok());

        let too_long = "a".repeat(MAX_TASK_LEN + 1);
        match normalize_task_text(&too_long) {
            Err(Error::InvalidInput(msg)) => assert!(msg.contains("too long")),
            other => panic!("Expected InvalidInput error, got: {:?}", other),
        }
    }

    #[test]
    fn test_length_counts_characters_not_bytes() {
        let emoji = "🥕".repeat(MAX_TASK_LEN);
        assert!(normalize_task_text(&emoji).is_ok());
    }

    #[test]
    fn test_length_measured_after_trim() {
        let padded = format!("   {}   ", "a".repeat(MAX_TASK_LEN));
        assert!(normalize_task_text(&padded).is_ok());
    }

    #[test]
    fn test_category_defaults_and_unknown_labels() {
        assert_eq!(Category::default(), Category::General);
        assert_eq!(Category::from("shopping"), Category::Shopping);

        let custom: Category = serde_json::from_str("\"garden\"").unwrap();
        assert_eq!(custom, Category::Other("garden".to_string()));
        assert_eq!(serde_json::to_string(&custom).unwrap(), "\"garden\"");
    }

    #[test]
    fn test_task_id_json_shapes() {
        let numeric: TaskId = serde_json::from_str("42").unwrap();
        assert_eq!(numeric, TaskId::Number(42));

        let text: TaskId = serde_json::from_str("\"abc\"").unwrap();
        assert_eq!(text, TaskId::Text("abc".to_string()));
        assert_eq!(TaskId::from("7").as_number(), Some(7));
    }

    #[test]
    fn test_local_ids_are_distinct() {
        let a = TaskId::local();
        let b = TaskId::local();
        assert_ne!(a, b);
        assert!(a.to_string().starts_with("local_"));
    }

    #[test]
    fn test_task_defaults_on_missing_fields() {
        let json = r#"{"id": 1, "task": "Walk", "created_at": "2024-05-01T10:00:00Z"}"#;
        let task: Task = serde_json::from_str(json).unwrap();
        assert_eq!(task.category, Category::General);
        assert!(!task.completed);
        assert!(task.device_id.is_none());
    }

    #[test]
    fn test_patch_validation() {
        assert!(TaskPatch::default().validated().is_err());

        let patch = TaskPatch {
            task: Some("  Renamed ".to_string()),
            ..TaskPatch::default()
        }
        .validated()
        .unwrap();
        assert_eq!(patch.task.as_deref(), Some("Renamed"));

        let blank = TaskPatch {
            task: Some("  ".to_string()),
            ..TaskPatch::default()
        };
        assert!(blank.validated().is_err());
    }

    #[test]
    fn test_patch_applies_only_supplied_fields() {
        let mut task = Task::local(NewTask::new("Read book", Category::Personal).unwrap());
        let created_at = task.created_at;

        TaskPatch::completed(true).apply_to(&mut task);

        assert!(task.completed);
        assert_eq!(task.task, "Read book");
        assert_eq!(task.category, Category::Personal);
        assert_eq!(task.created_at, created_at);
    }

    #[test]
    fn test_progress_rounding() {
        assert_eq!(Progress::from_counts(0, 0).percentage, 0);
        assert_eq!(Progress::from_counts(4, 1).percentage, 25);
        assert_eq!(Progress::from_counts(3, 2).percentage, 67);
        assert_eq!(Progress::from_counts(3, 3).percentage, 100);
    }

    #[test]
    fn test_progress_serializes_percentage_as_progress() {
        let json = serde_json::to_value(Progress::from_counts(4, 1)).unwrap();
        assert_eq!(json["progress"], 25);
        assert_eq!(json["total"], 4);
        assert_eq!(json["completed"], 1);
    }
}
