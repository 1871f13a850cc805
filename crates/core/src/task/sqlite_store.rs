//! SQLite-backed task storage
//!
//! Backs the REST API. Ids come from `AUTOINCREMENT`, creation times from
//! the server clock.

use std::path::Path;
use std::sync::{Mutex, MutexGuard};

use async_trait::async_trait;
use chrono::{DateTime, SecondsFormat, Utc};
use rusqlite::types::{Type, Value};
use rusqlite::{params, params_from_iter, Connection, OptionalExtension, Row};

use super::model::{Category, NewTask, Progress, Task, TaskId, TaskPatch};
use super::repository::TaskRepository;
use crate::{Error, Result};

const CREATE_TODOS_TABLE: &str = "CREATE TABLE IF NOT EXISTS todos (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    task TEXT NOT NULL,
    completed INTEGER NOT NULL DEFAULT 0,
    category TEXT NOT NULL DEFAULT 'general',
    created_at TEXT NOT NULL
)";

const SELECT_COLUMNS: &str = "SELECT id, task, completed, category, created_at FROM todos";

/// SQLite task store
///
/// Thread-safe via an internal `Mutex<Connection>`; every statement is short,
/// so requests simply serialize on the lock.
pub struct SqliteTaskStore {
    conn: Mutex<Connection>,
}

impl SqliteTaskStore {
    /// Open (or create) the database file and apply the schema
    pub fn open(path: &Path) -> Result<Self> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let conn = Connection::open(path)?;
        conn.execute(CREATE_TODOS_TABLE, [])?;
        tracing::info!("Todos table ready at {:?}", path);
        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    /// Open a throwaway in-memory database
    pub fn open_in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory()?;
        conn.execute(CREATE_TODOS_TABLE, [])?;
        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    fn lock(&self) -> Result<MutexGuard<'_, Connection>> {
        self.conn
            .lock()
            .map_err(|_| Error::Storage("todos connection lock poisoned".to_string()))
    }

    fn fetch(conn: &Connection, id: i64) -> Result<Option<Task>> {
        let sql = format!("{SELECT_COLUMNS} WHERE id = ?1");
        let task = conn
            .query_row(&sql, params![id], row_to_task)
            .optional()?;
        Ok(task)
    }
}

fn row_to_task(row: &Row<'_>) -> rusqlite::Result<Task> {
    let category: String = row.get(3)?;
    let created_at: String = row.get(4)?;
    let created_at = DateTime::parse_from_rfc3339(&created_at)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|e| rusqlite::Error::FromSqlConversionFailure(4, Type::Text, Box::new(e)))?;

    Ok(Task {
        id: TaskId::Number(row.get(0)?),
        task: row.get(1)?,
        completed: row.get(2)?,
        category: Category::from(category),
        created_at,
        updated_at: None,
        device_id: None,
        original_id: None,
    })
}

// Fixed-width RFC 3339 so that ORDER BY on the text column is chronological.
fn timestamp(now: DateTime<Utc>) -> String {
    now.to_rfc3339_opts(SecondsFormat::Micros, true)
}

#[async_trait]
impl TaskRepository for SqliteTaskStore {
    async fn create(&self, new_task: NewTask) -> Result<Task> {
        let new_task = new_task.validated()?;
        let conn = self.lock()?;
        conn.execute(
            "INSERT INTO todos (task, completed, category, created_at) VALUES (?1, ?2, ?3, ?4)",
            params![
                new_task.task,
                new_task.completed,
                new_task.category.as_str(),
                timestamp(Utc::now())
            ],
        )?;
        let id = conn.last_insert_rowid();
        tracing::debug!("Inserted todo {}", id);

        Self::fetch(&conn, id)?
            .ok_or_else(|| Error::Storage(format!("Todo {} vanished after insert", id)))
    }

    async fn get(&self, id: &TaskId) -> Result<Option<Task>> {
        let Some(id) = id.as_number() else {
            return Ok(None);
        };
        let conn = self.lock()?;
        Self::fetch(&conn, id)
    }

    async fn list(&self) -> Result<Vec<Task>> {
        let conn = self.lock()?;
        let sql = format!("{SELECT_COLUMNS} ORDER BY created_at DESC, id DESC");
        let mut stmt = conn.prepare(&sql)?;
        let rows = stmt.query_map([], row_to_task)?;

        let mut tasks = Vec::new();
        for row in rows {
            tasks.push(row?);
        }
        Ok(tasks)
    }

    async fn update(&self, id: &TaskId, patch: TaskPatch) -> Result<Task> {
        let patch = patch.validated()?;
        let numeric = id
            .as_number()
            .ok_or_else(|| Error::TaskNotFound(id.to_string()))?;

        let mut assignments = Vec::new();
        let mut values: Vec<Value> = Vec::new();
        if let Some(completed) = patch.completed {
            assignments.push("completed = ?");
            values.push(Value::Integer(i64::from(completed)));
        }
        if let Some(text) = patch.task {
            assignments.push("task = ?");
            values.push(Value::Text(text));
        }
        if let Some(category) = patch.category {
            assignments.push("category = ?");
            values.push(Value::Text(category.into()));
        }
        values.push(Value::Integer(numeric));

        let conn = self.lock()?;
        let sql = format!("UPDATE todos SET {} WHERE id = ?", assignments.join(", "));
        let changed = conn.execute(&sql, params_from_iter(values))?;
        if changed == 0 {
            return Err(Error::TaskNotFound(id.to_string()));
        }

        Self::fetch(&conn, numeric)?.ok_or_else(|| Error::TaskNotFound(id.to_string()))
    }

    async fn delete(&self, id: &TaskId) -> Result<bool> {
        let Some(id) = id.as_number() else {
            return Ok(false);
        };
        let conn = self.lock()?;
        let removed = conn.execute("DELETE FROM todos WHERE id = ?1", params![id])?;
        Ok(removed > 0)
    }

    async fn progress(&self) -> Result<Progress> {
        let conn = self.lock()?;
        let (total, completed): (i64, i64) = conn.query_row(
            "SELECT COUNT(*), COALESCE(SUM(completed), 0) FROM todos",
            [],
            |row| Ok((row.get(0)?, row.get(1)?)),
        )?;
        Ok(Progress::from_counts(total as u64, completed as u64))
    }
}
