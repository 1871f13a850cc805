//! Bulk import and export between local storage and a remote collection

use std::collections::HashSet;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use todo_core::local::LocalTaskStore;
use todo_core::task::{NewTask, Task};

use crate::error::{Result, SyncError};
use crate::remote::RemoteTaskStore;

/// Outcome of [`import_from_local`]
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct ImportReport {
    pub imported: usize,
    pub skipped: usize,
}

/// Downloadable snapshot of a remote collection
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExportDocument {
    pub exported_at: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub device_id: Option<String>,
    pub count: usize,
    pub tasks: Vec<Task>,
}

impl ExportDocument {
    pub fn new(device_id: Option<&str>, tasks: Vec<Task>) -> Self {
        Self {
            exported_at: Utc::now(),
            device_id: device_id.map(str::to_string),
            count: tasks.len(),
            tasks,
        }
    }

    pub fn to_json(&self) -> Result<String> {
        serde_json::to_string_pretty(self).map_err(|e| SyncError::Local(e.into()))
    }

    /// Suggested download name, e.g. `bunny-todos-2024-05-01.json`
    pub fn file_name(&self) -> String {
        format!("bunny-todos-{}.json", self.exported_at.format("%Y-%m-%d"))
    }
}

/// Copy every locally cached task into `remote`
///
/// Tasks whose local id already shows up as an `original_id` remotely were
/// imported before and are skipped, as are records with invalid text. Local
/// storage is cleared only when every copy succeeded.
pub async fn import_from_local(
    remote: &dyn RemoteTaskStore,
    local: &LocalTaskStore,
) -> Result<ImportReport> {
    let pending = local.load_all().await;
    if pending.is_empty() {
        return Ok(ImportReport::default());
    }

    let existing = remote.list().await?;
    let already: HashSet<String> = existing
        .iter()
        .filter_map(|t| t.original_id.as_ref())
        .map(ToString::to_string)
        .collect();

    let mut report = ImportReport::default();
    for task in &pending {
        if already.contains(&task.id.to_string()) {
            report.skipped += 1;
            continue;
        }

        let new_task = match NewTask::from_local(task).validated() {
            Ok(new_task) => new_task,
            Err(e) => {
                warn!("Skipping local todo {}: {}", task.id, e);
                report.skipped += 1;
                continue;
            }
        };

        remote.create(&new_task).await?;
        report.imported += 1;
    }

    if !local.clear().await {
        warn!("Imported todos but could not clear local storage");
    }

    info!(
        "Imported {} local todos into {} ({} skipped)",
        report.imported,
        remote.name(),
        report.skipped
    );
    Ok(report)
}

/// Read the whole remote collection into an [`ExportDocument`]
pub async fn export(remote: &dyn RemoteTaskStore, device_id: Option<&str>) -> Result<ExportDocument> {
    let tasks = remote.list().await?;
    Ok(ExportDocument::new(device_id, tasks))
}
