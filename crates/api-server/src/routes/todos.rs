//! Todo API endpoints
//!
//! CRUD over the SQLite-backed todo list.

use axum::{
    extract::{rejection::JsonRejection, Path, State},
    http::StatusCode,
    routing::{get, put},
    Json, Router,
};
use serde::Deserialize;

use todo_core::task::{Category, NewTask, Task, TaskId, TaskPatch, TaskRepository};

use super::{json_error, not_found, parse_todo_id, store_error, DeleteResponse, RouteError};
use crate::state::AppState;

#[derive(Debug, Deserialize)]
pub struct CreateTodoRequest {
    #[serde(default)]
    pub task: String,
    #[serde(default)]
    pub category: Option<Category>,
}

/// GET /api/todos - List todos, newest first
async fn list_todos(State(state): State<AppState>) -> Result<Json<Vec<Task>>, RouteError> {
    let todos = state.task_store().list().await.map_err(store_error)?;
    Ok(Json(todos))
}

/// POST /api/todos - Create a todo
async fn create_todo(
    State(state): State<AppState>,
    payload: Result<Json<CreateTodoRequest>, JsonRejection>,
) -> Result<(StatusCode, Json<Task>), RouteError> {
    let Json(req) = payload.map_err(json_error)?;
    let new_task =
        NewTask::new(&req.task, req.category.unwrap_or_default()).map_err(store_error)?;
    let created = state.task_store().create(new_task).await.map_err(store_error)?;
    tracing::info!("Created todo {}", created.id);
    Ok((StatusCode::CREATED, Json(created)))
}

/// PUT /api/todos/{id} - Update any of completed, task, category
async fn update_todo(
    State(state): State<AppState>,
    Path(id): Path<String>,
    payload: Result<Json<TaskPatch>, JsonRejection>,
) -> Result<Json<Task>, RouteError> {
    let id = parse_todo_id(&id)?;
    let Json(patch) = payload.map_err(json_error)?;
    let updated = state
        .task_store()
        .update(&TaskId::Number(id), patch)
        .await
        .map_err(store_error)?;
    Ok(Json(updated))
}

/// DELETE /api/todos/{id}
async fn delete_todo(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<DeleteResponse<i64>>, RouteError> {
    let id = parse_todo_id(&id)?;
    let removed = state
        .task_store()
        .delete(&TaskId::Number(id))
        .await
        .map_err(store_error)?;
    if !removed {
        return Err(not_found());
    }

    tracing::info!("Deleted todo {}", id);
    Ok(Json(DeleteResponse {
        message: "Todo deleted successfully",
        id,
    }))
}

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/api/todos", get(list_todos).post(create_todo))
        .route("/api/todos/{id}", put(update_todo).delete(delete_todo))
}
