use axum::{extract::State, routing::get, Json, Router};

use todo_core::task::{Progress, TaskRepository};

use super::{store_error, RouteError};
use crate::state::AppState;

/// GET /api/progress - Completion statistics
async fn get_progress(State(state): State<AppState>) -> Result<Json<Progress>, RouteError> {
    let progress = state.task_store().progress().await.map_err(store_error)?;
    Ok(Json(progress))
}

pub fn router() -> Router<AppState> {
    Router::new().route("/api/progress", get(get_progress))
}
