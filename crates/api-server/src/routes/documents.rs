//! Device-scoped document API
//!
//! Each device reads and writes its own collection. `GET .../stream` pushes
//! the whole ordered collection as one `data:` event on connect and again
//! after every change.

use std::convert::Infallible;

use axum::{
    extract::{rejection::JsonRejection, Path, State},
    http::StatusCode,
    response::sse::{Event, KeepAlive, Sse},
    routing::{get, patch},
    Json, Router,
};
use futures::{Stream, StreamExt};
use tokio_stream::wrappers::WatchStream;

use todo_core::document::collection_path;
use todo_core::task::{NewTask, Task, TaskPatch};

use super::{json_error, store_error, DeleteResponse, RouteError};
use crate::state::AppState;

/// GET /api/devices/{device_id}/todos
async fn list_documents(
    State(state): State<AppState>,
    Path(device_id): Path<String>,
) -> Json<Vec<Task>> {
    Json(state.document_store().list(&device_id).await)
}

/// POST /api/devices/{device_id}/todos
async fn add_document(
    State(state): State<AppState>,
    Path(device_id): Path<String>,
    payload: Result<Json<NewTask>, JsonRejection>,
) -> Result<(StatusCode, Json<Task>), RouteError> {
    let Json(new_task) = payload.map_err(json_error)?;
    let task = state
        .document_store()
        .add(&device_id, new_task)
        .await
        .map_err(store_error)?;
    tracing::info!("Added {} to {}", task.id, collection_path(&device_id));
    Ok((StatusCode::CREATED, Json(task)))
}

/// PATCH /api/devices/{device_id}/todos/{id}
async fn update_document(
    State(state): State<AppState>,
    Path((device_id, id)): Path<(String, String)>,
    payload: Result<Json<TaskPatch>, JsonRejection>,
) -> Result<Json<Task>, RouteError> {
    let Json(changes) = payload.map_err(json_error)?;
    let task = state
        .document_store()
        .update(&device_id, &id, changes)
        .await
        .map_err(store_error)?;
    Ok(Json(task))
}

/// DELETE /api/devices/{device_id}/todos/{id}
async fn delete_document(
    State(state): State<AppState>,
    Path((device_id, id)): Path<(String, String)>,
) -> Result<Json<DeleteResponse<String>>, RouteError> {
    state
        .document_store()
        .delete(&device_id, &id)
        .await
        .map_err(store_error)?;
    tracing::info!("Deleted {} from {}", id, collection_path(&device_id));
    Ok(Json(DeleteResponse {
        message: "Todo deleted successfully",
        id,
    }))
}

/// GET /api/devices/{device_id}/todos/stream
async fn stream_documents(
    State(state): State<AppState>,
    Path(device_id): Path<String>,
) -> Sse<impl Stream<Item = Result<Event, Infallible>>> {
    tracing::debug!("Subscriber attached to {}", collection_path(&device_id));
    let rx = state.document_store().watch(&device_id).await;

    let events = WatchStream::new(rx).filter_map(|tasks| async move {
        match Event::default().json_data(&tasks) {
            Ok(event) => Some(Ok(event)),
            Err(e) => {
                tracing::error!("Failed to encode snapshot: {}", e);
                None
            }
        }
    });

    Sse::new(events).keep_alive(KeepAlive::default())
}

pub fn router() -> Router<AppState> {
    Router::new()
        .route(
            "/api/devices/{device_id}/todos",
            get(list_documents).post(add_document),
        )
        .route(
            "/api/devices/{device_id}/todos/stream",
            get(stream_documents),
        )
        .route(
            "/api/devices/{device_id}/todos/{id}",
            patch(update_document).delete(delete_document),
        )
}
