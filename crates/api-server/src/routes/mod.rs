//! Route handlers

pub mod documents;
pub mod health;
pub mod progress;
pub mod todos;

use axum::{extract::rejection::JsonRejection, http::StatusCode, Json};
use serde::Serialize;

#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub error: String,
}

#[derive(Debug, Serialize)]
pub struct DeleteResponse<T> {
    pub message: &'static str,
    pub id: T,
}

pub type RouteError = (StatusCode, Json<ErrorResponse>);

fn route_error(status: StatusCode, error: impl Into<String>) -> RouteError {
    (
        status,
        Json(ErrorResponse {
            error: error.into(),
        }),
    )
}

pub(crate) fn bad_request(error: impl Into<String>) -> RouteError {
    route_error(StatusCode::BAD_REQUEST, error)
}

pub(crate) fn not_found() -> RouteError {
    route_error(StatusCode::NOT_FOUND, "Todo not found")
}

pub(crate) fn internal_error(error: impl std::fmt::Display) -> RouteError {
    route_error(StatusCode::INTERNAL_SERVER_ERROR, error.to_string())
}

/// Unreadable or mistyped JSON bodies
pub(crate) fn json_error(rejection: JsonRejection) -> RouteError {
    bad_request(rejection.body_text())
}

/// Parse a numeric todo id; anything else names no todo
pub(crate) fn parse_todo_id(raw: &str) -> Result<i64, RouteError> {
    raw.parse().map_err(|_| not_found())
}

/// Map a store error onto its HTTP status
pub(crate) fn store_error(err: todo_core::Error) -> RouteError {
    match err {
        todo_core::Error::InvalidInput(message) => bad_request(message),
        todo_core::Error::TaskNotFound(_) => not_found(),
        other => {
            tracing::error!("Store error: {}", other);
            internal_error(other)
        }
    }
}

#[cfg(test)]
pub(crate) mod test_util {
    use axum::body::{to_bytes, Body};
    use axum::http::{Request, Response};
    use serde_json::Value;
    use tempfile::TempDir;

    use crate::config::ServerConfig;
    use crate::state::AppState;

    pub async fn build_state() -> (AppState, TempDir) {
        let temp_dir = TempDir::new().unwrap();
        let config = ServerConfig {
            data_dir: temp_dir.path().to_path_buf(),
            ..ServerConfig::default()
        };
        let state = AppState::new(config).await.unwrap();
        (state, temp_dir)
    }

    pub fn json_request(method: &str, uri: &str, body: Value) -> Request<Body> {
        Request::builder()
            .method(method)
            .uri(uri)
            .header("Content-Type", "application/json")
            .body(Body::from(body.to_string()))
            .unwrap()
    }

    pub fn empty_request(method: &str, uri: &str) -> Request<Body> {
        Request::builder()
            .method(method)
            .uri(uri)
            .body(Body::empty())
            .unwrap()
    }

    pub async fn body_json(response: Response<Body>) -> Value {
        let body = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        serde_json::from_slice(&body).unwrap()
    }
}
