//! API Server for Bunny Todo
//!
//! Serves the REST todo API backed by SQLite and, unless disabled, the
//! device-scoped document API with live snapshot streams.

mod config;
mod routes;
mod state;

use std::net::SocketAddr;

use anyhow::Context;
use axum::Router;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use crate::config::ServerConfig;
use crate::state::AppState;

fn build_router(state: AppState) -> Router {
    let mut router = Router::new()
        .merge(routes::health::router())
        .merge(routes::todos::router())
        .merge(routes::progress::router());

    if state.config().documents_enabled {
        router = router.merge(routes::documents::router());
    }

    router
        .with_state(state)
        .layer(
            CorsLayer::new()
                .allow_origin(Any)
                .allow_methods(Any)
                .allow_headers(Any),
        )
        .layer(TraceLayer::new_for_http())
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| {
                "todo_server=debug,todo_core=info,tower_http=debug".into()
            }),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config = ServerConfig::from_env();
    tracing::info!("Using data directory: {:?}", config.data_dir);
    if !config.documents_enabled {
        tracing::info!("Document API disabled");
    }

    let port = config.port;
    let state = AppState::new(config)
        .await
        .context("Failed to initialize application state")?;
    let app = build_router(state);

    // Bind to 0.0.0.0 for localhost/127.0.0.1 compatibility
    let addr = SocketAddr::from(([0, 0, 0, 0], port));
    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("Failed to bind {}", addr))?;

    tracing::info!("Bunny Todo API listening on {}", addr);
    axum::serve(listener, app).await?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use axum::http::StatusCode;
    use tempfile::TempDir;
    use tower::ServiceExt;

    use super::*;
    use crate::routes::test_util::empty_request;

    async fn app_with(documents_enabled: bool) -> (Router, TempDir) {
        let temp_dir = TempDir::new().unwrap();
        let config = ServerConfig {
            data_dir: temp_dir.path().to_path_buf(),
            documents_enabled,
            ..ServerConfig::default()
        };
        let state = AppState::new(config).await.unwrap();
        (build_router(state), temp_dir)
    }

    #[tokio::test]
    async fn document_routes_follow_flag() {
        let (app, _tmp) = app_with(true).await;
        let response = app
            .oneshot(empty_request("GET", "/api/devices/d1/todos"))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);

        let (app, _tmp) = app_with(false).await;
        let response = app
            .oneshot(empty_request("GET", "/api/devices/d1/todos"))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn cors_allows_any_origin() {
        let (app, _tmp) = app_with(true).await;
        let request = axum::http::Request::builder()
            .uri("/api/todos")
            .header("Origin", "http://example.com")
            .body(axum::body::Body::empty())
            .unwrap();

        let response = app.oneshot(request).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(
            response.headers()["access-control-allow-origin"],
            "*"
        );
    }
}
