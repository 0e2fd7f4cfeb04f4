//! Upload file server
//!
//! Serves the uploads directory under `/uploads` so links recorded in the
//! conversation resolve, plus a plain-text liveness route at `/`.

use axum::{routing::get, Router};
use sdk::errors::EngineError;
use std::net::SocketAddr;
use std::path::Path;
use tokio::sync::oneshot;
use tower_http::services::ServeDir;

use crate::config::ServerConfig;

pub const STATUS_TEXT: &str = "Parley bridge is running!";

pub fn build_router(uploads_dir: &Path) -> Router {
    Router::new()
        .route("/", get(index_handler))
        .nest_service("/uploads", ServeDir::new(uploads_dir))
}

async fn index_handler() -> &'static str {
    STATUS_TEXT
}

/// Bind the server and spawn it on the runtime
///
/// Returns the bound address and a sender that stops the server when fired
/// or dropped.
pub async fn spawn(config: &ServerConfig) -> Result<(SocketAddr, oneshot::Sender<()>), EngineError> {
    let listener = tokio::net::TcpListener::bind(("0.0.0.0", config.port))
        .await
        .map_err(|e| EngineError::Network(format!("Failed to bind port {}: {}", config.port, e)))?;
    let addr = listener
        .local_addr()
        .map_err(|e| EngineError::Network(format!("Failed to get local address: {}", e)))?;

    let app = build_router(&config.uploads_dir);
    let (shutdown_tx, shutdown_rx) = oneshot::channel::<()>();

    tokio::spawn(async move {
        tracing::info!("File server listening on http://{}", addr);

        axum::serve(listener, app)
            .with_graceful_shutdown(async move {
                shutdown_rx.await.ok();
                tracing::info!("File server shutting down gracefully");
            })
            .await
            .unwrap_or_else(|e| {
                tracing::error!("File server error: {}", e);
            });
    });

    Ok((addr, shutdown_tx))
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::{to_bytes, Body};
    use axum::http::{Request, StatusCode};
    use tempfile::TempDir;
    use tower::ServiceExt;

    #[tokio::test]
    async fn test_index_route() {
        let dir = TempDir::new().unwrap();
        let response = build_router(dir.path())
            .oneshot(Request::builder().uri("/").body(Body::empty()).unwrap())
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        let body = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        assert_eq!(&body[..], STATUS_TEXT.as_bytes());
    }

    #[tokio::test]
    async fn test_serves_uploads() {
        let dir = TempDir::new().unwrap();
        std::fs::write(dir.path().join("notes_1.txt"), "hello upload").unwrap();

        let response = build_router(dir.path())
            .oneshot(
                Request::builder()
                    .uri("/uploads/notes_1.txt")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        let body = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        assert_eq!(&body[..], b"hello upload");
    }

    #[tokio::test]
    async fn test_missing_upload_is_404() {
        let dir = TempDir::new().unwrap();
        let response = build_router(dir.path())
            .oneshot(
                Request::builder()
                    .uri("/uploads/nope.txt")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }
}
