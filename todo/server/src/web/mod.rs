use axum::Router;
use migration::MigratorTrait;
use sea_orm::Database;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;
use tower::ServiceBuilder;
use tower_http::services::ServeDir;
use tower_http::trace::TraceLayer;

use crate::config::Config;
use crate::task::TaskState;

pub mod api;

/// Builds the complete application router: task API, OpenAPI docs, health
/// check, and static UI assets for every other path.
pub fn create_app(task_state: TaskState, static_dir: &str) -> Router {
    Router::new()
        .merge(api::create_api_router(task_state))
        .route("/health", axum::routing::get(health_check_handler))
        .fallback_service(ServeDir::new(static_dir))
        .layer(ServiceBuilder::new().layer(TraceLayer::new_for_http()))
}

#[tracing::instrument(skip(config))]
pub async fn start_web_server(config: Config) -> anyhow::Result<()> {
    let server_address = config.listen_address();
    let listener = tokio::net::TcpListener::bind(&server_address).await?;
    tracing::info!("Web server running on http://{}", server_address);

    let db = Database::connect(&config.database_url()).await?;
    migration::Migrator::up(&db, None).await?;
    tracing::info!("Database migrations applied successfully");

    let task_state = TaskState::from_db(Arc::new(db));
    let app = create_app(task_state, &config.static_dir);

    let (shutdown_sender, mut shutdown_receiver) = watch::channel(false);
    let server = axum::serve(listener, app).with_graceful_shutdown(async move {
        shutdown_signal().await;
        tracing::info!("Shutting down server...");
        let _ = shutdown_sender.send(true);
    });
    let mut server_task = tokio::spawn(async move { server.await });

    let drain_timeout = config.shutdown_timeout();
    tokio::select! {
        result = &mut server_task => {
            result??;
            tracing::info!("Server exiting");
        }
        _ = drain_deadline(&mut shutdown_receiver, drain_timeout) => {
            tracing::warn!(
                "Server forced to shutdown after {}s drain timeout",
                drain_timeout.as_secs()
            );
            server_task.abort();
        }
    }
    Ok(())
}

/// Completes `timeout` after shutdown starts. Never completes if it never starts.
async fn drain_deadline(shutdown: &mut watch::Receiver<bool>, timeout: Duration) {
    if shutdown.wait_for(|stopping| *stopping).await.is_err() {
        std::future::pending::<()>().await;
    }
    tokio::time::sleep(timeout).await;
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(err) = tokio::signal::ctrl_c().await {
            tracing::error!("Failed to listen for Ctrl+C: {}", err);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(err) => {
                tracing::error!("Failed to listen for SIGTERM: {}", err);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
}

#[tracing::instrument]
pub async fn health_check_handler() -> &'static str {
    "OK"
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::task::repository::MockTaskStore;
    use axum::body::Body;
    use axum::http::{Request, StatusCode};
    use tower::ServiceExt;

    fn test_app() -> Router {
        let task_state = TaskState {
            store: Arc::new(MockTaskStore::new()),
        };
        create_app(task_state, "static")
    }

    #[tokio::test]
    async fn can_check_health_endpoint() {
        let response = test_app()
            .oneshot(
                Request::builder()
                    .uri("/health")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        let body = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        assert_eq!(&body[..], b"OK");
    }

    #[tokio::test]
    async fn can_serve_openapi_document() {
        let response = test_app()
            .oneshot(
                Request::builder()
                    .uri("/api-docs/openapi.json")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        let body = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        let document: serde_json::Value = serde_json::from_slice(&body).unwrap();
        assert!(document["paths"]["/api/tasks"]["get"].is_object());
        assert!(document["paths"]["/api/tasks/create"]["post"].is_object());
    }

    #[tokio::test]
    async fn can_fall_back_to_not_found_for_missing_static_asset() {
        let response = test_app()
            .oneshot(
                Request::builder()
                    .uri("/no-such-asset.js")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }

    #[tokio::test(start_paused = true)]
    async fn can_wait_for_drain_timeout_after_shutdown_starts() {
        let (sender, mut receiver) = watch::channel(false);
        let deadline = tokio::spawn(async move {
            drain_deadline(&mut receiver, Duration::from_secs(30)).await;
        });

        tokio::time::sleep(Duration::from_secs(60)).await;
        assert!(!deadline.is_finished());

        sender.send(true).unwrap();
        tokio::time::sleep(Duration::from_secs(31)).await;
        assert!(deadline.is_finished());
    }
}
