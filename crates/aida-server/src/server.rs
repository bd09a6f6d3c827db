//! `AidaServer`: router construction and the listening task.

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Instant;

use aida_runtime::TurnOrchestrator;
use axum::Router;
use axum::extract::{DefaultBodyLimit, State};
use axum::http::{StatusCode, header};
use axum::response::{IntoResponse, Json, Response};
use axum::routing::{get, post};
use metrics_exporter_prometheus::PrometheusHandle;
use tokio::task::JoinHandle;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use tracing::{error, info};

use crate::config::ServerConfig;
use crate::health::{self, HealthResponse};
use crate::push::PushRegistry;
use crate::routes::chat::chat_handler;
use crate::routes::push::{send_handler, subscribe_handler, unsubscribe_handler};
use crate::shutdown::ShutdownCoordinator;
use crate::webpush::PushSender;

/// Shared state accessible from Axum handlers.
#[derive(Clone)]
pub struct AppState {
    /// Turn pipeline.
    pub orchestrator: Arc<TurnOrchestrator>,
    /// Push subscriptions.
    pub push: Arc<PushRegistry>,
    /// Push delivery, absent when VAPID credentials are not configured.
    pub push_sender: Option<Arc<dyn PushSender>>,
    /// When the server started.
    pub start_time: Instant,
    /// Prometheus handle, when a recorder is installed.
    pub metrics: Option<PrometheusHandle>,
}

/// The AIDA HTTP server.
pub struct AidaServer {
    config: ServerConfig,
    state: AppState,
    shutdown: Arc<ShutdownCoordinator>,
}

impl AidaServer {
    /// Create a server around an orchestrator.
    pub fn new(
        config: ServerConfig,
        orchestrator: Arc<TurnOrchestrator>,
        metrics: Option<PrometheusHandle>,
    ) -> Self {
        Self {
            config,
            state: AppState {
                orchestrator,
                push: Arc::new(PushRegistry::new()),
                push_sender: None,
                start_time: Instant::now(),
                metrics,
            },
            shutdown: Arc::new(ShutdownCoordinator::new()),
        }
    }

    /// Enable `POST /api/push/send`.
    #[must_use]
    pub fn with_push_sender(mut self, sender: Arc<dyn PushSender>) -> Self {
        self.state.push_sender = Some(sender);
        self
    }

    /// Build the Axum router with all routes.
    pub fn router(&self) -> Router {
        Router::new()
            .route("/api/chat", post(chat_handler))
            .route("/api/push/subscribe", post(subscribe_handler))
            .route("/api/push/unsubscribe", post(unsubscribe_handler))
            .route("/api/push/send", post(send_handler))
            .route("/health", get(health_handler))
            .route("/metrics", get(metrics_handler))
            .layer(DefaultBodyLimit::max(self.config.max_body_bytes))
            .layer(TraceLayer::new_for_http())
            .layer(CorsLayer::permissive())
            .with_state(self.state.clone())
    }

    /// Bind and serve until the shutdown token is cancelled.
    ///
    /// Returns the bound address and the serving task.
    pub async fn listen(&self) -> std::io::Result<(SocketAddr, JoinHandle<()>)> {
        let listener = tokio::net::TcpListener::bind(self.config.bind_addr()).await?;
        let addr = listener.local_addr()?;
        let router = self.router();
        let token = self.shutdown.token();

        info!(%addr, "AIDA server listening");

        let handle = tokio::spawn(async move {
            let result = axum::serve(listener, router)
                .with_graceful_shutdown(async move { token.cancelled().await })
                .await;
            if let Err(e) = result {
                error!(error = %e, "server terminated with error");
            }
        });
        Ok((addr, handle))
    }

    /// Shared handler state.
    pub fn state(&self) -> &AppState {
        &self.state
    }

    /// Get the shutdown coordinator.
    pub fn shutdown(&self) -> &Arc<ShutdownCoordinator> {
        &self.shutdown
    }

    /// Get the server configuration.
    pub fn config(&self) -> &ServerConfig {
        &self.config
    }
}

/// GET /health
async fn health_handler(State(state): State<AppState>) -> Json<HealthResponse> {
    Json(health::health_check(state.start_time))
}

/// GET /metrics
async fn metrics_handler(State(state): State<AppState>) -> Response {
    match &state.metrics {
        Some(handle) => (
            [(header::CONTENT_TYPE, "text/plain; version=0.0.4")],
            crate::metrics::render(handle),
        )
            .into_response(),
        None => (StatusCode::NOT_FOUND, "metrics recorder not installed").into_response(),
    }
}
