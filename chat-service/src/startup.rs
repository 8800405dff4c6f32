//! Application startup and lifecycle management.
//!
//! Builds the shared state, the HTTP router and the listener for the chat
//! service.

use crate::config::ChatConfig;
use crate::handlers::{
    chat::{chat, method_not_allowed, preflight},
    health::{health_check, metrics_endpoint},
};
use crate::middleware::metrics::metrics_middleware;
use crate::services::metrics::init_metrics;
use crate::services::providers::gemini::{GeminiConfig, GeminiTextProvider};
use crate::services::providers::TextProvider;
use axum::{
    middleware::from_fn,
    routing::{get, post},
    Router,
};
use service_core::error::AppError;
use service_core::middleware::{
    cors::cors_headers_middleware,
    tracing::{make_request_span, request_id_middleware},
};
use std::sync::Arc;
use tokio::net::TcpListener;
use tokio::signal;
use tower_http::trace::TraceLayer;

/// Path of the chat endpoint.
pub const CHAT_PATH: &str = "/api/chat";

/// Shared application state.
#[derive(Clone)]
pub struct AppState {
    pub config: ChatConfig,
    /// `None` when no API key is configured.
    pub text_provider: Option<Arc<dyn TextProvider>>,
}

impl AppState {
    /// Build state from configuration, wiring the Gemini provider when a key is present.
    pub fn from_config(config: ChatConfig) -> Result<Self, AppError> {
        let text_provider: Option<Arc<dyn TextProvider>> =
            match GeminiConfig::from_settings(&config.gemini) {
                Some(gemini_config) => {
                    let provider = GeminiTextProvider::new(gemini_config).map_err(|e| {
                        tracing::error!("Failed to build Gemini HTTP client: {}", e);
                        AppError::InternalError(anyhow::anyhow!(e))
                    })?;
                    tracing::info!(
                        model = %config.gemini.model,
                        timeout_secs = config.gemini.request_timeout.as_secs(),
                        "Initialized Gemini text provider"
                    );
                    Some(Arc::new(provider))
                }
                None => {
                    tracing::warn!(
                        "GEMINI_API_KEY is not set; chat requests will fail until it is configured"
                    );
                    None
                }
            };

        Ok(Self {
            config,
            text_provider,
        })
    }

    /// State with an explicit provider, for tests and alternative backends.
    pub fn with_provider(config: ChatConfig, text_provider: Option<Arc<dyn TextProvider>>) -> Self {
        Self {
            config,
            text_provider,
        }
    }
}

/// Build the HTTP router.
pub fn build_router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health_check))
        .route("/metrics", get(metrics_endpoint))
        .route(
            CHAT_PATH,
            post(chat).options(preflight).fallback(method_not_allowed),
        )
        .layer(from_fn(metrics_middleware))
        .layer(from_fn(cors_headers_middleware))
        .layer(TraceLayer::new_for_http().make_span_with(make_request_span::<axum::body::Body>))
        .layer(from_fn(request_id_middleware))
        .with_state(state)
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            tracing::error!("Failed to install Ctrl+C handler: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            }
            Err(e) => {
                tracing::error!("Failed to install SIGTERM handler: {}", e);
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

    tracing::info!("Shutdown signal received");
}

/// Application container for managing server lifecycle.
pub struct Application {
    port: u16,
    listener: TcpListener,
    router: Router,
}

impl Application {
    /// Build the application with the given configuration.
    pub async fn build(config: ChatConfig) -> Result<Self, AppError> {
        init_metrics();

        let addr = config.common.bind_address();
        let state = AppState::from_config(config)?;
        Self::build_with_state(addr, state).await
    }

    /// Bind a listener for prebuilt state (port 0 = random port for testing).
    pub async fn build_with_state(
        addr: std::net::SocketAddr,
        state: AppState,
    ) -> Result<Self, AppError> {
        let listener = TcpListener::bind(addr).await.map_err(|e| {
            tracing::error!("Failed to bind HTTP listener to {}: {}", addr, e);
            AppError::from(e)
        })?;
        let port = listener.local_addr()?.port();

        tracing::info!("Chat service listening on port {}", port);

        Ok(Self {
            port,
            listener,
            router: build_router(state),
        })
    }

    /// Get the port the server is listening on.
    pub fn port(&self) -> u16 {
        self.port
    }

    /// Run the application until a shutdown signal arrives.
    pub async fn run_until_stopped(self) -> std::io::Result<()> {
        axum::serve(self.listener, self.router)
            .with_graceful_shutdown(shutdown_signal())
            .await
            .map_err(|e| {
                tracing::error!("HTTP server error: {}", e);
                e
            })
    }
}
