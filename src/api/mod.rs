//! HTTP API server for the voice assistant

pub mod assist;
pub mod audio;
pub mod health;

pub use assist::{AssistError, AssistResponse, EMPTY_TRANSCRIPT_MESSAGE};
pub use audio::AudioStore;

use std::sync::Arc;

use axum::extract::DefaultBodyLimit;
use axum::http::{HeaderValue, Method};
use axum::Router;
use tokio::net::TcpListener;
use tower_http::cors::{AllowOrigin, Any, CorsLayer};
use tower_http::trace::TraceLayer;

use crate::audio::DEFAULT_MAX_AUDIO_BYTES;
use crate::config::{AudioTransport, Config};
use crate::pipeline::RequestPipeline;
use crate::Result;

/// Headroom for base64 expansion and multipart framing
const BODY_OVERHEAD_BYTES: usize = 64 * 1024;

/// Shared state for API handlers
#[derive(Clone)]
pub struct ApiState {
    pub pipeline: Arc<RequestPipeline>,
    pub audio_transport: AudioTransport,
    /// Holds reference-mode audio; unused in inline mode
    pub audio_store: AudioStore,
}

/// Configuration for building an API server
pub struct ApiServerBuilder {
    pipeline: Arc<RequestPipeline>,
    port: u16,
    cors_origins: Vec<String>,
    audio_transport: AudioTransport,
    audio_cache_size: usize,
    max_audio_bytes: usize,
}

impl ApiServerBuilder {
    /// Create a new API server builder
    #[must_use]
    pub fn new(pipeline: RequestPipeline) -> Self {
        Self {
            pipeline: Arc::new(pipeline),
            port: 8000,
            cors_origins: Vec::new(),
            audio_transport: AudioTransport::Inline,
            audio_cache_size: 64,
            max_audio_bytes: DEFAULT_MAX_AUDIO_BYTES,
        }
    }

    /// Apply the server section of the configuration
    #[must_use]
    pub fn server_config(mut self, config: &Config) -> Self {
        let server = &config.server;
        self.port = server.port;
        self.cors_origins.clone_from(&server.cors_origins);
        self.audio_transport = server.audio_transport;
        self.audio_cache_size = server.audio_cache_size;
        self.max_audio_bytes = server.max_audio_bytes;
        self
    }

    /// Set the listening port
    #[must_use]
    pub const fn port(mut self, port: u16) -> Self {
        self.port = port;
        self
    }

    /// Restrict cross-origin access; empty allows any origin
    #[must_use]
    pub fn cors_origins(mut self, origins: Vec<String>) -> Self {
        self.cors_origins = origins;
        self
    }

    /// Choose how reply audio is returned
    #[must_use]
    pub const fn audio_transport(mut self, transport: AudioTransport) -> Self {
        self.audio_transport = transport;
        self
    }

    /// Number of reference-mode clips kept for fetching
    #[must_use]
    pub const fn audio_cache_size(mut self, size: usize) -> Self {
        self.audio_cache_size = size;
        self
    }

    /// Largest accepted inbound audio
    #[must_use]
    pub const fn max_audio_bytes(mut self, bytes: usize) -> Self {
        self.max_audio_bytes = bytes;
        self
    }

    /// Build the API server
    #[must_use]
    pub fn build(self) -> ApiServer {
        let state = Arc::new(ApiState {
            pipeline: self.pipeline,
            audio_transport: self.audio_transport,
            audio_store: AudioStore::new(self.audio_cache_size),
        });

        ApiServer {
            state,
            port: self.port,
            cors_origins: self.cors_origins,
            body_limit: body_limit(self.max_audio_bytes),
        }
    }
}

/// Base64 inflates by 4/3
const fn body_limit(max_audio_bytes: usize) -> usize {
    max_audio_bytes
        .saturating_div(3)
        .saturating_mul(4)
        .saturating_add(BODY_OVERHEAD_BYTES)
}

/// API server
pub struct ApiServer {
    state: Arc<ApiState>,
    port: u16,
    cors_origins: Vec<String>,
    body_limit: usize,
}

impl ApiServer {
    /// Shared handler state
    #[must_use]
    pub fn state(&self) -> Arc<ApiState> {
        self.state.clone()
    }

    /// Build the router with all routes
    #[must_use]
    pub fn router(&self) -> Router {
        Router::new()
            .merge(assist::router(self.state.clone()))
            .nest("/api/audio", audio::router(self.state.clone()))
            .merge(health::router())
            .merge(health::ready_router(self.state.clone()))
            .layer(DefaultBodyLimit::max(self.body_limit))
            .layer(self.cors())
            .layer(TraceLayer::new_for_http())
    }

    /// CORS layer for cross-origin requests from the frontend
    fn cors(&self) -> CorsLayer {
        if self.cors_origins.is_empty() {
            return CorsLayer::new()
                .allow_origin(Any)
                .allow_methods(Any)
                .allow_headers(Any);
        }

        let origins: Vec<HeaderValue> = self
            .cors_origins
            .iter()
            .filter_map(|origin| match HeaderValue::from_str(origin) {
                Ok(value) => Some(value),
                Err(e) => {
                    tracing::warn!(origin, error = %e, "ignoring invalid CORS origin");
                    None
                }
            })
            .collect();

        CorsLayer::new()
            .allow_origin(AllowOrigin::list(origins))
            .allow_methods([Method::GET, Method::POST, Method::OPTIONS])
            .allow_headers(Any)
    }

    /// Run the API server
    ///
    /// # Errors
    ///
    /// Returns error if server fails to bind or run
    pub async fn run(self) -> Result<()> {
        let addr = format!("0.0.0.0:{}", self.port);
        let listener = TcpListener::bind(&addr)
            .await
            .map_err(|e| crate::Error::Config(format!("failed to bind API server: {e}")))?;

        tracing::info!(
            port = self.port,
            cors = if self.cors_origins.is_empty() { "any" } else { "allow-list" },
            "API server listening"
        );

        axum::serve(listener, self.router())
            .with_graceful_shutdown(shutdown_signal())
            .await
            .map_err(|e| crate::Error::Config(format!("API server error: {e}")))?;

        tracing::info!("API server stopped");
        Ok(())
    }

    /// Run the API server in a background task
    #[must_use]
    pub fn spawn(self) -> tokio::task::JoinHandle<Result<()>> {
        tokio::spawn(async move { self.run().await })
    }
}

async fn shutdown_signal() {
    if tokio::signal::ctrl_c().await.is_ok() {
        tracing::info!("received ctrl-c, shutting down");
    }
}
