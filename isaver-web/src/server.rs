//! Web server wiring for Isaver.
//!
//! Builds the router and application state. The media provider and muxer
//! are trait objects chosen once at startup from the runtime mode, so every
//! handler runs the same orchestration code in production and development.

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Instant;

use axum::Router;
use axum::extract::State;
use axum::response::{IntoResponse, Json};
use axum::routing::get;
use isaver_core::{
    ConcatMuxer, FfmpegMuxer, IsaverConfig, MediaProvider, Muxer, RuntimeMode, SimulatedProvider,
    YtDlpProvider,
};
use tower_http::cors::CorsLayer;

use crate::handlers::{index, submit};

/// Demo source registered in development mode.
pub const DEVELOPMENT_SOURCE: &str = "https://example.com/watch?v=demo";

/// Shared application state for all handlers.
#[derive(Clone)]
pub struct AppState {
    pub provider: Arc<dyn MediaProvider>,
    pub muxer: Arc<dyn Muxer>,
    pub config: Arc<IsaverConfig>,
    pub mode: RuntimeMode,
    pub started_at: Instant,
}

impl AppState {
    /// Assembles state with provider and muxer selected by runtime mode.
    ///
    /// # Errors
    ///
    /// - `Box<dyn std::error::Error>` - Production collaborators could not
    ///   be constructed
    pub fn from_mode(
        config: IsaverConfig,
        mode: RuntimeMode,
    ) -> Result<Self, Box<dyn std::error::Error>> {
        let (provider, muxer): (Arc<dyn MediaProvider>, Arc<dyn Muxer>) = match mode {
            RuntimeMode::Production => {
                let provider = YtDlpProvider::new(config.fetch.clone(), &config.network)?;
                if !provider.is_available() {
                    tracing::warn!(
                        "yt-dlp not found at {}; probes will fail",
                        config.fetch.ytdlp_path.display()
                    );
                }
                let muxer = FfmpegMuxer::new(config.mux.clone());
                if !muxer.is_available() {
                    tracing::warn!(
                        "ffmpeg not found at {}; muxing will fail",
                        config.mux.ffmpeg_path.display()
                    );
                }
                (Arc::new(provider), Arc::new(muxer))
            }
            RuntimeMode::Development => (
                Arc::new(SimulatedProvider::new().with_default_catalog(DEVELOPMENT_SOURCE)),
                Arc::new(ConcatMuxer::new()),
            ),
        };

        Ok(Self {
            provider,
            muxer,
            config: Arc::new(config),
            mode,
            started_at: Instant::now(),
        })
    }

    /// State with explicit collaborators, for tests.
    pub fn with_components(
        config: IsaverConfig,
        provider: Arc<dyn MediaProvider>,
        muxer: Arc<dyn Muxer>,
    ) -> Self {
        Self {
            provider,
            muxer,
            config: Arc::new(config),
            mode: RuntimeMode::Development,
            started_at: Instant::now(),
        }
    }
}

/// Builds the application router.
pub fn build_router(state: AppState) -> Router {
    Router::new()
        .route("/", get(index).post(submit))
        .route("/health", get(health))
        .layer(CorsLayer::permissive())
        .with_state(state)
}

/// JSON liveness document.
async fn health(State(state): State<AppState>) -> impl IntoResponse {
    Json(serde_json::json!({
        "status": "healthy",
        "mode": state.mode.to_string(),
        "uptime_seconds": state.started_at.elapsed().as_secs(),
    }))
}

/// Runs the server until the listener fails.
///
/// # Errors
///
/// - `Box<dyn std::error::Error>` - Bind failure or fatal serve error
pub async fn run_server(
    config: IsaverConfig,
    mode: RuntimeMode,
    bind: SocketAddr,
) -> Result<(), Box<dyn std::error::Error>> {
    let state = AppState::from_mode(config, mode)?;
    let app = build_router(state);

    println!("Isaver download server running on http://{bind} ({mode})");
    let listener = tokio::net::TcpListener::bind(bind).await?;
    axum::serve(listener, app).await?;
    Ok(())
}
