//! search-chat HTTP Server
//!
//! Axum server holding per-browser chat sessions. Each question runs a
//! zero-shot ReAct agent over Groq with web, arXiv and Wikipedia lookups.

mod config;
mod dispatch;
mod handlers;
mod state;

use std::sync::Arc;
use std::time::Duration;

use axum::{
    Router,
    routing::{get, post, put},
};
use tower_http::{
    cors::{Any, CorsLayer},
    services::ServeDir,
    trace::TraceLayer,
};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use chat_core::SessionStore;

use crate::config::ServerConfig;
use crate::dispatch::ReactDispatcher;
use crate::handlers::{
    chat_handler, chat_stream_handler, create_session, delete_session, get_session, health_check,
    reset_session, submit_feedback, update_settings,
};
use crate::state::AppState;

/// Build the router over shared state
pub fn app(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    let static_files = ServeDir::new(&state.config.static_dir);

    Router::new()
        // Health
        .route("/health", get(health_check))
        // Sessions
        .route("/api/sessions", post(create_session))
        .route("/api/sessions/{id}", get(get_session).delete(delete_session))
        .route("/api/sessions/{id}/settings", put(update_settings))
        .route("/api/sessions/{id}/reset", post(reset_session))
        .route("/api/sessions/{id}/feedback", post(submit_feedback))
        // Agent
        .route("/api/sessions/{id}/chat", post(chat_handler))
        .route("/api/sessions/{id}/stream", get(chat_stream_handler))
        // Static files (WASM frontend)
        .fallback_service(static_files)
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// Periodically drop sessions nobody has touched for `max_idle`
fn spawn_janitor(sessions: Arc<SessionStore>, max_idle: Duration) {
    let period = max_idle.min(Duration::from_secs(60)).max(Duration::from_secs(1));
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(period);
        loop {
            ticker.tick().await;
            let pruned = sessions.prune_idle(max_idle).await;
            if pruned > 0 {
                let remaining = sessions.len().await;
                tracing::info!(pruned, remaining, "Pruned idle sessions");
            }
        }
    });
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::new(
            std::env::var("RUST_LOG").unwrap_or_else(|_| "info,tower_http=debug".into()),
        ))
        .with(tracing_subscriber::fmt::layer())
        .init();

    // Load environment
    dotenvy::dotenv().ok();

    let config = ServerConfig::from_env()?;

    if config.default_api_key.is_some() {
        tracing::info!("✓ GROQ_API_KEY set - new sessions start with it");
    } else {
        tracing::info!("No GROQ_API_KEY set - users enter their own key");
    }
    tracing::info!(model = %config.groq.model, base_url = %config.groq.base_url, "Groq endpoint");

    let dispatcher = Arc::new(ReactDispatcher::new(&config)?);
    let session_idle = config.session_idle;
    let addr = config.bind_addr.clone();

    let state = AppState::new(dispatcher, config);
    spawn_janitor(Arc::clone(&state.sessions), session_idle);

    let app = app(state);

    // Start server
    let listener = tokio::net::TcpListener::bind(&addr).await?;

    tracing::info!("══════════════════════════════════════════════════");
    tracing::info!("🔎 search-chat server running on http://{}", addr);
    tracing::info!("══════════════════════════════════════════════════");
    tracing::info!("Endpoints:");
    tracing::info!("  GET    /health                       - Health check");
    tracing::info!("  POST   /api/sessions                 - Start a session");
    tracing::info!("  GET    /api/sessions/{{id}}            - Session view");
    tracing::info!("  DELETE /api/sessions/{{id}}            - End a session");
    tracing::info!("  PUT    /api/sessions/{{id}}/settings   - API key / result count");
    tracing::info!("  POST   /api/sessions/{{id}}/chat       - Ask a question");
    tracing::info!("  GET    /api/sessions/{{id}}/stream     - WebSocket with agent progress");
    tracing::info!("  POST   /api/sessions/{{id}}/reset      - Clear chat history");
    tracing::info!("  POST   /api/sessions/{{id}}/feedback   - Submit feedback");

    axum::serve(listener, app).await?;

    Ok(())
}
