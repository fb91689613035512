//! `toolrelay serve`: HTTP surface for the relay.
//!
//! Routes:
//! - `POST /api/chat`: run one request, streamed back as Server-Sent Events
//! - `GET /api/conversation/:id`: fetch a finished conversation record
//! - everything else: static files from the configured directory
//!
//! Each chat request gets its own orchestrator run on a spawned task. The SSE
//! body drains the run's event channel; dropping the body (client gone)
//! closes the channel and the run aborts.

use std::convert::Infallible;
use std::net::SocketAddr;
use std::path::Path;
use std::sync::Arc;

use anyhow::{Context, Result};
use axum::body::Bytes;
use axum::extract::{Path as UrlPath, State};
use axum::http::{HeaderName, HeaderValue, StatusCode};
use axum::response::sse::{Event, Sse};
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use futures_util::stream;
use serde_json::{json, Value};
use tower_http::cors::CorsLayer;
use tower_http::services::ServeDir;
use tower_http::trace::TraceLayer;
use tracing::{debug, error, info};

use toolrelay_agent::events::{channel, DEFAULT_CHANNEL_CAPACITY};
use toolrelay_agent::StreamOrchestrator;

use crate::helpers;

/// Shared state handed to every handler.
#[derive(Clone)]
struct AppState {
    orchestrator: Arc<StreamOrchestrator>,
}

/// Build the application router.
pub fn router(orchestrator: Arc<StreamOrchestrator>, static_dir: &Path) -> Router {
    Router::new()
        .route("/api/chat", post(chat))
        .route("/api/conversation/:id", get(conversation))
        .fallback_service(ServeDir::new(static_dir))
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http())
        .with_state(AppState { orchestrator })
}

/// Bind and serve until Ctrl+C.
pub async fn run(
    orchestrator: StreamOrchestrator,
    host: &str,
    port: u16,
    static_dir: &str,
) -> Result<()> {
    let static_dir = helpers::expand_tilde(static_dir);
    let addr: SocketAddr = format!("{host}:{port}")
        .parse()
        .with_context(|| format!("invalid listen address {host}:{port}"))?;

    helpers::print_banner("Server");
    println!("  Model:       {}", orchestrator.model());
    println!("  Tools:       {}", orchestrator.tool_names().join(", "));
    println!(
        "  Store:       {}",
        if orchestrator.store().is_persistent() { "persistent" } else { "in-memory" }
    );
    println!("  Static dir:  {}", static_dir.display());
    println!("  Listening:   http://{addr}");
    println!();

    let app = router(Arc::new(orchestrator), &static_dir);
    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("failed to bind {addr}"))?;
    info!(%addr, "server listening");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("server error")?;

    info!("server stopped");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        error!(error = %e, "failed to listen for Ctrl+C");
        return;
    }
    info!("received Ctrl+C, shutting down");
}

fn error_response(status: StatusCode, message: &str) -> Response {
    (status, Json(json!({ "error": message }))).into_response()
}

/// `POST /api/chat` with `{message, conversationId?}`.
async fn chat(State(state): State<AppState>, body: Bytes) -> Response {
    let body: Value = serde_json::from_slice(&body).unwrap_or(Value::Null);
    let Some(message) = body
        .get("message")
        .and_then(Value::as_str)
        .filter(|m| !m.is_empty())
        .map(str::to_string)
    else {
        return error_response(StatusCode::BAD_REQUEST, "Message is required");
    };
    let conversation_id = body
        .get("conversationId")
        .and_then(Value::as_str)
        .map(str::to_string);

    let (emitter, rx) = channel(DEFAULT_CHANNEL_CAPACITY);
    let orchestrator = Arc::clone(&state.orchestrator);
    tokio::spawn(async move {
        if let Err(e) = orchestrator.run(message, conversation_id, emitter).await {
            debug!(error = %e, "chat request ended without an answer");
        }
    });

    let units = stream::unfold(rx, |mut rx| async move {
        let unit = rx.recv().await?;
        let event = Event::default().data(unit.as_str());
        Some((Ok::<_, Infallible>(event), rx))
    });

    (
        [(
            HeaderName::from_static("x-accel-buffering"),
            HeaderValue::from_static("no"),
        )],
        Sse::new(units),
    )
        .into_response()
}

/// `GET /api/conversation/:id`.
async fn conversation(State(state): State<AppState>, UrlPath(id): UrlPath<String>) -> Response {
    match state.orchestrator.store().get(&id).await {
        Ok(Some(record)) => Json(record.as_ref()).into_response(),
        Ok(None) => error_response(StatusCode::NOT_FOUND, "Conversation not found"),
        Err(e) => {
            error!(conversation_id = %id, error = %e, "store lookup failed");
            error_response(StatusCode::INTERNAL_SERVER_ERROR, "Failed to load conversation")
        }
    }
}

// ─────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────
