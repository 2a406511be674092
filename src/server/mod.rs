//! HTTP boundary for the compilation service.
//!
//! Glue only: one generate endpoint that hands the payload to the
//! orchestrator and maps its outcome, plus a health check. Document
//! faults come back as 400 with a JSON body carrying the reason and the
//! compiler log; environment faults (no workspace, no compiler binary)
//! come back as 500.

use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use axum::{
    Json, Router,
    body::Body,
    extract::{DefaultBodyLimit, State},
    http::{StatusCode, header},
    response::{IntoResponse, Response},
    routing::{get, post},
};
use serde::Deserialize;
use tower_http::cors::CorsLayer;
use tracing::info;

use crate::config::Config;
use crate::orchestrator::{CompileOutcome, Compiler};

/// Upper bound on the request body (the document source), 2 MiB.
const MAX_BODY_BYTES: usize = 2 * 1024 * 1024;

/// Configuration for the HTTP server.
pub struct ServerConfig {
    pub port: u16,
    pub compiler: Config,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            port: 5000,
            compiler: Config::default(),
        }
    }
}

// ── Shared application state ──────────────────────────────────────────

pub struct AppState {
    pub compiler: Compiler,
}

pub type SharedState = Arc<AppState>;

// ── Request payload types ─────────────────────────────────────────────

#[derive(Deserialize)]
pub struct GenerateRequest {
    pub latex: String,
    /// Optional per-pass deadline override, in milliseconds.
    pub timeout_ms: Option<u64>,
}

// ── Error handling ────────────────────────────────────────────────────

pub enum ApiError {
    BadRequest { error: String, log: Option<String> },
    Internal { error: String, log: Option<String> },
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, error, log) = match self {
            ApiError::BadRequest { error, log } => (StatusCode::BAD_REQUEST, error, log),
            ApiError::Internal { error, log } => (StatusCode::INTERNAL_SERVER_ERROR, error, log),
        };
        (
            status,
            Json(serde_json::json!({"success": false, "error": error, "log": log})),
        )
            .into_response()
    }
}

// ── Router ────────────────────────────────────────────────────────────

pub fn build_router(state: SharedState) -> Router {
    Router::new()
        .route("/api/generate", post(generate))
        .route("/health", get(health_check))
        .layer(DefaultBodyLimit::max(MAX_BODY_BYTES))
        .with_state(state)
}

// ── Handlers ──────────────────────────────────────────────────────────

async fn generate(
    State(state): State<SharedState>,
    Json(req): Json<GenerateRequest>,
) -> Result<Response, ApiError> {
    if req.latex.trim().is_empty() {
        return Err(ApiError::BadRequest {
            error: "Missing latex string".to_string(),
            log: None,
        });
    }

    let deadline = req.timeout_ms.map(Duration::from_millis);
    match state.compiler.compile(&req.latex, deadline).await {
        CompileOutcome::Success { artifact, .. } => Ok(Response::builder()
            .header(header::CONTENT_TYPE, "application/pdf")
            .header(
                header::CONTENT_DISPOSITION,
                "inline; filename=\"document.pdf\"",
            )
            .body(Body::from(artifact))
            .map_err(|e| ApiError::Internal {
                error: e.to_string(),
                log: None,
            })?
            .into_response()),
        CompileOutcome::Failure { error, log } => {
            if error.is_environment() {
                Err(ApiError::Internal {
                    error: error.to_string(),
                    log,
                })
            } else {
                Err(ApiError::BadRequest {
                    error: error.to_string(),
                    log,
                })
            }
        }
    }
}

async fn health_check() -> Json<serde_json::Value> {
    Json(serde_json::json!({"status": "ok"}))
}

// ── Server ────────────────────────────────────────────────────────────

/// Start the HTTP server and run until interrupted.
pub async fn serve(config: ServerConfig) -> Result<()> {
    let state = Arc::new(AppState {
        compiler: Compiler::new(config.compiler),
    });

    let app = build_router(state).layer(CorsLayer::permissive());

    let addr = format!("0.0.0.0:{}", config.port);
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .with_context(|| format!("Failed to bind to {}", addr))?;
    info!(%addr, "kiln listening");

    axum::serve(listener, app).await.context("server error")?;
    Ok(())
}
