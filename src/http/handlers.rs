//! Axum HTTP handlers for the web server
//!
//! Provides the health, monitoring and tool endpoints, plus the placeholder
//! for the auth routes served upstream.

use axum::{
    body::Bytes,
    extract::{Path, State},
    http::{header, StatusCode},
    response::IntoResponse,
    Json,
};
use serde::Serialize;
use serde_json::Value;

use crate::{
    errors::{timestamp_now, AppError, ErrorResponse},
    monitoring::CounterSnapshot,
    AppState,
};

#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
    pub version: &'static str,
    pub timestamp: String,
    pub environment: String,
}

#[derive(Debug, Serialize)]
pub struct DashboardResponse {
    pub status: &'static str,
    pub version: &'static str,
    pub environment: String,
    pub started_at: String,
    pub uptime_seconds: i64,
    pub counters: CounterSnapshot,
}

pub async fn health(State(state): State<AppState>) -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "healthy",
        version: state.metrics.version(),
        timestamp: timestamp_now(),
        environment: state.environment.to_string(),
    })
}

pub async fn healthz() -> &'static str {
    "OK"
}

pub async fn metrics(State(state): State<AppState>) -> impl IntoResponse {
    (
        [(header::CONTENT_TYPE, "text/plain; version=0.0.4")],
        state.metrics.render(),
    )
}

pub async fn dashboard(State(state): State<AppState>) -> Json<DashboardResponse> {
    Json(DashboardResponse {
        status: "ok",
        version: state.metrics.version(),
        environment: state.environment.to_string(),
        started_at: state.metrics.started_at().to_rfc3339(),
        uptime_seconds: state.metrics.uptime_seconds(),
        counters: state.metrics.snapshot(),
    })
}

/// Login, refresh and logout are served by the platform's auth worker. The
/// reply is a plain response rather than an `AppError` so it is never reported.
pub async fn auth() -> impl IntoResponse {
    (
        StatusCode::NOT_IMPLEMENTED,
        Json(ErrorResponse {
            error: "Not implemented".to_string(),
            message: Some("authentication is handled by the upstream auth service".to_string()),
            timestamp: timestamp_now(),
        }),
    )
}

pub async fn list_tools(State(state): State<AppState>) -> Result<Json<Value>, AppError> {
    let mut listing = state.tools.list()?;
    if let Some(object) = listing.as_object_mut() {
        object.insert(
            "message".to_string(),
            Value::String("Available tools".to_string()),
        );
    }
    Ok(Json(listing))
}

pub async fn invoke_tool(
    State(state): State<AppState>,
    Path(tool): Path<String>,
    body: Bytes,
) -> Result<Json<Value>, AppError> {
    let arguments = serde_json::from_slice(&body).unwrap_or(Value::Null);
    state.metrics.record_tool_invocation(&tool);
    let result = state.tools.dispatch(&tool, arguments).await?;
    Ok(Json(result))
}
