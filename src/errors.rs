use std::sync::Arc;

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use chrono::{SecondsFormat, Utc};
use serde::Serialize;
use thiserror::Error;

use crate::storage::StorageError;

#[derive(Debug, Error)]
pub enum AppError {
    #[error("validation failed: {0}")]
    Validation(&'static str),
    #[error("not found: {0}")]
    NotFound(&'static str),
    #[error("method not allowed")]
    MethodNotAllowed,
    #[error("{operation} failed")]
    Storage {
        operation: &'static str,
        #[source]
        source: StorageError,
    },
    #[error("unhandled error: {0}")]
    Unhandled(String),
}

#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub error: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    pub timestamp: String,
}

/// Carries the error that produced a response so the error boundary can
/// decide whether to report it.
#[derive(Debug, Clone)]
pub struct CapturedError(pub Arc<AppError>);

impl AppError {
    pub fn storage(operation: &'static str, source: StorageError) -> Self {
        Self::Storage { operation, source }
    }

    pub fn unhandled(message: impl Into<String>) -> Self {
        Self::Unhandled(message.into())
    }

    pub fn status(&self) -> StatusCode {
        match self {
            Self::Validation(_) => StatusCode::BAD_REQUEST,
            Self::NotFound(_) => StatusCode::NOT_FOUND,
            Self::MethodNotAllowed => StatusCode::METHOD_NOT_ALLOWED,
            Self::Storage { .. } | Self::Unhandled(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

/// Client-caused errors are expected and never forwarded to error reporting.
pub fn is_client_error(err: &AppError) -> bool {
    err.status().as_u16() < 500
}

pub fn timestamp_now() -> String {
    Utc::now().to_rfc3339_opts(SecondsFormat::Millis, true)
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status();
        let (error, message) = match &self {
            Self::Validation(message) | Self::NotFound(message) => ((*message).to_string(), None),
            Self::MethodNotAllowed => ("Method not allowed".to_string(), None),
            Self::Storage { operation, source } => {
                tracing::error!(error = %source, operation, "storage operation failed");
                (format!("{operation} failed"), None)
            }
            Self::Unhandled(message) => {
                tracing::error!(error = %message, "request failed with unhandled error");
                (
                    "Internal server error".to_string(),
                    Some(message.clone()),
                )
            }
        };

        let mut response = (
            status,
            Json(ErrorResponse {
                error,
                message,
                timestamp: timestamp_now(),
            }),
        )
            .into_response();
        response
            .extensions_mut()
            .insert(CapturedError(Arc::new(self)));
        response
    }
}
