//! Error reporting collaborator and the central error boundary
//!
//! Responses built from an `AppError` carry the error in their extensions; the
//! boundary forwards server-side failures to the configured reporter and drops
//! client-caused ones.

use std::{any::Any, error::Error};

use axum::{
    extract::{Request, State},
    middleware::Next,
    response::{IntoResponse, Response},
};
use sentry::types::Dsn;
use tracing::{info, warn};

use crate::{
    errors::{is_client_error, AppError, CapturedError},
    AppState,
};

pub trait ErrorReporter: Send + Sync {
    fn report(&self, error: &(dyn Error + 'static));
}

#[derive(Debug, Default)]
pub struct NoopReporter;

impl ErrorReporter for NoopReporter {
    fn report(&self, _error: &(dyn Error + 'static)) {}
}

pub struct SentryReporter {
    _guard: sentry::ClientInitGuard,
}

impl SentryReporter {
    /// Initialise the Sentry client. Returns `None` when the DSN is malformed
    /// so the caller can continue without reporting.
    pub fn init(dsn: &str, environment: &str, traces_sample_rate: f32) -> Option<Self> {
        let dsn = match dsn.parse::<Dsn>() {
            Ok(dsn) => dsn,
            Err(err) => {
                warn!(error = %err, "failed to initialise error reporting, DSN is invalid");
                return None;
            }
        };

        let guard = sentry::init(sentry::ClientOptions {
            dsn: Some(dsn),
            release: sentry::release_name!(),
            environment: Some(environment.to_string().into()),
            traces_sample_rate,
            ..Default::default()
        });

        info!(environment, traces_sample_rate, "error reporting enabled");
        Some(Self { _guard: guard })
    }
}

impl ErrorReporter for SentryReporter {
    fn report(&self, error: &(dyn Error + 'static)) {
        sentry::capture_error(error);
    }
}

pub async fn error_boundary(State(state): State<AppState>, request: Request, next: Next) -> Response {
    let response = next.run(request).await;

    if let Some(CapturedError(error)) = response.extensions().get::<CapturedError>() {
        if !is_client_error(error) {
            state.reporter.report(error.as_ref());
        }
    }

    response
}

/// Turns a handler panic into the uniform 500 body; the response then passes
/// through `error_boundary` like any other unhandled error.
pub fn handle_panic(panic: Box<dyn Any + Send + 'static>) -> Response {
    let detail = if let Some(message) = panic.downcast_ref::<String>() {
        message.clone()
    } else if let Some(message) = panic.downcast_ref::<&str>() {
        (*message).to_string()
    } else {
        "handler panicked".to_string()
    };

    AppError::unhandled(detail).into_response()
}


#[cfg(test)]
mod tests {
    use axum::http::StatusCode;

    use super::*;

    #[test]
    fn invalid_dsn_disables_reporting() {
        assert!(SentryReporter::init("not a dsn", "test", 0.1).is_none());
    }

    #[test]
    fn panic_payload_becomes_unhandled_error() {
        let response = handle_panic(Box::new("exploded"));

        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
        let captured = response
            .extensions()
            .get::<CapturedError>()
            .expect("captured error");
        assert_eq!(captured.0.to_string(), "unhandled error: exploded");
    }
}
