use std::sync::Arc;

use axum::{
    extract::DefaultBodyLimit,
    http::HeaderValue,
    middleware,
    routing::{get, post},
    Router,
};
use tower_http::catch_panic::CatchPanicLayer;

pub mod config;
pub mod errors;
pub mod http;
pub mod janitor;
pub mod logging;
pub mod mcp;
pub mod monitoring;
pub mod reporting;
pub mod storage;

use http::{documents, handlers};
use mcp::ToolRegistry;
use monitoring::MetricsRegistry;
use reporting::ErrorReporter;
use storage::{BlobStore, SessionStore};

#[derive(Clone)]
pub struct AppState {
    pub environment: Arc<str>,
    pub allowed_origins: Arc<[HeaderValue]>,
    pub blob_store: Arc<dyn BlobStore>,
    pub session_store: Arc<dyn SessionStore>,
    pub reporter: Arc<dyn ErrorReporter>,
    pub metrics: Arc<MetricsRegistry>,
    pub tools: Arc<ToolRegistry>,
    pub document_keys: Arc<documents::DocumentKeys>,
}

impl AppState {
    pub fn new(
        environment: String,
        allowed_origins: Vec<HeaderValue>,
        blob_store: Arc<dyn BlobStore>,
        session_store: Arc<dyn SessionStore>,
        reporter: Arc<dyn ErrorReporter>,
    ) -> Self {
        Self {
            environment: Arc::<str>::from(environment),
            allowed_origins: Arc::from(allowed_origins),
            blob_store,
            session_store,
            reporter,
            metrics: Arc::new(MetricsRegistry::new(env!("CARGO_PKG_VERSION"))),
            tools: Arc::new(ToolRegistry::with_onboarding_tools()),
            document_keys: Arc::new(documents::DocumentKeys::new()),
        }
    }

    pub fn with_metrics(mut self, metrics: Arc<MetricsRegistry>) -> Self {
        self.metrics = metrics;
        self
    }

    pub fn with_tools(mut self, tools: ToolRegistry) -> Self {
        self.tools = Arc::new(tools);
        self
    }
}

pub fn build_app(state: AppState) -> Router {
    let routes = Router::new()
        .route("/health", get(handlers::health))
        .route("/healthz", get(handlers::healthz))
        .route("/auth/login", post(handlers::auth))
        .route("/auth/refresh", post(handlers::auth))
        .route("/auth/logout", post(handlers::auth))
        .route("/mcp/tools", get(handlers::list_tools))
        .route("/mcp/tools/{tool}", post(handlers::invoke_tool))
        .route(
            "/documents/upload",
            post(documents::upload_document)
                .fallback(documents::method_not_allowed)
                .layer(DefaultBodyLimit::disable()),
        )
        .route(
            "/documents/",
            get(documents::missing_document_id).fallback(documents::method_not_allowed),
        )
        .route(
            "/documents/{*id}",
            get(documents::retrieve_document).fallback(documents::method_not_allowed),
        )
        .route("/metrics", get(handlers::metrics))
        .route("/dashboard", get(handlers::dashboard));

    with_middleware(routes, state)
}

/// Outermost first: CORS, request logging, error boundary, panic capture.
fn with_middleware(routes: Router<AppState>, state: AppState) -> Router {
    routes
        .layer(CatchPanicLayer::custom(reporting::handle_panic))
        .layer(middleware::from_fn_with_state(
            state.clone(),
            reporting::error_boundary,
        ))
        .layer(middleware::from_fn_with_state(
            state.clone(),
            logging::request_logging_middleware,
        ))
        .layer(http::cors_layer(&state.allowed_origins))
        .with_state(state)
}
