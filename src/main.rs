use std::sync::Arc;

use onboarding_hub_worker::{
    build_app,
    config::{Config, StorageConfig},
    janitor, logging,
    reporting::{ErrorReporter, NoopReporter, SentryReporter},
    storage::{
        BlobStore, KvSessionStore, MemoryBlobStore, MemorySessionStore, R2BlobStore, SessionStore,
    },
    AppState,
};
use tokio::signal;
use tracing::{info, warn};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    logging::init_logging();

    let config = Config::from_env()?;
    let bind_socket = config.bind_socket()?;

    let reporter: Arc<dyn ErrorReporter> = match config.sentry_dsn.as_deref().and_then(|dsn| {
        SentryReporter::init(dsn, &config.environment, config.traces_sample_rate)
    }) {
        Some(reporter) => Arc::new(reporter),
        None => Arc::new(NoopReporter),
    };

    let (blob_store, session_store): (Arc<dyn BlobStore>, Arc<dyn SessionStore>) =
        match &config.storage {
            StorageConfig::Memory => {
                warn!("no Cloudflare account configured, documents and sessions are kept in memory");
                (
                    Arc::new(MemoryBlobStore::new()),
                    Arc::new(MemorySessionStore::new()),
                )
            }
            StorageConfig::Cloudflare(cloudflare) => (
                Arc::new(R2BlobStore::from_credentials(
                    &cloudflare.account_id,
                    &cloudflare.r2_access_key_id,
                    &cloudflare.r2_secret_access_key,
                    cloudflare.documents_bucket.clone(),
                )),
                Arc::new(KvSessionStore::new(
                    cloudflare.account_id.clone(),
                    cloudflare.sessions_namespace_id.clone(),
                    cloudflare.api_token.clone(),
                )),
            ),
        };

    let state = AppState::new(
        config.environment.clone(),
        config.allowed_origins.clone(),
        blob_store,
        session_store,
        reporter,
    );
    let sweeper = janitor::spawn(state.clone(), config.sweep_interval);
    let app = build_app(state);
    let listener = tokio::net::TcpListener::bind(bind_socket).await?;

    info!(
        bind_addr = %config.bind_addr,
        bind_port = config.bind_port,
        environment = %config.environment,
        sweep_interval_secs = config.sweep_interval.as_secs(),
        "server starting"
    );

    axum::serve(listener, app.into_make_service())
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    sweeper.abort();
    info!("server stopped");
    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(err) = signal::ctrl_c().await {
            warn!(error = %err, "failed to listen for ctrl-c");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut stream) => {
                stream.recv().await;
            }
            Err(err) => {
                warn!(error = %err, "failed to listen for SIGTERM");
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

    info!("shutdown signal received");
}
