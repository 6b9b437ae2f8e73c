//! rapshare server entry point.

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use anyhow::Context;
use axum::{Router, middleware, routing::get};
use rapshare_api::{middleware::AppState, router as api_router};
use rapshare_common::config::{LogFormat, LoggingConfig};
use rapshare_common::{Config, storage};
use rapshare_core::{ContentService, ReactionService, RetryConfig, StorageCleanup, UserService};
use rapshare_db::repositories::{CounterRepository, ReactionRepository, UserRepository};
use tokio::signal;
use tower_http::{
    cors::{Any, CorsLayer},
    limit::RequestBodyLimitLayer,
    timeout::TimeoutLayer,
    trace::TraceLayer,
};
use tracing::info;
use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};

/// Multipart framing on top of the file itself.
const BODY_LIMIT_SLACK: usize = 1024 * 1024;

const CLEANUP_DRAIN_TIMEOUT: Duration = Duration::from_secs(10);

/// Waits for a shutdown signal (SIGINT or SIGTERM).
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            tracing::error!(error = %e, "Failed to install Ctrl+C handler");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            }
            Err(e) => {
                tracing::error!(error = %e, "Failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => {
            info!("Received SIGINT, initiating graceful shutdown...");
        },
        () = terminate => {
            info!("Received SIGTERM, initiating graceful shutdown...");
        },
    }
}

/// Install the global subscriber. `RUST_LOG` wins over the configured filter.
fn init_tracing(logging: &LoggingConfig) {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&logging.filter));
    let registry = tracing_subscriber::registry().with(filter);

    match logging.format {
        LogFormat::Pretty => registry.with(tracing_subscriber::fmt::layer()).init(),
        LogFormat::Json => registry
            .with(tracing_subscriber::fmt::layer().json().with_current_span(false))
            .init(),
    }
}

async fn healthz() -> &'static str {
    "ok"
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    let config = Config::load().context("Failed to load configuration")?;
    init_tracing(&config.logging);

    info!("Starting rapshare server...");

    // Connect to database
    let db = rapshare_db::init(&config).await?;
    info!("Connected to database");

    info!("Running database migrations...");
    rapshare_db::migrate(&db).await?;
    info!("Migrations completed");

    let db = Arc::new(db);

    // Object storage and the retry queue for deletions that fail inline
    let storage = storage::connect(&config.storage.backend).await?;
    let (cleanup, cleanup_worker) = StorageCleanup::start(
        storage.clone(),
        RetryConfig::from(&config.storage.cleanup),
        config.storage.cleanup.capacity,
    );
    info!("Storage ready");

    // Initialize services
    let user_service = UserService::new(UserRepository::new(Arc::clone(&db)));
    let reaction_service = ReactionService::new(
        ReactionRepository::new(Arc::clone(&db)),
        CounterRepository::new(Arc::clone(&db)),
    );
    let content_service = ContentService::new(Arc::clone(&db), storage, cleanup)
        .with_max_upload_bytes(config.storage.max_upload_bytes);

    let state = AppState {
        user_service,
        reaction_service,
        content_service,
    };

    // Build router
    let app = Router::new()
        .route("/healthz", get(healthz))
        .nest("/api", api_router())
        .layer(middleware::from_fn_with_state(
            state.clone(),
            rapshare_api::middleware::auth_middleware,
        ))
        .layer(RequestBodyLimitLayer::new(
            config.storage.max_upload_bytes + BODY_LIMIT_SLACK,
        ))
        .layer(TimeoutLayer::new(Duration::from_secs(
            config.server.request_timeout_secs,
        )))
        .layer(TraceLayer::new_for_http())
        .layer(
            CorsLayer::new()
                .allow_origin(Any)
                .allow_methods(Any)
                .allow_headers(Any),
        )
        .with_state(state);

    // Start server with graceful shutdown
    let addr: SocketAddr = format!("{}:{}", config.server.host, config.server.port)
        .parse()
        .with_context(|| format!("Invalid listen address {}", config.server.host))?;
    info!("Listening on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    // The router owned the last cleanup handles; give in-flight retries a moment.
    match tokio::time::timeout(CLEANUP_DRAIN_TIMEOUT, cleanup_worker).await {
        Ok(Ok(())) => {}
        Ok(Err(e)) => tracing::warn!(error = %e, "Storage cleanup worker ended abnormally"),
        Err(_) => tracing::warn!("Abandoning pending storage deletions at shutdown"),
    }

    info!("Server shutdown complete");
    Ok(())
}
