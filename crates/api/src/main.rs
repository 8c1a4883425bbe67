use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use painel_api::config::ServerConfig;
use painel_api::registry::SessionRegistry;
use painel_api::router::build_app_router;
use painel_api::state::{AppState, ImportBackend};
use painel_events::EventBus;
use painel_pipeline::MemorySink;
use tokio_util::sync::CancellationToken;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() {
    dotenvy::dotenv().ok();

    // --- Tracing ---
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "painel_api=debug,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    // --- Configuration ---
    let config = ServerConfig::from_env().expect("Invalid server configuration");
    tracing::info!(
        host = %config.host,
        port = %config.port,
        locale = %config.import.locale,
        "Loaded server configuration"
    );

    // --- Import backend ---
    let backend = match &config.database_url {
        Some(database_url) => {
            let pool = painel_db::create_pool(database_url)
                .await
                .expect("Failed to connect to database");
            tracing::info!("Database connection pool created");

            painel_db::health_check(&pool)
                .await
                .expect("Database health check failed");
            tracing::info!("Database health check passed");

            painel_db::run_migrations(&pool)
                .await
                .expect("Failed to run database migrations");
            tracing::info!("Database migrations applied");

            ImportBackend::Postgres(pool)
        }
        None => {
            tracing::warn!("DATABASE_URL not set, imported rows are kept in memory");
            ImportBackend::Memory(Arc::new(MemorySink::new()))
        }
    };

    // --- App state ---
    let registry = Arc::new(SessionRegistry::new());
    let state = AppState {
        config: Arc::new(config.clone()),
        backend,
        registry: Arc::clone(&registry),
        event_bus: Arc::new(EventBus::default()),
    };

    // --- Session reaper ---
    let reaper_cancel = CancellationToken::new();
    let reaper_handle = tokio::spawn(painel_api::background::session_reaper::run(
        Arc::clone(&registry),
        Duration::from_secs(config.import.session_ttl_secs),
        reaper_cancel.clone(),
    ));

    let app = build_app_router(state, &config);

    // --- Start server ---
    let addr = SocketAddr::new(
        config.host.parse().expect("Invalid HOST address"),
        config.port,
    );
    tracing::info!(%addr, "Starting server");

    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .expect("Failed to bind to address");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .expect("Server error");

    // --- Post-shutdown cleanup ---
    tracing::info!("Server stopped accepting connections, cleaning up");

    reaper_cancel.cancel();
    let _ = tokio::time::timeout(Duration::from_secs(5), reaper_handle).await;
    tracing::info!("Session reaper stopped");

    tracing::info!("Graceful shutdown complete");
}

/// Wait for SIGINT or, on Unix, SIGTERM.
async fn shutdown_signal() {
    let ctrl_c = async {
        tokio::signal::ctrl_c()
            .await
            .expect("Failed to install Ctrl-C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())
            .expect("Failed to install SIGTERM handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }

    tracing::info!("Shutdown signal received");
}
