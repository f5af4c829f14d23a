use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use tokio_util::sync::CancellationToken;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use dealerhub_api::config::ServerConfig;
use dealerhub_api::relay::ChangeRelay;
use dealerhub_api::router::build_app_router;
use dealerhub_api::state::AppState;
use dealerhub_api::ws;
use dealerhub_events::ChangeFeedListener;

#[tokio::main]
async fn main() {
    dotenvy::dotenv().ok();

    // --- Tracing ---
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "dealerhub_api=debug,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    // --- Configuration ---
    let config = ServerConfig::from_env();
    tracing::info!(host = %config.host, port = %config.port, "Loaded server configuration");

    // --- Database ---
    let pool = match &config.database_url {
        Some(url) => {
            let pool = dealerhub_db::create_pool(url)
                .await
                .expect("Failed to connect to database");
            tracing::info!("Database connection pool created");

            dealerhub_db::health_check(&pool)
                .await
                .expect("Database health check failed");
            tracing::info!("Database health check passed");

            dealerhub_db::run_migrations(&pool)
                .await
                .expect("Failed to run database migrations");
            tracing::info!("Database migrations applied");
            Some(pool)
        }
        None => {
            tracing::warn!("DATABASE_URL not set, data endpoints will answer 503");
            None
        }
    };

    let shutdown_timeout = Duration::from_secs(config.shutdown_timeout_secs);
    let state = AppState::new(pool.clone(), config.clone());
    let cancel = CancellationToken::new();

    // --- Background services ---
    let heartbeat_handle = ws::start_heartbeat(Arc::clone(&state.ws_manager), cancel.clone());
    let relay_handle = ChangeRelay::new(Arc::clone(&state.ws_manager)).spawn(&state.event_bus);

    let listener_handle = pool.map(|pool| {
        let listener = ChangeFeedListener::new(pool, Arc::clone(&state.event_bus));
        tokio::spawn(listener.run(cancel.clone()))
    });
    tracing::info!("Realtime services started (change feed, relay, heartbeat)");

    let ws_manager = Arc::clone(&state.ws_manager);
    let event_bus = Arc::clone(&state.event_bus);
    let app = build_app_router(state);

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

    cancel.cancel();
    if let Some(handle) = listener_handle {
        let _ = tokio::time::timeout(shutdown_timeout, handle).await;
    }
    let _ = tokio::time::timeout(shutdown_timeout, heartbeat_handle).await;

    // Dropping the last bus handle closes the broadcast channel and stops
    // the relay. The router (and its state clone) is gone by now.
    drop(event_bus);
    let _ = tokio::time::timeout(shutdown_timeout, relay_handle).await;
    tracing::info!("Realtime services shut down");

    let ws_count = ws_manager.connection_count().await;
    tracing::info!(ws_count, "Closing remaining WebSocket connections");
    ws_manager.shutdown_all().await;

    tracing::info!("Graceful shutdown complete");
}

/// Wait for SIGINT or SIGTERM to initiate graceful shutdown.
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
        () = ctrl_c => {
            tracing::info!("Received SIGINT (Ctrl-C), starting graceful shutdown");
        }
        () = terminate => {
            tracing::info!("Received SIGTERM, starting graceful shutdown");
        }
    }
}
