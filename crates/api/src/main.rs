use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use storyhub_api::background::orphan_reconciler::OrphanReconciler;
use storyhub_api::config::ServerConfig;
use storyhub_api::identity::HttpIdentityClient;
use storyhub_api::router::build_app_router;
use storyhub_api::server::{serve_with_grace, ShutdownOutcome};
use storyhub_api::state::AppState;
use storyhub_db::repositories::{PgStoryRepo, StoryRepository};
use tokio_util::sync::CancellationToken;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() {
    dotenvy::dotenv().ok();

    // --- Tracing ---
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "storyhub_api=debug,storyhub_db=debug,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    // --- Configuration ---
    let config = ServerConfig::from_env();
    tracing::info!(host = %config.host, port = %config.port, "Loaded server configuration");

    // --- Database ---
    let database_url = std::env::var("DATABASE_URL").expect("DATABASE_URL must be set");

    let pool = storyhub_db::create_pool(&database_url)
        .await
        .expect("Failed to connect to database");
    tracing::info!("Database connection pool created");

    storyhub_db::health_check(&pool)
        .await
        .expect("Database health check failed");
    tracing::info!("Database health check passed");

    storyhub_db::run_migrations(&pool)
        .await
        .expect("Failed to run database migrations");
    tracing::info!("Database migrations applied");

    let stories: Arc<dyn StoryRepository> = Arc::new(PgStoryRepo::new(pool));

    // --- Orphan reconciler ---
    let identity = HttpIdentityClient::new(&config.identity, config.jwt.clone())
        .expect("Failed to build identity service client");
    tracing::info!(endpoint = identity.endpoint(), "Identity client ready");

    let reconciler = OrphanReconciler::new(Arc::clone(&stories), Arc::new(identity), &config.sweep);
    let sweep_cancel = CancellationToken::new();
    let sweep_handle = tokio::spawn({
        let cancel = sweep_cancel.clone();
        async move { reconciler.run(cancel).await }
    });

    // --- Router ---
    let state = AppState {
        stories,
        config: Arc::new(config.clone()),
    };
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

    let shutdown = CancellationToken::new();
    tokio::spawn({
        let shutdown = shutdown.clone();
        async move {
            shutdown_signal().await;
            shutdown.cancel();
        }
    });

    let grace = Duration::from_secs(config.shutdown_timeout_secs);
    let outcome = serve_with_grace(listener, app, shutdown, grace)
        .await
        .expect("Server error");

    // --- Post-shutdown cleanup ---
    tracing::info!(
        drained = outcome == ShutdownOutcome::Drained,
        "Server stopped, cleaning up",
    );

    sweep_cancel.cancel();
    if tokio::time::timeout(grace, sweep_handle).await.is_err() {
        tracing::warn!(grace_secs = grace.as_secs(), "Orphan reconciler did not stop in time");
    } else {
        tracing::info!("Orphan reconciler stopped");
    }

    tracing::info!("Graceful shutdown complete");
}

/// Wait for a termination signal to initiate graceful shutdown.
///
/// Handles both SIGINT (Ctrl-C) and SIGTERM (on Unix).
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
