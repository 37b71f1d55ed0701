use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use muralist_api::config::{GenerationConfig, ServerConfig};
use muralist_api::engine::JobSupervisor;
use muralist_api::router::build_app_router;
use muralist_api::state::AppState;
use muralist_core::storage::LocalArtifactStore;
use muralist_pipeline::GenerationPipeline;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() {
    dotenvy::dotenv().ok();

    // --- Tracing ---
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| "muralist_api=debug,tower_http=debug".into());
    let registry = tracing_subscriber::registry().with(filter);
    if std::env::var("LOG_FORMAT").is_ok_and(|v| v.eq_ignore_ascii_case("json")) {
        registry.with(tracing_subscriber::fmt::layer().json()).init();
    } else {
        registry.with(tracing_subscriber::fmt::layer()).init();
    }

    // --- Configuration ---
    let config = ServerConfig::from_env();
    tracing::info!(host = %config.host, port = %config.port, "Loaded server configuration");

    let generation = GenerationConfig::from_env();
    tracing::info!(
        provider = generation.provider.provider.name(),
        mode = generation.mode.as_str(),
        timeout_secs = generation.call_timeout.as_secs(),
        artifact_dir = %generation.artifact_dir.display(),
        "Loaded generation configuration",
    );

    // --- Database ---
    let database_url = std::env::var("DATABASE_URL").expect("DATABASE_URL must be set");

    let pool = muralist_db::create_pool(&database_url)
        .await
        .expect("Failed to connect to database");
    tracing::info!("Database connection pool created");

    muralist_db::health_check(&pool)
        .await
        .expect("Database health check failed");
    tracing::info!("Database health check passed");

    muralist_db::run_migrations(&pool)
        .await
        .expect("Failed to run database migrations");
    tracing::info!("Database migrations applied");

    // --- Artifact store ---
    let store = Arc::new(LocalArtifactStore::new(generation.artifact_dir.clone()));
    store
        .ensure_root()
        .await
        .expect("Failed to create artifact directory");

    // --- Generation engine ---
    let pipeline = GenerationPipeline::new(generation.provider.build(), store.clone(), generation.mode)
        .with_call_timeout(generation.call_timeout);
    let supervisor = JobSupervisor::new(pool.clone(), Arc::new(pipeline));
    supervisor
        .recover_interrupted()
        .await
        .expect("Failed to recover interrupted jobs");

    // --- App state ---
    let state = AppState {
        pool,
        supervisor: Arc::clone(&supervisor),
        store,
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

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .expect("Server error");

    // --- Post-shutdown cleanup ---
    tracing::info!("Server stopped accepting connections, cleaning up");
    supervisor
        .shutdown(Duration::from_secs(config.shutdown_timeout_secs))
        .await;
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
