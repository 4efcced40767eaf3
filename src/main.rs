use anyhow::Context;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;
use tracing::{error, info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use event_booker::{
    clock::SystemClock,
    config::Config,
    controllers,
    database::Database,
    repository::Repository,
    services::{ExpirySweeper, JwtKeys},
    AppState,
};

#[global_allocator]
static GLOBAL: mimalloc::MiMalloc = mimalloc::MiMalloc;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    let config = Config::from_env().context("invalid configuration")?;

    let filter = EnvFilter::try_new(&config.app.rust_log).unwrap_or_else(|_| EnvFilter::new("info"));
    let registry = tracing_subscriber::registry().with(filter);
    if config.app.is_production() {
        registry.with(tracing_subscriber::fmt::layer().json()).init();
    } else {
        registry.with(tracing_subscriber::fmt::layer()).init();
    }

    info!(environment = %config.app.environment, "Starting EventBooker API");

    // Connect to the database
    let db = Database::connect(&config.database.url, config.database.pool_size)
        .await
        .context("failed to connect to database")?;
    db.run_migrations().await.context("failed to run migrations")?;

    let repo = Arc::new(db.repository());
    let tokens = JwtKeys::new(&config.jwt.secret, config.jwt.expires_in_hours);
    let state = Arc::new(AppState::new(repo.clone(), Arc::new(SystemClock), tokens));

    // --- Start background tasks ---
    let (shutdown_tx, shutdown_rx) = watch::channel(false);
    let sweeper = ExpirySweeper::new(
        Arc::new(state.bookings.clone()),
        config.sweeper.interval_seconds,
        config.sweeper.tick_timeout(),
    );
    let sweeper_handle = sweeper.spawn(shutdown_rx);

    // --- Start the web server ---
    let app = controllers::router(state, config.app.request_timeout());

    let addr: SocketAddr = format!("{}:{}", config.app.host, config.app.port)
        .parse()
        .context("HOST/PORT do not form a socket address")?;
    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("failed to bind {addr}"))?;
    info!(%addr, "Server listening");

    let served = axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await;
    info!("HTTP server stopped, shutting down background tasks");

    // Останавливаем sweeper, даём текущему тику завершиться
    let _ = shutdown_tx.send(true);
    match tokio::time::timeout(Duration::from_secs(10), sweeper_handle).await {
        Ok(Ok(())) => info!("expiry sweeper joined"),
        Ok(Err(err)) => warn!(error = %err, "expiry sweeper task failed"),
        Err(_) => warn!("expiry sweeper did not stop in time"),
    }

    repo.close().await;
    info!("Database pool closed");

    served.context("server error")
}

async fn shutdown_signal() {
    use tokio::signal;

    let ctrl_c = async {
        if let Err(err) = signal::ctrl_c().await {
            error!(error = %err, "failed to listen for Ctrl+C");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            }
            Err(err) => {
                error!(error = %err, "failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => info!("Received Ctrl+C"),
        _ = terminate => info!("Received SIGTERM"),
    }
}
