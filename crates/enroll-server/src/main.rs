//! Enrollment Server - Main entry point

use anyhow::{Context, Result};
use enroll_common::logging::{init_logging, LogConfig};
use sqlx::postgres::PgPoolOptions;
use std::{net::SocketAddr, sync::Arc, time::Duration};
use tokio::signal;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

use enroll_server::{
    api,
    config::{Config, DatabaseConfig},
    directory::{HttpEmployerDirectory, HttpUserDirectory},
    enrollment::{
        queue, EnrollmentProcessor, EnrollmentStore, HttpFileTransfer, KeyedLock,
        MemoryEnrollmentStore, PgEnrollmentStore, WorkerOptions, WorkerPool,
    },
    features::FeatureState,
};

#[tokio::main]
async fn main() -> Result<()> {
    // Environment variables take precedence over these defaults
    let log_config = LogConfig::builder()
        .log_file_prefix("enroll-server")
        .filter_directives("enroll_server=debug,tower_http=debug,sqlx=info")
        .build()
        .merge_env()?;

    let _logging_guard = init_logging(&log_config)?;

    info!("Starting Enrollment Server");

    let config = Config::load()?;
    info!(
        "Configuration loaded - server will bind to {}:{}",
        config.server.host, config.server.port
    );

    let store = connect_store(config.database.as_ref()).await?;

    let timeout = config.directories.timeout();
    let employers = Arc::new(
        HttpEmployerDirectory::new(&config.directories.employer_service_url, timeout)
            .context("Failed to build Employer Directory client")?,
    );
    let users = Arc::new(
        HttpUserDirectory::new(&config.directories.user_service_url, timeout)
            .context("Failed to build User Directory client")?,
    );
    let transfer = Arc::new(
        HttpFileTransfer::new(&config.enrollment.download_dir, timeout)
            .context("Failed to build file transfer client")?,
    );

    let processor = Arc::new(EnrollmentProcessor::new(
        KeyedLock::new(),
        employers.clone(),
        users.clone(),
        transfer,
        store.clone(),
    ));

    let (publisher, consumer) = queue::channel();
    let shutdown = CancellationToken::new();
    let pool = WorkerPool::new(
        processor,
        WorkerOptions::from(&config.enrollment),
        shutdown.clone(),
    )
    .start(consumer);

    let state = FeatureState {
        publisher,
        store,
        employers,
        users,
    };
    let app = api::create_router(state, &config.cors);

    let addr: SocketAddr = format!("{}:{}", config.server.host, config.server.port)
        .parse()
        .context("Invalid bind address")?;
    info!("Server listening on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("Failed to bind {}", addr))?;

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal(shutdown))
        .await?;

    let grace = Duration::from_secs(config.server.shutdown_timeout_secs);
    info!("Waiting up to {} seconds for running enrollment jobs", grace.as_secs());
    if !pool.shutdown(grace).await {
        warn!("Some enrollment jobs were still running at exit");
    }

    info!("Server shut down gracefully");

    Ok(())
}

/// Postgres when configured, in-memory otherwise
async fn connect_store(database: Option<&DatabaseConfig>) -> Result<Arc<dyn EnrollmentStore>> {
    let Some(database) = database else {
        warn!("DATABASE_URL not set, enrollments are kept in memory only");
        return Ok(Arc::new(MemoryEnrollmentStore::new()));
    };

    let db_pool = PgPoolOptions::new()
        .max_connections(database.max_connections)
        .min_connections(database.min_connections)
        .acquire_timeout(Duration::from_secs(database.connect_timeout_secs))
        .idle_timeout(Duration::from_secs(database.idle_timeout_secs))
        .connect(&database.url)
        .await
        .context("Failed to connect to database")?;

    info!("Database connection pool established");

    sqlx::migrate!("../../migrations")
        .run(&db_pool)
        .await
        .map_err(|e| anyhow::anyhow!("Failed to run migrations: {}", e))?;

    info!("Database migrations completed");

    Ok(Arc::new(PgEnrollmentStore::new(db_pool)))
}

/// Resolves on Ctrl+C or SIGTERM and cancels `shutdown`
async fn shutdown_signal(shutdown: CancellationToken) {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            tracing::error!("Failed to install Ctrl+C handler: {}", e);
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            },
            Err(e) => {
                tracing::error!("Failed to install SIGTERM handler: {}", e);
            },
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            info!("Received Ctrl+C, starting graceful shutdown");
        },
        _ = terminate => {
            info!("Received terminate signal, starting graceful shutdown");
        },
    }

    shutdown.cancel();
}
