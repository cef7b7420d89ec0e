use std::sync::Arc;

use secrecy::ExposeSecret;
use sqlx::postgres::PgPoolOptions;

use tenant_gateway::adapters::http::build_router;
use tenant_gateway::adapters::postgres::MIGRATOR;
use tenant_gateway::adapters::{
    FileCredentialStore, InMemoryMessageStore, InMemorySessionStatusStore,
    PostgresMessageStore, PostgresSessionStatusStore, RoomManager, SimulatedEngine,
};
use tenant_gateway::application::{
    restore_sessions, OrchestratorConfig, SessionOrchestrator, SessionPorts,
};
use tenant_gateway::config::AppConfig;
use tenant_gateway::ports::{MessageStore, SessionStatusStore};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let config = AppConfig::load()?;
    config.validate()?;

    // Initialize logging
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(&config.server.log_level));
    if config.is_production() {
        tracing_subscriber::fmt().json().with_env_filter(filter).init();
    } else {
        tracing_subscriber::fmt().with_env_filter(filter).init();
    }

    tracing::info!(environment = ?config.server.environment, "Starting tenant gateway");

    // Stores
    let (status_store, message_store): (Arc<dyn SessionStatusStore>, Arc<dyn MessageStore>) =
        match &config.database {
            Some(database) => {
                let pool = PgPoolOptions::new()
                    .min_connections(database.min_connections)
                    .max_connections(database.max_connections)
                    .acquire_timeout(database.acquire_timeout())
                    .idle_timeout(database.idle_timeout())
                    .connect(database.url.expose_secret())
                    .await?;
                if database.run_migrations {
                    MIGRATOR.run(&pool).await?;
                    tracing::info!("Database migrations applied");
                }
                (
                    Arc::new(PostgresSessionStatusStore::new(pool.clone())),
                    Arc::new(PostgresMessageStore::new(pool)),
                )
            }
            None => {
                tracing::warn!("No database configured, session status and messages kept in memory");
                (
                    Arc::new(InMemorySessionStatusStore::new()),
                    Arc::new(InMemoryMessageStore::new()),
                )
            }
        };

    tracing::warn!("Using the simulated protocol engine");
    let room_manager = Arc::new(RoomManager::new(config.messaging.event_channel_capacity));
    let ports = SessionPorts {
        engine: Arc::new(SimulatedEngine::new()),
        credentials: Arc::new(FileCredentialStore::new(&config.credentials.base_dir)),
        status_store,
        message_store,
        publisher: room_manager.clone(),
    };
    let orchestrator = Arc::new(SessionOrchestrator::new(
        ports,
        OrchestratorConfig::from(&config),
    ));

    match restore_sessions(&orchestrator).await {
        Ok(report) => tracing::info!(
            restored = report.restored.len(),
            skipped = report.skipped.len(),
            failed = report.failed.len(),
            "Bootstrap complete"
        ),
        Err(e) => tracing::error!(error = %e, "Bootstrap failed, starting without restored sessions"),
    }

    // Serve
    let router = build_router(orchestrator.clone(), room_manager, &config.server);
    let addr = config.server.socket_addr()?;
    let listener = tokio::net::TcpListener::bind(addr).await?;
    tracing::info!(%addr, "Tenant gateway listening");

    axum::serve(listener, router)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    tracing::info!("Shutting down");
    orchestrator.shutdown().await;
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %e, "Failed to listen for ctrl+c");
        std::future::pending::<()>().await;
    }
}
