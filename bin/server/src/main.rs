use authgate_platform_access::{
    IdentityBridge, MemorySessionStore, ServingOrigin, SessionStore,
};
use authgate_server::{
    app,
    auth::{AppState, CognitoGroupDirectory, CognitoProvider, PgSessionStore},
    config::{ServerConfig, SessionBackend},
};
use sqlx::postgres::PgPoolOptions;
use std::sync::Arc;
use tower_http::services::ServeDir;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    // Load configuration from environment
    let config = ServerConfig::from_env().expect("failed to load configuration");
    tracing::info!("Loaded configuration");

    let origin = ServingOrigin::parse(&config.public_origin).expect("invalid PUBLIC_ORIGIN");
    let catalog = config.catalog.catalog().expect("invalid CATALOG__SOURCES");
    let gate = catalog.non_public_paths();
    tracing::info!(prefixes = ?gate.prefixes(), "Gating non-public sources");

    let sessions: Arc<dyn SessionStore> = match config.session.backend {
        SessionBackend::Postgres => {
            let database_url = config
                .database_url
                .as_deref()
                .expect("DATABASE_URL is required for the postgres session backend");

            // Create database connection pool
            let db_pool = PgPoolOptions::new()
                .max_connections(5)
                .connect(database_url)
                .await
                .expect("failed to connect to database");

            // Run migrations
            tracing::info!("Running database migrations...");
            sqlx::migrate!("./migrations")
                .run(&db_pool)
                .await
                .expect("failed to run migrations");

            Arc::new(PgSessionStore::new(db_pool))
        }
        SessionBackend::Memory => {
            tracing::warn!("Using in-memory sessions; they will not survive a restart");
            Arc::new(MemorySessionStore::new())
        }
    };

    // Cleanup expired sessions on startup
    match sessions.delete_expired().await {
        Ok(count) if count > 0 => {
            tracing::info!(
                deleted_sessions = count,
                "Cleaned up expired sessions on startup"
            );
        }
        Ok(_) => {}
        Err(e) => {
            tracing::warn!(error = %e, "Failed to cleanup expired sessions on startup");
        }
    }

    // Spawn periodic session cleanup task
    let cleanup_store = sessions.clone();
    let cleanup_interval_secs = config.session.cleanup_interval_seconds;
    tokio::spawn(async move {
        let mut interval =
            tokio::time::interval(std::time::Duration::from_secs(cleanup_interval_secs));
        loop {
            interval.tick().await;
            match cleanup_store.delete_expired().await {
                Ok(count) if count > 0 => {
                    tracing::debug!(deleted_sessions = count, "Periodic session cleanup");
                }
                Ok(_) => {}
                Err(e) => {
                    tracing::warn!(error = %e, "Failed to cleanup expired sessions");
                }
            }
        }
    });

    // Initialize the identity provider
    let redirect_url = origin
        .join("/logged-in")
        .expect("invalid callback URL")
        .to_string();
    let provider =
        CognitoProvider::new(&config.provider, redirect_url).expect("invalid provider configuration");
    let groups = CognitoGroupDirectory::new(&config.provider).await;
    let bridge = IdentityBridge::new(Arc::new(provider), Arc::new(groups));

    // Create application state
    let app_state = Arc::new(AppState::new(
        sessions,
        bridge,
        gate,
        origin,
        config.session,
    ));

    let app = app::router(app_state, ServeDir::new(&config.content_dir));

    let listener = tokio::net::TcpListener::bind(&config.bind_addr)
        .await
        .expect("failed to bind to address");

    tracing::info!("listening on http://{}", config.bind_addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .expect("server error");
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %e, "Failed to listen for shutdown signal");
        std::future::pending::<()>().await;
    }
    tracing::info!("Shutting down");
}
