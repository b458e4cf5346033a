//! ThreatLens Server entry point

use std::net::SocketAddr;
use std::sync::Arc;

use anyhow::Context;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use threatlens_server::{config, create_router, db, engine::ScanEngine, store::PgStore, AppState};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize logging
    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::try_from_default_env()
            .unwrap_or_else(|_| "threatlens_server=debug,tower_http=debug".into()))
        .with(tracing_subscriber::fmt::layer())
        .init();

    // Load configuration
    dotenvy::dotenv().ok();
    let config = config::Config::from_env();

    tracing::info!("ThreatLens Server starting ({})...", config.environment);
    tracing::info!("Database: {}", config.database_url.split('@').last().unwrap_or("***"));
    tracing::info!(
        "Catalog failure policy: {}, store timeout: {:?}",
        config.catalog_failure_policy,
        config.store_timeout
    );
    if config.is_production() && config.jwt_secret.starts_with("threatlens-dev-") {
        tracing::warn!("JWT_SECRET is still the development default");
    }

    // Initialize database pool
    let pool = db::create_pool(&config.database_url)
        .await
        .context("Failed to create database pool")?;

    // Run migrations
    tracing::info!("Running database migrations...");
    db::run_migrations(&pool)
        .await
        .context("Failed to run migrations")?;
    db::seed_patterns(&pool)
        .await
        .context("Failed to seed pattern catalog")?;

    // Wire the scan engine to Postgres
    let store = Arc::new(PgStore::new(pool.clone()));
    let engine = ScanEngine::new(store.clone(), store)
        .with_catalog_policy(config.catalog_failure_policy)
        .with_timeout(config.store_timeout);

    // Build application state
    let state = AppState {
        pool,
        engine: Arc::new(engine),
        config: config.clone(),
    };

    // Build router
    let app = create_router(state);

    // Start server
    let addr = SocketAddr::from(([0, 0, 0, 0], config.port));
    tracing::info!("Server listening on http://{}", addr);

    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("Failed to bind {}", addr))?;
    axum::serve(listener, app).await.context("Server error")?;

    Ok(())
}
