use sea_orm_migration::MigratorTrait;
use std::sync::Arc;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use btc_pipeline::{
    config::PipelineConfig,
    router,
    services::dashboard_reader::{DashboardReader, LazyWarehouse},
    AppState,
};

#[tokio::main]
async fn main() {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info,btc_pipeline=debug,sqlx=warn".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    // Load environment variables
    dotenvy::dotenv().ok();

    let config = PipelineConfig::from_env().expect("Invalid configuration");
    let warehouse = Arc::new(LazyWarehouse::new(config.service_account_path.clone()));

    // Run migrations when the warehouse is reachable; the pages report the error otherwise
    match warehouse.connection().await {
        Ok(db) => {
            tracing::info!("Running migrations...");
            if let Err(e) = migration::Migrator::up(db, None).await {
                tracing::warn!("Failed to run migrations: {}", e);
            }
        }
        Err(e) => tracing::warn!(kind = e.kind(), "Warehouse not reachable at startup: {}", e),
    }

    let reader = DashboardReader::new(warehouse, config.timezone, config.cache_ttl);
    let app = router(AppState { reader });

    // Start server
    let listener = tokio::net::TcpListener::bind(&config.bind_addr)
        .await
        .unwrap();

    tracing::info!("Server listening on {}", listener.local_addr().unwrap());

    axum::serve(listener, app).await.unwrap();
}
