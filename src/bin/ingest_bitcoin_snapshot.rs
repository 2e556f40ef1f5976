use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use btc_pipeline::{config::PipelineConfig, pipeline::ingest_snapshot};

#[tokio::main]
async fn main() {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info,btc_pipeline=debug,sqlx=warn".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    dotenvy::dotenv().ok();

    let result = match PipelineConfig::from_env() {
        Ok(config) => ingest_snapshot(&config).await,
        Err(e) => Err(e),
    };

    match result {
        Ok(summary) => println!("Success! {}", summary),
        Err(e) => {
            tracing::error!(kind = e.kind(), "Snapshot ingestion failed");
            println!("Error: {}", e);
        }
    }
}
