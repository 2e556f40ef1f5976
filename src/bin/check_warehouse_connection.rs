use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use btc_pipeline::{config::PipelineConfig, error::PipelineResult, pipeline::verify_warehouse_connection};

/// Writes the marker row and returns where it went.
async fn run() -> PipelineResult<String> {
    let config = PipelineConfig::from_env()?;
    verify_warehouse_connection(&config).await?;
    Ok(format!("{} (project {})", config.connection_check_table, config.project_id))
}

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

    match run().await {
        Ok(destination) => println!("Success! Data written to {}", destination),
        Err(e) => {
            tracing::error!(kind = e.kind(), "Connection check failed");
            println!("Error: {}", e);
        }
    }
}
