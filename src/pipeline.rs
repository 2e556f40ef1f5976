//! Ingestion pipeline: extract → shape → load.
//!
//! Each function runs one pass start to finish. Any error aborts the pass; the
//! warehouse is only written after extraction and shaping have succeeded.
//!
//! The `ingest_*` entry points wire the real services from a
//! [`PipelineConfig`]: API key, then credential file, then extraction, and the
//! warehouse connection last.

use chrono::{DateTime, Utc};

use crate::config::{PipelineConfig, ASSET_ID, CURRENCY, HISTORY_DAYS};
use crate::credentials::ServiceAccount;
use crate::error::PipelineResult;
use crate::models::price::ConnectionCheckRecord;
use crate::services::coingecko::{CoinGeckoService, PriceSource};
use crate::services::warehouse::{DeferredWarehouse, LoadMode, RecordBatch, TableRef, WarehouseSink};
use crate::shaper::{shape_bronze, shape_snapshot, RunContext};

#[derive(Debug, Clone, PartialEq)]
pub struct IngestionSummary {
    pub run_id: String,
    pub destination: TableRef,
    pub rows_written: u64,
}

impl std::fmt::Display for IngestionSummary {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "Loaded {} records into {} (run {})",
            self.rows_written, self.destination, self.run_id
        )
    }
}

/// Pull the 30-day history and append it to the bronze table.
pub async fn run_history_ingestion<P, W>(
    source: &P,
    sink: &W,
    destination: &TableRef,
    ctx: &RunContext,
) -> PipelineResult<IngestionSummary>
where
    P: PriceSource + ?Sized,
    W: WarehouseSink + ?Sized,
{
    tracing::info!(run_id = %ctx.run_id, "Fetching {}-day history from CoinGecko...", HISTORY_DAYS);
    let observations = source.fetch_market_chart(ASSET_ID, CURRENCY, HISTORY_DAYS).await?;

    let records = shape_bronze(&observations, ctx);
    tracing::info!(
        run_id = %ctx.run_id,
        destination = %destination,
        "Sending {} records to the bronze layer",
        records.len()
    );

    let rows_written = sink
        .write_batch(destination, RecordBatch::from_records(&records), LoadMode::Append)
        .await?;

    Ok(IngestionSummary {
        run_id: ctx.run_id.clone(),
        destination: destination.clone(),
        rows_written,
    })
}

/// Append the current price as a single bronze row.
pub async fn run_snapshot_ingestion<P, W>(
    source: &P,
    sink: &W,
    destination: &TableRef,
    ctx: &RunContext,
) -> PipelineResult<IngestionSummary>
where
    P: PriceSource + ?Sized,
    W: WarehouseSink + ?Sized,
{
    let snapshot = source.fetch_simple_price(ASSET_ID, CURRENCY).await?;
    tracing::debug!(price = snapshot.price, "Current price fetched");

    let record = shape_snapshot(&snapshot, ctx);
    let rows_written = sink
        .write_batch(destination, RecordBatch::from_records(&[record]), LoadMode::Append)
        .await?;

    Ok(IngestionSummary {
        run_id: ctx.run_id.clone(),
        destination: destination.clone(),
        rows_written,
    })
}

/// Replace `destination` with a single marker row to prove the credential works.
pub async fn check_connection<W>(
    sink: &W,
    destination: &TableRef,
    identity: &str,
    now: DateTime<Utc>,
) -> PipelineResult<u64>
where
    W: WarehouseSink + ?Sized,
{
    let record = ConnectionCheckRecord {
        aluno: identity.to_string(),
        status: "Cloud connection OK".to_string(),
        data: now,
    };

    sink.write_batch(destination, RecordBatch::from_records(&[record]), LoadMode::Replace)
        .await
}

fn coingecko(config: &PipelineConfig, api_key: &str) -> CoinGeckoService {
    CoinGeckoService::new(
        Some(api_key.to_string()),
        config.api_key_header.clone(),
        config.base_url.clone(),
    )
}

/// `ingest_bitcoin`: 30-day history appended to the bronze table.
pub async fn ingest_history(config: &PipelineConfig) -> PipelineResult<IngestionSummary> {
    let api_key = config.require_api_key()?;
    // Credential problems surface before any network call
    let account = ServiceAccount::from_file(&config.service_account_path)?;

    let warehouse = DeferredWarehouse::new(account);
    let ctx = RunContext::new(ASSET_ID, CURRENCY);
    run_history_ingestion(&coingecko(config, api_key), &warehouse, &config.bronze_table, &ctx).await
}

/// `ingest_bitcoin_snapshot`: current price appended as one bronze row.
pub async fn ingest_snapshot(config: &PipelineConfig) -> PipelineResult<IngestionSummary> {
    let api_key = config.require_api_key()?;
    let account = ServiceAccount::from_file(&config.service_account_path)?;

    let warehouse = DeferredWarehouse::new(account);
    let ctx = RunContext::new(ASSET_ID, CURRENCY);
    run_snapshot_ingestion(&coingecko(config, api_key), &warehouse, &config.bronze_table, &ctx).await
}

/// `check_warehouse_connection`: one marker row into the check table.
pub async fn verify_warehouse_connection(config: &PipelineConfig) -> PipelineResult<u64> {
    let account = ServiceAccount::from_file(&config.service_account_path)?;
    tracing::info!(
        project = %config.project_id,
        credentials = %account.source_path().display(),
        "Credential file loaded"
    );

    let warehouse = DeferredWarehouse::new(account);
    let identity = warehouse.identity().to_string();
    check_connection(&warehouse, &config.connection_check_table, &identity, Utc::now()).await
}
