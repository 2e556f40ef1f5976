//! Record Shaper
//!
//! Turns raw price observations into bronze rows carrying lineage metadata.
//! Pure: the run id and ingestion time come from the [`RunContext`].

use chrono::{DateTime, Utc};
use uuid::Uuid;

use crate::models::price::{BronzeRecord, PriceObservation, PriceSnapshot};

/// Lineage tag written into the `source` column
pub const SOURCE_TAG: &str = "coingecko_api";

/// Lineage shared by every row of one pipeline execution.
#[derive(Debug, Clone, PartialEq)]
pub struct RunContext {
    pub run_id: String,
    pub ingestion_timestamp: DateTime<Utc>,
    pub asset_id: String,
    pub currency: String,
    pub source: String,
}

impl RunContext {
    /// Fresh context: random v4 run id, ingestion time is now.
    pub fn new(asset_id: &str, currency: &str) -> Self {
        Self::with_clock(asset_id, currency, Uuid::new_v4(), Utc::now())
    }

    pub fn with_clock(
        asset_id: &str,
        currency: &str,
        run_id: Uuid,
        ingestion_timestamp: DateTime<Utc>,
    ) -> Self {
        Self {
            run_id: run_id.to_string(),
            ingestion_timestamp,
            asset_id: asset_id.to_string(),
            currency: currency.to_string(),
            source: SOURCE_TAG.to_string(),
        }
    }

    fn record(&self, price: f64, price_timestamp: DateTime<Utc>) -> BronzeRecord {
        BronzeRecord {
            asset_id: self.asset_id.clone(),
            currency: self.currency.clone(),
            price,
            price_timestamp,
            ingestion_timestamp: self.ingestion_timestamp,
            run_id: self.run_id.clone(),
            source: self.source.clone(),
        }
    }
}

/// One bronze row per observation, in input order.
pub fn shape_bronze(observations: &[PriceObservation], ctx: &RunContext) -> Vec<BronzeRecord> {
    observations
        .iter()
        .map(|obs| ctx.record(obs.price, obs.timestamp))
        .collect()
}

/// A snapshot becomes a single bronze row. Without a `last_updated_at` from
/// the API, the observation time falls back to the ingestion time.
pub fn shape_snapshot(snapshot: &PriceSnapshot, ctx: &RunContext) -> BronzeRecord {
    let observed_at = snapshot.last_updated_at.unwrap_or(ctx.ingestion_timestamp);
    let mut record = ctx.record(snapshot.price, observed_at);
    record.asset_id = snapshot.asset_id.clone();
    record.currency = snapshot.currency.clone();
    record
}
