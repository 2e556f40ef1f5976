//! Dashboard request/response models
//!
//! Rows read from the silver and gold views, plus the JSON bodies served by
//! `/api/silver` and `/api/gold`.

use chrono::{DateTime, NaiveDate, Utc};
use chrono_tz::Tz;
use sea_orm::FromQueryResult;
use serde::{Deserialize, Serialize};

/// Raw row from `raw_data.bitcoin_prices_silver`.
#[derive(Debug, Clone, PartialEq, FromQueryResult)]
pub struct SilverRow {
    pub price_timestamp: DateTime<Utc>,
    pub price_usd: f64,
    pub source: String,
}

/// Silver row with its timestamp shifted to the dashboard's local zone.
#[derive(Debug, Clone, PartialEq)]
pub struct SilverRecord {
    pub price_timestamp: DateTime<Tz>,
    pub price_usd: f64,
    pub source: String,
}

/// One day from `raw_data.gold_bitcoin_daily_metrics`.
#[derive(Debug, Clone, PartialEq, FromQueryResult, Serialize, Deserialize)]
pub struct GoldRecord {
    pub data_referencia: NaiveDate,
    pub preco_fechamento_usd: f64,
    pub preco_maximo_usd: f64,
    pub preco_minimo_usd: f64,
    pub preco_medio_usd: f64,
    pub media_movel_7d: f64,
    pub total_coletas_dia: i64,
}

/// SLA verdict for one bucket, serialized with its display color
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SlaBucketEntry {
    pub bucket: String,
    pub count: i64,
    pub threshold: i64,
    pub compliant: bool,
    pub color: String,
}

/// Response for GET /api/silver
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SilverSummaryResponse {
    pub latest_price_usd: Option<f64>,
    pub mean_price_usd: Option<f64>,
    pub total_records: usize,
    pub window_start: Option<String>,        // local time, RFC 3339
    pub window_end: Option<String>,
    pub timezone: String,
    pub hourly_ingestion: Vec<SlaBucketEntry>,
}

/// Response for GET /api/gold
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GoldSummaryResponse {
    pub days: usize,
    pub latest_close_usd: Option<f64>,
    pub days_below_sla: usize,
    pub daily_ingestion: Vec<SlaBucketEntry>,
    pub metrics: Vec<GoldRecord>,
}

/// Error body for the JSON endpoints
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DashboardErrorResponse {
    pub kind: String,
    pub error: String,
}
