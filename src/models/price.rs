use chrono::{DateTime, Utc};
use sea_orm::Value;
use serde::{Deserialize, Serialize};

use crate::services::warehouse::{ColumnKind, ColumnSpec, WarehouseRecord};

/// One `(timestamp, price)` sample from the pricing API.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PriceObservation {
    pub timestamp: DateTime<Utc>,
    pub price: f64,
}

impl PriceObservation {
    /// From the API's `[epoch_ms, price]` pair. `None` if the epoch is out of range.
    pub fn from_epoch_millis(epoch_ms: i64, price: f64) -> Option<Self> {
        DateTime::from_timestamp_millis(epoch_ms).map(|timestamp| Self { timestamp, price })
    }
}

/// Current price of one asset in one currency (`/simple/price`).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PriceSnapshot {
    pub asset_id: String,
    pub currency: String,
    pub price: f64,
    pub last_updated_at: Option<DateTime<Utc>>,
}

/// A price observation plus lineage, as stored in the bronze table.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BronzeRecord {
    pub asset_id: String,
    pub currency: String,
    pub price: f64,
    pub price_timestamp: DateTime<Utc>,
    pub ingestion_timestamp: DateTime<Utc>,
    pub run_id: String,
    pub source: String,
}

impl WarehouseRecord for BronzeRecord {
    fn columns() -> Vec<ColumnSpec> {
        vec![
            ColumnSpec::new("asset_id", ColumnKind::Text),
            ColumnSpec::new("currency", ColumnKind::Text),
            ColumnSpec::new("price", ColumnKind::Double),
            ColumnSpec::new("price_timestamp", ColumnKind::TimestampTz),
            ColumnSpec::new("ingestion_timestamp", ColumnKind::TimestampTz),
            ColumnSpec::new("run_id", ColumnKind::Text),
            ColumnSpec::new("source", ColumnKind::Text),
        ]
    }

    fn values(&self) -> Vec<Value> {
        vec![
            self.asset_id.clone().into(),
            self.currency.clone().into(),
            self.price.into(),
            self.price_timestamp.into(),
            self.ingestion_timestamp.into(),
            self.run_id.clone().into(),
            self.source.clone().into(),
        ]
    }
}

/// Single row written by the warehouse connection check.
#[derive(Debug, Clone, PartialEq)]
pub struct ConnectionCheckRecord {
    pub aluno: String,
    pub status: String,
    pub data: DateTime<Utc>,
}

impl WarehouseRecord for ConnectionCheckRecord {
    fn columns() -> Vec<ColumnSpec> {
        vec![
            ColumnSpec::new("aluno", ColumnKind::Text),
            ColumnSpec::new("status", ColumnKind::Text),
            ColumnSpec::new("data", ColumnKind::TimestampTz),
        ]
    }

    fn values(&self) -> Vec<Value> {
        vec![
            self.aluno.clone().into(),
            self.status.clone().into(),
            self.data.into(),
        ]
    }
}
