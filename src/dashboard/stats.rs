//! Descriptive statistics and SLA checks behind the dashboards.

use chrono::{DateTime, Timelike};
use chrono_tz::Tz;
use std::collections::BTreeMap;

use crate::models::dashboard::{GoldRecord, SilverRecord, SlaBucketEntry};

/// Expected samples per local hour of day across the silver window
pub const HOURLY_SLA: i64 = 30;

/// Expected samples per day (one per hour)
pub const DAILY_SLA: i64 = 24;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SlaStatus {
    Compliant,
    BelowThreshold,
}

impl SlaStatus {
    pub fn is_compliant(self) -> bool {
        self == SlaStatus::Compliant
    }
}

/// Below threshold only when strictly less; hitting the threshold is compliant.
pub fn sla_status(count: i64, threshold: i64) -> SlaStatus {
    if count < threshold {
        SlaStatus::BelowThreshold
    } else {
        SlaStatus::Compliant
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct SlaBucket {
    pub label: String,
    /// x position on the chart
    pub position: f64,
    pub count: i64,
    pub threshold: i64,
    pub status: SlaStatus,
}

impl SlaBucket {
    fn new(label: String, position: f64, count: i64, threshold: i64) -> Self {
        Self {
            label,
            position,
            count,
            threshold,
            status: sla_status(count, threshold),
        }
    }

    pub fn to_entry(&self, compliant_color: &str, below_color: &str) -> SlaBucketEntry {
        SlaBucketEntry {
            bucket: self.label.clone(),
            count: self.count,
            threshold: self.threshold,
            compliant: self.status.is_compliant(),
            color: match self.status {
                SlaStatus::Compliant => compliant_color.to_string(),
                SlaStatus::BelowThreshold => below_color.to_string(),
            },
        }
    }
}

/// Samples per local hour of day (0-23). Only hours that have samples appear.
pub fn hourly_ingestion(rows: &[SilverRecord]) -> Vec<SlaBucket> {
    let mut counts: BTreeMap<u32, i64> = BTreeMap::new();
    for row in rows {
        *counts.entry(row.price_timestamp.hour()).or_default() += 1;
    }

    counts
        .into_iter()
        .map(|(hour, count)| SlaBucket::new(format!("{:02}h", hour), hour as f64, count, HOURLY_SLA))
        .collect()
}

/// One bucket per gold day, in input order.
pub fn daily_ingestion(rows: &[GoldRecord]) -> Vec<SlaBucket> {
    rows.iter()
        .enumerate()
        .map(|(i, row)| {
            SlaBucket::new(
                row.data_referencia.format("%Y-%m-%d").to_string(),
                i as f64,
                row.total_coletas_dia,
                DAILY_SLA,
            )
        })
        .collect()
}

pub fn mean(values: impl IntoIterator<Item = f64>) -> Option<f64> {
    let (sum, n) = values
        .into_iter()
        .fold((0.0, 0usize), |(sum, n), v| (sum + v, n + 1));
    (n > 0).then(|| sum / n as f64)
}

#[derive(Debug, Clone, PartialEq)]
pub struct SilverKpis {
    /// First row of the newest-first result
    pub latest_price: f64,
    pub mean_price: f64,
    pub total_records: usize,
    pub window_start: DateTime<Tz>,
    pub window_end: DateTime<Tz>,
}

/// `None` when the silver view is empty.
pub fn silver_kpis(rows: &[SilverRecord]) -> Option<SilverKpis> {
    let latest = rows.first()?;
    let window_start = rows.iter().map(|r| r.price_timestamp).min()?;
    let window_end = rows.iter().map(|r| r.price_timestamp).max()?;

    Some(SilverKpis {
        latest_price: latest.price_usd,
        mean_price: mean(rows.iter().map(|r| r.price_usd))?,
        total_records: rows.len(),
        window_start,
        window_end,
    })
}
