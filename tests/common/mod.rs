#![allow(dead_code)]

use async_trait::async_trait;
use axum::{http::StatusCode, routing::get, Json, Router};
use btc_pipeline::config::{PipelineConfig, ENV_API_KEY, ENV_BASE_URL, ENV_SERVICE_ACCOUNT_PATH};
use btc_pipeline::error::{PipelineError, PipelineResult};
use btc_pipeline::models::dashboard::{GoldRecord, SilverRow};
use btc_pipeline::models::price::{PriceObservation, PriceSnapshot};
use btc_pipeline::services::coingecko::PriceSource;
use btc_pipeline::services::dashboard_reader::ViewSource;
use btc_pipeline::services::warehouse::{LoadMode, RecordBatch, TableRef, WarehouseSink};
use chrono::{NaiveDate, TimeZone, Utc};
use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

/// Serve `app` on an ephemeral local port and return its base URL.
pub async fn spawn_server(app: Router) -> String {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
        .await
        .expect("Failed to bind test listener");
    let addr = listener.local_addr().unwrap();

    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });

    format!("http://{}", addr)
}

/// Fake market-chart endpoint answering with `status`. Returns the base URL
/// and a counter of requests received.
pub async fn spawn_market_chart(status: StatusCode) -> (String, Arc<AtomicUsize>) {
    let hits = Arc::new(AtomicUsize::new(0));
    let counter = hits.clone();

    let app = Router::new().route(
        "/coins/{id}/market_chart",
        get(move || {
            let counter = counter.clone();
            async move {
                counter.fetch_add(1, Ordering::SeqCst);
                (
                    status,
                    Json(serde_json::json!({
                        "prices": [[1700000000000i64, 35000.12], [1700003600000i64, 35010.5]]
                    })),
                )
            }
        }),
    );

    (spawn_server(app).await, hits)
}

/// Job configuration pointing at a local API and the given credential file.
pub fn job_config(base_url: &str, service_account_path: &str) -> PipelineConfig {
    let vars: HashMap<&str, String> = HashMap::from([
        (ENV_API_KEY, "test-key".to_string()),
        (ENV_BASE_URL, base_url.to_string()),
        (ENV_SERVICE_ACCOUNT_PATH, service_account_path.to_string()),
    ]);
    PipelineConfig::from_lookup(|key| vars.get(key).cloned()).unwrap()
}

/// Price source returning canned data or a canned error.
pub struct FakePriceSource {
    pub observations: Vec<PriceObservation>,
    pub fail_with_status: Option<u16>,
}

impl FakePriceSource {
    pub fn with_prices(raw: &[(i64, f64)]) -> Self {
        Self {
            observations: raw
                .iter()
                .map(|(ms, price)| PriceObservation::from_epoch_millis(*ms, *price).unwrap())
                .collect(),
            fail_with_status: None,
        }
    }

    pub fn failing(status: u16) -> Self {
        Self {
            observations: vec![],
            fail_with_status: Some(status),
        }
    }

    fn check(&self) -> PipelineResult<()> {
        match self.fail_with_status {
            Some(status) => Err(PipelineError::external("CoinGecko", Some(status), "rate limited")),
            None => Ok(()),
        }
    }
}

#[async_trait]
impl PriceSource for FakePriceSource {
    async fn fetch_market_chart(
        &self,
        _asset_id: &str,
        _currency: &str,
        _days: u32,
    ) -> PipelineResult<Vec<PriceObservation>> {
        self.check()?;
        Ok(self.observations.clone())
    }

    async fn fetch_simple_price(&self, asset_id: &str, currency: &str) -> PipelineResult<PriceSnapshot> {
        self.check()?;
        let last = self.observations.last().ok_or_else(|| {
            PipelineError::external("CoinGecko", None, "no price")
        })?;
        Ok(PriceSnapshot {
            asset_id: asset_id.to_string(),
            currency: currency.to_string(),
            price: last.price,
            last_updated_at: Some(last.timestamp),
        })
    }
}

/// Sink that records every write instead of touching a database.
#[derive(Default)]
pub struct RecordingSink {
    pub writes: Mutex<Vec<(TableRef, RecordBatch, LoadMode)>>,
    pub fail: bool,
}

impl RecordingSink {
    pub fn failing() -> Self {
        Self {
            writes: Mutex::new(vec![]),
            fail: true,
        }
    }

    pub fn write_count(&self) -> usize {
        self.writes.lock().unwrap().len()
    }
}

#[async_trait]
impl WarehouseSink for RecordingSink {
    async fn write_batch(
        &self,
        destination: &TableRef,
        batch: RecordBatch,
        mode: LoadMode,
    ) -> PipelineResult<u64> {
        if self.fail {
            return Err(PipelineError::Persistence(format!(
                "dataset {} not found",
                destination.dataset
            )));
        }
        let rows = batch.len() as u64;
        self.writes
            .lock()
            .unwrap()
            .push((destination.clone(), batch, mode));
        Ok(rows)
    }
}

/// View source with fixed silver and gold rows.
#[derive(Default)]
pub struct FakeViews {
    pub silver: Vec<SilverRow>,
    pub gold: Vec<GoldRecord>,
    pub error: Option<fn() -> PipelineError>,
    pub queries: AtomicUsize,
}

impl FakeViews {
    pub fn query_count(&self) -> usize {
        self.queries.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl ViewSource for FakeViews {
    async fn query_silver(&self, _sql: &str) -> PipelineResult<Vec<SilverRow>> {
        self.queries.fetch_add(1, Ordering::SeqCst);
        match self.error {
            Some(make) => Err(make()),
            None => Ok(self.silver.clone()),
        }
    }

    async fn query_gold(&self, _sql: &str) -> PipelineResult<Vec<GoldRecord>> {
        self.queries.fetch_add(1, Ordering::SeqCst);
        match self.error {
            Some(make) => Err(make()),
            None => Ok(self.gold.clone()),
        }
    }
}

/// Silver rows newest first, one per hour ending at 2024-03-20 15:00 UTC.
pub fn silver_rows(count: u32) -> Vec<SilverRow> {
    let end = Utc.with_ymd_and_hms(2024, 3, 20, 15, 0, 0).unwrap();
    (0..count)
        .map(|i| SilverRow {
            price_timestamp: end - chrono::Duration::hours(i as i64),
            price_usd: 65000.0 + i as f64,
            source: "coingecko_api".to_string(),
        })
        .collect()
}

pub fn gold_row(day: u32, close: f64, samples: i64) -> GoldRecord {
    GoldRecord {
        data_referencia: NaiveDate::from_ymd_opt(2024, 3, day).unwrap(),
        preco_fechamento_usd: close,
        preco_maximo_usd: close + 800.0,
        preco_minimo_usd: close - 800.0,
        preco_medio_usd: close + 25.0,
        media_movel_7d: close - 100.0,
        total_coletas_dia: samples,
    }
}
