//! Dashboard Reader
//!
//! Read-only queries against the silver and gold views. Results are cached by
//! query text for a fixed TTL; nothing else invalidates them.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use chrono_tz::Tz;
use moka::future::Cache;
use sea_orm::{Database, DatabaseConnection, DbBackend, FromQueryResult, Statement};
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::OnceCell;

use crate::credentials::ServiceAccount;
use crate::error::{PipelineError, PipelineResult};
use crate::models::dashboard::{GoldRecord, SilverRecord, SilverRow};

pub const SILVER_QUERY: &str = "SELECT price_timestamp, price_usd, source \
     FROM raw_data.bitcoin_prices_silver ORDER BY price_timestamp DESC";

pub const GOLD_QUERY: &str =
    "SELECT * FROM raw_data.gold_bitcoin_daily_metrics ORDER BY data_referencia ASC";

/// Something that can run the dashboard queries.
#[async_trait]
pub trait ViewSource: Send + Sync {
    async fn query_silver(&self, sql: &str) -> PipelineResult<Vec<SilverRow>>;
    async fn query_gold(&self, sql: &str) -> PipelineResult<Vec<GoldRecord>>;
}

/// Warehouse connection opened on first use.
///
/// The credential file is read when the first query arrives, so a missing file
/// surfaces as a configuration error on the page rather than at startup.
pub struct LazyWarehouse {
    credentials_path: PathBuf,
    conn: OnceCell<DatabaseConnection>,
}

impl LazyWarehouse {
    pub fn new(credentials_path: impl Into<PathBuf>) -> Self {
        Self {
            credentials_path: credentials_path.into(),
            conn: OnceCell::new(),
        }
    }

    pub async fn connection(&self) -> PipelineResult<&DatabaseConnection> {
        self.conn
            .get_or_try_init(|| async {
                let account = ServiceAccount::from_file(&self.credentials_path)?;
                tracing::info!(identity = account.identity(), "Opening warehouse connection for dashboards");
                Database::connect(account.warehouse_url.as_str())
                    .await
                    .map_err(|e| PipelineError::external("warehouse", None, e.to_string()))
            })
            .await
    }

    async fn fetch<T>(&self, sql: &str) -> PipelineResult<Vec<T>>
    where
        T: FromQueryResult + Send,
    {
        let db = self.connection().await?;
        T::find_by_statement(Statement::from_string(DbBackend::Postgres, sql))
            .all(db)
            .await
            .map_err(|e| PipelineError::external("warehouse", None, e.to_string()))
    }
}

#[async_trait]
impl ViewSource for LazyWarehouse {
    async fn query_silver(&self, sql: &str) -> PipelineResult<Vec<SilverRow>> {
        self.fetch(sql).await
    }

    async fn query_gold(&self, sql: &str) -> PipelineResult<Vec<GoldRecord>> {
        self.fetch(sql).await
    }
}

#[derive(Clone)]
pub struct DashboardReader {
    source: Arc<dyn ViewSource>,
    timezone: Tz,
    silver_cache: Cache<String, Arc<Vec<SilverRow>>>,
    gold_cache: Cache<String, Arc<Vec<GoldRecord>>>,
}

impl DashboardReader {
    pub fn new(source: Arc<dyn ViewSource>, timezone: Tz, cache_ttl: Duration) -> Self {
        Self {
            source,
            timezone,
            silver_cache: Cache::builder()
                .max_capacity(16)
                .time_to_live(cache_ttl)
                .build(),
            gold_cache: Cache::builder()
                .max_capacity(16)
                .time_to_live(cache_ttl)
                .build(),
        }
    }

    pub fn timezone(&self) -> Tz {
        self.timezone
    }

    /// Silver rows, newest first, with timestamps in the dashboard's zone.
    pub async fn load_silver(&self) -> PipelineResult<Vec<SilverRecord>> {
        let rows = match self.silver_cache.get(SILVER_QUERY).await {
            Some(rows) => {
                tracing::debug!("Cache hit for silver query");
                rows
            }
            None => {
                tracing::info!("Querying silver layer");
                let rows = Arc::new(self.source.query_silver(SILVER_QUERY).await?);
                self.silver_cache
                    .insert(SILVER_QUERY.to_string(), rows.clone())
                    .await;
                rows
            }
        };

        Ok(rows
            .iter()
            .map(|row| SilverRecord {
                price_timestamp: to_local(row.price_timestamp, self.timezone),
                price_usd: row.price_usd,
                source: row.source.clone(),
            })
            .collect())
    }

    /// Gold rows, oldest day first. Cache hits share the cached rows.
    pub async fn load_gold(&self) -> PipelineResult<Arc<Vec<GoldRecord>>> {
        if let Some(rows) = self.gold_cache.get(GOLD_QUERY).await {
            tracing::debug!("Cache hit for gold query");
            return Ok(rows);
        }

        tracing::info!("Querying gold layer");
        let rows = Arc::new(self.source.query_gold(GOLD_QUERY).await?);
        self.gold_cache
            .insert(GOLD_QUERY.to_string(), rows.clone())
            .await;

        Ok(rows)
    }
}

pub fn to_local(ts: DateTime<Utc>, tz: Tz) -> DateTime<Tz> {
    ts.with_timezone(&tz)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{NaiveDate, TimeZone, Timelike};
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[derive(Default)]
    struct CountingSource {
        silver_calls: AtomicUsize,
        gold_calls: AtomicUsize,
        fail_first: bool,
    }

    #[async_trait]
    impl ViewSource for CountingSource {
        async fn query_silver(&self, sql: &str) -> PipelineResult<Vec<SilverRow>> {
            assert_eq!(sql, SILVER_QUERY);
            let call = self.silver_calls.fetch_add(1, Ordering::SeqCst);
            if self.fail_first && call == 0 {
                return Err(PipelineError::external("warehouse", None, "boom"));
            }
            Ok(vec![SilverRow {
                price_timestamp: Utc.with_ymd_and_hms(2024, 3, 20, 15, 0, 0).unwrap(),
                price_usd: 69792.76,
                source: "coingecko_api".into(),
            }])
        }

        async fn query_gold(&self, sql: &str) -> PipelineResult<Vec<GoldRecord>> {
            assert_eq!(sql, GOLD_QUERY);
            self.gold_calls.fetch_add(1, Ordering::SeqCst);
            Ok(vec![GoldRecord {
                data_referencia: NaiveDate::from_ymd_opt(2024, 3, 20).unwrap(),
                preco_fechamento_usd: 1.0,
                preco_maximo_usd: 2.0,
                preco_minimo_usd: 0.5,
                preco_medio_usd: 1.2,
                media_movel_7d: 1.1,
                total_coletas_dia: 24,
            }])
        }
    }

    fn reader(source: Arc<CountingSource>, ttl: Duration) -> DashboardReader {
        DashboardReader::new(source, chrono_tz::America::Sao_Paulo, ttl)
    }

    #[tokio::test]
    async fn test_silver_is_cached_within_ttl() {
        let source = Arc::new(CountingSource::default());
        let reader = reader(source.clone(), Duration::from_secs(600));

        reader.load_silver().await.unwrap();
        reader.load_silver().await.unwrap();
        reader.load_silver().await.unwrap();

        assert_eq!(source.silver_calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_requery_after_ttl_expiry() {
        let source = Arc::new(CountingSource::default());
        let reader = reader(source.clone(), Duration::from_millis(200));

        reader.load_gold().await.unwrap();
        reader.load_gold().await.unwrap();
        assert_eq!(source.gold_calls.load(Ordering::SeqCst), 1);

        tokio::time::sleep(Duration::from_millis(450)).await;

        reader.load_gold().await.unwrap();
        assert_eq!(source.gold_calls.load(Ordering::SeqCst), 2);
        reader.load_gold().await.unwrap();
        assert_eq!(source.gold_calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn test_gold_cache_hits_share_rows() {
        let source = Arc::new(CountingSource::default());
        let reader = reader(source, Duration::from_secs(600));

        let first = reader.load_gold().await.unwrap();
        let second = reader.load_gold().await.unwrap();
        assert!(Arc::ptr_eq(&first, &second));
        assert_eq!(first[0].total_coletas_dia, 24);
    }

    #[tokio::test]
    async fn test_failures_are_not_cached() {
        let source = Arc::new(CountingSource {
            fail_first: true,
            ..Default::default()
        });
        let reader = reader(source.clone(), Duration::from_secs(600));

        assert!(reader.load_silver().await.is_err());
        assert!(reader.load_silver().await.is_ok());
        assert_eq!(source.silver_calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn test_silver_timestamps_are_localized() {
        let source = Arc::new(CountingSource::default());
        let rows = reader(source, Duration::from_secs(600)).load_silver().await.unwrap();

        // Sao Paulo is UTC-3 with no DST since 2019
        assert_eq!(rows[0].price_timestamp.hour(), 12);
        assert_eq!(
            rows[0].price_timestamp.with_timezone(&Utc),
            Utc.with_ymd_and_hms(2024, 3, 20, 15, 0, 0).unwrap()
        );
    }

    #[tokio::test]
    async fn test_missing_credentials_fail_before_connecting() {
        let warehouse = LazyWarehouse::new("no/such/dir/service_account.json");
        let err = warehouse.query_gold(GOLD_QUERY).await.unwrap_err();
        assert!(matches!(err, PipelineError::Configuration(_)));
        assert!(warehouse.conn.get().is_none());
    }
}
