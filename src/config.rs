//! Pipeline configuration
//!
//! Everything is read from the environment (after `dotenvy` has loaded `.env`).
//! Only the API key is mandatory, and only for the ingestion jobs.

use chrono_tz::Tz;
use std::env;
use std::path::PathBuf;
use std::time::Duration;

use crate::error::{PipelineError, PipelineResult};
use crate::services::warehouse::TableRef;

/// Environment variable for the CoinGecko API key
pub const ENV_API_KEY: &str = "COINGECKO_API_KEY";

/// Environment variable for the CoinGecko base URL
pub const ENV_BASE_URL: &str = "COINGECKO_BASE_URL";

/// Environment variable for the header carrying the API key
pub const ENV_API_KEY_HEADER: &str = "COINGECKO_API_KEY_HEADER";

/// Environment variable for the service-account credential file
pub const ENV_SERVICE_ACCOUNT_PATH: &str = "SERVICE_ACCOUNT_PATH";

pub const ENV_PROJECT_ID: &str = "WAREHOUSE_PROJECT_ID";
pub const ENV_BRONZE_TABLE: &str = "BRONZE_TABLE";
pub const ENV_CONNECTION_CHECK_TABLE: &str = "CONNECTION_CHECK_TABLE";
pub const ENV_CACHE_TTL: &str = "DASHBOARD_CACHE_TTL_SECS";
pub const ENV_TIMEZONE: &str = "DASHBOARD_TIMEZONE";
pub const ENV_BIND_ADDR: &str = "DASHBOARD_BIND_ADDR";

pub const DEFAULT_BASE_URL: &str = "https://api.coingecko.com/api/v3";
pub const DEFAULT_API_KEY_HEADER: &str = "x-cg-demo-api-key";
pub const DEFAULT_SERVICE_ACCOUNT_PATH: &str = "service_account.json";
pub const DEFAULT_PROJECT_ID: &str = "portfolio-data-eng";
pub const DEFAULT_BRONZE_TABLE: &str = "raw_data.bitcoin_prices_bronze";
pub const DEFAULT_CONNECTION_CHECK_TABLE: &str = "raw_data.teste_inicial";
pub const DEFAULT_TIMEZONE: &str = "America/Sao_Paulo";
pub const DEFAULT_BIND_ADDR: &str = "0.0.0.0:3000";

/// Default dashboard cache TTL in seconds (10 minutes)
pub const DEFAULT_CACHE_TTL_SECS: u64 = 600;

/// Longest accepted dashboard cache TTL (one day)
pub const MAX_CACHE_TTL_SECS: u64 = 86_400;

/// Asset, quote currency and window the ingestion job pulls.
pub const ASSET_ID: &str = "bitcoin";
pub const CURRENCY: &str = "usd";
pub const HISTORY_DAYS: u32 = 30;

#[derive(Debug, Clone)]
pub struct PipelineConfig {
    pub api_key: Option<String>,
    pub base_url: String,
    pub api_key_header: String,
    pub service_account_path: PathBuf,
    pub project_id: String,
    pub bronze_table: TableRef,
    pub connection_check_table: TableRef,
    pub cache_ttl: Duration,
    pub timezone: Tz,
    pub bind_addr: String,
}

impl PipelineConfig {
    pub fn from_env() -> PipelineResult<Self> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Build the configuration from an arbitrary key lookup.
    pub fn from_lookup<F>(lookup: F) -> PipelineResult<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        let cache_ttl_secs = match get(ENV_CACHE_TTL) {
            Some(raw) => raw.trim().parse::<u64>().map_err(|_| {
                PipelineError::Configuration(format!(
                    "{} must be a number of seconds, got '{}'",
                    ENV_CACHE_TTL, raw
                ))
            })?,
            None => DEFAULT_CACHE_TTL_SECS,
        };
        if cache_ttl_secs > MAX_CACHE_TTL_SECS {
            return Err(PipelineError::Configuration(format!(
                "{} must be at most {} seconds, got {}",
                ENV_CACHE_TTL, MAX_CACHE_TTL_SECS, cache_ttl_secs
            )));
        }

        let timezone_name = get(ENV_TIMEZONE).unwrap_or_else(|| DEFAULT_TIMEZONE.to_string());
        let timezone: Tz = timezone_name.trim().parse().map_err(|_| {
            PipelineError::Configuration(format!("Unknown time zone '{}'", timezone_name))
        })?;

        let bronze_table = TableRef::parse(
            &get(ENV_BRONZE_TABLE).unwrap_or_else(|| DEFAULT_BRONZE_TABLE.to_string()),
        )?;
        let connection_check_table = TableRef::parse(
            &get(ENV_CONNECTION_CHECK_TABLE)
                .unwrap_or_else(|| DEFAULT_CONNECTION_CHECK_TABLE.to_string()),
        )?;

        Ok(Self {
            api_key: get(ENV_API_KEY),
            base_url: get(ENV_BASE_URL)
                .map(|u| u.trim_end_matches('/').to_string())
                .unwrap_or_else(|| DEFAULT_BASE_URL.to_string()),
            api_key_header: get(ENV_API_KEY_HEADER)
                .unwrap_or_else(|| DEFAULT_API_KEY_HEADER.to_string()),
            service_account_path: get(ENV_SERVICE_ACCOUNT_PATH)
                .map(PathBuf::from)
                .unwrap_or_else(|| PathBuf::from(DEFAULT_SERVICE_ACCOUNT_PATH)),
            project_id: get(ENV_PROJECT_ID).unwrap_or_else(|| DEFAULT_PROJECT_ID.to_string()),
            bronze_table,
            connection_check_table,
            cache_ttl: Duration::from_secs(cache_ttl_secs),
            timezone,
            bind_addr: get(ENV_BIND_ADDR).unwrap_or_else(|| DEFAULT_BIND_ADDR.to_string()),
        })
    }

    /// The API key, or a configuration error naming the variable to set.
    pub fn require_api_key(&self) -> PipelineResult<&str> {
        self.api_key.as_deref().ok_or_else(|| {
            PipelineError::Configuration(format!("{} must be set", ENV_API_KEY))
        })
    }
}
