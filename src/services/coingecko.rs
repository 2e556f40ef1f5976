use async_trait::async_trait;
use chrono::DateTime;
use reqwest::Client;
use serde::Deserialize;
use std::collections::HashMap;

use crate::error::{PipelineError, PipelineResult};
use crate::models::price::{PriceObservation, PriceSnapshot};

const SERVICE: &str = "CoinGecko";

/// Where the pipeline gets its prices from.
#[async_trait]
pub trait PriceSource: Send + Sync {
    /// Historical `[timestamp, price]` samples for the last `days` days.
    async fn fetch_market_chart(
        &self,
        asset_id: &str,
        currency: &str,
        days: u32,
    ) -> PipelineResult<Vec<PriceObservation>>;

    /// Current price of a single asset.
    async fn fetch_simple_price(&self, asset_id: &str, currency: &str) -> PipelineResult<PriceSnapshot>;
}

#[derive(Clone)]
pub struct CoinGeckoService {
    client: Client,
    api_key: Option<String>,
    api_key_header: String,
    base_url: String,
}

#[derive(Debug, Deserialize)]
struct MarketChartResponse {
    prices: Vec<(i64, f64)>,
}

impl CoinGeckoService {
    pub fn new(api_key: Option<String>, api_key_header: String, base_url: String) -> Self {
        Self {
            client: Client::new(),
            api_key,
            api_key_header,
            base_url: base_url.trim_end_matches('/').to_string(),
        }
    }

    async fn get(&self, url: &str, query: &[(&str, &str)]) -> PipelineResult<reqwest::Response> {
        let mut request = self
            .client
            .get(url)
            .header("accept", "application/json")
            .query(query);

        if let Some(api_key) = &self.api_key {
            request = request.header(self.api_key_header.as_str(), api_key);
        }

        let response = request.send().await?;

        if !response.status().is_success() {
            let status = response.status();
            let error_text = response.text().await.unwrap_or_default();
            tracing::warn!(%status, url, "CoinGecko returned an error status");
            return Err(PipelineError::external(SERVICE, Some(status.as_u16()), error_text));
        }

        Ok(response)
    }
}

#[async_trait]
impl PriceSource for CoinGeckoService {
    async fn fetch_market_chart(
        &self,
        asset_id: &str,
        currency: &str,
        days: u32,
    ) -> PipelineResult<Vec<PriceObservation>> {
        tracing::info!("Fetching {}-day market chart for {} from CoinGecko", days, asset_id);

        let url = format!("{}/coins/{}/market_chart", self.base_url, asset_id);
        let days = days.to_string();
        let response = self
            .get(&url, &[("vs_currency", currency), ("days", days.as_str())])
            .await?;

        let data: MarketChartResponse = response.json().await?;

        let observations = data
            .prices
            .into_iter()
            .map(|(epoch_ms, price)| {
                PriceObservation::from_epoch_millis(epoch_ms, price).ok_or_else(|| {
                    PipelineError::external(
                        SERVICE,
                        None,
                        format!("timestamp {} is out of range", epoch_ms),
                    )
                })
            })
            .collect::<PipelineResult<Vec<_>>>()?;

        if let Some(last) = observations.last() {
            tracing::debug!(
                "Fetched {} prices for {}, last: {} @ {}",
                observations.len(),
                asset_id,
                last.price,
                last.timestamp.format("%Y-%m-%d %H:%M:%S")
            );
        }

        Ok(observations)
    }

    async fn fetch_simple_price(&self, asset_id: &str, currency: &str) -> PipelineResult<PriceSnapshot> {
        tracing::info!("Fetching current {} price for {} from CoinGecko", currency, asset_id);

        let url = format!("{}/simple/price", self.base_url);
        let response = self
            .get(
                &url,
                &[
                    ("ids", asset_id),
                    ("vs_currencies", currency),
                    ("include_last_updated_at", "true"),
                ],
            )
            .await?;

        // {"bitcoin": {"usd": 69792.76, "last_updated_at": 1711000000}}
        let body: HashMap<String, HashMap<String, f64>> = response.json().await?;

        parse_simple_price(body, asset_id, currency)
    }
}

fn parse_simple_price(
    mut body: HashMap<String, HashMap<String, f64>>,
    asset_id: &str,
    currency: &str,
) -> PipelineResult<PriceSnapshot> {
    let quotes = body.remove(asset_id).ok_or_else(|| {
        PipelineError::external(SERVICE, None, format!("no quote for '{}' in response", asset_id))
    })?;

    let price = *quotes.get(currency).ok_or_else(|| {
        PipelineError::external(
            SERVICE,
            None,
            format!("no '{}' price for '{}' in response", currency, asset_id),
        )
    })?;

    let last_updated_at = quotes
        .get("last_updated_at")
        .and_then(|secs| DateTime::from_timestamp(*secs as i64, 0));

    Ok(PriceSnapshot {
        asset_id: asset_id.to_string(),
        currency: currency.to_string(),
        price,
        last_updated_at,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn body(json: &str) -> HashMap<String, HashMap<String, f64>> {
        serde_json::from_str(json).unwrap()
    }

    #[test]
    fn test_market_chart_response_parses_pairs() {
        let data: MarketChartResponse = serde_json::from_str(
            r#"{"prices": [[1700000000000, 35000.12], [1700003600000, 35010.5]],
                "market_caps": [], "total_volumes": []}"#,
        )
        .unwrap();
        assert_eq!(data.prices, vec![(1_700_000_000_000, 35000.12), (1_700_003_600_000, 35010.5)]);
    }

    #[test]
    fn test_parse_simple_price_with_timestamp() {
        let snapshot = parse_simple_price(
            body(r#"{"bitcoin": {"usd": 69792.76, "last_updated_at": 1711000000}}"#),
            "bitcoin",
            "usd",
        )
        .unwrap();
        assert_eq!(snapshot.price, 69792.76);
        assert_eq!(snapshot.last_updated_at.unwrap().timestamp(), 1_711_000_000);
    }

    #[test]
    fn test_parse_simple_price_missing_currency() {
        let err = parse_simple_price(body(r#"{"bitcoin": {"eur": 1.0}}"#), "bitcoin", "usd").unwrap_err();
        assert!(matches!(err, PipelineError::ExternalService { status: None, .. }));
    }

    #[test]
    fn test_parse_simple_price_missing_asset() {
        let err = parse_simple_price(body("{}"), "bitcoin", "usd").unwrap_err();
        assert!(err.to_string().contains("bitcoin"));
    }
}
