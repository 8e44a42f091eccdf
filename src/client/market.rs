//! Spot-market data fetcher over a Binance-style public REST API.
//!
//! Two endpoints are used per run: the 24h ticker for spot/high/low/volume
//! and hourly klines for the close-price history the indicators need.

use async_trait::async_trait;
use serde::Deserialize;
use serde_json::Value;

use crate::engine::ports::MarketDataSource;
use crate::strategy::MarketSnapshot;
use crate::types::MarketApiConfig;

use super::{ClientError, ClientResult};

/// Minimum number of hourly closes required by the indicator stack
/// (MACD needs 27; we ask for a 48h window and enforce this floor).
pub const MIN_HISTORY_POINTS: usize = 30;

const KLINE_LIMIT: u32 = 48;

#[derive(Debug, Deserialize)]
struct Ticker24h {
    #[serde(rename = "lastPrice")]
    last_price: String,
    #[serde(rename = "highPrice")]
    high_price: String,
    #[serde(rename = "lowPrice")]
    low_price: String,
    #[serde(rename = "volume")]
    volume: String,
}

fn parse_price(raw: &str, field: &str) -> ClientResult<f64> {
    raw.parse::<f64>()
        .map_err(|_| ClientError::MalformedData(format!("unparseable {field}: {raw:?}")))
}

/// HTTP market data source; implements the engine's `MarketDataSource` port.
pub struct MarketDataFetcher {
    http: reqwest::Client,
    base_url: String,
    symbol: String,
}

impl MarketDataFetcher {
    pub fn new(http: reqwest::Client, cfg: &MarketApiConfig) -> Self {
        Self {
            http,
            base_url: cfg.base_url.trim_end_matches('/').to_string(),
            symbol: cfg.symbol.clone(),
        }
    }

    async fn fetch_ticker(&self) -> ClientResult<Ticker24h> {
        let url = format!("{}/api/v3/ticker/24hr", self.base_url);
        let resp = self
            .http
            .get(&url)
            .query(&[("symbol", self.symbol.as_str())])
            .send()
            .await?;

        if !resp.status().is_success() {
            let status = resp.status();
            let body = resp.text().await.unwrap_or_default();
            return Err(ClientError::HttpStatus { status, body });
        }

        Ok(resp.json().await?)
    }

    /// Hourly close prices, oldest first.
    async fn fetch_hourly_closes(&self) -> ClientResult<Vec<f64>> {
        let url = format!("{}/api/v3/klines", self.base_url);
        let limit = KLINE_LIMIT.to_string();
        let resp = self
            .http
            .get(&url)
            .query(&[
                ("symbol", self.symbol.as_str()),
                ("interval", "1h"),
                ("limit", limit.as_str()),
            ])
            .send()
            .await?;

        if !resp.status().is_success() {
            let status = resp.status();
            let body = resp.text().await.unwrap_or_default();
            return Err(ClientError::HttpStatus { status, body });
        }

        // Klines arrive as positional arrays; index 4 is the close.
        let rows: Vec<Vec<Value>> = resp.json().await?;
        let mut closes = Vec::with_capacity(rows.len());
        for row in &rows {
            let close = row
                .get(4)
                .and_then(|v| v.as_str())
                .ok_or_else(|| ClientError::MalformedData("kline row missing close".into()))?;
            closes.push(parse_price(close, "close")?);
        }
        Ok(closes)
    }
}

#[async_trait]
impl MarketDataSource for MarketDataFetcher {
    async fn fetch_snapshot(&self) -> anyhow::Result<MarketSnapshot> {
        let ticker = self.fetch_ticker().await?;
        let price_history = self.fetch_hourly_closes().await?;

        if price_history.len() < MIN_HISTORY_POINTS {
            return Err(ClientError::MalformedData(format!(
                "only {} hourly closes returned, need at least {}",
                price_history.len(),
                MIN_HISTORY_POINTS
            ))
            .into());
        }

        Ok(MarketSnapshot {
            price: parse_price(&ticker.last_price, "lastPrice")?,
            high_24h: parse_price(&ticker.high_price, "highPrice")?,
            low_24h: parse_price(&ticker.low_price, "lowPrice")?,
            volume_24h: parse_price(&ticker.volume, "volume")?,
            price_history,
        })
    }
}
