//! Polymarket market listing via the Gamma REST API.

use anyhow::{Context, Result};
use async_trait::async_trait;
use serde_json::Value;
use std::time::Duration;
use tracing::{debug, info};

use super::{first_string, first_timestamp, MarketSource};
use crate::retry::{retry_async, RetryPolicy};
use crate::types::{meta, MarketRecord, MarketStatus, Platform};

/// Status filters Gamma understands; anything else is not sent
const KNOWN_STATUSES: &[&str] = &["active", "closed", "resolved"];

const POLYMARKET_SITE: &str = "https://polymarket.com";

/// Polymarket Gamma `/markets` client
#[derive(Debug, Clone)]
pub struct PolymarketSource {
    http: reqwest::Client,
    api_base: String,
    status: String,
    retry: RetryPolicy,
}

impl PolymarketSource {
    pub fn new(api_base: &str, status: &str, retry: RetryPolicy) -> Result<Self> {
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(30))
            .build()
            .context("building Polymarket HTTP client")?;
        Ok(Self {
            http,
            api_base: api_base.trim_end_matches('/').to_string(),
            status: status.trim().to_lowercase(),
            retry,
        })
    }

    /// Query parameters for the listing request
    fn query(&self) -> Vec<(&'static str, String)> {
        if KNOWN_STATUSES.contains(&self.status.as_str()) {
            vec![("status", self.status.clone())]
        } else {
            Vec::new()
        }
    }

    async fn fetch_raw(&self) -> Result<Value> {
        let url = format!("{}/markets", self.api_base);
        debug!("Fetching Polymarket markets from: {}", url);
        let resp = self
            .http
            .get(&url)
            .query(&self.query())
            .send()
            .await?
            .error_for_status()?;
        Ok(resp.json::<Value>().await?)
    }
}

#[async_trait]
impl MarketSource for PolymarketSource {
    fn platform(&self) -> Platform {
        Platform::Polymarket
    }

    async fn fetch_markets(&self) -> Result<Vec<MarketRecord>> {
        let body = retry_async(&self.retry, "fetch_polymarket_markets", || self.fetch_raw())
            .await
            .context("fetching Polymarket markets")?;

        let records: Vec<MarketRecord> = market_list(&body).iter().map(polymarket_record).collect();
        info!(
            status = %self.status,
            count = records.len(),
            "Fetched Polymarket markets"
        );
        Ok(records)
    }
}

/// Locate the market array: either the body itself or under a known key.
fn market_list(body: &Value) -> &[Value] {
    let list = match body {
        Value::Array(_) => Some(body),
        Value::Object(_) => ["data", "markets", "result"]
            .iter()
            .find_map(|key| body.get(*key).filter(|v| !is_empty_value(v))),
        _ => None,
    };
    match list {
        Some(Value::Array(items)) => items.as_slice(),
        // {"data": {"data": [...]}} style nesting
        Some(Value::Object(_)) => list
            .and_then(|v| v.get("data"))
            .and_then(Value::as_array)
            .map(Vec::as_slice)
            .unwrap_or(&[]),
        _ => &[],
    }
}

fn is_empty_value(v: &Value) -> bool {
    match v {
        Value::Null => true,
        Value::Array(items) => items.is_empty(),
        _ => false,
    }
}

/// Flatten one Gamma market object into a record.
pub fn polymarket_record(market: &Value) -> MarketRecord {
    let title = first_string(market, &["question", "title", "name"]).unwrap_or_default();
    let id = first_string(market, &["id", "market_id", "slug", "conditionId"]).unwrap_or_default();
    let url = match first_string(market, &["slug", "url_slug"]) {
        Some(slug) => format!("{}/event/{}", POLYMARKET_SITE, slug),
        None => format!("{}/", POLYMARKET_SITE),
    };
    let status_raw = first_string(market, &["status"]);
    let status = status_raw
        .as_deref()
        .map(MarketStatus::parse)
        .unwrap_or_default();

    MarketRecord::new(Platform::Polymarket, id, title)
        .with_status(status)
        .with_meta(meta::URL, Some(url))
        .with_meta(meta::CATEGORY, first_string(market, &["category", "topic"]))
        .with_meta(
            meta::DEADLINE,
            first_timestamp(market, &["endDate", "end_time", "expiry"]),
        )
        .with_meta(meta::VOLUME, first_string(market, &["volume", "liquidity"]))
        .with_meta(meta::STATUS_RAW, status_raw)
}
