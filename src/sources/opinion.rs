//! Opinion.trade market listing.
//!
//! The open API is paged: `GET {base}/market?page=N&limit=M&status=S` returns
//! `{"errno": 0, "result": {"list": [...]}}`. Paging stops at the first
//! non-zero `errno`, an empty page, or [`MAX_PAGES`].

use anyhow::{Context, Result};
use async_trait::async_trait;
use serde::Deserialize;
use serde_json::Value;
use std::future::Future;
use std::time::Duration;
use tracing::{debug, info, warn};

use super::{first_string, first_timestamp, MarketSource};
use crate::config::AppConfig;
use crate::retry::{retry_async, RetryPolicy};
use crate::types::{meta, MarketRecord, MarketStatus, Platform};

/// Hard stop for pagination
pub const MAX_PAGES: u32 = 200;

const OPINION_SITE: &str = "https://app.opinion.trade";

/// One page of the market listing
#[derive(Debug, Deserialize)]
struct MarketPage {
    #[serde(default)]
    errno: Option<i64>,
    #[serde(default)]
    errmsg: Option<String>,
    #[serde(default)]
    result: Option<PageResult>,
}

#[derive(Debug, Default, Deserialize)]
struct PageResult {
    #[serde(default)]
    list: Vec<Value>,
}

impl MarketPage {
    /// Items on this page, or `None` when paging should stop.
    fn into_items(self) -> Option<Vec<Value>> {
        if self.errno != Some(0) {
            debug!(errno = ?self.errno, errmsg = ?self.errmsg, "Opinion page rejected");
            return None;
        }
        let items = self.result.unwrap_or_default().list;
        (!items.is_empty()).then_some(items)
    }
}

/// Client for the paged Opinion market API
#[derive(Debug, Clone)]
pub struct OpinionApiClient {
    http: reqwest::Client,
    api_base: String,
    status: String,
    page_limit: u32,
    retry: RetryPolicy,
}

impl OpinionApiClient {
    pub fn new(api_base: &str, status: &str, page_limit: u32, retry: RetryPolicy) -> Result<Self> {
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(30))
            .build()
            .context("building Opinion HTTP client")?;
        Ok(Self {
            http,
            api_base: api_base.trim_end_matches('/').to_string(),
            status: status.trim().to_string(),
            page_limit: page_limit.max(1),
            retry,
        })
    }

    async fn fetch_page(&self, page: u32) -> Result<MarketPage> {
        let url = format!("{}/market", self.api_base);
        let mut query = vec![
            ("page", page.to_string()),
            ("limit", self.page_limit.to_string()),
        ];
        if !self.status.is_empty() {
            query.push(("status", self.status.clone()));
        }
        let resp = self
            .http
            .get(&url)
            .query(&query)
            .send()
            .await?
            .error_for_status()?;
        Ok(resp.json::<MarketPage>().await?)
    }

    /// Walk pages until the listing runs out.
    pub async fn fetch_all(&self) -> Result<Vec<Value>> {
        collect_pages(|page| {
            retry_async(&self.retry, "fetch_opinion_page", move || self.fetch_page(page))
        })
        .await
    }
}

/// Page walk behind [`OpinionApiClient::fetch_all`].
///
/// A failure on the first page is an error. A failure later keeps what
/// was already collected.
async fn collect_pages<F, Fut>(mut fetch_page: F) -> Result<Vec<Value>>
where
    F: FnMut(u32) -> Fut,
    Fut: Future<Output = Result<MarketPage>>,
{
    let mut items = Vec::new();
    for page in 1..=MAX_PAGES {
        let page_items = match fetch_page(page).await {
            Ok(body) => body.into_items(),
            Err(e) if page == 1 => return Err(e.context("fetching Opinion markets")),
            Err(e) => {
                warn!(page, collected = items.len(), "Opinion paging stopped early: {:#}", e);
                None
            }
        };
        match page_items {
            Some(batch) => {
                debug!(page, count = batch.len(), "Fetched Opinion page");
                items.extend(batch);
            }
            None => break,
        }
    }
    Ok(items)
}

/// Where Opinion listings come from for this run
#[derive(Debug, Clone)]
pub enum OpinionSource {
    Api(OpinionApiClient),
    /// No API configured; yields an empty listing
    Fallback,
}

impl OpinionSource {
    pub fn from_config(config: &AppConfig, retry: RetryPolicy) -> Result<Self> {
        match (&config.opinion_api_base, config.opinion_use_sdk) {
            (Some(base), true) => Ok(Self::Api(OpinionApiClient::new(
                base,
                &config.opinion_status,
                config.opinion_page_limit,
                retry,
            )?)),
            (None, true) => {
                warn!("OPINION_USE_SDK is set but OPINION_API_BASE is not; Opinion listing disabled");
                Ok(Self::Fallback)
            }
            (_, false) => Ok(Self::Fallback),
        }
    }
}

#[async_trait]
impl MarketSource for OpinionSource {
    fn platform(&self) -> Platform {
        Platform::Opinion
    }

    async fn fetch_markets(&self) -> Result<Vec<MarketRecord>> {
        match self {
            Self::Api(client) => {
                let records: Vec<MarketRecord> =
                    client.fetch_all().await?.iter().map(opinion_record).collect();
                info!(
                    status = %client.status,
                    count = records.len(),
                    "Fetched Opinion markets"
                );
                Ok(records)
            }
            Self::Fallback => {
                warn!("Opinion API not configured, continuing with an empty Opinion listing");
                Ok(Vec::new())
            }
        }
    }
}

/// Flatten one Opinion market object into a record.
pub fn opinion_record(market: &Value) -> MarketRecord {
    let title = first_string(market, &["market_title", "title", "question"]).unwrap_or_default();
    let id = first_string(market, &["market_id", "id"]).unwrap_or_default();
    let url = if id.is_empty() {
        format!("{}/", OPINION_SITE)
    } else {
        format!("{}/market/{}", OPINION_SITE, id)
    };
    let status_raw = first_string(market, &["status"]);
    let status = status_raw
        .as_deref()
        .map(MarketStatus::parse)
        .unwrap_or_default();

    MarketRecord::new(Platform::Opinion, id, title)
        .with_status(status)
        .with_meta(meta::URL, Some(url))
        .with_meta(meta::CATEGORY, first_string(market, &["topic_type", "category"]))
        .with_meta(meta::DEADLINE, first_timestamp(market, &["deadline", "end_time"]))
        .with_meta(meta::VOLUME, first_string(market, &["volume"]))
        .with_meta(meta::STATUS_RAW, status_raw)
}
