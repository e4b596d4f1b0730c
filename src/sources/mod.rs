//! Market listing collaborators.
//!
//! Each platform has a [`MarketSource`] that fetches its listings and flattens
//! them into [`MarketRecord`]s. Pagination, status filtering and retries live
//! here; the matching engine only ever sees the finished record lists.
//!
//! ## Sources
//!
//! - **polymarket**: Gamma REST `/markets`
//! - **opinion**: Opinion open API (paged), or a fallback that yields nothing
//!   when the API isn't configured

mod opinion;
mod polymarket;

pub use opinion::{opinion_record, OpinionApiClient, OpinionSource};
pub use polymarket::{polymarket_record, PolymarketSource};

use anyhow::Result;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde_json::Value;
use tracing::info;

use crate::types::{MarketRecord, Platform};

/// A platform that can list its markets
#[async_trait]
pub trait MarketSource: Send + Sync {
    fn platform(&self) -> Platform;

    async fn fetch_markets(&self) -> Result<Vec<MarketRecord>>;
}

/// Fetch from a source and keep at most `max` records.
pub async fn fetch_capped(source: &dyn MarketSource, max: Option<usize>) -> Result<Vec<MarketRecord>> {
    let mut records = source.fetch_markets().await?;
    if let Some(max) = max {
        if records.len() > max {
            info!(
                platform = %source.platform(),
                fetched = records.len(),
                kept = max,
                "Capping market listing"
            );
            records.truncate(max);
        }
    }
    Ok(records)
}

/// First non-empty string among `keys`; numbers are stringified.
pub(crate) fn first_string(obj: &Value, keys: &[&str]) -> Option<String> {
    keys.iter().find_map(|key| match obj.get(*key)? {
        Value::String(s) if !s.trim().is_empty() => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    })
}

/// Like [`first_string`], but unix-second numbers become RFC 3339.
pub(crate) fn first_timestamp(obj: &Value, keys: &[&str]) -> Option<String> {
    keys.iter().find_map(|key| match obj.get(*key)? {
        Value::String(s) if !s.trim().is_empty() => Some(s.clone()),
        Value::Number(n) => n
            .as_i64()
            .or_else(|| n.as_f64().map(|f| f as i64))
            .and_then(|secs| DateTime::<Utc>::from_timestamp(secs, 0))
            .map(|t| t.to_rfc3339()),
        _ => None,
    })
}
