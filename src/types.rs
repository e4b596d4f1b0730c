//! Core data types shared by the matching engine and its collaborators.
//!
//! Records arrive from the fetch layer already flattened into a
//! platform-neutral shape; the engine only ever looks at `id` and the title.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::sync::OnceLock;

use crate::normalize::normalize;

/// Market platform a record was fetched from.
///
/// Polymarket is side A (the match source), Opinion is side B (the target).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Platform {
    Polymarket,
    Opinion,
}

impl Platform {
    /// Display label used in exports and logs
    pub fn label(&self) -> &'static str {
        match self {
            Platform::Polymarket => "Polymarket",
            Platform::Opinion => "Opinion",
        }
    }
}

impl fmt::Display for Platform {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Lifecycle status of a market, collapsed across both platforms' vocabularies.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MarketStatus {
    Active,
    Closed,
    Resolved,
    #[default]
    Unknown,
}

impl MarketStatus {
    /// Parse a platform status string.
    ///
    /// Polymarket uses `active`/`closed`/`resolved`, Opinion uses
    /// `ACTIVATED`/`RESOLVED` and friends.
    pub fn parse(s: &str) -> Self {
        match s.trim().to_lowercase().as_str() {
            "active" | "activated" | "open" | "live" => MarketStatus::Active,
            "closed" | "paused" => MarketStatus::Closed,
            "resolved" | "settled" | "finalized" => MarketStatus::Resolved,
            _ => MarketStatus::Unknown,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            MarketStatus::Active => "active",
            MarketStatus::Closed => "closed",
            MarketStatus::Resolved => "resolved",
            MarketStatus::Unknown => "unknown",
        }
    }
}

/// Metadata keys populated by the fetch collaborators.
pub mod meta {
    pub const URL: &str = "url";
    pub const CATEGORY: &str = "category";
    pub const DEADLINE: &str = "deadline";
    pub const VOLUME: &str = "volume";
    pub const STATUS_RAW: &str = "status_raw";
}

/// A single market listing as handed to the engine.
///
/// The normalized title is derived on first access and cached; the record is
/// otherwise never mutated after ingestion.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MarketRecord {
    pub id: String,
    pub platform: Platform,
    pub raw_title: String,
    pub status: MarketStatus,
    #[serde(default)]
    pub metadata: BTreeMap<String, String>,
    #[serde(skip)]
    normalized: OnceLock<String>,
}

impl MarketRecord {
    pub fn new(platform: Platform, id: impl Into<String>, raw_title: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            platform,
            raw_title: raw_title.into(),
            status: MarketStatus::Unknown,
            metadata: BTreeMap::new(),
            normalized: OnceLock::new(),
        }
    }

    pub fn with_status(mut self, status: MarketStatus) -> Self {
        self.status = status;
        self
    }

    /// Attach a metadata entry; empty values are skipped.
    pub fn with_meta(mut self, key: &str, value: Option<String>) -> Self {
        if let Some(v) = value.filter(|v| !v.trim().is_empty()) {
            self.metadata.insert(key.to_string(), v);
        }
        self
    }

    /// Normalized form of `raw_title`, computed once per record.
    pub fn normalized_title(&self) -> &str {
        self.normalized.get_or_init(|| normalize(&self.raw_title))
    }

    pub fn meta(&self, key: &str) -> Option<&str> {
        self.metadata.get(key).map(String::as_str)
    }
}

/// A scored cross-platform pair that cleared the threshold. Never persisted.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MatchCandidate {
    pub source_id: String,
    pub target_id: String,
    pub score: f64,
}

impl MatchCandidate {
    pub fn new(source_id: impl Into<String>, target_id: impl Into<String>, score: f64) -> Self {
        Self {
            source_id: source_id.into(),
            target_id: target_id.into(),
            score,
        }
    }
}

/// A row of the final match table. `rank` is the 1-based table position.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MatchResult {
    pub source_id: String,
    pub target_id: String,
    pub score: f64,
    pub rank: usize,
}
