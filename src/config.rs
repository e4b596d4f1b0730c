//! Matching configuration and environment parsing.
//!
//! The engine only ever sees a [`MatchConfig`] value. Everything read from the
//! process environment is captured once into an [`AppConfig`] by the binary.

use std::fmt;
use tracing::warn;

use crate::error::MatchError;

/// Gamma API base URL (Polymarket market data)
pub const GAMMA_API_BASE: &str = "https://gamma-api.polymarket.com";

/// Default similarity threshold (0-100)
pub const DEFAULT_THRESHOLD: f64 = 86.0;

/// Default Opinion status filter
const DEFAULT_OPINION_STATUS: &str = "ACTIVATED";

/// Default Opinion page size
const DEFAULT_OPINION_PAGE_LIMIT: u32 = 20;

/// Default export directory
const DEFAULT_OUTPUT_DIR: &str = "out";

/// Pair selection policy
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum MatchMode {
    /// At most one partner per source and per target
    #[default]
    BestMatch,
    /// Every pair at or above threshold
    AllPairs,
}

impl MatchMode {
    /// Parse from environment variable string
    pub fn parse(s: &str) -> Option<Self> {
        match s.trim().to_lowercase().as_str() {
            "best" | "best_match" | "bestmatch" => Some(MatchMode::BestMatch),
            "all" | "all_pairs" | "allpairs" => Some(MatchMode::AllPairs),
            _ => None,
        }
    }
}

impl fmt::Display for MatchMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MatchMode::BestMatch => f.write_str("best_match"),
            MatchMode::AllPairs => f.write_str("all_pairs"),
        }
    }
}

/// Configuration for a matching run
#[derive(Debug, Clone, PartialEq)]
pub struct MatchConfig {
    /// Minimum score (0-100) for a pair to count as a match
    pub threshold: f64,
    /// Selection policy
    pub mode: MatchMode,
    /// Scoring worker count: None = shared rayon pool, Some(1) = sequential
    pub workers: Option<usize>,
}

impl Default for MatchConfig {
    fn default() -> Self {
        Self {
            threshold: DEFAULT_THRESHOLD,
            mode: MatchMode::BestMatch,
            workers: None,
        }
    }
}

impl MatchConfig {
    /// Build a validated config.
    pub fn new(threshold: f64, mode: MatchMode) -> Result<Self, MatchError> {
        let config = Self {
            threshold,
            mode,
            workers: None,
        };
        config.validate()?;
        Ok(config)
    }

    pub fn with_workers(mut self, workers: usize) -> Self {
        self.workers = (workers > 0).then_some(workers);
        self
    }

    /// Reject thresholds outside [0, 100] (NaN included).
    pub fn validate(&self) -> Result<(), MatchError> {
        if (0.0..=100.0).contains(&self.threshold) {
            Ok(())
        } else {
            Err(MatchError::ThresholdOutOfRange(self.threshold))
        }
    }
}

/// Full application configuration, captured from the environment once.
#[derive(Debug, Clone)]
pub struct AppConfig {
    pub matching: MatchConfig,
    /// Polymarket status filter (only active/closed/resolved are sent)
    pub polymarket_status: String,
    pub polymarket_api_base: String,
    /// Prefer the API-backed Opinion source
    pub opinion_use_sdk: bool,
    /// Opinion open-API base URL; without it the fallback source is used
    pub opinion_api_base: Option<String>,
    pub opinion_status: String,
    pub opinion_page_limit: u32,
    /// Cap on records kept per platform (applied by the fetch layer)
    pub max_records_per_platform: Option<usize>,
    pub output_dir: String,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            matching: MatchConfig::default(),
            polymarket_status: "active".to_string(),
            polymarket_api_base: GAMMA_API_BASE.to_string(),
            opinion_use_sdk: true,
            opinion_api_base: None,
            opinion_status: DEFAULT_OPINION_STATUS.to_string(),
            opinion_page_limit: DEFAULT_OPINION_PAGE_LIMIT,
            max_records_per_platform: None,
            output_dir: DEFAULT_OUTPUT_DIR.to_string(),
        }
    }
}

impl AppConfig {
    /// Load configuration from environment variables
    pub fn from_env() -> Result<Self, MatchError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Load configuration from an arbitrary key lookup.
    ///
    /// Unparseable values fall back to defaults with a warning; a threshold
    /// outside [0, 100] is rejected.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, MatchError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());
        let defaults = Self::default();

        let threshold = match get("SIMILARITY_THRESHOLD") {
            Some(raw) => match raw.trim().parse::<f64>() {
                Ok(v) => v,
                Err(_) => {
                    warn!(
                        "Invalid SIMILARITY_THRESHOLD={} (not a number), using default {}",
                        raw, DEFAULT_THRESHOLD
                    );
                    DEFAULT_THRESHOLD
                }
            },
            None => DEFAULT_THRESHOLD,
        };

        let mode = match get("MATCH_MODE") {
            Some(raw) => MatchMode::parse(&raw).unwrap_or_else(|| {
                warn!("Invalid MATCH_MODE={} (expected best|all), using best_match", raw);
                MatchMode::BestMatch
            }),
            None => MatchMode::BestMatch,
        };

        let mut matching = MatchConfig::new(threshold, mode)?;
        if let Some(workers) = parse_or_warn::<usize>(get("MATCH_WORKERS"), "MATCH_WORKERS") {
            matching = matching.with_workers(workers);
        }

        let opinion_use_sdk = get("OPINION_USE_SDK")
            .map(|v| v.trim().eq_ignore_ascii_case("true") || v.trim() == "1")
            .unwrap_or(defaults.opinion_use_sdk);

        Ok(Self {
            matching,
            polymarket_status: get("POLYMARKET_STATUS").unwrap_or(defaults.polymarket_status),
            polymarket_api_base: get("POLYMARKET_API_BASE")
                .map(|s| s.trim_end_matches('/').to_string())
                .unwrap_or(defaults.polymarket_api_base),
            opinion_use_sdk,
            opinion_api_base: get("OPINION_API_BASE").map(|s| s.trim_end_matches('/').to_string()),
            opinion_status: get("OPINION_STATUS").unwrap_or(defaults.opinion_status),
            opinion_page_limit: parse_or_warn::<u32>(get("OPINION_PAGE_LIMIT"), "OPINION_PAGE_LIMIT")
                .filter(|&n| n > 0)
                .unwrap_or(defaults.opinion_page_limit),
            max_records_per_platform: parse_or_warn::<usize>(
                get("MAX_MARKETS_PER_PLATFORM"),
                "MAX_MARKETS_PER_PLATFORM",
            ),
            output_dir: get("OUTPUT_DIR").unwrap_or(defaults.output_dir),
        })
    }
}

fn parse_or_warn<T: std::str::FromStr>(raw: Option<String>, key: &str) -> Option<T> {
    let raw = raw?;
    match raw.trim().parse::<T>() {
        Ok(v) => Some(v),
        Err(_) => {
            warn!("Invalid {}={}, ignoring", key, raw);
            None
        }
    }
}
