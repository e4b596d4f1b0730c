//! Cross-platform prediction market matcher
//!
//! Fetches the market listings of Polymarket and Opinion.trade, pairs the
//! markets that ask the same question by fuzzy title similarity, and writes
//! the listings plus the ranked match table as CSV files.
//!
//! ## Pipeline
//!
//! - **Fetch**: both platforms concurrently, with retry and a per-platform cap
//! - **Match**: normalize titles, score all cross pairs, resolve conflicts
//! - **Export**: `polymarket_markets.csv`, `opinion_markets.csv`, `matches.csv`
//!
//! Configuration comes from the environment (and `.env`); see `AppConfig`.

use anyhow::{Context, Result};
use std::path::Path;
use tracing::{info, info_span, warn, Instrument};

use prediction_market_matcher::config::AppConfig;
use prediction_market_matcher::engine::find_matches;
use prediction_market_matcher::export::{
    write_markets_csv, write_matches_csv, MATCHES_FILE, OPINION_MARKETS_FILE,
    POLYMARKET_MARKETS_FILE,
};
use prediction_market_matcher::logging;
use prediction_market_matcher::retry::RetryPolicy;
use prediction_market_matcher::sources::{
    fetch_capped, MarketSource, OpinionSource, PolymarketSource,
};
use prediction_market_matcher::types::MarketRecord;

#[tokio::main]
async fn main() -> Result<()> {
    // Load .env before anything reads the environment
    dotenvy::dotenv().ok();

    // Keep guard alive so the file writer flushes on exit
    let (_log_guard, run_id) = logging::init_logging();

    let config = AppConfig::from_env().context("loading configuration")?;
    let retry = RetryPolicy::from_env();

    let root_span = info_span!(
        "market_matcher",
        run_id = %run_id,
        threshold = config.matching.threshold,
        mode = %config.matching.mode,
    );

    run(config, retry).instrument(root_span).await
}

async fn run(config: AppConfig, retry: RetryPolicy) -> Result<()> {
    info!("Prediction market matcher starting");
    info!(
        "   Threshold: {} | Mode: {} | Output: {}",
        config.matching.threshold, config.matching.mode, config.output_dir
    );
    if let Some(max) = config.max_records_per_platform {
        info!("   Capping listings at {} markets per platform", max);
    }

    let polymarket = PolymarketSource::new(
        &config.polymarket_api_base,
        &config.polymarket_status,
        retry.clone(),
    )?;
    let opinion = OpinionSource::from_config(&config, retry)?;

    info!("🔍 Fetching market listings...");
    let (poly_result, opinion_result) = tokio::join!(
        fetch_capped(&polymarket, config.max_records_per_platform),
        fetch_capped(&opinion, config.max_records_per_platform),
    );
    let poly_records = listing_or_empty(&polymarket, poly_result);
    let opinion_records = listing_or_empty(&opinion, opinion_result);

    let out_dir = Path::new(&config.output_dir);
    std::fs::create_dir_all(out_dir)
        .with_context(|| format!("creating output directory {}", out_dir.display()))?;
    write_markets_csv(&out_dir.join(POLYMARKET_MARKETS_FILE), &poly_records)?;
    write_markets_csv(&out_dir.join(OPINION_MARKETS_FILE), &opinion_records)?;

    info!(
        "🔗 Matching {} Polymarket against {} Opinion markets...",
        poly_records.len(),
        opinion_records.len()
    );
    let outcome = find_matches(&poly_records, &opinion_records, &config.matching)?;

    write_matches_csv(
        &out_dir.join(MATCHES_FILE),
        &outcome.matches,
        &poly_records,
        &opinion_records,
    )?;

    info!(
        matches = outcome.matches.len(),
        invalid = outcome.invalid.len(),
        unmatched_polymarket = outcome.unmatched_source.len(),
        unmatched_opinion = outcome.unmatched_target.len(),
        "✅ Done"
    );
    Ok(())
}

/// A failed fetch leaves that platform empty rather than aborting the run.
fn listing_or_empty(source: &dyn MarketSource, result: Result<Vec<MarketRecord>>) -> Vec<MarketRecord> {
    match result {
        Ok(records) => {
            info!("   {}: {} markets", source.platform(), records.len());
            records
        }
        Err(e) => {
            warn!("   {} fetch failed, continuing without it: {:#}", source.platform(), e);
            Vec::new()
        }
    }
}
