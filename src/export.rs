//! CSV export of platform listings and the match table.

use anyhow::{Context, Result};
use rustc_hash::FxHashMap;
use serde::Serialize;
use std::fs;
use std::path::Path;
use tracing::info;

use crate::types::{meta, MarketRecord, MatchResult};

pub const POLYMARKET_MARKETS_FILE: &str = "polymarket_markets.csv";
pub const OPINION_MARKETS_FILE: &str = "opinion_markets.csv";
pub const MATCHES_FILE: &str = "matches.csv";

/// One row of a platform listing export
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MarketRow<'a> {
    pub platform: &'static str,
    pub title: &'a str,
    pub market_id: &'a str,
    pub category: &'a str,
    pub status: &'a str,
    pub deadline: &'a str,
    pub volume: &'a str,
    pub url: &'a str,
}

impl<'a> From<&'a MarketRecord> for MarketRow<'a> {
    fn from(record: &'a MarketRecord) -> Self {
        let field = |key: &str| record.meta(key).unwrap_or("");
        Self {
            platform: record.platform.label(),
            title: record.raw_title.trim(),
            market_id: &record.id,
            category: field(meta::CATEGORY),
            // The platform's own wording when it gave one
            status: record.meta(meta::STATUS_RAW).unwrap_or(record.status.as_str()),
            deadline: field(meta::DEADLINE),
            volume: field(meta::VOLUME),
            url: field(meta::URL),
        }
    }
}

/// One row of the match table export
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MatchRow<'a> {
    pub rank: usize,
    pub poly_title: &'a str,
    pub poly_id: &'a str,
    pub poly_url: &'a str,
    pub opinion_title: &'a str,
    pub opinion_id: &'a str,
    pub opinion_url: &'a str,
    pub similarity: f64,
    pub is_exact: u8,
}

/// Join match results back to their records for display.
///
/// Results whose ids aren't found in either list are skipped.
pub fn build_match_rows<'a>(
    matches: &'a [MatchResult],
    sources: &'a [MarketRecord],
    targets: &'a [MarketRecord],
) -> Vec<MatchRow<'a>> {
    let by_source = index_by_id(sources);
    let by_target = index_by_id(targets);

    matches
        .iter()
        .filter_map(|m| {
            let poly = by_source.get(m.source_id.as_str())?;
            let opinion = by_target.get(m.target_id.as_str())?;
            Some(MatchRow {
                rank: m.rank,
                poly_title: poly.raw_title.trim(),
                poly_id: &poly.id,
                poly_url: poly.meta(meta::URL).unwrap_or(""),
                opinion_title: opinion.raw_title.trim(),
                opinion_id: &opinion.id,
                opinion_url: opinion.meta(meta::URL).unwrap_or(""),
                similarity: (m.score * 100.0).round() / 100.0,
                is_exact: u8::from(is_exact(&poly.raw_title, &opinion.raw_title)),
            })
        })
        .collect()
}

/// First record wins for a repeated id, same as validation.
fn index_by_id(records: &[MarketRecord]) -> FxHashMap<&str, &MarketRecord> {
    let mut index = FxHashMap::default();
    for record in records {
        index.entry(record.id.as_str()).or_insert(record);
    }
    index
}

/// Raw titles equal after trimming and lowercasing
pub fn is_exact(a: &str, b: &str) -> bool {
    a.trim().to_lowercase() == b.trim().to_lowercase()
}

/// Write a platform listing. The header row is written even for an empty list.
pub fn write_markets_csv(path: &Path, records: &[MarketRecord]) -> Result<()> {
    let rows: Vec<MarketRow> = records.iter().map(MarketRow::from).collect();
    write_rows(path, &rows, MARKET_HEADERS)?;
    info!(path = %path.display(), rows = rows.len(), "Wrote market listing");
    Ok(())
}

/// Write the ranked match table.
pub fn write_matches_csv(
    path: &Path,
    matches: &[MatchResult],
    sources: &[MarketRecord],
    targets: &[MarketRecord],
) -> Result<()> {
    let rows = build_match_rows(matches, sources, targets);
    write_rows(path, &rows, MATCH_HEADERS)?;
    info!(path = %path.display(), rows = rows.len(), "Wrote match table");
    Ok(())
}

const MARKET_HEADERS: &[&str] = &[
    "platform", "title", "market_id", "category", "status", "deadline", "volume", "url",
];

const MATCH_HEADERS: &[&str] = &[
    "rank",
    "poly_title",
    "poly_id",
    "poly_url",
    "opinion_title",
    "opinion_id",
    "opinion_url",
    "similarity",
    "is_exact",
];

fn write_rows<T: Serialize>(path: &Path, rows: &[T], headers: &[&str]) -> Result<()> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent)
            .with_context(|| format!("creating export directory {}", parent.display()))?;
    }
    // Headers are written by hand so an empty table still gets them
    let mut writer = csv::WriterBuilder::new()
        .has_headers(false)
        .quote_style(csv::QuoteStyle::Necessary)
        .from_path(path)
        .with_context(|| format!("opening {}", path.display()))?;
    writer.write_record(headers)?;
    for row in rows {
        writer.serialize(row)?;
    }
    writer.flush()?;
    Ok(())
}
