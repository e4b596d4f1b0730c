//! Matching engine entry point.
//!
//! `find_matches` runs the full pipeline over two fully materialized record
//! lists: validate → score cross pairs → resolve → rank. It performs no I/O
//! and reads no process state; everything it needs is in the arguments.

use rustc_hash::FxHashSet;
use serde::Serialize;
use std::time::Instant;
use tracing::{debug, info, info_span, warn};

use crate::config::MatchConfig;
use crate::dedup::finalize;
use crate::error::{InvalidReason, InvalidRecord, MatchError};
use crate::matcher::PairMatcher;
use crate::types::{MarketRecord, MatchResult};

/// Result of a matching run
#[derive(Debug, Clone, Default, Serialize)]
pub struct MatchOutcome {
    /// Final match table, ranked
    pub matches: Vec<MatchResult>,
    /// Records excluded before scoring
    pub invalid: Vec<InvalidRecord>,
    /// Valid source ids that ended up without a partner
    pub unmatched_source: Vec<String>,
    /// Valid target ids that ended up without a partner
    pub unmatched_target: Vec<String>,
}

impl MatchOutcome {
    pub fn is_empty(&self) -> bool {
        self.matches.is_empty()
    }
}

/// Match source records (platform A) against target records (platform B).
///
/// Fails only on invalid configuration. Malformed records are skipped and
/// listed in [`MatchOutcome::invalid`]; an empty side yields an empty table.
pub fn find_matches(
    records_a: &[MarketRecord],
    records_b: &[MarketRecord],
    config: &MatchConfig,
) -> Result<MatchOutcome, MatchError> {
    config.validate()?;

    let span = info_span!(
        "find_matches",
        sources = records_a.len(),
        targets = records_b.len(),
        threshold = config.threshold,
        mode = %config.mode,
    );
    let _enter = span.enter();
    let started = Instant::now();

    let (sources, mut invalid) = validate_records(records_a);
    let (targets, invalid_b) = validate_records(records_b);
    invalid.extend(invalid_b);

    for record in &invalid {
        warn!("Skipping record: {}", record);
    }

    if sources.is_empty() || targets.is_empty() {
        info!(
            valid_sources = sources.len(),
            valid_targets = targets.len(),
            "Empty input, nothing to match"
        );
        return Ok(MatchOutcome {
            matches: Vec::new(),
            invalid,
            unmatched_source: sources.iter().map(|r| r.id.clone()).collect(),
            unmatched_target: targets.iter().map(|r| r.id.clone()).collect(),
        });
    }

    let candidates = PairMatcher::new(config).match_records(&sources, &targets)?;
    let candidate_count = candidates.len();
    let matches = finalize(candidates, config.mode);

    let matched_sources: FxHashSet<&str> = matches.iter().map(|m| m.source_id.as_str()).collect();
    let matched_targets: FxHashSet<&str> = matches.iter().map(|m| m.target_id.as_str()).collect();
    let unmatched_source: Vec<String> = sources
        .iter()
        .filter(|r| !matched_sources.contains(r.id.as_str()))
        .map(|r| r.id.clone())
        .collect();
    let unmatched_target: Vec<String> = targets
        .iter()
        .filter(|r| !matched_targets.contains(r.id.as_str()))
        .map(|r| r.id.clone())
        .collect();

    for m in matches.iter().take(10) {
        debug!(
            rank = m.rank,
            source_id = %m.source_id,
            target_id = %m.target_id,
            score = m.score,
            "Match"
        );
    }

    info!(
        candidates = candidate_count,
        matches = matches.len(),
        invalid = invalid.len(),
        unmatched_source = unmatched_source.len(),
        unmatched_target = unmatched_target.len(),
        elapsed_ms = started.elapsed().as_millis() as u64,
        "Matching complete"
    );

    Ok(MatchOutcome {
        matches,
        invalid,
        unmatched_source,
        unmatched_target,
    })
}

/// Split records into usable ones and rejects.
///
/// A record needs a non-blank id and title; a repeated id within the same
/// list keeps its first occurrence. Ids compare with surrounding whitespace
/// ignored.
pub fn validate_records(records: &[MarketRecord]) -> (Vec<MarketRecord>, Vec<InvalidRecord>) {
    let mut valid = Vec::with_capacity(records.len());
    let mut invalid = Vec::new();
    let mut seen: FxHashSet<&str> = FxHashSet::default();

    for (index, record) in records.iter().enumerate() {
        let id = record.id.trim();
        let reason = if id.is_empty() {
            Some(InvalidReason::MissingId)
        } else if record.raw_title.trim().is_empty() {
            Some(InvalidReason::MissingTitle)
        } else if !seen.insert(id) {
            Some(InvalidReason::DuplicateId)
        } else {
            None
        };

        match reason {
            Some(reason) => invalid.push(InvalidRecord {
                platform: record.platform,
                index,
                id: (!id.is_empty()).then(|| record.id.clone()),
                reason,
            }),
            None => valid.push(record.clone()),
        }
    }

    (valid, invalid)
}
