//! Cross-platform pair scoring.
//!
//! Every source title is scored against every target title. The cross product
//! dominates the run time and each call is independent, so rows are spread
//! across a rayon pool and collected back in index order.

use rayon::prelude::*;
use rustc_hash::FxHashMap;
use std::cmp::Ordering;
use tracing::debug;

use crate::config::MatchConfig;
use crate::error::MatchError;
use crate::similarity::{token_set_ratio, TokenSet};
use crate::types::{MarketRecord, MatchCandidate};

/// Canonical candidate order: score descending, then (source_id, target_id)
/// ascending.
pub fn candidate_order(a: &MatchCandidate, b: &MatchCandidate) -> Ordering {
    b.score
        .total_cmp(&a.score)
        .then_with(|| a.source_id.cmp(&b.source_id))
        .then_with(|| a.target_id.cmp(&b.target_id))
}

/// Scores all cross pairs of two record lists against a threshold.
#[derive(Debug, Clone)]
pub struct PairMatcher {
    threshold: f64,
    workers: Option<usize>,
}

impl PairMatcher {
    pub fn new(config: &MatchConfig) -> Self {
        Self {
            threshold: config.threshold,
            workers: config.workers,
        }
    }

    /// Score every `(source, target)` pair and keep those at or above the
    /// threshold, in canonical order.
    ///
    /// Records whose titles normalize to nothing never produce candidates.
    pub fn match_records(
        &self,
        sources: &[MarketRecord],
        targets: &[MarketRecord],
    ) -> Result<Vec<MatchCandidate>, MatchError> {
        if sources.is_empty() || targets.is_empty() {
            return Ok(Vec::new());
        }

        let source_sets = token_sets(sources);
        let target_sets = token_sets(targets);

        let score_row = |i: usize| -> Vec<MatchCandidate> {
            let source_tokens = &source_sets[i];
            if source_tokens.is_empty() {
                return Vec::new();
            }
            target_sets
                .iter()
                .enumerate()
                .filter(|(_, target_tokens)| !target_tokens.is_empty())
                .filter_map(|(j, target_tokens)| {
                    let score = token_set_ratio(source_tokens, target_tokens);
                    (score >= self.threshold).then(|| {
                        MatchCandidate::new(sources[i].id.clone(), targets[j].id.clone(), score)
                    })
                })
                .collect()
        };

        // Rows come back in source index order whatever the completion order
        let rows: Vec<Vec<MatchCandidate>> = match self.workers {
            Some(1) => (0..sources.len()).map(score_row).collect(),
            Some(n) => {
                let pool = rayon::ThreadPoolBuilder::new().num_threads(n).build()?;
                pool.install(|| (0..sources.len()).into_par_iter().map(score_row).collect())
            }
            None => (0..sources.len()).into_par_iter().map(score_row).collect(),
        };

        let mut candidates: Vec<MatchCandidate> = rows.into_iter().flatten().collect();
        candidates.sort_by(candidate_order);

        debug!(
            pairs = sources.len() * targets.len(),
            kept = candidates.len(),
            threshold = self.threshold,
            "Scored cross pairs"
        );

        Ok(candidates)
    }
}

fn token_sets(records: &[MarketRecord]) -> Vec<TokenSet> {
    records
        .iter()
        .map(|r| TokenSet::from_normalized(r.normalized_title()))
        .collect()
}

/// Keep the highest-scoring candidate per source.
///
/// Ties go to the lexically smallest target id. Output is in canonical order.
pub fn best_per_source(candidates: &[MatchCandidate]) -> Vec<MatchCandidate> {
    let mut best: FxHashMap<&str, &MatchCandidate> = FxHashMap::default();
    for candidate in candidates {
        best.entry(candidate.source_id.as_str())
            .and_modify(|current| {
                if candidate_order(candidate, *current) == Ordering::Less {
                    *current = candidate;
                }
            })
            .or_insert(candidate);
    }

    let mut selected: Vec<MatchCandidate> = best.into_values().cloned().collect();
    selected.sort_by(candidate_order);
    selected
}
