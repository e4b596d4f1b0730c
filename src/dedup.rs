//! Conflict resolution and final ordering of the match table.
//!
//! In best-match mode each source starts with its top candidate. When two
//! sources claim the same target the stronger claim keeps it and the other
//! source falls back to its next candidate, until no target is contested.

use rustc_hash::FxHashMap;
use std::collections::{BTreeMap, VecDeque};
use tracing::debug;

use crate::config::MatchMode;
use crate::matcher::{best_per_source, candidate_order};
use crate::types::{MatchCandidate, MatchResult};

/// Turn scored candidates into the final ranked match table.
///
/// Output is sorted by score descending, then `(source_id, target_id)`
/// ascending, with `rank` numbering rows from 1.
pub fn finalize(candidates: Vec<MatchCandidate>, mode: MatchMode) -> Vec<MatchResult> {
    let mut selected = match mode {
        MatchMode::BestMatch => resolve_conflicts(candidates),
        MatchMode::AllPairs => unique_pairs(candidates),
    };

    selected.sort_by(candidate_order);
    selected
        .into_iter()
        .enumerate()
        .map(|(i, c)| MatchResult {
            source_id: c.source_id,
            target_id: c.target_id,
            score: c.score,
            rank: i + 1,
        })
        .collect()
}

/// Collapse repeated `(source, target)` pairs, keeping the higher score.
fn unique_pairs(candidates: Vec<MatchCandidate>) -> Vec<MatchCandidate> {
    let mut pairs: FxHashMap<(String, String), MatchCandidate> = FxHashMap::default();
    for candidate in candidates {
        let key = (candidate.source_id.clone(), candidate.target_id.clone());
        match pairs.get(&key) {
            Some(existing) if existing.score >= candidate.score => {}
            _ => {
                pairs.insert(key, candidate);
            }
        }
    }
    pairs.into_values().collect()
}

/// Whether `challenger` takes a target away from `holder`.
fn outranks(challenger: &MatchCandidate, holder: &MatchCandidate) -> bool {
    challenger.score > holder.score
        || (challenger.score == holder.score && challenger.source_id < holder.source_id)
}

/// One-to-one assignment where contested targets go to the strongest claim
/// and displaced sources move down their own candidate list.
///
/// Every step either settles a claim or advances a source's cursor, so the
/// loop runs at most once per candidate.
fn resolve_conflicts(candidates: Vec<MatchCandidate>) -> Vec<MatchCandidate> {
    let first_choices = best_per_source(&candidates);
    let mut contested: FxHashMap<&str, usize> = FxHashMap::default();
    for choice in &first_choices {
        *contested.entry(choice.target_id.as_str()).or_default() += 1;
    }
    let contested_targets = contested.values().filter(|&&n| n > 1).count();
    if contested_targets > 0 {
        debug!(contested_targets, "Resolving target conflicts");
    }

    // Per-source preference lists in canonical order
    let mut preferences: BTreeMap<String, Vec<MatchCandidate>> = BTreeMap::new();
    let mut ordered = candidates;
    ordered.sort_by(candidate_order);
    for candidate in ordered {
        preferences
            .entry(candidate.source_id.clone())
            .or_default()
            .push(candidate);
    }

    let mut cursor: FxHashMap<String, usize> = FxHashMap::default();
    let mut holders: FxHashMap<String, MatchCandidate> = FxHashMap::default();
    let mut pending: VecDeque<String> = first_choices.into_iter().map(|c| c.source_id).collect();

    while let Some(source) = pending.pop_front() {
        let Some(options) = preferences.get(&source) else {
            continue;
        };
        // A pending source never holds a target, so only its own cursor moves here
        let mut position = cursor.get(&source).copied().unwrap_or(0);

        while position < options.len() {
            let candidate = &options[position];
            match holders.get(&candidate.target_id) {
                None => {
                    holders.insert(candidate.target_id.clone(), candidate.clone());
                    break;
                }
                Some(holder) if outranks(candidate, holder) => {
                    let displaced = holder.source_id.clone();
                    debug!(
                        target_id = %candidate.target_id,
                        winner = %candidate.source_id,
                        loser = %displaced,
                        "Target reassigned"
                    );
                    holders.insert(candidate.target_id.clone(), candidate.clone());
                    // The loser resumes after the target it just lost
                    *cursor.entry(displaced.clone()).or_insert(0) += 1;
                    pending.push_back(displaced);
                    break;
                }
                Some(_) => position += 1,
            }
        }

        if position >= options.len() {
            debug!(source_id = %source, "No remaining candidates, dropped");
        }
        cursor.insert(source, position);
    }

    holders.into_values().collect()
}
