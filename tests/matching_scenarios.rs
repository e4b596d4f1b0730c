//! End-to-end matching scenarios over realistic listings.
//!
//! These go through `find_matches` only, the same way the binary does.

use std::collections::HashSet;

use prediction_market_matcher::normalize::normalize;
use prediction_market_matcher::similarity::score;
use prediction_market_matcher::{
    find_matches, InvalidReason, MarketRecord, MatchConfig, MatchMode, MatchOutcome, Platform,
};

// === Fixture builders ===

fn make_poly(id: &str, title: &str) -> MarketRecord {
    MarketRecord::new(Platform::Polymarket, id, title)
}

fn make_opinion(id: &str, title: &str) -> MarketRecord {
    MarketRecord::new(Platform::Opinion, id, title)
}

fn best_match(threshold: f64) -> MatchConfig {
    MatchConfig::new(threshold, MatchMode::BestMatch).unwrap()
}

fn pairs(outcome: &MatchOutcome) -> Vec<(String, String)> {
    outcome
        .matches
        .iter()
        .map(|m| (m.source_id.clone(), m.target_id.clone()))
        .collect()
}

/// A mixed listing: some clean pairs, some near misses, some noise.
fn make_listings() -> (Vec<MarketRecord>, Vec<MarketRecord>) {
    let poly = vec![
        make_poly("p-trump", "Trump wins 2024 election"),
        make_poly("p-btc", "Will BTC close above $100,000 on Dec 31, 2025?"),
        make_poly("p-eth", "ETH above $5,000 by 2025-06-30?"),
        make_poly("p-fed", "Fed cuts rates in March"),
        make_poly("p-eagles", "Will Eagles win Super Bowl"),
        make_poly("p-rain", "Will it rain in London tomorrow"),
    ];
    let opinion = vec![
        make_opinion("o-trump", "2024 election: Trump wins"),
        make_opinion("o-btc", "Bitcoin close above 100000?"),
        make_opinion("o-eth", "Ethereum above 5000"),
        make_opinion("o-fed", "Will the Fed cut rates in March?"),
        make_opinion("o-eagles", "Eagles Super Bowl champions"),
        make_opinion("o-ufo", "Aliens confirmed by NASA"),
    ];
    (poly, opinion)
}

// =============================================================================
// Documented scenarios
// =============================================================================

#[test]
fn test_reordered_title_is_a_perfect_match() {
    let a = normalize("Trump wins 2024 election");
    let b = normalize("2024 election Trump wins");
    assert_eq!(score(&a, &b), 100.0);

    let outcome = find_matches(
        &[make_poly("a1", "Trump wins 2024 election")],
        &[make_opinion("b1", "2024 election Trump wins")],
        &best_match(86.0),
    )
    .unwrap();
    assert_eq!(pairs(&outcome), vec![("a1".to_string(), "b1".to_string())]);
    assert_eq!(outcome.matches[0].score, 100.0);
    assert_eq!(outcome.matches[0].rank, 1);
}

#[test]
fn test_partial_overlap_stays_below_threshold() {
    let a = normalize("Will Eagles win Super Bowl");
    let b = normalize("Eagles Super Bowl champions");
    let s = score(&a, &b);
    // Best section ratio is "bowl eagles super" vs "bowl eagles super will win",
    // 2 * 17 / (17 + 26), about 79.07
    assert!((s - 3400.0 / 43.0).abs() < 1e-9, "score was {}", s);
    assert!(s < 86.0);

    let outcome = find_matches(
        &[make_poly("a1", "Will Eagles win Super Bowl")],
        &[make_opinion("b1", "Eagles Super Bowl champions")],
        &best_match(86.0),
    )
    .unwrap();
    assert!(outcome.matches.is_empty());
    assert_eq!(outcome.unmatched_source, vec!["a1".to_string()]);
}

#[test]
fn test_empty_title_is_flagged_and_never_matched() {
    assert_eq!(score("", &normalize("Anything at all")), 0.0);

    let outcome = find_matches(
        &[make_poly("a1", ""), make_poly("a2", "Fed cuts rates")],
        &[make_opinion("b1", "Fed cuts rates")],
        &best_match(0.0),
    )
    .unwrap();
    assert_eq!(pairs(&outcome), vec![("a2".to_string(), "b1".to_string())]);
    assert_eq!(outcome.invalid.len(), 1);
    assert_eq!(outcome.invalid[0].reason, InvalidReason::MissingTitle);
    assert_eq!(outcome.invalid[0].id.as_deref(), Some("a1"));
}

#[test]
fn test_contested_target_goes_to_stronger_claim() {
    // Both sources score highest against t1; s1 is identical to it, s2 is a
    // superset at the partial-match ceiling and falls back to t2.
    let sources = vec![
        make_poly("s1", "Bitcoin above 100k by year end"),
        make_poly("s2", "Bitcoin above 100k by the year end"),
    ];
    let targets = vec![
        make_opinion("t1", "Bitcoin above 100k by year end"),
        make_opinion("t2", "Will bitcoin close above 100k by year end"),
    ];

    let s2_t1 = score(sources[1].normalized_title(), targets[0].normalized_title());
    let s2_t2 = score(sources[1].normalized_title(), targets[1].normalized_title());
    assert!(s2_t1 > s2_t2, "s2 should prefer t1 ({} vs {})", s2_t1, s2_t2);
    assert!(s2_t2 >= 86.0, "s2 needs a fallback above threshold, got {}", s2_t2);

    let outcome = find_matches(&sources, &targets, &best_match(86.0)).unwrap();
    assert_eq!(
        pairs(&outcome),
        vec![
            ("s1".to_string(), "t1".to_string()),
            ("s2".to_string(), "t2".to_string()),
        ]
    );
    assert_eq!(outcome.matches[0].score, 100.0);
    assert_eq!(outcome.matches[1].score, s2_t2);

    // Without the fallback target the weaker claim is simply dropped
    let outcome = find_matches(&sources, &targets[..1], &best_match(86.0)).unwrap();
    assert_eq!(pairs(&outcome), vec![("s1".to_string(), "t1".to_string())]);
    assert_eq!(outcome.unmatched_source, vec!["s2".to_string()]);
}

// =============================================================================
// Listing-level behavior
// =============================================================================

#[test]
fn test_mixed_listing_pairs_equivalent_markets() {
    let (poly, opinion) = make_listings();
    let outcome = find_matches(&poly, &opinion, &best_match(86.0)).unwrap();

    let found: HashSet<(String, String)> = pairs(&outcome).into_iter().collect();
    for (a, b) in [("p-trump", "o-trump"), ("p-btc", "o-btc"), ("p-eth", "o-eth")] {
        assert!(
            found.contains(&(a.to_string(), b.to_string())),
            "expected {} <-> {} in {:?}",
            a,
            b,
            found
        );
    }
    assert!(!found.iter().any(|(a, _)| a == "p-rain"));
    assert!(!found.iter().any(|(_, b)| b == "o-ufo"));
    assert!(outcome.unmatched_target.contains(&"o-ufo".to_string()));
}

#[test]
fn test_output_is_ranked_and_canonically_ordered() {
    let (poly, opinion) = make_listings();
    let outcome = find_matches(&poly, &opinion, &best_match(50.0)).unwrap();
    assert!(!outcome.matches.is_empty());

    for (i, m) in outcome.matches.iter().enumerate() {
        assert_eq!(m.rank, i + 1);
        assert!(m.score >= 50.0 && m.score <= 100.0);
    }
    for w in outcome.matches.windows(2) {
        let ordered = w[0].score > w[1].score
            || (w[0].score == w[1].score
                && (&w[0].source_id, &w[0].target_id) < (&w[1].source_id, &w[1].target_id));
        assert!(ordered, "out of order: {:?} then {:?}", w[0], w[1]);
    }
}

#[test]
fn test_best_match_is_one_to_one() {
    let (poly, opinion) = make_listings();
    let outcome = find_matches(&poly, &opinion, &best_match(0.0)).unwrap();

    let sources: HashSet<&str> = outcome.matches.iter().map(|m| m.source_id.as_str()).collect();
    let targets: HashSet<&str> = outcome.matches.iter().map(|m| m.target_id.as_str()).collect();
    assert_eq!(sources.len(), outcome.matches.len());
    assert_eq!(targets.len(), outcome.matches.len());
}

#[test]
fn test_raising_threshold_only_removes_matches() {
    let (poly, opinion) = make_listings();
    let low = find_matches(&poly, &opinion, &best_match(40.0)).unwrap();
    let low_pairs: HashSet<(String, String)> = pairs(&low).into_iter().collect();

    for threshold in [50.0, 70.0, 86.0, 95.0, 100.0] {
        let high = find_matches(&poly, &opinion, &best_match(threshold)).unwrap();
        for pair in pairs(&high) {
            assert!(
                low_pairs.contains(&pair),
                "{:?} appears at threshold {} but not at 40",
                pair,
                threshold
            );
        }
    }
}

#[test]
fn test_worker_count_does_not_change_result() {
    let (poly, opinion) = make_listings();
    let reference = find_matches(&poly, &opinion, &best_match(60.0)).unwrap();

    for workers in [1, 2, 4, 8] {
        let config = best_match(60.0).with_workers(workers);
        let outcome = find_matches(&poly, &opinion, &config).unwrap();
        assert_eq!(outcome.matches, reference.matches, "workers={}", workers);
        assert_eq!(outcome.unmatched_source, reference.unmatched_source);
        assert_eq!(outcome.unmatched_target, reference.unmatched_target);
    }
}

#[test]
fn test_input_order_does_not_change_result() {
    let (mut poly, mut opinion) = make_listings();
    let forward = find_matches(&poly, &opinion, &best_match(60.0)).unwrap();

    poly.reverse();
    opinion.reverse();
    let reversed = find_matches(&poly, &opinion, &best_match(60.0)).unwrap();
    assert_eq!(forward.matches, reversed.matches);
}

#[test]
fn test_all_pairs_keeps_every_pair_above_threshold() {
    let sources = vec![make_poly("a1", "Fed cuts rates"), make_poly("a2", "Fed cuts rates again")];
    let targets = vec![
        make_opinion("b1", "Fed cuts rates"),
        make_opinion("b2", "Rates: Fed cuts"),
    ];
    let config = MatchConfig::new(86.0, MatchMode::AllPairs).unwrap();
    let outcome = find_matches(&sources, &targets, &config).unwrap();

    let found: HashSet<(String, String)> = pairs(&outcome).into_iter().collect();
    assert_eq!(found.len(), outcome.matches.len());
    assert!(found.contains(&("a1".to_string(), "b1".to_string())));
    assert!(found.contains(&("a1".to_string(), "b2".to_string())));
    assert!(found.contains(&("a2".to_string(), "b1".to_string())));
    assert!(found.contains(&("a2".to_string(), "b2".to_string())));

    let best = find_matches(&sources, &targets, &best_match(86.0)).unwrap();
    assert_eq!(best.matches.len(), 2);
}

#[test]
fn test_invalid_records_are_reported_not_fatal() {
    let sources = vec![
        make_poly("", "No id"),
        make_poly("a1", "Fed cuts rates"),
        make_poly("a1", "Fed cuts rates (duplicate)"),
    ];
    let targets = vec![make_opinion("b1", "Fed cuts rates")];
    let outcome = find_matches(&sources, &targets, &best_match(86.0)).unwrap();

    assert_eq!(outcome.matches.len(), 1);
    let reasons: Vec<InvalidReason> = outcome.invalid.iter().map(|r| r.reason).collect();
    assert_eq!(reasons, vec![InvalidReason::MissingId, InvalidReason::DuplicateId]);
    assert!(outcome.invalid.iter().all(|r| r.platform == Platform::Polymarket));
}
