//! Token-set similarity scoring.
//!
//! Titles are compared as sets of unique tokens so that word order and
//! repeated words don't matter. The score is built from three strings:
//! the sorted intersection alone, and the intersection followed by each
//! side's remaining tokens. The best pairwise edit-distance ratio among those
//! three strings wins.

/// Ceiling for titles whose token sets differ.
///
/// When one set is a strict subset of the other the raw formula reaches 100;
/// 100 is reserved for identical token sets.
pub const PARTIAL_MATCH_CEILING: f64 = 99.0;

/// Sorted, de-duplicated tokens of a normalized title.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct TokenSet {
    tokens: Vec<String>,
}

impl TokenSet {
    /// Tokenize an already-normalized title.
    pub fn from_normalized(title: &str) -> Self {
        let mut tokens: Vec<String> = title.split_whitespace().map(str::to_string).collect();
        tokens.sort_unstable();
        tokens.dedup();
        Self { tokens }
    }

    pub fn is_empty(&self) -> bool {
        self.tokens.is_empty()
    }

    pub fn len(&self) -> usize {
        self.tokens.len()
    }

    pub fn tokens(&self) -> &[String] {
        &self.tokens
    }
}

/// Similarity in [0, 100] between two normalized titles.
///
/// Symmetric, and 100 only when both titles have the same token set.
/// Returns 0 if either title has no tokens.
pub fn score(a: &str, b: &str) -> f64 {
    token_set_ratio(&TokenSet::from_normalized(a), &TokenSet::from_normalized(b))
}

/// Token-set ratio over precomputed token sets.
pub fn token_set_ratio(a: &TokenSet, b: &TokenSet) -> f64 {
    if a.is_empty() || b.is_empty() {
        return 0.0;
    }

    // Both token lists are sorted, so a merge walk yields sorted partitions
    let mut intersection: Vec<&str> = Vec::new();
    let mut diff_a: Vec<&str> = Vec::new();
    let mut diff_b: Vec<&str> = Vec::new();
    let (mut i, mut j) = (0, 0);
    while i < a.tokens.len() && j < b.tokens.len() {
        match a.tokens[i].cmp(&b.tokens[j]) {
            std::cmp::Ordering::Equal => {
                intersection.push(&a.tokens[i]);
                i += 1;
                j += 1;
            }
            std::cmp::Ordering::Less => {
                diff_a.push(&a.tokens[i]);
                i += 1;
            }
            std::cmp::Ordering::Greater => {
                diff_b.push(&b.tokens[j]);
                j += 1;
            }
        }
    }
    diff_a.extend(a.tokens[i..].iter().map(String::as_str));
    diff_b.extend(b.tokens[j..].iter().map(String::as_str));

    if diff_a.is_empty() && diff_b.is_empty() {
        return 100.0;
    }

    let s0 = intersection.join(" ");
    let s1 = join_sections(&intersection, &diff_a);
    let s2 = join_sections(&intersection, &diff_b);

    let best = indel_ratio(&s0, &s1)
        .max(indel_ratio(&s0, &s2))
        .max(indel_ratio(&s1, &s2));

    (best * 100.0).min(PARTIAL_MATCH_CEILING)
}

fn join_sections(intersection: &[&str], diff: &[&str]) -> String {
    intersection
        .iter()
        .chain(diff.iter())
        .copied()
        .collect::<Vec<_>>()
        .join(" ")
}

/// Normalized indel similarity: `(|x| + |y| - indel(x, y)) / (|x| + |y|)`.
///
/// Lengths are in chars. Two empty strings are identical (1.0).
pub fn indel_ratio(x: &str, y: &str) -> f64 {
    if x.is_empty() && y.is_empty() {
        return 1.0;
    }
    rapidfuzz::fuzz::ratio(x.chars(), y.chars())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::normalize::normalize;

    fn norm_score(a: &str, b: &str) -> f64 {
        score(&normalize(a), &normalize(b))
    }

    #[test]
    fn test_token_set_dedups_and_sorts() {
        let set = TokenSet::from_normalized("win the the election win");
        assert_eq!(set.tokens(), &["election", "the", "win"]);
        assert_eq!(set.len(), 3);
    }

    #[test]
    fn test_reordered_titles_score_100() {
        assert_eq!(
            norm_score("Trump wins 2024 election", "2024 election Trump wins"),
            100.0
        );
    }

    #[test]
    fn test_partial_overlap_below_threshold() {
        let s = norm_score("Will Eagles win Super Bowl", "Eagles Super Bowl champions");
        // "bowl eagles super" vs "... will win": 2 * 17 / (17 + 26)
        assert!((s - 3400.0 / 43.0).abs() < 1e-9, "score was {}", s);
        assert!(s < 86.0);
    }

    #[test]
    fn test_empty_titles_score_zero() {
        assert_eq!(score("", ""), 0.0);
        assert_eq!(score("", "bitcoin above 100k"), 0.0);
        assert_eq!(score("bitcoin above 100k", "   "), 0.0);
    }

    #[test]
    fn test_subset_capped_below_100() {
        let s = score("trump wins", "trump wins 2024 election");
        assert_eq!(s, PARTIAL_MATCH_CEILING);
        assert_eq!(score("trump wins 2024 election", "trump wins"), PARTIAL_MATCH_CEILING);
    }

    #[test]
    fn test_disjoint_titles_score_low() {
        let s = score("bitcoin above 100k", "lakers win championship");
        assert!(s < 50.0, "score was {}", s);
    }

    #[test]
    fn test_indel_ratio() {
        assert_eq!(indel_ratio("", ""), 1.0);
        assert_eq!(indel_ratio("abc", ""), 0.0);
        assert_eq!(indel_ratio("abc", "abc"), 1.0);
        // lcs("abcd", "abxd") = 3 -> (8 - 2) / 8
        assert!((indel_ratio("abcd", "abxd") - 0.75).abs() < 1e-12);
        assert!((indel_ratio("abxd", "abcd") - 0.75).abs() < 1e-12);
        // Chars, not bytes
        assert!((indel_ratio("café", "cafe") - 0.75).abs() < 1e-12);
    }

    #[test]
    fn test_score_symmetric_examples() {
        let pairs = [
            ("fed cuts rates in march", "will the fed cut rates march"),
            ("bitcoin above 100k", "bitcoin above 120k by june"),
            ("a b c", "c d e"),
        ];
        for (a, b) in pairs {
            assert_eq!(score(a, b), score(b, a));
        }
    }
}
