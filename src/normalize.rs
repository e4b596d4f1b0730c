//! Market title normalization.
//!
//! Both platforms phrase the same question differently ("Will BTC close above
//! $100,000 on Dec 31, 2025?" vs "Bitcoin above 100000"). This module maps a
//! raw title to a canonical lowercase token sequence so the scorer only has to
//! deal with word choice and word order.

use regex::Regex;
use std::collections::HashMap;
use std::sync::OnceLock;

/// Configuration for normalization
#[derive(Debug, Clone)]
pub struct NormalizationConfig {
    /// Single-token aliases (maps shorthand to the canonical token)
    pub token_aliases: HashMap<String, String>,
    /// Drop full calendar dates ("Jan 5, 2024", "2024-01-05"); bare years stay
    pub strip_dates: bool,
}

impl Default for NormalizationConfig {
    fn default() -> Self {
        Self {
            token_aliases: build_default_aliases(),
            strip_dates: true,
        }
    }
}

/// Normalize a title with the default configuration.
pub fn normalize(raw: &str) -> String {
    static DEFAULT: OnceLock<NormalizationConfig> = OnceLock::new();
    normalize_title(raw, DEFAULT.get_or_init(NormalizationConfig::default))
}

/// Normalize a market title to its canonical form.
///
/// Rules applied:
/// 1. Lowercase
/// 2. Strip calendar dates (optional)
/// 3. Remove thousands separators
/// 4. Strip punctuation and currency symbols (decimal points survive)
/// 5. Collapse whitespace
/// 6. Apply token aliases
///
/// The result is a fixed point: normalizing it again returns it unchanged.
///
/// # Examples
///
/// ```
/// use prediction_market_matcher::normalize::normalize;
/// assert_eq!(normalize("Will BTC hit $100k?"), "will bitcoin hit 100k");
/// assert_eq!(normalize("  Fed cuts   rates by 0.25%  "), "fed cuts rates by 0.25");
/// ```
pub fn normalize_title(raw: &str, config: &NormalizationConfig) -> String {
    // Step 1: Lowercase
    let mut normalized = raw.to_lowercase();

    // Step 2: Dates carry no topical signal and are formatted differently per platform
    if config.strip_dates {
        normalized = long_date_re().replace_all(&normalized, " ").into_owned();
        normalized = iso_date_re().replace_all(&normalized, " ").into_owned();
    }

    // Step 3: "1,000,000" -> "1000000". Repeat since matches can't overlap.
    loop {
        let next = thousands_re().replace_all(&normalized, "$1$2").into_owned();
        if next == normalized {
            break;
        }
        normalized = next;
    }

    // Step 4: Strip punctuation
    normalized = strip_punctuation(&normalized);

    // Step 5 + 6: Collapse whitespace and apply aliases
    normalized
        .split_whitespace()
        .map(|token| {
            config
                .token_aliases
                .get(token)
                .map(String::as_str)
                .unwrap_or(token)
        })
        .collect::<Vec<_>>()
        .join(" ")
}

/// Replace everything that isn't alphanumeric with a space.
///
/// A '.' flanked by ASCII digits is kept so "2.5" doesn't split into "2 5".
fn strip_punctuation(s: &str) -> String {
    let chars: Vec<char> = s.chars().collect();
    chars
        .iter()
        .enumerate()
        .map(|(i, &c)| {
            if c.is_alphanumeric() || (c == '.' && is_decimal_point(&chars, i)) {
                c
            } else {
                ' '
            }
        })
        .collect()
}

fn is_decimal_point(chars: &[char], i: usize) -> bool {
    i > 0
        && chars[i - 1].is_ascii_digit()
        && chars.get(i + 1).is_some_and(|c| c.is_ascii_digit())
}

fn long_date_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(
            r"\b(?:jan|feb|mar|apr|may|jun|jul|aug|sep|oct|nov|dec)[a-z]*\.?\s+\d{1,2},\s+\d{4}\b",
        )
        .expect("static date pattern")
    })
}

fn iso_date_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"\b\d{4}-\d{2}-\d{2}\b").expect("static date pattern"))
}

fn thousands_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"(\d),(\d{3})\b").expect("static separator pattern"))
}

/// Build the default token alias dictionary
fn build_default_aliases() -> HashMap<String, String> {
    let mut aliases = HashMap::new();

    // Crypto tickers
    add_aliases(&mut aliases, "bitcoin", &["btc", "xbt"]);
    add_aliases(&mut aliases, "ethereum", &["eth", "ether"]);
    add_aliases(&mut aliases, "solana", &["sol"]);
    add_aliases(&mut aliases, "dogecoin", &["doge"]);

    // Common shorthand in market titles
    add_aliases(&mut aliases, "president", &["pres"]);
    add_aliases(&mut aliases, "government", &["govt"]);
    add_aliases(&mut aliases, "international", &["intl"]);
    add_aliases(&mut aliases, "versus", &["vs", "v"]);

    aliases
}

/// Helper to add multiple aliases pointing to a canonical token
fn add_aliases(map: &mut HashMap<String, String>, canonical: &str, aliases: &[&str]) {
    for alias in aliases {
        map.insert(alias.to_string(), canonical.to_string());
    }
    // Also map canonical to itself for consistency
    map.insert(canonical.to_string(), canonical.to_string());
}
