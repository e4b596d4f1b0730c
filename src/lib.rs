//! Cross-platform prediction market matcher
//!
//! Pairs markets listed on Polymarket with the equivalent markets on
//! Opinion.trade by fuzzy title similarity. The matching core
//! ([`find_matches`]) is pure and synchronous; fetching and export are
//! separate collaborators wired together by the `market-matcher` binary.

pub mod config;
pub mod dedup;
pub mod engine;
pub mod error;
pub mod export;
pub mod logging;
pub mod matcher;
pub mod normalize;
pub mod retry;
pub mod similarity;
pub mod sources;
pub mod types;

pub use config::{AppConfig, MatchConfig, MatchMode};
pub use engine::{find_matches, MatchOutcome};
pub use error::{InvalidReason, InvalidRecord, MatchError};
pub use types::{MarketRecord, MarketStatus, MatchResult, Platform};
