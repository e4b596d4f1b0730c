//! Error types for the matching engine.
//!
//! Configuration problems are fatal and surface as [`MatchError`]. Malformed
//! records are not errors: they are excluded from matching and reported as
//! [`InvalidRecord`] entries alongside the results.

use serde::Serialize;
use thiserror::Error;

use crate::types::Platform;

/// Fatal errors raised before or during a matching run.
#[derive(Debug, Error)]
pub enum MatchError {
    #[error("similarity threshold {0} is outside [0, 100]")]
    ThresholdOutOfRange(f64),

    #[error("failed to start scoring worker pool: {0}")]
    WorkerPool(#[from] rayon::ThreadPoolBuildError),
}

/// Why a record was excluded from matching.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Error)]
#[serde(rename_all = "snake_case")]
pub enum InvalidReason {
    #[error("missing id")]
    MissingId,
    #[error("missing title")]
    MissingTitle,
    #[error("duplicate id")]
    DuplicateId,
}

/// A record the engine skipped, with enough context to find it again.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Error)]
#[error("invalid {platform} record #{index} (id={id:?}): {reason}")]
pub struct InvalidRecord {
    pub platform: Platform,
    /// Position in the input list
    pub index: usize,
    pub id: Option<String>,
    pub reason: InvalidReason,
}
