//! Error types for Classpulse

use thiserror::Error;

/// Errors that abort report computation.
///
/// Per-participant data problems are never surfaced here; they are corrected in
/// place and reported as [`QualityWarning`](crate::types::QualityWarning)s.
#[derive(Debug, Error)]
pub enum EngineError {
    #[error("Identity resolution failed: {0}")]
    IdentityResolution(String),

    #[error("Failed to parse session log: {0}")]
    ParseError(String),

    #[error("Invalid JSON: {0}")]
    JsonError(#[from] serde_json::Error),

    #[error("Date parse error: {0}")]
    DateParseError(String),

    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),
}
