//! Classpulse - Participation reports for recorded online class sessions
//!
//! Classpulse turns the raw camera, microphone and chat event logs of one
//! recorded session into a per-participant participation report through a
//! deterministic pipeline: event normalization → interval reconstruction →
//! duration aggregation → metric normalization and scoring → report assembly.
//!
//! ## Example
//!
//! ```ignore
//! use classpulse::session_to_report;
//!
//! let report = session_to_report(&session_json)?;
//! for row in &report.rows {
//!     println!("{}: {:?}", row.participant, row.participation_score);
//! }
//! ```

pub mod aggregator;
pub mod baseline;
pub mod chat;
pub mod config;
pub mod error;
pub mod intervals;
pub mod metrics;
pub mod normalizer;
pub mod pipeline;
pub mod report;
pub mod roster;
pub mod types;

pub use config::{ChatThreshold, EngineConfig};
pub use error::EngineError;
pub use pipeline::{parse_session_log, session_to_report, ParticipationEngine};
pub use report::HEADERS;
pub use roster::{Participant, Roster};
pub use types::{ParticipationReport, QualityWarning, ResultRow, SessionLog};

/// Classpulse version, reported by the CLI
pub const CLASSPULSE_VERSION: &str = env!("CARGO_PKG_VERSION");
