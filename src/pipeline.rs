//! Pipeline orchestration
//!
//! This module provides the public API for Classpulse.
//! It runs a session log through every stage, from raw events to the ordered
//! participation report.

use crate::aggregator::DurationAggregator;
use crate::chat::chat_threshold_ms;
use crate::config::EngineConfig;
use crate::error::EngineError;
use crate::intervals::IntervalBuilder;
use crate::metrics::MetricNormalizer;
use crate::normalizer::{EventNormalizer, MAX_TIMESTAMP_MS};
use crate::report::ResultAssembler;
use crate::roster::Roster;
use crate::types::{ParticipationReport, SessionLog};

/// Parse and check a session log document
pub fn parse_session_log(json: &str) -> Result<SessionLog, EngineError> {
    let log: SessionLog = serde_json::from_str(json)?;
    check_session_end(&log)?;
    Ok(log)
}

fn check_session_end(log: &SessionLog) -> Result<(), EngineError> {
    if !(0..=MAX_TIMESTAMP_MS).contains(&log.session_end_ms) {
        return Err(EngineError::ParseError(format!(
            "session_end_ms out of range, got {}",
            log.session_end_ms
        )));
    }
    Ok(())
}

/// Convert a session log JSON document to a participation report using the
/// default configuration.
///
/// # Example
/// ```ignore
/// let report = session_to_report(&std::fs::read_to_string("session.json")?)?;
/// for row in report.to_table() {
///     println!("{}", row.join(","));
/// }
/// ```
pub fn session_to_report(json: &str) -> Result<ParticipationReport, EngineError> {
    ParticipationEngine::new().process_json(json)
}

/// Reusable engine holding a validated configuration.
///
/// Pipeline stages:
/// 1. Roster - Resolve identities and fold re-logins
/// 2. EventNormalizer - Group, sort and pad raw events
/// 3. IntervalBuilder - Pair events into reconciled intervals
/// 4. DurationAggregator - Sum intervals into minutes
/// 5. MetricNormalizer - Fractions and participation scores
/// 6. ResultAssembler - Labelled, ordered rows
#[derive(Debug, Clone, Default)]
pub struct ParticipationEngine {
    config: EngineConfig,
}

impl ParticipationEngine {
    /// Create an engine with default settings
    pub fn new() -> Self {
        Self::default()
    }

    /// Create an engine with a custom configuration
    pub fn with_config(config: EngineConfig) -> Result<Self, EngineError> {
        config.validate()?;
        Ok(Self { config })
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// Process a session log JSON document
    pub fn process_json(&self, json: &str) -> Result<ParticipationReport, EngineError> {
        let log = parse_session_log(json)?;
        self.process(&log)
    }

    /// Process a parsed session log
    pub fn process(&self, log: &SessionLog) -> Result<ParticipationReport, EngineError> {
        check_session_end(log)?;

        // Stage 1: Resolve identities
        let roster = Roster::build(
            &log.participants,
            &log.instructor_id,
            self.config.merge_relogins,
        )?;
        tracing::debug!(participants = roster.participants().len(), "roster built");

        // Stage 2: Normalize raw events
        let normalized = EventNormalizer::normalize(&log.events, &roster, log.session_end_ms)?;

        // Stage 3: Build intervals
        let threshold = log
            .session_start
            .as_deref()
            .map(|start| chat_threshold_ms(start, &self.config))
            .transpose()?;
        let intervals = IntervalBuilder::new(&self.config).build(normalized, threshold);
        tracing::debug!(chat_threshold_ms = ?threshold, "intervals built");

        // Stage 4: Aggregate durations
        let durations = DurationAggregator::aggregate(intervals);

        // Stage 5: Normalize metrics and score
        let metrics = MetricNormalizer::new(&self.config).normalize(durations);

        // Stage 6: Assemble the report
        let report = ResultAssembler::assemble(metrics, &roster);
        tracing::debug!(
            rows = report.rows.len(),
            warnings = report.warnings.len(),
            "report assembled"
        );

        Ok(report)
    }
}
