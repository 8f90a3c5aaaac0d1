//! Engine configuration
//!
//! Reconciliation and scoring policies are named constants here; an
//! [`EngineConfig`] carries them so a session can be processed with overrides.

use crate::error::EngineError;
use chrono::FixedOffset;
use serde::{Deserialize, Serialize};

/// Window after a camera start within which a pause stop is considered spurious.
///
/// The recorder emits a false "resume" right after the camera powers on.
pub const FALSE_STOP_WINDOW_MS: i64 = 100;

/// Added to every cohort standard deviation so it is never zero
pub const STDEV_EPSILON: f64 = 1e-8;

/// Upper bound of the composite participation score
pub const SCORE_CAP: f64 = 105.0;

/// Center of every channel score
pub const SCORE_CENTER: f64 = 100.0;

/// Offset the recorded session start is written in (Greenwich)
pub const DEFAULT_REFERENCE_UTC_OFFSET_MINUTES: i32 = 0;

/// Offset of the chat log clock (US Pacific standard time)
pub const DEFAULT_CHAT_UTC_OFFSET_MINUTES: i32 = -8 * 60;

/// Where the chat cut-off sits relative to the recorded session start
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ChatThreshold {
    /// Midnight of the recording day; keeps chats sent before recording began
    #[default]
    SessionDay,
    /// The exact recorded start
    RecordingStart,
}

/// Configuration for one engine run
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    pub false_stop_window_ms: i64,
    pub stdev_epsilon: f64,
    pub score_cap: f64,
    /// Fold participants sharing a cleaned display name onto one identity
    pub merge_relogins: bool,
    pub chat_threshold: ChatThreshold,
    pub reference_utc_offset_minutes: i32,
    pub chat_utc_offset_minutes: i32,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            false_stop_window_ms: FALSE_STOP_WINDOW_MS,
            stdev_epsilon: STDEV_EPSILON,
            score_cap: SCORE_CAP,
            merge_relogins: true,
            chat_threshold: ChatThreshold::default(),
            reference_utc_offset_minutes: DEFAULT_REFERENCE_UTC_OFFSET_MINUTES,
            chat_utc_offset_minutes: DEFAULT_CHAT_UTC_OFFSET_MINUTES,
        }
    }
}

impl EngineConfig {
    /// Load a configuration from JSON; missing fields take their defaults
    pub fn from_json(json: &str) -> Result<Self, EngineError> {
        let config: Self = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    /// Serialize the configuration to pretty JSON
    pub fn to_json_pretty(&self) -> Result<String, EngineError> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    /// Check that every value is usable
    pub fn validate(&self) -> Result<(), EngineError> {
        if self.false_stop_window_ms < 0 {
            return Err(EngineError::InvalidConfig(format!(
                "false_stop_window_ms must be non-negative, got {}",
                self.false_stop_window_ms
            )));
        }
        if !(self.stdev_epsilon > 0.0 && self.stdev_epsilon.is_finite()) {
            return Err(EngineError::InvalidConfig(format!(
                "stdev_epsilon must be positive and finite, got {}",
                self.stdev_epsilon
            )));
        }
        if !self.score_cap.is_finite() {
            return Err(EngineError::InvalidConfig(
                "score_cap must be finite".to_string(),
            ));
        }
        self.reference_offset()?;
        self.chat_offset()?;
        Ok(())
    }

    /// Offset the recorded session start is interpreted in
    pub fn reference_offset(&self) -> Result<FixedOffset, EngineError> {
        offset_from_minutes(self.reference_utc_offset_minutes, "reference_utc_offset_minutes")
    }

    /// Offset of the chat log clock
    pub fn chat_offset(&self) -> Result<FixedOffset, EngineError> {
        offset_from_minutes(self.chat_utc_offset_minutes, "chat_utc_offset_minutes")
    }
}

fn offset_from_minutes(minutes: i32, field: &str) -> Result<FixedOffset, EngineError> {
    minutes
        .checked_mul(60)
        .and_then(FixedOffset::east_opt)
        .ok_or_else(|| EngineError::InvalidConfig(format!("{field} out of range: {minutes}")))
}
