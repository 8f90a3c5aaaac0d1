//! Chat channel
//!
//! Chat is a count channel: messages are kept when they were sent after the
//! session threshold. The chat log stamps messages in epoch milliseconds on its
//! own clock, while the session records its start as a wall-clock string, so the
//! start is anchored in the reference offset and re-expressed on the chat clock
//! before comparing.

use crate::config::{ChatThreshold, EngineConfig};
use crate::error::EngineError;
use crate::types::ChatMessage;
use chrono::{DateTime, FixedOffset, NaiveDateTime, NaiveTime, TimeZone};

/// Layout of the recorded session start, e.g. `Tue Jul 16 11:14:13 2019`
const CTIME_FORMAT: &str = "%a %b %d %H:%M:%S %Y";

/// Parse the recorded session start.
///
/// Accepts RFC 3339 (which carries its own offset) or the ctime layout, which is
/// interpreted in `reference`.
pub fn parse_session_start(
    raw: &str,
    reference: FixedOffset,
) -> Result<DateTime<FixedOffset>, EngineError> {
    if let Ok(parsed) = DateTime::parse_from_rfc3339(raw.trim()) {
        return Ok(parsed);
    }

    let collapsed = raw.split_whitespace().collect::<Vec<_>>().join(" ");
    let naive = NaiveDateTime::parse_from_str(&collapsed, CTIME_FORMAT)
        .map_err(|e| EngineError::DateParseError(format!("session start {raw:?}: {e}")))?;

    anchor(reference, naive)
}

/// Chat threshold in epoch milliseconds for a recorded session start
pub fn chat_threshold_ms(raw_start: &str, config: &EngineConfig) -> Result<i64, EngineError> {
    let start = parse_session_start(raw_start, config.reference_offset()?)?;

    let start = match config.chat_threshold {
        ChatThreshold::RecordingStart => start,
        ChatThreshold::SessionDay => {
            let midnight = start.date_naive().and_time(NaiveTime::MIN);
            anchor(*start.offset(), midnight)?
        }
    };

    let on_chat_clock = start.with_timezone(&config.chat_offset()?);
    tracing::debug!(threshold = %on_chat_clock, "chat threshold");
    Ok(on_chat_clock.timestamp_millis())
}

/// Messages sent strictly after `threshold_ms`; `None` keeps everything
pub fn retain_after(messages: &[ChatMessage], threshold_ms: Option<i64>) -> Vec<ChatMessage> {
    messages
        .iter()
        .filter(|m| threshold_ms.map_or(true, |t| m.timestamp_ms > t))
        .copied()
        .collect()
}

fn anchor(
    offset: FixedOffset,
    naive: NaiveDateTime,
) -> Result<DateTime<FixedOffset>, EngineError> {
    offset
        .from_local_datetime(&naive)
        .single()
        .ok_or_else(|| EngineError::DateParseError(format!("ambiguous local time {naive}")))
}
