//! Core data types
//!
//! This module defines the session log consumed by the engine, the intermediate
//! structures produced by each pipeline stage, and the final report.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

/// Internal participant identifier as it appears in camera and microphone events
pub type ParticipantId = String;

/// Activity channel
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Channel {
    Camera,
    Microphone,
    Chat,
}

impl Channel {
    pub fn as_str(&self) -> &'static str {
        match self {
            Channel::Camera => "camera",
            Channel::Microphone => "microphone",
            Channel::Chat => "chat",
        }
    }
}

impl fmt::Display for Channel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Kind of a raw log event
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EventKind {
    CameraStart,
    CameraStop,
    PauseStart,
    PauseStop,
    /// Video feed lost; ends both a camera span and a pause
    VideoRemoved,
    MicStart,
    MicStop,
    ChatMessage,
}

impl EventKind {
    /// Kinds that feed the interval channels (everything except chat)
    pub const INTERVAL_KINDS: [EventKind; 7] = [
        EventKind::CameraStart,
        EventKind::CameraStop,
        EventKind::PauseStart,
        EventKind::PauseStop,
        EventKind::VideoRemoved,
        EventKind::MicStart,
        EventKind::MicStop,
    ];

    /// Channel this kind of event belongs to
    pub fn channel(&self) -> Channel {
        match self {
            EventKind::CameraStart
            | EventKind::CameraStop
            | EventKind::PauseStart
            | EventKind::PauseStop
            | EventKind::VideoRemoved => Channel::Camera,
            EventKind::MicStart | EventKind::MicStop => Channel::Microphone,
            EventKind::ChatMessage => Channel::Chat,
        }
    }
}

/// A raw typed event handed over by the log parser.
///
/// Camera and microphone timestamps are milliseconds from session start. Chat
/// timestamps are Unix epoch milliseconds, as written by the chat log.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RawEvent {
    /// Participant id (alternate id space for chat events)
    pub participant_id: String,
    /// Event kind
    pub kind: EventKind,
    /// Timestamp; events without one are skipped
    #[serde(default)]
    pub timestamp_ms: Option<i64>,
    /// Message body (chat events only)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub text: Option<String>,
}

impl RawEvent {
    pub fn new(participant_id: impl Into<String>, kind: EventKind, timestamp_ms: i64) -> Self {
        Self {
            participant_id: participant_id.into(),
            kind,
            timestamp_ms: Some(timestamp_ms),
            text: None,
        }
    }

    pub fn chat(participant_id: impl Into<String>, timestamp_ms: i64, text: &str) -> Self {
        Self {
            participant_id: participant_id.into(),
            kind: EventKind::ChatMessage,
            timestamp_ms: Some(timestamp_ms),
            text: Some(text.to_string()),
        }
    }
}

/// Raw event lists, one per channel
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ChannelEvents {
    #[serde(default)]
    pub camera: Vec<RawEvent>,
    #[serde(default)]
    pub microphone: Vec<RawEvent>,
    #[serde(default)]
    pub chat: Vec<RawEvent>,
}

impl ChannelEvents {
    /// Iterate over `(channel, events)` pairs
    pub fn by_channel(&self) -> [(Channel, &[RawEvent]); 3] {
        [
            (Channel::Camera, self.camera.as_slice()),
            (Channel::Microphone, self.microphone.as_slice()),
            (Channel::Chat, self.chat.as_slice()),
        ]
    }
}

/// One participant entry as listed by the session's identity records
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ParticipantRecord {
    pub id: ParticipantId,
    /// Alternate id used by the chat log
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub alt_id: Option<String>,
    pub display_name: String,
}

/// Complete input document for one recorded session
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SessionLog {
    /// End of the recording, in milliseconds from session start
    pub session_end_ms: i64,
    /// Recorded wall-clock start (ctime layout or RFC 3339)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub session_start: Option<String>,
    /// Internal id of the instructor
    pub instructor_id: ParticipantId,
    /// Known participants
    pub participants: Vec<ParticipantRecord>,
    /// Raw events per channel
    #[serde(default)]
    pub events: ChannelEvents,
}

/// A chat message retained by the normalizer
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatMessage {
    pub timestamp_ms: i64,
}

/// A reconciled span of continuous activity on one channel
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Interval {
    pub participant_id: ParticipantId,
    pub channel: Channel,
    pub start_ms: i64,
    pub end_ms: i64,
}

impl Interval {
    /// Length in milliseconds (`end_ms >= start_ms` holds by construction)
    pub fn duration_ms(&self) -> i64 {
        self.end_ms.saturating_sub(self.start_ms)
    }
}

/// Session-wide facts carried through every stage
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SessionFrame {
    pub session_end_ms: i64,
    /// Canonical id of the instructor
    pub instructor_id: ParticipantId,
    /// Canonical ids of every known participant, in roster order
    pub participants: Vec<ParticipantId>,
}

/// Output of the event normalizer: sorted timestamps per kind per participant.
///
/// Every participant in `frame.participants` is a key of every map.
#[derive(Debug, Clone, PartialEq)]
pub struct NormalizedEvents {
    pub frame: SessionFrame,
    pub timestamps: BTreeMap<EventKind, BTreeMap<ParticipantId, Vec<i64>>>,
    pub chat: BTreeMap<ParticipantId, Vec<ChatMessage>>,
    pub warnings: Vec<QualityWarning>,
}

impl NormalizedEvents {
    /// Sorted timestamps of one kind for one participant
    pub fn timestamps(&self, kind: EventKind, participant_id: &str) -> &[i64] {
        self.timestamps
            .get(&kind)
            .and_then(|by_participant| by_participant.get(participant_id))
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }
}

/// Intervals and retained chat messages of one participant
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ParticipantIntervals {
    pub camera_on: Vec<Interval>,
    pub camera_paused: Vec<Interval>,
    pub microphone: Vec<Interval>,
    pub chat: Vec<ChatMessage>,
}

/// Output of the interval builder
#[derive(Debug, Clone, PartialEq)]
pub struct SessionIntervals {
    pub frame: SessionFrame,
    pub participants: BTreeMap<ParticipantId, ParticipantIntervals>,
    pub warnings: Vec<QualityWarning>,
}

/// Summed durations of one participant
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct ParticipantDurations {
    pub camera_on_minutes: f64,
    pub camera_paused_minutes: f64,
    /// On-camera minutes minus paused minutes, never negative
    pub camera_active_minutes: f64,
    pub microphone_minutes: f64,
    pub chat_messages: u32,
}

/// Output of the duration aggregator
#[derive(Debug, Clone, PartialEq)]
pub struct SessionDurations {
    pub frame: SessionFrame,
    pub session_minutes: f64,
    pub participants: BTreeMap<ParticipantId, ParticipantDurations>,
    pub warnings: Vec<QualityWarning>,
}

/// Normalized metrics of one interval channel
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct ChannelMetrics {
    pub active_minutes: f64,
    /// Paused minutes; always zero outside the camera channel
    pub inactive_minutes: f64,
    pub fraction_of_class: f64,
    pub fraction_of_instructor: f64,
}

/// Metrics of the chat channel
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct ChatMetrics {
    pub message_count: u32,
    pub fraction_of_messages: f64,
}

/// All metrics of one participant
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ParticipantMetrics {
    pub camera: ChannelMetrics,
    pub microphone: ChannelMetrics,
    pub chat: ChatMetrics,
    /// Composite participation score; `None` for the instructor
    pub participation_score: Option<f64>,
}

/// Output of the metric normalizer
#[derive(Debug, Clone, PartialEq)]
pub struct SessionMetrics {
    pub frame: SessionFrame,
    pub session_minutes: f64,
    pub participants: BTreeMap<ParticipantId, ParticipantMetrics>,
    pub warnings: Vec<QualityWarning>,
}

/// Non-fatal data problem corrected by policy
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum QualityWarning {
    /// Pause time exceeded on-camera time; active time clamped at zero
    NegativeDuration {
        participant_id: ParticipantId,
        raw_minutes: f64,
    },
    /// More pause stops than pause starts after filtering; the latest was dropped
    ExcessStops {
        participant_id: ParticipantId,
        dropped_ms: i64,
    },
    /// A start fell inside an already open span and was absorbed
    DuplicateStart {
        participant_id: ParticipantId,
        channel: Channel,
        timestamp_ms: i64,
    },
    /// No events on any channel
    ZeroActivity { participant_id: ParticipantId },
    /// Event skipped
    MalformedEvent {
        participant_id: String,
        channel: Channel,
        reason: String,
    },
}

impl QualityWarning {
    /// Log the warning and add it to `sink`
    pub(crate) fn emit(self, sink: &mut Vec<QualityWarning>) {
        tracing::warn!(warning = %self, "data quality");
        sink.push(self);
    }
}

impl fmt::Display for QualityWarning {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            QualityWarning::NegativeDuration {
                participant_id,
                raw_minutes,
            } => write!(
                f,
                "{participant_id}: camera active time {raw_minutes:.3} min clamped to zero"
            ),
            QualityWarning::ExcessStops {
                participant_id,
                dropped_ms,
            } => write!(f, "{participant_id}: dropped trailing pause stop at {dropped_ms} ms"),
            QualityWarning::DuplicateStart {
                participant_id,
                channel,
                timestamp_ms,
            } => write!(
                f,
                "{participant_id}: {channel} start at {timestamp_ms} ms inside an open span"
            ),
            QualityWarning::ZeroActivity { participant_id } => {
                write!(f, "{participant_id}: no activity on any channel")
            }
            QualityWarning::MalformedEvent {
                participant_id,
                channel,
                reason,
            } => write!(f, "{participant_id}: skipped {channel} event ({reason})"),
        }
    }
}

/// One output row: display name followed by every metric
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResultRow {
    pub participant: String,
    pub participation_score: Option<f64>,
    pub camera_minutes: f64,
    pub camera_paused_minutes: f64,
    pub camera_fraction_of_class: f64,
    pub camera_fraction_of_instructor: f64,
    pub microphone_minutes: f64,
    pub microphone_fraction_of_class: f64,
    pub microphone_fraction_of_instructor: f64,
    pub chat_messages: u32,
    pub chat_fraction_of_messages: f64,
}

impl ResultRow {
    /// Cells in header order; a missing score renders as an empty cell
    pub fn to_cells(&self) -> Vec<String> {
        vec![
            self.participant.clone(),
            self.participation_score
                .map(|s| s.to_string())
                .unwrap_or_default(),
            self.camera_minutes.to_string(),
            self.camera_paused_minutes.to_string(),
            self.camera_fraction_of_class.to_string(),
            self.camera_fraction_of_instructor.to_string(),
            self.microphone_minutes.to_string(),
            self.microphone_fraction_of_class.to_string(),
            self.microphone_fraction_of_instructor.to_string(),
            self.chat_messages.to_string(),
            self.chat_fraction_of_messages.to_string(),
        ]
    }
}

/// Final tabular result
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ParticipationReport {
    pub headers: Vec<String>,
    pub rows: Vec<ResultRow>,
    pub warnings: Vec<QualityWarning>,
}

impl ParticipationReport {
    /// Header-first table of cells, as written to CSV
    pub fn to_table(&self) -> Vec<Vec<String>> {
        std::iter::once(self.headers.clone())
            .chain(self.rows.iter().map(ResultRow::to_cells))
            .collect()
    }

    /// Look up a row by display name
    pub fn row(&self, participant: &str) -> Option<&ResultRow> {
        self.rows.iter().find(|r| r.participant == participant)
    }
}
