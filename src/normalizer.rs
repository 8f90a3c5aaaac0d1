//! Event normalization
//!
//! Groups raw events by participant and kind and establishes a total domain:
//! every known participant is a key of every per-kind map, so later stages never
//! look up a missing key.

use crate::error::EngineError;
use crate::roster::Roster;
use crate::types::{
    Channel, ChannelEvents, ChatMessage, EventKind, NormalizedEvents, ParticipantId,
    QualityWarning, RawEvent, SessionFrame,
};
use std::collections::{BTreeMap, BTreeSet};

/// Timestamp of the placeholder camera pair given to participants never on camera
pub const NEVER_ON_CAMERA_MS: i64 = 0;

/// Largest accepted timestamp; leaves headroom for span and window arithmetic
pub const MAX_TIMESTAMP_MS: i64 = i64::MAX / 2;

/// Normalizer for raw event streams
pub struct EventNormalizer;

impl EventNormalizer {
    /// Group, sort and pad raw events.
    ///
    /// Fails only when an event references a participant the roster cannot
    /// resolve.
    pub fn normalize(
        events: &ChannelEvents,
        roster: &Roster,
        session_end_ms: i64,
    ) -> Result<NormalizedEvents, EngineError> {
        let participants = roster.ids();
        let mut warnings = Vec::new();

        let mut timestamps: BTreeMap<EventKind, BTreeMap<ParticipantId, Vec<i64>>> =
            EventKind::INTERVAL_KINDS
                .iter()
                .map(|&kind| {
                    let empty: BTreeMap<ParticipantId, Vec<i64>> =
                        participants.iter().map(|id| (id.clone(), Vec::new())).collect();
                    (kind, empty)
                })
                .collect();
        let mut chat: BTreeMap<ParticipantId, Vec<ChatMessage>> = participants
            .iter()
            .map(|id| (id.clone(), Vec::new()))
            .collect();
        let mut active: BTreeSet<ParticipantId> = BTreeSet::new();

        for (channel, channel_events) in events.by_channel() {
            for event in channel_events {
                let Some(timestamp_ms) = check_event(event, channel, &mut warnings) else {
                    continue;
                };

                let participant = match channel {
                    Channel::Chat => roster.resolve_chat(&event.participant_id),
                    _ => roster.resolve(&event.participant_id),
                }
                .ok_or_else(|| {
                    EngineError::IdentityResolution(format!(
                        "{channel} event references unknown participant {}",
                        event.participant_id
                    ))
                })?;

                active.insert(participant.id.clone());

                if channel == Channel::Chat {
                    if let Some(messages) = chat.get_mut(&participant.id) {
                        messages.push(ChatMessage { timestamp_ms });
                    }
                } else if let Some(series) = timestamps
                    .get_mut(&event.kind)
                    .and_then(|by_participant| by_participant.get_mut(&participant.id))
                {
                    series.push(timestamp_ms);
                }
            }
        }

        for by_participant in timestamps.values_mut() {
            for series in by_participant.values_mut() {
                series.sort_unstable();
            }
        }
        for messages in chat.values_mut() {
            messages.sort_by_key(|m| m.timestamp_ms);
        }

        for id in &participants {
            if !active.contains(id) {
                QualityWarning::ZeroActivity {
                    participant_id: id.clone(),
                }
                .emit(&mut warnings);
            }
        }

        pad_never_on_camera(&mut timestamps, &participants);

        tracing::debug!(
            participants = participants.len(),
            warnings = warnings.len(),
            "normalized session events"
        );

        Ok(NormalizedEvents {
            frame: SessionFrame {
                session_end_ms,
                instructor_id: roster.instructor().id.clone(),
                participants,
            },
            timestamps,
            chat,
            warnings,
        })
    }
}

/// Validate one event against the channel list it arrived in
fn check_event(
    event: &RawEvent,
    channel: Channel,
    warnings: &mut Vec<QualityWarning>,
) -> Option<i64> {
    let reason = if event.kind.channel() != channel {
        format!("{:?} event in the {channel} stream", event.kind)
    } else {
        match event.timestamp_ms {
            Some(ts) if (0..=MAX_TIMESTAMP_MS).contains(&ts) => return Some(ts),
            Some(ts) => format!("timestamp {ts} out of range"),
            None => "missing timestamp".to_string(),
        }
    };

    QualityWarning::MalformedEvent {
        participant_id: event.participant_id.clone(),
        channel,
        reason,
    }
    .emit(warnings);
    None
}

/// Give every participant without a camera start a zero-length camera pair at
/// session start
fn pad_never_on_camera(
    timestamps: &mut BTreeMap<EventKind, BTreeMap<ParticipantId, Vec<i64>>>,
    participants: &[ParticipantId],
) {
    let never_on: Vec<&ParticipantId> = participants
        .iter()
        .filter(|id| {
            timestamps
                .get(&EventKind::CameraStart)
                .and_then(|m| m.get(*id))
                .map_or(true, Vec::is_empty)
        })
        .collect();

    for id in never_on {
        for kind in [EventKind::CameraStart, EventKind::CameraStop] {
            if let Some(series) = timestamps.get_mut(&kind).and_then(|m| m.get_mut(id)) {
                series.insert(0, NEVER_ON_CAMERA_MS);
            }
        }
    }
}
