//! Interval reconstruction
//!
//! Pairs start and stop events into non-overlapping intervals per participant
//! and channel. Logs carry no explicit start/stop linkage, so pairing is driven
//! by policy:
//!
//! - **Camera**: a span ends at the next explicit stop or video loss, whichever
//!   comes first; a span still open at the end of the log closes at session end.
//! - **Camera pause**: a pause ends at the next resume or video loss, after
//!   spurious resumes emitted around reconnects have been filtered out.
//! - **Microphone**: a span ends at the next strictly later mic-off; an unmatched
//!   mic-on is a zero-length span.

use crate::chat::retain_after;
use crate::config::EngineConfig;
use crate::types::{
    Channel, EventKind, Interval, NormalizedEvents, ParticipantId, ParticipantIntervals,
    QualityWarning, SessionIntervals,
};
use std::collections::BTreeMap;

/// Which stops may close a span opened at `start`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StopRule {
    /// `stop >= start`
    AtOrAfter,
    /// `stop > start`
    StrictlyAfter,
}

impl StopRule {
    fn accepts(self, start: i64, stop: i64) -> bool {
        match self {
            StopRule::AtOrAfter => stop >= start,
            StopRule::StrictlyAfter => stop > start,
        }
    }
}

/// What to do with a start that has no stop left
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Unmatched {
    /// Close at the given time (or at the start, if that is later)
    CloseAt(i64),
    /// Close at the start itself
    ZeroLength,
}

/// Spans built by [`pair_spans`]
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PairedSpans {
    pub spans: Vec<(i64, i64)>,
    /// Starts that fell inside an earlier span and were absorbed by it
    pub absorbed_starts: Vec<i64>,
}

/// Pair sorted starts with sorted stops.
///
/// Each start takes the first unused stop accepted by `rule`; stops passed over
/// on the way are orphans and are discarded. A start inside the previous span is
/// absorbed, so the result never overlaps.
pub fn pair_spans(
    starts: &[i64],
    stops: &[i64],
    rule: StopRule,
    unmatched: Unmatched,
) -> PairedSpans {
    let mut paired = PairedSpans::default();
    let mut cursor = 0;

    for &start in starts {
        if let Some(&(_, end)) = paired.spans.last() {
            if start < end {
                paired.absorbed_starts.push(start);
                continue;
            }
        }

        while cursor < stops.len() && !rule.accepts(start, stops[cursor]) {
            cursor += 1;
        }

        let end = match stops.get(cursor) {
            Some(&stop) => {
                cursor += 1;
                stop
            }
            None => match unmatched {
                Unmatched::CloseAt(at) => at.max(start),
                Unmatched::ZeroLength => start,
            },
        };
        paired.spans.push((start, end));
    }

    paired
}

/// Pause stops surviving reconciliation
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ReconciledStops {
    pub stops: Vec<i64>,
    /// Trailing stop dropped because stops outnumbered starts
    pub dropped: Option<i64>,
}

/// Filter pooled pause stops (pause resumes and video losses, sorted).
///
/// Drops stops before the first pause start, stops strictly inside
/// `(camera_start, camera_start + window_ms)` for any camera start, and then,
/// if stops still outnumber pause starts, the single latest stop.
pub fn reconcile_pause_stops(
    pause_starts: &[i64],
    pooled_stops: &[i64],
    camera_starts: &[i64],
    window_ms: i64,
) -> ReconciledStops {
    let first_pause = pause_starts.first().copied();

    let mut stops: Vec<i64> = pooled_stops
        .iter()
        .copied()
        .filter(|&stop| first_pause.map_or(true, |first| stop >= first))
        .filter(|&stop| {
            !camera_starts
                .iter()
                .any(|&start| stop > start && stop < start.saturating_add(window_ms))
        })
        .collect();

    let dropped = if stops.len() > pause_starts.len() {
        stops.pop()
    } else {
        None
    };

    ReconciledStops { stops, dropped }
}

/// Merge two sorted sequences
fn merge_sorted(a: &[i64], b: &[i64]) -> Vec<i64> {
    let mut merged = Vec::with_capacity(a.len() + b.len());
    merged.extend_from_slice(a);
    merged.extend_from_slice(b);
    merged.sort_unstable();
    merged
}

/// Builder for reconciled intervals
pub struct IntervalBuilder<'a> {
    config: &'a EngineConfig,
}

impl<'a> IntervalBuilder<'a> {
    pub fn new(config: &'a EngineConfig) -> Self {
        Self { config }
    }

    /// Build intervals for every participant.
    ///
    /// Chat messages at or before `chat_threshold_ms` are discarded; `None`
    /// keeps every message.
    pub fn build(
        &self,
        normalized: NormalizedEvents,
        chat_threshold_ms: Option<i64>,
    ) -> SessionIntervals {
        let frame = &normalized.frame;
        let mut warnings = normalized.warnings.clone();

        let participants: BTreeMap<ParticipantId, ParticipantIntervals> = frame
            .participants
            .iter()
            .map(|id| {
                let (camera_on, camera_paused) =
                    self.camera_intervals(&normalized, id, frame.session_end_ms, &mut warnings);
                let microphone = self.microphone_intervals(&normalized, id, &mut warnings);
                let chat = normalized
                    .chat
                    .get(id)
                    .map(|messages| retain_after(messages, chat_threshold_ms))
                    .unwrap_or_default();

                (
                    id.clone(),
                    ParticipantIntervals {
                        camera_on,
                        camera_paused,
                        microphone,
                        chat,
                    },
                )
            })
            .collect();

        SessionIntervals {
            frame: frame.clone(),
            participants,
            warnings,
        }
    }

    /// On-camera spans and pause spans of one participant
    fn camera_intervals(
        &self,
        normalized: &NormalizedEvents,
        id: &str,
        session_end_ms: i64,
        warnings: &mut Vec<QualityWarning>,
    ) -> (Vec<Interval>, Vec<Interval>) {
        let camera_starts = normalized.timestamps(EventKind::CameraStart, id);
        let video_removed = normalized.timestamps(EventKind::VideoRemoved, id);

        let camera_stops =
            merge_sorted(normalized.timestamps(EventKind::CameraStop, id), video_removed);
        let on = pair_spans(
            camera_starts,
            &camera_stops,
            StopRule::AtOrAfter,
            Unmatched::CloseAt(session_end_ms),
        );
        report_absorbed(id, Channel::Camera, &on.absorbed_starts, warnings);

        let pause_starts = normalized.timestamps(EventKind::PauseStart, id);
        let pooled = merge_sorted(normalized.timestamps(EventKind::PauseStop, id), video_removed);
        let reconciled = reconcile_pause_stops(
            pause_starts,
            &pooled,
            camera_starts,
            self.config.false_stop_window_ms,
        );
        if let Some(dropped_ms) = reconciled.dropped {
            QualityWarning::ExcessStops {
                participant_id: id.to_string(),
                dropped_ms,
            }
            .emit(warnings);
        }

        let paused = pair_spans(
            pause_starts,
            &reconciled.stops,
            StopRule::StrictlyAfter,
            Unmatched::ZeroLength,
        );
        report_absorbed(id, Channel::Camera, &paused.absorbed_starts, warnings);

        (
            to_intervals(id, Channel::Camera, on.spans),
            to_intervals(id, Channel::Camera, paused.spans),
        )
    }

    /// Microphone spans of one participant
    fn microphone_intervals(
        &self,
        normalized: &NormalizedEvents,
        id: &str,
        warnings: &mut Vec<QualityWarning>,
    ) -> Vec<Interval> {
        let starts = normalized.timestamps(EventKind::MicStart, id);
        if starts.is_empty() {
            return to_intervals(id, Channel::Microphone, vec![(0, 0)]);
        }

        let paired = pair_spans(
            starts,
            normalized.timestamps(EventKind::MicStop, id),
            StopRule::StrictlyAfter,
            Unmatched::ZeroLength,
        );
        report_absorbed(id, Channel::Microphone, &paired.absorbed_starts, warnings);
        to_intervals(id, Channel::Microphone, paired.spans)
    }
}

fn to_intervals(id: &str, channel: Channel, spans: Vec<(i64, i64)>) -> Vec<Interval> {
    spans
        .into_iter()
        .map(|(start_ms, end_ms)| Interval {
            participant_id: id.to_string(),
            channel,
            start_ms,
            end_ms,
        })
        .collect()
}

fn report_absorbed(
    id: &str,
    channel: Channel,
    absorbed: &[i64],
    warnings: &mut Vec<QualityWarning>,
) {
    for &timestamp_ms in absorbed {
        QualityWarning::DuplicateStart {
            participant_id: id.to_string(),
            channel,
            timestamp_ms,
        }
        .emit(warnings);
    }
}
