//! Duration aggregation
//!
//! Sums reconciled intervals into minutes per participant and channel.

use crate::types::{
    Interval, ParticipantDurations, ParticipantId, ParticipantIntervals, QualityWarning,
    SessionDurations, SessionIntervals,
};
use std::collections::BTreeMap;

/// Convert milliseconds to minutes
pub fn ms_to_minutes(ms: i64) -> f64 {
    ms as f64 / 1000.0 / 60.0
}

fn total_ms(intervals: &[Interval]) -> i64 {
    intervals
        .iter()
        .map(Interval::duration_ms)
        .fold(0, i64::saturating_add)
}

/// Aggregator for interval durations
pub struct DurationAggregator;

impl DurationAggregator {
    /// Sum every participant's intervals
    pub fn aggregate(intervals: SessionIntervals) -> SessionDurations {
        let SessionIntervals {
            frame,
            participants,
            mut warnings,
        } = intervals;

        let participants: BTreeMap<ParticipantId, ParticipantDurations> = participants
            .iter()
            .map(|(id, p)| (id.clone(), participant_durations(id, p, &mut warnings)))
            .collect();

        SessionDurations {
            session_minutes: ms_to_minutes(frame.session_end_ms),
            frame,
            participants,
            warnings,
        }
    }
}

fn participant_durations(
    id: &str,
    intervals: &ParticipantIntervals,
    warnings: &mut Vec<QualityWarning>,
) -> ParticipantDurations {
    let on_ms = total_ms(&intervals.camera_on);
    let paused_ms = total_ms(&intervals.camera_paused);

    let active_ms = on_ms - paused_ms;
    let camera_active_minutes = if active_ms < 0 {
        QualityWarning::NegativeDuration {
            participant_id: id.to_string(),
            raw_minutes: ms_to_minutes(active_ms),
        }
        .emit(warnings);
        0.0
    } else {
        ms_to_minutes(active_ms)
    };

    ParticipantDurations {
        camera_on_minutes: ms_to_minutes(on_ms),
        camera_paused_minutes: ms_to_minutes(paused_ms),
        camera_active_minutes,
        microphone_minutes: ms_to_minutes(total_ms(&intervals.microphone)),
        chat_messages: intervals.chat.len() as u32,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{Channel, ChatMessage, SessionFrame};

    fn interval(channel: Channel, start_ms: i64, end_ms: i64) -> Interval {
        Interval {
            participant_id: "2".to_string(),
            channel,
            start_ms,
            end_ms,
        }
    }

    fn session(p: ParticipantIntervals) -> SessionIntervals {
        SessionIntervals {
            frame: SessionFrame {
                session_end_ms: 3_600_000,
                instructor_id: "1".to_string(),
                participants: vec!["2".to_string()],
            },
            participants: BTreeMap::from([("2".to_string(), p)]),
            warnings: Vec::new(),
        }
    }

    #[test]
    fn test_ms_to_minutes() {
        assert_eq!(ms_to_minutes(60_000), 1.0);
        assert_eq!(ms_to_minutes(30_000), 0.5);
        assert_eq!(ms_to_minutes(0), 0.0);
    }

    #[test]
    fn test_camera_minutes_subtract_pauses() {
        let durations = DurationAggregator::aggregate(session(ParticipantIntervals {
            camera_on: vec![interval(Channel::Camera, 0, 60_000)],
            camera_paused: vec![interval(Channel::Camera, 10_000, 40_000)],
            ..ParticipantIntervals::default()
        }));

        let p = &durations.participants["2"];
        assert_eq!(p.camera_on_minutes, 1.0);
        assert_eq!(p.camera_paused_minutes, 0.5);
        assert_eq!(p.camera_active_minutes, 0.5);
        assert_eq!(durations.session_minutes, 60.0);
        assert!(durations.warnings.is_empty());
    }

    #[test]
    fn test_negative_camera_time_clamps_to_zero() {
        let durations = DurationAggregator::aggregate(session(ParticipantIntervals {
            camera_on: vec![interval(Channel::Camera, 0, 10_000)],
            camera_paused: vec![interval(Channel::Camera, 5_000, 35_000)],
            ..ParticipantIntervals::default()
        }));

        let p = &durations.participants["2"];
        assert_eq!(p.camera_active_minutes, 0.0);
        assert_eq!(p.camera_paused_minutes, 0.5);
        assert!(matches!(
            durations.warnings[0],
            QualityWarning::NegativeDuration { .. }
        ));
    }

    #[test]
    fn test_microphone_and_chat_totals() {
        let durations = DurationAggregator::aggregate(session(ParticipantIntervals {
            microphone: vec![
                interval(Channel::Microphone, 0, 15_000),
                interval(Channel::Microphone, 30_000, 45_000),
            ],
            chat: vec![ChatMessage { timestamp_ms: 1 }, ChatMessage { timestamp_ms: 2 }],
            ..ParticipantIntervals::default()
        }));

        let p = &durations.participants["2"];
        assert_eq!(p.microphone_minutes, 0.5);
        assert_eq!(p.chat_messages, 2);
    }

    #[test]
    fn test_empty_intervals_are_zero() {
        let durations = DurationAggregator::aggregate(session(ParticipantIntervals::default()));
        let p = &durations.participants["2"];
        assert_eq!(*p, ParticipantDurations::default());
    }
}
