//! Metric normalization
//!
//! Converts raw durations into class and instructor fractions and computes the
//! composite participation score of every student.

use crate::baseline::CohortBaseline;
use crate::config::EngineConfig;
use crate::types::{
    ChannelMetrics, ChatMetrics, ParticipantDurations, ParticipantId, ParticipantMetrics,
    SessionDurations, SessionMetrics,
};
use std::collections::BTreeMap;

/// Instructor microphone denominator used when the instructor never spoke
pub const SILENT_INSTRUCTOR_MIC_MINUTES: f64 = 1.0;

/// `value / denominator`, or zero when the denominator is not positive
fn ratio(value: f64, denominator: f64) -> f64 {
    if denominator > 0.0 {
        value / denominator
    } else {
        0.0
    }
}

/// Normalizer for aggregated durations
pub struct MetricNormalizer<'a> {
    config: &'a EngineConfig,
}

impl<'a> MetricNormalizer<'a> {
    pub fn new(config: &'a EngineConfig) -> Self {
        Self { config }
    }

    /// Compute fractions and scores for every participant
    pub fn normalize(&self, durations: SessionDurations) -> SessionMetrics {
        let SessionDurations {
            frame,
            session_minutes,
            participants,
            warnings,
        } = durations;

        let instructor = participants
            .get(&frame.instructor_id)
            .copied()
            .unwrap_or_default();

        // Camera falls back to the whole session, microphone to one minute
        let camera_denominator = if instructor.camera_active_minutes == 0.0 {
            session_minutes
        } else {
            instructor.camera_active_minutes
        };
        let mic_denominator = if instructor.microphone_minutes == 0.0 {
            SILENT_INSTRUCTOR_MIC_MINUTES
        } else {
            instructor.microphone_minutes
        };

        let total_messages: u32 = participants.values().map(|p| p.chat_messages).sum();
        let scores = self.participation_scores(&frame.instructor_id, &participants);

        let participants = participants
            .iter()
            .map(|(id, d)| {
                let metrics = ParticipantMetrics {
                    camera: ChannelMetrics {
                        active_minutes: d.camera_active_minutes,
                        inactive_minutes: d.camera_paused_minutes,
                        fraction_of_class: ratio(d.camera_active_minutes, session_minutes),
                        fraction_of_instructor: ratio(d.camera_active_minutes, camera_denominator),
                    },
                    microphone: ChannelMetrics {
                        active_minutes: d.microphone_minutes,
                        inactive_minutes: 0.0,
                        fraction_of_class: ratio(d.microphone_minutes, session_minutes),
                        fraction_of_instructor: ratio(d.microphone_minutes, mic_denominator),
                    },
                    chat: ChatMetrics {
                        message_count: d.chat_messages,
                        fraction_of_messages: ratio(
                            f64::from(d.chat_messages),
                            f64::from(total_messages),
                        ),
                    },
                    participation_score: scores.get(id).copied(),
                };
                (id.clone(), metrics)
            })
            .collect();

        SessionMetrics {
            frame,
            session_minutes,
            participants,
            warnings,
        }
    }

    /// Composite score of every participant except the instructor.
    ///
    /// Each channel is standardized against the student cohort; the composite is
    /// the plain mean of the three channel scores, capped but never floored.
    fn participation_scores(
        &self,
        instructor_id: &str,
        participants: &BTreeMap<ParticipantId, ParticipantDurations>,
    ) -> BTreeMap<ParticipantId, f64> {
        let students: Vec<(&ParticipantId, &ParticipantDurations)> = participants
            .iter()
            .filter(|(id, _)| id.as_str() != instructor_id)
            .collect();

        let channel_values: [fn(&ParticipantDurations) -> f64; 3] = [
            |d| d.camera_active_minutes,
            |d| d.microphone_minutes,
            |d| f64::from(d.chat_messages),
        ];

        let baselines: Vec<CohortBaseline> = channel_values
            .iter()
            .filter_map(|value| {
                let values: Vec<f64> = students.iter().map(|(_, d)| value(*d)).collect();
                CohortBaseline::from_values(&values)
            })
            .collect();
        if baselines.len() != channel_values.len() {
            return BTreeMap::new();
        }

        let epsilon = self.config.stdev_epsilon;
        students
            .iter()
            .map(|(id, d)| {
                let sum: f64 = channel_values
                    .iter()
                    .zip(&baselines)
                    .map(|(value, baseline)| baseline.score(value(*d), epsilon))
                    .sum();
                let composite = sum / channel_values.len() as f64;
                ((*id).clone(), composite.min(self.config.score_cap))
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::SessionFrame;

    fn durations(entries: &[(&str, ParticipantDurations)]) -> SessionDurations {
        SessionDurations {
            frame: SessionFrame {
                session_end_ms: 3_600_000,
                instructor_id: "1".to_string(),
                participants: entries.iter().map(|(id, _)| id.to_string()).collect(),
            },
            session_minutes: 60.0,
            participants: entries
                .iter()
                .map(|(id, d)| (id.to_string(), *d))
                .collect(),
            warnings: Vec::new(),
        }
    }

    fn camera(minutes: f64) -> ParticipantDurations {
        ParticipantDurations {
            camera_on_minutes: minutes,
            camera_active_minutes: minutes,
            ..ParticipantDurations::default()
        }
    }

    #[test]
    fn test_fraction_of_class() {
        let config = EngineConfig::default();
        let metrics = MetricNormalizer::new(&config)
            .normalize(durations(&[("1", camera(60.0)), ("2", camera(15.0))]));

        let student = &metrics.participants["2"];
        assert_eq!(student.camera.fraction_of_class, 15.0 / 60.0);
        assert_eq!(student.camera.fraction_of_instructor, 0.25);
    }

    #[test]
    fn test_absent_instructor_camera_uses_session_minutes() {
        let config = EngineConfig::default();
        let metrics = MetricNormalizer::new(&config)
            .normalize(durations(&[("1", camera(0.0)), ("2", camera(30.0))]));

        let student = &metrics.participants["2"];
        assert_eq!(student.camera.fraction_of_instructor, 0.5);
        assert!(student.camera.fraction_of_instructor.is_finite());
    }

    #[test]
    fn test_silent_instructor_mic_uses_one_minute() {
        let config = EngineConfig::default();
        let student = ParticipantDurations {
            microphone_minutes: 3.0,
            ..ParticipantDurations::default()
        };
        let metrics = MetricNormalizer::new(&config)
            .normalize(durations(&[("1", ParticipantDurations::default()), ("2", student)]));

        assert_eq!(metrics.participants["2"].microphone.fraction_of_instructor, 3.0);
        assert_eq!(metrics.participants["2"].microphone.fraction_of_class, 3.0 / 60.0);
    }

    #[test]
    fn test_fraction_of_messages() {
        let config = EngineConfig::default();
        let chatty = |n| ParticipantDurations {
            chat_messages: n,
            ..ParticipantDurations::default()
        };
        let metrics = MetricNormalizer::new(&config).normalize(durations(&[
            ("1", chatty(1)),
            ("2", chatty(3)),
            ("3", chatty(0)),
        ]));

        assert_eq!(metrics.participants["1"].chat.fraction_of_messages, 0.25);
        assert_eq!(metrics.participants["2"].chat.fraction_of_messages, 0.75);
        assert_eq!(metrics.participants["3"].chat.fraction_of_messages, 0.0);
    }

    #[test]
    fn test_instructor_is_never_scored() {
        let config = EngineConfig::default();
        let metrics = MetricNormalizer::new(&config).normalize(durations(&[
            ("1", camera(60.0)),
            ("2", camera(10.0)),
            ("3", camera(20.0)),
        ]));

        assert_eq!(metrics.participants["1"].participation_score, None);
        assert!(metrics.participants["2"].participation_score.is_some());
        assert!(metrics.participants["3"].participation_score.is_some());
    }

    #[test]
    fn test_scores_are_capped() {
        let config = EngineConfig::default();
        let metrics = MetricNormalizer::new(&config).normalize(durations(&[
            ("1", camera(60.0)),
            ("2", camera(0.0)),
            ("3", camera(0.0)),
            ("4", camera(1.0)),
        ]));

        for (id, p) in &metrics.participants {
            if let Some(score) = p.participation_score {
                assert!(score <= 105.0, "{id} scored {score}");
            }
        }
        assert_eq!(metrics.participants["4"].participation_score, Some(105.0));
    }

    #[test]
    fn test_composite_is_mean_of_channel_scores() {
        // Camera: values 10 and 30, mean 20, stdev 10, adjustment 5.
        // Student "3" camera score = 1 * 5 + 100 = 105; mic and chat are uniform
        // zeros scoring 100 each, so the composite is (105 + 100 + 100) / 3.
        let config = EngineConfig {
            score_cap: 1_000.0,
            ..EngineConfig::default()
        };
        let metrics = MetricNormalizer::new(&config).normalize(durations(&[
            ("1", camera(60.0)),
            ("2", camera(10.0)),
            ("3", camera(30.0)),
        ]));

        let score = metrics.participants["3"].participation_score.unwrap();
        assert!((score - 305.0 / 3.0).abs() < 1e-6);
        let low = metrics.participants["2"].participation_score.unwrap();
        assert!((low - 295.0 / 3.0).abs() < 1e-6);
    }

    #[test]
    fn test_all_zero_participant_has_defined_score() {
        let config = EngineConfig::default();
        let metrics = MetricNormalizer::new(&config).normalize(durations(&[
            ("1", camera(60.0)),
            ("2", ParticipantDurations::default()),
        ]));

        let student = &metrics.participants["2"];
        assert_eq!(student.camera.active_minutes, 0.0);
        assert_eq!(student.microphone.active_minutes, 0.0);
        assert_eq!(student.chat.message_count, 0);
        assert_eq!(student.participation_score, Some(100.0));
    }

    #[test]
    fn test_instructor_only_session_has_no_scores() {
        let config = EngineConfig::default();
        let metrics =
            MetricNormalizer::new(&config).normalize(durations(&[("1", camera(60.0))]));
        assert_eq!(metrics.participants["1"].participation_score, None);
    }

    #[test]
    fn test_zero_length_session_fractions_are_zero() {
        let config = EngineConfig::default();
        let mut input = durations(&[("1", camera(0.0)), ("2", camera(0.0))]);
        input.session_minutes = 0.0;
        let metrics = MetricNormalizer::new(&config).normalize(input);
        assert_eq!(metrics.participants["2"].camera.fraction_of_class, 0.0);
        assert_eq!(metrics.participants["2"].camera.fraction_of_instructor, 0.0);
    }
}
