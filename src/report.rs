//! Report assembly
//!
//! Joins every participant's metrics into one row under their display name and
//! orders rows for output.

use crate::roster::Roster;
use crate::types::{ParticipationReport, ResultRow, SessionMetrics};
use std::cmp::Ordering;

/// Column headers, in row order
pub const HEADERS: [&str; 11] = [
    "Participant",
    "Participation Grades",
    "Minutes on Camera",
    "Minutes with Camera Paused",
    "Fraction of Class Time on Camera",
    "Fraction of Instructor Time on Camera",
    "Minutes on Microphone",
    "Fraction of Class Time on Microphone",
    "Fraction of Instructor Time on Microphone",
    "Chat Messages Sent",
    "Fraction of Messages Sent",
];

/// Sort key of a display name: its second whitespace-separated token, or the
/// first when there is only one
pub fn sort_key(name: &str) -> &str {
    let mut tokens = name.split_whitespace();
    let first = tokens.next().unwrap_or("");
    tokens.next().unwrap_or(first)
}

fn compare_rows(a: &ResultRow, b: &ResultRow) -> Ordering {
    sort_key(&a.participant)
        .cmp(sort_key(&b.participant))
        .then_with(|| a.participant.cmp(&b.participant))
}

/// Assembler for the final report
pub struct ResultAssembler;

impl ResultAssembler {
    /// Build the ordered report
    pub fn assemble(metrics: SessionMetrics, roster: &Roster) -> ParticipationReport {
        let SessionMetrics {
            participants,
            warnings,
            ..
        } = metrics;

        let mut rows: Vec<ResultRow> = participants
            .into_iter()
            .map(|(id, m)| ResultRow {
                participant: roster.label(&id).unwrap_or(id),
                participation_score: m.participation_score,
                camera_minutes: m.camera.active_minutes,
                camera_paused_minutes: m.camera.inactive_minutes,
                camera_fraction_of_class: m.camera.fraction_of_class,
                camera_fraction_of_instructor: m.camera.fraction_of_instructor,
                microphone_minutes: m.microphone.active_minutes,
                microphone_fraction_of_class: m.microphone.fraction_of_class,
                microphone_fraction_of_instructor: m.microphone.fraction_of_instructor,
                chat_messages: m.chat.message_count,
                chat_fraction_of_messages: m.chat.fraction_of_messages,
            })
            .collect();
        rows.sort_by(compare_rows);

        ParticipationReport {
            headers: HEADERS.iter().map(|h| h.to_string()).collect(),
            rows,
            warnings,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{
        ChannelMetrics, ChatMetrics, ParticipantMetrics, ParticipantRecord, SessionFrame,
    };
    use pretty_assertions::assert_eq;
    use std::collections::BTreeMap;

    fn record(id: &str, name: &str) -> ParticipantRecord {
        ParticipantRecord {
            id: id.to_string(),
            alt_id: None,
            display_name: name.to_string(),
        }
    }

    fn metrics(ids: &[&str]) -> SessionMetrics {
        SessionMetrics {
            frame: SessionFrame {
                session_end_ms: 60_000,
                instructor_id: "1".to_string(),
                participants: ids.iter().map(|id| id.to_string()).collect(),
            },
            session_minutes: 1.0,
            participants: ids
                .iter()
                .map(|id| {
                    let m = ParticipantMetrics {
                        camera: ChannelMetrics {
                            active_minutes: 0.5,
                            ..ChannelMetrics::default()
                        },
                        microphone: ChannelMetrics::default(),
                        chat: ChatMetrics::default(),
                        participation_score: (*id != "1").then_some(100.0),
                    };
                    (id.to_string(), m)
                })
                .collect::<BTreeMap<_, _>>(),
            warnings: Vec::new(),
        }
    }

    #[test]
    fn test_sort_key() {
        assert_eq!(sort_key("Ada Lovelace"), "Lovelace");
        assert_eq!(sort_key("Plato"), "Plato");
        assert_eq!(sort_key("~ ~Instructor~ ~ Grace Hopper"), "~Instructor~");
        assert_eq!(sort_key(""), "");
    }

    #[test]
    fn test_rows_sorted_by_second_token() {
        let roster = Roster::build(
            &[
                record("1", "Grace Hopper"),
                record("2", "Alan Turing"),
                record("3", "Ada Lovelace"),
                record("4", "Charles Babbage"),
            ],
            "1",
            true,
        )
        .unwrap();

        let report = ResultAssembler::assemble(metrics(&["1", "2", "3", "4"]), &roster);

        let names: Vec<&str> = report.rows.iter().map(|r| r.participant.as_str()).collect();
        assert_eq!(
            names,
            vec![
                "Charles Babbage",
                "Ada Lovelace",
                "Alan Turing",
                "~ ~Instructor~ ~ Grace Hopper",
            ]
        );
    }

    #[test]
    fn test_ties_break_on_full_name() {
        let roster = Roster::build(
            &[
                record("1", "Grace Hopper"),
                record("2", "Zed Smith"),
                record("3", "Amy Smith"),
            ],
            "1",
            true,
        )
        .unwrap();

        let report = ResultAssembler::assemble(metrics(&["1", "2", "3"]), &roster);
        assert_eq!(report.rows[0].participant, "Amy Smith");
        assert_eq!(report.rows[1].participant, "Zed Smith");
    }

    #[test]
    fn test_table_is_header_first() {
        let roster =
            Roster::build(&[record("1", "Grace Hopper"), record("2", "Alan Turing")], "1", true)
                .unwrap();

        let report = ResultAssembler::assemble(metrics(&["1", "2"]), &roster);
        let table = report.to_table();

        assert_eq!(table.len(), 3);
        assert_eq!(table[0], HEADERS.iter().map(|h| h.to_string()).collect::<Vec<_>>());
        assert_eq!(table[1][0], "Alan Turing");
        assert_eq!(table[1][1], "100");
        assert_eq!(table[1][2], "0.5");
        assert_eq!(table[2][1], "");
        assert!(table.iter().all(|row| row.len() == HEADERS.len()));
    }
}
