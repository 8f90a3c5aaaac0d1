//! Participant roster
//!
//! Resolves raw event ids to participants. Both id spaces (internal ids and the
//! chat log's alternate ids) map onto one canonical participant, so a student
//! who was dropped and logged back in under a new id is counted once.

use crate::error::EngineError;
use crate::types::{ParticipantId, ParticipantRecord};
use std::collections::HashMap;

/// Label prepended to the instructor's display name in reports
pub const INSTRUCTOR_LABEL: &str = "~ ~Instructor~ ~ ";

/// A resolved participant
#[derive(Debug, Clone, PartialEq)]
pub struct Participant {
    /// Canonical internal id (the first id seen for this person)
    pub id: ParticipantId,
    pub display_name: String,
    pub is_instructor: bool,
}

impl Participant {
    /// Name as shown in reports
    pub fn label(&self) -> String {
        if self.is_instructor {
            format!("{INSTRUCTOR_LABEL}{}", self.display_name)
        } else {
            self.display_name.clone()
        }
    }
}

/// All participants of a session with lookups for both id spaces
#[derive(Debug, Clone)]
pub struct Roster {
    participants: Vec<Participant>,
    by_id: HashMap<String, usize>,
    by_alt_id: HashMap<String, usize>,
    instructor: usize,
}

impl Roster {
    /// Build a roster from identity records.
    ///
    /// When a record id repeats, the first record wins. With `merge_relogins`,
    /// records whose cleaned display names match fold onto the first of them.
    pub fn build(
        records: &[ParticipantRecord],
        instructor_id: &str,
        merge_relogins: bool,
    ) -> Result<Self, EngineError> {
        let mut participants: Vec<Participant> = Vec::new();
        let mut by_id = HashMap::new();
        let mut by_alt_id = HashMap::new();
        let mut by_name: HashMap<String, usize> = HashMap::new();

        for record in records {
            if by_id.contains_key(&record.id) {
                continue;
            }

            let mut display_name = clean_display_name(&record.display_name);
            if display_name.is_empty() {
                display_name = record.id.clone();
            }

            let existing = if merge_relogins {
                by_name.get(&display_name).copied()
            } else {
                None
            };

            let index = match existing {
                Some(index) => {
                    tracing::debug!(
                        id = %record.id,
                        canonical = %participants[index].id,
                        "folding re-login onto existing participant"
                    );
                    index
                }
                None => {
                    participants.push(Participant {
                        id: record.id.clone(),
                        display_name: display_name.clone(),
                        is_instructor: false,
                    });
                    let index = participants.len() - 1;
                    by_name.entry(display_name).or_insert(index);
                    index
                }
            };

            by_id.insert(record.id.clone(), index);
            if let Some(alt_id) = &record.alt_id {
                by_alt_id.entry(alt_id.clone()).or_insert(index);
            }
        }

        let instructor = *by_id.get(instructor_id).ok_or_else(|| {
            EngineError::IdentityResolution(format!(
                "instructor id {instructor_id} is not a known participant"
            ))
        })?;
        participants[instructor].is_instructor = true;

        Ok(Self {
            participants,
            by_id,
            by_alt_id,
            instructor,
        })
    }

    /// Resolve an internal id (camera and microphone events)
    pub fn resolve(&self, id: &str) -> Option<&Participant> {
        self.by_id.get(id).map(|&i| &self.participants[i])
    }

    /// Resolve a chat sender: alternate id first, then internal id
    pub fn resolve_chat(&self, id: &str) -> Option<&Participant> {
        self.by_alt_id
            .get(id)
            .or_else(|| self.by_id.get(id))
            .map(|&i| &self.participants[i])
    }

    pub fn instructor(&self) -> &Participant {
        &self.participants[self.instructor]
    }

    /// Canonical participants in record order
    pub fn participants(&self) -> &[Participant] {
        &self.participants
    }

    /// Canonical ids in record order
    pub fn ids(&self) -> Vec<ParticipantId> {
        self.participants.iter().map(|p| p.id.clone()).collect()
    }

    /// Report label for a canonical id
    pub fn label(&self, id: &str) -> Option<String> {
        self.resolve(id).map(Participant::label)
    }
}

/// Strip digits added by repeated logins and normalize whitespace.
///
/// `"Ada  Lovelace2 "` becomes `"Ada Lovelace"`.
pub fn clean_display_name(raw: &str) -> String {
    let without_digits: String = raw.chars().filter(|c| !c.is_ascii_digit()).collect();
    without_digits.split_whitespace().collect::<Vec<_>>().join(" ")
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn record(id: &str, alt_id: Option<&str>, name: &str) -> ParticipantRecord {
        ParticipantRecord {
            id: id.to_string(),
            alt_id: alt_id.map(str::to_string),
            display_name: name.to_string(),
        }
    }

    #[test]
    fn test_clean_display_name() {
        assert_eq!(clean_display_name("Ada  Lovelace2 "), "Ada Lovelace");
        assert_eq!(clean_display_name(" Alan 3 Turing"), "Alan Turing");
        assert_eq!(clean_display_name("42"), "");
    }

    #[test]
    fn test_instructor_is_flagged() {
        let roster = Roster::build(
            &[record("1", Some("p1"), "Grace Hopper"), record("2", None, "Alan Turing")],
            "1",
            true,
        )
        .unwrap();

        assert!(roster.instructor().is_instructor);
        assert_eq!(roster.instructor().id, "1");
        assert_eq!(roster.label("1").unwrap(), "~ ~Instructor~ ~ Grace Hopper");
        assert_eq!(roster.label("2").unwrap(), "Alan Turing");
    }

    #[test]
    fn test_unknown_instructor_is_fatal() {
        let result = Roster::build(&[record("1", None, "Grace Hopper")], "9", true);
        assert!(matches!(result, Err(EngineError::IdentityResolution(_))));
    }

    #[test]
    fn test_relogin_folds_onto_first_identity() {
        let roster = Roster::build(
            &[
                record("1", Some("p1"), "Grace Hopper"),
                record("2", Some("p2"), "Alan Turing"),
                record("5", Some("p5"), "Alan Turing2"),
            ],
            "1",
            true,
        )
        .unwrap();

        assert_eq!(roster.participants().len(), 2);
        assert_eq!(roster.resolve("5").unwrap().id, "2");
        assert_eq!(roster.resolve_chat("p5").unwrap().id, "2");
        assert_eq!(roster.ids(), vec!["1".to_string(), "2".to_string()]);
    }

    #[test]
    fn test_relogins_stay_separate_when_disabled() {
        let roster = Roster::build(
            &[
                record("1", None, "Grace Hopper"),
                record("2", None, "Alan Turing"),
                record("5", None, "Alan Turing2"),
            ],
            "1",
            false,
        )
        .unwrap();

        assert_eq!(roster.participants().len(), 3);
        assert_eq!(roster.resolve("5").unwrap().id, "5");
        assert_eq!(roster.label("5").unwrap(), "Alan Turing");
    }

    #[test]
    fn test_duplicate_record_keeps_first_name() {
        let roster = Roster::build(
            &[record("1", None, "Grace Hopper"), record("1", None, "Amazing Grace")],
            "1",
            true,
        )
        .unwrap();

        assert_eq!(roster.participants().len(), 1);
        assert_eq!(roster.resolve("1").unwrap().display_name, "Grace Hopper");
    }

    #[test]
    fn test_chat_resolution_falls_back_to_internal_id() {
        let roster = Roster::build(&[record("1", Some("p1"), "Grace Hopper")], "1", true).unwrap();
        assert_eq!(roster.resolve_chat("p1").unwrap().id, "1");
        assert_eq!(roster.resolve_chat("1").unwrap().id, "1");
        assert!(roster.resolve_chat("p9").is_none());
        assert!(roster.resolve("p1").is_none());
    }
}
