use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use thiserror::Error;

use crate::{Email, Exclusion, Participant};

pub const MIN_PARTICIPANTS: usize = 3;

/// A participant as submitted, before validation.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct ParticipantInput {
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub is_admin: bool,
}

/// An exclusion as submitted, before validation.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct ExclusionInput {
    #[serde(default)]
    pub from: Option<String>,
    #[serde(default)]
    pub to: Option<String>,
}

#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum RosterError {
    #[error("every participant needs a name")]
    MissingName,
    #[error("invalid email for {name}")]
    InvalidEmail { name: String },
    #[error("duplicate email: {email}")]
    DuplicateEmail { email: Email },
    #[error("at least {min} participants are required, got {found}")]
    TooFewParticipants { min: usize, found: usize },
    #[error("exactly one administrator is required, got {found}")]
    AdminCount { found: usize },
    #[error("exclusions must reference participants of the draw")]
    UnknownExclusionParticipant,
}

pub fn normalize_email(value: &str) -> Email {
    value.trim().to_lowercase()
}

fn looks_like_email(email: &str) -> bool {
    email.contains('@') && email.contains('.')
}

pub fn validate_participants(raw: &[ParticipantInput]) -> Result<Vec<Participant>, RosterError> {
    let mut participants = Vec::with_capacity(raw.len());
    let mut seen: HashSet<Email> = HashSet::new();
    let mut admins = 0;

    for item in raw {
        let name = item.name.as_deref().unwrap_or("").trim();
        if name.is_empty() {
            return Err(RosterError::MissingName);
        }
        let email = normalize_email(item.email.as_deref().unwrap_or(""));
        if !looks_like_email(&email) {
            return Err(RosterError::InvalidEmail {
                name: name.to_string(),
            });
        }
        if !seen.insert(email.clone()) {
            return Err(RosterError::DuplicateEmail { email });
        }

        if item.is_admin {
            admins += 1;
        }
        participants.push(Participant {
            name: name.to_string(),
            email,
            is_admin: item.is_admin,
        });
    }

    if participants.len() < MIN_PARTICIPANTS {
        return Err(RosterError::TooFewParticipants {
            min: MIN_PARTICIPANTS,
            found: participants.len(),
        });
    }
    if admins != 1 {
        return Err(RosterError::AdminCount { found: admins });
    }

    Ok(participants)
}

/// Normalizes exclusions against a validated roster.
///
/// Entries with a blank side are skipped, self-pairs are dropped (they are
/// always forbidden anyway) and repeated pairs collapse into one.
pub fn validate_exclusions(
    raw: &[ExclusionInput],
    participants: &[Participant],
) -> Result<Vec<Exclusion>, RosterError> {
    let allowed: HashSet<&str> = participants.iter().map(|p| p.email.as_str()).collect();
    let mut seen: HashSet<Exclusion> = HashSet::new();
    let mut exclusions = Vec::new();

    for item in raw {
        let giver = normalize_email(item.from.as_deref().unwrap_or(""));
        let receiver = normalize_email(item.to.as_deref().unwrap_or(""));
        if giver.is_empty() || receiver.is_empty() {
            continue;
        }
        if !allowed.contains(giver.as_str()) || !allowed.contains(receiver.as_str()) {
            return Err(RosterError::UnknownExclusionParticipant);
        }
        if giver == receiver {
            continue;
        }
        let exclusion = Exclusion::new(giver, receiver);
        if seen.insert(exclusion.clone()) {
            exclusions.push(exclusion);
        }
    }

    Ok(exclusions)
}

/// A validated draw input: participants plus the exclusions between them.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Roster {
    participants: Vec<Participant>,
    exclusions: Vec<Exclusion>,
}

impl Roster {
    pub fn validate(
        participants: &[ParticipantInput],
        exclusions: &[ExclusionInput],
    ) -> Result<Self, RosterError> {
        let participants = validate_participants(participants)?;
        let exclusions = validate_exclusions(exclusions, &participants)?;
        Ok(Self {
            participants,
            exclusions,
        })
    }

    pub fn exclusions(&self) -> &[Exclusion] {
        &self.exclusions
    }

    pub fn emails(&self) -> Vec<Email> {
        self.participants.iter().map(|p| p.email.clone()).collect()
    }

    pub fn into_parts(self) -> (Vec<Participant>, Vec<Exclusion>) {
        (self.participants, self.exclusions)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn input(name: &str, email: &str, is_admin: bool) -> ParticipantInput {
        ParticipantInput {
            name: Some(name.to_string()),
            email: Some(email.to_string()),
            is_admin,
        }
    }

    fn pair(from: &str, to: &str) -> ExclusionInput {
        ExclusionInput {
            from: Some(from.to_string()),
            to: Some(to.to_string()),
        }
    }

    fn trio() -> Vec<ParticipantInput> {
        vec![
            input("Ana", " Ana@Example.com ", true),
            input("Bruno", "bruno@example.com", false),
            input("Carla", "carla@example.com", false),
        ]
    }

    #[test]
    fn participants_are_trimmed_and_normalized() {
        let mut raw = trio();
        raw[1].name = Some("  Bruno ".into());
        let participants = validate_participants(&raw).unwrap();

        assert_eq!(participants[0].email, "ana@example.com");
        assert!(participants[0].is_admin);
        assert_eq!(participants[1].name, "Bruno");
    }

    #[test]
    fn rejects_bad_participants() {
        let mut raw = trio();
        raw[2].name = Some("   ".into());
        assert_eq!(validate_participants(&raw), Err(RosterError::MissingName));

        let mut raw = trio();
        raw[2].email = Some("carla-at-example".into());
        assert_eq!(
            validate_participants(&raw),
            Err(RosterError::InvalidEmail {
                name: "Carla".into()
            })
        );

        let mut raw = trio();
        raw[2].email = Some("BRUNO@example.com".into());
        assert_eq!(
            validate_participants(&raw),
            Err(RosterError::DuplicateEmail {
                email: "bruno@example.com".into()
            })
        );

        let raw = trio()[..2].to_vec();
        assert_eq!(
            validate_participants(&raw),
            Err(RosterError::TooFewParticipants { min: 3, found: 2 })
        );

        let mut raw = trio();
        raw[1].is_admin = true;
        assert_eq!(
            validate_participants(&raw),
            Err(RosterError::AdminCount { found: 2 })
        );

        let mut raw = trio();
        raw[0].is_admin = false;
        assert_eq!(
            validate_participants(&raw),
            Err(RosterError::AdminCount { found: 0 })
        );
    }

    #[test]
    fn exclusions_drop_blanks_self_pairs_and_repeats() {
        let participants = validate_participants(&trio()).unwrap();
        let raw = vec![
            pair("ANA@example.com", "bruno@example.com"),
            pair("ana@example.com", " bruno@example.com"),
            pair("carla@example.com", "carla@example.com"),
            ExclusionInput {
                from: Some("bruno@example.com".into()),
                to: None,
            },
        ];

        let exclusions = validate_exclusions(&raw, &participants).unwrap();
        assert_eq!(
            exclusions,
            vec![Exclusion::new("ana@example.com", "bruno@example.com")]
        );
    }

    #[test]
    fn exclusions_must_name_participants() {
        let participants = validate_participants(&trio()).unwrap();
        let raw = vec![pair("ana@example.com", "dora@example.com")];
        assert_eq!(
            validate_exclusions(&raw, &participants),
            Err(RosterError::UnknownExclusionParticipant)
        );
    }

    #[test]
    fn roster_exposes_emails_and_parts() {
        let roster = Roster::validate(&trio(), &[pair("bruno@example.com", "ana@example.com")])
            .unwrap();

        assert_eq!(
            roster.emails(),
            vec!["ana@example.com", "bruno@example.com", "carla@example.com"]
        );
        assert_eq!(roster.exclusions().len(), 1);

        let (participants, exclusions) = roster.into_parts();
        assert_eq!(participants.iter().filter(|p| p.is_admin).count(), 1);
        assert_eq!(participants[2].name, "Carla");
        assert_eq!(
            exclusions,
            vec![Exclusion::new("bruno@example.com", "ana@example.com")]
        );
    }
}
