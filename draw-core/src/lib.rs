//! Secret gift draw: roster validation, the constrained derangement solver
//! and plain-text notices for the result.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;

pub mod notice;
pub mod roster;
pub mod solver;

pub use notice::{admin_notice, build_notices, participant_notice, DrawMeta, Notice, NoticeKind};
pub use roster::{
    normalize_email, validate_exclusions, validate_participants, ExclusionInput, ParticipantInput,
    Roster, RosterError, MIN_PARTICIPANTS,
};
pub use solver::{
    build_options, draw, solve, solve_with, verify_assignment, AssignmentViolation, OptionTable,
    SolveError, SolverConfig, DEFAULT_MAX_ATTEMPTS,
};

/// Normalized email address; the only identity used inside a draw.
pub type Email = String;

/// Giver to receiver. A successful draw is a bijection on the roster.
pub type Assignment = HashMap<Email, Email>;

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Participant {
    pub name: String,
    pub email: Email,
    #[serde(default)]
    pub is_admin: bool,
}

/// `giver` must not be assigned to gift `receiver`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Hash)]
pub struct Exclusion {
    #[serde(rename = "from")]
    pub giver: Email,
    #[serde(rename = "to")]
    pub receiver: Email,
}

impl Exclusion {
    pub fn new(giver: impl Into<Email>, receiver: impl Into<Email>) -> Self {
        Self {
            giver: giver.into(),
            receiver: receiver.into(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct AssignmentRow {
    pub giver_name: String,
    pub giver_email: Email,
    pub receiver_name: String,
    pub receiver_email: Email,
}

/// Flattens an assignment into named rows, in roster order.
///
/// Givers missing from the assignment are skipped; unknown receivers fall
/// back to their email as the display name.
pub fn assignment_rows(assignment: &Assignment, participants: &[Participant]) -> Vec<AssignmentRow> {
    let by_email: HashMap<&str, &Participant> =
        participants.iter().map(|p| (p.email.as_str(), p)).collect();

    participants
        .iter()
        .filter_map(|giver| {
            let receiver_email = assignment.get(&giver.email)?;
            let receiver_name = by_email
                .get(receiver_email.as_str())
                .map(|p| p.name.clone())
                .unwrap_or_else(|| receiver_email.clone());
            Some(AssignmentRow {
                giver_name: giver.name.clone(),
                giver_email: giver.email.clone(),
                receiver_name,
                receiver_email: receiver_email.clone(),
            })
        })
        .collect()
}
