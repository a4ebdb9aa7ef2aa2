use serde::{Deserialize, Serialize};
use std::collections::HashMap;

use crate::{AssignmentRow, Exclusion, Participant};

/// Optional details shared with every participant.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct DrawMeta {
    #[serde(default)]
    pub budget: Option<String>,
    #[serde(default)]
    pub deadline: Option<String>,
    #[serde(default)]
    pub note: Option<String>,
}

impl DrawMeta {
    /// Trims every field and drops the blank ones.
    pub fn cleaned(self) -> Self {
        fn clean(value: Option<String>) -> Option<String> {
            value
                .map(|v| v.trim().to_string())
                .filter(|v| !v.is_empty())
        }
        Self {
            budget: clean(self.budget),
            deadline: clean(self.deadline),
            note: clean(self.note),
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum NoticeKind {
    Participant,
    Admin,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Notice {
    pub kind: NoticeKind,
    pub to_name: String,
    pub to_email: String,
    pub subject: String,
    pub body: String,
}

pub fn participant_notice(
    giver: &Participant,
    receiver: &Participant,
    meta: &DrawMeta,
    admin_name: &str,
) -> Notice {
    let subject = match &meta.deadline {
        Some(deadline) => format!("Your gift draw - deliver before {deadline}"),
        None => "Your gift draw".to_string(),
    };

    let mut lines = vec![
        format!("Hi {},", giver.name),
        String::new(),
        format!("You are gifting: {}.", receiver.name),
    ];
    if let Some(budget) = &meta.budget {
        lines.push(format!("Suggested budget: {budget}."));
    }
    if let Some(deadline) = &meta.deadline {
        lines.push(format!("Deadline: {deadline}."));
    }
    if let Some(note) = &meta.note {
        lines.push(String::new());
        lines.push(format!("Message: {note}"));
    }
    lines.push(String::new());
    lines.push(format!("If you need anything, talk to {admin_name}."));

    Notice {
        kind: NoticeKind::Participant,
        to_name: giver.name.clone(),
        to_email: giver.email.clone(),
        subject,
        body: lines.join("\n"),
    }
}

/// The full result, addressed to the administrator.
pub fn admin_notice(
    admin: &Participant,
    rows: &[AssignmentRow],
    exclusions: &[Exclusion],
    participants: &[Participant],
    meta: &DrawMeta,
    code: Option<&str>,
    link: Option<&str>,
) -> Notice {
    let subject = match code {
        Some(code) => format!("Draw results - {code}"),
        None => "Draw results - administrator".to_string(),
    };

    let mut lines = vec!["Complete assignments:".to_string(), String::new()];
    lines.extend(
        rows.iter()
            .map(|row| format!("{} -> {} ({})", row.giver_name, row.receiver_name, row.receiver_email)),
    );
    if let Some(budget) = &meta.budget {
        lines.push(format!("Budget: {budget}"));
    }
    if let Some(deadline) = &meta.deadline {
        lines.push(format!("Deadline: {deadline}"));
    }
    if let Some(note) = &meta.note {
        lines.push(format!("Message: {note}"));
    }

    let names: HashMap<&str, &str> = participants
        .iter()
        .map(|p| (p.email.as_str(), p.name.as_str()))
        .collect();
    let excluded: Vec<String> = exclusions
        .iter()
        .filter_map(|e| {
            let giver = names.get(e.giver.as_str())?;
            let receiver = names.get(e.receiver.as_str())?;
            Some(format!("- {giver} does not gift {receiver}"))
        })
        .collect();
    if !excluded.is_empty() {
        lines.push(String::new());
        lines.push("Exclusions:".to_string());
        lines.extend(excluded);
    }

    if let Some(link) = link {
        lines.push(String::new());
        lines.push(format!("View draw: {link}"));
    }

    Notice {
        kind: NoticeKind::Admin,
        to_name: admin.name.clone(),
        to_email: admin.email.clone(),
        subject,
        body: lines.join("\n"),
    }
}

/// One notice per giver in roster order, then the admin summary.
///
/// Givers without a row in `rows` get no notice. Returns an empty list when
/// the roster has no admin.
pub fn build_notices(
    participants: &[Participant],
    rows: &[AssignmentRow],
    exclusions: &[Exclusion],
    meta: &DrawMeta,
    code: Option<&str>,
    link: Option<&str>,
) -> Vec<Notice> {
    let Some(admin) = participants.iter().find(|p| p.is_admin) else {
        return Vec::new();
    };
    let by_email: HashMap<&str, &Participant> =
        participants.iter().map(|p| (p.email.as_str(), p)).collect();

    let mut notices: Vec<Notice> = rows
        .iter()
        .filter_map(|row| {
            let giver = by_email.get(row.giver_email.as_str())?;
            let receiver = by_email.get(row.receiver_email.as_str())?;
            Some(participant_notice(giver, receiver, meta, &admin.name))
        })
        .collect();
    notices.push(admin_notice(
        admin,
        rows,
        exclusions,
        participants,
        meta,
        code,
        link,
    ));
    notices
}
