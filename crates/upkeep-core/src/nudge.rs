//! Contact urgency engine.
//!
//! Pure computation over already-loaded contacts: no I/O, no retries.
//! Given the roster and a clock, it decides who needs attention, how
//! urgently, and what to suggest. Nudges are projections recomputed on
//! every pass, never stored.

use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::contact::Contact;
use crate::error::ValidationError;

/// Floor for the "never contacted" sentinel gap.
pub const NEVER_CONTACTED_FLOOR_DAYS: i64 = 999;
/// A contact surfaces once this fraction of its cadence has elapsed.
pub const APPROACHING_RATIO: f64 = 0.7;
/// Default size of the reminder panel.
pub const DEFAULT_PANEL_LIMIT: usize = 3;
/// Archive unlocks once a contact is overdue by this many full cycles.
pub const ARCHIVE_OVERDUE_MULTIPLIER: i64 = 2;

/// How urgently a contact needs outreach.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Urgency {
    Low,
    Medium,
    High,
}

impl Urgency {
    pub fn as_str(&self) -> &'static str {
        match self {
            Urgency::Low => "low",
            Urgency::Medium => "medium",
            Urgency::High => "high",
        }
    }
}

/// Conceptual lifecycle position of a contact. Not persisted; derived
/// from the same numbers as the urgency.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ContactHealth {
    Healthy,
    Approaching,
    Overdue,
    EligibleForArchive,
}

impl ContactHealth {
    pub fn as_str(&self) -> &'static str {
        match self {
            ContactHealth::Healthy => "healthy",
            ContactHealth::Approaching => "approaching",
            ContactHealth::Overdue => "overdue",
            ContactHealth::EligibleForArchive => "eligible_for_archive",
        }
    }
}

/// A reminder that a contact is due (or overdue) for outreach.
#[derive(Debug, Clone, Serialize)]
pub struct Nudge {
    pub contact: Contact,
    pub days_since_contact: i64,
    /// Days past the desired cadence. Negative while still inside it.
    pub days_overdue: i64,
    pub urgency: Urgency,
    pub suggested_action: String,
}

impl Nudge {
    pub fn health(&self) -> ContactHealth {
        contact_health(self.days_since_contact, self.contact.contact_frequency_days)
    }
}

/// Whole days since the last logged contact, or the never-contacted
/// sentinel.
pub fn days_since_contact(contact: &Contact, now: DateTime<Utc>) -> i64 {
    match contact.last_contact_at {
        Some(last) => (now - last).num_days(),
        None => never_contacted_days(contact.contact_frequency_days),
    }
}

/// Sentinel gap for contacts never reached out to. 999 covers every
/// realistic cadence; the max() term keeps the invariant "never contacted
/// is always high urgency" even for absurdly long cadences.
fn never_contacted_days(frequency_days: u32) -> i64 {
    NEVER_CONTACTED_FLOOR_DAYS.max(2 * i64::from(frequency_days) + 1)
}

/// Urgency as a total function of the overdue gap and the cadence.
pub fn classify_urgency(days_overdue: i64, frequency_days: u32) -> Urgency {
    let freq = i64::from(frequency_days);
    if days_overdue > freq {
        Urgency::High
    } else if days_overdue > 0 {
        Urgency::Medium
    } else {
        Urgency::Low
    }
}

/// Suggested outreach action from the preferred contact method.
/// "call" wins over "text" so "Text or Call" suggests the richer option.
pub fn suggested_action(contact_method: &str) -> String {
    let method = contact_method.to_lowercase();
    if method.contains("call") {
        "Give them a quick call".to_string()
    } else if method.contains("text") {
        "Send a quick text".to_string()
    } else {
        "Reach out and say hi".to_string()
    }
}

/// Lifecycle state from the same inputs as the urgency tier.
pub fn contact_health(days_since: i64, frequency_days: u32) -> ContactHealth {
    let freq = i64::from(frequency_days);
    let overdue = days_since - freq;
    if overdue > ARCHIVE_OVERDUE_MULTIPLIER * freq {
        ContactHealth::EligibleForArchive
    } else if overdue > 0 {
        ContactHealth::Overdue
    } else if days_since as f64 >= APPROACHING_RATIO * f64::from(frequency_days) {
        ContactHealth::Approaching
    } else {
        ContactHealth::Healthy
    }
}

/// Evaluate the roster into nudges, most overdue first.
///
/// Archived contacts are skipped. Contacts still inside 70% of their
/// cadence are excluded. A zero cadence fails fast rather than producing
/// nonsense urgency.
pub fn evaluate(contacts: &[Contact], now: DateTime<Utc>) -> Result<Vec<Nudge>, ValidationError> {
    let mut nudges = Vec::new();
    for contact in contacts {
        if contact.is_archived() {
            continue;
        }
        if contact.contact_frequency_days == 0 {
            return Err(ValidationError::NonPositiveFrequency);
        }
        let days_since = days_since_contact(contact, now);
        if (days_since as f64) < APPROACHING_RATIO * f64::from(contact.contact_frequency_days) {
            continue;
        }
        let days_overdue = days_since - i64::from(contact.contact_frequency_days);
        nudges.push(Nudge {
            days_since_contact: days_since,
            days_overdue,
            urgency: classify_urgency(days_overdue, contact.contact_frequency_days),
            suggested_action: suggested_action(&contact.contact_method),
            contact: contact.clone(),
        });
    }
    nudges.sort_by(|a, b| b.days_overdue.cmp(&a.days_overdue));
    Ok(nudges)
}

/// The reminder panel view: `evaluate` truncated to `limit`.
pub fn top_nudges(
    contacts: &[Contact],
    now: DateTime<Utc>,
    limit: usize,
) -> Result<Vec<Nudge>, ValidationError> {
    let mut nudges = evaluate(contacts, now)?;
    nudges.truncate(limit);
    Ok(nudges)
}

/// Whether the archive action is unlocked for this contact.
pub fn archive_eligible(contact: &Contact, now: DateTime<Utc>) -> bool {
    if contact.is_archived() || contact.contact_frequency_days == 0 {
        return false;
    }
    let freq = i64::from(contact.contact_frequency_days);
    days_since_contact(contact, now) - freq > ARCHIVE_OVERDUE_MULTIPLIER * freq
}

/// Guard for the archive command: error unless the contact has lapsed
/// past the archive threshold.
pub fn ensure_archive_eligible(contact: &Contact, now: DateTime<Utc>) -> Result<(), ValidationError> {
    if archive_eligible(contact, now) {
        return Ok(());
    }
    let freq = i64::from(contact.contact_frequency_days);
    Err(ValidationError::NotArchiveEligible {
        name: contact.name.clone(),
        days_overdue: days_since_contact(contact, now) - freq,
        required: ARCHIVE_OVERDUE_MULTIPLIER * freq,
    })
}
