//! Integration tests for the contact lifecycle.
//!
//! Roster persistence and nudge evaluation working together: add, get
//! nudged, log an outreach, lapse, archive.

use chrono::{DateTime, Duration, TimeZone, Utc};
use upkeep_core::nudge::{self, Urgency};
use upkeep_core::storage::ContactRepository;
use upkeep_core::{Contact, Database, Tier, ValidationError};

fn now() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2026, 3, 1, 12, 0, 0).unwrap()
}

fn contacted(mut contact: Contact, days_ago: i64) -> Contact {
    contact.last_contact_at = Some(now() - Duration::days(days_ago));
    contact
}

#[test]
fn test_roster_to_nudges_to_logging_flow() {
    let dir = tempfile::tempdir().unwrap();
    let db = Database::open_at(dir.path().join("upkeep.db")).unwrap();

    // Mara: weekly cadence, 20 days quiet. Deeply overdue.
    let mara = contacted(Contact::new("Mara", Tier::InnerCircle), 20);
    // Sam: monthly cadence, 25 days quiet. Approaching but not overdue.
    let sam = contacted(Contact::new("Sam", Tier::KeepWarm), 25);
    // Ines: contacted two days ago. Should not be nudged at all.
    let ines = contacted(Contact::new("Ines", Tier::CloseFriend), 2);
    for contact in [&mara, &sam, &ines] {
        db.contacts().upsert(contact).unwrap();
    }

    let roster = db.contacts().list_active().unwrap();
    assert_eq!(roster.len(), 3);

    let nudges = nudge::evaluate(&roster, now()).unwrap();
    assert_eq!(nudges.len(), 2);
    assert_eq!(nudges[0].contact.name, "Mara");
    assert_eq!(nudges[0].urgency, Urgency::High);
    assert_eq!(nudges[0].days_overdue, 13);
    assert_eq!(nudges[1].contact.name, "Sam");
    assert_eq!(nudges[1].urgency, Urgency::Low);

    // The panel only surfaces the most overdue.
    let panel = nudge::top_nudges(&roster, now(), 1).unwrap();
    assert_eq!(panel.len(), 1);
    assert_eq!(panel[0].contact.name, "Mara");

    // Logging an outreach resets Mara's clock and drops her nudge.
    db.contacts().log_contact(mara.id, now()).unwrap();
    let roster = db.contacts().list_active().unwrap();
    let nudges = nudge::evaluate(&roster, now()).unwrap();
    assert_eq!(nudges.len(), 1);
    assert_eq!(nudges[0].contact.name, "Sam");
}

#[test]
fn test_archive_requires_a_deep_lapse() {
    let dir = tempfile::tempdir().unwrap();
    let db = Database::open_at(dir.path().join("upkeep.db")).unwrap();

    // 13 days overdue on a weekly cadence is not enough (needs > 14).
    let mara = contacted(Contact::new("Mara", Tier::InnerCircle), 20);
    db.contacts().upsert(&mara).unwrap();
    let err = nudge::ensure_archive_eligible(&mara, now()).unwrap_err();
    assert!(matches!(
        err,
        ValidationError::NotArchiveEligible {
            days_overdue: 13,
            required: 14,
            ..
        }
    ));

    // 33 days overdue on a weekly cadence unlocks the archive.
    let ghost = contacted(Contact::new("Ghost", Tier::InnerCircle), 40);
    db.contacts().upsert(&ghost).unwrap();
    nudge::ensure_archive_eligible(&ghost, now()).unwrap();
    db.contacts().archive(ghost.id, now()).unwrap();

    // Archived contacts leave the active roster and the nudge pool.
    let roster = db.contacts().list_active().unwrap();
    assert_eq!(roster.len(), 1);
    assert_eq!(roster[0].name, "Mara");
    let everyone = db.contacts().list_all().unwrap();
    assert_eq!(everyone.len(), 2);

    let nudges = nudge::evaluate(&everyone, now()).unwrap();
    assert!(nudges.iter().all(|n| n.contact.name != "Ghost"));
}

#[test]
fn test_never_contacted_is_always_urgent() {
    let dir = tempfile::tempdir().unwrap();
    let db = Database::open_at(dir.path().join("upkeep.db")).unwrap();

    let fresh = Contact::new("Brand New", Tier::KeepWarm);
    db.contacts().upsert(&fresh).unwrap();

    let roster = db.contacts().list_active().unwrap();
    let nudges = nudge::evaluate(&roster, now()).unwrap();
    assert_eq!(nudges.len(), 1);
    assert_eq!(nudges[0].urgency, Urgency::High);
    assert_eq!(nudges[0].days_since_contact, 999);
}

#[test]
fn test_roster_survives_reopen() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("upkeep.db");

    let mara = contacted(Contact::new("Mara", Tier::InnerCircle), 20);
    {
        let db = Database::open_at(&path).unwrap();
        db.contacts().upsert(&mara).unwrap();
    }

    let db = Database::open_at(&path).unwrap();
    let loaded = db.contacts().fetch(mara.id).unwrap().unwrap();
    assert_eq!(loaded.name, "Mara");
    assert_eq!(loaded.last_contact_at, mara.last_contact_at);
    assert_eq!(loaded.tier, Tier::InnerCircle);
}
