//! Contact roster commands.

use chrono::Utc;
use clap::Subcommand;
use upkeep_core::{nudge, Assistant, Config, Contact, ContactRepository, Database, Tier};
use uuid::Uuid;

#[derive(Subcommand)]
pub enum ContactAction {
    /// Add a contact to the roster
    Add {
        /// Contact name
        name: String,
        /// Relationship tier: inner_circle, close_friend or keep_warm
        #[arg(long, default_value = "close_friend")]
        tier: String,
        /// Desired days between contacts (defaults to the tier's cadence)
        #[arg(long)]
        frequency_days: Option<u32>,
        /// Preferred contact method, e.g. "Text" or "Call"
        #[arg(long)]
        method: Option<String>,
        /// Free-form notes
        #[arg(long)]
        notes: Option<String>,
    },
    /// List contacts
    List {
        /// Include archived contacts
        #[arg(long)]
        all: bool,
    },
    /// Get contact details
    Get {
        /// Contact name or id
        contact: String,
    },
    /// Record an outreach that just happened
    Log {
        /// Contact name or id
        contact: String,
    },
    /// Archive a contact whose cadence has deeply lapsed
    Archive {
        /// Contact name or id
        contact: String,
    },
    /// Show the most overdue contacts
    Nudges {
        /// How many to show (defaults to the configured panel size)
        #[arg(long)]
        limit: Option<usize>,
    },
    /// Ask the assistant how to reach out to a contact
    Suggest {
        /// Contact name or id
        contact: String,
    },
}

pub fn run(action: ContactAction) -> Result<(), Box<dyn std::error::Error>> {
    let db = Database::open()?;

    match action {
        ContactAction::Add {
            name,
            tier,
            frequency_days,
            method,
            notes,
        } => {
            let tier: Tier = tier.parse()?;
            let mut contact = Contact::new(name, tier);
            if let Some(days) = frequency_days {
                contact.contact_frequency_days = days;
            }
            if let Some(method) = method {
                contact.contact_method = method;
            }
            contact.notes = notes;
            contact.validate()?;
            db.contacts().upsert(&contact)?;
            println!("Contact added: {}", contact.id);
            println!("{}", serde_json::to_string_pretty(&contact)?);
        }
        ContactAction::List { all } => {
            let contacts = if all {
                db.contacts().list_all()?
            } else {
                db.contacts().list_active()?
            };
            println!("{}", serde_json::to_string_pretty(&contacts)?);
        }
        ContactAction::Get { contact } => {
            let found = resolve(&db, &contact)?;
            println!("{}", serde_json::to_string_pretty(&found)?);
        }
        ContactAction::Log { contact } => {
            let found = resolve(&db, &contact)?;
            let updated = db.contacts().log_contact(found.id, Utc::now())?;
            println!("Contact logged: {}", updated.name);
            println!("{}", serde_json::to_string_pretty(&updated)?);
        }
        ContactAction::Archive { contact } => {
            let found = resolve(&db, &contact)?;
            nudge::ensure_archive_eligible(&found, Utc::now())?;
            let archived = db.contacts().archive(found.id, Utc::now())?;
            println!("Contact archived: {}", archived.name);
        }
        ContactAction::Nudges { limit } => {
            let config = Config::load_or_default();
            let limit = limit.unwrap_or(config.nudges.panel_limit);
            let contacts = db.contacts().list_active()?;
            let nudges = nudge::top_nudges(&contacts, Utc::now(), limit)?;
            println!("{}", serde_json::to_string_pretty(&nudges)?);
        }
        ContactAction::Suggest { contact } => {
            let found = resolve(&db, &contact)?;
            let config = Config::load_or_default();
            let days = nudge::days_since_contact(&found, Utc::now());
            let assistant = super::feed::build_assistant(&config)?;
            let runtime = tokio::runtime::Runtime::new()?;
            let suggestion = runtime.block_on(assistant.outreach_suggestion(&found, days))?;
            println!("{suggestion}");
        }
    }
    Ok(())
}

/// Look a contact up by UUID when the argument parses as one, by
/// case-insensitive name otherwise.
pub(crate) fn resolve(db: &Database, key: &str) -> Result<Contact, Box<dyn std::error::Error>> {
    let found = match Uuid::parse_str(key) {
        Ok(id) => db.contacts().fetch(id)?,
        Err(_) => db.contacts().fetch_by_name(key)?,
    };
    found.ok_or_else(|| format!("Contact not found: {key}").into())
}
