//! SQLite-backed contact roster and signal cache.
//!
//! Two tables: `contacts` is the canonical roster, `signals` caches the
//! most recent normalized activity keyed by identity hash so repeated
//! fetches of the same remote event collapse into one row. Timestamps
//! are stored as fixed-precision RFC 3339 text, which keeps lexical
//! ordering identical to chronological ordering.

use std::path::Path;
use std::str::FromStr;

use chrono::{DateTime, SecondsFormat, Utc};
use rusqlite::types::Type;
use rusqlite::{params, Connection, OptionalExtension, Row};
use uuid::Uuid;

use super::data_dir;
use crate::contact::{Contact, PlatformLink, Tier};
use crate::error::DatabaseError;
use crate::signal::{Platform, Signal, SignalKind};

const SCHEMA: &str = "CREATE TABLE IF NOT EXISTS contacts (
        id          TEXT PRIMARY KEY,
        name        TEXT NOT NULL,
        tier        TEXT NOT NULL,
        contact_frequency_days INTEGER NOT NULL,
        contact_method TEXT NOT NULL DEFAULT 'Text',
        last_contact_at TEXT,
        notes       TEXT,
        platforms   TEXT NOT NULL DEFAULT '[]',
        avatar_url  TEXT,
        archived_at TEXT,
        created_at  TEXT NOT NULL
    );

    CREATE TABLE IF NOT EXISTS signals (
        identity_hash TEXT PRIMARY KEY,
        platform    TEXT NOT NULL,
        kind        TEXT NOT NULL,
        source_id   TEXT NOT NULL,
        title       TEXT NOT NULL,
        description TEXT,
        url         TEXT,
        thumbnail_url TEXT,
        is_live     INTEGER NOT NULL DEFAULT 0,
        published_at TEXT NOT NULL,
        metadata    TEXT NOT NULL DEFAULT '{}',
        created_at  TEXT NOT NULL
    );

    -- Create indexes for common query patterns
    CREATE INDEX IF NOT EXISTS idx_contacts_archived_at ON contacts(archived_at);
    CREATE INDEX IF NOT EXISTS idx_signals_published_at ON signals(published_at);
    CREATE INDEX IF NOT EXISTS idx_signals_platform_published_at ON signals(platform, published_at);";

const CONTACT_COLUMNS: &str = "id, name, tier, contact_frequency_days, contact_method, \
     last_contact_at, notes, platforms, avatar_url, archived_at, created_at";

const SIGNAL_COLUMNS: &str = "platform, kind, source_id, title, description, url, \
     thumbnail_url, is_live, published_at, metadata";

/// Read and write access to the contact roster.
pub trait ContactRepository {
    /// Insert or fully update a contact by id.
    fn upsert(&self, contact: &Contact) -> Result<(), DatabaseError>;
    fn fetch(&self, id: Uuid) -> Result<Option<Contact>, DatabaseError>;
    /// Case-insensitive name lookup; oldest match wins on duplicates.
    fn fetch_by_name(&self, name: &str) -> Result<Option<Contact>, DatabaseError>;
    /// All non-archived contacts, sorted by name.
    fn list_active(&self) -> Result<Vec<Contact>, DatabaseError>;
    /// Every contact, archived ones included.
    fn list_all(&self) -> Result<Vec<Contact>, DatabaseError>;
    /// Record an outreach and return the updated contact.
    fn log_contact(&self, id: Uuid, at: DateTime<Utc>) -> Result<Contact, DatabaseError>;
    /// Mark a contact archived. Idempotent; archived stays archived.
    fn archive(&self, id: Uuid, at: DateTime<Utc>) -> Result<Contact, DatabaseError>;
}

/// Read and write access to the signal cache.
pub trait SignalRepository {
    /// Insert a signal or refresh the row with the same identity.
    fn upsert(&self, signal: &Signal) -> Result<(), DatabaseError>;
    /// Upsert a batch inside one transaction.
    fn upsert_all(&self, signals: &[Signal]) -> Result<usize, DatabaseError>;
    /// The newest signals, newest first.
    fn recent(&self, limit: usize) -> Result<Vec<Signal>, DatabaseError>;
    fn by_platform(&self, platform: Platform, limit: usize) -> Result<Vec<Signal>, DatabaseError>;
    /// Drop cached signals published before the cutoff. Returns how many
    /// rows went away.
    fn prune_older_than(&self, cutoff: DateTime<Utc>) -> Result<usize, DatabaseError>;
}

/// SQLite database holding contacts and cached signals.
pub struct Database {
    conn: Connection,
}

impl Database {
    /// Get a reference to the underlying SQLite connection.
    pub fn conn(&self) -> &Connection {
        &self.conn
    }

    /// Open the database at `~/.config/upkeep/upkeep.db`.
    ///
    /// Creates the database file and schema if they don't exist.
    ///
    /// # Errors
    /// Returns an error if the database cannot be opened or migrated.
    pub fn open() -> Result<Self, DatabaseError> {
        let dir = data_dir().map_err(|e| DatabaseError::OpenFailed {
            path: "~/.config/upkeep".to_string(),
            message: e.to_string(),
        })?;
        Self::open_at(dir.join("upkeep.db"))
    }

    /// Open (or create) the database at an explicit path.
    pub fn open_at(path: impl AsRef<Path>) -> Result<Self, DatabaseError> {
        let path = path.as_ref();
        let conn = Connection::open(path).map_err(|e| DatabaseError::OpenFailed {
            path: path.display().to_string(),
            message: e.to_string(),
        })?;
        let db = Self { conn };
        db.migrate()?;
        Ok(db)
    }

    /// Open an in-memory database (for tests).
    pub fn open_memory() -> Result<Self, DatabaseError> {
        let conn = Connection::open_in_memory().map_err(|e| DatabaseError::OpenFailed {
            path: ":memory:".to_string(),
            message: e.to_string(),
        })?;
        let db = Self { conn };
        db.migrate()?;
        Ok(db)
    }

    fn migrate(&self) -> Result<(), DatabaseError> {
        self.conn
            .execute_batch(SCHEMA)
            .map_err(|e| DatabaseError::MigrationFailed(e.to_string()))
    }

    /// Contact roster view of this database.
    pub fn contacts(&self) -> SqliteContacts<'_> {
        SqliteContacts { conn: &self.conn }
    }

    /// Signal cache view of this database.
    pub fn signals(&self) -> SqliteSignals<'_> {
        SqliteSignals { conn: &self.conn }
    }
}

pub struct SqliteContacts<'a> {
    conn: &'a Connection,
}

impl ContactRepository for SqliteContacts<'_> {
    fn upsert(&self, contact: &Contact) -> Result<(), DatabaseError> {
        let platforms = serde_json::to_string(&contact.platforms)
            .map_err(|e| DatabaseError::EncodeFailed(e.to_string()))?;
        self.conn.execute(
            "INSERT INTO contacts (id, name, tier, contact_frequency_days, contact_method,
                                   last_contact_at, notes, platforms, avatar_url, archived_at, created_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11)
             ON CONFLICT(id) DO UPDATE SET
                 name = excluded.name,
                 tier = excluded.tier,
                 contact_frequency_days = excluded.contact_frequency_days,
                 contact_method = excluded.contact_method,
                 last_contact_at = excluded.last_contact_at,
                 notes = excluded.notes,
                 platforms = excluded.platforms,
                 avatar_url = excluded.avatar_url,
                 archived_at = excluded.archived_at",
            params![
                contact.id.to_string(),
                contact.name,
                contact.tier.as_str(),
                contact.contact_frequency_days,
                contact.contact_method,
                contact.last_contact_at.map(encode_time),
                contact.notes,
                platforms,
                contact.avatar_url,
                contact.archived_at.map(encode_time),
                encode_time(contact.created_at),
            ],
        )?;
        Ok(())
    }

    fn fetch(&self, id: Uuid) -> Result<Option<Contact>, DatabaseError> {
        let mut stmt = self.conn.prepare(&format!(
            "SELECT {CONTACT_COLUMNS} FROM contacts WHERE id = ?1"
        ))?;
        Ok(stmt
            .query_row(params![id.to_string()], row_to_contact)
            .optional()?)
    }

    fn fetch_by_name(&self, name: &str) -> Result<Option<Contact>, DatabaseError> {
        let mut stmt = self.conn.prepare(&format!(
            "SELECT {CONTACT_COLUMNS} FROM contacts
             WHERE name = ?1 COLLATE NOCASE
             ORDER BY created_at LIMIT 1"
        ))?;
        Ok(stmt.query_row(params![name], row_to_contact).optional()?)
    }

    fn list_active(&self) -> Result<Vec<Contact>, DatabaseError> {
        let mut stmt = self.conn.prepare(&format!(
            "SELECT {CONTACT_COLUMNS} FROM contacts
             WHERE archived_at IS NULL
             ORDER BY name COLLATE NOCASE"
        ))?;
        let rows = stmt.query_map([], row_to_contact)?;
        Ok(rows.collect::<Result<Vec<_>, _>>()?)
    }

    fn list_all(&self) -> Result<Vec<Contact>, DatabaseError> {
        let mut stmt = self.conn.prepare(&format!(
            "SELECT {CONTACT_COLUMNS} FROM contacts ORDER BY name COLLATE NOCASE"
        ))?;
        let rows = stmt.query_map([], row_to_contact)?;
        Ok(rows.collect::<Result<Vec<_>, _>>()?)
    }

    fn log_contact(&self, id: Uuid, at: DateTime<Utc>) -> Result<Contact, DatabaseError> {
        let updated = self.conn.execute(
            "UPDATE contacts SET last_contact_at = ?2 WHERE id = ?1",
            params![id.to_string(), encode_time(at)],
        )?;
        if updated == 0 {
            return Err(DatabaseError::NotFound {
                entity: "contact",
                id: id.to_string(),
            });
        }
        self.fetch(id)?.ok_or(DatabaseError::NotFound {
            entity: "contact",
            id: id.to_string(),
        })
    }

    fn archive(&self, id: Uuid, at: DateTime<Utc>) -> Result<Contact, DatabaseError> {
        let mut contact = self.fetch(id)?.ok_or(DatabaseError::NotFound {
            entity: "contact",
            id: id.to_string(),
        })?;
        if contact.archived_at.is_none() {
            self.conn.execute(
                "UPDATE contacts SET archived_at = ?2 WHERE id = ?1",
                params![id.to_string(), encode_time(at)],
            )?;
            contact.archived_at = Some(at);
        }
        Ok(contact)
    }
}

pub struct SqliteSignals<'a> {
    conn: &'a Connection,
}

impl SignalRepository for SqliteSignals<'_> {
    fn upsert(&self, signal: &Signal) -> Result<(), DatabaseError> {
        upsert_signal(self.conn, signal)
    }

    fn upsert_all(&self, signals: &[Signal]) -> Result<usize, DatabaseError> {
        let tx = self.conn.unchecked_transaction()?;
        for signal in signals {
            upsert_signal(&tx, signal)?;
        }
        tx.commit()?;
        Ok(signals.len())
    }

    fn recent(&self, limit: usize) -> Result<Vec<Signal>, DatabaseError> {
        let mut stmt = self.conn.prepare(&format!(
            "SELECT {SIGNAL_COLUMNS} FROM signals
             ORDER BY published_at DESC LIMIT ?1"
        ))?;
        let rows = stmt.query_map(params![limit as i64], row_to_signal)?;
        Ok(rows.collect::<Result<Vec<_>, _>>()?)
    }

    fn by_platform(&self, platform: Platform, limit: usize) -> Result<Vec<Signal>, DatabaseError> {
        let mut stmt = self.conn.prepare(&format!(
            "SELECT {SIGNAL_COLUMNS} FROM signals
             WHERE platform = ?1
             ORDER BY published_at DESC LIMIT ?2"
        ))?;
        let rows = stmt.query_map(params![platform.as_str(), limit as i64], row_to_signal)?;
        Ok(rows.collect::<Result<Vec<_>, _>>()?)
    }

    fn prune_older_than(&self, cutoff: DateTime<Utc>) -> Result<usize, DatabaseError> {
        let deleted = self.conn.execute(
            "DELETE FROM signals WHERE published_at < ?1",
            params![encode_time(cutoff)],
        )?;
        Ok(deleted)
    }
}

fn upsert_signal(conn: &Connection, signal: &Signal) -> Result<(), DatabaseError> {
    let metadata = serde_json::to_string(&signal.metadata)
        .map_err(|e| DatabaseError::EncodeFailed(e.to_string()))?;
    conn.execute(
        "INSERT INTO signals (identity_hash, platform, kind, source_id, title, description,
                              url, thumbnail_url, is_live, published_at, metadata, created_at)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12)
         ON CONFLICT(identity_hash) DO UPDATE SET
             kind = excluded.kind,
             title = excluded.title,
             description = excluded.description,
             url = excluded.url,
             thumbnail_url = excluded.thumbnail_url,
             is_live = excluded.is_live,
             published_at = excluded.published_at,
             metadata = excluded.metadata",
        params![
            signal.identity_hash(),
            signal.platform.as_str(),
            signal.kind.as_str(),
            signal.source_id,
            signal.title,
            signal.description,
            signal.url,
            signal.thumbnail_url,
            signal.is_live,
            encode_time(signal.published_at),
            metadata,
            encode_time(Utc::now()),
        ],
    )?;
    Ok(())
}

/// Fixed-precision RFC 3339 so text ordering matches time ordering.
fn encode_time(t: DateTime<Utc>) -> String {
    t.to_rfc3339_opts(SecondsFormat::Millis, true)
}

fn decode_time(idx: usize, raw: String) -> Result<DateTime<Utc>, rusqlite::Error> {
    DateTime::parse_from_rfc3339(&raw)
        .map(|t| t.with_timezone(&Utc))
        .map_err(|e| rusqlite::Error::FromSqlConversionFailure(idx, Type::Text, Box::new(e)))
}

fn row_to_contact(row: &Row<'_>) -> rusqlite::Result<Contact> {
    let id_raw: String = row.get(0)?;
    let id = Uuid::parse_str(&id_raw)
        .map_err(|e| rusqlite::Error::FromSqlConversionFailure(0, Type::Text, Box::new(e)))?;
    let tier_raw: String = row.get(2)?;
    let tier = Tier::from_str(&tier_raw)
        .map_err(|e| rusqlite::Error::FromSqlConversionFailure(2, Type::Text, e.into()))?;
    let last_contact_at = row
        .get::<_, Option<String>>(5)?
        .map(|raw| decode_time(5, raw))
        .transpose()?;
    let platforms_raw: String = row.get(7)?;
    let platforms: Vec<PlatformLink> = serde_json::from_str(&platforms_raw)
        .map_err(|e| rusqlite::Error::FromSqlConversionFailure(7, Type::Text, Box::new(e)))?;
    let archived_at = row
        .get::<_, Option<String>>(9)?
        .map(|raw| decode_time(9, raw))
        .transpose()?;
    let created_at = decode_time(10, row.get(10)?)?;

    Ok(Contact {
        id,
        name: row.get(1)?,
        tier,
        contact_frequency_days: row.get(3)?,
        contact_method: row.get(4)?,
        last_contact_at,
        notes: row.get(6)?,
        platforms,
        avatar_url: row.get(8)?,
        archived_at,
        created_at,
    })
}

fn row_to_signal(row: &Row<'_>) -> rusqlite::Result<Signal> {
    let platform_raw: String = row.get(0)?;
    let platform = Platform::from_str(&platform_raw)
        .map_err(|e| rusqlite::Error::FromSqlConversionFailure(0, Type::Text, e.into()))?;
    let kind_raw: String = row.get(1)?;
    let kind = SignalKind::from_str(&kind_raw)
        .map_err(|e| rusqlite::Error::FromSqlConversionFailure(1, Type::Text, e.into()))?;
    let published_at = decode_time(8, row.get(8)?)?;
    let metadata_raw: String = row.get(9)?;
    let metadata = serde_json::from_str(&metadata_raw)
        .map_err(|e| rusqlite::Error::FromSqlConversionFailure(9, Type::Text, Box::new(e)))?;

    Ok(Signal {
        platform,
        kind,
        source_id: row.get(2)?,
        title: row.get(3)?,
        description: row.get(4)?,
        url: row.get(5)?,
        thumbnail_url: row.get(6)?,
        is_live: row.get(7)?,
        published_at,
        metadata,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::contact::Tier;
    use chrono::{Duration, TimeZone};

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2026, 2, 14, 9, 30, 0).unwrap()
    }

    fn sample_signal(platform: Platform, source_id: &str, minutes_ago: i64) -> Signal {
        let mut metadata = serde_json::Map::new();
        metadata.insert("actor".into(), "octocat".into());
        Signal {
            platform,
            kind: SignalKind::Commit,
            source_id: source_id.to_string(),
            title: format!("{source_id} title"),
            description: Some("desc".to_string()),
            url: Some("https://example.test".to_string()),
            thumbnail_url: None,
            is_live: false,
            published_at: now() - Duration::minutes(minutes_ago),
            metadata,
        }
    }

    #[test]
    fn contact_round_trips_with_all_fields() {
        let db = Database::open_memory().unwrap();
        let mut contact = Contact::new("Bo Kim", Tier::InnerCircle);
        contact.contact_method = "Text or Call".to_string();
        contact.notes = Some("moving to Lisbon in May".to_string());
        contact.last_contact_at = Some(now() - Duration::days(4));
        contact.platforms.push(PlatformLink {
            platform: Platform::Github,
            remote_id: "bokim".to_string(),
        });

        db.contacts().upsert(&contact).unwrap();
        let loaded = db.contacts().fetch(contact.id).unwrap().unwrap();
        assert_eq!(loaded.name, contact.name);
        assert_eq!(loaded.tier, contact.tier);
        assert_eq!(loaded.notes, contact.notes);
        assert_eq!(loaded.platforms, contact.platforms);
        assert_eq!(loaded.last_contact_at, contact.last_contact_at);
        assert!(loaded.archived_at.is_none());
    }

    #[test]
    fn upsert_updates_in_place() {
        let db = Database::open_memory().unwrap();
        let mut contact = Contact::new("Sam", Tier::KeepWarm);
        db.contacts().upsert(&contact).unwrap();

        contact.contact_frequency_days = 10;
        contact.notes = Some("prefers evenings".to_string());
        db.contacts().upsert(&contact).unwrap();

        let all = db.contacts().list_all().unwrap();
        assert_eq!(all.len(), 1);
        assert_eq!(all[0].contact_frequency_days, 10);
        assert_eq!(all[0].notes.as_deref(), Some("prefers evenings"));
    }

    #[test]
    fn fetch_by_name_ignores_case() {
        let db = Database::open_memory().unwrap();
        db.contacts()
            .upsert(&Contact::new("Nana", Tier::InnerCircle))
            .unwrap();
        assert!(db.contacts().fetch_by_name("nana").unwrap().is_some());
        assert!(db.contacts().fetch_by_name("NANA").unwrap().is_some());
        assert!(db.contacts().fetch_by_name("Mona").unwrap().is_none());
    }

    #[test]
    fn log_contact_moves_the_clock() {
        let db = Database::open_memory().unwrap();
        let contact = Contact::new("Sam", Tier::KeepWarm);
        db.contacts().upsert(&contact).unwrap();

        let at = now();
        let updated = db.contacts().log_contact(contact.id, at).unwrap();
        assert_eq!(updated.last_contact_at, Some(at));

        let missing = db.contacts().log_contact(Uuid::new_v4(), at);
        assert!(matches!(missing, Err(DatabaseError::NotFound { .. })));
    }

    #[test]
    fn archive_is_terminal_and_idempotent() {
        let db = Database::open_memory().unwrap();
        let contact = Contact::new("Ghost", Tier::KeepWarm);
        db.contacts().upsert(&contact).unwrap();

        let first = db.contacts().archive(contact.id, now()).unwrap();
        assert_eq!(first.archived_at, Some(now()));
        let second = db
            .contacts()
            .archive(contact.id, now() + Duration::days(1))
            .unwrap();
        assert_eq!(second.archived_at, Some(now()));

        assert!(db.contacts().list_active().unwrap().is_empty());
        assert_eq!(db.contacts().list_all().unwrap().len(), 1);
    }

    #[test]
    fn same_identity_collapses_to_one_row() {
        let db = Database::open_memory().unwrap();
        let first = sample_signal(Platform::Github, "evt-1", 60);
        let mut refreshed = sample_signal(Platform::Github, "evt-1", 30);
        refreshed.title = "refreshed title".to_string();

        db.signals().upsert(&first).unwrap();
        db.signals().upsert(&refreshed).unwrap();

        let rows = db.signals().recent(10).unwrap();
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].title, "refreshed title");
    }

    #[test]
    fn recent_is_newest_first_and_limited() {
        let db = Database::open_memory().unwrap();
        let batch = vec![
            sample_signal(Platform::Github, "a", 300),
            sample_signal(Platform::Youtube, "b", 5),
            sample_signal(Platform::Twitch, "c", 90),
            sample_signal(Platform::Github, "d", 30),
        ];
        assert_eq!(db.signals().upsert_all(&batch).unwrap(), 4);

        let rows = db.signals().recent(3).unwrap();
        assert_eq!(rows.len(), 3);
        assert_eq!(rows[0].source_id, "b");
        assert_eq!(rows[1].source_id, "d");
        assert_eq!(rows[2].source_id, "c");
    }

    #[test]
    fn by_platform_filters() {
        let db = Database::open_memory().unwrap();
        db.signals()
            .upsert_all(&[
                sample_signal(Platform::Github, "a", 10),
                sample_signal(Platform::Youtube, "b", 5),
                sample_signal(Platform::Github, "c", 1),
            ])
            .unwrap();

        let rows = db.signals().by_platform(Platform::Github, 10).unwrap();
        assert_eq!(rows.len(), 2);
        assert!(rows.iter().all(|s| s.platform == Platform::Github));
        assert_eq!(rows[0].source_id, "c");
    }

    #[test]
    fn prune_drops_only_old_rows() {
        let db = Database::open_memory().unwrap();
        db.signals()
            .upsert_all(&[
                sample_signal(Platform::Github, "old", 60 * 24 * 40),
                sample_signal(Platform::Github, "new", 30),
            ])
            .unwrap();

        let cutoff = now() - Duration::days(30);
        assert_eq!(db.signals().prune_older_than(cutoff).unwrap(), 1);
        let rows = db.signals().recent(10).unwrap();
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].source_id, "new");
    }

    #[test]
    fn metadata_survives_the_round_trip() {
        let db = Database::open_memory().unwrap();
        let signal = sample_signal(Platform::Github, "evt-1", 1);
        db.signals().upsert(&signal).unwrap();
        let rows = db.signals().recent(1).unwrap();
        assert_eq!(rows[0].metadata["actor"], "octocat");
    }
}
