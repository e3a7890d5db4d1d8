//! Contacts and relationship tiers.
//!
//! A contact is a person the user wants to stay in touch with, at a
//! cadence derived from their tier. `last_contact_at` only moves when the
//! user explicitly logs an outreach; archiving is a terminal state, never
//! a deletion.

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::ValidationError;
use crate::signal::Platform;

/// Default preferred contact method for new contacts.
pub const DEFAULT_CONTACT_METHOD: &str = "Text";

/// Relationship tier, which sets the default outreach cadence.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Tier {
    InnerCircle,
    CloseFriend,
    KeepWarm,
}

impl Tier {
    pub const ALL: [Tier; 3] = [Tier::InnerCircle, Tier::CloseFriend, Tier::KeepWarm];

    pub fn as_str(&self) -> &'static str {
        match self {
            Tier::InnerCircle => "inner_circle",
            Tier::CloseFriend => "close_friend",
            Tier::KeepWarm => "keep_warm",
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            Tier::InnerCircle => "Inner Circle",
            Tier::CloseFriend => "Close Friend",
            Tier::KeepWarm => "Keep Warm",
        }
    }

    /// Default days between contacts for this tier.
    pub fn default_frequency_days(&self) -> u32 {
        match self {
            Tier::InnerCircle => 7,
            Tier::CloseFriend => 14,
            Tier::KeepWarm => 30,
        }
    }
}

impl fmt::Display for Tier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Tier {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().replace('-', "_").as_str() {
            "inner_circle" => Ok(Tier::InnerCircle),
            "close_friend" => Ok(Tier::CloseFriend),
            "keep_warm" => Ok(Tier::KeepWarm),
            other => Err(format!("unknown tier: {other}")),
        }
    }
}

/// Link from a contact to an account on an external platform.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlatformLink {
    pub platform: Platform,
    /// Provider-native account id (channel id, login, numeric user id).
    pub remote_id: String,
}

/// A person in the roster.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Contact {
    pub id: Uuid,
    pub name: String,
    pub tier: Tier,
    /// Desired days between contacts. Must be positive.
    pub contact_frequency_days: u32,
    /// Preferred way to reach them, free-form ("Text", "Call", "Text or Call").
    pub contact_method: String,
    pub last_contact_at: Option<DateTime<Utc>>,
    /// Free-form reminders ("loves climbing", "ask about the move").
    #[serde(default)]
    pub notes: Option<String>,
    #[serde(default)]
    pub platforms: Vec<PlatformLink>,
    pub avatar_url: Option<String>,
    /// Set once by the archive action; archived contacts leave evaluation
    /// but are never deleted.
    pub archived_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
}

impl Contact {
    /// A new contact with tier defaults: cadence from the tier, method
    /// "Text", a generated placeholder avatar, and no contact history.
    pub fn new(name: impl Into<String>, tier: Tier) -> Self {
        let name = name.into();
        let avatar_url = Some(default_avatar_url(&name));
        Self {
            id: Uuid::new_v4(),
            tier,
            contact_frequency_days: tier.default_frequency_days(),
            contact_method: DEFAULT_CONTACT_METHOD.to_string(),
            last_contact_at: None,
            notes: None,
            platforms: Vec::new(),
            avatar_url,
            archived_at: None,
            created_at: Utc::now(),
            name,
        }
    }

    pub fn validate(&self) -> Result<(), ValidationError> {
        if self.name.trim().is_empty() {
            return Err(ValidationError::EmptyName);
        }
        if self.contact_frequency_days == 0 {
            return Err(ValidationError::NonPositiveFrequency);
        }
        Ok(())
    }

    /// Record an explicit outreach. Resets the urgency clock.
    pub fn mark_contacted(&mut self, at: DateTime<Utc>) {
        self.last_contact_at = Some(at);
    }

    pub fn is_archived(&self) -> bool {
        self.archived_at.is_some()
    }
}

/// Deterministic placeholder avatar, seeded by the lowercased name.
pub fn default_avatar_url(name: &str) -> String {
    format!(
        "https://api.dicebear.com/7.x/avataaars/svg?seed={}",
        urlencoding::encode(&name.to_lowercase())
    )
}
