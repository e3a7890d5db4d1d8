//! Canonical activity model shared by every platform adapter.
//!
//! A [`Signal`] is one piece of network activity (a video, a stream, a
//! commit) in a platform-agnostic shape. Adapters produce them, the
//! aggregator merges them, and the signal store persists them keyed by
//! [`Signal::identity_hash`] so re-fetching the same remote event never
//! creates a second row.

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

/// Hex prefix length of the identity hash used as storage key.
pub const IDENTITY_HASH_LEN: usize = 16;

/// External platform an account can be linked to.
///
/// Adapters exist for YouTube, GitHub, and Twitch; the remaining variants
/// are valid link targets for contacts but produce no signals yet.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Platform {
    Youtube,
    Github,
    Twitch,
    Discord,
    Strava,
}

impl Platform {
    pub const ALL: [Platform; 5] = [
        Platform::Youtube,
        Platform::Github,
        Platform::Twitch,
        Platform::Discord,
        Platform::Strava,
    ];

    /// Stable lowercase identifier, used in storage and wire formats.
    pub fn as_str(&self) -> &'static str {
        match self {
            Platform::Youtube => "youtube",
            Platform::Github => "github",
            Platform::Twitch => "twitch",
            Platform::Discord => "discord",
            Platform::Strava => "strava",
        }
    }

    /// Human-readable name for CLI output.
    pub fn display_name(&self) -> &'static str {
        match self {
            Platform::Youtube => "YouTube",
            Platform::Github => "GitHub",
            Platform::Twitch => "Twitch",
            Platform::Discord => "Discord",
            Platform::Strava => "Strava",
        }
    }
}

impl fmt::Display for Platform {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Platform {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "youtube" => Ok(Platform::Youtube),
            "github" => Ok(Platform::Github),
            "twitch" => Ok(Platform::Twitch),
            "discord" => Ok(Platform::Discord),
            "strava" => Ok(Platform::Strava),
            other => Err(format!("unknown platform: {other}")),
        }
    }
}

/// What kind of activity a signal represents.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SignalKind {
    Video,
    Stream,
    Commit,
    Pr,
    Post,
    Run,
    Activity,
}

impl SignalKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            SignalKind::Video => "video",
            SignalKind::Stream => "stream",
            SignalKind::Commit => "commit",
            SignalKind::Pr => "pr",
            SignalKind::Post => "post",
            SignalKind::Run => "run",
            SignalKind::Activity => "activity",
        }
    }
}

impl fmt::Display for SignalKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for SignalKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "video" => Ok(SignalKind::Video),
            "stream" => Ok(SignalKind::Stream),
            "commit" => Ok(SignalKind::Commit),
            "pr" => Ok(SignalKind::Pr),
            "post" => Ok(SignalKind::Post),
            "run" => Ok(SignalKind::Run),
            "activity" => Ok(SignalKind::Activity),
            other => Err(format!("unknown signal kind: {other}")),
        }
    }
}

/// One normalized piece of network activity.
///
/// Signals are immutable value objects. Two fetches of the same remote
/// event produce signals with the same `(platform, source_id)` identity,
/// which is what deduplication keys on.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Signal {
    pub platform: Platform,
    pub kind: SignalKind,
    /// Provider-native id of the underlying event (video id, event id,
    /// stream id).
    pub source_id: String,
    pub title: String,
    pub description: Option<String>,
    pub url: Option<String>,
    pub thumbnail_url: Option<String>,
    pub is_live: bool,
    pub published_at: DateTime<Utc>,
    /// Platform-specific extras that survive normalization.
    #[serde(default)]
    pub metadata: serde_json::Map<String, serde_json::Value>,
}

impl Signal {
    /// Composite identity of the underlying remote event.
    pub fn identity(&self) -> (Platform, &str) {
        (self.platform, &self.source_id)
    }

    /// Stable hex key derived from the identity, used as the storage
    /// primary key and for in-memory dedup.
    pub fn identity_hash(&self) -> String {
        let mut hasher = Sha256::new();
        hasher.update(self.platform.as_str().as_bytes());
        hasher.update(b":");
        hasher.update(self.source_id.as_bytes());
        let mut hash = hex::encode(hasher.finalize());
        hash.truncate(IDENTITY_HASH_LEN);
        hash
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn signal(platform: Platform, source_id: &str) -> Signal {
        Signal {
            platform,
            kind: SignalKind::Activity,
            source_id: source_id.to_string(),
            title: "t".to_string(),
            description: None,
            url: None,
            thumbnail_url: None,
            is_live: false,
            published_at: Utc.with_ymd_and_hms(2026, 1, 1, 0, 0, 0).unwrap(),
            metadata: serde_json::Map::new(),
        }
    }

    #[test]
    fn platform_roundtrips_through_str() {
        for platform in Platform::ALL {
            assert_eq!(platform.as_str().parse::<Platform>().unwrap(), platform);
        }
    }

    #[test]
    fn platform_serde_uses_lowercase() {
        let json = serde_json::to_string(&Platform::Youtube).unwrap();
        assert_eq!(json, "\"youtube\"");
        let parsed: Platform = serde_json::from_str("\"twitch\"").unwrap();
        assert_eq!(parsed, Platform::Twitch);
    }

    #[test]
    fn identity_hash_is_stable() {
        let a = signal(Platform::Github, "123");
        let b = signal(Platform::Github, "123");
        assert_eq!(a.identity_hash(), b.identity_hash());
        assert_eq!(a.identity_hash().len(), IDENTITY_HASH_LEN);
    }

    #[test]
    fn identity_hash_distinguishes_platform_and_source() {
        let a = signal(Platform::Github, "123");
        let b = signal(Platform::Youtube, "123");
        let c = signal(Platform::Github, "124");
        assert_ne!(a.identity_hash(), b.identity_hash());
        assert_ne!(a.identity_hash(), c.identity_hash());
    }
}
