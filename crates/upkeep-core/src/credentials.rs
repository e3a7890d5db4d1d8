//! Per-platform credential storage.
//!
//! Credentials live in the OS keyring, one entry per platform, as a
//! JSON blob. Callers never see raw keyring entries; they go through
//! the [`CredentialStore`] trait so tests can swap in an in-memory
//! store.

use std::collections::HashMap;
use std::sync::Mutex;

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

use crate::error::CredentialError;
use crate::signal::Platform;

const SERVICE: &str = "upkeep";

/// Tokens are treated as expired this many seconds early.
const EXPIRY_LEEWAY_SECS: i64 = 60;

/// Everything needed to call one platform's API on the user's behalf.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PlatformCredential {
    pub platform: Platform,
    pub access_token: String,
    pub refresh_token: Option<String>,
    /// App identifier, required by Twitch alongside the token.
    pub client_id: Option<String>,
    /// The user's id on the platform, for endpoints that need it.
    pub remote_user_id: Option<String>,
    pub expires_at: Option<DateTime<Utc>>,
    pub connected_at: DateTime<Utc>,
}

impl PlatformCredential {
    pub fn new(platform: Platform, access_token: impl Into<String>) -> Self {
        Self {
            platform,
            access_token: access_token.into(),
            refresh_token: None,
            client_id: None,
            remote_user_id: None,
            expires_at: None,
            connected_at: Utc::now(),
        }
    }

    /// Whether the token is still usable at `now`. Tokens without an
    /// expiry never go stale here; the platform rejects them instead.
    pub fn is_valid(&self, now: DateTime<Utc>) -> bool {
        match self.expires_at {
            Some(expires) => now < expires - Duration::seconds(EXPIRY_LEEWAY_SECS),
            None => true,
        }
    }
}

/// Storage for platform credentials.
pub trait CredentialStore: Send + Sync {
    fn store(&self, credential: &PlatformCredential) -> Result<(), CredentialError>;
    fn load(&self, platform: Platform) -> Result<Option<PlatformCredential>, CredentialError>;
    fn delete(&self, platform: Platform) -> Result<(), CredentialError>;

    /// Platforms with a stored credential, in canonical order.
    fn connected(&self) -> Result<Vec<Platform>, CredentialError> {
        let mut platforms = Vec::new();
        for platform in Platform::ALL {
            if self.load(platform)?.is_some() {
                platforms.push(platform);
            }
        }
        Ok(platforms)
    }

    /// Load a credential, failing if the platform was never connected.
    fn require(&self, platform: Platform) -> Result<PlatformCredential, CredentialError> {
        self.load(platform)?
            .ok_or(CredentialError::NotConnected { platform })
    }
}

/// OS keyring backed store. One keyring entry per platform under the
/// "upkeep" service.
pub struct KeyringCredentials;

impl CredentialStore for KeyringCredentials {
    fn store(&self, credential: &PlatformCredential) -> Result<(), CredentialError> {
        let entry = keyring::Entry::new(SERVICE, credential.platform.as_str())?;
        entry.set_password(&serde_json::to_string(credential)?)?;
        Ok(())
    }

    fn load(&self, platform: Platform) -> Result<Option<PlatformCredential>, CredentialError> {
        let entry = keyring::Entry::new(SERVICE, platform.as_str())?;
        match entry.get_password() {
            Ok(raw) => Ok(Some(serde_json::from_str(&raw)?)),
            Err(keyring::Error::NoEntry) => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    fn delete(&self, platform: Platform) -> Result<(), CredentialError> {
        let entry = keyring::Entry::new(SERVICE, platform.as_str())?;
        match entry.delete_credential() {
            Ok(()) => Ok(()),
            Err(keyring::Error::NoEntry) => Ok(()),
            Err(e) => Err(e.into()),
        }
    }
}

/// In-memory store for tests and ephemeral sessions.
#[derive(Default)]
pub struct MemoryCredentials {
    entries: Mutex<HashMap<Platform, PlatformCredential>>,
}

impl MemoryCredentials {
    pub fn new() -> Self {
        Self::default()
    }

    /// Convenience constructor seeding the store with credentials.
    pub fn with(credentials: Vec<PlatformCredential>) -> Self {
        let store = Self::new();
        if let Ok(mut entries) = store.entries.lock() {
            for credential in credentials {
                entries.insert(credential.platform, credential);
            }
        }
        store
    }
}

impl CredentialStore for MemoryCredentials {
    fn store(&self, credential: &PlatformCredential) -> Result<(), CredentialError> {
        if let Ok(mut entries) = self.entries.lock() {
            entries.insert(credential.platform, credential.clone());
        }
        Ok(())
    }

    fn load(&self, platform: Platform) -> Result<Option<PlatformCredential>, CredentialError> {
        Ok(self
            .entries
            .lock()
            .ok()
            .and_then(|entries| entries.get(&platform).cloned()))
    }

    fn delete(&self, platform: Platform) -> Result<(), CredentialError> {
        if let Ok(mut entries) = self.entries.lock() {
            entries.remove(&platform);
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn memory_store_round_trips() {
        let store = MemoryCredentials::new();
        let cred = PlatformCredential::new(Platform::Github, "ghp_test");
        store.store(&cred).unwrap();

        let loaded = store.load(Platform::Github).unwrap().unwrap();
        assert_eq!(loaded.access_token, "ghp_test");
        assert!(store.load(Platform::Twitch).unwrap().is_none());

        store.delete(Platform::Github).unwrap();
        assert!(store.load(Platform::Github).unwrap().is_none());
    }

    #[test]
    fn connected_lists_platforms_in_canonical_order() {
        let store = MemoryCredentials::with(vec![
            PlatformCredential::new(Platform::Twitch, "t"),
            PlatformCredential::new(Platform::Youtube, "y"),
        ]);
        assert_eq!(
            store.connected().unwrap(),
            vec![Platform::Youtube, Platform::Twitch]
        );
    }

    #[test]
    fn require_reports_missing_platform() {
        let store = MemoryCredentials::new();
        let err = store.require(Platform::Youtube).unwrap_err();
        assert!(matches!(
            err,
            CredentialError::NotConnected {
                platform: Platform::Youtube
            }
        ));
    }

    #[test]
    fn validity_honours_expiry_with_leeway() {
        let now = Utc.with_ymd_and_hms(2026, 3, 1, 12, 0, 0).unwrap();
        let mut cred = PlatformCredential::new(Platform::Youtube, "tok");
        assert!(cred.is_valid(now));

        cred.expires_at = Some(now + Duration::seconds(120));
        assert!(cred.is_valid(now));

        cred.expires_at = Some(now + Duration::seconds(30));
        assert!(!cred.is_valid(now));

        cred.expires_at = Some(now - Duration::hours(1));
        assert!(!cred.is_valid(now));
    }
}
