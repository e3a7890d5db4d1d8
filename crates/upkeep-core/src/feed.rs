//! Signal aggregation across connected platforms.
//!
//! One collect pass asks every registered adapter for signals in
//! parallel and merges whatever arrives. A platform failing, being rate
//! limited or holding a stale credential never blocks the others; those
//! outcomes are reported alongside the merged feed so the caller can
//! tell "quiet network" from "half the fetches fell over".

use std::collections::HashSet;
use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use futures::future::join_all;
use reqwest::Client;
use tracing::{debug, warn};

use crate::credentials::CredentialStore;
use crate::error::{CoreError, FetchError};
use crate::platforms::{GitHubAdapter, PlatformAdapter, TwitchAdapter, YouTubeAdapter};
use crate::signal::{Platform, Signal};
use crate::storage::FeedConfig;

/// Why one platform contributed nothing to a collect pass.
#[derive(Debug)]
pub struct PlatformFailure {
    pub platform: Platform,
    pub error: CoreError,
}

/// Merged result of one collect pass.
#[derive(Debug, Default)]
pub struct FeedOutcome {
    /// Newest first, deduplicated, capped.
    pub signals: Vec<Signal>,
    pub failures: Vec<PlatformFailure>,
}

impl FeedOutcome {
    /// True when every connected platform delivered.
    pub fn is_complete(&self) -> bool {
        self.failures.is_empty()
    }
}

pub struct SignalFeed {
    adapters: Vec<Arc<dyn PlatformAdapter>>,
    max_signals: usize,
}

impl SignalFeed {
    /// A feed with no adapters registered yet.
    pub fn new(max_signals: usize) -> Self {
        Self {
            adapters: Vec::new(),
            max_signals,
        }
    }

    /// The standard lineup: YouTube, GitHub and Twitch, all sharing one
    /// HTTP client and the config's timeout and concurrency settings.
    pub fn with_defaults(config: &FeedConfig) -> Self {
        let client = Client::new();
        let timeout = Duration::from_secs(config.request_timeout_secs);
        let mut feed = Self::new(config.max_signals);
        feed.register(Arc::new(YouTubeAdapter::with_api_base(
            client.clone(),
            config.youtube_api_base.clone(),
            timeout,
            config.subfetch_concurrency,
        )));
        feed.register(Arc::new(GitHubAdapter::with_api_base(
            client.clone(),
            config.github_api_base.clone(),
            timeout,
            config.subfetch_concurrency,
        )));
        feed.register(Arc::new(TwitchAdapter::with_api_base(
            client,
            config.twitch_api_base.clone(),
            timeout,
        )));
        feed
    }

    pub fn register(&mut self, adapter: Arc<dyn PlatformAdapter>) {
        self.adapters.push(adapter);
    }

    /// Collect signals from every platform with a stored credential.
    ///
    /// Platforms without a credential are skipped silently; an expired
    /// credential is reported without spending a network call on it.
    /// Never fails as a whole: with nothing connected the outcome is
    /// simply empty.
    pub async fn collect(
        &self,
        credentials: &dyn CredentialStore,
        now: DateTime<Utc>,
    ) -> FeedOutcome {
        let mut outcome = FeedOutcome::default();
        let mut fetches = Vec::new();

        for adapter in &self.adapters {
            let platform = adapter.platform();
            let credential = match credentials.load(platform) {
                Ok(Some(credential)) => credential,
                Ok(None) => {
                    debug!(%platform, "not connected, skipping");
                    continue;
                }
                Err(err) => {
                    outcome.failures.push(PlatformFailure {
                        platform,
                        error: err.into(),
                    });
                    continue;
                }
            };
            if !credential.is_valid(now) {
                outcome.failures.push(PlatformFailure {
                    platform,
                    error: FetchError::AuthExpired { platform }.into(),
                });
                continue;
            }

            let adapter = Arc::clone(adapter);
            fetches.push(async move { (platform, adapter.fetch_signals(&credential).await) });
        }

        // Concurrent I/O on one task. Dropping the collect future drops
        // every in-flight fetch with it.
        for (platform, result) in join_all(fetches).await {
            match result {
                Ok(signals) => {
                    debug!(%platform, count = signals.len(), "platform delivered");
                    outcome.signals.extend(signals);
                }
                Err(err) => {
                    warn!(%platform, error = %err, "platform fetch failed");
                    outcome.failures.push(PlatformFailure {
                        platform,
                        error: err.into(),
                    });
                }
            }
        }

        // Newest first, then drop older duplicates of the same remote
        // event before capping.
        outcome
            .signals
            .sort_by(|a, b| b.published_at.cmp(&a.published_at));
        let mut seen = HashSet::new();
        outcome.signals.retain(|s| seen.insert(s.identity_hash()));
        outcome.signals.truncate(self.max_signals);

        outcome
    }
}
