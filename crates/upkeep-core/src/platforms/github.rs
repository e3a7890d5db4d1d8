//! GitHub adapter -- public activity of the people the user follows.
//!
//! Composition per fetch: list followed users, pull each user's recent
//! public events (bounded concurrency, tolerant per user), merge
//! newest-first and cap the feed. Event payloads vary wildly by type,
//! so mapping works off `serde_json::Value` and degrades unknown event
//! types to a generic activity signal rather than dropping them.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use reqwest::Client;
use serde::Deserialize;
use tokio::sync::Semaphore;
use tokio::task::JoinSet;
use tracing::warn;

use super::http::{ensure_success, transport_error, USER_AGENT};
use super::traits::PlatformAdapter;
use crate::credentials::PlatformCredential;
use crate::error::FetchError;
use crate::signal::{Platform, Signal, SignalKind};

pub const DEFAULT_API_BASE: &str = "https://api.github.com";

const ACCEPT: &str = "application/vnd.github.v3+json";
/// Only this many followed users are polled per fetch.
const FOLLOWED_USER_LIMIT: usize = 20;
/// Events requested per user.
const EVENTS_PER_USER: &str = "10";
/// Merged feed cap.
const EVENT_FEED_LIMIT: usize = 50;

pub struct GitHubAdapter {
    client: Client,
    api_base: String,
    request_timeout: Duration,
    subfetch: Arc<Semaphore>,
}

impl GitHubAdapter {
    pub fn new(client: Client, request_timeout: Duration, subfetch_limit: usize) -> Self {
        Self::with_api_base(client, DEFAULT_API_BASE, request_timeout, subfetch_limit)
    }

    /// Point the adapter at a different API origin, for tests.
    pub fn with_api_base(
        client: Client,
        api_base: impl Into<String>,
        request_timeout: Duration,
        subfetch_limit: usize,
    ) -> Self {
        Self {
            client,
            api_base: api_base.into(),
            request_timeout,
            subfetch: Arc::new(Semaphore::new(subfetch_limit.max(1))),
        }
    }

    /// Logins of the users the authenticated user follows.
    async fn following(&self, access_token: &str) -> Result<Vec<String>, FetchError> {
        let response = self
            .client
            .get(format!("{}/user/following", self.api_base))
            .header("Authorization", format!("Bearer {access_token}"))
            .header("Accept", ACCEPT)
            .header("User-Agent", USER_AGENT)
            .timeout(self.request_timeout)
            .send()
            .await
            .map_err(|e| transport_error(Platform::Github, e))?;
        ensure_success(Platform::Github, response.status())?;

        let users: Vec<FollowedUser> = response
            .json()
            .await
            .map_err(|e| transport_error(Platform::Github, e))?;
        Ok(users.into_iter().map(|u| u.login).collect())
    }
}

/// Recent public events for one user. Free function so fan-out tasks
/// can own their inputs.
async fn user_events(
    client: Client,
    api_base: String,
    access_token: String,
    login: String,
    request_timeout: Duration,
) -> Result<Vec<Event>, FetchError> {
    let response = client
        .get(format!("{api_base}/users/{login}/events/public"))
        .query(&[("per_page", EVENTS_PER_USER)])
        .header("Authorization", format!("Bearer {access_token}"))
        .header("Accept", ACCEPT)
        .header("User-Agent", USER_AGENT)
        .timeout(request_timeout)
        .send()
        .await
        .map_err(|e| transport_error(Platform::Github, e))?;
    ensure_success(Platform::Github, response.status())?;

    response
        .json()
        .await
        .map_err(|e| transport_error(Platform::Github, e))
}

#[async_trait]
impl PlatformAdapter for GitHubAdapter {
    fn platform(&self) -> Platform {
        Platform::Github
    }

    async fn fetch_signals(
        &self,
        credential: &PlatformCredential,
    ) -> Result<Vec<Signal>, FetchError> {
        let following = self.following(&credential.access_token).await?;

        let mut tasks = JoinSet::new();
        for (index, login) in following.into_iter().take(FOLLOWED_USER_LIMIT).enumerate() {
            let limiter = Arc::clone(&self.subfetch);
            let client = self.client.clone();
            let api_base = self.api_base.clone();
            let token = credential.access_token.clone();
            let request_timeout = self.request_timeout;
            tasks.spawn(async move {
                let _permit = limiter.acquire_owned().await.ok();
                let result =
                    user_events(client, api_base, token, login.clone(), request_timeout).await;
                (index, login, result)
            });
        }

        let mut fetched = Vec::new();
        while let Some(joined) = tasks.join_next().await {
            match joined {
                Ok((index, _, Ok(events))) => fetched.push((index, events)),
                Ok((_, login, Err(err))) => {
                    warn!(user = %login, error = %err, "skipping user events");
                }
                Err(err) => warn!(error = %err, "user event task aborted"),
            }
        }
        // Stable follow order first, then newest-first overall.
        fetched.sort_by_key(|(index, _)| *index);
        let mut events: Vec<Event> = fetched.into_iter().flat_map(|(_, e)| e).collect();
        events.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        events.truncate(EVENT_FEED_LIMIT);

        Ok(events.into_iter().map(event_to_signal).collect())
    }
}

#[derive(Debug, Deserialize)]
struct FollowedUser {
    login: String,
}

#[derive(Debug, Deserialize)]
struct Event {
    id: String,
    #[serde(rename = "type")]
    kind: String,
    actor: Actor,
    repo: Repo,
    #[serde(default)]
    payload: serde_json::Value,
    created_at: DateTime<Utc>,
}

#[derive(Debug, Deserialize)]
struct Actor {
    #[serde(default)]
    login: String,
    #[serde(default)]
    avatar_url: String,
}

#[derive(Debug, Deserialize)]
struct Repo {
    #[serde(default)]
    name: String,
}

fn event_to_signal(event: Event) -> Signal {
    let repo = event.repo.name.as_str();
    let payload = &event.payload;

    let (kind, title, description, url) = match event.kind.as_str() {
        "PushEvent" => {
            let commits = payload.get("commits").and_then(|c| c.as_array());
            let count = commits.map_or(0, |c| c.len());
            let title = commits
                .and_then(|c| c.first())
                .and_then(|c| c.get("message"))
                .and_then(|m| m.as_str())
                .map(String::from)
                .unwrap_or_else(|| format!("Pushed to {repo}"));
            (
                SignalKind::Commit,
                title,
                Some(format!("{count} commit(s) to {repo}")),
                Some(format!("https://github.com/{repo}/commits")),
            )
        }
        "PullRequestEvent" => {
            let pr = payload.get("pull_request");
            let pr_title = pr
                .and_then(|p| p.get("title"))
                .and_then(|t| t.as_str())
                .unwrap_or("Pull Request");
            let title = match pr.and_then(|p| p.get("number")).and_then(|n| n.as_u64()) {
                Some(number) => format!("PR #{number}: {pr_title}"),
                None => format!("PR: {pr_title}"),
            };
            let description = payload
                .get("action")
                .and_then(|a| a.as_str())
                .filter(|a| !a.is_empty())
                .map(String::from);
            let url = pr
                .and_then(|p| p.get("html_url"))
                .and_then(|u| u.as_str())
                .filter(|u| !u.is_empty())
                .map(String::from);
            (SignalKind::Pr, title, description, url)
        }
        "CreateEvent" => {
            let ref_type = payload
                .get("ref_type")
                .and_then(|r| r.as_str())
                .unwrap_or("repository");
            let reference = payload.get("ref").and_then(|r| r.as_str()).unwrap_or("");
            let title = if reference.is_empty() {
                format!("Created {ref_type}")
            } else {
                format!("Created {ref_type} {reference}")
            };
            (
                SignalKind::Activity,
                title,
                Some(format!("In {repo}")),
                Some(format!("https://github.com/{repo}")),
            )
        }
        "WatchEvent" => (
            SignalKind::Activity,
            format!("Starred {repo}"),
            None,
            Some(format!("https://github.com/{repo}")),
        ),
        "ForkEvent" => {
            let url = payload
                .get("forkee")
                .and_then(|f| f.get("html_url"))
                .and_then(|u| u.as_str())
                .filter(|u| !u.is_empty())
                .map(String::from);
            (SignalKind::Activity, format!("Forked {repo}"), None, url)
        }
        other => (
            SignalKind::Activity,
            format!("{} on {repo}", other.trim_end_matches("Event")),
            None,
            Some(format!("https://github.com/{repo}")),
        ),
    };

    let mut metadata = serde_json::Map::new();
    metadata.insert("actor".into(), event.actor.login.into());
    metadata.insert("repo".into(), event.repo.name.into());
    metadata.insert("eventType".into(), event.kind.into());

    Signal {
        platform: Platform::Github,
        kind,
        source_id: event.id,
        title,
        description,
        url,
        thumbnail_url: (!event.actor.avatar_url.is_empty()).then_some(event.actor.avatar_url),
        is_live: false,
        published_at: event.created_at,
        metadata,
    }
}
