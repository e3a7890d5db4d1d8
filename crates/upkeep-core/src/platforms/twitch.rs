//! Twitch adapter -- live streams from followed channels.
//!
//! Twitch only surfaces what is live right now, so every signal from
//! here is a stream. Helix needs the app client id and the viewer's
//! numeric user id alongside the OAuth token; a credential missing
//! either is treated as not properly connected.

use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use reqwest::Client;
use serde::Deserialize;
use tracing::warn;

use super::http::{ensure_success, transport_error, USER_AGENT};
use super::traits::PlatformAdapter;
use crate::credentials::PlatformCredential;
use crate::error::FetchError;
use crate::signal::{Platform, Signal, SignalKind};

pub const DEFAULT_API_BASE: &str = "https://api.twitch.tv/helix";

/// Helix caps user_id filters at this many per request.
const USERS_PER_BATCH: usize = 100;

pub struct TwitchAdapter {
    client: Client,
    api_base: String,
    request_timeout: Duration,
}

/// One followed channel, as returned by the follows listing.
#[derive(Debug, Clone, Deserialize)]
pub struct FollowedChannel {
    pub to_id: String,
    #[serde(default)]
    pub to_login: String,
    #[serde(default)]
    pub to_name: String,
}

impl TwitchAdapter {
    pub fn new(client: Client, request_timeout: Duration) -> Self {
        Self::with_api_base(client, DEFAULT_API_BASE, request_timeout)
    }

    /// Point the adapter at a different API origin, for tests.
    pub fn with_api_base(
        client: Client,
        api_base: impl Into<String>,
        request_timeout: Duration,
    ) -> Self {
        Self {
            client,
            api_base: api_base.into(),
            request_timeout,
        }
    }

    fn auth_parts<'a>(
        &self,
        credential: &'a PlatformCredential,
    ) -> Result<(&'a str, &'a str), FetchError> {
        let client_id = credential
            .client_id
            .as_deref()
            .filter(|id| !id.is_empty())
            .ok_or(FetchError::AuthExpired {
                platform: Platform::Twitch,
            })?;
        let user_id = credential
            .remote_user_id
            .as_deref()
            .filter(|id| !id.is_empty())
            .ok_or(FetchError::AuthExpired {
                platform: Platform::Twitch,
            })?;
        Ok((client_id, user_id))
    }

    /// Channels the user follows.
    pub async fn followed_channels(
        &self,
        credential: &PlatformCredential,
    ) -> Result<Vec<FollowedChannel>, FetchError> {
        let (client_id, user_id) = self.auth_parts(credential)?;
        let response = self
            .client
            .get(format!("{}/channels/followed", self.api_base))
            .query(&[("user_id", user_id), ("first", "100")])
            .header("Authorization", format!("Bearer {}", credential.access_token))
            .header("Client-Id", client_id)
            .header("User-Agent", USER_AGENT)
            .timeout(self.request_timeout)
            .send()
            .await
            .map_err(|e| transport_error(Platform::Twitch, e))?;
        ensure_success(Platform::Twitch, response.status())?;

        let list: FollowList = response
            .json()
            .await
            .map_err(|e| transport_error(Platform::Twitch, e))?;
        Ok(list.data)
    }

    /// Live streams among the given user ids, batched to the Helix cap.
    /// A failed batch only loses that batch.
    pub async fn streams_for_users(
        &self,
        credential: &PlatformCredential,
        user_ids: &[String],
    ) -> Result<Vec<Signal>, FetchError> {
        let (client_id, _) = self.auth_parts(credential)?;

        let mut streams = Vec::new();
        for batch in user_ids.chunks(USERS_PER_BATCH) {
            let query: Vec<(&str, &str)> =
                batch.iter().map(|id| ("user_id", id.as_str())).collect();
            let sent = self
                .client
                .get(format!("{}/streams", self.api_base))
                .query(&query)
                .header("Authorization", format!("Bearer {}", credential.access_token))
                .header("Client-Id", client_id)
                .header("User-Agent", USER_AGENT)
                .timeout(self.request_timeout)
                .send()
                .await;

            let batch_result = match sent {
                Ok(response) => match ensure_success(Platform::Twitch, response.status()) {
                    Ok(()) => response
                        .json::<StreamList>()
                        .await
                        .map_err(|e| transport_error(Platform::Twitch, e)),
                    Err(err) => Err(err),
                },
                Err(err) => Err(transport_error(Platform::Twitch, err)),
            };

            match batch_result {
                Ok(list) => streams.extend(list.data),
                Err(err) => warn!(error = %err, "skipping stream batch"),
            }
        }

        Ok(streams.into_iter().map(stream_to_signal).collect())
    }
}

#[async_trait]
impl PlatformAdapter for TwitchAdapter {
    fn platform(&self) -> Platform {
        Platform::Twitch
    }

    async fn fetch_signals(
        &self,
        credential: &PlatformCredential,
    ) -> Result<Vec<Signal>, FetchError> {
        let (client_id, user_id) = self.auth_parts(credential)?;

        let response = self
            .client
            .get(format!("{}/streams/followed", self.api_base))
            .query(&[("user_id", user_id), ("first", "100")])
            .header("Authorization", format!("Bearer {}", credential.access_token))
            .header("Client-Id", client_id)
            .header("User-Agent", USER_AGENT)
            .timeout(self.request_timeout)
            .send()
            .await
            .map_err(|e| transport_error(Platform::Twitch, e))?;
        ensure_success(Platform::Twitch, response.status())?;

        let list: StreamList = response
            .json()
            .await
            .map_err(|e| transport_error(Platform::Twitch, e))?;
        Ok(list.data.into_iter().map(stream_to_signal).collect())
    }
}

#[derive(Debug, Deserialize)]
struct StreamList {
    #[serde(default)]
    data: Vec<Stream>,
}

#[derive(Debug, Deserialize)]
struct FollowList {
    #[serde(default)]
    data: Vec<FollowedChannel>,
}

#[derive(Debug, Deserialize)]
struct Stream {
    id: String,
    #[serde(default)]
    user_id: String,
    #[serde(default)]
    user_login: String,
    #[serde(default)]
    user_name: String,
    #[serde(default)]
    game_name: String,
    #[serde(default)]
    title: String,
    #[serde(default)]
    viewer_count: u64,
    started_at: DateTime<Utc>,
    #[serde(default)]
    thumbnail_url: String,
}

fn stream_to_signal(stream: Stream) -> Signal {
    // Helix thumbnail URLs carry {width}x{height} placeholders.
    let thumbnail = stream
        .thumbnail_url
        .replace("{width}", "320")
        .replace("{height}", "180");
    let description = format!(
        "Playing {} - {} viewers",
        stream.game_name,
        format_count(stream.viewer_count)
    );

    let mut metadata = serde_json::Map::new();
    metadata.insert("streamId".into(), stream.id.clone().into());
    metadata.insert("userId".into(), stream.user_id.into());
    metadata.insert("userName".into(), stream.user_name.into());
    metadata.insert("gameName".into(), stream.game_name.into());
    metadata.insert("viewerCount".into(), stream.viewer_count.into());

    Signal {
        platform: Platform::Twitch,
        kind: SignalKind::Stream,
        source_id: stream.id,
        title: stream.title,
        description: Some(description),
        url: Some(format!("https://twitch.tv/{}", stream.user_login)),
        thumbnail_url: (!thumbnail.is_empty()).then_some(thumbnail),
        is_live: true,
        published_at: stream.started_at,
        metadata,
    }
}

/// Group digits with commas, matching how viewer counts render upstream.
fn format_count(n: u64) -> String {
    let digits = n.to_string();
    let mut out = String::with_capacity(digits.len() + digits.len() / 3);
    for (i, ch) in digits.chars().enumerate() {
        if i > 0 && (digits.len() - i) % 3 == 0 {
            out.push(',');
        }
        out.push(ch);
    }
    out
}
