//! YouTube adapter -- subscription uploads and live broadcasts.
//!
//! Composition per fetch: list the user's subscriptions, pull recent
//! uploads for every subscribed channel (batched, bounded concurrency),
//! then add currently live broadcasts. The subscription listing is
//! load-bearing and its failure fails the platform; per-channel lookups
//! are tolerant and only lose that channel's uploads.

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

pub const DEFAULT_API_BASE: &str = "https://www.googleapis.com/youtube/v3";

/// Channels per upload-lookup batch.
const CHANNEL_BATCH_SIZE: usize = 10;
/// Descriptions are clipped to this many characters.
const DESCRIPTION_LIMIT: usize = 200;

pub struct YouTubeAdapter {
    client: Client,
    api_base: String,
    request_timeout: Duration,
    subfetch: Arc<Semaphore>,
}

impl YouTubeAdapter {
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

    /// Channel ids of the user's subscriptions.
    async fn subscribed_channels(&self, access_token: &str) -> Result<Vec<String>, FetchError> {
        let response = self
            .client
            .get(format!("{}/subscriptions", self.api_base))
            .query(&[("part", "snippet"), ("mine", "true"), ("maxResults", "50")])
            .header("Authorization", format!("Bearer {access_token}"))
            .header("User-Agent", USER_AGENT)
            .timeout(self.request_timeout)
            .send()
            .await
            .map_err(|e| transport_error(Platform::Youtube, e))?;
        ensure_success(Platform::Youtube, response.status())?;

        let list: SubscriptionList = response
            .json()
            .await
            .map_err(|e| transport_error(Platform::Youtube, e))?;
        Ok(list
            .items
            .into_iter()
            .map(|s| s.snippet.resource_id.channel_id)
            .collect())
    }

    /// Broadcasts that are live right now.
    async fn live_broadcasts(&self, access_token: &str) -> Result<Vec<Video>, FetchError> {
        let response = self
            .client
            .get(format!("{}/search", self.api_base))
            .query(&[
                ("part", "snippet"),
                ("eventType", "live"),
                ("type", "video"),
                ("maxResults", "20"),
            ])
            .header("Authorization", format!("Bearer {access_token}"))
            .header("User-Agent", USER_AGENT)
            .timeout(self.request_timeout)
            .send()
            .await
            .map_err(|e| transport_error(Platform::Youtube, e))?;
        ensure_success(Platform::Youtube, response.status())?;

        let list: VideoList = response
            .json()
            .await
            .map_err(|e| transport_error(Platform::Youtube, e))?;
        Ok(list.items)
    }
}

/// Recent uploads for one channel. Free function so batch tasks can own
/// their inputs.
async fn channel_videos(
    client: Client,
    api_base: String,
    access_token: String,
    channel_id: String,
    request_timeout: Duration,
) -> Result<Vec<Video>, FetchError> {
    let response = client
        .get(format!("{api_base}/search"))
        .query(&[
            ("part", "snippet"),
            ("channelId", channel_id.as_str()),
            ("type", "video"),
            ("order", "date"),
            ("maxResults", "5"),
        ])
        .header("Authorization", format!("Bearer {access_token}"))
        .header("User-Agent", USER_AGENT)
        .timeout(request_timeout)
        .send()
        .await
        .map_err(|e| transport_error(Platform::Youtube, e))?;
    ensure_success(Platform::Youtube, response.status())?;

    let list: VideoList = response
        .json()
        .await
        .map_err(|e| transport_error(Platform::Youtube, e))?;
    Ok(list.items)
}

#[async_trait]
impl PlatformAdapter for YouTubeAdapter {
    fn platform(&self) -> Platform {
        Platform::Youtube
    }

    async fn fetch_signals(
        &self,
        credential: &PlatformCredential,
    ) -> Result<Vec<Signal>, FetchError> {
        let channel_ids = self.subscribed_channels(&credential.access_token).await?;

        let mut videos = Vec::new();
        for batch in channel_ids.chunks(CHANNEL_BATCH_SIZE) {
            let mut tasks = JoinSet::new();
            for (index, channel_id) in batch.iter().enumerate() {
                let limiter = Arc::clone(&self.subfetch);
                let client = self.client.clone();
                let api_base = self.api_base.clone();
                let token = credential.access_token.clone();
                let channel_id = channel_id.clone();
                let request_timeout = self.request_timeout;
                tasks.spawn(async move {
                    let _permit = limiter.acquire_owned().await.ok();
                    let result =
                        channel_videos(client, api_base, token, channel_id.clone(), request_timeout)
                            .await;
                    (index, channel_id, result)
                });
            }

            let mut fetched = Vec::new();
            while let Some(joined) = tasks.join_next().await {
                match joined {
                    Ok((index, _, Ok(items))) => fetched.push((index, items)),
                    Ok((_, channel_id, Err(err))) => {
                        warn!(channel = %channel_id, error = %err, "skipping channel uploads");
                    }
                    Err(err) => warn!(error = %err, "channel upload task aborted"),
                }
            }
            // Provider order within a batch is the subscription order.
            fetched.sort_by_key(|(index, _)| *index);
            videos.extend(fetched.into_iter().flat_map(|(_, items)| items));
        }

        match self.live_broadcasts(&credential.access_token).await {
            Ok(live) => videos.extend(live),
            Err(err) => warn!(error = %err, "skipping live broadcast lookup"),
        }

        Ok(videos.into_iter().map(video_to_signal).collect())
    }
}

#[derive(Debug, Deserialize)]
struct SubscriptionList {
    #[serde(default)]
    items: Vec<Subscription>,
}

#[derive(Debug, Deserialize)]
struct Subscription {
    snippet: SubscriptionSnippet,
}

#[derive(Debug, Deserialize)]
struct SubscriptionSnippet {
    #[serde(rename = "resourceId")]
    resource_id: ResourceId,
}

#[derive(Debug, Deserialize)]
struct ResourceId {
    #[serde(rename = "channelId")]
    channel_id: String,
}

#[derive(Debug, Deserialize)]
struct VideoList {
    #[serde(default)]
    items: Vec<Video>,
}

#[derive(Debug, Deserialize)]
struct Video {
    id: VideoId,
    snippet: VideoSnippet,
}

/// Search results wrap the id as `{"videoId": "..."}`; plain video
/// lookups return a bare string.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum VideoId {
    Plain(String),
    Search {
        #[serde(rename = "videoId")]
        video_id: String,
    },
}

impl VideoId {
    fn as_str(&self) -> &str {
        match self {
            VideoId::Plain(id) => id,
            VideoId::Search { video_id } => video_id,
        }
    }
}

#[derive(Debug, Deserialize)]
struct VideoSnippet {
    #[serde(default)]
    title: String,
    #[serde(default)]
    description: String,
    #[serde(default, rename = "channelTitle")]
    channel_title: String,
    #[serde(default, rename = "channelId")]
    channel_id: String,
    #[serde(rename = "publishedAt")]
    published_at: DateTime<Utc>,
    #[serde(default)]
    thumbnails: Thumbnails,
    #[serde(default, rename = "liveBroadcastContent")]
    live_broadcast_content: String,
}

#[derive(Debug, Default, Deserialize)]
struct Thumbnails {
    medium: Option<Thumbnail>,
}

#[derive(Debug, Deserialize)]
struct Thumbnail {
    url: String,
}

fn video_to_signal(video: Video) -> Signal {
    let is_live = video.snippet.live_broadcast_content == "live";
    let video_id = video.id.as_str().to_string();
    let description: String = video
        .snippet
        .description
        .chars()
        .take(DESCRIPTION_LIMIT)
        .collect();

    let mut metadata = serde_json::Map::new();
    metadata.insert("channelId".into(), video.snippet.channel_id.into());
    metadata.insert("channelTitle".into(), video.snippet.channel_title.into());

    Signal {
        platform: Platform::Youtube,
        kind: if is_live {
            SignalKind::Stream
        } else {
            SignalKind::Video
        },
        url: Some(format!("https://youtube.com/watch?v={video_id}")),
        source_id: video_id,
        title: video.snippet.title,
        description: (!description.is_empty()).then_some(description),
        thumbnail_url: video.snippet.thumbnails.medium.map(|t| t.url),
        is_live,
        published_at: video.snippet.published_at,
        metadata,
    }
}
