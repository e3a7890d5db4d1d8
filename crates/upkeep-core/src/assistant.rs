//! AI passthrough for summaries, search and outreach suggestions.
//!
//! The model is a black box behind the [`Assistant`] trait: signals go
//! in as flattened text lines, prose comes back. Nothing here parses or
//! post-processes completions.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use serde::{Deserialize, Serialize};

use crate::contact::Contact;
use crate::error::AssistantError;
use crate::signal::Signal;

pub const DEFAULT_API_BASE: &str = "https://api.openai.com/v1";
pub const DEFAULT_MODEL: &str = "gpt-4-turbo-preview";
/// Environment variable holding the API key. Keys never live in config
/// files.
pub const API_KEY_ENV: &str = "OPENAI_API_KEY";

/// Only this many signals are flattened into a summary prompt.
const SUMMARY_SIGNAL_LIMIT: usize = 20;

const SUMMARIZE_SYSTEM_PROMPT: &str =
    "Summarize network activity in 2-3 sentences. Be conversational and highlight interesting items.";

const SEARCH_SYSTEM_PROMPT: &str = "You are a helpful assistant for a social network aggregator app called UpKeep. \
     You help users find content and understand activity from their network. \
     Be concise and helpful. When searching, return relevant items and brief explanations.";

const SUGGESTION_SYSTEM_PROMPT: &str = "You help users maintain relationships. Suggest a brief, natural way to reach out. \
     Keep suggestions warm and not guilt-trippy. One sentence max.";

/// Conversational operations over the user's network activity.
#[async_trait]
pub trait Assistant: Send + Sync {
    /// A short prose summary of recent activity.
    async fn summarize(&self, signals: &[Signal]) -> Result<String, AssistantError>;

    /// Natural-language search over the given signals.
    async fn search(&self, query: &str, signals: &[Signal]) -> Result<String, AssistantError>;

    /// One-sentence outreach suggestion for a lapsed contact.
    async fn outreach_suggestion(
        &self,
        contact: &Contact,
        days_since_contact: i64,
    ) -> Result<String, AssistantError>;
}

#[derive(Debug)]
pub struct OpenAiAssistant {
    client: Client,
    api_base: String,
    api_key: String,
    model: String,
    request_timeout: Duration,
}

impl OpenAiAssistant {
    pub fn new(
        client: Client,
        api_base: impl Into<String>,
        api_key: impl Into<String>,
        model: impl Into<String>,
        request_timeout: Duration,
    ) -> Result<Self, AssistantError> {
        let api_base = api_base.into();
        validate_api_base(&api_base)?;
        let api_key = api_key.into();
        if api_key.is_empty() {
            return Err(AssistantError::MissingApiKey);
        }
        Ok(Self {
            client,
            api_base,
            api_key,
            model: model.into(),
            request_timeout,
        })
    }

    async fn complete(
        &self,
        system: &str,
        user: String,
        max_tokens: u32,
    ) -> Result<String, AssistantError> {
        let request = ChatRequest {
            model: &self.model,
            messages: vec![
                ChatMessage {
                    role: "system",
                    content: system.to_string(),
                },
                ChatMessage {
                    role: "user",
                    content: user,
                },
            ],
            max_tokens,
        };

        let response = self
            .client
            .post(format!("{}/chat/completions", self.api_base))
            .header("Authorization", format!("Bearer {}", self.api_key))
            .json(&request)
            .timeout(self.request_timeout)
            .send()
            .await
            .map_err(|e| AssistantError::Communication(e.to_string()))?;

        let status = response.status();
        if status == StatusCode::TOO_MANY_REQUESTS {
            return Err(AssistantError::RateLimited);
        }
        if !status.is_success() {
            return Err(AssistantError::Communication(format!(
                "HTTP {}",
                status.as_u16()
            )));
        }

        let body: ChatResponse = response
            .json()
            .await
            .map_err(|e| AssistantError::InvalidResponse(e.to_string()))?;
        body.choices
            .into_iter()
            .next()
            .and_then(|choice| choice.message.content)
            .ok_or_else(|| AssistantError::InvalidResponse("no completion content".into()))
    }
}

#[async_trait]
impl Assistant for OpenAiAssistant {
    async fn summarize(&self, signals: &[Signal]) -> Result<String, AssistantError> {
        if signals.is_empty() {
            return Ok("No recent activity to summarize.".to_string());
        }
        let user = format!("Recent activity:\n{}", summary_lines(signals));
        self.complete(SUMMARIZE_SYSTEM_PROMPT, user, 150).await
    }

    async fn search(&self, query: &str, signals: &[Signal]) -> Result<String, AssistantError> {
        let user = format!(
            "Given these signals from the user's network:\n{}\n\nUser query: \"{query}\"\n\nReturn the most relevant items and a brief summary.",
            search_lines(signals)
        );
        self.complete(SEARCH_SYSTEM_PROMPT, user, 500).await
    }

    async fn outreach_suggestion(
        &self,
        contact: &Contact,
        days_since_contact: i64,
    ) -> Result<String, AssistantError> {
        let user = format!(
            "Contact: {}, Relationship: {}, Days since last contact: {}, Notes: {}",
            contact.name,
            contact.tier.label(),
            days_since_contact,
            contact.notes.as_deref().unwrap_or("None"),
        );
        self.complete(SUGGESTION_SYSTEM_PROMPT, user, 50).await
    }
}

/// One bullet per signal, capped.
fn summary_lines(signals: &[Signal]) -> String {
    signals
        .iter()
        .take(SUMMARY_SIGNAL_LIMIT)
        .map(|s| format!("- [{}] {} ({})", s.platform, s.title, s.kind))
        .collect::<Vec<_>>()
        .join("\n")
}

/// One line per signal with its author, for search context.
fn search_lines(signals: &[Signal]) -> String {
    signals
        .iter()
        .map(|s| {
            format!(
                "[{}] {} by {} - {}",
                s.platform,
                s.title,
                signal_author(s),
                s.kind
            )
        })
        .collect::<Vec<_>>()
        .join("\n")
}

/// Best-effort author name from platform metadata.
fn signal_author(signal: &Signal) -> &str {
    for key in ["channelTitle", "userName", "actor"] {
        if let Some(author) = signal.metadata.get(key).and_then(|v| v.as_str()) {
            if !author.is_empty() {
                return author;
            }
        }
    }
    "Unknown"
}

/// The API base must be https, except plain http against localhost for
/// tests.
fn validate_api_base(api_base: &str) -> Result<(), AssistantError> {
    let parsed = url::Url::parse(api_base)
        .map_err(|e| AssistantError::InvalidBaseUrl(format!("{api_base}: {e}")))?;
    match parsed.scheme() {
        "https" => Ok(()),
        "http" => {
            let host = parsed.host_str().unwrap_or_default();
            if host == "localhost" || host == "127.0.0.1" {
                Ok(())
            } else {
                Err(AssistantError::InvalidBaseUrl(format!(
                    "{api_base}: http is only allowed for localhost"
                )))
            }
        }
        other => Err(AssistantError::InvalidBaseUrl(format!(
            "{api_base}: unsupported scheme {other}"
        ))),
    }
}

#[derive(Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: Vec<ChatMessage<'a>>,
    max_tokens: u32,
}

#[derive(Serialize)]
struct ChatMessage<'a> {
    role: &'a str,
    content: String,
}

#[derive(Deserialize)]
struct ChatResponse {
    #[serde(default)]
    choices: Vec<ChatChoice>,
}

#[derive(Deserialize)]
struct ChatChoice {
    message: ChatChoiceMessage,
}

#[derive(Deserialize)]
struct ChatChoiceMessage {
    content: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::signal::{Platform, SignalKind};
    use chrono::{TimeZone, Utc};

    fn signal(platform: Platform, kind: SignalKind, title: &str, author: Option<(&str, &str)>) -> Signal {
        let mut metadata = serde_json::Map::new();
        if let Some((key, value)) = author {
            metadata.insert(key.to_string(), value.into());
        }
        Signal {
            platform,
            kind,
            source_id: title.to_string(),
            title: title.to_string(),
            description: None,
            url: None,
            thumbnail_url: None,
            is_live: false,
            published_at: Utc.with_ymd_and_hms(2026, 2, 1, 0, 0, 0).unwrap(),
            metadata,
        }
    }

    #[test]
    fn summary_lines_are_capped_and_formatted() {
        let signals: Vec<Signal> = (0..25)
            .map(|i| {
                signal(
                    Platform::Youtube,
                    SignalKind::Video,
                    &format!("Video {i}"),
                    None,
                )
            })
            .collect();
        let lines = summary_lines(&signals);
        assert_eq!(lines.lines().count(), 20);
        assert!(lines.starts_with("- [youtube] Video 0 (video)"));
    }

    #[test]
    fn search_lines_pick_authors_per_platform() {
        let signals = vec![
            signal(
                Platform::Youtube,
                SignalKind::Video,
                "Tour",
                Some(("channelTitle", "RustChan")),
            ),
            signal(
                Platform::Twitch,
                SignalKind::Stream,
                "Live",
                Some(("userName", "streamer")),
            ),
            signal(
                Platform::Github,
                SignalKind::Commit,
                "Fix",
                Some(("actor", "octocat")),
            ),
            signal(Platform::Github, SignalKind::Activity, "Mystery", None),
        ];
        let lines = search_lines(&signals);
        assert!(lines.contains("[youtube] Tour by RustChan - video"));
        assert!(lines.contains("[twitch] Live by streamer - stream"));
        assert!(lines.contains("[github] Fix by octocat - commit"));
        assert!(lines.contains("[github] Mystery by Unknown - activity"));
    }

    #[test]
    fn api_base_validation_rejects_plain_http_remotes() {
        assert!(validate_api_base("https://api.openai.com/v1").is_ok());
        assert!(validate_api_base("http://127.0.0.1:8080").is_ok());
        assert!(validate_api_base("http://localhost:8080/v1").is_ok());
        assert!(validate_api_base("http://api.example.com/v1").is_err());
        assert!(validate_api_base("ftp://api.openai.com").is_err());
        assert!(validate_api_base("not a url").is_err());
    }

    #[test]
    fn constructor_rejects_empty_key() {
        let err = OpenAiAssistant::new(
            Client::new(),
            DEFAULT_API_BASE,
            "",
            DEFAULT_MODEL,
            Duration::from_secs(5),
        )
        .unwrap_err();
        assert!(matches!(err, AssistantError::MissingApiKey));
    }
}
