//! Signal feed and assistant commands.

use std::time::Duration;

use chrono::Utc;
use clap::Subcommand;
use reqwest::Client;
use upkeep_core::{
    Assistant, Config, Database, KeyringCredentials, OpenAiAssistant, SignalFeed,
    SignalRepository,
};

#[derive(Subcommand)]
pub enum FeedAction {
    /// Collect fresh signals from every connected platform
    Refresh,
    /// Show the cached feed, newest first
    Show {
        /// Only signals from this platform (youtube, github, twitch, ...)
        #[arg(long)]
        platform: Option<String>,
        /// Maximum number of signals to show
        #[arg(long)]
        limit: Option<usize>,
    },
    /// Summarize recent activity with the assistant
    Summarize,
    /// Ask the assistant about recent activity
    Search {
        /// Natural-language query
        query: String,
    },
}

pub fn run(action: FeedAction) -> Result<(), Box<dyn std::error::Error>> {
    let config = Config::load_or_default();
    let db = Database::open()?;

    match action {
        FeedAction::Refresh => {
            let feed = SignalFeed::with_defaults(&config.feed);
            let runtime = tokio::runtime::Runtime::new()?;
            let outcome = runtime.block_on(feed.collect(&KeyringCredentials, Utc::now()));
            let stored = db.signals().upsert_all(&outcome.signals)?;
            println!("Collected {stored} signals");
            for failure in &outcome.failures {
                eprintln!("{}: {}", failure.platform, failure.error);
            }
        }
        FeedAction::Show { platform, limit } => {
            let limit = limit.unwrap_or(config.feed.max_signals);
            let signals = match platform {
                Some(platform) => db.signals().by_platform(platform.parse()?, limit)?,
                None => db.signals().recent(limit)?,
            };
            println!("{}", serde_json::to_string_pretty(&signals)?);
        }
        FeedAction::Summarize => {
            let signals = db.signals().recent(config.feed.max_signals)?;
            let assistant = build_assistant(&config)?;
            let runtime = tokio::runtime::Runtime::new()?;
            let summary = runtime.block_on(assistant.summarize(&signals))?;
            println!("{summary}");
        }
        FeedAction::Search { query } => {
            let signals = db.signals().recent(config.feed.max_signals)?;
            let assistant = build_assistant(&config)?;
            let runtime = tokio::runtime::Runtime::new()?;
            let answer = runtime.block_on(assistant.search(&query, &signals))?;
            println!("{answer}");
        }
    }
    Ok(())
}

/// The assistant key comes from the environment, never from config.
pub(crate) fn build_assistant(
    config: &Config,
) -> Result<OpenAiAssistant, Box<dyn std::error::Error>> {
    let api_key = std::env::var(upkeep_core::assistant::API_KEY_ENV)
        .map_err(|_| format!("{} is not set", upkeep_core::assistant::API_KEY_ENV))?;
    Ok(OpenAiAssistant::new(
        Client::new(),
        config.assistant.api_base.clone(),
        api_key,
        config.assistant.model.clone(),
        Duration::from_secs(config.assistant.request_timeout_secs),
    )?)
}
